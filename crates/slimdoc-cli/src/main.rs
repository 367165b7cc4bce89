use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Write};

mod args;
mod report;

use args::Args;
use report::Report;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .format_timestamp(None)
        .init();

    // Read input file
    let bytes = fs::read(&args.input)
        .with_context(|| format!("Failed to read input file: {}", args.input.display()))?;

    let options = args.optimize_options();
    log::debug!("optimizing {} with {:?}", args.input.display(), options);

    let optimized = slimdoc_core::optimize_bytes(&bytes, &options)
        .with_context(|| format!("Failed to optimize {}", args.input.display()))?;

    let report = Report::from(&optimized.stats);
    let summary = if args.json {
        report.to_json().context("Failed to serialize report")?
    } else {
        report.to_string()
    };

    // Write output
    if args.stdout {
        io::stdout()
            .lock()
            .write_all(optimized.text.as_bytes())
            .context("Failed to write optimized document to stdout")?;
        eprintln!("{summary}");
    } else {
        let output_path = args.output_path();
        fs::write(&output_path, &optimized.text)
            .with_context(|| format!("Failed to write output file: {}", output_path.display()))?;

        println!("{summary}");
        if !args.json {
            println!("Wrote {}", output_path.display());
        }
    }

    Ok(())
}
