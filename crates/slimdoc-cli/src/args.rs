use clap::Parser;
use std::path::PathBuf;

use slimdoc_core::{OptimizeOptions, WorkerPolicy};

/// Prefix given to the default output file name.
pub const OUTPUT_PREFIX: &str = "optimized_";

#[derive(Parser, Debug)]
#[command(name = "slimdoc")]
#[command(
    author,
    version,
    about = "Shrink the images embedded inline in an HTML document"
)]
pub struct Args {
    /// Input HTML file path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output HTML file path (defaults to optimized_<input name> next to the input)
    #[arg(short, long, conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// JPEG quality for re-encoded images
    #[arg(short, long, default_value = "85", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Maximum image width in pixels
    #[arg(long, default_value = "800", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_width: u32,

    /// Maximum image height in pixels
    #[arg(long, default_value = "800", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_height: u32,

    /// Number of worker threads (defaults to twice the available cores)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: Option<u32>,

    /// Replace inline JPEGs even when re-encoding makes them larger
    #[arg(long)]
    pub allow_growth: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the optimized document to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Get the output path, defaulting to `optimized_<name>` beside the input
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let name = self
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.html".to_string());
        self.input.with_file_name(format!("{OUTPUT_PREFIX}{name}"))
    }

    pub fn optimize_options(&self) -> OptimizeOptions {
        let workers = match self.jobs {
            Some(jobs) => WorkerPolicy::Fixed(jobs as usize),
            None => WorkerPolicy::default(),
        };
        OptimizeOptions::new()
            .quality(self.quality)
            .max_dimensions(self.max_width, self.max_height)
            .workers(workers)
            .never_grow(!self.allow_growth)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slimdoc_core::Dimensions;
    use std::path::Path;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("slimdoc").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["page.html"]);
        assert_eq!(args.quality, 85);
        assert_eq!(args.max_width, 800);
        assert_eq!(args.max_height, 800);
        assert_eq!(args.jobs, None);
        assert!(!args.allow_growth);
        assert!(!args.json);
        assert!(!args.stdout);

        let options = args.optimize_options();
        assert_eq!(options.quality, 85);
        assert_eq!(options.max_dimensions, Dimensions::new(800, 800));
        assert_eq!(options.workers, WorkerPolicy::default());
        assert!(options.never_grow);
    }

    #[test]
    fn test_output_path_default() {
        let args = parse(&["site/report.html"]);
        assert_eq!(args.output_path(), Path::new("site/optimized_report.html"));

        let args = parse(&["index.htm"]);
        assert_eq!(args.output_path(), Path::new("optimized_index.htm"));
    }

    #[test]
    fn test_output_path_explicit() {
        let args = parse(&["in.html", "-o", "out/small.html"]);
        assert_eq!(args.output_path(), Path::new("out/small.html"));
    }

    #[test]
    fn test_all_options() {
        let args = parse(&[
            "in.html",
            "-q",
            "60",
            "--max-width",
            "1024",
            "--max-height",
            "768",
            "-j",
            "4",
            "--allow-growth",
            "--json",
            "-vv",
        ]);
        let options = args.optimize_options();
        assert_eq!(options.quality, 60);
        assert_eq!(options.max_dimensions, Dimensions::new(1024, 768));
        assert_eq!(options.workers, WorkerPolicy::Fixed(4));
        assert!(!options.never_grow);
        assert!(args.json);
        assert_eq!(args.log_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let base = ["slimdoc", "in.html"];
        for extra in [
            ["-q", "0"],
            ["-q", "101"],
            ["--max-width", "0"],
            ["-j", "0"],
        ] {
            let argv = base.iter().chain(extra.iter());
            assert!(Args::try_parse_from(argv).is_err(), "{extra:?} should be rejected");
        }
    }

    #[test]
    fn test_stdout_conflicts_with_output() {
        let argv = ["slimdoc", "in.html", "--stdout", "-o", "x.html"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(parse(&["a"]).log_level(), log::LevelFilter::Warn);
        assert_eq!(parse(&["a", "-v"]).log_level(), log::LevelFilter::Info);
        assert_eq!(parse(&["a", "-vvv"]).log_level(), log::LevelFilter::Trace);
    }
}
