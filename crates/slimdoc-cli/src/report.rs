//! Human and JSON summaries of an optimize run.

use serde::Serialize;
use std::fmt;

use slimdoc_core::{bytes_to_megabytes, StatsRecord};

/// Derived figures for one run. Sizes are in megabytes, time in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub original_size: f64,
    pub final_size: f64,
    pub reduction_percentage: f64,
    pub execution_time: f64,
    pub images_processed: usize,
    pub images_optimized: usize,
}

impl From<&StatsRecord> for Report {
    fn from(stats: &StatsRecord) -> Self {
        Self {
            original_size: bytes_to_megabytes(stats.original_bytes),
            final_size: bytes_to_megabytes(stats.optimized_bytes),
            reduction_percentage: stats.reduction_percentage(),
            execution_time: stats.elapsed_seconds,
            images_processed: stats.images_processed,
            images_optimized: stats.images_optimized,
        }
    }
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Images optimized: {}/{}",
            self.images_optimized, self.images_processed
        )?;
        writeln!(f, "Original size:    {:.2} MB", self.original_size)?;
        writeln!(f, "Final size:       {:.2} MB", self.final_size)?;
        writeln!(f, "Reduction:        {:.2}%", self.reduction_percentage)?;
        write!(f, "Execution time:   {:.2} s", self.execution_time)
    }
}
