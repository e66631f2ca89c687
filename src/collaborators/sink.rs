//! End-of-run storage of every accumulated row.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```
//!
//! Each file holds the run's rows as a JSON array of `{ "title", "body" }`
//! objects. A second run in the same edition replaces the file.

use crate::models::PipelineRow;
use crate::utils::time_of_day;
use chrono::Local;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Receives all rows of a run at once, after the last link.
pub trait ResultSink {
    /// Persist `rows` in order.
    ///
    /// # Errors
    ///
    /// Any storage failure. The run still completes; the error is logged.
    async fn store(&self, rows: &[PipelineRow]) -> Result<(), Box<dyn Error>>;
}

/// Writes each run to a dated, edition-named JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    output_dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// `{output_dir}/{date}/{edition}.json`
    pub fn path_for(&self, date: &str, edition: &str) -> PathBuf {
        self.output_dir.join(date).join(format!("{edition}.json"))
    }
}

impl ResultSink for JsonFileSink {
    #[instrument(level = "info", skip_all, fields(output_dir = %self.output_dir.display(), rows = rows.len()))]
    async fn store(&self, rows: &[PipelineRow]) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(rows)?;
        let date = Local::now().date_naive().to_string();
        let path = self.path_for(&date, &time_of_day());

        if let Some(dir) = path.parent() {
            if let Err(e) = fs::create_dir_all(dir).await {
                error!(dir = %dir.display(), error = %e, "Failed to create output dir");
                return Err(e.into());
            }
        }

        fs::write(&path, json).await?;
        info!(path = %path.display(), "Wrote result rows");
        Ok(())
    }
}
