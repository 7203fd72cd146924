// CSV export of detected polls

use crate::errors::ExportError;
use crate::models::PollDetection;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub const CSV_HEADER: [&str; 9] = [
    "Tweet ID",
    "Author ID",
    "Username",
    "Tweet Text",
    "Created At",
    "Poll End",
    "Duration (min)",
    "Status",
    "Options",
];

/// Appends one row per detection, writing the header when the file is new
#[derive(Debug, Clone)]
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(skip(self, detection), fields(path = %self.path.display(), tweet_id = %detection.tweet_id))]
    pub fn append(&self, detection: &PollDetection) -> Result<(), ExportError> {
        let is_new = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = WriterBuilder::new().from_writer(file);

        if is_new {
            writer.write_record(CSV_HEADER)?;
        }

        let duration = detection
            .duration_minutes
            .map(|d| d.to_string())
            .unwrap_or_default();
        writer.write_record([
            detection.tweet_id.as_str(),
            detection.author_id.as_str(),
            detection.username.as_str(),
            detection.text.as_str(),
            detection.created_at.as_deref().unwrap_or(""),
            detection.end_datetime.as_deref().unwrap_or(""),
            duration.as_str(),
            detection.voting_status.as_deref().unwrap_or(""),
            detection.options.join("; ").as_str(),
        ])?;
        writer.flush()?;

        info!("Poll saved to CSV");
        Ok(())
    }
}
