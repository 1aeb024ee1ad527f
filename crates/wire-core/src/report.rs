//! Report output
//!
//! Each pass produces one administrator report. [`ReportSink`] receives it;
//! [`FileReportSink`] keeps a timestamped copy on disk.

use crate::error::TransportError;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Receiver of finished reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn write_report(&self, report: &str) -> Result<(), TransportError>;
}

/// Writes each report to `wire-report_<timestamp>.html` in a folder
#[derive(Debug, Clone)]
pub struct FileReportSink {
    folder: PathBuf,
}

impl FileReportSink {
    pub fn new(folder: impl AsRef<Path>) -> Self {
        Self {
            folder: folder.as_ref().to_path_buf(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// File name for a report written at `at`
    pub fn file_name(at: DateTime<Local>) -> String {
        format!("wire-report_{}.html", at.format("%Y-%m-%d_%H-%M-%S"))
    }
}

#[async_trait]
impl ReportSink for FileReportSink {
    async fn write_report(&self, report: &str) -> Result<(), TransportError> {
        tokio::fs::create_dir_all(&self.folder).await?;
        let path = self.folder.join(Self::file_name(Local::now()));
        tokio::fs::write(&path, report).await?;
        debug!(path = %path.display(), "Report written");
        Ok(())
    }
}
