//! File-backed collaborators
//!
//! [`JsonFileBackend`] stands in for the work-tracking service by reading a
//! JSON array of work items. [`DirectoryMailTransport`] delivers mail by
//! writing each formatted message into a directory.

use crate::mail::{compose, sender};
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use lettre::message::Mailbox;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};
use wire_core::{BackendClient, MailMessage, MailTransport, TransportError, WorkItem};

/// Work item field holding the area path
pub const AREA_PATH_FIELD: &str = "System.AreaPath";

/// Work item field holding the last change time (RFC 3339)
pub const CHANGED_DATE_FIELD: &str = "System.ChangedDate";

/// Reads work items from a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BackendClient for JsonFileBackend {
    async fn select_items(
        &self,
        since: DateTime<Utc>,
        area_paths: &[String],
        assignees: &[String],
    ) -> Result<Vec<WorkItem>, TransportError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let items: Vec<WorkItem> = serde_json::from_str(&content).map_err(|e| {
            TransportError::Rejected(format!("{}: {}", self.path.display(), e))
        })?;
        let total = items.len();

        let selected: Vec<WorkItem> = items
            .into_iter()
            .filter(|item| assignees.is_empty() || assignees.contains(&item.assignee))
            .filter(|item| in_area(item, area_paths))
            .filter(|item| changed_since(item, since))
            .collect();

        debug!(
            path = %self.path.display(),
            total,
            selected = selected.len(),
            "Selected work items"
        );
        Ok(selected)
    }
}

/// Items without an area path are not filtered out
fn in_area(item: &WorkItem, area_paths: &[String]) -> bool {
    match item.fields.get(AREA_PATH_FIELD).and_then(Value::as_str) {
        Some(path) if !area_paths.is_empty() => area_paths
            .iter()
            .any(|area| path == area || path.starts_with(&format!("{}\\", area))),
        _ => true,
    }
}

fn changed_since(item: &WorkItem, since: DateTime<Utc>) -> bool {
    item.fields
        .get(CHANGED_DATE_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or(true, |changed| changed.with_timezone(&Utc) >= since)
}

/// Writes each message as a file into a directory
#[derive(Debug)]
pub struct DirectoryMailTransport {
    dir: PathBuf,
    from: Mailbox,
    sequence: AtomicU64,
}

impl DirectoryMailTransport {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, TransportError> {
        Self::with_sender(dir, "")
    }

    /// Messages carry `from_email` as their sender, or the default sender when empty
    pub fn with_sender(dir: impl AsRef<Path>, from_email: &str) -> Result<Self, TransportError> {
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            from: sender(from_email)?,
            sequence: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(&self, message: &MailMessage) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let recipient: String = message
            .to_address
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '@' { c } else { '_' })
            .collect();
        format!(
            "{}_{:04}_{}.{}",
            Local::now().format("%Y-%m-%d_%H-%M-%S"),
            sequence,
            recipient,
            if message.is_html { "html.eml" } else { "txt.eml" }
        )
    }
}

#[async_trait]
impl MailTransport for DirectoryMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        let email = compose(&self.from, message)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(self.file_name(message));
        tokio::fs::write(&path, email.formatted()).await?;
        info!(to = %message.to_address, path = %path.display(), "Message written");
        Ok(())
    }
}
