//! Work-item backend client
//!
//! The polling controller queries work items through [`BackendClient`].
//! Implementations decide how items are fetched (remote API, file, fixture);
//! they only need to honour the filter arguments.

use crate::error::TransportError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A work item as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: i64,
    /// Display name of the assigned user
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub title: String,
    /// Link for humans to open the item
    #[serde(default)]
    pub url: String,
    /// Technical field name -> raw value
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl WorkItem {
    pub fn new(id: i64, assignee: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            assignee: assignee.into(),
            title: title.into(),
            url: String::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// Source of work items
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Items changed since `since`, under any of `area_paths`, assigned to
    /// any of `assignees`
    async fn select_items(
        &self,
        since: DateTime<Utc>,
        area_paths: &[String],
        assignees: &[String],
    ) -> Result<Vec<WorkItem>, TransportError>;
}
