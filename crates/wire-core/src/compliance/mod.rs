//! Compliance evaluation
//!
//! The evaluator checks every work item assigned to a configured recipient
//! against every field rule. A rule fails with [`FailureKind::Missing`] when
//! the item has no such field, and with [`FailureKind::Invalid`] when the
//! value does not match the rule's pattern; never both.
//!
//! Failures are grouped by assignee, then by work item id, in ascending
//! order, with failures listed in rule order.
//!
//! # Example
//!
//! ```rust,ignore
//! use wire_core::compliance::ComplianceEvaluator;
//!
//! let evaluator = ComplianceEvaluator::from_config(&config);
//! let results = evaluator.evaluate(&items);
//! for message in evaluator.notifications(&results)? {
//!     outbox.cache_email(message);
//! }
//! println!("{}", render::report(&results));
//! ```

pub mod render;

use crate::client::WorkItem;
use crate::config::{Configuration, FieldRule};
use crate::error::Result;
use crate::outbox::MailMessage;
use render::ReminderTemplate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Why a rule failed for a work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The field is absent from the work item
    Missing,
    /// The field is present but does not match the pattern
    Invalid,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Missing => write!(f, "NO VALUE"),
            FailureKind::Invalid => write!(f, "BAD VALUE"),
        }
    }
}

/// One failed rule on one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    pub rule: FieldRule,
    pub kind: FailureKind,
}

/// All failures found on one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemErrors {
    pub assignee: String,
    pub work_item_id: i64,
    pub title: String,
    pub url: String,
    pub failures: Vec<FieldFailure>,
}

impl ItemErrors {
    /// "Work Item <id> - <title>"
    pub fn heading(&self) -> String {
        format!("Work Item {} - {}", self.work_item_id, self.title)
    }
}

/// Failures of one pass: assignee -> work item id -> errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplianceResults {
    by_assignee: BTreeMap<String, BTreeMap<i64, ItemErrors>>,
}

impl ComplianceResults {
    pub fn is_empty(&self) -> bool {
        self.by_assignee.is_empty()
    }

    /// Assignees with at least one non-compliant item
    pub fn assignees(&self) -> impl Iterator<Item = &str> {
        self.by_assignee.keys().map(String::as_str)
    }

    pub fn items_for(&self, assignee: &str) -> Option<&BTreeMap<i64, ItemErrors>> {
        self.by_assignee.get(assignee)
    }

    pub fn get(&self, assignee: &str, work_item_id: i64) -> Option<&ItemErrors> {
        self.by_assignee.get(assignee)?.get(&work_item_id)
    }

    /// Every non-compliant item, grouped by assignee
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ItemErrors)> {
        self.by_assignee
            .iter()
            .flat_map(|(assignee, items)| items.values().map(move |e| (assignee.as_str(), e)))
    }

    pub fn item_count(&self) -> usize {
        self.by_assignee.values().map(BTreeMap::len).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.iter().map(|(_, e)| e.failures.len()).sum()
    }

    fn insert(&mut self, errors: ItemErrors) {
        self.by_assignee
            .entry(errors.assignee.clone())
            .or_default()
            .insert(errors.work_item_id, errors);
    }
}

/// Checks work items against the configured field rules
#[derive(Debug, Clone, Default)]
pub struct ComplianceEvaluator {
    rules: Vec<FieldRule>,
    recipients: BTreeMap<String, String>,
}

impl ComplianceEvaluator {
    /// Build an evaluator from rules (applied in the given order) and
    /// recipients (display name -> email address)
    pub fn new(rules: Vec<FieldRule>, recipients: BTreeMap<String, String>) -> Self {
        Self { rules, recipients }
    }

    /// Use the rules and recipients of a configuration snapshot
    pub fn from_config(config: &Configuration) -> Self {
        Self::new(
            config.backend.config_items.values().cloned().collect(),
            config.mail.recipients.clone(),
        )
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Evaluate items; items assigned to non-recipients are skipped
    pub fn evaluate(&self, items: &[WorkItem]) -> ComplianceResults {
        let mut results = ComplianceResults::default();

        for item in items {
            if !self.recipients.contains_key(&item.assignee) {
                debug!(work_item = item.id, assignee = %item.assignee, "Assignee is not a recipient, skipping");
                continue;
            }

            let failures: Vec<FieldFailure> = self
                .rules
                .iter()
                .filter_map(|rule| check(rule, item).map(|kind| FieldFailure {
                    rule: rule.clone(),
                    kind,
                }))
                .collect();

            if failures.is_empty() {
                continue;
            }

            results.insert(ItemErrors {
                assignee: item.assignee.clone(),
                work_item_id: item.id,
                title: item.title.clone(),
                url: item.url.clone(),
                failures,
            });
        }

        results
    }

    /// One HTML reminder per assignee with failures
    pub fn notifications(&self, results: &ComplianceResults) -> Result<Vec<MailMessage>> {
        let template = ReminderTemplate::new()?;
        results
            .assignees()
            .filter_map(|assignee| {
                let address = self.recipients.get(assignee)?;
                let items = results.items_for(assignee)?;
                Some(template.notification(assignee, address, items))
            })
            .collect()
    }
}

fn check(rule: &FieldRule, item: &WorkItem) -> Option<FailureKind> {
    match item.fields.get(&rule.lookup_key()) {
        None => Some(FailureKind::Missing),
        Some(value) if !rule.is_valid(value) => Some(FailureKind::Invalid),
        Some(_) => None,
    }
}
