//! End-to-end compliance passes
//!
//! Drives the polling controller against in-memory collaborators and checks
//! the reminders, reports and events a pass produces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::{Arc, Mutex, RwLock};
use tempfile::TempDir;
use wire_core::compliance::render;
use wire_core::{
    BackendClient, ComplianceEvaluator, Configuration, EventSink, FailureKind, FieldRule,
    FileReportSink, MailMessage, MailTransport, PollingController, RunState, TransportError,
    WireError, WorkItem,
};

#[derive(Default)]
struct FixtureBackend {
    items: Vec<WorkItem>,
    queries: Mutex<Vec<(Vec<String>, Vec<String>)>>,
    fail: bool,
}

#[async_trait]
impl BackendClient for FixtureBackend {
    async fn select_items(
        &self,
        _since: DateTime<Utc>,
        area_paths: &[String],
        assignees: &[String],
    ) -> Result<Vec<WorkItem>, TransportError> {
        self.queries
            .lock()
            .unwrap()
            .push((area_paths.to_vec(), assignees.to_vec()));
        if self.fail {
            return Err(TransportError::Connection("backend offline".into()));
        }
        Ok(self.items.clone())
    }
}

#[derive(Default)]
struct MemoryTransport {
    sent: Mutex<Vec<MailMessage>>,
}

#[async_trait]
impl MailTransport for MemoryTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RecordingSink {
    errors: Mutex<Vec<String>>,
    reports: Mutex<Vec<String>>,
}

impl EventSink for RecordingSink {
    fn error(&self, error: &WireError) {
        self.errors.lock().unwrap().push(error.to_string());
    }

    fn message(&self, _message: &str) {}

    fn report(&self, report: &str) {
        self.reports.lock().unwrap().push(report.to_string());
    }
}

fn configuration() -> Configuration {
    let mut config = Configuration::default();
    config.set_value("pollinginterval=15").unwrap();
    config.set_value("reportinginterval=60").unwrap();
    config.set_value("reportemail=admin@contoso.com").unwrap();
    config.set_entry("recipients", "Alice=alice@contoso.com").unwrap();
    config.set_entry("recipients", "Bob=bob@contoso.com").unwrap();
    config.backend.insert_rule(
        FieldRule::new("Priority", "^[1-4]$")
            .unwrap()
            .with_prefix("Microsoft.VSTS.Common.")
            .with_area_path("Ops")
            .with_description("Priority 1-4"),
    );
    config.backend.insert_rule(
        FieldRule::new("Severity", ".+")
            .unwrap()
            .with_prefix("Microsoft.VSTS.Common.")
            .with_area_path("Ops")
            .with_description("Severity is set"),
    );
    config
}

fn items() -> Vec<WorkItem> {
    vec![
        WorkItem::new(42, "Alice", "Disk full")
            .with_url("https://contoso/wi/42")
            .with_field("Microsoft.VSTS.Common.Priority", json!("9"))
            .with_field("Microsoft.VSTS.Common.Severity", json!("2 - High")),
        WorkItem::new(43, "Bob", "Login slow").with_field("Microsoft.VSTS.Common.Priority", json!(2)),
        WorkItem::new(44, "Mallory", "Not tracked"),
    ]
}

#[test]
fn test_evaluation_scenario() {
    let evaluator = ComplianceEvaluator::from_config(&configuration());
    let results = evaluator.evaluate(&items());

    let alice = results.get("Alice", 42).unwrap();
    assert_eq!(alice.failures.len(), 1);
    assert_eq!(alice.failures[0].kind, FailureKind::Invalid);
    assert_eq!(alice.failures[0].rule.field_name(), "Priority");

    let bob = results.get("Bob", 43).unwrap();
    assert_eq!(bob.failures.len(), 1);
    assert_eq!(bob.failures[0].kind, FailureKind::Missing);
    assert_eq!(bob.failures[0].rule.field_name(), "Severity");

    assert!(results.items_for("Mallory").is_none());
    assert_eq!(results.item_count(), 2);
}

#[tokio::test]
async fn test_run_pass_end_to_end() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(FixtureBackend {
        items: items(),
        ..Default::default()
    });
    let transport = Arc::new(MemoryTransport::default());
    let sink = Arc::new(RecordingSink::default());
    let controller = PollingController::builder(
        Arc::new(RwLock::new(configuration())),
        backend.clone(),
        transport.clone(),
    )
    .with_report_sink(Arc::new(FileReportSink::new(dir.path())))
    .with_events(sink.clone())
    .build();

    let summary = controller.run().await.unwrap();
    assert_eq!(summary.items_checked, 3);
    assert_eq!(summary.non_compliant_items, 2);
    assert_eq!(summary.reminders_sent, 2);

    let queries = backend.queries.lock().unwrap();
    assert_eq!(queries[0].0, vec!["Ops".to_string()]);
    assert_eq!(queries[0].1, vec!["Alice".to_string(), "Bob".to_string()]);

    let sent = transport.sent.lock().unwrap();
    let addresses: Vec<&str> = sent.iter().map(|m| m.to_address.as_str()).collect();
    assert_eq!(
        addresses,
        vec!["alice@contoso.com", "bob@contoso.com", "admin@contoso.com"]
    );
    assert_eq!(sent[0].subject, "Work Item 42 - Disk full");
    assert!(sent[2].body.contains("BAD VALUE - Microsoft.VSTS.Common.Priority"));
    assert!(sent[2].body.contains("NO VALUE - Microsoft.VSTS.Common.Severity"));

    assert_eq!(sink.reports.lock().unwrap().len(), 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    assert_eq!(controller.last_report(), Some(summary.report));
}

#[tokio::test]
async fn test_backend_failure_reaches_sink() {
    let backend = Arc::new(FixtureBackend {
        fail: true,
        ..Default::default()
    });
    let transport = Arc::new(MemoryTransport::default());
    let sink = Arc::new(RecordingSink::default());
    let controller = PollingController::builder(
        Arc::new(RwLock::new(configuration())),
        backend,
        transport.clone(),
    )
    .with_events(sink.clone())
    .build();

    assert!(matches!(controller.test().await, Err(WireError::Transport(_))));
    assert_eq!(sink.errors.lock().unwrap().len(), 1);
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_state_machine() {
    let controller = PollingController::builder(
        Arc::new(RwLock::new(configuration())),
        Arc::new(FixtureBackend::default()),
        Arc::new(MemoryTransport::default()),
    )
    .with_first_tick_delay(std::time::Duration::from_secs(3600))
    .build();

    controller.start().unwrap();
    assert_eq!(controller.state(), RunState::Started);

    controller.pause();
    controller.start().unwrap();
    assert_eq!(controller.state(), RunState::Started);
    assert_eq!(controller.status().unwrap().timer_arms, 1);

    controller.stop();
    assert_eq!(controller.state(), RunState::Stopped);
    assert!(!controller.status().unwrap().timer_armed);
}

#[tokio::test]
async fn test_send_last_report_requires_a_pass() {
    let transport = Arc::new(MemoryTransport::default());
    let controller = PollingController::builder(
        Arc::new(RwLock::new(configuration())),
        Arc::new(FixtureBackend::default()),
        transport.clone(),
    )
    .build();

    assert!(matches!(
        controller.send_last_report().await,
        Err(WireError::Controller(_))
    ));

    controller.test().await.unwrap();
    assert_eq!(controller.last_report().as_deref(), Some(render::NO_ERRORS));
    controller.send_last_report().await.unwrap();
    assert_eq!(transport.sent.lock().unwrap().len(), 1);
}
