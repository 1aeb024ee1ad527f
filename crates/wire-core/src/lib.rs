//! WIRE core library
//!
//! Work Item Rule Enforcement: periodically queries a work-tracking backend,
//! checks configured fields on each returned work item against per-field
//! rules, and emails the owners of non-compliant items plus a consolidated
//! report to an administrator.
//!
//! ## Architecture
//!
//! 1. **Settings** (`settings/`): named, typed descriptors over configuration
//!    fields, and per-domain registries that resolve string-keyed commands.
//!
//! 2. **Configuration** (`config/`): the mail, backend-connection and
//!    scheduler domains, field rules, and the aggregate that routes setting
//!    names across them.
//!
//! 3. **Persistence** (`persistence`): the JSON document with field-level
//!    encryption of credentials.
//!
//! 4. **Compliance** (`compliance/`): evaluation of work items and rendering
//!    of reminders and reports.
//!
//! 5. **Controller** (`controller`): timer-driven and manual passes.
//!
//! 6. **Collaborators** (`client`, `outbox`, `report`, `events`): the
//!    backend query, mail transport, report output and event sink seams.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::{Arc, RwLock};
//! use wire_core::{ConfigStore, PollingController};
//! use wire_crypto::FieldCipher;
//!
//! let store = ConfigStore::new("wire-config.json", Some(FieldCipher::new(&key)?));
//! let config = Arc::new(RwLock::new(store.load()?));
//!
//! let controller = PollingController::builder(config, backend, transport).build();
//! controller.start()?;
//! ```

pub mod client;
pub mod compliance;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod outbox;
pub mod persistence;
pub mod report;
pub mod settings;

pub use client::{BackendClient, WorkItem};
pub use compliance::{ComplianceEvaluator, ComplianceResults, FailureKind, ItemErrors};
pub use config::{BackendConfig, Configuration, FieldRule, MailConfig, SchedulerConfig};
pub use controller::{ControllerStatus, PassMode, PassSummary, PollingController, RunState};
pub use error::{Result, SettingError, TransportError, WireError};
pub use events::{EventSink, TracingSink};
pub use outbox::{MailMessage, MailTransport, Outbox};
pub use persistence::{ConfigStore, DEFAULT_CONFIG_FILE};
pub use report::{FileReportSink, ReportSink};
pub use settings::{SettingKind, SettingValue};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
