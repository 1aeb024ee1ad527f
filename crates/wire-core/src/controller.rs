//! Polling controller
//!
//! Drives compliance passes, either on a periodic timer or on demand.
//!
//! # States
//!
//! ```text
//!            start                 pause
//! Stopped ----------> Started <----------> Paused
//!    ^                   |       start        |
//!    +------ stop -------+-------- stop ------+
//! ```
//!
//! `start` arms the timer only when none is running, so there is never more
//! than one periodic task. While paused the timer task holds its tick until
//! the controller is started or stopped again.
//!
//! Passes are serialized by an async mutex: a timer tick that finds a pass
//! in progress is skipped, a manual `run`/`test` waits for it.
//!
//! # Example
//!
//! ```rust,ignore
//! use wire_core::controller::PollingController;
//!
//! let controller = PollingController::builder(config, backend, transport)
//!     .with_report_sink(Arc::new(FileReportSink::new("reports")))
//!     .with_events(sink)
//!     .build();
//!
//! controller.start()?;
//! let summary = controller.run().await?;
//! ```

use crate::client::BackendClient;
use crate::compliance::{render, ComplianceEvaluator};
use crate::config::Configuration;
use crate::error::{Result, WireError};
use crate::events::EventSink;
use crate::outbox::{MailMessage, MailTransport, Outbox};
use crate::report::ReportSink;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Delay before the first scheduled pass after arming
pub const FIRST_TICK_DELAY: Duration = Duration::from_secs(1);

/// Run state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Stopped,
    Started,
    Paused,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Stopped => write!(f, "stopped"),
            RunState::Started => write!(f, "started"),
            RunState::Paused => write!(f, "paused"),
        }
    }
}

/// What a pass does with its results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    /// Send reminders and the report
    Run,
    /// Send only the report
    Test,
}

/// Outcome of one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub pass_id: Uuid,
    pub mode: PassMode,
    pub items_checked: usize,
    pub non_compliant_items: usize,
    pub failures: usize,
    pub reminders_sent: usize,
    pub report: String,
}

/// Snapshot of controller state for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerStatus {
    pub state: RunState,
    pub polling_interval: u32,
    pub reporting_interval: u32,
    pub timer_armed: bool,
    pub timer_arms: u64,
    pub passes_completed: u64,
    pub passes_skipped: u64,
    pub last_pass: Option<DateTime<Utc>>,
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status: {}", self.state)?;
        writeln!(f, "Polling Interval: {} minutes", self.polling_interval)?;
        writeln!(f, "Reporting Interval: {} minutes", self.reporting_interval)?;
        writeln!(f, "Passes: {} completed, {} skipped", self.passes_completed, self.passes_skipped)?;
        match self.last_pass {
            Some(at) => write!(f, "Last pass: {}", at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "Last pass: never"),
        }
    }
}

/// Builder for [`PollingController`]
pub struct ControllerBuilder {
    config: Arc<RwLock<Configuration>>,
    backend: Arc<dyn BackendClient>,
    transport: Arc<dyn MailTransport>,
    reports: Option<Arc<dyn ReportSink>>,
    events: Option<Arc<dyn EventSink>>,
    first_tick_delay: Duration,
}

impl ControllerBuilder {
    /// Write each report through this sink
    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.reports = Some(sink);
        self
    }

    /// Forward errors and messages to this sink
    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn with_first_tick_delay(mut self, delay: Duration) -> Self {
        self.first_tick_delay = delay;
        self
    }

    pub fn build(self) -> PollingController {
        let (state, _) = watch::channel(RunState::Stopped);
        PollingController {
            inner: Arc::new(Inner {
                config: self.config,
                backend: self.backend,
                outbox: Outbox::new(self.transport),
                reports: self.reports,
                events: self.events,
                state,
                pass_lock: tokio::sync::Mutex::new(()),
                generation: AtomicU64::new(0),
                passes_completed: AtomicU64::new(0),
                passes_skipped: AtomicU64::new(0),
                last_pass: Mutex::new(None),
                last_report: Mutex::new(None),
                first_tick_delay: self.first_tick_delay,
            }),
            timer: Mutex::new(None),
            timer_arms: AtomicU64::new(0),
        }
    }
}

/// Timer-driven and manual compliance passes
pub struct PollingController {
    inner: Arc<Inner>,
    timer: Mutex<Option<JoinHandle<()>>>,
    timer_arms: AtomicU64,
}

struct Inner {
    config: Arc<RwLock<Configuration>>,
    backend: Arc<dyn BackendClient>,
    outbox: Outbox,
    reports: Option<Arc<dyn ReportSink>>,
    events: Option<Arc<dyn EventSink>>,
    state: watch::Sender<RunState>,
    pass_lock: tokio::sync::Mutex<()>,
    generation: AtomicU64,
    passes_completed: AtomicU64,
    passes_skipped: AtomicU64,
    last_pass: Mutex<Option<DateTime<Utc>>>,
    last_report: Mutex<Option<String>>,
    first_tick_delay: Duration,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl PollingController {
    pub fn builder(
        config: Arc<RwLock<Configuration>>,
        backend: Arc<dyn BackendClient>,
        transport: Arc<dyn MailTransport>,
    ) -> ControllerBuilder {
        ControllerBuilder {
            config,
            backend,
            transport,
            reports: None,
            events: None,
            first_tick_delay: FIRST_TICK_DELAY,
        }
    }

    pub fn state(&self) -> RunState {
        *self.inner.state.borrow()
    }

    /// Enter `Started`, arming the timer if none is running
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let result = self.arm();
        if let Err(e) = &result {
            self.inner.forward_error(e);
        }
        result
    }

    fn arm(&self) -> Result<()> {
        let mut timer = locked(&self.timer);
        let armed = timer.as_ref().is_some_and(|h| !h.is_finished());

        if !armed {
            let minutes = self.inner.snapshot()?.scheduler.polling_interval;
            if minutes == 0 {
                return Err(WireError::controller(
                    "polling interval must be greater than zero",
                ));
            }

            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.inner.state.send_replace(RunState::Started);
            let period = Duration::from_secs(u64::from(minutes) * 60);
            *timer = Some(tokio::spawn(run_timer(self.inner.clone(), generation, period)));
            self.timer_arms.fetch_add(1, Ordering::SeqCst);
            info!(polling_interval = minutes, "Polling timer armed");
        } else {
            self.inner.state.send_replace(RunState::Started);
            debug!("Polling resumed");
        }

        self.inner.message("Polling started");
        Ok(())
    }

    /// Enter `Stopped` and disarm the timer
    pub fn stop(&self) {
        self.inner.state.send_replace(RunState::Stopped);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if locked(&self.timer).take().is_some() {
            info!("Polling timer disarmed");
        }
        self.inner.message("Polling stopped");
    }

    /// Enter `Paused`; the timer holds its ticks until started or stopped
    pub fn pause(&self) {
        self.inner.state.send_replace(RunState::Paused);
        info!("Polling paused");
        self.inner.message("Polling paused");
    }

    /// One pass that sends reminders and the report
    pub async fn run(&self) -> Result<PassSummary> {
        self.inner.manual_pass(PassMode::Run).await
    }

    /// One pass that sends only the report
    pub async fn test(&self) -> Result<PassSummary> {
        self.inner.manual_pass(PassMode::Test).await
    }

    /// Email the most recent report to the report address
    pub async fn send_last_report(&self) -> Result<()> {
        let result = match self.last_report() {
            Some(report) => match self.inner.snapshot() {
                Ok(config) => self.inner.email_report(&config, &report).await,
                Err(e) => Err(e),
            },
            None => Err(WireError::controller("no report has been produced yet")),
        };
        if let Err(e) = &result {
            self.inner.forward_error(e);
        }
        result
    }

    /// Most recent report text
    pub fn last_report(&self) -> Option<String> {
        locked(&self.inner.last_report).clone()
    }

    pub fn status(&self) -> Result<ControllerStatus> {
        let config = self.inner.snapshot()?;
        Ok(ControllerStatus {
            state: self.state(),
            polling_interval: config.scheduler.polling_interval,
            reporting_interval: config.scheduler.reporting_interval,
            timer_armed: locked(&self.timer).as_ref().is_some_and(|h| !h.is_finished()),
            timer_arms: self.timer_arms.load(Ordering::SeqCst),
            passes_completed: self.inner.passes_completed.load(Ordering::SeqCst),
            passes_skipped: self.inner.passes_skipped.load(Ordering::SeqCst),
            last_pass: *locked(&self.inner.last_pass),
        })
    }
}

impl Drop for PollingController {
    fn drop(&mut self) {
        self.inner.state.send_replace(RunState::Stopped);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for PollingController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingController")
            .field("state", &self.state())
            .field("timer_arms", &self.timer_arms.load(Ordering::SeqCst))
            .finish()
    }
}

async fn run_timer(inner: Arc<Inner>, generation: u64, period: Duration) {
    let mut state = inner.state.subscribe();
    let mut delay = inner.first_tick_delay;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = state.wait_for(|s| *s == RunState::Stopped) => break,
        }
        delay = period;

        // Hold the tick while paused
        let current = match state.wait_for(|s| *s != RunState::Paused).await {
            Ok(s) => *s,
            Err(_) => break,
        };
        if current == RunState::Stopped || !inner.is_current(generation) {
            break;
        }

        inner.scheduled_pass().await;
    }

    debug!(generation, "Polling timer exited");
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn snapshot(&self) -> Result<Configuration> {
        let config = self
            .config
            .read()
            .map_err(|e| WireError::controller(format!("Failed to acquire lock: {}", e)))?;
        Ok(config.clone())
    }

    fn forward_error(&self, err: &WireError) {
        match &self.events {
            Some(sink) => sink.error(err),
            None => error!(error = %err, "Pass failed"),
        }
    }

    fn message(&self, message: &str) {
        if let Some(sink) = &self.events {
            sink.message(message);
        }
    }

    async fn scheduled_pass(&self) {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            self.passes_skipped.fetch_add(1, Ordering::SeqCst);
            warn!("Previous pass still running, skipping tick");
            return;
        };

        if let Err(e) = self.execute(PassMode::Run).await {
            self.forward_error(&e);
        }
    }

    async fn manual_pass(&self, mode: PassMode) -> Result<PassSummary> {
        let _guard = self.pass_lock.lock().await;
        let result = self.execute(mode).await;
        if let Err(e) = &result {
            self.forward_error(e);
        }
        result
    }

    async fn execute(&self, mode: PassMode) -> Result<PassSummary> {
        let pass_id = Uuid::new_v4();
        let span = info_span!("pass", %pass_id, ?mode);
        self.execute_inner(pass_id, mode).instrument(span).await
    }

    async fn execute_inner(&self, pass_id: Uuid, mode: PassMode) -> Result<PassSummary> {
        let config = self.snapshot()?;
        let since = Utc::now()
            - chrono::Duration::minutes(i64::from(config.scheduler.reporting_interval));
        let area_paths = config.backend.area_paths();
        let assignees: Vec<String> = config.mail.recipients.keys().cloned().collect();

        info!(%since, areas = area_paths.len(), assignees = assignees.len(), "Checking work items");
        self.message(&format!("Checking work items on {}...", config.backend.base_uri));

        let items = self.backend.select_items(since, &area_paths, &assignees).await?;
        let evaluator = ComplianceEvaluator::from_config(&config);
        let results = evaluator.evaluate(&items);
        let report = render::report(&results);

        let mut reminders_sent = 0;
        if mode == PassMode::Run {
            // each pass composes its reminders afresh
            let stale = self.outbox.pending();
            if stale > 0 {
                debug!(stale, "Discarding reminders left by a failed pass");
                self.outbox.clear_cache();
            }
            for message in evaluator.notifications(&results)? {
                info!(to = %message.to_name, "Sending reminder");
                self.message(&format!("Sending reminder to {}...", message.to_name));
                self.outbox.cache_email(message);
            }
            reminders_sent = self.outbox.send_cached().await?;
        }

        *locked(&self.last_report) = Some(report.clone());
        if let Some(sink) = &self.events {
            sink.report(&report);
        }
        if let Some(reports) = &self.reports {
            reports.write_report(&report).await?;
        }
        if !results.is_empty() {
            self.email_report(&config, &report).await?;
        }

        *locked(&self.last_pass) = Some(Utc::now());
        self.passes_completed.fetch_add(1, Ordering::SeqCst);

        let summary = PassSummary {
            pass_id,
            mode,
            items_checked: items.len(),
            non_compliant_items: results.item_count(),
            failures: results.failure_count(),
            reminders_sent,
            report,
        };
        info!(
            items = summary.items_checked,
            non_compliant = summary.non_compliant_items,
            reminders = summary.reminders_sent,
            "Pass complete"
        );
        Ok(summary)
    }

    async fn email_report(&self, config: &Configuration, report: &str) -> Result<()> {
        let address = &config.scheduler.report_email;
        if address.is_empty() {
            debug!("No report address configured, report not emailed");
            return Ok(());
        }

        let subject = format!("WIRE report {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        self.outbox
            .send_now(&MailMessage::plain(address.as_str(), subject, report))
            .await?;
        self.message(&format!("Report sent to {}.", address));
        Ok(())
    }
}
