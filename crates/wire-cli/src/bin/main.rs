//! WIRE command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Interactive prompt
//! WIRE_ENCRYPTION_KEY=secret wire --config wire-config.json
//!
//! # One command, then exit
//! wire --key secret config set pollinginterval=15
//! wire --key secret --items work-items.json --outbox outbox test
//!
//! # Send through the configured SMTP server
//! wire --key secret --delivery smtp run
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: The command failed
//! - 10: Startup failed

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use std::sync::{Arc, RwLock};
use tracing::info;
use wire_cli::cli::{self, ConsoleSink, Delivery, ExitCode, WireCli};
use wire_cli::{logging, CommandProcessor, DirectoryMailTransport, JsonFileBackend, SmtpMailTransport};
use wire_core::{ConfigStore, FileReportSink, MailConfig, MailTransport, PollingController};
use wire_crypto::FieldCipher;

#[tokio::main]
async fn main() {
    let cli = WireCli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::InternalError
        }
    };

    std::process::exit(code.into());
}

async fn run(cli: WireCli) -> anyhow::Result<ExitCode> {
    let cipher = cli
        .key
        .as_deref()
        .map(FieldCipher::new)
        .transpose()
        .context("Invalid encryption key")?;

    let store = ConfigStore::new(&cli.config, cipher);
    let loaded = store.load().with_context(|| {
        format!(
            "Failed to load {} (is --key or WIRE_ENCRYPTION_KEY set?)",
            cli.config.display()
        )
    })?;

    let log_file = logging::init(cli.verbose, &loaded.scheduler.log_folder)
        .context("Failed to open the log folder")?;
    info!(
        config = %cli.config.display(),
        log_file = ?log_file,
        "WIRE {} starting",
        wire_cli::VERSION
    );

    let transport = mail_transport(&cli, &loaded.mail)?;

    let console = Arc::new(ConsoleSink::new());
    let report_folder = loaded.scheduler.report_folder.trim().to_string();
    let config = Arc::new(RwLock::new(loaded.with_events(console.clone())));

    let mut builder = PollingController::builder(
        config.clone(),
        Arc::new(JsonFileBackend::new(&cli.items)),
        transport,
    )
    .with_events(console.clone());
    if !report_folder.is_empty() {
        builder = builder.with_report_sink(Arc::new(FileReportSink::new(&report_folder)));
    }

    let mut shell = CommandProcessor::new(config, store, builder.build(), console);
    match cli.command_line() {
        Some(line) => Ok(cli::run_once(&mut shell, &line).await),
        None => cli::run_prompt(&mut shell)
            .await
            .context("Failed to read from stdin"),
    }
}

fn mail_transport(cli: &WireCli, mail: &MailConfig) -> anyhow::Result<Arc<dyn MailTransport>> {
    match cli.delivery.resolve(&mail.host) {
        Delivery::Smtp => {
            let transport =
                SmtpMailTransport::from_config(mail).context("Invalid mail settings")?;
            info!(host = %mail.host, port = mail.port, "Delivering mail over SMTP");
            Ok(Arc::new(transport))
        }
        _ => {
            let transport = DirectoryMailTransport::with_sender(&cli.outbox, &mail.from_email)
                .context("Invalid from address")?;
            info!(outbox = %cli.outbox.display(), "Writing mail to the outbox directory");
            Ok(Arc::new(transport))
        }
    }
}
