//! Tracing setup for the binary
//!
//! Console output goes to stderr, filtered by `RUST_LOG` plus the `-v`
//! level. When a log folder is configured, a second layer appends plain-text
//! records to `wire_<timestamp>.log` in that folder.

use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Default level for a `-v` count
pub fn level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Log file name for a session started at `at`
pub fn log_file_name(at: DateTime<Local>) -> String {
    format!("wire_{}.log", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Install the global subscriber, returning the log file path if one is open
pub fn init(verbose: u8, log_folder: &str) -> io::Result<Option<PathBuf>> {
    let filter = EnvFilter::from_default_env().add_directive(level(verbose).into());

    let (file_layer, path) = if log_folder.trim().is_empty() {
        (None, None)
    } else {
        let folder = Path::new(log_folder.trim());
        std::fs::create_dir_all(folder)?;
        let path = folder.join(log_file_name(Local::now()));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
        (Some(layer), Some(path))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(file_layer)
        .init();

    Ok(path)
}
