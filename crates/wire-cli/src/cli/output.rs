//! Console output for the interactive prompt
//!
//! Errors are written to stderr in red, messages to stdout. A buffered sink
//! keeps lines in memory instead, for callers that inspect the output.

use colored::Colorize;
use std::io::{self, Write};
use std::sync::Mutex;
use wire_core::{EventSink, WireError};

/// One line written to the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Error(String),
    Message(String),
    Report(String),
}

/// [`EventSink`] that writes to the terminal
#[derive(Debug, Default)]
pub struct ConsoleSink {
    buffer: Option<Mutex<Vec<ConsoleLine>>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records lines instead of printing them
    pub fn buffered() -> Self {
        Self {
            buffer: Some(Mutex::new(Vec::new())),
        }
    }

    /// Drain recorded lines; always empty for a printing sink
    pub fn take_lines(&self) -> Vec<ConsoleLine> {
        match &self.buffer {
            Some(buffer) => buffer
                .lock()
                .map(|mut lines| std::mem::take(&mut *lines))
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    fn emit(&self, line: ConsoleLine) {
        if let Some(buffer) = &self.buffer {
            if let Ok(mut lines) = buffer.lock() {
                lines.push(line);
            }
            return;
        }

        match line {
            ConsoleLine::Error(text) => {
                let mut stderr = io::stderr();
                writeln!(stderr, "{} {}", "Error:".red().bold(), text.red()).ok();
            }
            ConsoleLine::Message(text) => {
                let mut stdout = io::stdout();
                writeln!(stdout, "{}", text).ok();
            }
            ConsoleLine::Report(text) => {
                let mut stdout = io::stdout();
                writeln!(stdout, "{}", "Compliance Report".cyan().bold()).ok();
                writeln!(stdout, "{}", text).ok();
            }
        }
    }
}

impl EventSink for ConsoleSink {
    fn error(&self, error: &WireError) {
        self.emit(ConsoleLine::Error(error.to_string()));
    }

    fn message(&self, message: &str) {
        self.emit(ConsoleLine::Message(message.to_string()));
    }

    fn report(&self, report: &str) {
        self.emit(ConsoleLine::Report(report.to_string()));
    }
}

/// Print the prompt marker
pub fn prompt() {
    let mut stdout = io::stdout();
    write!(stdout, "{} ", "wire>".green().bold()).ok();
    stdout.flush().ok();
}
