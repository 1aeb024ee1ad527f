//! WIRE command-line front end
//!
//! Wires the core library to a terminal: clap arguments, a colored console
//! event sink, the command interpreter, SMTP delivery, and file-backed
//! stand-ins for the work-tracking service and the mail server.
//!
//! ## Example
//!
//! ```rust,ignore
//! use wire_cli::shell::CommandProcessor;
//!
//! let mut shell = CommandProcessor::new(config, store, controller, console);
//! shell.execute("config get recipients").await?;
//! shell.execute("test").await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod logging;
pub mod mail;
pub mod shell;

pub use adapters::{DirectoryMailTransport, JsonFileBackend};
pub use cli::{ConsoleSink, ExitCode, WireCli};
pub use mail::SmtpMailTransport;
pub use shell::{tokenize, CommandProcessor, Flow};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
