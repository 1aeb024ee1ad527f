//! Process arguments for the `wire` binary

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;
use wire_core::DEFAULT_CONFIG_FILE;

/// Default work item fixture read by the file backend
pub const DEFAULT_ITEMS_FILE: &str = "work-items.json";

/// Default directory the mail transport writes into
pub const DEFAULT_OUTBOX_DIR: &str = "outbox";

/// Where outgoing mail goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Delivery {
    /// SMTP when a mail host is configured, the outbox directory otherwise
    Auto,
    /// The configured SMTP server
    Smtp,
    /// Files in the outbox directory
    Directory,
}

impl Delivery {
    /// Resolve `Auto` against the configured mail host
    pub fn resolve(self, mail_host: &str) -> Self {
        match self {
            Delivery::Auto if mail_host.trim().is_empty() => Delivery::Directory,
            Delivery::Auto => Delivery::Smtp,
            other => other,
        }
    }
}

/// WIRE - Work Item Rule Enforcement
#[derive(Parser, Debug)]
#[command(name = "wire")]
#[command(about = "Checks work item fields against configured rules and emails reminders", long_about = None)]
#[command(version)]
pub struct WireCli {
    /// Configuration file
    #[arg(short, long, env = "WIRE_CONFIG_FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Passphrase for the encrypted configuration fields
    #[arg(short, long, env = "WIRE_ENCRYPTION_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// JSON file holding the work items to check
    #[arg(long, env = "WIRE_ITEMS_FILE", default_value = DEFAULT_ITEMS_FILE)]
    pub items: PathBuf,

    /// Directory outgoing mail is written to
    #[arg(long, env = "WIRE_OUTBOX_DIR", default_value = DEFAULT_OUTBOX_DIR)]
    pub outbox: PathBuf,

    /// Mail delivery
    #[arg(long, value_enum, env = "WIRE_MAIL_DELIVERY", default_value_t = Delivery::Auto)]
    pub delivery: Delivery,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Command to execute once; starts the interactive prompt when omitted
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl WireCli {
    /// The trailing command as one line, if any
    pub fn command_line(&self) -> Option<String> {
        if self.command.is_empty() {
            return None;
        }
        Some(
            self.command
                .iter()
                .map(|arg| {
                    if arg.is_empty() || arg.contains(char::is_whitespace) {
                        format!("\"{}\"", arg)
                    } else {
                        arg.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}
