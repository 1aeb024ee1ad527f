//! CLI module for WIRE
//!
//! Argument parsing, console output and the interactive prompt.

pub mod commands;
pub mod output;

pub use commands::{Delivery, WireCli};
pub use output::{ConsoleLine, ConsoleSink};

use crate::shell::{CommandProcessor, Flow};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Exit codes for the `wire` process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// The command succeeded, or the prompt was left normally
    Success = 0,
    /// The command failed
    CommandFailed = 1,
    /// Startup failed before any command ran
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Execute a single command line and map the outcome to an exit code
pub async fn run_once(shell: &mut CommandProcessor, line: &str) -> ExitCode {
    match shell.execute(line).await {
        Ok(_) => ExitCode::Success,
        Err(_) => ExitCode::CommandFailed,
    }
}

/// Read commands from stdin until `exit` or end of input
pub async fn run_prompt(shell: &mut CommandProcessor) -> std::io::Result<ExitCode> {
    println!(
        "WIRE {}. Type 'help' for a list of commands.",
        crate::VERSION
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        output::prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        // errors were already printed by the console sink
        if let Ok(Flow::Exit) = shell.execute(&line).await {
            break;
        }
    }

    shell.controller().stop();
    info!("Prompt closed");
    Ok(ExitCode::Success)
}
