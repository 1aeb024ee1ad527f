//! Command interpreter
//!
//! Turns one line of operator input into configuration, persistence and
//! controller calls. Every failure is reported to the console exactly once:
//! the configuration aggregate and the controller forward their own errors,
//! everything else is forwarded here.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut shell = CommandProcessor::new(config, store, controller, console);
//! shell.execute("config set port=587").await?;
//! shell.execute(r#"config set recipients "John Doe=john@contoso.com""#).await?;
//! ```

use crate::cli::output::ConsoleSink;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use wire_core::{
    ConfigStore, Configuration, EventSink, PollingController, Result, SettingKind, WireError,
};

/// Whether the prompt should keep reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

const GENERAL_HELP: &str = "\
Commands:
    config get <name> [key...]                 Show a setting, or entries of a dictionary
    config set <name>=<value> [...]            Change scalar settings
    config set <category> <key>=<value> [...]  Add or replace dictionary entries
    config delete <category> <key> [...]       Remove dictionary entries
    config clear <name> [...]                  Reset a setting
    config load [file]                         Reload the configuration file
    config save [file]                         Write the configuration file
    run                                        Check work items and send reminders
    test                                       Check work items without sending reminders
    start | stop | pause                       Control periodic checking
    status                                     Show controller state
    print                                      Show the last report
    send                                       Email the last report
    help [name]                                Show help for a command or setting
    exit                                       Leave WIRE

Rules are edited with: config set configitems <field>.<property>=<value>
Arguments containing spaces may be wrapped in double quotes.";

/// Split a command line into arguments, honoring double quotes
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err(WireError::parse("unterminated quote"));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Executes operator commands against the configuration and controller
pub struct CommandProcessor {
    config: Arc<RwLock<Configuration>>,
    store: ConfigStore,
    controller: PollingController,
    console: Arc<ConsoleSink>,
}

impl CommandProcessor {
    pub fn new(
        config: Arc<RwLock<Configuration>>,
        store: ConfigStore,
        controller: PollingController,
        console: Arc<ConsoleSink>,
    ) -> Self {
        Self {
            config,
            store,
            controller,
            console,
        }
    }

    pub fn console(&self) -> &ConsoleSink {
        &self.console
    }

    pub fn controller(&self) -> &PollingController {
        &self.controller
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Execute one line of input
    pub async fn execute(&mut self, line: &str) -> Result<Flow> {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => return self.fail(e),
        };
        let Some((verb, args)) = tokens.split_first() else {
            return Ok(Flow::Continue);
        };
        debug!(command = %verb, args = args.len(), "Executing command");

        match verb.to_lowercase().as_str() {
            "exit" | "quit" => return Ok(Flow::Exit),
            "help" => self.help(args)?,
            "config" => self.config_command(args)?,
            "run" => {
                let summary = self.controller.run().await?;
                self.say(&format!(
                    "Checked {} work items: {} need attention, {} reminders sent.",
                    summary.items_checked, summary.non_compliant_items, summary.reminders_sent
                ));
            }
            "test" => {
                let summary = self.controller.test().await?;
                self.say(&format!(
                    "Checked {} work items: {} need attention.",
                    summary.items_checked, summary.non_compliant_items
                ));
            }
            "start" => self.controller.start()?,
            "stop" => self.controller.stop(),
            "pause" => self.controller.pause(),
            "status" => match self.controller.status() {
                Ok(status) => self.say(&status.to_string()),
                Err(e) => return self.fail(e),
            },
            "print" => match self.controller.last_report() {
                Some(report) => self.console.report(&report),
                None => self.say("No report has been produced yet."),
            },
            "send" => self.controller.send_last_report().await?,
            other => {
                return self.fail(WireError::parse(format!(
                    "unknown command '{}'; type 'help' for a list of commands",
                    other
                )))
            }
        }
        Ok(Flow::Continue)
    }

    fn help(&self, args: &[String]) -> Result<()> {
        let Some(name) = args.first() else {
            let names = self.read_config()?.setting_names().join(", ");
            self.say(&format!("{}\n\nSettings: {}", GENERAL_HELP, names));
            return Ok(());
        };

        let text = self.read_config()?.help(name)?;
        self.say(&text);
        Ok(())
    }

    fn config_command(&mut self, args: &[String]) -> Result<()> {
        let Some((sub, rest)) = args.split_first() else {
            return self.usage("config get|set|delete|clear|load|save ...");
        };

        match sub.to_lowercase().as_str() {
            "get" => self.config_get(rest),
            "set" => self.config_set(rest),
            "delete" => {
                let Some((category, keys)) = rest.split_first().filter(|(_, k)| !k.is_empty())
                else {
                    return self.usage("config delete <category> <key> [...]");
                };
                let mut config = self.write_config()?;
                apply_all(keys, |key| config.delete_value(category, key))
            }
            "clear" => {
                if rest.is_empty() {
                    return self.usage("config clear <name> [...]");
                }
                let mut config = self.write_config()?;
                apply_all(rest, |name| config.clear_value(name))
            }
            "load" => self.config_load(rest.first()),
            "save" => self.config_save(rest.first()),
            other => self.fail(WireError::parse(format!(
                "unknown config command '{}'",
                other
            ))),
        }
    }

    fn config_get(&self, args: &[String]) -> Result<()> {
        let Some((name, keys)) = args.split_first() else {
            return self.usage("config get <name> [key...]");
        };
        let config = self.read_config()?;
        let display = config.display_name(name)?;

        if !keys.is_empty() {
            for key in keys {
                // tolerate `key=` as typed for a set
                let key = key.split('=').next().unwrap_or_default();
                let value = config.get_entry(name, key)?;
                self.say(&render_entry(key, &value));
            }
            return Ok(());
        }

        match config.kind(name)? {
            SettingKind::Scalar => {
                let value = config.get_value(name)?;
                self.say(&format!("{}: {}", display, value));
            }
            SettingKind::Dictionary => {
                let entries = config.entries(name)?;
                let mut text = format!("{}:", display);
                if entries.is_empty() {
                    text.push_str("\n    (none)");
                }
                for (key, value) in entries {
                    text.push('\n');
                    text.push_str(&render_entry(&key, &value));
                }
                self.say(&text);
            }
        }
        Ok(())
    }

    fn config_set(&self, args: &[String]) -> Result<()> {
        let Some(first) = args.first() else {
            return self.usage("config set <name>=<value> | config set <category> <key>=<value>");
        };

        let mut config = self.write_config()?;
        if first.contains('=') {
            return apply_all(args, |assignment| config.set_value(assignment));
        }

        let assignments = &args[1..];
        if assignments.is_empty() {
            drop(config);
            return self.usage("config set <category> <key>=<value> [...]");
        }
        apply_all(assignments, |assignment| config.set_entry(first, assignment))
    }

    fn config_load(&mut self, file: Option<&String>) -> Result<()> {
        let store = match file {
            Some(path) => self.store.clone().with_path(path),
            None => self.store.clone(),
        };

        let loaded = match store.load() {
            Ok(loaded) => loaded,
            Err(e) => return self.fail(e),
        };
        self.write_config()?.replace_settings(loaded);
        self.say(&format!("Configuration loaded from {}", store.path().display()));
        self.store = store;
        Ok(())
    }

    fn config_save(&mut self, file: Option<&String>) -> Result<()> {
        let store = match file {
            Some(path) => self.store.clone().with_path(path),
            None => self.store.clone(),
        };

        let result = store.save(&*self.read_config()?);
        if let Err(e) = result {
            return self.fail(e);
        }
        self.say(&format!("Configuration saved to {}", store.path().display()));
        self.store = store;
        Ok(())
    }

    fn read_config(&self) -> Result<RwLockReadGuard<'_, Configuration>> {
        match self.config.read() {
            Ok(guard) => Ok(guard),
            Err(e) => self.fail(WireError::controller(format!("Failed to acquire lock: {}", e))),
        }
    }

    fn write_config(&self) -> Result<RwLockWriteGuard<'_, Configuration>> {
        match self.config.write() {
            Ok(guard) => Ok(guard),
            Err(e) => self.fail(WireError::controller(format!("Failed to acquire lock: {}", e))),
        }
    }

    fn usage<T>(&self, usage: &str) -> Result<T> {
        self.fail(WireError::parse(format!("usage: {}", usage)))
    }

    fn fail<T>(&self, error: WireError) -> Result<T> {
        self.console.error(&error);
        Err(error)
    }

    fn say(&self, message: &str) {
        self.console.message(message);
    }
}

/// Apply `op` to every argument, returning the first failure
fn apply_all(args: &[String], mut op: impl FnMut(&str) -> Result<()>) -> Result<()> {
    let mut first_error = None;
    for arg in args {
        if let Err(e) = op(arg) {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn render_entry(key: &str, value: &str) -> String {
    if value.contains('\n') {
        format!("  {}:\n{}", key, value)
    } else {
        format!("    {} = {}", key, value)
    }
}
