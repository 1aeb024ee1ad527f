//! Configuration aggregate
//!
//! [`Configuration`] composes the three domains (mail, backend connection,
//! scheduler) and routes a setting name to the first domain that claims it,
//! always in that order. A name no domain claims is a
//! [`WireError::Property`] error.
//!
//! Every operation returns a `Result`. When an [`EventSink`] is attached,
//! failures are also forwarded to it and successful changes produce a
//! confirmation message.
//!
//! # Example
//!
//! ```rust,ignore
//! use wire_core::Configuration;
//!
//! let mut config = Configuration::default();
//! config.set_value("port=587")?;
//! config.set_entry("recipients", "John Doe=john.doe@contoso.com")?;
//! assert_eq!(config.get_value("PORT")?.to_string(), "587");
//! ```

pub mod backend;
pub mod mail;
pub mod rule;
pub mod scheduler;

use crate::error::{Result, WireError};
use crate::events::EventSink;
use crate::settings::{SettingKind, SettingResult, SettingValue, SettingsSource};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub use backend::BackendConfig;
pub use mail::MailConfig;
pub use rule::FieldRule;
pub use scheduler::SchedulerConfig;

/// Settings whose values are masked in confirmations
const SENSITIVE_SETTINGS: &[&str] = &["username", "password", "token"];

const MASK: &str = "********";

/// Deserialize a string that may be `null` in older documents
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// All configuration domains, addressed by setting name
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(rename = "EMailConfig", default)]
    pub mail: MailConfig,

    #[serde(rename = "VsoConfig", default)]
    pub backend: BackendConfig,

    #[serde(rename = "ControllerConfig", default)]
    pub scheduler: SchedulerConfig,

    #[serde(skip)]
    events: Option<Arc<dyn EventSink>>,
}

impl Configuration {
    /// Attach an event sink
    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Replace or detach the event sink
    pub fn set_events(&mut self, sink: Option<Arc<dyn EventSink>>) {
        self.events = sink;
    }

    pub fn events(&self) -> Option<&Arc<dyn EventSink>> {
        self.events.as_ref()
    }

    /// Replace the settings with another configuration's, keeping this sink
    pub fn replace_settings(&mut self, other: Configuration) {
        self.mail = other.mail;
        self.backend = other.backend;
        self.scheduler = other.scheduler;
    }

    fn domains(&self) -> [&dyn SettingsSource; 3] {
        [&self.mail, &self.backend, &self.scheduler]
    }

    fn domains_mut(&mut self) -> [&mut dyn SettingsSource; 3] {
        [&mut self.mail, &mut self.backend, &mut self.scheduler]
    }

    /// Whether any domain recognizes the name
    pub fn contains(&self, name: &str) -> bool {
        self.domains().iter().any(|d| d.contains(name))
    }

    /// Every setting name, grouped by domain in routing order
    pub fn setting_names(&self) -> Vec<&'static str> {
        self.domains().iter().flat_map(|d| d.keys()).collect()
    }

    pub fn kind(&self, name: &str) -> Result<SettingKind> {
        self.dispatch(name, |d| d.kind(name).map(Ok))
    }

    pub fn display_name(&self, name: &str) -> Result<String> {
        self.dispatch(name, |d| d.contains(name).then(|| Ok(d.display_name(name))))
    }

    /// Help text for a setting
    pub fn help(&self, name: &str) -> Result<String> {
        self.dispatch(name, |d| d.contains(name).then(|| Ok(d.help(name))))
    }

    pub fn get_value(&self, name: &str) -> Result<SettingValue> {
        self.dispatch(name, |d| d.get_value(name))
    }

    /// All entries of a dictionary setting
    pub fn entries(&self, name: &str) -> Result<Vec<(String, String)>> {
        self.dispatch(name, |d| d.entries(name))
    }

    pub fn get_entry(&self, name: &str, key: &str) -> Result<String> {
        self.dispatch(name, |d| d.get_entry(name, key))
    }

    /// Apply `name=value`, splitting on the first `=`
    pub fn set_value(&mut self, assignment: &str) -> Result<()> {
        let (name, value) = match split_assignment(assignment) {
            Ok(pair) => pair,
            Err(e) => return self.observe(Err(e)),
        };

        self.dispatch_mut(name, |d| d.set_value(name, value))?;
        self.confirm(format!(
            "Setting {} successfully changed to {}",
            name,
            masked(name, value)
        ));
        Ok(())
    }

    /// Apply `key=value` to the dictionary setting `category`
    pub fn set_entry(&mut self, category: &str, assignment: &str) -> Result<()> {
        let (key, value) = match split_assignment(assignment) {
            Ok(pair) => pair,
            Err(e) => return self.observe(Err(e)),
        };

        self.dispatch_mut(category, |d| d.set_entry(category, key, value))?;
        self.confirm(format!(
            "Setting {}: {} successfully changed to {}",
            category, key, value
        ));
        Ok(())
    }

    /// Remove one entry from the dictionary setting `category`
    pub fn delete_value(&mut self, category: &str, key: &str) -> Result<()> {
        self.dispatch_mut(category, |d| d.delete_entry(category, key))?;
        self.confirm(format!("Setting {}: {} successfully deleted", category, key));
        Ok(())
    }

    /// Empty a dictionary, or reset a scalar to its zero value
    pub fn clear_value(&mut self, name: &str) -> Result<()> {
        self.dispatch_mut(name, |d| d.clear_value(name))?;
        self.confirm(format!("Setting {} successfully cleared", name));
        Ok(())
    }

    fn dispatch<T>(
        &self,
        name: &str,
        op: impl Fn(&dyn SettingsSource) -> Option<SettingResult<T>>,
    ) -> Result<T> {
        let result = self
            .domains()
            .into_iter()
            .find_map(op)
            .ok_or_else(|| WireError::property(name.trim()))
            .and_then(|r| r.map_err(WireError::from));
        self.observe(result)
    }

    fn dispatch_mut<T>(
        &mut self,
        name: &str,
        mut op: impl FnMut(&mut dyn SettingsSource) -> Option<SettingResult<T>>,
    ) -> Result<T> {
        let mut domain = "";
        let result = self
            .domains_mut()
            .into_iter()
            .find_map(|d| {
                let outcome = op(&mut *d);
                if outcome.is_some() {
                    domain = d.domain();
                }
                outcome
            })
            .ok_or_else(|| WireError::property(name.trim()))
            .and_then(|r| r.map_err(WireError::from));

        if result.is_ok() {
            debug!(setting = name, domain, "Setting updated");
        }
        self.observe(result)
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let (Err(err), Some(sink)) = (&result, &self.events) {
            sink.error(err);
        }
        result
    }

    fn confirm(&self, message: String) {
        if let Some(sink) = &self.events {
            sink.message(&message);
        }
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.mail == other.mail && self.backend == other.backend && self.scheduler == other.scheduler
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("mail", &self.mail)
            .field("backend", &self.backend)
            .field("scheduler", &self.scheduler)
            .field("events", &self.events.is_some())
            .finish()
    }
}

fn split_assignment(assignment: &str) -> Result<(&str, &str)> {
    assignment
        .split_once('=')
        .map(|(name, value)| (name.trim(), value))
        .ok_or_else(|| {
            WireError::parse(format!(
                "'{}' must have the form <name>=<value>",
                assignment
            ))
        })
}

fn masked<'a>(name: &str, value: &'a str) -> &'a str {
    if SENSITIVE_SETTINGS.contains(&name.to_lowercase().as_str()) {
        MASK
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettingError;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recorder {
        errors: Mutex<Vec<String>>,
        messages: Mutex<Vec<String>>,
    }

    impl EventSink for Recorder {
        fn error(&self, error: &WireError) {
            self.errors.lock().unwrap().push(error.to_string());
        }

        fn message(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn test_routing_order_and_unknown() {
        let config = Configuration::default();
        assert!(config.contains("HOST"));
        assert!(config.contains("configitems"));
        assert!(config.contains("logfolder"));
        assert!(matches!(
            config.get_value("hots"),
            Err(WireError::Property(name)) if name == "hots"
        ));
    }

    #[test]
    fn test_setting_names_grouped() {
        let names = Configuration::default().setting_names();
        assert_eq!(names.len(), 16);
        assert_eq!(names.first(), Some(&"fromemail"));
        assert_eq!(names.last(), Some(&"reportinginterval"));
    }

    #[test]
    fn test_split_on_first_equals() {
        let mut config = Configuration::default();
        config.set_value("token=abc=def").unwrap();
        assert_eq!(config.backend.token, "abc=def");
    }

    #[test]
    fn test_missing_equals_is_parse_error() {
        let mut config = Configuration::default();
        assert!(matches!(
            config.set_value("port"),
            Err(WireError::Parse(_))
        ));
    }

    #[test]
    fn test_errors_forwarded_to_sink() {
        let sink = Arc::new(Recorder::default());
        let mut config = Configuration::default().with_events(sink.clone());

        let err = config.set_value("port=abc").unwrap_err();
        assert!(matches!(err, WireError::Setting(SettingError::Format { .. })));
        assert_eq!(sink.errors.lock().unwrap().len(), 1);

        config.set_value("port=25").unwrap();
        assert_eq!(
            sink.messages.lock().unwrap().as_slice(),
            ["Setting port successfully changed to 25"]
        );
    }

    #[test]
    fn test_sensitive_values_masked() {
        let sink = Arc::new(Recorder::default());
        let mut config = Configuration::default().with_events(sink.clone());
        config.set_value("Password=hunter2").unwrap();
        let messages = sink.messages.lock().unwrap();
        assert!(!messages[0].contains("hunter2"));
        assert_eq!(config.mail.password, "hunter2");
    }

    #[test]
    fn test_help_unknown_is_property_error() {
        let config = Configuration::default();
        assert!(matches!(config.help("nothing"), Err(WireError::Property(ref n)) if n == "nothing"));
        assert!(config
            .help("recipients")
            .unwrap()
            .contains("DISPLAY NAME: Recipients"));
    }

    #[test]
    fn test_equality_ignores_sink() {
        let a = Configuration::default();
        let b = Configuration::default().with_events(Arc::new(Recorder::default()));
        assert_eq!(a, b);
    }
}
