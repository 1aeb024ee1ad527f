//! Mail domain: SMTP connection and reminder recipients

use super::null_as_empty;
use crate::settings::{DictionaryBinding, ScalarBinding, Setting, SettingsDomain, SettingsRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Outbound mail settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MailConfig {
    #[serde(deserialize_with = "null_as_empty")]
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    #[serde(deserialize_with = "null_as_empty")]
    pub from_email: String,
    /// Encrypted at rest
    #[serde(deserialize_with = "null_as_empty")]
    pub user_name: String,
    /// Encrypted at rest
    #[serde(deserialize_with = "null_as_empty")]
    pub password: String,
    /// Work-item display name -> email address
    pub recipients: BTreeMap<String, String>,
}

impl MailConfig {
    /// Email address configured for an assignee
    pub fn recipient(&self, display_name: &str) -> Option<&str> {
        self.recipients.get(display_name).map(String::as_str)
    }
}

impl SettingsDomain for MailConfig {
    const DOMAIN: &'static str = "mail";

    fn registry() -> &'static SettingsRegistry<Self> {
        static REGISTRY: OnceLock<SettingsRegistry<MailConfig>> = OnceLock::new();
        REGISTRY.get_or_init(build_registry)
    }
}

fn build_registry() -> SettingsRegistry<MailConfig> {
    SettingsRegistry::new(vec![
        Setting::scalar(
            "host",
            "Host",
            "Name of the SMTP server used to send emails, for example smtp.contoso.com.",
            ScalarBinding::Text {
                get: |c| c.host.clone(),
                set: |c, v| c.host = v,
            },
        ),
        Setting::scalar(
            "port",
            "Port",
            "Port over which the mail server communicates. Common values are 25 (relay), \
             465 (implicit TLS), 587 (submission with STARTTLS) and 2525.",
            ScalarBinding::Int {
                get: |c| i64::from(c.port),
                set: |c, v| c.port = v as u16,
                min: 0,
                max: i64::from(u16::MAX),
            },
        ),
        Setting::scalar(
            "ssl",
            "SSL",
            "Whether the connection to the mail server is encrypted (true or false).",
            ScalarBinding::Bool {
                get: |c| c.ssl,
                set: |c, v| c.ssl = v,
            },
        ),
        Setting::scalar(
            "fromemail",
            "From Email",
            "Address from which reminders are sent.",
            ScalarBinding::Text {
                get: |c| c.from_email.clone(),
                set: |c, v| c.from_email = v,
            },
        ),
        Setting::scalar(
            "username",
            "User Name",
            "Account used to authenticate with the mail server. Stored encrypted.",
            ScalarBinding::Text {
                get: |c| c.user_name.clone(),
                set: |c, v| c.user_name = v,
            },
        ),
        Setting::scalar(
            "password",
            "Password",
            "Password used to authenticate with the mail server. Stored encrypted.",
            ScalarBinding::Text {
                get: |c| c.password.clone(),
                set: |c, v| c.password = v,
            },
        ),
        Setting::dictionary(
            "recipients",
            "Recipients",
            "People who receive reminders for their own assigned work items, as \
             <user name>=<email address>. The user name must match the assignee shown \
             on the work item, for example \"John Doe=john.doe@contoso.com\".",
            DictionaryBinding {
                entries: |c| {
                    c.recipients
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                },
                get: |c, k| c.recipients.get(k).cloned(),
                set: |c, k, v| {
                    c.recipients.insert(k.to_string(), v.to_string());
                    Ok(())
                },
                remove: |c, k| c.recipients.remove(k).is_some(),
                clear: |c| c.recipients.clear(),
            },
        ),
    ])
}
