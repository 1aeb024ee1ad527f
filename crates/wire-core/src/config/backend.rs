//! Backend-connection domain: work-item server and field rules

use super::null_as_empty;
use super::rule::FieldRule;
use crate::error::SettingError;
use crate::settings::{DictionaryBinding, ScalarBinding, Setting, SettingsDomain, SettingsRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Work-item server settings and the rules checked on each pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BackendConfig {
    #[serde(deserialize_with = "null_as_empty")]
    pub base_uri: String,
    pub prompt_for_login: bool,
    /// Encrypted at rest
    #[serde(deserialize_with = "null_as_empty")]
    pub token: String,
    /// Field name -> rule
    pub config_items: BTreeMap<String, FieldRule>,
}

impl BackendConfig {
    /// Distinct area paths across all rules, in first-seen order
    pub fn area_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for rule in self.config_items.values() {
            if !paths.iter().any(|p| p == rule.area_path()) {
                paths.push(rule.area_path().to_string());
            }
        }
        paths
    }

    /// Add or replace a rule, keyed by its field name
    pub fn insert_rule(&mut self, rule: FieldRule) {
        self.config_items.insert(rule.field_name().to_string(), rule);
    }
}

impl SettingsDomain for BackendConfig {
    const DOMAIN: &'static str = "backend";

    fn registry() -> &'static SettingsRegistry<Self> {
        static REGISTRY: OnceLock<SettingsRegistry<BackendConfig>> = OnceLock::new();
        REGISTRY.get_or_init(build_registry)
    }
}

/// Apply `<field name>.<property>=<value>` to an existing rule
fn set_rule_property(config: &mut BackendConfig, key: &str, raw: &str) -> Result<(), SettingError> {
    let (field, property) = key.rsplit_once('.').ok_or_else(|| {
        SettingError::format(
            "configitems",
            format!("'{}' must have the form <field name>.<property>", key),
        )
    })?;

    let rule = config
        .config_items
        .get_mut(field)
        .ok_or_else(|| SettingError::key_not_found("configitems", field))?;

    rule.set_property(property, raw)
}

fn build_registry() -> SettingsRegistry<BackendConfig> {
    SettingsRegistry::new(vec![
        Setting::scalar(
            "baseuri",
            "Base URI",
            "Address of the work-item server, for example https://contoso.visualstudio.com.",
            ScalarBinding::Text {
                get: |c| c.base_uri.clone(),
                set: |c, v| c.base_uri = v,
            },
        ),
        Setting::scalar(
            "prompt",
            "Login Prompt",
            "Whether to prompt for interactive login instead of using the access token \
             (true or false).",
            ScalarBinding::Bool {
                get: |c| c.prompt_for_login,
                set: |c, v| c.prompt_for_login = v,
            },
        ),
        Setting::scalar(
            "token",
            "Personal Authentication Token",
            "Personal access token used to query the work-item server. Stored encrypted.",
            ScalarBinding::Text {
                get: |c| c.token.clone(),
                set: |c, v| c.token = v,
            },
        ),
        Setting::dictionary(
            "configitems",
            "Config Items",
            "Rules checked against each work item, keyed by field name. Properties of an \
             existing rule are changed with <field name>.<property>=<value>, where property \
             is one of path, prefix, description, validationregex, helpmessage or \
             graceperiodinhours. The field name itself cannot be changed.",
            DictionaryBinding {
                entries: |c| {
                    c.config_items
                        .iter()
                        .map(|(k, rule)| (k.clone(), rule.to_string()))
                        .collect()
                },
                get: |c, k| c.config_items.get(k).map(ToString::to_string),
                set: set_rule_property,
                remove: |c, k| c.config_items.remove(k).is_some(),
                clear: |c| c.config_items.clear(),
            },
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsSource;

    fn with_rules() -> BackendConfig {
        let mut backend = BackendConfig::default();
        backend.insert_rule(
            FieldRule::new("Priority", "^[1-4]$")
                .unwrap()
                .with_area_path("Ops"),
        );
        backend.insert_rule(
            FieldRule::new("Severity", ".+")
                .unwrap()
                .with_area_path("Ops"),
        );
        backend.insert_rule(FieldRule::new("Tags", ".*").unwrap().with_area_path("Dev"));
        backend
    }

    #[test]
    fn test_distinct_area_paths() {
        assert_eq!(with_rules().area_paths(), vec!["Ops", "Dev"]);
    }

    #[test]
    fn test_rule_property_update() {
        let mut backend = with_rules();
        backend
            .set_entry("configitems", "Priority.description", "Pick 1-4")
            .unwrap()
            .unwrap();
        assert_eq!(backend.config_items["Priority"].description(), "Pick 1-4");
    }

    #[test]
    fn test_rule_property_errors() {
        let mut backend = with_rules();
        assert!(matches!(
            backend.set_entry("configitems", "Missing.path", "x").unwrap(),
            Err(SettingError::KeyNotFound { .. })
        ));
        assert!(matches!(
            backend.set_entry("configitems", "Priority", "x").unwrap(),
            Err(SettingError::Format { .. })
        ));
        assert!(matches!(
            backend.set_entry("configitems", "Priority.fieldname", "x").unwrap(),
            Err(SettingError::ImmutableField { .. })
        ));
    }

    #[test]
    fn test_regex_error_retains_pattern() {
        let mut backend = with_rules();
        let err = backend
            .set_entry("configitems", "Priority.validationregex", "([")
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, SettingError::RegexCompile { .. }));
        assert_eq!(
            backend.config_items["Priority"].validation_pattern(),
            "^[1-4]$"
        );
    }

    #[test]
    fn test_get_entry_renders_rule() {
        let backend = with_rules();
        let text = backend.get_entry("configitems", "Tags").unwrap().unwrap();
        assert!(text.contains("Area Path: Dev"));
    }
}
