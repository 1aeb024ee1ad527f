//! Field rules: per-field compliance requirements
//!
//! A [`FieldRule`] names a work-item field (prefix plus field name) and a
//! validation pattern its value must match. The pattern is compiled when it
//! is assigned; an invalid pattern is rejected and the previous one stays in
//! effect.

use super::null_as_empty;
use crate::error::SettingError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const PROPERTY_PATH: &str = "path";
const PROPERTY_PREFIX: &str = "prefix";
const PROPERTY_FIELD_NAME: &str = "fieldname";
const PROPERTY_DESCRIPTION: &str = "description";
const PROPERTY_VALIDATION: &str = "validationregex";
const PROPERTY_HELP: &str = "helpmessage";
const PROPERTY_GRACE: &str = "graceperiodinhours";

/// Compliance requirement for one work-item field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "FieldRuleDocument", into = "FieldRuleDocument")]
pub struct FieldRule {
    area_path: String,
    field_prefix: String,
    field_name: String,
    description: String,
    help_message: String,
    pattern: Regex,
    grace_period_hours: i32,
}

impl FieldRule {
    /// Create a rule, compiling its validation pattern
    pub fn new(
        field_name: impl Into<String>,
        validation_pattern: &str,
    ) -> Result<Self, SettingError> {
        Ok(Self {
            area_path: String::new(),
            field_prefix: String::new(),
            field_name: field_name.into(),
            description: String::new(),
            help_message: String::new(),
            pattern: compile(validation_pattern)?,
            grace_period_hours: 0,
        })
    }

    pub fn with_area_path(mut self, area_path: impl Into<String>) -> Self {
        self.area_path = area_path.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.field_prefix = prefix.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_help_message(mut self, help: impl Into<String>) -> Self {
        self.help_message = help.into();
        self
    }

    pub fn with_grace_period_hours(mut self, hours: i32) -> Self {
        self.grace_period_hours = hours;
        self
    }

    pub fn area_path(&self) -> &str {
        &self.area_path
    }

    pub fn field_prefix(&self) -> &str {
        &self.field_prefix
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn help_message(&self) -> &str {
        &self.help_message
    }

    pub fn validation_pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Advisory only; evaluation does not consult it
    pub fn grace_period_hours(&self) -> i32 {
        self.grace_period_hours
    }

    /// Work-item field key this rule inspects
    pub fn lookup_key(&self) -> String {
        format!("{}{}", self.field_prefix, self.field_name.trim())
    }

    /// Replace the validation pattern
    ///
    /// On a compile error the previous pattern is kept.
    pub fn set_validation_pattern(&mut self, pattern: &str) -> Result<(), SettingError> {
        self.pattern = compile(pattern)?;
        Ok(())
    }

    /// Whether a field value satisfies the pattern
    ///
    /// Strings are matched as-is; other JSON values by their JSON text.
    pub fn is_valid(&self, value: &serde_json::Value) -> bool {
        self.pattern.is_match(&stringify(value))
    }

    /// Assign one property by its lowercase command name
    pub fn set_property(&mut self, property: &str, raw: &str) -> Result<(), SettingError> {
        match property.trim().to_lowercase().as_str() {
            PROPERTY_PATH => self.area_path = raw.to_string(),
            PROPERTY_PREFIX => self.field_prefix = raw.to_string(),
            PROPERTY_DESCRIPTION => self.description = raw.to_string(),
            PROPERTY_VALIDATION => self.set_validation_pattern(raw)?,
            PROPERTY_HELP => self.help_message = raw.to_string(),
            PROPERTY_GRACE => {
                self.grace_period_hours = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                    SettingError::format(format!("{}.{}", self.field_name, PROPERTY_GRACE), e.to_string())
                })?;
            }
            PROPERTY_FIELD_NAME => {
                return Err(SettingError::ImmutableField {
                    setting: self.field_name.clone(),
                    property: PROPERTY_FIELD_NAME.to_string(),
                })
            }
            _ => return Err(SettingError::UnknownProperty(property.to_string())),
        }
        Ok(())
    }
}

impl PartialEq for FieldRule {
    fn eq(&self, other: &Self) -> bool {
        self.area_path == other.area_path
            && self.field_prefix == other.field_prefix
            && self.field_name == other.field_name
            && self.description == other.description
            && self.help_message == other.help_message
            && self.pattern.as_str() == other.pattern.as_str()
            && self.grace_period_hours == other.grace_period_hours
    }
}

impl Eq for FieldRule {}

impl fmt::Display for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    Area Path: {}", self.area_path)?;
        writeln!(f, "    Field Name: {}", self.field_name)?;
        writeln!(f, "    Description: {}", self.description)?;
        writeln!(f, "    Validation RegEx: {}", self.pattern.as_str())?;
        writeln!(f, "    Help Text: {}", self.help_message)?;
        write!(f, "    Grace Period in Hours: {}", self.grace_period_hours)
    }
}

fn compile(pattern: &str) -> Result<Regex, SettingError> {
    Regex::new(pattern).map_err(|e| SettingError::RegexCompile {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Persisted shape of a rule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FieldRuleDocument {
    #[serde(deserialize_with = "null_as_empty")]
    field_prefix: String,
    #[serde(deserialize_with = "null_as_empty")]
    area_path: String,
    #[serde(deserialize_with = "null_as_empty")]
    field_name: String,
    #[serde(deserialize_with = "null_as_empty")]
    description: String,
    #[serde(deserialize_with = "null_as_empty")]
    validation_regex: String,
    #[serde(deserialize_with = "null_as_empty")]
    help_message: String,
    grace_period_in_hours: i32,
}

impl TryFrom<FieldRuleDocument> for FieldRule {
    type Error = SettingError;

    fn try_from(doc: FieldRuleDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            area_path: doc.area_path,
            field_prefix: doc.field_prefix,
            field_name: doc.field_name,
            description: doc.description,
            help_message: doc.help_message,
            pattern: compile(&doc.validation_regex)?,
            grace_period_hours: doc.grace_period_in_hours,
        })
    }
}

impl From<FieldRule> for FieldRuleDocument {
    fn from(rule: FieldRule) -> Self {
        Self {
            validation_regex: rule.pattern.as_str().to_string(),
            field_prefix: rule.field_prefix,
            area_path: rule.area_path,
            field_name: rule.field_name,
            description: rule.description,
            help_message: rule.help_message,
            grace_period_in_hours: rule.grace_period_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn priority_rule() -> FieldRule {
        FieldRule::new("Priority", "^[1-4]$")
            .unwrap()
            .with_prefix("Microsoft.VSTS.Common.")
            .with_area_path("Ops\\Tier1")
            .with_description("Priority must be 1-4")
    }

    #[test]
    fn test_lookup_key_trims_name() {
        let rule = FieldRule::new(" Severity ", ".*").unwrap().with_prefix("Custom.");
        assert_eq!(rule.lookup_key(), "Custom.Severity");
    }

    #[test]
    fn test_is_valid_stringifies() {
        let rule = priority_rule();
        assert!(rule.is_valid(&json!("2")));
        assert!(rule.is_valid(&json!(3)));
        assert!(!rule.is_valid(&json!(42)));
        assert!(!rule.is_valid(&json!(null)));
    }

    #[test]
    fn test_invalid_pattern_keeps_previous() {
        let mut rule = priority_rule();
        let err = rule.set_validation_pattern("([").unwrap_err();
        assert!(matches!(err, SettingError::RegexCompile { .. }));
        assert_eq!(rule.validation_pattern(), "^[1-4]$");
        assert!(rule.is_valid(&json!("1")));
    }

    #[test]
    fn test_set_property() {
        let mut rule = priority_rule();
        rule.set_property("Description", "Set a priority").unwrap();
        rule.set_property("graceperiodinhours", "48").unwrap();
        assert_eq!(rule.description(), "Set a priority");
        assert_eq!(rule.grace_period_hours(), 48);

        assert!(matches!(
            rule.set_property("fieldname", "Other"),
            Err(SettingError::ImmutableField { .. })
        ));
        assert!(matches!(
            rule.set_property("colour", "red"),
            Err(SettingError::UnknownProperty(_))
        ));
        assert!(matches!(
            rule.set_property("graceperiodinhours", "soon"),
            Err(SettingError::Format { .. })
        ));
        assert_eq!(rule.grace_period_hours(), 48);
    }

    #[test]
    fn test_document_shape() {
        let value = serde_json::to_value(priority_rule()).unwrap();
        assert_eq!(value["FieldName"], "Priority");
        assert_eq!(value["ValidationRegex"], "^[1-4]$");
        assert_eq!(value["GracePeriodInHours"], 0);

        let back: FieldRule = serde_json::from_value(value).unwrap();
        assert_eq!(back, priority_rule());
    }

    #[test]
    fn test_bad_stored_pattern_rejected() {
        let result: Result<FieldRule, _> =
            serde_json::from_value(json!({"FieldName": "X", "ValidationRegex": "(["}));
        assert!(result.is_err());
    }

    #[test]
    fn test_display_lists_properties() {
        let text = priority_rule().to_string();
        assert!(text.contains("Field Name: Priority"));
        assert!(text.contains("Validation RegEx: ^[1-4]$"));
    }
}
