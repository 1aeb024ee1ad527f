//! Setting descriptors
//!
//! A [`Setting`] binds one string-addressable name to a typed field of a
//! configuration domain `D`. Scalar bindings carry a typed getter and setter;
//! the raw command text is parsed into the declared type before the setter
//! runs, so a failed parse never touches the field. Dictionary bindings
//! expose keyed access to a map-valued field.

use crate::error::SettingError;
use std::fmt;

/// Result type for descriptor operations
pub type SettingResult<T> = std::result::Result<T, SettingError>;

/// Whether a setting holds one value or a keyed collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Scalar,
    Dictionary,
}

/// Current value of a scalar setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Int(v) => write!(f, "{}", v),
            SettingValue::Bool(v) => write!(f, "{}", v),
            SettingValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Typed accessors for a scalar field
pub enum ScalarBinding<D> {
    /// Integer field; values outside `min..=max` are rejected
    Int {
        get: fn(&D) -> i64,
        set: fn(&mut D, i64),
        min: i64,
        max: i64,
    },
    Bool {
        get: fn(&D) -> bool,
        set: fn(&mut D, bool),
    },
    Text {
        get: fn(&D) -> String,
        set: fn(&mut D, String),
    },
}

/// Keyed accessors for a map-valued field
pub struct DictionaryBinding<D> {
    /// Every entry, rendered for display
    pub entries: fn(&D) -> Vec<(String, String)>,
    /// One entry, rendered for display
    pub get: fn(&D, &str) -> Option<String>,
    /// Insert or update an entry
    pub set: fn(&mut D, &str, &str) -> SettingResult<()>,
    /// Remove an entry, returning whether it existed
    pub remove: fn(&mut D, &str) -> bool,
    pub clear: fn(&mut D),
}

/// Accessors of a setting; the variant is the setting's kind
pub enum Binding<D> {
    Scalar(ScalarBinding<D>),
    Dictionary(DictionaryBinding<D>),
}

/// Named, typed, self-describing binding to one field of `D`
pub struct Setting<D> {
    key: &'static str,
    display_name: &'static str,
    definition: &'static str,
    binding: Binding<D>,
}

impl<D> Setting<D> {
    /// Create a setting bound to a scalar field
    pub fn scalar(
        key: &'static str,
        display_name: &'static str,
        definition: &'static str,
        binding: ScalarBinding<D>,
    ) -> Self {
        Self {
            key,
            display_name,
            definition,
            binding: Binding::Scalar(binding),
        }
    }

    /// Create a setting bound to a map-valued field
    pub fn dictionary(
        key: &'static str,
        display_name: &'static str,
        definition: &'static str,
        binding: DictionaryBinding<D>,
    ) -> Self {
        Self {
            key,
            display_name,
            definition,
            binding: Binding::Dictionary(binding),
        }
    }

    /// Canonical lowercase name
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    pub fn kind(&self) -> SettingKind {
        match self.binding {
            Binding::Scalar(_) => SettingKind::Scalar,
            Binding::Dictionary(_) => SettingKind::Dictionary,
        }
    }

    /// Full help text, including usage for the setting's kind
    pub fn help(&self) -> String {
        let mut text = format!(
            "SETTING NAME: {}\n\nDISPLAY NAME: {}\n\nDEFINITION: {}\n\n",
            self.key, self.display_name, self.definition
        );

        match self.binding {
            Binding::Scalar(_) => {
                text.push_str(&format!(
                    "To get the current value:\n\n    config get {key}\n\n\
                     To change the value:\n\n    config set {key}=<value>\n\n\
                     To reset the value:\n\n    config clear {key}\n",
                    key = self.key
                ));
            }
            Binding::Dictionary(_) => {
                text.push_str(&format!(
                    "To list all entries:\n\n    config get {key}\n\n\
                     To get one entry:\n\n    config get {key} <key>\n\n\
                     To add or change an entry:\n\n    config set {key} <key>=<value>\n\n\
                     To remove entries:\n\n    config delete {key} <key> [<key>...]\n\n\
                     To remove all entries:\n\n    config clear {key}\n",
                    key = self.key
                ));
            }
        }

        text
    }

    /// Read a scalar value
    pub fn get(&self, target: &D) -> SettingResult<SettingValue> {
        match &self.binding {
            Binding::Scalar(ScalarBinding::Int { get, .. }) => Ok(SettingValue::Int(get(target))),
            Binding::Scalar(ScalarBinding::Bool { get, .. }) => {
                Ok(SettingValue::Bool(get(target)))
            }
            Binding::Scalar(ScalarBinding::Text { get, .. }) => {
                Ok(SettingValue::Text(get(target)))
            }
            Binding::Dictionary(_) => Err(SettingError::unsupported(self.key, "get")),
        }
    }

    /// Parse `raw` as the setting's type and assign it
    pub fn set(&self, target: &mut D, raw: &str) -> SettingResult<()> {
        let scalar = match &self.binding {
            Binding::Scalar(scalar) => scalar,
            Binding::Dictionary(_) => return Err(SettingError::unsupported(self.key, "set")),
        };

        match scalar {
            ScalarBinding::Int { set, min, max, .. } => {
                let value: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| SettingError::format(self.key, e.to_string()))?;
                if value < *min || value > *max {
                    return Err(SettingError::format(
                        self.key,
                        format!("{} is outside the range {}..={}", value, min, max),
                    ));
                }
                set(target, value);
            }
            ScalarBinding::Bool { set, .. } => {
                let value = parse_bool(raw).ok_or_else(|| {
                    SettingError::format(self.key, format!("'{}' is not true or false", raw))
                })?;
                set(target, value);
            }
            ScalarBinding::Text { set, .. } => set(target, raw.to_string()),
        }

        Ok(())
    }

    /// Reset a scalar to its type's zero value, or empty a dictionary
    pub fn clear(&self, target: &mut D) {
        match &self.binding {
            Binding::Scalar(ScalarBinding::Int { set, .. }) => set(target, 0),
            Binding::Scalar(ScalarBinding::Bool { set, .. }) => set(target, false),
            Binding::Scalar(ScalarBinding::Text { set, .. }) => set(target, String::new()),
            Binding::Dictionary(dict) => (dict.clear)(target),
        }
    }

    /// List every dictionary entry
    pub fn entries(&self, target: &D) -> SettingResult<Vec<(String, String)>> {
        let dict = self.dictionary_binding("entries")?;
        Ok((dict.entries)(target))
    }

    /// Read one dictionary entry
    pub fn get_entry(&self, target: &D, key: &str) -> SettingResult<String> {
        let dict = self.dictionary_binding("get entry")?;
        (dict.get)(target, key).ok_or_else(|| SettingError::key_not_found(self.key, key))
    }

    /// Insert or update one dictionary entry
    pub fn set_entry(&self, target: &mut D, key: &str, raw: &str) -> SettingResult<()> {
        let dict = self.dictionary_binding("set entry")?;
        (dict.set)(target, key, raw)
    }

    /// Remove one dictionary entry
    pub fn delete_entry(&self, target: &mut D, key: &str) -> SettingResult<()> {
        let dict = self.dictionary_binding("delete")?;
        if (dict.remove)(target, key) {
            Ok(())
        } else {
            Err(SettingError::key_not_found(self.key, key))
        }
    }

    /// Remove all dictionary entries
    pub fn clear_entries(&self, target: &mut D) -> SettingResult<()> {
        let dict = self.dictionary_binding("clear entries")?;
        (dict.clear)(target);
        Ok(())
    }

    fn dictionary_binding(&self, operation: &'static str) -> SettingResult<&DictionaryBinding<D>> {
        match &self.binding {
            Binding::Dictionary(dict) => Ok(dict),
            Binding::Scalar(_) => Err(SettingError::unsupported(self.key, operation)),
        }
    }
}

impl<D> fmt::Debug for Setting<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setting")
            .field("key", &self.key)
            .field("display_name", &self.display_name)
            .field("kind", &self.kind())
            .finish()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct Sample {
        count: u16,
        enabled: bool,
        name: String,
        tags: BTreeMap<String, String>,
    }

    fn count() -> Setting<Sample> {
        Setting::scalar(
            "count",
            "Count",
            "A small number.",
            ScalarBinding::Int {
                get: |s| i64::from(s.count),
                set: |s, v| s.count = v as u16,
                min: 0,
                max: i64::from(u16::MAX),
            },
        )
    }

    fn enabled() -> Setting<Sample> {
        Setting::scalar(
            "enabled",
            "Enabled",
            "A flag.",
            ScalarBinding::Bool {
                get: |s| s.enabled,
                set: |s, v| s.enabled = v,
            },
        )
    }

    fn name() -> Setting<Sample> {
        Setting::scalar(
            "name",
            "Name",
            "Some text.",
            ScalarBinding::Text {
                get: |s| s.name.clone(),
                set: |s, v| s.name = v,
            },
        )
    }

    fn tags() -> Setting<Sample> {
        Setting::dictionary(
            "tags",
            "Tags",
            "Keyed text.",
            DictionaryBinding {
                entries: |s| s.tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                get: |s, k| s.tags.get(k).cloned(),
                set: |s, k, v| {
                    s.tags.insert(k.to_string(), v.to_string());
                    Ok(())
                },
                remove: |s, k| s.tags.remove(k).is_some(),
                clear: |s| s.tags.clear(),
            },
        )
    }

    #[test]
    fn test_int_set_and_get() {
        let mut sample = Sample::default();
        count().set(&mut sample, " 25 ").unwrap();
        assert_eq!(count().get(&sample).unwrap(), SettingValue::Int(25));
    }

    #[test]
    fn test_int_format_error_leaves_field() {
        let mut sample = Sample {
            count: 7,
            ..Default::default()
        };
        let err = count().set(&mut sample, "abc").unwrap_err();
        assert!(matches!(err, SettingError::Format { .. }));
        assert_eq!(sample.count, 7);
    }

    #[test]
    fn test_int_range_enforced() {
        let mut sample = Sample::default();
        assert!(count().set(&mut sample, "70000").is_err());
        assert!(count().set(&mut sample, "-1").is_err());
        assert_eq!(sample.count, 0);
    }

    #[test]
    fn test_bool_parse() {
        let mut sample = Sample::default();
        enabled().set(&mut sample, "TRUE").unwrap();
        assert!(sample.enabled);
        assert!(enabled().set(&mut sample, "yes").is_err());
        assert!(sample.enabled);
    }

    #[test]
    fn test_clear_resets_scalars() {
        let mut sample = Sample {
            count: 3,
            enabled: true,
            name: "x".into(),
            ..Default::default()
        };
        count().clear(&mut sample);
        enabled().clear(&mut sample);
        name().clear(&mut sample);
        assert_eq!(sample.count, 0);
        assert!(!sample.enabled);
        assert!(sample.name.is_empty());
    }

    #[test]
    fn test_dictionary_operations() {
        let mut sample = Sample::default();
        let tags = tags();
        tags.set_entry(&mut sample, "a", "1").unwrap();
        tags.set_entry(&mut sample, "b", "2").unwrap();
        assert_eq!(tags.get_entry(&sample, "a").unwrap(), "1");
        assert_eq!(tags.entries(&sample).unwrap().len(), 2);

        tags.delete_entry(&mut sample, "a").unwrap();
        assert!(matches!(
            tags.get_entry(&sample, "a"),
            Err(SettingError::KeyNotFound { .. })
        ));
        assert!(matches!(
            tags.delete_entry(&mut sample, "a"),
            Err(SettingError::KeyNotFound { .. })
        ));

        tags.clear_entries(&mut sample).unwrap();
        tags.clear_entries(&mut sample).unwrap();
        assert!(sample.tags.is_empty());
    }

    #[test]
    fn test_kind_mismatch_is_unsupported() {
        let mut sample = Sample::default();
        assert!(matches!(
            tags().get(&sample),
            Err(SettingError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            tags().set(&mut sample, "x"),
            Err(SettingError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            name().set_entry(&mut sample, "k", "v"),
            Err(SettingError::UnsupportedOperation { .. })
        ));
        assert!(matches!(
            name().clear_entries(&mut sample),
            Err(SettingError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_help_mentions_usage() {
        let help = tags().help();
        assert!(help.starts_with("SETTING NAME: tags"));
        assert!(help.contains("DISPLAY NAME: Tags"));
        assert!(help.contains("config delete tags"));
        assert!(name().help().contains("config set name=<value>"));
    }

    proptest::proptest! {
        #[test]
        fn prop_int_in_range_is_stored(value in 0i64..=i64::from(u16::MAX)) {
            let mut sample = Sample::default();
            count().set(&mut sample, &value.to_string()).unwrap();
            proptest::prop_assert_eq!(count().get(&sample).unwrap(), SettingValue::Int(value));
        }

        #[test]
        fn prop_int_out_of_range_is_rejected(value in i64::from(u16::MAX) + 1..i64::MAX) {
            let mut sample = Sample { count: 7, ..Default::default() };
            proptest::prop_assert!(count().set(&mut sample, &value.to_string()).is_err());
            proptest::prop_assert_eq!(sample.count, 7);
        }
    }
}
