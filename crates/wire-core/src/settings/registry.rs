//! Per-domain settings registries
//!
//! Each configuration domain owns one [`SettingsRegistry`] built once at
//! first use. Lookups are case-insensitive. Operations on a name the
//! registry does not hold return `None` so the caller can try another
//! domain; errors from the descriptor itself are returned unchanged.

use super::descriptor::{Setting, SettingKind, SettingResult, SettingValue};
use std::collections::HashMap;

/// Lowercased name -> descriptor for one domain type
#[derive(Debug)]
pub struct SettingsRegistry<D> {
    settings: HashMap<&'static str, Setting<D>>,
}

impl<D> SettingsRegistry<D> {
    /// Build a registry from descriptors
    ///
    /// Descriptor keys are expected to be lowercase already; a later
    /// descriptor with a duplicate key replaces the earlier one.
    pub fn new(settings: Vec<Setting<D>>) -> Self {
        Self {
            settings: settings.into_iter().map(|s| (s.key(), s)).collect(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&Setting<D>> {
        self.settings.get(name.trim().to_lowercase().as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.settings.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn kind(&self, name: &str) -> Option<SettingKind> {
        self.lookup(name).map(Setting::kind)
    }

    /// Display name, or an empty string for an unknown setting
    pub fn display_name(&self, name: &str) -> String {
        self.lookup(name)
            .map(|s| s.display_name().to_string())
            .unwrap_or_default()
    }

    /// Help text, or an empty string for an unknown setting
    pub fn help(&self, name: &str) -> String {
        self.lookup(name).map(Setting::help).unwrap_or_default()
    }

    pub fn get_value(&self, target: &D, name: &str) -> Option<SettingResult<SettingValue>> {
        self.lookup(name).map(|s| s.get(target))
    }

    pub fn entries(&self, target: &D, name: &str) -> Option<SettingResult<Vec<(String, String)>>> {
        self.lookup(name).map(|s| s.entries(target))
    }

    pub fn get_entry(&self, target: &D, name: &str, key: &str) -> Option<SettingResult<String>> {
        self.lookup(name).map(|s| s.get_entry(target, key))
    }

    pub fn set_value(&self, target: &mut D, name: &str, raw: &str) -> Option<SettingResult<()>> {
        self.lookup(name).map(|s| s.set(target, raw))
    }

    pub fn set_entry(
        &self,
        target: &mut D,
        name: &str,
        key: &str,
        raw: &str,
    ) -> Option<SettingResult<()>> {
        self.lookup(name).map(|s| s.set_entry(target, key, raw))
    }

    pub fn delete_entry(&self, target: &mut D, name: &str, key: &str) -> Option<SettingResult<()>> {
        self.lookup(name).map(|s| s.delete_entry(target, key))
    }

    /// Reset a scalar to its zero value or empty a dictionary
    ///
    /// The setting stays registered either way.
    pub fn clear_value(&self, target: &mut D, name: &str) -> Option<SettingResult<()>> {
        self.lookup(name).map(|s| {
            s.clear(target);
            Ok(())
        })
    }
}

/// A configuration domain with a static settings registry
pub trait SettingsDomain: Sized + 'static {
    /// Short domain label used in logs
    const DOMAIN: &'static str;

    fn registry() -> &'static SettingsRegistry<Self>;
}

/// Object-safe view of a domain, used to route names across domains
pub trait SettingsSource {
    fn domain(&self) -> &'static str;
    fn contains(&self, name: &str) -> bool;
    fn keys(&self) -> Vec<&'static str>;
    fn kind(&self, name: &str) -> Option<SettingKind>;
    fn display_name(&self, name: &str) -> String;
    fn help(&self, name: &str) -> String;
    fn get_value(&self, name: &str) -> Option<SettingResult<SettingValue>>;
    fn entries(&self, name: &str) -> Option<SettingResult<Vec<(String, String)>>>;
    fn get_entry(&self, name: &str, key: &str) -> Option<SettingResult<String>>;
    fn set_value(&mut self, name: &str, raw: &str) -> Option<SettingResult<()>>;
    fn set_entry(&mut self, name: &str, key: &str, raw: &str) -> Option<SettingResult<()>>;
    fn delete_entry(&mut self, name: &str, key: &str) -> Option<SettingResult<()>>;
    fn clear_value(&mut self, name: &str) -> Option<SettingResult<()>>;
}

impl<D: SettingsDomain> SettingsSource for D {
    fn domain(&self) -> &'static str {
        D::DOMAIN
    }

    fn contains(&self, name: &str) -> bool {
        D::registry().contains(name)
    }

    fn keys(&self) -> Vec<&'static str> {
        D::registry().keys()
    }

    fn kind(&self, name: &str) -> Option<SettingKind> {
        D::registry().kind(name)
    }

    fn display_name(&self, name: &str) -> String {
        D::registry().display_name(name)
    }

    fn help(&self, name: &str) -> String {
        D::registry().help(name)
    }

    fn get_value(&self, name: &str) -> Option<SettingResult<SettingValue>> {
        D::registry().get_value(self, name)
    }

    fn entries(&self, name: &str) -> Option<SettingResult<Vec<(String, String)>>> {
        D::registry().entries(self, name)
    }

    fn get_entry(&self, name: &str, key: &str) -> Option<SettingResult<String>> {
        D::registry().get_entry(self, name, key)
    }

    fn set_value(&mut self, name: &str, raw: &str) -> Option<SettingResult<()>> {
        D::registry().set_value(self, name, raw)
    }

    fn set_entry(&mut self, name: &str, key: &str, raw: &str) -> Option<SettingResult<()>> {
        D::registry().set_entry(self, name, key, raw)
    }

    fn delete_entry(&mut self, name: &str, key: &str) -> Option<SettingResult<()>> {
        D::registry().delete_entry(self, name, key)
    }

    fn clear_value(&mut self, name: &str) -> Option<SettingResult<()>> {
        D::registry().clear_value(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SettingError;
    use crate::settings::descriptor::{DictionaryBinding, ScalarBinding};
    use std::collections::BTreeMap;
    use std::sync::OnceLock;

    #[derive(Default)]
    struct Demo {
        label: String,
        items: BTreeMap<String, String>,
    }

    impl SettingsDomain for Demo {
        const DOMAIN: &'static str = "demo";

        fn registry() -> &'static SettingsRegistry<Self> {
            static REGISTRY: OnceLock<SettingsRegistry<Demo>> = OnceLock::new();
            REGISTRY.get_or_init(|| {
                SettingsRegistry::new(vec![
                    Setting::scalar(
                        "label",
                        "Label",
                        "A label.",
                        ScalarBinding::Text {
                            get: |d| d.label.clone(),
                            set: |d, v| d.label = v,
                        },
                    ),
                    Setting::dictionary(
                        "items",
                        "Items",
                        "Some items.",
                        DictionaryBinding {
                            entries: |d| {
                                d.items.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
                            },
                            get: |d, k| d.items.get(k).cloned(),
                            set: |d, k, v| {
                                d.items.insert(k.to_string(), v.to_string());
                                Ok(())
                            },
                            remove: |d, k| d.items.remove(k).is_some(),
                            clear: |d| d.items.clear(),
                        },
                    ),
                ])
            })
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let demo = Demo::default();
        assert!(demo.contains("LABEL"));
        assert!(demo.contains("Items"));
        assert!(!demo.contains("missing"));
        assert_eq!(demo.display_name("lAbEl"), "Label");
    }

    #[test]
    fn test_unknown_name_is_none() {
        let mut demo = Demo::default();
        assert!(demo.get_value("nope").is_none());
        assert!(demo.set_value("nope", "x").is_none());
        assert!(demo.clear_value("nope").is_none());
        assert_eq!(demo.help("nope"), "");
        assert_eq!(demo.display_name("nope"), "");
    }

    #[test]
    fn test_clear_keeps_setting_registered() {
        let mut demo = Demo {
            label: "before".into(),
            ..Default::default()
        };
        demo.clear_value("label").unwrap().unwrap();
        assert_eq!(demo.label, "");
        assert!(demo.contains("label"));
        demo.set_value("label", "after").unwrap().unwrap();
        assert_eq!(demo.label, "after");
    }

    #[test]
    fn test_descriptor_errors_propagate() {
        let mut demo = Demo::default();
        let err = demo.delete_entry("items", "x").unwrap().unwrap_err();
        assert_eq!(err, SettingError::key_not_found("items", "x"));
    }

    #[test]
    fn test_keys_sorted() {
        assert_eq!(Demo::default().keys(), vec!["items", "label"]);
    }
}
