//! String-addressable settings over typed configuration fields
//!
//! Commands address configuration by name (`port`, `recipients`) and raw
//! text. This module turns those into typed reads and writes without the
//! caller knowing each field's type.

pub mod descriptor;
pub mod registry;

pub use descriptor::{
    Binding, DictionaryBinding, ScalarBinding, Setting, SettingKind, SettingResult, SettingValue,
};
pub use registry::{SettingsDomain, SettingsRegistry, SettingsSource};
