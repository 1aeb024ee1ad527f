//! JSON persistence with field-level encryption
//!
//! The configuration is stored as one pretty-printed JSON document. The
//! fields listed in [`ENCRYPTED_FIELDS`] are encrypted individually with a
//! [`FieldCipher`]; everything else is plain text.
//!
//! # File Format
//!
//! ```json
//! {
//!   "EMailConfig": { "Host": "smtp.contoso.com", "UserName": "<base64>", ... },
//!   "VsoConfig": { "BaseUri": "...", "Token": "<base64>", "ConfigItems": { ... } },
//!   "ControllerConfig": { "PollingInterval": 60, ... }
//! }
//! ```
//!
//! Writes go to a temporary file first and are renamed into place.
//!
//! # Example
//!
//! ```rust,ignore
//! use wire_core::persistence::ConfigStore;
//! use wire_crypto::FieldCipher;
//!
//! let store = ConfigStore::new("wire-config.json", Some(FieldCipher::new("key")?));
//! let mut config = store.load()?;
//! config.set_value("host=smtp.contoso.com")?;
//! store.save(&config)?;
//! ```

use crate::config::Configuration;
use crate::error::{Result, WireError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use wire_crypto::{CryptoError, FieldCipher};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "wire-config.json";

/// `(section, field)` pairs that are encrypted at rest
pub const ENCRYPTED_FIELDS: &[(&str, &str)] = &[
    ("EMailConfig", "UserName"),
    ("EMailConfig", "Password"),
    ("VsoConfig", "Token"),
];

/// Reads and writes the configuration document
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    cipher: Option<FieldCipher>,
}

impl ConfigStore {
    /// Create a store for `path`
    ///
    /// Without a cipher, documents whose encrypted fields are all empty can
    /// still be read and written; anything else fails with
    /// [`CryptoError::KeyNotConfigured`].
    pub fn new(path: impl AsRef<Path>, cipher: Option<FieldCipher>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cipher,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point the store at another file
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = path.as_ref().to_path_buf();
        self
    }

    /// Convert a configuration into its persisted document
    pub fn serialize(&self, config: &Configuration) -> Result<Value> {
        let mut document = serde_json::to_value(config)?;

        for (section, field) in ENCRYPTED_FIELDS {
            if let Some(slot) = document.get_mut(*section).and_then(|s| s.get_mut(*field)) {
                let plain = slot.as_str().unwrap_or_default();
                if !plain.is_empty() {
                    let encrypted = self.cipher()?.encrypt(plain)?;
                    *slot = Value::String(encrypted);
                }
            }
        }

        Ok(document)
    }

    /// Rebuild a configuration from a persisted document
    pub fn deserialize(&self, mut document: Value) -> Result<Configuration> {
        for (section, field) in ENCRYPTED_FIELDS {
            if let Some(slot) = document.get_mut(*section).and_then(|s| s.get_mut(*field)) {
                let stored = match slot {
                    Value::String(s) if !s.is_empty() => s.clone(),
                    _ => continue,
                };
                let plain = self.cipher()?.decrypt(&stored).map_err(|e| match e {
                    CryptoError::InvalidIv(_) => WireError::Crypto(e),
                    other => WireError::corrupt(format!("{}.{}: {}", section, field, other)),
                })?;
                *slot = Value::String(plain);
            }
        }

        serde_json::from_value(document).map_err(|e| WireError::corrupt(e.to_string()))
    }

    /// Load the configuration file
    ///
    /// A missing file yields the default configuration. On any other
    /// failure the error is returned and nothing is replaced.
    pub fn load(&self) -> Result<Configuration> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Configuration file not found, using defaults");
            return Ok(Configuration::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let document: Value = serde_json::from_str(&content)?;
        let config = self.deserialize(document)?;

        info!(path = %self.path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Save the configuration file atomically
    pub fn save(&self, config: &Configuration) -> Result<()> {
        let document = self.serialize(config)?;
        let output = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // Write atomically using temp file
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, output)?;
        std::fs::rename(&temp_path, &self.path)?;

        info!(path = %self.path.display(), "Configuration saved");
        Ok(())
    }

    fn cipher(&self) -> Result<&FieldCipher> {
        self.cipher
            .as_ref()
            .ok_or_else(|| WireError::Crypto(CryptoError::KeyNotConfigured))
    }
}
