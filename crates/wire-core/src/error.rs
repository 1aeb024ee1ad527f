//! Error types for WIRE
//!
//! Errors are layered. Setting descriptors and domains raise
//! [`SettingError`], collaborators raise [`TransportError`], and the
//! configuration aggregate, persistence layer and polling controller
//! surface everything as [`WireError`].

use thiserror::Error;
use wire_crypto::CryptoError;

/// Errors raised by setting descriptors and configuration domains
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingError {
    /// The raw text could not be parsed as the setting's type
    #[error("Invalid value for '{setting}': {message}")]
    Format { setting: String, message: String },

    /// A validation pattern failed to compile
    #[error("Invalid validation regex '{pattern}': {message}")]
    RegexCompile { pattern: String, message: String },

    /// A dictionary entry does not exist
    #[error("Key '{key}' not found in '{setting}'")]
    KeyNotFound { setting: String, key: String },

    /// The operation does not apply to this kind of setting
    #[error("Setting '{setting}' does not support '{operation}'")]
    UnsupportedOperation {
        setting: String,
        operation: &'static str,
    },

    /// The property can only be set when the entry is created
    #[error("Property '{property}' of '{setting}' cannot be changed after initially created")]
    ImmutableField { setting: String, property: String },

    /// A sub-property name was not recognized
    #[error("Unrecognized property - '{0}'. Please check the spelling of the property name.")]
    UnknownProperty(String),
}

impl SettingError {
    /// Create a format error
    pub fn format(setting: impl Into<String>, message: impl Into<String>) -> Self {
        SettingError::Format {
            setting: setting.into(),
            message: message.into(),
        }
    }

    /// Create a key-not-found error
    pub fn key_not_found(setting: impl Into<String>, key: impl Into<String>) -> Self {
        SettingError::KeyNotFound {
            setting: setting.into(),
            key: key.into(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(setting: impl Into<String>, operation: &'static str) -> Self {
        SettingError::UnsupportedOperation {
            setting: setting.into(),
            operation,
        }
    }
}

/// Errors raised by the work-item backend and the mail transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The remote endpoint could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// The remote endpoint refused the request
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Local I/O failed while talking to the collaborator
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Top-level error type
#[derive(Error, Debug)]
pub enum WireError {
    /// No configuration domain recognizes the setting name
    #[error("Unrecognized property - '{0}'. Please check the spelling of the property name.")]
    Property(String),

    /// A command argument is malformed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A setting operation failed
    #[error(transparent)]
    Setting(#[from] SettingError),

    /// The configuration document is unreadable
    #[error("Corrupt configuration: {0}")]
    CorruptConfig(String),

    /// Field encryption failed
    #[error("Encryption error: {0}")]
    Crypto(#[from] CryptoError),

    /// A collaborator call failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The polling controller refused a transition
    #[error("Controller error: {0}")]
    Controller(String),

    /// A mail template failed to compile or render
    #[error("Template error: {0}")]
    Template(String),

    /// File access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Create an unknown-property error
    pub fn property(name: impl Into<String>) -> Self {
        WireError::Property(name.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        WireError::Parse(msg.into())
    }

    /// Create a corrupt-configuration error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        WireError::CorruptConfig(msg.into())
    }

    /// Create a controller error
    pub fn controller(msg: impl Into<String>) -> Self {
        WireError::Controller(msg.into())
    }

    /// Create a template error
    pub fn template(msg: impl Into<String>) -> Self {
        WireError::Template(msg.into())
    }

    /// Check if this error was caused by user input (vs environment)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            WireError::Property(_)
                | WireError::Parse(_)
                | WireError::Setting(_)
                | WireError::Controller(_)
        )
    }
}

impl From<serde_json::Error> for WireError {
    fn from(err: serde_json::Error) -> Self {
        WireError::CorruptConfig(format!("JSON error: {}", err))
    }
}

/// Result type alias for WIRE operations
pub type Result<T> = std::result::Result<T, WireError>;
