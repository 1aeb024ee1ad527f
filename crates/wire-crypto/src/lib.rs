//! Field-level encryption for WIRE configuration documents
//!
//! Individual string values (credentials, access tokens) are encrypted with
//! AES-256-CBC and PKCS#7 padding. The key is the SHA-256 digest of a
//! passphrase. Every encryption draws a fresh 16-byte IV which is prepended
//! to the ciphertext before base64 encoding:
//!
//! ```text
//! base64( IV[16] || AES-256-CBC(key, IV, plaintext) )
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use wire_crypto::FieldCipher;
//!
//! let cipher = FieldCipher::new("correct horse battery staple")?;
//! let stored = cipher.encrypt("hunter2")?;
//! assert_eq!(cipher.decrypt(&stored)?, "hunter2");
//! ```

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Size of the AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of the CBC initialization vector in bytes
pub const IV_SIZE: usize = 16;

/// Errors raised by the field codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// No usable key was supplied
    #[error("Encryption key not configured")]
    KeyNotConfigured,

    /// The decoded payload is too short to carry an IV
    #[error("Invalid IV: payload holds {0} bytes, at least 16 required")]
    InvalidIv(usize),

    /// The payload is not valid base64 or does not decrypt cleanly
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// The decrypted bytes are not UTF-8 text
    #[error("Decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Key material, wiped from memory on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct FieldKey([u8; KEY_SIZE]);

/// Symmetric codec for individual configuration values
///
/// The cipher holds only the derived key. It is cheap to clone and can be
/// handed to any component that reads or writes the configuration file.
#[derive(Clone)]
pub struct FieldCipher {
    key: FieldKey,
}

impl FieldCipher {
    /// Derive a cipher from a passphrase
    ///
    /// Returns [`CryptoError::KeyNotConfigured`] for an empty passphrase.
    pub fn new(passphrase: &str) -> Result<Self> {
        if passphrase.is_empty() {
            return Err(CryptoError::KeyNotConfigured);
        }

        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest);

        Ok(Self { key: FieldKey(key) })
    }

    /// Encrypt a value with a freshly generated IV
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);
        self.encrypt_with_iv(plaintext, &iv)
    }

    fn encrypt_with_iv(&self, plaintext: &str, iv: &[u8; IV_SIZE]) -> Result<String> {
        let encryptor = Aes256CbcEnc::new_from_slices(&self.key.0, iv)
            .map_err(|_| CryptoError::KeyNotConfigured)?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut payload = Vec::with_capacity(IV_SIZE + ciphertext.len());
        payload.extend_from_slice(iv);
        payload.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(payload))
    }

    /// Decrypt a value produced by [`FieldCipher::encrypt`]
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let payload = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;

        if payload.len() < IV_SIZE {
            return Err(CryptoError::InvalidIv(payload.len()));
        }

        let (iv, ciphertext) = payload.split_at(IV_SIZE);
        let decryptor = Aes256CbcDec::new_from_slices(&self.key.0, iv)
            .map_err(|_| CryptoError::InvalidIv(iv.len()))?;
        let mut plaintext = decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::MalformedCiphertext("bad padding or key".to_string()))?;

        let text = String::from_utf8(plaintext.clone()).map_err(|_| CryptoError::InvalidUtf8);
        plaintext.zeroize();
        text
    }
}

impl fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCipher").field("key", &"<redacted>").finish()
    }
}
