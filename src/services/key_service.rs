//! Storage key generation.
//!
//! Keys are a 128-bit UUIDv4 encoded as unpadded URL-safe base64 (22 chars),
//! optionally followed by the extension of the uploaded file. The filename
//! itself never contributes to uniqueness, so concurrent uploads of identically
//! named files cannot overwrite each other.

use crate::models::object::StorageKey;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use clap::ValueEnum;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("file `{0}` has no extension and extensionless uploads are disabled")]
    MissingExtension(String),
    #[error(
        "file `{filename}` has extension `{extension}`; extensions may only contain ASCII letters, digits, `-` and `_`"
    )]
    UnsupportedExtension { filename: String, extension: String },
}

/// Whether files without a usable extension may be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExtensionPolicy {
    /// Store the object under the bare random component.
    #[default]
    Allow,
    /// Refuse the upload with a client error.
    Reject,
}

/// Derives storage keys according to the configured [`ExtensionPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyGenerator {
    policy: ExtensionPolicy,
}

impl KeyGenerator {
    pub fn new(policy: ExtensionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ExtensionPolicy {
        self.policy
    }

    pub fn generate(&self, original_filename: &str) -> Result<StorageKey, KeyError> {
        let key = StorageKey::generate(original_filename)?;
        if key.extension().is_none() && self.policy == ExtensionPolicy::Reject {
            return Err(KeyError::MissingExtension(original_filename.to_string()));
        }
        Ok(key)
    }
}

impl StorageKey {
    /// Fresh key for a file called `original_filename`.
    ///
    /// `Uuid::new_v4` draws from a thread-local OS-seeded RNG, so this is safe
    /// to call from any number of concurrent requests.
    pub fn generate(original_filename: &str) -> Result<Self, KeyError> {
        let extension = extension_of(original_filename);
        if let Some(ext) = extension.filter(|ext| !is_key_safe(ext)) {
            return Err(KeyError::UnsupportedExtension {
                filename: original_filename.to_string(),
                extension: ext.to_string(),
            });
        }
        let random = URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes());
        Ok(StorageKey::new(random, extension))
    }
}

/// Extension of `filename`: the text after the last `.` of its final path
/// component, kept verbatim. An empty suffix is no extension.
pub fn extension_of(filename: &str) -> Option<&str> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (_, ext) = base.rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}

/// Extensions end up verbatim in the key and the public link.
fn is_key_safe(ext: &str) -> bool {
    ext.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
