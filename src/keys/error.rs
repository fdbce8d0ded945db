//! Error types for shared-key operations.

use thiserror::Error;

/// Errors that can occur while handling per-driver shared keys.
#[derive(Error, Debug)]
pub enum KeyError {
    /// Secret key bytes do not form a valid key.
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// The driver's advertised key metadata could not be fetched.
    ///
    /// Recovered per driver: staleness is simply not updated this cycle.
    #[error("Key metadata fetch failed: {0}")]
    MetadataFetch(String),

    /// Key store operation failed.
    #[error("Key store error: {0}")]
    Store(String),
}

/// Result type for key operations.
pub type Result<T> = std::result::Result<T, KeyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_key_material_display() {
        let err = KeyError::InvalidKeyMaterial("bad scalar".to_string());
        assert_eq!(err.to_string(), "Invalid key material: bad scalar");
    }

    #[test]
    fn metadata_fetch_display() {
        let err = KeyError::MetadataFetch("relay timeout".to_string());
        assert_eq!(err.to_string(), "Key metadata fetch failed: relay timeout");
    }

    #[test]
    fn store_display() {
        let err = KeyError::Store("locked".to_string());
        assert_eq!(err.to_string(), "Key store error: locked");
    }
}
