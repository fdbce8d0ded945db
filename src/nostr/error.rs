//! Error types for Nostr event and encryption operations.

use thiserror::Error;

/// Errors that can occur while building or decrypting location events.
#[derive(Error, Debug)]
pub enum NostrError {
    /// Encryption operation failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Decryption operation failed (malformed ciphertext or MAC mismatch).
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// ECDH conversation key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Event signing failed.
    #[error("Event signing failed: {0}")]
    Signing(String),

    /// Decrypted plaintext did not match the location payload schema.
    #[error("Invalid payload: {0}")]
    Payload(String),

    /// Serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid event structure or content.
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Hex encoding/decoding error.
    #[error("Hex encoding error: {0}")]
    HexError(String),
}

/// Result type for Nostr operations.
pub type Result<T> = std::result::Result<T, NostrError>;

impl From<hex::FromHexError> for NostrError {
    fn from(e: hex::FromHexError) -> Self {
        Self::HexError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_encryption() {
        let err = NostrError::Encryption("cipher failed".to_string());
        assert_eq!(err.to_string(), "Encryption failed: cipher failed");
    }

    #[test]
    fn error_display_decryption() {
        let err = NostrError::Decryption("invalid mac".to_string());
        assert_eq!(err.to_string(), "Decryption failed: invalid mac");
    }

    #[test]
    fn error_display_payload() {
        let err = NostrError::Payload("latitude out of range".to_string());
        assert_eq!(err.to_string(), "Invalid payload: latitude out of range");
    }

    #[test]
    fn error_display_invalid_event() {
        let err = NostrError::InvalidEvent("wrong kind".to_string());
        assert_eq!(err.to_string(), "Invalid event: wrong kind");
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: NostrError = json_err.into();
        assert!(matches!(err, NostrError::Serialization(_)));
    }

    #[test]
    fn error_from_hex() {
        let hex_err = hex::decode("not valid hex").unwrap_err();
        let err: NostrError = hex_err.into();
        assert!(matches!(err, NostrError::HexError(_)));
    }

    #[test]
    fn error_display_key_derivation() {
        let err = NostrError::KeyDerivation("invalid point".to_string());
        assert_eq!(err.to_string(), "Key derivation failed: invalid point");
    }

    #[test]
    fn error_display_signing() {
        let err = NostrError::Signing("signer unavailable".to_string());
        assert_eq!(err.to_string(), "Event signing failed: signer unavailable");
    }
}
