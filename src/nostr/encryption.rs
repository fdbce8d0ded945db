//! NIP-44 point-to-point encryption for location events.
//!
//! The rider holds the secret half of a per-driver shared key; the driver
//! holds the matching public half plus their own identity key. Both sides
//! derive the same NIP-44 conversation key via ECDH:
//!
//! ```text
//! rider:  ECDH(shared_secret_priv, driver_identity_pub)
//! driver: ECDH(driver_identity_priv, shared_secret_pub)
//! ```
//!
//! ECDH commutativity makes these equal, which is the correctness basis for
//! the whole location-sharing sub-protocol.

use nostr::nips::nip44::{self, Version};
use nostr::{PublicKey, SecretKey};

use crate::keys::SharedKey;
use crate::location::LocationUpdate;
use crate::nostr::error::{NostrError, Result};
use crate::nostr::event::EncryptedLocationEvent;

/// Encrypts a plaintext for a counterparty using NIP-44 v2.
///
/// The conversation key is derived via ECDH from `secret_key` and
/// `counterparty`; the returned payload is the standard NIP-44 base64
/// format.
///
/// # Errors
///
/// Returns an error if key derivation or encryption fails.
pub fn encrypt_to_counterparty(
    plaintext: &str,
    secret_key: &SecretKey,
    counterparty: &PublicKey,
) -> Result<String> {
    nip44::encrypt(secret_key, counterparty, plaintext, Version::V2)
        .map_err(|e| NostrError::Encryption(e.to_string()))
}

/// Decrypts a NIP-44 payload from a counterparty.
///
/// # Errors
///
/// Returns an error on malformed ciphertext or authentication-tag mismatch.
pub fn decrypt_from_counterparty(
    ciphertext: &str,
    secret_key: &SecretKey,
    counterparty: &PublicKey,
) -> Result<String> {
    nip44::decrypt(secret_key, counterparty, ciphertext)
        .map_err(|e| NostrError::Decryption(e.to_string()))
}

/// Recovers the plaintext location update from an encrypted broadcast.
///
/// Derives the ECDH shared secret from the rider's shared-key private
/// material and the driver's public identity key, decrypts the ciphertext,
/// and parses the fixed plaintext schema. Side-effect-free.
///
/// # Errors
///
/// Returns a typed failure on malformed ciphertext, MAC mismatch, or an
/// unparsable/invalid plaintext. Never panics on network input.
pub fn decrypt_location_event(
    shared_key: &SharedKey,
    counterparty: &PublicKey,
    event: &EncryptedLocationEvent,
) -> Result<LocationUpdate> {
    let secret_key = shared_key
        .secret_key()
        .map_err(|e| NostrError::KeyDerivation(e.to_string()))?;

    let plaintext = decrypt_from_counterparty(&event.content, &secret_key, counterparty)?;

    let update = LocationUpdate::from_json(&plaintext)
        .map_err(|e| NostrError::Payload(format!("schema mismatch: {e}")))?;
    update.validate().map_err(NostrError::Payload)?;

    Ok(update)
}
