//! Per-driver shared-key material and the injected key store interface.
//!
//! A [`SharedKey`] is the rider-side half of an ECDH pair established
//! out-of-band (via the follow protocol) with exactly one driver. The rider
//! holds the secret half; the driver holds the matching public half. Both
//! sides derive the same symmetric secret from their own private key and the
//! other's public key, which is what makes point-to-point location
//! encryption work.

use std::collections::HashMap;
use std::sync::Mutex;

use nostr::{Keys, PublicKey, SecretKey, Timestamp};
use subtle::ConstantTimeEq;
use zeroize::ZeroizeOnDrop;

use super::error::{KeyError, Result};

/// Rider-side shared-secret key material for one driver.
///
/// Invariants:
/// - at most one active `SharedKey` exists per driver at a time;
/// - `version` strictly increases on rotation;
/// - absence of a `SharedKey` means the driver has not yet shared one
///   (the rider is "pending").
///
/// # Security
///
/// Secret bytes are zeroized on drop and redacted from `Debug` output.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SharedKey {
    /// The secret half (zeroized on drop).
    secret_bytes: [u8; 32],

    /// The public half held by the driver (not sensitive).
    #[zeroize(skip)]
    public_key: PublicKey,

    /// Key version; strictly increasing on rotation.
    #[zeroize(skip)]
    pub version: u32,

    /// When the driver last rotated this key.
    #[zeroize(skip)]
    pub key_updated_at: Timestamp,
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedKey")
            .field("secret_bytes", &"<redacted>")
            .field("public_key", &self.public_key.to_hex())
            .field("version", &self.version)
            .field("key_updated_at", &self.key_updated_at)
            .finish()
    }
}

impl SharedKey {
    /// Creates a `SharedKey` from raw secret bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes don't represent a valid secret key.
    pub fn from_secret_bytes(
        secret_bytes: [u8; 32],
        version: u32,
        key_updated_at: Timestamp,
    ) -> Result<Self> {
        let secret_key = SecretKey::from_slice(&secret_bytes)
            .map_err(|e| KeyError::InvalidKeyMaterial(e.to_string()))?;
        let public_key = Keys::new(secret_key).public_key();

        Ok(Self {
            secret_bytes,
            public_key,
            version,
            key_updated_at,
        })
    }

    /// Generates a fresh random shared key.
    ///
    /// Uses the operating system's secure random number generator. Used by
    /// the follow protocol when establishing a new pair; the public half is
    /// what gets handed to the driver.
    #[must_use]
    pub fn generate(version: u32, key_updated_at: Timestamp) -> Self {
        use rand::rngs::OsRng;
        use rand::RngCore;

        // Rejection-sample until the bytes form a valid scalar. In practice
        // the first draw succeeds; invalid scalars have probability ~2^-128.
        loop {
            let mut secret_bytes = [0u8; 32];
            OsRng.fill_bytes(&mut secret_bytes);
            if let Ok(key) = Self::from_secret_bytes(secret_bytes, version, key_updated_at) {
                return key;
            }
        }
    }

    /// Returns the public half held by the driver.
    #[must_use]
    pub const fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Reconstructs the secret key for ECDH operations.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored bytes are invalid (only possible if
    /// the store was corrupted after the key was created).
    pub fn secret_key(&self) -> Result<SecretKey> {
        SecretKey::from_slice(&self.secret_bytes)
            .map_err(|e| KeyError::InvalidKeyMaterial(e.to_string()))
    }

    /// Returns a copy of the raw secret bytes for persistence.
    ///
    /// Callers are responsible for zeroizing the copy when done.
    #[must_use]
    pub const fn secret_bytes(&self) -> [u8; 32] {
        self.secret_bytes
    }

    /// Compares secret material in constant time.
    #[must_use]
    pub fn material_eq(&self, other: &Self) -> bool {
        self.secret_bytes.ct_eq(&other.secret_bytes).into()
    }
}

/// Injected `{get, set}`-style store for per-driver shared keys.
///
/// The acceptance pipeline and staleness monitor depend only on this
/// interface, never on ambient process-wide state, so they are testable in
/// isolation per driver.
pub trait KeyStore {
    /// Looks up the active shared key for a driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn shared_key(&self, driver: &PublicKey) -> Result<Option<SharedKey>>;

    /// Stores (or replaces) the active shared key for a driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn put_shared_key(&self, driver: &PublicKey, key: SharedKey) -> Result<()>;

    /// Removes the active shared key for a driver, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn remove_shared_key(&self, driver: &PublicKey) -> Result<()>;
}

/// In-memory key store.
///
/// Used by embedders that keep the roster elsewhere, and by tests.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<PublicKey, SharedKey>>,
}

impl MemoryKeyStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn shared_key(&self, driver: &PublicKey) -> Result<Option<SharedKey>> {
        let keys = self
            .keys
            .lock()
            .map_err(|e| KeyError::Store(format!("Failed to acquire lock: {e}")))?;
        Ok(keys.get(driver).cloned())
    }

    fn put_shared_key(&self, driver: &PublicKey, key: SharedKey) -> Result<()> {
        let mut keys = self
            .keys
            .lock()
            .map_err(|e| KeyError::Store(format!("Failed to acquire lock: {e}")))?;
        keys.insert(*driver, key);
        Ok(())
    }

    fn remove_shared_key(&self, driver: &PublicKey) -> Result<()> {
        let mut keys = self
            .keys
            .lock()
            .map_err(|e| KeyError::Store(format!("Failed to acquire lock: {e}")))?;
        keys.remove(driver);
        Ok(())
    }
}
