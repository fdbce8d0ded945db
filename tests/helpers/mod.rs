//! Reusable test helpers for pipeline and staleness integration tests.
//!
//! These helpers use REAL NIP-44 crypto. Each driver fixture carries its
//! own identity keys and shared key, exactly as an established follow pair
//! would in production. No mocking is needed.

// Not every test crate uses every helper.
#![allow(dead_code)]

use nostr::{Keys, PublicKey, Timestamp};

use hail_core::keys::{KeyStore, MemoryKeyStore, SharedKey};
use hail_core::location::{DriverStatus, LocationUpdate};
use hail_core::nostr::encryption::encrypt_to_counterparty;
use hail_core::nostr::EncryptedLocationEvent;

/// One driver with an established follow pair: identity keys on the driver
/// side, a shared key the rider holds.
pub struct DriverFixture {
    pub keys: Keys,
    pub shared_key: SharedKey,
}

impl DriverFixture {
    /// Creates a driver with a freshly generated shared key.
    ///
    /// The rotation timestamp is nonzero so staleness comparisons against
    /// advertised metadata behave as they would for a real follow pair.
    pub fn new(key_version: u32) -> Self {
        Self {
            keys: Keys::generate(),
            shared_key: SharedKey::generate(key_version, Timestamp::from(1_000u64)),
        }
    }

    pub fn pubkey(&self) -> PublicKey {
        self.keys.public_key()
    }

    /// Registers this driver's shared key in a rider-side store.
    pub fn register_in(&self, store: &MemoryKeyStore) {
        store
            .put_shared_key(&self.pubkey(), self.shared_key.clone())
            .expect("store must accept the key");
    }

    /// Builds an encrypted location event as this driver would broadcast it.
    pub fn broadcast(
        &self,
        lat: f64,
        lon: f64,
        status: DriverStatus,
        created_at: u64,
    ) -> EncryptedLocationEvent {
        self.broadcast_with_expiration(lat, lon, status, created_at, None)
    }

    /// Like [`broadcast`](Self::broadcast) with an explicit expiration tag.
    pub fn broadcast_with_expiration(
        &self,
        lat: f64,
        lon: f64,
        status: DriverStatus,
        created_at: u64,
        expiration: Option<u64>,
    ) -> EncryptedLocationEvent {
        let update = LocationUpdate::new(lat, lon, status, self.shared_key.version);
        let ciphertext = encrypt_to_counterparty(
            &update.to_json().expect("update must serialize"),
            self.keys.secret_key(),
            &self.shared_key.public_key(),
        )
        .expect("encryption must succeed");

        EncryptedLocationEvent::new(
            self.pubkey(),
            Timestamp::from(created_at),
            ciphertext,
            expiration.map(Timestamp::from),
        )
    }
}
