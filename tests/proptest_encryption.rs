//! Property-based tests for the point-to-point encryption path.
//!
//! These tests verify:
//! - ECDH key-half symmetry: whatever the driver encrypts with their
//!   identity key and the shared public half, the rider recovers with the
//!   shared secret half and the driver's public key;
//! - decrypted payloads are bit-exact across the whole valid coordinate
//!   space.

// Roundtrip tests intentionally compare deserialized floats for bit-exact
// equality, because serde_json preserves the exact IEEE 754 representation.
#![allow(clippy::float_cmp)]

use nostr::{Keys, Timestamp};
use proptest::prelude::*;

use hail_core::keys::SharedKey;
use hail_core::location::{DriverStatus, LocationUpdate};
use hail_core::nostr::encryption::{decrypt_location_event, encrypt_to_counterparty};
use hail_core::nostr::EncryptedLocationEvent;

fn status_strategy() -> impl Strategy<Value = DriverStatus> {
    prop_oneof![
        Just(DriverStatus::Online),
        Just(DriverStatus::OnRide),
        Just(DriverStatus::Offline),
        Just(DriverStatus::DoNotDisturb),
    ]
}

proptest! {
    // Real secp256k1 keygen plus NIP-44 per case; keep the count moderate.
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: any valid location update encrypted driver-side decrypts
    /// rider-side to the identical update, via swapped ECDH key halves.
    #[test]
    fn any_valid_update_roundtrips_through_swapped_key_halves(
        lat in -90.0f64..=90.0,
        lon in -180.0f64..=180.0,
        status in status_strategy(),
        key_version in 1u32..1000,
    ) {
        let driver = Keys::generate();
        let shared_key = SharedKey::generate(key_version, Timestamp::from(1u64));
        let update = LocationUpdate::new(lat, lon, status, key_version);

        let ciphertext = encrypt_to_counterparty(
            &update.to_json().unwrap(),
            driver.secret_key(),
            &shared_key.public_key(),
        ).unwrap();

        let event = EncryptedLocationEvent::new(
            driver.public_key(),
            Timestamp::from(1000u64),
            ciphertext,
            None,
        );

        let recovered = decrypt_location_event(&shared_key, &driver.public_key(), &event).unwrap();

        prop_assert_eq!(recovered.lat, update.lat);
        prop_assert_eq!(recovered.lon, update.lon);
        prop_assert_eq!(recovered.status, update.status);
        prop_assert_eq!(recovered.key_version, update.key_version);
    }

    /// Property: a third party's key material never decrypts the payload,
    /// for any plaintext.
    #[test]
    fn third_party_key_never_decrypts(
        lat in -90.0f64..=90.0,
        lon in -180.0f64..=180.0,
    ) {
        let driver = Keys::generate();
        let shared_key = SharedKey::generate(1, Timestamp::from(1u64));
        let wrong_key = SharedKey::generate(1, Timestamp::from(1u64));
        let update = LocationUpdate::new(lat, lon, DriverStatus::Online, 1);

        let ciphertext = encrypt_to_counterparty(
            &update.to_json().unwrap(),
            driver.secret_key(),
            &shared_key.public_key(),
        ).unwrap();

        let event = EncryptedLocationEvent::new(
            driver.public_key(),
            Timestamp::from(1000u64),
            ciphertext,
            None,
        );

        prop_assert!(decrypt_location_event(&wrong_key, &driver.public_key(), &event).is_err());
    }
}
