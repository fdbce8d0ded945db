//! Nostr protocol layer: NIP-44 point-to-point encryption and the event
//! kinds/builders of the location-sharing sub-protocol.
//!
//! # Architecture
//!
//! ```text
//! LocationUpdate → JSON plaintext
//!                     ↓
//!        NIP-44 encrypt (ECDH conversation key)
//!                     ↓
//!        Event (kind 20175, expiration tag, signed)
//! ```
//!
//! Decryption is the mirror image: the rider derives the same conversation
//! key from swapped key halves and recovers the plaintext schema.

mod error;
mod event;

pub mod encryption;

pub use error::{NostrError, Result};
pub use event::{
    build_location_event, build_refresh_request_event, EncryptedLocationEvent,
    RefreshRequestContent, KIND_DRIVER_LOCATION, KIND_KEY_REFRESH_REQUEST,
    LOCATION_EVENT_TTL_SECS,
};
