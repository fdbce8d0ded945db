//! Nostr event types for the location-sharing sub-protocol.
//!
//! Two event kinds, both in the ephemeral range (20000-29999) since live
//! location data has no value once superseded and relays need not retain it:
//!
//! - kind 20175: driver location broadcast, NIP-44 encrypted per rider,
//!   carrying a NIP-40 expiration tag on the outer event so expiry can be
//!   checked without decrypting;
//! - kind 20176: rider key-refresh request, p-tagged to the driver.

use nostr::{Event, EventBuilder, Keys, Kind, PublicKey, Tag, TagStandard, Timestamp};
use serde::{Deserialize, Serialize};

use crate::keys::OutboundRefreshRequest;
use crate::location::LocationUpdate;
use crate::nostr::encryption::encrypt_to_counterparty;
use crate::nostr::error::{NostrError, Result};

/// Event kind for encrypted driver location broadcasts.
pub const KIND_DRIVER_LOCATION: u16 = 20175;

/// Event kind for rider key-refresh requests.
pub const KIND_KEY_REFRESH_REQUEST: u16 = 20176;

/// How long a location broadcast stays valid (NIP-40 expiration).
pub const LOCATION_EVENT_TTL_SECS: u64 = 300;

/// The core's immutable view of an incoming encrypted location event.
///
/// The transport delivers signed, already-authenticated events; this type
/// extracts only the fields the acceptance pipeline classifies on. The
/// expiration is carried as a tag on the outer (still-encrypted) event, so
/// expiry is checkable without the shared secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedLocationEvent {
    /// The driver that signed and broadcast the event.
    pub author: PublicKey,

    /// Signed creation timestamp - the only tamper-resistant ordering
    /// signal the relay network provides.
    pub created_at: Timestamp,

    /// NIP-44 ciphertext.
    pub content: String,

    /// NIP-40 expiration tag, if present.
    pub expiration: Option<Timestamp>,
}

impl EncryptedLocationEvent {
    /// Creates an event view directly from its fields.
    #[must_use]
    pub const fn new(
        author: PublicKey,
        created_at: Timestamp,
        content: String,
        expiration: Option<Timestamp>,
    ) -> Self {
        Self {
            author,
            created_at,
            content,
            expiration,
        }
    }

    /// Builds the view from a relay-delivered event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event is not a driver location broadcast.
    pub fn from_event(event: &Event) -> Result<Self> {
        if event.kind != Kind::Custom(KIND_DRIVER_LOCATION) {
            return Err(NostrError::InvalidEvent(format!(
                "expected kind {KIND_DRIVER_LOCATION}, got {}",
                event.kind
            )));
        }

        let expiration = event.tags.iter().find_map(|tag| match tag.as_standardized() {
            Some(TagStandard::Expiration(ts)) => Some(*ts),
            _ => None,
        });

        Ok(Self {
            author: event.pubkey,
            created_at: event.created_at,
            content: event.content.clone(),
            expiration,
        })
    }

    /// Whether the event's declared expiration has passed.
    ///
    /// Events without an expiration tag never expire.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiration.is_some_and(|expiration| expiration < now)
    }
}

/// Builds a signed, encrypted driver location broadcast.
///
/// This is the driver-side counterpart of the rider's decryption path: the
/// plaintext is encrypted with ECDH(driver identity secret, rider shared
/// public key), so only the rider holding the matching shared secret can
/// read it. The expiration tag is set [`LOCATION_EVENT_TTL_SECS`] past
/// `now`; a broadcast superseded within that window carries no value.
///
/// # Errors
///
/// Returns an error if serialization, encryption, or signing fails.
pub fn build_location_event(
    update: &LocationUpdate,
    driver_keys: &Keys,
    rider_shared_public: &PublicKey,
    now: Timestamp,
) -> Result<Event> {
    let plaintext = update.to_json()?;
    let ciphertext =
        encrypt_to_counterparty(&plaintext, driver_keys.secret_key(), rider_shared_public)?;

    let expires_at = Timestamp::from(now.as_u64() + LOCATION_EVENT_TTL_SECS);

    EventBuilder::new(Kind::Custom(KIND_DRIVER_LOCATION), ciphertext)
        .tag(Tag::expiration(expires_at))
        .sign_with_keys(driver_keys)
        .map_err(|e| NostrError::Signing(e.to_string()))
}

/// Wire content of a key-refresh request event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequestContent {
    /// "pending" (no key yet) or "stale" (rotation detected).
    pub status: String,

    /// Stored key version (0 when no key has been shared yet).
    pub key_version: u32,

    /// Stored key rotation timestamp, if a key exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_updated_at: Option<u64>,
}

impl From<&OutboundRefreshRequest> for RefreshRequestContent {
    fn from(request: &OutboundRefreshRequest) -> Self {
        Self {
            status: request.reason.status_tag().to_string(),
            key_version: request.key_version,
            key_updated_at: request.key_updated_at.map(|ts| ts.as_u64()),
        }
    }
}

/// Builds a signed key-refresh request event addressed to the driver.
///
/// The content is plaintext JSON: it carries no location data, only the
/// rider's stored key version so the driver knows which rotation to re-send.
///
/// # Errors
///
/// Returns an error if serialization or signing fails.
pub fn build_refresh_request_event(
    request: &OutboundRefreshRequest,
    rider_keys: &Keys,
) -> Result<Event> {
    let content = serde_json::to_string(&RefreshRequestContent::from(request))?;

    EventBuilder::new(Kind::Custom(KIND_KEY_REFRESH_REQUEST), content)
        .tag(Tag::public_key(request.driver))
        .sign_with_keys(rider_keys)
        .map_err(|e| NostrError::Signing(e.to_string()))
}
