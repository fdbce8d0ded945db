//! Per-driver event acceptance pipeline.
//!
//! Consumes the unordered, possibly-replayed, possibly-expired stream of
//! encrypted broadcasts from the relay network and derives a single,
//! monotonically-advancing current location/status per driver.
//!
//! The transport is a public relay network with no delivery-order guarantee
//! and no central sequencer; the event's own signed creation time is the
//! only tamper-resistant ordering signal available. Policy: newest wins,
//! strictly. Ties are accepted so idempotent re-broadcasts are not
//! spuriously rejected.

use std::collections::HashMap;

use nostr::{PublicKey, Timestamp};
use thiserror::Error;
use tracing::{debug, warn};

use super::types::DriverLocationState;
use crate::keys::KeyStore;
use crate::nostr::encryption::decrypt_location_event;
use crate::nostr::{EncryptedLocationEvent, NostrError};

/// Coarse per-driver pipeline state.
///
/// Acceptance itself is independent of this state; the rendered status
/// label depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    /// No shared key for this driver; never subscribed.
    NoKey,
    /// Subscribed, no event accepted yet.
    AwaitingFirstEvent,
    /// At least one event accepted; state updates in place.
    Tracking,
}

/// Why an incoming event was discarded.
///
/// Stale and out-of-order discards are expected under a lossy, replaying
/// transport; none of these is an error condition for the pipeline.
#[derive(Debug, Error)]
pub enum DiscardReason {
    /// No shared key stored for the event author (pending driver, or a
    /// race with key removal).
    #[error("no shared key for event author")]
    NoSharedKey,

    /// Decryption or payload parsing failed.
    #[error("decryption failed: {0}")]
    Decrypt(#[from] NostrError),

    /// The event's declared expiration has passed.
    #[error("event expired")]
    Expired,

    /// The event is older than the acceptance cursor.
    #[error("event older than last accepted timestamp")]
    OutOfOrder,
}

/// Per-driver acceptance cursor and current state.
#[derive(Debug, Default)]
struct DriverTrack {
    /// Last accepted event timestamp; monotonically non-decreasing.
    cursor: Option<Timestamp>,
    current: Option<DriverLocationState>,
}

/// The event acceptance pipeline for all followed drivers.
///
/// Exactly one pipeline instance exists per rider, and within it exactly
/// one track per driver, so cursor/state overwrites need no cross-task
/// synchronization. Derived state is a live cache: it is cleared on
/// re-subscription and never persisted.
#[derive(Debug, Default)]
pub struct AcceptancePipeline {
    tracks: HashMap<PublicKey, DriverTrack>,
}

impl AcceptancePipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets all per-driver state for a fresh subscription.
    ///
    /// Called on roster change or relay reconnect, with exactly the drivers
    /// that currently have a shared key (drivers without one are never
    /// subscribed to - there is nothing to decrypt with).
    pub fn resubscribe(&mut self, drivers: &[PublicKey]) {
        self.tracks.clear();
        for driver in drivers {
            self.tracks.insert(*driver, DriverTrack::default());
        }
    }

    /// Arms tracking for a driver whose shared key just appeared.
    pub fn key_added(&mut self, driver: &PublicKey) {
        self.tracks.entry(*driver).or_default();
    }

    /// Drops all state for a driver whose shared key was removed.
    pub fn key_removed(&mut self, driver: &PublicKey) {
        self.tracks.remove(driver);
    }

    /// Returns the coarse tracking state for a driver.
    #[must_use]
    pub fn tracking_state(&self, driver: &PublicKey) -> TrackingState {
        match self.tracks.get(driver) {
            None => TrackingState::NoKey,
            Some(track) if track.current.is_some() => TrackingState::Tracking,
            Some(_) => TrackingState::AwaitingFirstEvent,
        }
    }

    /// Returns the current accepted location state for a driver.
    #[must_use]
    pub fn current(&self, driver: &PublicKey) -> Option<&DriverLocationState> {
        self.tracks.get(driver).and_then(|t| t.current.as_ref())
    }

    /// Returns the acceptance cursor for a driver.
    #[must_use]
    pub fn cursor(&self, driver: &PublicKey) -> Option<Timestamp> {
        self.tracks.get(driver).and_then(|t| t.cursor)
    }

    /// Processes one incoming encrypted event.
    ///
    /// Returns the new per-driver state on acceptance, or `None` if the
    /// event was discarded. Discard reasons are logged as diagnostics and
    /// never surfaced to the end user.
    pub fn process_incoming_event<K: KeyStore>(
        &mut self,
        keys: &K,
        event: &EncryptedLocationEvent,
        now: Timestamp,
    ) -> Option<DriverLocationState> {
        match self.try_process(keys, event, now) {
            Ok(state) => Some(state),
            Err(reason) => {
                debug!(driver = %event.author, %reason, "discarded location event");
                None
            }
        }
    }

    /// Like [`process_incoming_event`](Self::process_incoming_event) but
    /// reports why an event was discarded.
    ///
    /// # Errors
    ///
    /// Returns the discard reason; no state changes on any discard.
    pub fn try_process<K: KeyStore>(
        &mut self,
        keys: &K,
        event: &EncryptedLocationEvent,
        now: Timestamp,
    ) -> Result<DriverLocationState, DiscardReason> {
        // 1. Key lookup by event author. A store failure is treated the
        //    same as an absent key: we cannot decrypt either way.
        let shared_key = match keys.shared_key(&event.author) {
            Ok(Some(key)) => key,
            Ok(None) => return Err(DiscardReason::NoSharedKey),
            Err(e) => {
                warn!(driver = %event.author, error = %e, "key store lookup failed");
                return Err(DiscardReason::NoSharedKey);
            }
        };

        // 2. Decrypt and parse; failure discards with no state change.
        let update = decrypt_location_event(&shared_key, &event.author, event)?;

        // 3-4. Expiration and ordering checks.
        if event.is_expired(now) {
            return Err(DiscardReason::Expired);
        }

        let track = self.tracks.entry(event.author).or_default();
        if let Some(cursor) = track.cursor {
            // Strictly older is rejected; an equal timestamp is accepted so
            // idempotent re-delivery is not itself a rejection reason.
            if event.created_at < cursor {
                return Err(DiscardReason::OutOfOrder);
            }
        }

        // 5. Accept: advance the cursor, overwrite the current state.
        track.cursor = Some(event.created_at);
        let state = DriverLocationState::from_update(event.author, &update, event.created_at);
        track.current = Some(state.clone());

        Ok(state)
    }
}
