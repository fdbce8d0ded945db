//! Key-staleness detection and refresh-request rate limiting.
//!
//! A driver rotates the shared secret by publishing new key metadata. The
//! rider's stored copy goes stale when the driver's publicly advertised
//! `key_updated_at` is newer than the stored one. While stale (or while no
//! key has been shared at all), the rider asks the driver to re-share - but
//! at most once per driver per rolling hour, because the share mechanism
//! itself triggers driver-side re-broadcast and unbounded requesting would
//! create a feedback storm across relays.
//!
//! The monitor runs once per roster-load and thereafter only on an explicit
//! refresh trigger, never in a tight loop.

use std::collections::HashMap;

use nostr::{PublicKey, Timestamp};
use tracing::{debug, warn};

use super::error::KeyError;
use super::types::SharedKey;

/// Rolling per-driver window between outbound refresh requests.
pub const REFRESH_WINDOW_SECS: u64 = 3600;

/// Outcome of a per-driver staleness evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessResult {
    /// Stored key matches the driver's advertised metadata.
    Fresh,
    /// The driver has rotated; the stored key is outdated.
    Stale,
    /// Metadata could not be fetched this cycle; staleness undetermined.
    Unknown,
    /// No shared key is stored for this driver (rider is pending).
    NoKey,
}

impl StalenessResult {
    /// Returns whether the stored key is known to be outdated.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }
}

/// Why a refresh request is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// No key has been shared yet; requesting an initial share.
    PendingShare,
    /// The stored key is outdated; requesting a re-share.
    StaleKey,
}

impl RefreshReason {
    /// The status tag carried in the outbound request content.
    #[must_use]
    pub const fn status_tag(&self) -> &'static str {
        match self {
            Self::PendingShare => "pending",
            Self::StaleKey => "stale",
        }
    }
}

/// An outbound key-refresh request, ready to be turned into a relay event.
///
/// Emission is fire-and-forget: the monitor does not await acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRefreshRequest {
    /// The driver being asked to (re-)share.
    pub driver: PublicKey,
    /// Why the request is being sent.
    pub reason: RefreshReason,
    /// Stored key version (0 when no key has been shared yet).
    pub key_version: u32,
    /// Stored key rotation timestamp, if a key exists.
    pub key_updated_at: Option<Timestamp>,
}

/// Per-driver rate limiter for outbound refresh requests.
///
/// Enforces at most one request per driver per rolling window, independent
/// of how many times the staleness monitor runs.
#[derive(Debug)]
pub struct RefreshLimiter {
    window_secs: u64,
    last_request: HashMap<PublicKey, Timestamp>,
}

impl Default for RefreshLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshLimiter {
    /// Creates a limiter with the standard one-hour window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(REFRESH_WINDOW_SECS)
    }

    /// Creates a limiter with a custom window (used by tests).
    #[must_use]
    pub fn with_window(window_secs: u64) -> Self {
        Self {
            window_secs,
            last_request: HashMap::new(),
        }
    }

    /// Returns when this driver was last asked for a refresh, if ever.
    #[must_use]
    pub fn last_requested_at(&self, driver: &PublicKey) -> Option<Timestamp> {
        self.last_request.get(driver).copied()
    }

    /// Emits a refresh request for a driver unless one was sent within the
    /// window. Records the emission time on success.
    ///
    /// Returns `None` when rate-limited - a no-op outcome, not an error.
    pub fn maybe_request(
        &mut self,
        driver: &PublicKey,
        reason: RefreshReason,
        stored: Option<&SharedKey>,
        now: Timestamp,
    ) -> Option<OutboundRefreshRequest> {
        if let Some(last) = self.last_request.get(driver) {
            if now.as_u64() < last.as_u64() + self.window_secs {
                debug!(driver = %driver, "refresh request suppressed by rate limit");
                return None;
            }
        }

        let request = match reason {
            RefreshReason::PendingShare => OutboundRefreshRequest {
                driver: *driver,
                reason,
                key_version: 0,
                key_updated_at: None,
            },
            RefreshReason::StaleKey => {
                // A stale-key request carries the stored version so the
                // driver can tell which rotation the rider is missing.
                let key = stored?;
                OutboundRefreshRequest {
                    driver: *driver,
                    reason,
                    key_version: key.version,
                    key_updated_at: Some(key.key_updated_at),
                }
            }
        };

        self.last_request.insert(*driver, now);
        Some(request)
    }
}

/// Per-driver result of one monitor cycle.
#[derive(Debug, Clone)]
pub struct DriverCycleOutcome {
    /// The driver that was evaluated.
    pub driver: PublicKey,
    /// Staleness determination for this cycle.
    pub staleness: StalenessResult,
    /// Refresh request to send, if one was emitted.
    pub request: Option<OutboundRefreshRequest>,
}

/// Monitors stored keys against drivers' advertised key metadata and emits
/// rate-limited refresh requests.
#[derive(Debug, Default)]
pub struct StalenessMonitor {
    limiter: RefreshLimiter,
}

impl StalenessMonitor {
    /// Creates a monitor with the standard one-hour request window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a monitor with a custom request window (used by tests).
    #[must_use]
    pub fn with_window(window_secs: u64) -> Self {
        Self {
            limiter: RefreshLimiter::with_window(window_secs),
        }
    }

    /// Compares the stored key rotation timestamp against the driver's
    /// publicly advertised one.
    ///
    /// `fetch` performs the external metadata read and may block or fail;
    /// a failure yields [`StalenessResult::Unknown`] for this driver only.
    pub fn evaluate_staleness<F>(
        driver: &PublicKey,
        stored_key_updated_at: Option<Timestamp>,
        fetch: F,
    ) -> StalenessResult
    where
        F: FnOnce(&PublicKey) -> Result<Option<Timestamp>, KeyError>,
    {
        let Some(stored) = stored_key_updated_at else {
            return StalenessResult::NoKey;
        };

        // A zero rotation timestamp means the key predates rotation
        // metadata; there is nothing to compare against.
        if stored.as_u64() == 0 {
            return StalenessResult::Fresh;
        }

        match fetch(driver) {
            Ok(Some(current)) if current > stored => StalenessResult::Stale,
            Ok(_) => StalenessResult::Fresh,
            Err(e) => {
                warn!(driver = %driver, error = %e, "key metadata fetch failed");
                StalenessResult::Unknown
            }
        }
    }

    /// Emits a rate-limited refresh request for one driver.
    ///
    /// Returns `None` when rate-limited.
    pub fn maybe_request_key_refresh(
        &mut self,
        driver: &PublicKey,
        reason: RefreshReason,
        stored: Option<&SharedKey>,
        now: Timestamp,
    ) -> Option<OutboundRefreshRequest> {
        self.limiter.maybe_request(driver, reason, stored, now)
    }

    /// Runs one monitor cycle over a roster snapshot.
    ///
    /// Each driver is evaluated independently: one driver's metadata fetch
    /// failure never blocks processing of the others.
    pub fn run_cycle<'a, I, F>(
        &mut self,
        drivers: I,
        now: Timestamp,
        mut fetch: F,
    ) -> Vec<DriverCycleOutcome>
    where
        I: IntoIterator<Item = (&'a PublicKey, Option<&'a SharedKey>)>,
        F: FnMut(&PublicKey) -> Result<Option<Timestamp>, KeyError>,
    {
        let mut outcomes = Vec::new();

        for (driver, key) in drivers {
            let staleness =
                Self::evaluate_staleness(driver, key.map(|k| k.key_updated_at), &mut fetch);

            let request = match staleness {
                StalenessResult::NoKey => {
                    self.maybe_request_key_refresh(driver, RefreshReason::PendingShare, None, now)
                }
                StalenessResult::Stale => {
                    self.maybe_request_key_refresh(driver, RefreshReason::StaleKey, key, now)
                }
                StalenessResult::Fresh | StalenessResult::Unknown => None,
            };

            outcomes.push(DriverCycleOutcome {
                driver: *driver,
                staleness,
                request,
            });
        }

        outcomes
    }
}
