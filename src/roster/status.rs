//! Pure status classification for roster display.
//!
//! Collapses key state, pipeline state, and the last accepted event into a
//! single rider-facing label. The classifier is a pure function of its
//! inputs so every precedence row is unit-testable without a relay.

use nostr::Timestamp;

use crate::location::{DriverLocationState, DriverStatus};

/// A location older than this is treated as offline even if the driver's
/// last announced status was available.
pub const STALE_AFTER_SECS: u64 = 300;

/// Rider-facing status label for one followed driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    /// The rider's stored key predates the driver's current rotation.
    KeyOutdated,
    /// Followed, but the driver has not shared a key yet.
    Pending,
    /// No usable location: nothing received, explicitly offline, or the
    /// last event is too old.
    Offline,
    /// Online and accepting rides.
    Available,
    /// Currently carrying a passenger.
    OnRide,
    /// Online but not accepting rides.
    Unavailable,
}

impl StatusLabel {
    /// The display string shown in a roster listing.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KeyOutdated => "Key Outdated",
            Self::Pending => "Pending",
            Self::Offline => "Offline",
            Self::Available => "Available",
            Self::OnRide => "On Ride",
            Self::Unavailable => "Unavailable",
        }
    }
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a followed driver's rider-facing status.
///
/// Precedence, highest first, first match wins:
///
/// 1. a stale key outranks everything - the rider cannot trust (or soon
///    cannot decrypt) what they are seeing;
/// 2. no key yet means pending, regardless of anything received;
/// 3. no accepted location means offline;
/// 4. an explicitly announced offline status wins over recency;
/// 5. a location older than [`STALE_AFTER_SECS`] means offline;
/// 6. otherwise the announced status maps directly to its label.
#[must_use]
pub fn classify_status(
    has_key: bool,
    location: Option<&DriverLocationState>,
    is_stale_key: bool,
    now: Timestamp,
) -> StatusLabel {
    if is_stale_key {
        return StatusLabel::KeyOutdated;
    }
    if !has_key {
        return StatusLabel::Pending;
    }

    let Some(location) = location else {
        return StatusLabel::Offline;
    };

    if location.status == DriverStatus::Offline {
        return StatusLabel::Offline;
    }

    let age = now.as_u64().saturating_sub(location.event_timestamp.as_u64());
    if age > STALE_AFTER_SECS {
        return StatusLabel::Offline;
    }

    match location.status {
        DriverStatus::Online => StatusLabel::Available,
        DriverStatus::OnRide => StatusLabel::OnRide,
        DriverStatus::DoNotDisturb => StatusLabel::Unavailable,
        DriverStatus::Offline => StatusLabel::Offline,
    }
}
