//! Roster domain types.

use chrono::{DateTime, Utc};
use nostr::PublicKey;

use crate::keys::SharedKey;

/// A driver the rider follows.
///
/// Following is one-directional: it records the rider's interest and, once
/// the driver has shared a key, the material needed to decrypt their
/// broadcasts. A followed driver without a shared key is "pending".
#[derive(Debug, Clone)]
pub struct FollowedDriver {
    /// The driver's Nostr identity key.
    pub pubkey: PublicKey,

    /// Optional rider-local note ("airport regular", etc.).
    pub note: Option<String>,

    /// When the rider added this driver to the roster.
    pub added_at: DateTime<Utc>,

    /// The active shared key, if the driver has shared one.
    pub shared_key: Option<SharedKey>,
}

impl FollowedDriver {
    /// Whether the driver has shared a key yet.
    #[must_use]
    pub const fn has_key(&self) -> bool {
        self.shared_key.is_some()
    }
}
