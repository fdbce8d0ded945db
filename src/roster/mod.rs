//! Driver roster: the followed-driver list, its local storage, and the
//! rider-facing status classifier.

mod error;
mod status;
mod storage;
mod types;

pub use error::{Result, RosterError};
pub use status::{classify_status, StatusLabel, STALE_AFTER_SECS};
pub use storage::RosterStorage;
pub use types::FollowedDriver;
