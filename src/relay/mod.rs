//! Relay communication: the location subscription and event publishing.

mod error;
mod subscriber;
mod types;

pub use error::{RelayError, RelayResult};
pub use subscriber::LocationSubscriber;
pub use types::PublishResult;
