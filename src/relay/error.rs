//! Error types for relay operations.

use thiserror::Error;

/// Errors that can occur during relay communication.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The subscriber has no active subscription.
    #[error("Subscription not started")]
    NotStarted,

    /// Invalid relay URL.
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),

    /// Failed to publish an event.
    #[error("Failed to publish event: {0}")]
    Publish(String),

    /// Failed to subscribe.
    #[error("Subscription failed: {0}")]
    Subscription(String),

    /// Operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// All relays rejected or failed to receive the event.
    #[error("All relays failed")]
    AllRelaysFailed,
}

/// Result type alias for relay operations.
pub type RelayResult<T> = std::result::Result<T, RelayError>;
