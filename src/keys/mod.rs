//! Shared-key management: per-driver ECDH key material, the injected key
//! store interface, staleness detection, and refresh-request rate limiting.

mod error;
mod staleness;
mod types;

pub use error::{KeyError, Result};
pub use staleness::{
    DriverCycleOutcome, OutboundRefreshRequest, RefreshLimiter, RefreshReason, StalenessMonitor,
    StalenessResult, REFRESH_WINDOW_SECS,
};
pub use types::{KeyStore, MemoryKeyStore, SharedKey};
