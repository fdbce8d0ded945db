//! Driver location domain: the plaintext update schema, per-driver derived
//! state, and the event acceptance pipeline that orders the relay stream.

mod pipeline;
mod types;

pub use pipeline::{AcceptancePipeline, DiscardReason, TrackingState};
pub use types::{DriverLocationState, DriverStatus, LocationUpdate};
