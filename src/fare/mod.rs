//! Fare estimation: haversine distances, USD metering, and sats conversion.

mod estimator;
mod types;

pub use estimator::{distance_km, distance_miles, estimate_fare};
pub use types::{
    Coordinates, FareEstimate, FixedRateOracle, PriceOracle, RateConfig, UnavailableOracle,
    MINIMUM_FARE_SATS,
};
