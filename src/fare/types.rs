//! Fare estimation types and rate configuration.

use serde::{Deserialize, Serialize};

/// Floor on any sats quote, independent of the exchange rate.
pub const MINIMUM_FARE_SATS: u64 = 100;

/// A point on the earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Creates coordinates from decimal degrees.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Rate configuration for fare estimation.
///
/// The USD formula is authoritative; sats are derived from it at quote
/// time. Defaults are a generic metered-taxi shape, expected to be
/// overridden per market by the embedder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateConfig {
    /// Flag-drop amount in USD.
    pub base_fare_usd: f64,
    /// Per-mile rate in USD.
    pub per_mile_usd: f64,
    /// Minimum total fare in USD.
    pub minimum_fare_usd: f64,
    /// Exchange rate to assume when no oracle quote is available.
    pub fallback_usd_per_btc: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            base_fare_usd: 3.0,
            per_mile_usd: 2.0,
            minimum_fare_usd: 5.0,
            fallback_usd_per_btc: 100_000.0,
        }
    }
}

/// Source of the current BTC/USD exchange rate.
///
/// Injected so the estimator stays a pure function; the embedder decides
/// where quotes come from and how fresh they are.
pub trait PriceOracle {
    /// Returns the current USD price of one BTC, or `None` if no usable
    /// quote is available.
    fn usd_per_btc(&self) -> Option<f64>;
}

/// Oracle returning a fixed rate. Used in tests and offline demos.
#[derive(Debug, Clone, Copy)]
pub struct FixedRateOracle(pub f64);

impl PriceOracle for FixedRateOracle {
    fn usd_per_btc(&self) -> Option<f64> {
        Some(self.0)
    }
}

/// Oracle that never has a quote; forces the fallback rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableOracle;

impl PriceOracle for UnavailableOracle {
    fn usd_per_btc(&self) -> Option<f64> {
        None
    }
}

/// A completed fare estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct FareEstimate {
    /// Pickup-to-destination distance in miles.
    pub ride_miles: f64,

    /// Driver-to-pickup distance in miles, when a usable driver location
    /// was available.
    pub pickup_miles: Option<f64>,

    /// Total billed distance in miles.
    pub total_miles: f64,

    /// Estimated fare in USD (the authoritative figure).
    pub fare_usd: f64,

    /// Estimated fare in satoshis, derived from `fare_usd`.
    pub fare_sats: u64,

    /// Whether the sats figure used the configured fallback rate instead
    /// of a live oracle quote.
    pub used_fallback_rate: bool,
}
