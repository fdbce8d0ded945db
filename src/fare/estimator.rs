//! Haversine distance and fare estimation.
//!
//! Pure functions over coordinates and rate configuration. Great-circle
//! distance is a deliberate approximation of road distance; the quote is
//! labeled an estimate everywhere it surfaces.

use tracing::debug;

use super::types::{
    Coordinates, FareEstimate, PriceOracle, RateConfig, MINIMUM_FARE_SATS,
};
use crate::location::{DriverLocationState, DriverStatus};

/// Mean earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers per statute mile.
const KM_PER_MILE: f64 = 1.609_344;

const SATS_PER_BTC: f64 = 100_000_000.0;

/// Great-circle distance between two points in kilometers.
#[must_use]
pub fn distance_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlat = (to.latitude - from.latitude).to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Great-circle distance between two points in statute miles.
#[must_use]
pub fn distance_miles(from: Coordinates, to: Coordinates) -> f64 {
    distance_km(from, to) / KM_PER_MILE
}

/// Estimates the fare for a ride.
///
/// The billed distance is the pickup-to-destination leg, plus the
/// driver-to-pickup leg when the driver's current location is known and
/// the driver is available (a driver already on a ride or otherwise
/// unavailable gives no meaningful pickup leg).
///
/// USD is the authoritative figure: `max(base + per_mile * total_miles,
/// minimum)`. The sats figure is derived from it at the oracle's current
/// rate, falling back to the configured rate when no quote is available,
/// and never quoting below [`MINIMUM_FARE_SATS`].
#[must_use]
pub fn estimate_fare(
    pickup: Coordinates,
    destination: Coordinates,
    driver: Option<&DriverLocationState>,
    rates: &RateConfig,
    oracle: &dyn PriceOracle,
) -> FareEstimate {
    let ride_miles = distance_miles(pickup, destination);

    let pickup_miles = driver
        .filter(|state| state.status == DriverStatus::Online)
        .map(|state| {
            distance_miles(
                Coordinates::new(state.latitude, state.longitude),
                pickup,
            )
        });

    let total_miles = ride_miles + pickup_miles.unwrap_or(0.0);

    let metered = rates.base_fare_usd + rates.per_mile_usd * total_miles;
    let fare_usd = metered.max(rates.minimum_fare_usd);

    let (usd_per_btc, used_fallback_rate) = match oracle.usd_per_btc() {
        Some(rate) if rate > 0.0 => (rate, false),
        _ => {
            debug!(
                fallback = rates.fallback_usd_per_btc,
                "no oracle quote, using fallback rate"
            );
            (rates.fallback_usd_per_btc, true)
        }
    };

    let fare_sats = usd_to_sats(fare_usd, usd_per_btc);

    FareEstimate {
        ride_miles,
        pickup_miles,
        total_miles,
        fare_usd,
        fare_sats,
        used_fallback_rate,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn usd_to_sats(fare_usd: f64, usd_per_btc: f64) -> u64 {
    let sats = (fare_usd / usd_per_btc * SATS_PER_BTC).round();
    // Finite positive inputs only; the cast saturates on overflow.
    (sats as u64).max(MINIMUM_FARE_SATS)
}
