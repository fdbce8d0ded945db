//! Location payload and derived per-driver state types.

use nostr::{PublicKey, Timestamp};
use serde::{Deserialize, Serialize};

/// Availability status a driver announces with each location broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    /// Available to accept rides.
    Online,
    /// Currently carrying a passenger.
    OnRide,
    /// Explicitly announced offline.
    Offline,
    /// Online but not accepting rides.
    DoNotDisturb,
}

/// The plaintext schema recovered from an encrypted location broadcast.
///
/// This is exactly what a driver encrypts for one rider: coordinates, an
/// availability status tag, and the version of the shared key the driver
/// used. The event timestamp and expiration live on the outer (encrypted)
/// event so relays and riders can evaluate them without the shared secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    /// Latitude in decimal degrees.
    pub lat: f64,

    /// Longitude in decimal degrees.
    pub lon: f64,

    /// Announced availability status.
    pub status: DriverStatus,

    /// Shared-key version the driver encrypted with.
    pub key_version: u32,
}

impl LocationUpdate {
    /// Creates a new location update.
    #[must_use]
    pub const fn new(lat: f64, lon: f64, status: DriverStatus, key_version: u32) -> Self {
        Self {
            lat,
            lon,
            status,
            key_version,
        }
    }

    /// Checks that the coordinates are finite and within valid ranges.
    ///
    /// Decrypted payloads come from the network; a driver client bug or a
    /// corrupted plaintext must not poison the rider's derived state.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("latitude out of range: {}", self.lat));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(format!("longitude out of range: {}", self.lon));
        }
        Ok(())
    }

    /// Deserializes a location update from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or missing required fields.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes this update to the JSON plaintext that gets encrypted.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (extremely rare).
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Current location/status for one followed driver.
///
/// Derived, in-memory only. Created and overwritten exclusively by the
/// acceptance pipeline on a successfully accepted event; cleared on
/// re-subscription. Never persisted across restarts - it is a live cache,
/// not a source of truth.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverLocationState {
    /// The driver this state belongs to.
    pub driver: PublicKey,

    /// Latitude in decimal degrees.
    pub latitude: f64,

    /// Longitude in decimal degrees.
    pub longitude: f64,

    /// Announced availability status.
    pub status: DriverStatus,

    /// Creation timestamp of the accepted event.
    pub event_timestamp: Timestamp,

    /// Shared-key version the driver encrypted with.
    pub key_version: u32,
}

impl DriverLocationState {
    /// Builds the derived state from an accepted, decrypted update.
    #[must_use]
    pub const fn from_update(
        driver: PublicKey,
        update: &LocationUpdate,
        event_timestamp: Timestamp,
    ) -> Self {
        Self {
            driver,
            latitude: update.lat,
            longitude: update.lon,
            status: update.status,
            event_timestamp,
            key_version: update.key_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_status_serde_tags() {
        for (status, tag) in [
            (DriverStatus::Online, "\"online\""),
            (DriverStatus::OnRide, "\"on_ride\""),
            (DriverStatus::Offline, "\"offline\""),
            (DriverStatus::DoNotDisturb, "\"do_not_disturb\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), tag);
            assert_eq!(
                serde_json::from_str::<DriverStatus>(tag).unwrap(),
                status
            );
        }
    }

    #[test]
    fn location_update_json_roundtrip() {
        let update = LocationUpdate::new(40.0, -74.0, DriverStatus::Online, 1);
        let json = update.to_json().unwrap();
        let recovered = LocationUpdate::from_json(&json).unwrap();
        assert_eq!(update, recovered);
    }

    #[test]
    fn location_update_serializes_snake_case_status() {
        let update = LocationUpdate::new(0.0, 0.0, DriverStatus::DoNotDisturb, 2);
        let json = update.to_json().unwrap();
        assert!(json.contains("\"do_not_disturb\""));
        assert!(json.contains("key_version"));
    }

    #[test]
    fn location_update_rejects_unknown_status() {
        let json = r#"{"lat":1.0,"lon":2.0,"status":"driving","key_version":1}"#;
        assert!(LocationUpdate::from_json(json).is_err());
    }

    #[test]
    fn validate_accepts_boundary_coordinates() {
        for (lat, lon) in [(90.0, 180.0), (-90.0, -180.0), (0.0, 0.0)] {
            let update = LocationUpdate::new(lat, lon, DriverStatus::Online, 1);
            assert!(update.validate().is_ok(), "({lat}, {lon}) must be valid");
        }
    }

    #[test]
    fn validate_rejects_out_of_range_latitude() {
        let update = LocationUpdate::new(91.0, 0.0, DriverStatus::Online, 1);
        assert!(update.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_longitude() {
        let update = LocationUpdate::new(0.0, -180.5, DriverStatus::Online, 1);
        assert!(update.validate().is_err());
    }

    #[test]
    fn validate_rejects_nan_and_infinity() {
        let nan = LocationUpdate::new(f64::NAN, 0.0, DriverStatus::Online, 1);
        assert!(nan.validate().is_err());

        let inf = LocationUpdate::new(0.0, f64::INFINITY, DriverStatus::Online, 1);
        assert!(inf.validate().is_err());
    }

    #[test]
    fn driver_location_state_from_update() {
        let keys = nostr::Keys::generate();
        let update = LocationUpdate::new(40.0, -74.0, DriverStatus::OnRide, 3);
        let ts = Timestamp::from(1000u64);

        let state = DriverLocationState::from_update(keys.public_key(), &update, ts);

        assert_eq!(state.driver, keys.public_key());
        assert_eq!(state.latitude, 40.0);
        assert_eq!(state.longitude, -74.0);
        assert_eq!(state.status, DriverStatus::OnRide);
        assert_eq!(state.event_timestamp, ts);
        assert_eq!(state.key_version, 3);
    }
}
