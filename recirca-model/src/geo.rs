use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::ids::{RequestId, UserId};

/// Fallback coordinate used when no geolocation source is available
/// (central Lima, matching the client default).
pub const DEFAULT_LOCATION: GeoPoint = GeoPoint {
    latitude: -12.0464,
    longitude: -77.0428,
};

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let point = Self {
            latitude,
            longitude,
        };
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<()> {
        let lat_ok = self.latitude.is_finite() && self.latitude.abs() <= 90.0;
        let lng_ok = self.longitude.is_finite() && self.longitude.abs() <= 180.0;
        if lat_ok && lng_ok {
            Ok(())
        } else {
            Err(ModelError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// A claimant position tick. Transient: only the most recent update per
/// active request matters, older ones are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub request_id: RequestId,
    pub collector_id: UserId,
    pub position: GeoPoint,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_coordinate_ranges() {
        assert!(GeoPoint::new(-12.0464, -77.0428).is_ok());
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(90.1, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn default_location_is_valid() {
        assert!(DEFAULT_LOCATION.validate().is_ok());
    }
}
