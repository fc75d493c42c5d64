//! Pure coordinate math: great-circle distance and the pickup ETA heuristic.

use recirca_model::GeoPoint;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates via the haversine formula.
///
/// Inputs are decimal degrees; the result is non-negative and symmetric.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lng / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Estimated pickup travel time: roughly four minutes per kilometer on a
/// cargo tricycle through city streets, floored at one minute.
pub fn eta_minutes(distance_km: f64) -> u32 {
    let minutes = (distance_km.max(0.0) * 4.0).round();
    minutes.max(1.0) as u32
}
