//! Great-circle math on a spherical Earth.

use std::f64::consts::PI;

use serde::Serialize;

use super::domain::Coordinates;

/// Mean Earth radius (IUGG) in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeodesyError {
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),
}

/// Distance and azimuths between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GreatCircle {
    pub distance_km: f64,
    /// Initial bearing from the first point towards the second, 0-360.
    pub azimuth_deg: f64,
    /// Initial bearing from the second point back towards the first, 0-360.
    pub back_azimuth_deg: f64,
}

/// Rejects NaN, infinite and out-of-range coordinates.
pub fn validate(point: Coordinates) -> Result<Coordinates, GeodesyError> {
    if !(-90.0..=90.0).contains(&point.latitude) {
        return Err(GeodesyError::InvalidLatitude(point.latitude));
    }
    if !(-180.0..=180.0).contains(&point.longitude) {
        return Err(GeodesyError::InvalidLongitude(point.longitude));
    }
    Ok(point)
}

/// Great-circle distance in kilometers between two positions given in degrees.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64, GeodesyError> {
    inverse(Coordinates::new(lat1, lon1), Coordinates::new(lat2, lon2))
        .map(|line| line.distance_km)
}

/// Solves the inverse problem: distance plus forward and back azimuth.
pub fn inverse(from: Coordinates, to: Coordinates) -> Result<GreatCircle, GeodesyError> {
    let from = validate(from)?;
    let to = validate(to)?;

    Ok(GreatCircle {
        distance_km: haversine_km(from, to),
        azimuth_deg: initial_bearing(from, to),
        back_azimuth_deg: initial_bearing(to, from),
    })
}

/// Point reached by travelling `distance_km` from `origin` on `bearing_deg`.
pub fn destination(origin: Coordinates, bearing_deg: f64, distance_km: f64) -> Coordinates {
    let lat1 = origin.latitude * DEG_TO_RAD;
    let lon1 = origin.longitude * DEG_TO_RAD;
    let bearing = bearing_deg * DEG_TO_RAD;
    let angular = distance_km / EARTH_RADIUS_KM;

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    Coordinates::new(lat2 * RAD_TO_DEG, normalize_longitude(lon2 * RAD_TO_DEG))
}

fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.latitude * DEG_TO_RAD;
    let lat2 = to.latitude * DEG_TO_RAD;
    let delta_lat = (to.latitude - from.latitude) * DEG_TO_RAD;
    let delta_lon = (to.longitude - from.longitude) * DEG_TO_RAD;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

fn initial_bearing(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.latitude * DEG_TO_RAD;
    let lat2 = to.latitude * DEG_TO_RAD;
    let delta_lon = (to.longitude - from.longitude) * DEG_TO_RAD;

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    let bearing = y.atan2(x) * RAD_TO_DEG;
    if bearing < 0.0 {
        bearing + 360.0
    } else {
        bearing
    }
}

fn normalize_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 540.0) % 360.0 - 180.0;
    if wrapped == -180.0 && longitude > 0.0 {
        180.0
    } else {
        wrapped
    }
}
