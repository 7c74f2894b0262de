//! Reprojection légère en Rust pur: EPSG:3338 ↔ géographique
//!
//! Seule la projection de travail du pipeline est supportée; les positions
//! des features proches sont publiées en degrés-minutes décimales.

mod albers;
mod ellipsoid;

pub use albers::{albers_to_geographic, geographic_to_albers};

use geo::Point;

use crate::VargeoError;

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés (lon, lat)
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

/// Latitude et longitude en degrés d'un point EPSG:3338
pub fn lat_lng_degrees(point: Point) -> Result<(f64, f64), VargeoError> {
    let (lon, lat) = albers_to_geographic(point.x(), point.y())?.to_degrees();
    Ok((lat, lon))
}
