//! Projection Alaska Albers (EPSG:3338)
//!
//! Albers conique équivalente, 2 parallèles standards (Snyder, USGS PP 1395)

use super::ellipsoid::GRS80;
use super::Geographic;
use crate::VargeoError;

/// Paramètres de l'EPSG:3338
struct AlaskaAlbers {
    /// Méridien central
    lon0: f64,
    /// Latitude origine
    lat0: f64,
    /// Premier parallèle standard
    lat1: f64,
    /// Deuxième parallèle standard
    lat2: f64,
    x0: f64,
    y0: f64,
}

impl Default for AlaskaAlbers {
    fn default() -> Self {
        Self {
            lon0: (-154.0_f64).to_radians(),
            lat0: 50.0_f64.to_radians(),
            lat1: 55.0_f64.to_radians(),
            lat2: 65.0_f64.to_radians(),
            x0: 0.0,
            y0: 0.0,
        }
    }
}

/// Constantes dérivées de la projection
struct Constants {
    n: f64,
    c: f64,
    rho0: f64,
}

fn q(lat: f64) -> f64 {
    let e = GRS80::E;
    let e2 = GRS80::E2;
    let sin = lat.sin();
    (1.0 - e2)
        * (sin / (1.0 - e2 * sin * sin)
            - (1.0 / (2.0 * e)) * ((1.0 - e * sin) / (1.0 + e * sin)).ln())
}

fn m(lat: f64) -> f64 {
    let sin = lat.sin();
    lat.cos() / (1.0 - GRS80::E2 * sin * sin).sqrt()
}

impl AlaskaAlbers {
    fn constants(&self) -> Constants {
        let (m1, m2) = (m(self.lat1), m(self.lat2));
        let (q0, q1, q2) = (q(self.lat0), q(self.lat1), q(self.lat2));
        let n = (m1 * m1 - m2 * m2) / (q2 - q1);
        let c = m1 * m1 + n * q1;
        let rho0 = GRS80::A * (c - n * q0).sqrt() / n;
        Constants { n, c, rho0 }
    }
}

/// Convertit des coordonnées géographiques vers l'EPSG:3338
pub fn geographic_to_albers(geo: Geographic) -> (f64, f64) {
    let params = AlaskaAlbers::default();
    let k = params.constants();

    let rho = GRS80::A * (k.c - k.n * q(geo.lat)).sqrt() / k.n;
    let theta = k.n * (geo.lon - params.lon0);

    (
        params.x0 + rho * theta.sin(),
        params.y0 + k.rho0 - rho * theta.cos(),
    )
}

/// Convertit des coordonnées EPSG:3338 vers le géographique (NAD83 ≈ WGS84)
pub fn albers_to_geographic(x: f64, y: f64) -> Result<Geographic, VargeoError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(VargeoError::Projection(format!(
            "non-finite coordinates ({}, {})",
            x, y
        )));
    }

    let params = AlaskaAlbers::default();
    let k = params.constants();
    let e = GRS80::E;
    let e2 = GRS80::E2;

    let dx = x - params.x0;
    let dy = k.rho0 - (y - params.y0);
    let rho = (dx * dx + dy * dy).sqrt();
    let theta = dx.atan2(dy);

    let q_target = (k.c - (rho * k.n / GRS80::A).powi(2)) / k.n;
    if q_target.abs() > 2.0 {
        return Err(VargeoError::Projection(format!(
            "({}, {}) is outside the projection domain",
            x, y
        )));
    }

    // Latitude par itération (Snyder 3-16)
    let mut lat = (q_target / 2.0).asin();
    for _ in 0..15 {
        let sin = lat.sin();
        let one_minus = 1.0 - e2 * sin * sin;
        let delta = one_minus.powi(2) / (2.0 * lat.cos())
            * (q_target / (1.0 - e2) - sin / one_minus
                + (1.0 / (2.0 * e)) * ((1.0 - e * sin) / (1.0 + e * sin)).ln());
        lat += delta;
        if delta.abs() < 1e-12 {
            break;
        }
    }

    let lon = params.lon0 + theta / k.n;
    Ok(Geographic::new(lon, lat))
}
