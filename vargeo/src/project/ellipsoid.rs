//! Définitions des ellipsoïdes

/// Ellipsoïde GRS80 (NAD83, base de l'EPSG:3338)
pub struct GRS80;

impl GRS80 {
    /// Demi-grand axe en mètres
    pub const A: f64 = 6378137.0;

    /// Aplatissement
    pub const F: f64 = 1.0 / 298.257222101;

    /// Première excentricité au carré
    pub const E2: f64 = 2.0 * Self::F - Self::F * Self::F;

    /// Première excentricité
    pub const E: f64 = 0.0818191910428158; // sqrt(E2)
}
