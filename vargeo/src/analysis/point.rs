//! Analyse des jeux ponctuels: sélection des points dans l'anneau

use geo::{Intersects, MultiPolygon};

use super::Clipped;
use crate::types::Feature;

/// Retient les points intersectant l'anneau (aucune pondération)
pub fn clip<'a>(features: &'a [Feature], ring: &MultiPolygon) -> Vec<Clipped<'a>> {
    features
        .iter()
        .filter(|f| f.geometry.intersects(ring))
        .map(|feature| Clipped {
            feature,
            geometry: feature.geometry.clone(),
            ratio: None,
            measure: 0.0,
        })
        .collect()
}
