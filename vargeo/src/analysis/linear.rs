//! Analyse des jeux linéaires: découpe par l'anneau, longueurs en pieds

use geo::{BooleanOps, EuclideanLength, Geometry, LineString, MultiLineString, MultiPolygon};

use super::Clipped;
use crate::types::Feature;
use crate::VargeoError;

/// Pieds par mètre
pub const FEET_PER_METER: f64 = 3.281;

/// Convertit une géométrie linéaire en multiligne
pub fn as_multilinestring(geometry: &Geometry) -> Option<MultiLineString> {
    match geometry {
        Geometry::LineString(ls) => Some(MultiLineString::new(vec![ls.clone()])),
        Geometry::MultiLineString(mls) => Some(mls.clone()),
        Geometry::Line(line) => Some(MultiLineString::new(vec![LineString::from(*line)])),
        _ => None,
    }
}

/// Découpe chaque ligne par l'anneau; `measure` est la longueur conservée en pieds
pub fn clip<'a>(
    features: &'a [Feature],
    ring: &MultiPolygon,
) -> Result<Vec<Clipped<'a>>, VargeoError> {
    let mut clipped = Vec::new();

    for (i, feature) in features.iter().enumerate() {
        let lines = as_multilinestring(&feature.geometry).ok_or_else(|| {
            VargeoError::invalid_geometry(format!("feature {i}"), "expected a line")
        })?;

        let inside = ring.clip(&lines, false);
        let length = inside.euclidean_length();
        if inside.0.is_empty() || length <= 0.0 {
            continue;
        }

        let original = lines.euclidean_length();
        let ratio = if original > 0.0 { length / original } else { 1.0 };

        clipped.push(Clipped {
            feature,
            geometry: Geometry::MultiLineString(inside),
            ratio: Some(ratio),
            measure: length * FEET_PER_METER,
        });
    }

    Ok(clipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use serde_json::Map;

    #[test]
    fn test_line_crossing_ring() {
        let ring = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 100.0, y: 0.0),
            (x: 100.0, y: 100.0),
            (x: 0.0, y: 100.0),
        ]]);
        let features = vec![Feature::new(
            Geometry::LineString(LineString::from(vec![(-100.0, 50.0), (100.0, 50.0)])),
            Map::new(),
        )];
        let clipped = clip(&features, &ring).unwrap();
        assert_eq!(clipped.len(), 1);
        assert!((clipped[0].ratio.unwrap() - 0.5).abs() < 1e-9);
        assert!((clipped[0].measure - 100.0 * FEET_PER_METER).abs() < 1e-6);
    }
}
