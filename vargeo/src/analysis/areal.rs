//! Analyse des jeux surfaciques: découpe par l'anneau, surfaces en acres

use geo::{Area, BooleanOps, Geometry, MultiPolygon};

use super::Clipped;
use crate::types::Feature;
use crate::VargeoError;

/// Mètres carrés par acre
pub const SQ_METERS_PER_ACRE: f64 = 4046.86;

/// Convertit une géométrie surfacique en multipolygone
pub fn as_multipolygon(geometry: &Geometry) -> Option<MultiPolygon> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        _ => None,
    }
}

/// Découpe chaque feature par l'anneau; les intersections vides sont écartées
///
/// `ratio` est la part de la surface d'origine conservée, `measure` la surface
/// intersectée en acres.
pub fn clip<'a>(
    features: &'a [Feature],
    ring: &MultiPolygon,
) -> Result<Vec<Clipped<'a>>, VargeoError> {
    let mut clipped = Vec::new();

    for (i, feature) in features.iter().enumerate() {
        let polygon = as_multipolygon(&feature.geometry).ok_or_else(|| {
            VargeoError::invalid_geometry(format!("feature {i}"), "expected a polygon")
        })?;

        let intersection = ring.intersection(&polygon);
        let area = intersection.unsigned_area();
        if intersection.0.is_empty() || area <= 0.0 {
            continue;
        }
        if !area.is_finite() {
            return Err(VargeoError::invalid_geometry(
                format!("feature {i}"),
                "non-finite intersected area",
            ));
        }

        let original = polygon.unsigned_area();
        let ratio = if original > 0.0 { area / original } else { 1.0 };

        clipped.push(Clipped {
            feature,
            geometry: Geometry::MultiPolygon(intersection),
            ratio: Some(ratio),
            measure: area / SQ_METERS_PER_ACRE,
        });
    }

    Ok(clipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use serde_json::Map;

    fn square(min: f64, max: f64) -> MultiPolygon {
        MultiPolygon::new(vec![polygon![
            (x: min, y: min),
            (x: max, y: min),
            (x: max, y: max),
            (x: min, y: max),
        ]])
    }

    #[test]
    fn test_half_overlap_ratio() {
        let features = vec![Feature::new(
            Geometry::MultiPolygon(square(50.0, 150.0)),
            Map::new(),
        )];
        let ring = square(0.0, 100.0);
        let clipped = clip(&features, &ring).unwrap();
        assert_eq!(clipped.len(), 1);
        assert!((clipped[0].ratio.unwrap() - 0.25).abs() < 1e-9);
        assert!((clipped[0].measure - 2500.0 / SQ_METERS_PER_ACRE).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_is_dropped() {
        let features = vec![Feature::new(
            Geometry::MultiPolygon(square(200.0, 300.0)),
            Map::new(),
        )];
        assert!(clip(&features, &square(0.0, 100.0)).unwrap().is_empty());
    }
}
