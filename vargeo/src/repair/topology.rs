//! Classification des rings (extérieurs / intérieurs) et dissolution

use geo::{BooleanOps, BoundingRect, Contains, Intersects, LineString, MultiPolygon, Polygon};

/// Sépare les rings en extérieurs et intérieurs
///
/// Un ring est intérieur s'il est contenu par au moins un autre ring.
/// Les boîtes englobantes servent de pré-filtre avant le test de contenance.
pub fn classify_rings(rings: &[LineString]) -> (Vec<usize>, Vec<usize>) {
    let polygons: Vec<Polygon> = rings
        .iter()
        .map(|r| Polygon::new(r.clone(), vec![]))
        .collect();
    let bboxes: Vec<_> = rings.iter().map(|r| r.bounding_rect()).collect();

    let mut exterior = Vec::new();
    let mut interior = Vec::new();

    for i in 0..rings.len() {
        let contained = (0..rings.len()).any(|j| {
            if i == j {
                return false;
            }
            let candidate = match (bboxes[i], bboxes[j]) {
                (Some(a), Some(b)) => a.intersects(&b),
                _ => false,
            };
            candidate && polygons[j].contains(&polygons[i])
        });

        if contained {
            interior.push(i);
        } else {
            exterior.push(i);
        }
    }

    (exterior, interior)
}

/// Dissout une liste de polygones en un multipolygone valide
pub fn dissolve(polygons: Vec<Polygon>) -> MultiPolygon {
    polygons
        .into_iter()
        .fold(MultiPolygon::new(vec![]), |acc, polygon| {
            acc.union(&MultiPolygon::new(vec![polygon]))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn square(min: f64, max: f64) -> LineString {
        LineString::from(vec![(min, min), (max, min), (max, max), (min, max), (min, min)])
    }

    #[test]
    fn test_classify_nested() {
        let rings = vec![square(0.0, 10.0), square(2.0, 4.0), square(20.0, 30.0)];
        let (exterior, interior) = classify_rings(&rings);
        assert_eq!(exterior, vec![0, 2]);
        assert_eq!(interior, vec![1]);
    }

    #[test]
    fn test_dissolve_overlapping() {
        let merged = dissolve(vec![
            Polygon::new(square(0.0, 2.0), vec![]),
            Polygon::new(square(1.0, 3.0), vec![]),
        ]);
        assert!((merged.unsigned_area() - 7.0).abs() < 1e-9);
    }
}
