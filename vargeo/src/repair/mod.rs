//! Réparation des polygones Esri (rings sans sémantique trou / extérieur fiable)

pub mod ring;
pub mod topology;

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};

use crate::VargeoError;

/// Reconstruit un polygone à partir des rings d'une géométrie Esri
///
/// Un ring seul est orienté en anti-horaire. Avec plusieurs rings, les
/// intérieurs sont ceux contenus par un autre ring; chaque groupe est orienté
/// en anti-horaire puis dissous, et le résultat est extérieur moins intérieur.
pub fn polygon_from_rings(
    rings: &[Vec<Coord>],
    entity_id: &str,
) -> Result<MultiPolygon, VargeoError> {
    let closed: Vec<LineString> = rings
        .iter()
        .map(|coords| ring::close_ring(coords, entity_id))
        .collect::<Result<_, _>>()?;

    let result = match closed.len() {
        0 => {
            return Err(VargeoError::RepairFailed {
                entity_id: entity_id.to_string(),
                reason: "no rings".to_string(),
            })
        }
        1 => {
            let shell = closed.into_iter().next().map(ring::into_ccw);
            MultiPolygon::new(shell.map(|s| Polygon::new(s, vec![])).into_iter().collect())
        }
        _ => {
            let (exterior_idx, interior_idx) = topology::classify_rings(&closed);
            let to_polygons = |indices: Vec<usize>| -> Vec<Polygon> {
                indices
                    .into_iter()
                    .map(|i| Polygon::new(ring::into_ccw(closed[i].clone()), vec![]))
                    .collect()
            };
            let exterior = topology::dissolve(to_polygons(exterior_idx));
            let interior = topology::dissolve(to_polygons(interior_idx));
            if interior.0.is_empty() {
                exterior
            } else {
                exterior.difference(&interior)
            }
        }
    };

    if result.0.is_empty() {
        return Err(VargeoError::RepairFailed {
            entity_id: entity_id.to_string(),
            reason: "reconstruction produced an empty polygon".to_string(),
        });
    }

    Ok(result)
}
