//! Fermeture et orientation des rings Esri

use geo::{Coord, LineString, Winding};

use crate::VargeoError;

/// Construit un ring fermé à partir de positions brutes
///
/// Les positions consécutives identiques sont fusionnées. Un ring non fermé
/// est fermé automatiquement; moins de 3 positions distinctes est une erreur.
pub fn close_ring(coords: &[Coord], entity_id: &str) -> Result<LineString, VargeoError> {
    let mut ring: Vec<Coord> = Vec::with_capacity(coords.len() + 1);
    for &c in coords {
        if ring.last().map_or(true, |&last| !coords_equal(last, c)) {
            ring.push(c);
        }
    }

    let is_closed = ring.len() > 1 && coords_equal(ring[0], ring[ring.len() - 1]);
    let distinct = if is_closed { ring.len() - 1 } else { ring.len() };
    if distinct < 3 {
        return Err(VargeoError::RepairFailed {
            entity_id: entity_id.to_string(),
            reason: format!("ring has {} distinct positions", distinct),
        });
    }

    if !is_closed {
        let first = ring[0];
        let last = ring[ring.len() - 1];
        let gap = ((first.x - last.x).powi(2) + (first.y - last.y).powi(2)).sqrt();
        tracing::debug!(
            entity_id = entity_id,
            points = ring.len(),
            gap_meters = gap,
            "Auto-closing unclosed ring"
        );
        ring.push(first);
    }

    Ok(LineString::new(ring))
}

/// Oriente un ring dans le sens anti-horaire
pub fn into_ccw(mut ring: LineString) -> LineString {
    if !ring.is_ccw() {
        ring.make_ccw_winding();
    }
    ring
}

/// Compare deux coordonnées avec une tolérance
#[inline]
fn coords_equal(a: Coord, b: Coord) -> bool {
    const EPSILON: f64 = 1e-9;
    (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_ring_auto_closes() {
        let coords = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
        ];
        let ring = close_ring(&coords, "test").unwrap();
        assert_eq!(ring.0.len(), 4);
        assert!(ring.is_closed());
    }

    #[test]
    fn test_close_ring_rejects_degenerate() {
        let coords = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 0.0, y: 0.0 },
        ];
        assert!(close_ring(&coords, "test").is_err());
    }

    #[test]
    fn test_into_ccw() {
        // Sens horaire, convention Esri pour les extérieurs
        let cw = LineString::from(vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)]);
        assert!(cw.is_cw());
        assert!(into_ccw(cw).is_ccw());
    }
}
