//! Lecture des anneaux de feux (GeoJSON, EPSG:3338)
//!
//! Chaque feature porte `fire_id` et `ring` (0, 1, 3 ou 5) en propriétés.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use geo::{Geometry, MultiPolygon};
use geojson::GeoJson;
use serde_json::Value;
use tracing::info;
use vargeo::{FireRings, RingLevel};

/// Lit les anneaux de feux depuis un fichier GeoJSON
pub fn read_fire_rings(path: &Path) -> Result<Vec<FireRings>> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read fires file: {}", path.display()))?;
    let fires = parse_fire_rings(&content)
        .with_context(|| format!("Invalid fires file: {}", path.display()))?;
    info!(path = %path.display(), fires = fires.len(), "Fire rings loaded");
    Ok(fires)
}

/// Analyse une FeatureCollection et regroupe les anneaux par feu
pub fn parse_fire_rings(content: &str) -> Result<Vec<FireRings>> {
    let geojson: GeoJson = content.parse().context("Failed to parse GeoJSON")?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        bail!("Expected a FeatureCollection");
    };

    let mut grouped: BTreeMap<String, Vec<(RingLevel, MultiPolygon)>> = BTreeMap::new();

    for (i, feature) in collection.features.iter().enumerate() {
        let fire_id = match feature.property("fire_id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => bail!("Feature {} has no fire_id", i),
        };
        let ring = feature
            .property("ring")
            .and_then(Value::as_u64)
            .and_then(RingLevel::from_miles)
            .ok_or_else(|| anyhow!("Feature {} ({}) has no valid ring (0, 1, 3 or 5)", i, fire_id))?;

        let geometry = feature
            .geometry
            .as_ref()
            .ok_or_else(|| anyhow!("Feature {} ({}) has no geometry", i, fire_id))?;
        let geometry = Geometry::<f64>::try_from(&geometry.value)
            .with_context(|| format!("Feature {} ({}) has an invalid geometry", i, fire_id))?;
        let polygon = match geometry {
            Geometry::Polygon(p) => MultiPolygon(vec![p]),
            Geometry::MultiPolygon(mp) => mp,
            _ => bail!("Feature {} ({}) is not a polygon", i, fire_id),
        };

        grouped.entry(fire_id).or_default().push((ring, polygon));
    }

    grouped
        .into_iter()
        .map(|(fire_id, rings)| FireRings::new(fire_id, rings).map_err(anyhow::Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ring_feature(fire_id: Value, ring: u64, half: f64) -> Value {
        json!({
            "type": "Feature",
            "properties": {"fire_id": fire_id, "ring": ring},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-half, -half], [half, -half], [half, half], [-half, half], [-half, -half]]]
            }
        })
    }

    fn collection(features: Vec<Value>) -> String {
        json!({"type": "FeatureCollection", "features": features}).to_string()
    }

    #[test]
    fn test_parse_fire_rings() {
        let mut features: Vec<Value> = [0, 1, 3, 5]
            .iter()
            .map(|&r| ring_feature(json!("AK-123"), r, 100.0 + r as f64 * 1609.34))
            .collect();
        features.extend([0, 1, 3, 5].iter().map(|&r| ring_feature(json!(42), r, 50.0 + r as f64)));

        let fires = parse_fire_rings(&collection(features)).unwrap();
        assert_eq!(fires.len(), 2);
        assert_eq!(fires[0].fire_id, "42");
        assert_eq!(fires[1].fire_id, "AK-123");
    }

    #[test]
    fn test_missing_ring_rejected() {
        let features = [0, 1, 3]
            .iter()
            .map(|&r| ring_feature(json!("A"), r, 10.0))
            .collect();
        let err = parse_fire_rings(&collection(features)).unwrap_err();
        assert!(format!("{:#}", err).contains("missing ring levels"));
    }

    #[test]
    fn test_invalid_ring_value_rejected() {
        let features = vec![ring_feature(json!("A"), 2, 10.0)];
        assert!(parse_fire_rings(&collection(features)).is_err());
    }
}
