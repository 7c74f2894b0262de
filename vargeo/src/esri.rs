//! Décodage des features Esri JSON (ArcGIS REST) vers les types `geo`

use geo::{BoundingRect, Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point};
use serde_json::{json, Map, Value};

use crate::repair;
use crate::types::{Dataset, Feature};
use crate::VargeoError;

/// Code EPSG de travail (Alaska Albers)
pub const WKID: u32 = 3338;

/// Décode une géométrie Esri JSON
///
/// `rings` passe par la réparation des polygones, `paths` donne des lignes,
/// `x`/`y` un point et `points` un multipoint.
pub fn geometry_from_esri(value: &Value, entity_id: &str) -> Result<Geometry, VargeoError> {
    let obj = value
        .as_object()
        .ok_or_else(|| VargeoError::invalid_geometry(entity_id, "geometry is not an object"))?;

    if let Some(rings) = obj.get("rings") {
        let rings = parse_parts(rings, entity_id)?;
        let polygon = repair::polygon_from_rings(&rings, entity_id)?;
        return Ok(Geometry::MultiPolygon(polygon));
    }

    if let Some(paths) = obj.get("paths") {
        let lines: Vec<LineString> = parse_parts(paths, entity_id)?
            .into_iter()
            .filter(|p| p.len() >= 2)
            .map(LineString::new)
            .collect();
        if lines.is_empty() {
            return Err(VargeoError::invalid_geometry(entity_id, "no usable path"));
        }
        return Ok(Geometry::MultiLineString(MultiLineString::new(lines)));
    }

    if let Some(points) = obj.get("points") {
        let coords = parse_positions(points, entity_id)?;
        if coords.is_empty() {
            return Err(VargeoError::invalid_geometry(entity_id, "empty multipoint"));
        }
        return Ok(Geometry::MultiPoint(MultiPoint::new(
            coords.into_iter().map(Point::from).collect(),
        )));
    }

    match (
        obj.get("x").and_then(Value::as_f64),
        obj.get("y").and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(Geometry::Point(Point::new(x, y))),
        _ => Err(VargeoError::invalid_geometry(
            entity_id,
            "unrecognized Esri geometry",
        )),
    }
}

/// Décode une feature `{ "attributes": {...}, "geometry": {...} }`
pub fn feature_from_esri(value: &Value, entity_id: &str) -> Result<Feature, VargeoError> {
    let geometry = value
        .get("geometry")
        .filter(|g| !g.is_null())
        .ok_or_else(|| VargeoError::invalid_geometry(entity_id, "feature has no geometry"))?;
    let geometry = geometry_from_esri(geometry, entity_id)?;

    let attributes = match value.get("attributes") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    Ok(Feature::new(geometry, attributes))
}

/// Décode toutes les features d'une réponse en un jeu de données homogène
pub fn dataset_from_esri(alias: &str, features: &[Value]) -> Result<Dataset, VargeoError> {
    let features = features
        .iter()
        .enumerate()
        .map(|(i, f)| feature_from_esri(f, &format!("{alias}[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;
    Dataset::new(alias, features)
}

/// Enveloppe Esri JSON d'un polygone, pour une requête spatiale
pub fn envelope(geometry: &MultiPolygon) -> Option<Value> {
    let rect = geometry.bounding_rect()?;
    Some(json!({
        "xmin": rect.min().x,
        "ymin": rect.min().y,
        "xmax": rect.max().x,
        "ymax": rect.max().y,
        "spatialReference": { "wkid": WKID },
    }))
}

fn parse_parts(value: &Value, entity_id: &str) -> Result<Vec<Vec<Coord>>, VargeoError> {
    value
        .as_array()
        .ok_or_else(|| VargeoError::invalid_geometry(entity_id, "parts are not an array"))?
        .iter()
        .map(|part| parse_positions(part, entity_id))
        .collect()
}

fn parse_positions(value: &Value, entity_id: &str) -> Result<Vec<Coord>, VargeoError> {
    value
        .as_array()
        .ok_or_else(|| VargeoError::invalid_geometry(entity_id, "positions are not an array"))?
        .iter()
        .map(|position| {
            let pair = position.as_array().filter(|p| p.len() >= 2);
            match pair.map(|p| (p[0].as_f64(), p[1].as_f64())) {
                Some((Some(x), Some(y))) => Ok(Coord { x, y }),
                _ => Err(VargeoError::invalid_geometry(
                    entity_id,
                    format!("invalid position {}", position),
                )),
            }
        })
        .collect()
}
