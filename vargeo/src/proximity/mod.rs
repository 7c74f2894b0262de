//! Analyse de proximité: features les plus proches du périmètre et features intérieures
//!
//! Calculée une fois par couple (feu, jeu de données) sur les features
//! découpées par le tampon maximal. Chaque groupe est trié par distance au
//! contour, plafonné à [`MAX_FEATURES`] puis borné en taille par
//! [`crate::serialize`].

pub mod compass;
pub mod nearest;

use geo::{EuclideanDistance, Intersects, MultiPolygon, Point};
use serde_json::Value;

use crate::analysis::aggregate::{round2, NO_DATA};
use crate::directive::Directive;
use crate::project;
use crate::serialize::{serialize_within_budget, FeatureSet, NearbyFeature};
use crate::types::{AttributeValue, Attribution, Dataset, RingLevel};
use crate::VargeoError;

/// Mètres par mile
pub const METERS_PER_MILE: f64 = 1609.34;

/// Plafond de features par groupe avant le budget de taille
pub const MAX_FEATURES: usize = 50;

/// Mesure d'une feature vis-à-vis du contour du feu
struct Measured {
    index: usize,
    meters: f64,
    on_feature: Point,
    on_boundary: Point,
}

/// Analyse de proximité pour un feu; produit les attributs `_nearest_feats`
/// et `_interior_feats` au niveau 0
pub fn analyze_proximity(
    fire_id: &str,
    fire: &MultiPolygon,
    dataset: &Dataset,
    directive: &Directive,
    budget: usize,
) -> Result<Vec<Attribution>, VargeoError> {
    let Some(fields) = directive.nearest_fields() else {
        return Ok(Vec::new());
    };

    if dataset.is_empty() {
        return Ok(directive.nearest_complement(fire_id, &AttributeValue::Null));
    }

    let boundary = nearest::boundary(fire);
    let mut interior = Vec::new();
    let mut exterior = Vec::new();

    for (index, feature) in dataset.features.iter().enumerate() {
        let (on_feature, on_boundary) = nearest::nearest_points(&feature.geometry, &boundary)
            .ok_or_else(|| {
                VargeoError::analysis(directive.nearest_name(), format!("feature {index} has no coordinates"))
            })?;
        let measured = Measured {
            index,
            meters: on_feature.euclidean_distance(&on_boundary),
            on_feature,
            on_boundary,
        };
        if feature.geometry.intersects(fire) {
            interior.push(measured);
        } else {
            exterior.push(measured);
        }
    }

    let interior_set = build_set(dataset, fields, interior, true)?;
    let nearest_set = build_set(dataset, fields, exterior, false)?;

    Ok(vec![
        Attribution::new(
            fire_id,
            RingLevel::Fire,
            directive.nearest_name(),
            to_value(nearest_set, budget)?,
        ),
        Attribution::new(
            fire_id,
            RingLevel::Fire,
            directive.interior_name(),
            to_value(interior_set, budget)?,
        ),
    ])
}

fn to_value(set: Option<FeatureSet>, budget: usize) -> Result<AttributeValue, VargeoError> {
    match set {
        Some(set) => Ok(AttributeValue::Text(serialize_within_budget(set, budget)?)),
        None => Ok(AttributeValue::Null),
    }
}

/// Trie, plafonne et met en forme un groupe; `None` si le groupe est vide
fn build_set(
    dataset: &Dataset,
    fields: &[String],
    mut group: Vec<Measured>,
    is_interior: bool,
) -> Result<Option<FeatureSet>, VargeoError> {
    if group.is_empty() {
        return Ok(None);
    }

    // Tri stable: à distance égale, l'ordre d'origine est conservé
    group.sort_by(|a, b| a.meters.total_cmp(&b.meters));

    let total = group.len();
    group.truncate(MAX_FEATURES);
    let popped = total - group.len();
    let cutoff = match group.last() {
        Some(last) if popped > 0 => Some(round2(last.meters / METERS_PER_MILE)),
        _ => None,
    };

    let features = group
        .iter()
        .map(|m| describe(dataset, fields, m, is_interior))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(FeatureSet {
        features,
        popped,
        cutoff,
    }))
}

fn describe(
    dataset: &Dataset,
    fields: &[String],
    measured: &Measured,
    is_interior: bool,
) -> Result<NearbyFeature, VargeoError> {
    let feature = &dataset.features[measured.index];
    let (lat, lng) = project::lat_lng_degrees(measured.on_feature)?;

    let dir = if is_interior {
        "Interior"
    } else {
        compass::cardinal_direction(measured.on_boundary, measured.on_feature)
    };

    let fields = fields
        .iter()
        .map(|field| {
            let value = feature
                .attribute(field)
                .cloned()
                .unwrap_or_else(|| Value::String(NO_DATA.to_string()));
            (field.clone(), value)
        })
        .collect();

    Ok(NearbyFeature {
        dist_mi: round2(measured.meters / METERS_PER_MILE),
        dir: dir.to_string(),
        lat: compass::ddm_lat(lat),
        lng: compass::ddm_lng(lng),
        fields,
    })
}
