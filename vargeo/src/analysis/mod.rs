//! Analyseurs typés par géométrie (surfacique, linéaire, ponctuel)
//!
//! Chaque analyse d'anneau produit l'ensemble complet des attributs de la
//! directive: une opération non applicable au type du jeu de données vaut
//! `Null`, une opération en échec vaut `Error(Analysis)`.

pub mod aggregate;
pub mod areal;
pub mod linear;
pub mod point;

use geo::{Geometry, MultiPolygon};
use tracing::warn;

use crate::directive::{Directive, Operation};
use crate::types::{AttributeValue, Attribution, Dataset, ErrorKind, Feature, GeometryKind, RingLevel};
use crate::VargeoError;

/// Feature retenue après découpe par un anneau
#[derive(Debug, Clone)]
pub struct Clipped<'a> {
    /// Feature d'origine (attributs)
    pub feature: &'a Feature,
    /// Géométrie découpée
    pub geometry: Geometry,
    /// Part conservée (surface ou longueur); `None` pour les points
    pub ratio: Option<f64>,
    /// Acres ou pieds conservés selon le type
    pub measure: f64,
}

/// Découpe un jeu de données par un polygone
pub fn clip<'a>(dataset: &'a Dataset, ring: &MultiPolygon) -> Result<Vec<Clipped<'a>>, VargeoError> {
    match dataset.kind {
        GeometryKind::Areal => areal::clip(&dataset.features, ring),
        GeometryKind::Linear => linear::clip(&dataset.features, ring),
        GeometryKind::Point => Ok(point::clip(&dataset.features, ring)),
    }
}

/// Jeu de données possédé dont les géométries sont découpées par le polygone
pub fn clip_dataset(dataset: &Dataset, ring: &MultiPolygon) -> Result<Dataset, VargeoError> {
    let features = clip(dataset, ring)?
        .into_iter()
        .map(|c| Feature::new(c.geometry, c.feature.attributes.clone()))
        .collect();
    Ok(Dataset {
        alias: dataset.alias.clone(),
        kind: dataset.kind,
        features,
    })
}

/// Analyse un jeu de données pour un anneau d'un feu
///
/// Une erreur n'est renvoyée que si la découpe elle-même échoue.
pub fn analyze_ring(
    fire_id: &str,
    ring: RingLevel,
    geometry: &MultiPolygon,
    dataset: &Dataset,
    directive: &Directive,
    budget: usize,
) -> Result<Vec<Attribution>, VargeoError> {
    let rows = clip(dataset, geometry)?;

    if rows.is_empty() {
        return Ok(directive.ring_complement(fire_id, ring, &AttributeValue::Null));
    }

    let kind = dataset.kind;
    let alias = directive.alias();
    let mut tuples = Vec::new();
    let mut push = |name: String, value: Result<AttributeValue, VargeoError>| {
        let value = value.unwrap_or_else(|e| {
            warn!(fire_id = %fire_id, ring = %ring, attribute = %name, error = %e, "Analysis failed");
            AttributeValue::Error(ErrorKind::Analysis)
        });
        tuples.push(Attribution::new(fire_id, ring, name, value));
    };

    for op in directive.operations() {
        let names = op.attribute_names(alias);
        match op {
            Operation::FeatureCount => {
                push(names[0].clone(), Ok(AttributeValue::Int(rows.len() as i64)));
            }
            Operation::TotalAcres => {
                let value = if kind == GeometryKind::Areal {
                    let acres: f64 = rows.iter().map(|r| r.measure).sum();
                    AttributeValue::Float(aggregate::round2(acres))
                } else {
                    AttributeValue::Null
                };
                push(names[0].clone(), Ok(value));
            }
            Operation::TotalLengthFt => {
                let value = if kind == GeometryKind::Linear {
                    let feet: f64 = rows.iter().map(|r| r.measure).sum();
                    AttributeValue::Int(feet.trunc() as i64)
                } else {
                    AttributeValue::Null
                };
                push(names[0].clone(), Ok(value));
            }
            Operation::AcresSum(fields) => {
                for (name, field) in names.into_iter().zip(fields) {
                    let value = if kind == GeometryKind::Areal {
                        aggregate::acres_sum(&rows, field, budget).map(AttributeValue::Text)
                    } else {
                        Ok(AttributeValue::Null)
                    };
                    push(name, value);
                }
            }
            Operation::LengthFtSum(fields) => {
                for (name, field) in names.into_iter().zip(fields) {
                    let value = if kind == GeometryKind::Linear {
                        aggregate::feet_sum(&rows, field, budget).map(AttributeValue::Text)
                    } else {
                        Ok(AttributeValue::Null)
                    };
                    push(name, value);
                }
            }
            Operation::ValueSum(fields) => {
                for (name, field) in names.into_iter().zip(fields) {
                    push(name, aggregate::value_sum(&rows, field).map(AttributeValue::Int));
                }
            }
            Operation::AttrCount(fields) => {
                for (name, field) in names.into_iter().zip(fields) {
                    push(
                        name,
                        aggregate::attr_count(&rows, field, budget).map(AttributeValue::Text),
                    );
                }
            }
            Operation::NearestFeatures(_) => {}
        }
    }

    Ok(tuples)
}
