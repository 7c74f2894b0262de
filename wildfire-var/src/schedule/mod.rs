//! Ordonnancement des analyses (CPU) par vagues de threads
//!
//! Une unité par (feu, anneau, jeu de données) plus une unité de proximité
//! par (feu, jeu de données). Chaque unité possède son sous-ensemble de
//! features; la directive est partagée en lecture seule.

pub mod waves;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use geo::{BoundingRect, Intersects, MultiPolygon};
use tracing::{error, info};
use vargeo::{analysis, proximity, AttributeValue, Attribution, Dataset, Directive, ErrorKind, FireRings, RingLevel};

pub use waves::{run_waves, WaveConfig};

/// Nature d'une unité de travail
#[derive(Debug, Clone)]
pub enum UnitKind {
    /// Analyse d'un anneau
    Ring(RingLevel),
    /// Features les plus proches; `fire` est le périmètre (niveau 0)
    Proximity { fire: MultiPolygon },
}

/// Unité de travail confiée à un seul worker
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub fire_id: String,
    pub kind: UnitKind,
    /// Anneau analysé (anneau 5 pour la proximité)
    pub geometry: MultiPolygon,
    pub dataset: Dataset,
    pub directive: Arc<Directive>,
}

impl WorkUnit {
    /// Ensemble complet des attributs de l'unité avec une valeur unique
    pub fn complement(&self, value: AttributeValue) -> Vec<Attribution> {
        match self.kind {
            UnitKind::Ring(level) => self.directive.ring_complement(&self.fire_id, level, &value),
            UnitKind::Proximity { .. } => self.directive.nearest_complement(&self.fire_id, &value),
        }
    }

    /// Exécute l'analyse; une erreur donne le complément `!ANALYSISERROR!`
    pub fn run(&self, budget: usize) -> Vec<Attribution> {
        let result = match &self.kind {
            UnitKind::Ring(level) => analysis::analyze_ring(
                &self.fire_id,
                *level,
                &self.geometry,
                &self.dataset,
                &self.directive,
                budget,
            ),
            UnitKind::Proximity { fire } => analysis::clip_dataset(&self.dataset, &self.geometry)
                .and_then(|clipped| {
                    proximity::analyze_proximity(&self.fire_id, fire, &clipped, &self.directive, budget)
                }),
        };

        result.unwrap_or_else(|e| {
            error!(
                fire_id = %self.fire_id,
                alias = %self.directive.alias(),
                unit = %self.label(),
                error = %e,
                "Analysis failed"
            );
            self.complement(AttributeValue::Error(ErrorKind::Analysis))
        })
    }

    fn label(&self) -> String {
        match self.kind {
            UnitKind::Ring(level) => format!("ring {}", level),
            UnitKind::Proximity { .. } => "proximity".to_string(),
        }
    }
}

/// Sous-ensemble des features dont l'emprise touche celle du polygone
fn bbox_subset(dataset: &Dataset, geometry: &MultiPolygon) -> Dataset {
    let Some(rect) = geometry.bounding_rect() else {
        return dataset.subset(|_| false);
    };
    dataset.subset(|f| f.geometry.bounding_rect().is_some_and(|r| r.intersects(&rect)))
}

/// Construit les unités de travail
///
/// Les jeux de données d'un feu inconnu reçoivent directement le complément
/// `!UNEXPECTED!`, renvoyé en second élément.
pub fn build_units(
    fires: &[FireRings],
    analyzable: BTreeMap<String, Vec<Dataset>>,
    directives: &HashMap<String, Arc<Directive>>,
) -> (Vec<WorkUnit>, Vec<Attribution>) {
    let by_id: HashMap<&str, &FireRings> = fires.iter().map(|f| (f.fire_id.as_str(), f)).collect();
    let mut units = Vec::new();
    let mut tuples = Vec::new();

    for (fire_id, datasets) in analyzable {
        for dataset in datasets {
            let Some(directive) = directives.get(&dataset.alias) else {
                error!(fire_id = %fire_id, alias = %dataset.alias, "No analysis directive for alias");
                continue;
            };
            let Some(fire) = by_id.get(fire_id.as_str()) else {
                error!(fire_id = %fire_id, alias = %dataset.alias, "Dataset routed to unknown fire");
                tuples.extend(directive.complement(&fire_id, &AttributeValue::Error(ErrorKind::Unexpected)));
                continue;
            };

            if directive.has_ring_operations() {
                for (level, ring) in fire.iter() {
                    units.push(WorkUnit {
                        fire_id: fire_id.clone(),
                        kind: UnitKind::Ring(level),
                        geometry: ring.clone(),
                        dataset: bbox_subset(&dataset, ring),
                        directive: Arc::clone(directive),
                    });
                }
            }

            if directive.nearest_fields().is_some() {
                let ring = fire.max_ring();
                units.push(WorkUnit {
                    fire_id: fire_id.clone(),
                    kind: UnitKind::Proximity { fire: fire.fire().clone() },
                    geometry: ring.clone(),
                    dataset: bbox_subset(&dataset, ring),
                    directive: Arc::clone(directive),
                });
            }
        }
    }

    (units, tuples)
}

/// Exécute toutes les unités et renvoie leurs attributs
///
/// Un worker qui panique (ou ne peut être lancé) produit le complément
/// `!EXCEPTION!` de son unité.
pub fn execute(units: Vec<WorkUnit>, config: &WaveConfig, budget: usize) -> Vec<Attribution> {
    info!(units = units.len(), wave_size = config.wave_size, "Running analysis units");

    run_waves(
        units,
        config,
        move |unit: WorkUnit| unit.run(budget),
        |unit: &WorkUnit| unit.complement(AttributeValue::Error(ErrorKind::Exception)),
    )
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon, Geometry, MultiLineString};
    use serde_json::Map;
    use vargeo::{Feature, GeometryKind, Operation};

    fn square(cx: f64, cy: f64, half: f64) -> MultiPolygon {
        MultiPolygon(vec![polygon![
            (x: cx - half, y: cy - half),
            (x: cx + half, y: cy - half),
            (x: cx + half, y: cy + half),
            (x: cx - half, y: cy + half),
        ]])
    }

    fn fire() -> FireRings {
        FireRings::new(
            "F1",
            RingLevel::ALL
                .iter()
                .map(|&l| (l, square(0.0, 0.0, 1000.0 + l.buffer_meters())))
                .collect(),
        )
        .unwrap()
    }

    fn road(x: f64) -> Feature {
        let line = MultiLineString(vec![line_string![(x: x, y: -10.0), (x: x, y: 10.0)]]);
        let mut attributes = Map::new();
        attributes.insert("NAME".into(), serde_json::json!(format!("road {x}")));
        Feature::new(Geometry::MultiLineString(line), attributes)
    }

    fn roads_directive(ops: Vec<Operation>) -> HashMap<String, Arc<Directive>> {
        HashMap::from([("roads".to_string(), Arc::new(Directive::new("roads", ops).unwrap()))])
    }

    fn config() -> WaveConfig {
        WaveConfig {
            wave_size: 2,
            channel_capacity: 1,
            poll_interval: std::time::Duration::from_millis(5),
        }
    }

    #[test]
    fn test_build_units_counts_and_subsets() {
        // une route dans le feu, une à 3 km (anneaux 3 et 5 seulement)
        let dataset = Dataset::new("roads", vec![road(0.0), road(4000.0)]).unwrap();
        let analyzable = BTreeMap::from([("F1".to_string(), vec![dataset])]);
        let directives = roads_directive(vec![
            Operation::FeatureCount,
            Operation::NearestFeatures(vec!["NAME".into()]),
        ]);

        let (units, tuples) = build_units(&[fire()], analyzable, &directives);
        assert!(tuples.is_empty());
        assert_eq!(units.len(), 5);

        let sizes: Vec<usize> = units.iter().map(|u| u.dataset.len()).collect();
        assert_eq!(sizes, vec![1, 1, 2, 2, 2]);
        assert!(matches!(units[4].kind, UnitKind::Proximity { .. }));
    }

    #[test]
    fn test_build_units_unknown_fire() {
        let dataset = Dataset::new("roads", vec![road(0.0)]).unwrap();
        let analyzable = BTreeMap::from([("ghost".to_string(), vec![dataset])]);
        let directives = roads_directive(vec![Operation::TotalLengthFt]);

        let (units, tuples) = build_units(&[fire()], analyzable, &directives);
        assert!(units.is_empty());
        assert_eq!(tuples.len(), 4);
        assert!(tuples
            .iter()
            .all(|t| t.value == AttributeValue::Error(ErrorKind::Unexpected)));
    }

    #[test]
    fn test_execute_produces_complete_sets() {
        let dataset = Dataset::new("roads", vec![road(0.0), road(4000.0)]).unwrap();
        let analyzable = BTreeMap::from([("F1".to_string(), vec![dataset])]);
        let directives = roads_directive(vec![
            Operation::FeatureCount,
            Operation::TotalLengthFt,
            Operation::NearestFeatures(vec!["NAME".into()]),
        ]);

        let (units, _) = build_units(&[fire()], analyzable, &directives);
        let tuples = execute(units, &config(), vargeo::DEFAULT_BUDGET);
        assert_eq!(tuples.len(), 4 * 2 + 2);

        let count = |ring: RingLevel| {
            tuples
                .iter()
                .find(|t| t.ring == ring && t.name == "roads_feat_count")
                .map(|t| t.value.clone())
        };
        assert_eq!(count(RingLevel::Fire), Some(AttributeValue::Int(1)));
        assert_eq!(count(RingLevel::FiveMiles), Some(AttributeValue::Int(2)));
    }

    #[test]
    fn test_analyzer_failure_fills_unit_complement() {
        let dataset = Dataset::new("roads", vec![road(0.0), road(4000.0)]).unwrap();
        let analyzable = BTreeMap::from([("F1".to_string(), vec![dataset])]);
        let directives = roads_directive(vec![
            Operation::FeatureCount,
            Operation::AttrCount(vec!["NAME".into()]),
            Operation::NearestFeatures(vec!["NAME".into()]),
        ]);

        // des lignes déclarées surfaciques font échouer la découpe
        let (mut units, _) = build_units(&[fire()], analyzable, &directives);
        for unit in &mut units {
            unit.dataset.kind = GeometryKind::Areal;
        }
        let tuples = execute(units, &config(), vargeo::DEFAULT_BUDGET);

        let mut expected: Vec<(RingLevel, String)> = RingLevel::ALL
            .iter()
            .flat_map(|&ring| {
                ["roads_feat_count", "roads_NAME_attr_count"]
                    .map(|name| (ring, name.to_string()))
            })
            .collect();
        expected.push((RingLevel::Fire, "roads_nearest_feats".to_string()));
        expected.push((RingLevel::Fire, "roads_interior_feats".to_string()));
        expected.sort();

        let mut produced: Vec<(RingLevel, String)> =
            tuples.iter().map(|t| (t.ring, t.name.clone())).collect();
        produced.sort();
        assert_eq!(produced, expected);
        assert!(tuples.iter().all(|t| t.fire_id == "F1"
            && t.value == AttributeValue::Error(ErrorKind::Analysis)));
    }

    #[test]
    fn test_proximity_failure_fills_nearest_complement() {
        let dataset = Dataset::new("roads", vec![road(0.0), road(4000.0)]).unwrap();
        let analyzable = BTreeMap::from([("F1".to_string(), vec![dataset])]);
        let directives = roads_directive(vec![Operation::NearestFeatures(vec!["NAME".into()])]);

        let (units, _) = build_units(&[fire()], analyzable, &directives);
        let unit = units
            .iter()
            .find(|u| matches!(u.kind, UnitKind::Proximity { .. }))
            .unwrap();

        // aucun ensemble ne tient dans 10 octets
        let tuples = unit.run(10);
        assert_eq!(tuples.len(), 2);
        assert!(tuples.iter().all(|t| t.ring == RingLevel::Fire
            && t.value == AttributeValue::Error(ErrorKind::Analysis)));
    }
}
