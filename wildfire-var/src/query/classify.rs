//! Tri des réponses de requêtes
//!
//! Chaque outcome donne soit un jeu de données à analyser, soit l'ensemble
//! complet des attributs de sa directive (valeur nulle ou sentinelle).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, error};
use vargeo::{esri, AttributeValue, Attribution, Dataset, Directive, ErrorKind};

use super::QueryOutcome;

/// Résultat du tri
#[derive(Debug, Default)]
pub struct Classified {
    /// Jeux de données à analyser, groupés par feu
    pub analyzable: BTreeMap<String, Vec<Dataset>>,
    /// Attributs définitifs (aucune analyse nécessaire)
    pub tuples: Vec<Attribution>,
    /// Échecs du mécanisme de requêtage
    pub critical: usize,
}

enum Triage {
    Analyzable { fire_id: String, dataset: Dataset },
    Final(Vec<Attribution>),
    Critical,
}

/// Trie les outcomes en parallèle puis fusionne
pub fn classify(
    outcomes: Vec<QueryOutcome>,
    directives: &HashMap<String, Arc<Directive>>,
) -> Classified {
    let triaged: Vec<Triage> = outcomes
        .into_par_iter()
        .map(|outcome| triage(outcome, directives))
        .collect();

    let mut classified = Classified::default();
    for item in triaged {
        match item {
            Triage::Analyzable { fire_id, dataset } => {
                classified.analyzable.entry(fire_id).or_default().push(dataset);
            }
            Triage::Final(tuples) => classified.tuples.extend(tuples),
            Triage::Critical => classified.critical += 1,
        }
    }

    debug!(
        fires = classified.analyzable.len(),
        tuples = classified.tuples.len(),
        critical = classified.critical,
        "Responses classified"
    );
    classified
}

fn triage(outcome: QueryOutcome, directives: &HashMap<String, Arc<Directive>>) -> Triage {
    let (fire_id, alias, result) = match outcome {
        QueryOutcome::Harness { detail } => {
            error!(critical = true, detail = %detail, "Query task failed outside of its own error handling");
            return Triage::Critical;
        }
        QueryOutcome::Response {
            fire_id,
            alias,
            result,
        } => (fire_id, alias, result),
    };

    let Some(directive) = directives.get(&alias) else {
        error!(fire_id = %fire_id, alias = %alias, "No analysis directive for alias");
        return Triage::Final(Vec::new());
    };

    let payload = match result {
        Ok(payload) => payload,
        Err(detail) => {
            error!(fire_id = %fire_id, alias = %alias, error = %detail, "Query failed");
            return complement(directive, &fire_id, AttributeValue::Error(ErrorKind::Query));
        }
    };

    if is_error_payload(&payload) {
        error!(fire_id = %fire_id, alias = %alias, response = %payload, "Service returned an error");
        return complement(directive, &fire_id, AttributeValue::Error(ErrorKind::Query));
    }

    let Some(Value::Array(features)) = payload.get("features") else {
        error!(fire_id = %fire_id, alias = %alias, "Unexpected query response");
        return complement(directive, &fire_id, AttributeValue::Error(ErrorKind::Unexpected));
    };

    if features.is_empty() {
        return complement(directive, &fire_id, AttributeValue::Null);
    }

    match esri::dataset_from_esri(&alias, features) {
        Ok(dataset) => Triage::Analyzable { fire_id, dataset },
        Err(e) => {
            error!(fire_id = %fire_id, alias = %alias, error = %e, "Failed to decode features");
            complement(directive, &fire_id, AttributeValue::Error(ErrorKind::Unexpected))
        }
    }
}

fn complement(directive: &Directive, fire_id: &str, value: AttributeValue) -> Triage {
    Triage::Final(directive.complement(fire_id, &value))
}

/// Réponse de la forme `{"error": ...}` et rien d'autre
fn is_error_payload(payload: &Value) -> bool {
    payload
        .as_object()
        .map(|obj| obj.len() == 1 && obj.contains_key("error"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vargeo::{Operation, RingLevel};

    fn directives() -> HashMap<String, Arc<Directive>> {
        let roads = Directive::new(
            "roads",
            vec![
                Operation::TotalLengthFt,
                Operation::NearestFeatures(vec!["NAME".into()]),
            ],
        )
        .unwrap();
        HashMap::from([("roads".to_string(), Arc::new(roads))])
    }

    fn response(fire_id: &str, result: Result<Value, String>) -> QueryOutcome {
        QueryOutcome::Response {
            fire_id: fire_id.into(),
            alias: "roads".into(),
            result,
        }
    }

    fn values_of(tuples: &[Attribution], fire_id: &str) -> Vec<AttributeValue> {
        tuples
            .iter()
            .filter(|t| t.fire_id == fire_id)
            .map(|t| t.value.clone())
            .collect()
    }

    #[test]
    fn test_classification_is_exhaustive() {
        let line = json!({"geometry": {"paths": [[[0, 0], [10, 0]]]}, "attributes": {"NAME": "A"}});
        let outcomes = vec![
            response("failed", Err("connection reset".into())),
            response("error", Ok(json!({"error": {"code": 400}}))),
            response("empty", Ok(json!({"features": []}))),
            response("data", Ok(json!({"features": [line]}))),
            response("odd", Ok(json!({"count": 3}))),
            response("broken", Ok(json!({"features": [{"attributes": {}}]}))),
            QueryOutcome::Harness {
                detail: "task panicked".into(),
            },
        ];

        let classified = classify(outcomes, &directives());
        assert_eq!(classified.critical, 1);
        assert_eq!(classified.analyzable.len(), 1);
        assert_eq!(classified.analyzable["data"][0].len(), 1);

        // 4 niveaux × 1 attribut + nearest/interior
        let expected = |fire_id: &str, value: AttributeValue| {
            let values = values_of(&classified.tuples, fire_id);
            assert_eq!(values.len(), 6, "{fire_id}");
            assert!(values.iter().all(|v| *v == value), "{fire_id}");
        };
        expected("failed", AttributeValue::Error(ErrorKind::Query));
        expected("error", AttributeValue::Error(ErrorKind::Query));
        expected("empty", AttributeValue::Null);
        expected("odd", AttributeValue::Error(ErrorKind::Unexpected));
        expected("broken", AttributeValue::Error(ErrorKind::Unexpected));
        assert!(values_of(&classified.tuples, "data").is_empty());
    }

    #[test]
    fn test_error_key_with_features_is_not_query_error() {
        let outcomes = vec![response("A", Ok(json!({"error": null, "features": []})))];
        let classified = classify(outcomes, &directives());
        assert!(classified.tuples.iter().all(|t| t.value == AttributeValue::Null));
        let nearest: Vec<_> = classified
            .tuples
            .iter()
            .filter(|t| t.name == "roads_nearest_feats")
            .collect();
        assert_eq!(nearest.len(), 1);
        assert_eq!(nearest[0].ring, RingLevel::Fire);
    }

    #[test]
    fn test_unknown_alias_yields_nothing() {
        let outcomes = vec![QueryOutcome::Response {
            fire_id: "A".into(),
            alias: "unknown".into(),
            result: Ok(json!({"features": []})),
        }];
        let classified = classify(outcomes, &directives());
        assert!(classified.tuples.is_empty());
        assert!(classified.analyzable.is_empty());
        assert_eq!(classified.critical, 0);
    }
}
