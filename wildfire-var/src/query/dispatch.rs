//! Envoi concurrent d'une requête par couple (feu, jeu de données)
//!
//! Toutes les requêtes partagent le même client (pool de connexions) et
//! tournent dans un `JoinSet`. Une requête en échec n'interrompt jamais les
//! autres: son erreur est portée par son [`QueryOutcome`]. Seul le dépassement
//! du timeout global remplit le slot fatal du rapport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use vargeo::{esri, FireRings};

use crate::transport::{paginate, HttpClient, RetryPolicy};

/// Erreurs fatales du fan-out (distinctes des échecs par requête)
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("Query fan-out exceeded total timeout of {0:?}")]
    Timeout(Duration),
}

/// Modèle de requête d'un jeu de données
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    pub alias: String,
    pub url: String,
    /// Paramètres fixes (`where`, `outFields`, ...)
    pub params: Map<String, Value>,
    /// Organisation dont le jeton est requis
    pub auth_scope: Option<String>,
}

/// Requête prête à être envoyée
#[derive(Debug, Clone)]
pub struct QueryBundle {
    pub fire_id: String,
    pub alias: String,
    pub url: String,
    pub params: Map<String, Value>,
}

/// Résultat d'une requête
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// Réponse (ou erreur) d'une requête identifiée
    Response {
        fire_id: String,
        alias: String,
        result: Result<Value, String>,
    },
    /// Échec du mécanisme de fan-out lui-même (tâche paniquée)
    Harness { detail: String },
}

impl QueryOutcome {
    pub fn failed(fire_id: impl Into<String>, alias: impl Into<String>, detail: impl ToString) -> Self {
        Self::Response {
            fire_id: fire_id.into(),
            alias: alias.into(),
            result: Err(detail.to_string()),
        }
    }
}

/// Résultats du fan-out
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<QueryOutcome>,
    pub fatal: Option<DispatchError>,
}

/// Paramètres spatiaux communs à toutes les requêtes
fn spatial_params(envelope: &Value) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("f".into(), json!("json"));
    params.insert("geometry".into(), json!(envelope.to_string()));
    params.insert("geometryType".into(), json!("esriGeometryEnvelope"));
    params.insert("inSR".into(), json!(esri::WKID));
    params.insert("outSR".into(), json!(esri::WKID));
    params.insert("spatialRel".into(), json!("esriSpatialRelIntersects"));
    params.insert("returnGeometry".into(), json!("true"));
    params
}

/// Produit cartésien feux × modèles
///
/// Les requêtes impossibles à construire sont renvoyées directement sous forme
/// d'outcome en erreur.
pub fn build_bundles(
    fires: &[FireRings],
    templates: &[QueryTemplate],
    tokens: &HashMap<String, String>,
) -> (Vec<QueryBundle>, Vec<QueryOutcome>) {
    let mut bundles = Vec::with_capacity(fires.len() * templates.len());
    let mut failed = Vec::new();

    for fire in fires {
        let Some(envelope) = esri::envelope(fire.max_ring()) else {
            warn!(fire_id = %fire.fire_id, "Fire has no envelope, queries skipped");
            for template in templates {
                failed.push(QueryOutcome::failed(&fire.fire_id, &template.alias, "fire geometry has no envelope"));
            }
            continue;
        };
        let spatial = spatial_params(&envelope);

        for template in templates {
            let mut params = template.params.clone();
            params.extend(spatial.clone());

            if let Some(scope) = &template.auth_scope {
                match tokens.get(scope) {
                    Some(token) => {
                        params.insert("token".into(), json!(token));
                    }
                    None => {
                        warn!(alias = %template.alias, scope = %scope, "No token for auth scope, querying without it");
                    }
                }
            }

            bundles.push(QueryBundle {
                fire_id: fire.fire_id.clone(),
                alias: template.alias.clone(),
                url: template.url.clone(),
                params,
            });
        }
    }

    (bundles, failed)
}

/// Envoie toutes les requêtes en parallèle
pub async fn dispatch<C: HttpClient>(
    client: Arc<C>,
    bundles: Vec<QueryBundle>,
    retry: RetryPolicy,
    total_timeout: Duration,
) -> DispatchReport {
    let total = bundles.len();
    info!(queries = total, "Dispatching queries");

    let mut set = JoinSet::new();
    for bundle in bundles {
        let client = Arc::clone(&client);
        let retry = retry.clone();
        set.spawn(async move {
            let result = paginate(&*client, &bundle.url, &bundle.params, &retry)
                .await
                .map_err(|e| e.to_string());
            if let Err(e) = &result {
                warn!(fire_id = %bundle.fire_id, alias = %bundle.alias, error = %e, "Query failed");
            }
            QueryOutcome::Response {
                fire_id: bundle.fire_id,
                alias: bundle.alias,
                result,
            }
        });
    }

    let mut report = DispatchReport::default();
    let outcomes = &mut report.outcomes;
    let collect = async {
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => outcomes.push(QueryOutcome::Harness {
                    detail: e.to_string(),
                }),
            }
        }
    };

    if tokio::time::timeout(total_timeout, collect).await.is_err() {
        warn!(
            received = report.outcomes.len(),
            total = total,
            "Query fan-out timed out, abandoning in-flight queries"
        );
        set.abort_all();
        report.fatal = Some(DispatchError::Timeout(total_timeout));
    } else {
        debug!(received = report.outcomes.len(), "All queries completed");
    }

    report
}
