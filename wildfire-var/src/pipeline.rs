//! Orchestration d'un run complet
//!
//! requêtes → tri des réponses → unités d'analyse → table d'attributs.
//! Un échec du mécanisme de requêtage (timeout global, tâche paniquée) est
//! fatal: aucun résultat partiel n'est renvoyé.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info};
use vargeo::{Directive, FireRings};

use crate::config::RunSettings;
use crate::query::{self, DispatchError, QueryOutcome, QueryTemplate};
use crate::report::RunReport;
use crate::schedule;
use crate::table::{AttributeTable, TableError};
use crate::transport::HttpClient;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Au moins un outcome ne provient pas d'une requête identifiée
    #[error("{count} query task(s) failed outside of their own error handling")]
    Harness { count: usize },

    #[error("Background task failed: {0}")]
    Join(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Résultat d'un run réussi
#[derive(Debug)]
pub struct RunOutput {
    pub table: AttributeTable,
    pub report: RunReport,
}

/// Pipeline de calcul des valeurs à risque
pub struct Pipeline<C: HttpClient> {
    client: Arc<C>,
    settings: RunSettings,
}

impl<C: HttpClient> Pipeline<C> {
    pub fn new(client: Arc<C>, settings: RunSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Exécute le run pour tous les feux et tous les jeux de données
    pub async fn run(
        &self,
        fires: &[FireRings],
        templates: &[QueryTemplate],
        directives: &HashMap<String, Arc<Directive>>,
        tokens: &HashMap<String, String>,
    ) -> Result<RunOutput, PipelineError> {
        let start = Instant::now();
        let mut report = RunReport::new(fires.len(), templates.len());

        // Requêtes
        let (bundles, unbuilt) = query::build_bundles(fires, templates, tokens);
        let issued = bundles.len();
        let dispatched = query::dispatch(
            Arc::clone(&self.client),
            bundles,
            self.settings.retry.clone(),
            self.settings.total_timeout,
        )
        .await;

        if let Some(fatal) = dispatched.fatal {
            error!(error = %fatal, "Query fan-out failed");
            return Err(fatal.into());
        }

        let mut outcomes = unbuilt;
        outcomes.extend(dispatched.outcomes);
        let failed = outcomes
            .iter()
            .filter(|o| matches!(o, QueryOutcome::Response { result: Err(_), .. }))
            .count();
        report.record_queries(issued, failed, start.elapsed());
        info!(queries = issued, failed = failed, "Queries completed");

        // Tri
        let analysis_start = Instant::now();
        let shared = directives.clone();
        let classified = tokio::task::spawn_blocking(move || query::classify(outcomes, &shared))
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))?;

        if classified.critical > 0 {
            error!(critical = true, count = classified.critical, "Query harness failure, aborting run");
            return Err(PipelineError::Harness {
                count: classified.critical,
            });
        }

        // Analyses
        let (units, orphans) = schedule::build_units(fires, classified.analyzable, directives);
        let unit_count = units.len();
        let waves = self.settings.waves.clone();
        let budget = self.settings.budget;
        let analyzed = tokio::task::spawn_blocking(move || schedule::execute(units, &waves, budget))
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))?;

        let mut tuples = classified.tuples;
        tuples.extend(orphans);
        tuples.extend(analyzed);
        report.record_analysis(unit_count, tuples.len(), analysis_start.elapsed());

        // Pivot
        let table = AttributeTable::from_tuples(tuples)?;
        report.record_table(&table);
        report.set_duration(start.elapsed());
        report.finalize();

        info!(
            rows = table.len(),
            status = ?report.status,
            duration_secs = report.duration_secs,
            "Run completed"
        );

        Ok(RunOutput { table, report })
    }
}
