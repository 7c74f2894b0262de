//! Rapport d'exécution avec graceful degradation
//!
//! Les échecs par requête ou par unité ne bloquent pas le run: ils sont
//! comptés ici et apparaissent comme sentinelles dans la table.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use vargeo::ErrorKind;

use crate::table::AttributeTable;

/// Statut global du run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Toutes les valeurs calculées
    Success,
    /// Table produite avec des valeurs sentinelles
    PartialSuccess,
    /// Aucune table exploitable
    Failed,
}

/// Rapport complet d'un run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub duration_secs: f64,
    /// Durée du fan-out des requêtes
    pub query_secs: f64,
    /// Durée du tri et des analyses
    pub analysis_secs: f64,

    pub fires: usize,
    pub datasets: usize,
    pub queries_issued: usize,
    pub queries_failed: usize,
    pub units_executed: usize,
    pub tuples: usize,
    pub rows: usize,

    /// Valeurs sentinelles par type
    pub errors_by_kind: BTreeMap<String, usize>,
    /// Feux ayant au moins une sentinelle
    pub fires_with_errors: Vec<String>,
    /// Erreur fatale éventuelle
    pub fatal: Option<String>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self {
            status: RunStatus::Success,
            duration_secs: 0.0,
            query_secs: 0.0,
            analysis_secs: 0.0,
            fires: 0,
            datasets: 0,
            queries_issued: 0,
            queries_failed: 0,
            units_executed: 0,
            tuples: 0,
            rows: 0,
            errors_by_kind: BTreeMap::new(),
            fires_with_errors: Vec::new(),
            fatal: None,
        }
    }
}

impl RunReport {
    pub fn new(fires: usize, datasets: usize) -> Self {
        Self {
            fires,
            datasets,
            ..Default::default()
        }
    }

    /// Enregistre le résultat du fan-out
    pub fn record_queries(&mut self, issued: usize, failed: usize, elapsed: Duration) {
        self.queries_issued = issued;
        self.queries_failed = failed;
        self.query_secs = elapsed.as_secs_f64();
    }

    /// Enregistre la phase d'analyse
    pub fn record_analysis(&mut self, units: usize, tuples: usize, elapsed: Duration) {
        self.units_executed = units;
        self.tuples = tuples;
        self.analysis_secs = elapsed.as_secs_f64();
    }

    /// Compte les sentinelles de la table
    pub fn record_table(&mut self, table: &AttributeTable) {
        self.rows = table.len();
        self.errors_by_kind = table
            .error_counts()
            .into_iter()
            .map(|(kind, count): (ErrorKind, usize)| (kind.sentinel().to_string(), count))
            .collect();
        self.fires_with_errors = table.fires_with_errors().into_iter().map(String::from).collect();
    }

    /// Enregistre une erreur fatale
    pub fn record_fatal(&mut self, message: impl Into<String>) {
        self.fatal = Some(message.into());
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.status = if self.fatal.is_some() {
            RunStatus::Failed
        } else if !self.errors_by_kind.is_empty() {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("VALUES AT RISK REPORT");
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!(
            "Duration: {:.2}s (queries {:.2}s, analysis {:.2}s)",
            self.duration_secs, self.query_secs, self.analysis_secs
        );

        println!("\n--- SUMMARY ---");
        println!("Fires: {}, datasets: {}", self.fires, self.datasets);
        println!(
            "Queries: {} issued, {} failed",
            self.queries_issued, self.queries_failed
        );
        println!(
            "Analysis: {} units, {} attributes, {} rows",
            self.units_executed, self.tuples, self.rows
        );

        if !self.errors_by_kind.is_empty() {
            println!("\n--- ERROR VALUES ---");
            for (sentinel, count) in &self.errors_by_kind {
                println!("  {}: {}", sentinel, count);
            }
        }

        if !self.fires_with_errors.is_empty() {
            println!("\n--- FIRES WITH ERRORS ({}) ---", self.fires_with_errors.len());
            for fire in self.fires_with_errors.iter().take(20) {
                println!("  {}", fire);
            }
            if self.fires_with_errors.len() > 20 {
                println!("  ... and {} more", self.fires_with_errors.len() - 20);
            }
        }

        if let Some(fatal) = &self.fatal {
            println!("\n--- FATAL ---\n  {}", fatal);
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{:?}: {} fires, {} queries ({} failed), {} rows, {} fires with errors",
            self.status,
            self.fires,
            self.queries_issued,
            self.queries_failed,
            self.rows,
            self.fires_with_errors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vargeo::{AttributeValue, Attribution, RingLevel};

    fn table(values: Vec<AttributeValue>) -> AttributeTable {
        let tuples = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| Attribution::new(format!("F{i}"), RingLevel::Fire, "roads_total_feet", v));
        AttributeTable::from_tuples(tuples).unwrap()
    }

    #[test]
    fn test_run_report_default() {
        let report = RunReport::default();
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.queries_issued, 0);
    }

    #[test]
    fn test_finalize_success() {
        let mut report = RunReport::new(1, 1);
        report.record_table(&table(vec![AttributeValue::Int(3)]));
        report.finalize();
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.rows, 1);
    }

    #[test]
    fn test_finalize_partial_success() {
        let mut report = RunReport::new(2, 1);
        report.record_table(&table(vec![
            AttributeValue::Int(3),
            AttributeValue::Error(ErrorKind::Query),
        ]));
        report.finalize();
        assert_eq!(report.status, RunStatus::PartialSuccess);
        assert_eq!(report.errors_by_kind["!QUERYERROR!"], 1);
        assert_eq!(report.fires_with_errors, vec!["F1"]);
    }

    #[test]
    fn test_finalize_fatal() {
        let mut report = RunReport::new(1, 1);
        report.record_fatal("Query fan-out exceeded total timeout");
        report.finalize();
        assert_eq!(report.status, RunStatus::Failed);
    }

    #[test]
    fn test_summary() {
        let mut report = RunReport::new(3, 2);
        report.record_queries(6, 1, Duration::from_secs(2));
        assert!(report.summary().contains("6 queries (1 failed)"));
    }
}
