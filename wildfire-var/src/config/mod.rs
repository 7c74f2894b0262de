//! Configuration du système
//!
//! Le plan (fichier JSON) décrit, par alias de jeu de données, la couche à
//! interroger et les analyses à produire. Les réglages d'exécution viennent
//! des valeurs par défaut et de l'environnement.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use vargeo::{Directive, Operation, DEFAULT_BUDGET};

use crate::query::QueryTemplate;
use crate::schedule::WaveConfig;
use crate::transport::RetryPolicy;

/// Préfixe des variables d'environnement portant les jetons
pub const TOKEN_ENV_PREFIX: &str = "VAR_TOKEN_";

/// Plan de requêtes et d'analyses
#[derive(Debug, Deserialize, Serialize)]
pub struct PlanConfig {
    pub datasets: BTreeMap<String, DatasetConfig>,
}

/// Configuration d'un jeu de données
#[derive(Debug, Deserialize, Serialize)]
pub struct DatasetConfig {
    /// URL de la couche (FeatureServer/MapServer)
    pub url: String,

    /// Paramètres de requête fixes
    #[serde(default)]
    pub params: QueryParams,

    /// Organisation dont le jeton doit accompagner la requête
    #[serde(default)]
    pub auth_scope: Option<String>,

    pub analysis: AnalysisConfig,
}

/// Paramètres: objet JSON, ou chaîne contenant un objet JSON
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum QueryParams {
    Object(Map<String, Value>),
    Encoded(String),
}

impl Default for QueryParams {
    fn default() -> Self {
        QueryParams::Object(Map::new())
    }
}

impl QueryParams {
    /// Paramètres sous forme d'objet
    pub fn to_map(&self) -> Result<Map<String, Value>> {
        match self {
            QueryParams::Object(map) => Ok(map.clone()),
            QueryParams::Encoded(s) if s.trim().is_empty() => Ok(Map::new()),
            QueryParams::Encoded(s) => {
                serde_json::from_str(s).context("Query parameters are not a JSON object")
            }
        }
    }
}

/// Analyses demandées pour un jeu de données
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub feature_count: bool,
    #[serde(default)]
    pub total_acres: bool,
    #[serde(default)]
    pub total_length_ft: bool,
    #[serde(default)]
    pub acres_sum_fields: Option<Vec<String>>,
    #[serde(default)]
    pub length_ft_sum_fields: Option<Vec<String>>,
    #[serde(default)]
    pub value_sum_fields: Option<Vec<String>>,
    #[serde(default)]
    pub attr_count_fields: Option<Vec<String>>,
    #[serde(default)]
    pub nearest_feats_fields: Option<Vec<String>>,
}

impl AnalysisConfig {
    /// Opérations dans un ordre fixe
    pub fn operations(&self) -> Vec<Operation> {
        let mut ops = Vec::new();
        if self.feature_count {
            ops.push(Operation::FeatureCount);
        }
        if self.total_acres {
            ops.push(Operation::TotalAcres);
        }
        if self.total_length_ft {
            ops.push(Operation::TotalLengthFt);
        }
        let grouped: [(&Option<Vec<String>>, fn(Vec<String>) -> Operation); 5] = [
            (&self.acres_sum_fields, Operation::AcresSum),
            (&self.length_ft_sum_fields, Operation::LengthFtSum),
            (&self.value_sum_fields, Operation::ValueSum),
            (&self.attr_count_fields, Operation::AttrCount),
            (&self.nearest_feats_fields, Operation::NearestFeatures),
        ];
        for (fields, op) in grouped {
            if let Some(fields) = fields {
                ops.push(op(fields.clone()));
            }
        }
        ops
    }
}

impl PlanConfig {
    /// Charge un plan depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read plan file: {}", path.display()))?;

        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let plan: Self = serde_json::from_str(json).context("Failed to parse plan JSON")?;
        if plan.datasets.is_empty() {
            bail!("Plan has no datasets");
        }
        Ok(plan)
    }

    /// Directives validées, par alias
    pub fn directives(&self) -> Result<HashMap<String, Arc<Directive>>> {
        self.datasets
            .iter()
            .map(|(alias, dataset)| {
                let ops = dataset.analysis.operations();
                if ops.is_empty() {
                    bail!("Dataset '{}' requests no analysis", alias);
                }
                let directive = Directive::new(alias, ops)
                    .with_context(|| format!("Invalid analysis for dataset '{}'", alias))?;
                Ok((alias.clone(), Arc::new(directive)))
            })
            .collect()
    }

    /// Modèles de requête, par alias
    pub fn templates(&self) -> Result<Vec<QueryTemplate>> {
        self.datasets
            .iter()
            .map(|(alias, dataset)| {
                let params = dataset
                    .params
                    .to_map()
                    .with_context(|| format!("Invalid params for dataset '{}'", alias))?;
                Ok(QueryTemplate {
                    alias: alias.clone(),
                    url: dataset.url.clone(),
                    params,
                    auth_scope: dataset.auth_scope.clone(),
                })
            })
            .collect()
    }

    /// Scopes d'authentification utilisés par le plan
    pub fn auth_scopes(&self) -> Vec<&str> {
        let mut scopes: Vec<&str> = self
            .datasets
            .values()
            .filter_map(|d| d.auth_scope.as_deref())
            .collect();
        scopes.sort_unstable();
        scopes.dedup();
        scopes
    }
}

/// Nom de la variable d'environnement du jeton d'un scope
pub fn token_var(scope: &str) -> String {
    let suffix: String = scope
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("{TOKEN_ENV_PREFIX}{suffix}")
}

/// Jetons des scopes demandés, lus depuis l'environnement
pub fn tokens_from_env<'a>(scopes: impl IntoIterator<Item = &'a str>) -> HashMap<String, String> {
    scopes
        .into_iter()
        .filter_map(|scope| {
            std::env::var(token_var(scope))
                .ok()
                .filter(|t| !t.is_empty())
                .map(|t| (scope.to_string(), t))
        })
        .collect()
}

/// Réglages d'exécution
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub retry: RetryPolicy,
    /// Timeout total du fan-out des requêtes
    pub total_timeout: Duration,
    pub waves: WaveConfig,
    /// Taille maximale des attributs texte, en octets
    pub budget: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            total_timeout: Duration::from_secs(900),
            waves: WaveConfig::default(),
            budget: DEFAULT_BUDGET,
        }
    }
}

impl RunSettings {
    /// Valeurs par défaut surchargées par l'environnement
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(secs) = env_parse::<u64>("VAR_TIMEOUT_SECS") {
            settings.total_timeout = Duration::from_secs(secs);
        }
        if let Some(size) = env_parse::<usize>("VAR_WAVE_SIZE").filter(|&n| n > 0) {
            settings.waves.wave_size = size;
            settings.waves.channel_capacity = size;
        }
        if let Some(attempts) = env_parse::<u32>("VAR_RETRY_ATTEMPTS").filter(|&n| n > 0) {
            settings.retry.max_attempts = attempts;
        }
        settings
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"{
        "datasets": {
            "roads": {
                "url": "https://example.com/arcgis/rest/services/Roads/FeatureServer/0",
                "params": {"outFields": "NAME,SURFACE", "where": "1=1"},
                "auth_scope": "nifc",
                "analysis": {"total_length_ft": true, "length_ft_sum_fields": ["SURFACE"]}
            },
            "parcels": {
                "url": "https://example.com/arcgis/rest/services/Parcels/FeatureServer/0",
                "params": "{\"outFields\": \"OWNER\"}",
                "analysis": {
                    "feature_count": true,
                    "total_acres": true,
                    "nearest_feats_fields": ["OWNER"]
                }
            }
        }
    }"#;

    #[test]
    fn test_load_plan() {
        let plan = PlanConfig::from_json(PLAN).unwrap();
        assert_eq!(plan.datasets.len(), 2);
        assert_eq!(plan.auth_scopes(), vec!["nifc"]);

        let templates = plan.templates().unwrap();
        let parcels = templates.iter().find(|t| t.alias == "parcels").unwrap();
        assert_eq!(parcels.params["outFields"], "OWNER");
        assert!(parcels.auth_scope.is_none());
    }

    #[test]
    fn test_directives() {
        let plan = PlanConfig::from_json(PLAN).unwrap();
        let directives = plan.directives().unwrap();

        let roads = &directives["roads"];
        assert_eq!(
            roads.ring_attribute_names(),
            vec!["roads_total_feet", "roads_SURFACE_feet_sum"]
        );
        assert!(directives["parcels"].nearest_fields().is_some());
    }

    #[test]
    fn test_invalid_directive_rejected() {
        let plan = PlanConfig::from_json(
            r#"{"datasets": {"x": {"url": "u", "analysis": {"attr_count_fields": []}}}}"#,
        )
        .unwrap();
        let err = plan.directives().unwrap_err();
        assert!(format!("{:#}", err).contains("no fields"));
    }

    #[test]
    fn test_empty_analysis_rejected() {
        let plan = PlanConfig::from_json(r#"{"datasets": {"x": {"url": "u", "analysis": {}}}}"#).unwrap();
        assert!(plan.directives().is_err());
    }

    #[test]
    fn test_unknown_analysis_key_rejected() {
        let result = PlanConfig::from_json(
            r#"{"datasets": {"x": {"url": "u", "analysis": {"total_miles": true}}}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_token_var() {
        assert_eq!(token_var("nifc"), "VAR_TOKEN_NIFC");
        assert_eq!(token_var("ak-dnr"), "VAR_TOKEN_AK_DNR");
    }

    #[test]
    fn test_run_settings_default() {
        let settings = RunSettings::default();
        assert_eq!(settings.total_timeout, Duration::from_secs(900));
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.budget, 5000);
        assert!(settings.waves.wave_size >= 1);
    }
}
