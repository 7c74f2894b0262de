//! Types d'erreurs pour le crate vargeo

use thiserror::Error;

/// Erreurs pouvant survenir lors de l'analyse des valeurs à risque
#[derive(Debug, Error)]
pub enum VargeoError {
    /// Géométrie Esri JSON illisible ou incohérente
    #[error("Invalid geometry for {entity_id}: {reason}")]
    InvalidGeometry { entity_id: String, reason: String },

    /// Échec de la reconstruction d'un polygone à partir de ses rings
    #[error("Geometry repair failed for {entity_id}: {reason}")]
    RepairFailed { entity_id: String, reason: String },

    /// Jeu de données non homogène ou vide
    #[error("Invalid dataset {alias}: {reason}")]
    InvalidDataset { alias: String, reason: String },

    /// Directive d'analyse invalide (détectée au chargement)
    #[error("Invalid directive for {alias}: {reason}")]
    InvalidDirective { alias: String, reason: String },

    /// Anneaux de feu incomplets ou dupliqués
    #[error("Invalid fire rings for {fire_id}: {reason}")]
    InvalidFireRings { fire_id: String, reason: String },

    /// Échec d'une opération d'analyse
    #[error("Analysis failed for {attribute}: {reason}")]
    Analysis { attribute: String, reason: String },

    /// Impossible de tenir dans le budget de sérialisation
    #[error("Serialized value exceeds budget of {budget} bytes (minimum {minimum})")]
    BudgetExceeded { budget: usize, minimum: usize },

    /// Erreur de sérialisation JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Coordonnées hors du domaine de la projection
    #[error("Projection error: {0}")]
    Projection(String),
}

impl VargeoError {
    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(entity_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            entity_id: entity_id.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de jeu de données
    pub fn invalid_dataset(alias: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDataset {
            alias: alias.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de directive
    pub fn invalid_directive(alias: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDirective {
            alias: alias.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur d'analyse avec contexte
    pub fn analysis(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Analysis {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }
}
