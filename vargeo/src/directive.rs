//! Directives d'analyse: quelles opérations appliquer à quel jeu de données
//!
//! Une directive est validée une seule fois au chargement puis partagée en
//! lecture seule par tous les workers.

use std::collections::HashSet;

use crate::types::{AttributeValue, Attribution, RingLevel};
use crate::VargeoError;

/// Opération d'analyse typée
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Nombre de features intersectant l'anneau
    FeatureCount,
    /// Surface totale intersectée, en acres
    TotalAcres,
    /// Longueur totale intersectée, en pieds
    TotalLengthFt,
    /// Surface intersectée groupée par valeur de champ
    AcresSum(Vec<String>),
    /// Longueur intersectée groupée par valeur de champ
    LengthFtSum(Vec<String>),
    /// Somme d'un champ numérique pondérée par la part intersectée
    ValueSum(Vec<String>),
    /// Comptage des valeurs distinctes d'un champ
    AttrCount(Vec<String>),
    /// Features les plus proches du périmètre, avec les champs listés
    NearestFeatures(Vec<String>),
}

impl Operation {
    /// Nom court utilisé dans les messages et la configuration
    pub fn label(&self) -> &'static str {
        match self {
            Operation::FeatureCount => "FEATURE_COUNT",
            Operation::TotalAcres => "TOTAL_ACRES",
            Operation::TotalLengthFt => "TOTAL_LENGTH_FT",
            Operation::AcresSum(_) => "ACRES_SUM_FIELDS",
            Operation::LengthFtSum(_) => "LENGTH_FT_SUM_FIELDS",
            Operation::ValueSum(_) => "VALUE_SUM_FIELDS",
            Operation::AttrCount(_) => "ATTR_COUNT_FIELDS",
            Operation::NearestFeatures(_) => "NEAREST_FEATS_FIELDS",
        }
    }

    fn fields(&self) -> Option<&[String]> {
        match self {
            Operation::AcresSum(f)
            | Operation::LengthFtSum(f)
            | Operation::ValueSum(f)
            | Operation::AttrCount(f)
            | Operation::NearestFeatures(f) => Some(f),
            _ => None,
        }
    }

    /// Noms des attributs produits par niveau d'anneau (vide pour la proximité)
    pub fn attribute_names(&self, alias: &str) -> Vec<String> {
        match self {
            Operation::FeatureCount => vec![format!("{alias}_feat_count")],
            Operation::TotalAcres => vec![format!("{alias}_total_acres")],
            Operation::TotalLengthFt => vec![format!("{alias}_total_feet")],
            Operation::AcresSum(fields) => suffixed(alias, fields, "acres_sum"),
            Operation::LengthFtSum(fields) => suffixed(alias, fields, "feet_sum"),
            Operation::ValueSum(fields) => suffixed(alias, fields, "value_sum"),
            Operation::AttrCount(fields) => suffixed(alias, fields, "attr_count"),
            Operation::NearestFeatures(_) => Vec::new(),
        }
    }
}

fn suffixed(alias: &str, fields: &[String], suffix: &str) -> Vec<String> {
    fields
        .iter()
        .map(|field| format!("{alias}_{field}_{suffix}"))
        .collect()
}

/// Directive validée pour un alias
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    alias: String,
    operations: Vec<Operation>,
}

impl Directive {
    /// Valide et construit une directive
    ///
    /// Refuse les opérations dupliquées, les listes de champs vides et les
    /// noms de champs vides ou répétés.
    pub fn new(alias: impl Into<String>, operations: Vec<Operation>) -> Result<Self, VargeoError> {
        let alias = alias.into();
        if alias.trim().is_empty() {
            return Err(VargeoError::invalid_directive(alias, "empty alias"));
        }

        let mut seen = HashSet::new();
        for op in &operations {
            if !seen.insert(op.label()) {
                return Err(VargeoError::invalid_directive(
                    &alias,
                    format!("duplicate operation {}", op.label()),
                ));
            }
            if let Some(fields) = op.fields() {
                if fields.is_empty() {
                    return Err(VargeoError::invalid_directive(
                        &alias,
                        format!("{} has no fields", op.label()),
                    ));
                }
                let mut names = HashSet::new();
                for field in fields {
                    if field.trim().is_empty() {
                        return Err(VargeoError::invalid_directive(
                            &alias,
                            format!("{} has an empty field name", op.label()),
                        ));
                    }
                    if !names.insert(field.as_str()) {
                        return Err(VargeoError::invalid_directive(
                            &alias,
                            format!("{} lists {} twice", op.label(), field),
                        ));
                    }
                }
            }
        }

        Ok(Self { alias, operations })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Vrai si au moins une opération produit des attributs par anneau
    pub fn has_ring_operations(&self) -> bool {
        self.operations
            .iter()
            .any(|op| !matches!(op, Operation::NearestFeatures(_)))
    }

    /// Champs à inclure dans les ensembles de proximité, si demandés
    pub fn nearest_fields(&self) -> Option<&[String]> {
        self.operations.iter().find_map(|op| match op {
            Operation::NearestFeatures(fields) => Some(fields.as_slice()),
            _ => None,
        })
    }

    pub fn nearest_name(&self) -> String {
        format!("{}_nearest_feats", self.alias)
    }

    pub fn interior_name(&self) -> String {
        format!("{}_interior_feats", self.alias)
    }

    /// Tous les attributs d'anneau, dans l'ordre des opérations
    pub fn ring_attribute_names(&self) -> Vec<String> {
        self.operations
            .iter()
            .flat_map(|op| op.attribute_names(&self.alias))
            .collect()
    }

    /// Attributs d'un anneau, tous avec la même valeur
    pub fn ring_complement(
        &self,
        fire_id: &str,
        ring: RingLevel,
        value: &AttributeValue,
    ) -> Vec<Attribution> {
        self.ring_attribute_names()
            .into_iter()
            .map(|name| Attribution::new(fire_id, ring, name, value.clone()))
            .collect()
    }

    /// Attributs de proximité (niveau 0), vides si non demandés
    pub fn nearest_complement(&self, fire_id: &str, value: &AttributeValue) -> Vec<Attribution> {
        if self.nearest_fields().is_none() {
            return Vec::new();
        }
        vec![
            Attribution::new(fire_id, RingLevel::Fire, self.nearest_name(), value.clone()),
            Attribution::new(fire_id, RingLevel::Fire, self.interior_name(), value.clone()),
        ]
    }

    /// Ensemble complet des attributs d'un couple (feu, jeu de données)
    pub fn complement(&self, fire_id: &str, value: &AttributeValue) -> Vec<Attribution> {
        let mut tuples: Vec<Attribution> = RingLevel::ALL
            .iter()
            .flat_map(|&ring| self.ring_complement(fire_id, ring, value))
            .collect();
        tuples.extend(self.nearest_complement(fire_id, value));
        tuples
    }
}
