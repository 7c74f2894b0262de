//! Sérialisation JSON sous contrainte de taille
//!
//! La table de sortie limite chaque attribut texte à un budget d'octets.
//! Les ensembles de features proches sont tronqués par recherche dichotomique
//! sur le préfixe; les objets groupés (somme par valeur, comptages) sont
//! triés par valeur décroissante puis tronqués par la fin.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

use crate::VargeoError;

/// Budget par défaut d'un attribut texte, en octets
pub const DEFAULT_BUDGET: usize = 5000;

/// Objet JSON dont l'ordre des clés est celui du vecteur
#[derive(Debug, Clone, Copy)]
pub struct OrderedObject<'a>(pub &'a [(String, Value)]);

impl Serialize for OrderedObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Feature proche (ou intérieure) telle que publiée
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyFeature {
    /// Distance au périmètre en miles, 2 décimales
    pub dist_mi: f64,
    /// Direction sur une rose à 16 points, "Interior" ou "None"
    pub dir: String,
    pub lat: String,
    pub lng: String,
    /// Champs demandés, dans l'ordre de la directive
    pub fields: Vec<(String, Value)>,
}

impl Serialize for NearbyFeature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4 + self.fields.len()))?;
        map.serialize_entry("dist_mi", &self.dist_mi)?;
        map.serialize_entry("dir", &self.dir)?;
        map.serialize_entry("lat", &self.lat)?;
        map.serialize_entry("lng", &self.lng)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Ensemble ordonné du plus proche au plus lointain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSet {
    pub features: Vec<NearbyFeature>,
    /// Nombre de features écartées
    pub popped: usize,
    /// Distance (miles) au-delà de laquelle les features ont été écartées
    pub cutoff: Option<f64>,
}

#[derive(Serialize)]
struct Candidate<'a> {
    features: &'a [NearbyFeature],
    popped: usize,
    cutoff: Option<f64>,
}

impl FeatureSet {
    fn candidate(&self, keep: usize) -> Candidate<'_> {
        let total = self.features.len();
        if keep >= total {
            return Candidate {
                features: &self.features,
                popped: self.popped,
                cutoff: self.cutoff,
            };
        }
        // keep == 0: le seuil est la distance de la feature la plus lointaine
        let last = match keep.checked_sub(1) {
            Some(i) => self.features[i].dist_mi,
            None => self.features[total - 1].dist_mi,
        };
        Candidate {
            features: &self.features[..keep],
            popped: (total - keep) + self.popped,
            cutoff: Some(last),
        }
    }
}

/// Tronque l'ensemble au plus long préfixe dont la sérialisation tient dans le budget
///
/// Un ensemble qui tient déjà est renvoyé inchangé.
pub fn fit_to_budget(set: FeatureSet, budget: usize) -> Result<FeatureSet, VargeoError> {
    let full_len = serde_json::to_string(&set)?.len();
    if full_len <= budget {
        return Ok(set);
    }

    let total = set.features.len();
    let mut low = 0;
    let mut high = total;
    let mut best: Option<usize> = None;

    while low < high {
        let mid = (low + high) / 2;
        let len = serde_json::to_string(&set.candidate(mid))?.len();
        if len <= budget {
            best = Some(mid);
            low = mid + 1;
        } else {
            high = mid;
        }
    }

    let Some(keep) = best else {
        let minimum = serde_json::to_string(&set.candidate(0))?.len();
        return Err(VargeoError::BudgetExceeded { budget, minimum });
    };

    let candidate = set.candidate(keep);
    let (popped, cutoff) = (candidate.popped, candidate.cutoff);
    let mut features = set.features;
    features.truncate(keep);
    Ok(FeatureSet {
        features,
        popped,
        cutoff,
    })
}

/// Sérialise l'ensemble dans le budget
pub fn serialize_within_budget(set: FeatureSet, budget: usize) -> Result<String, VargeoError> {
    let fitted = fit_to_budget(set, budget)?;
    Ok(serde_json::to_string(&fitted)?)
}

/// Trie un objet groupé par valeur décroissante et retire les plus petites
/// entrées jusqu'à tenir dans le budget
pub fn sort_trim_grouped(
    mut entries: Vec<(String, Value)>,
    budget: usize,
) -> Result<String, VargeoError> {
    entries.sort_by(|(_, a), (_, b)| {
        let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
        b.total_cmp(&a)
    });

    let full = serde_json::to_string(&OrderedObject(&entries))?;
    if full.len() <= budget {
        return Ok(full);
    }

    let mut low = 0;
    let mut high = entries.len();
    while low < high {
        let mid = (low + high + 1) / 2;
        let len = serde_json::to_string(&OrderedObject(&entries[..mid]))?.len();
        if len <= budget {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    let trimmed = serde_json::to_string(&OrderedObject(&entries[..low]))?;
    if trimmed.len() > budget {
        return Err(VargeoError::BudgetExceeded {
            budget,
            minimum: trimmed.len(),
        });
    }
    Ok(trimmed)
}
