//! Table d'attributs: pivot des tuples en lignes (niveau d'anneau, feu)

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use thiserror::Error;
use vargeo::{AttributeValue, Attribution, ErrorKind, RingLevel};

#[derive(Debug, Error)]
pub enum TableError {
    /// Deux tuples pour le même attribut d'une ligne
    #[error("Duplicate attribute {name} for fire {fire_id} at ring {ring}")]
    Duplicate {
        fire_id: String,
        ring: RingLevel,
        name: String,
    },
}

/// Clé de ligne
pub type RowKey = (RingLevel, String);

/// Table pivotée, triée par niveau puis identifiant de feu
#[derive(Debug, Default, Clone)]
pub struct AttributeTable {
    rows: BTreeMap<RowKey, BTreeMap<String, AttributeValue>>,
}

impl AttributeTable {
    /// Pivote les tuples; l'ordre d'arrivée est indifférent
    pub fn from_tuples(tuples: impl IntoIterator<Item = Attribution>) -> Result<Self, TableError> {
        let mut rows: BTreeMap<RowKey, BTreeMap<String, AttributeValue>> = BTreeMap::new();
        for t in tuples {
            let row = rows.entry((t.ring, t.fire_id.clone())).or_default();
            if row.contains_key(&t.name) {
                return Err(TableError::Duplicate {
                    fire_id: t.fire_id,
                    ring: t.ring,
                    name: t.name,
                });
            }
            row.insert(t.name, t.value);
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, fire_id: &str, ring: RingLevel, name: &str) -> Option<&AttributeValue> {
        self.rows.get(&(ring, fire_id.to_string()))?.get(name)
    }

    /// Attributs d'une ligne
    pub fn row(&self, fire_id: &str, ring: RingLevel) -> Option<&BTreeMap<String, AttributeValue>> {
        self.rows.get(&(ring, fire_id.to_string()))
    }

    /// Union des noms d'attributs de toutes les lignes
    pub fn columns(&self) -> BTreeSet<&str> {
        self.rows
            .values()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect()
    }

    /// Feux ayant au moins une valeur sentinelle
    pub fn fires_with_errors(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .filter(|(_, row)| row.values().any(AttributeValue::is_error))
            .map(|((_, fire_id), _)| fire_id.as_str())
            .collect()
    }

    /// Nombre de valeurs par type d'erreur
    pub fn error_counts(&self) -> BTreeMap<ErrorKind, usize> {
        let mut counts = BTreeMap::new();
        for value in self.rows.values().flat_map(|row| row.values()) {
            if let AttributeValue::Error(kind) = value {
                *counts.entry(*kind).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Lignes JSON: `buf_dist`, `fire_id` puis une clé par colonne (null si absente)
    pub fn to_json(&self) -> Value {
        let columns = self.columns();
        let rows: Vec<Value> = self
            .rows
            .iter()
            .map(|((ring, fire_id), row)| {
                let mut obj = Map::new();
                obj.insert("buf_dist".into(), json!(ring.miles()));
                obj.insert("fire_id".into(), json!(fire_id));
                for &column in &columns {
                    let value = row.get(column).map(AttributeValue::to_json).unwrap_or(Value::Null);
                    obj.insert(column.to_string(), value);
                }
                Value::Object(obj)
            })
            .collect();
        Value::Array(rows)
    }

    /// Écrit la table en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_json())?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write attribute table: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(fire_id: &str, ring: RingLevel, name: &str, value: AttributeValue) -> Attribution {
        Attribution::new(fire_id, ring, name, value)
    }

    #[test]
    fn test_pivot_ignores_arrival_order() {
        let tuples = vec![
            tuple("B", RingLevel::Fire, "roads_total_feet", AttributeValue::Int(12)),
            tuple("A", RingLevel::OneMile, "roads_total_feet", AttributeValue::Null),
            tuple("A", RingLevel::Fire, "parcels_feat_count", AttributeValue::Int(3)),
            tuple("A", RingLevel::Fire, "roads_total_feet", AttributeValue::Error(ErrorKind::Query)),
        ];
        let table = AttributeTable::from_tuples(tuples).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get("A", RingLevel::Fire, "parcels_feat_count"), Some(&AttributeValue::Int(3)));
        assert_eq!(table.fires_with_errors().into_iter().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(table.error_counts()[&ErrorKind::Query], 1);

        let rows = table.to_json();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows[0]["buf_dist"], 0);
        assert_eq!(rows[0]["fire_id"], "A");
        assert_eq!(rows[0]["roads_total_feet"], "!QUERYERROR!");
        assert_eq!(rows[1]["fire_id"], "B");
        assert_eq!(rows[1]["parcels_feat_count"], Value::Null);
        assert_eq!(rows[2]["buf_dist"], 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let tuples = vec![
            tuple("A", RingLevel::Fire, "roads_total_feet", AttributeValue::Int(1)),
            tuple("A", RingLevel::Fire, "roads_total_feet", AttributeValue::Int(2)),
        ];
        assert!(matches!(
            AttributeTable::from_tuples(tuples),
            Err(TableError::Duplicate { .. })
        ));
    }
}
