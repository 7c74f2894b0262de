//! Agrégations communes aux analyseurs (sommes groupées, comptages)

use std::collections::HashMap;

use serde_json::Value;

use super::Clipped;
use crate::serialize::sort_trim_grouped;
use crate::VargeoError;

/// Clé de groupe pour les valeurs nulles ou vides
pub const NO_DATA: &str = "No Data";

/// Arrondi à 2 décimales
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Vérifie qu'au moins une feature porte le champ
fn ensure_field(rows: &[Clipped<'_>], field: &str) -> Result<(), VargeoError> {
    if rows
        .iter()
        .any(|r| r.feature.attributes.contains_key(field))
    {
        Ok(())
    } else {
        Err(VargeoError::analysis(field, "field not present in query results"))
    }
}

fn group_key(value: Option<&Value>, blank_is_missing: bool) -> String {
    match value {
        None | Some(Value::Null) => NO_DATA.to_string(),
        Some(Value::String(s)) if blank_is_missing && s.trim().is_empty() => NO_DATA.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Ordre des groupes: valeurs présentes triées, valeurs nulles en dernier
fn sort_key(value: Option<&Value>) -> (bool, String) {
    match value {
        None | Some(Value::Null) => (true, String::new()),
        Some(Value::String(s)) => (false, s.clone()),
        Some(other) => (false, other.to_string()),
    }
}

/// Accumule par clé; les groupes sortent triés par valeur de champ
fn accumulate<F>(rows: &[Clipped<'_>], field: &str, blank_is_missing: bool, mut weight: F) -> Vec<(String, f64)>
where
    F: FnMut(&Clipped<'_>) -> f64,
{
    let mut groups: HashMap<String, ((bool, String), f64)> = HashMap::new();
    for row in rows {
        let value = row.feature.attributes.get(field);
        let order = sort_key(value);
        let entry = groups
            .entry(group_key(value, blank_is_missing))
            .or_insert_with(|| (order.clone(), 0.0));
        if order < entry.0 {
            entry.0 = order;
        }
        entry.1 += weight(row);
    }

    let mut groups: Vec<_> = groups.into_iter().collect();
    groups.sort_by(|(_, (a, _)), (_, (b, _))| a.cmp(b));
    groups.into_iter().map(|(key, (_, total))| (key, total)).collect()
}

/// Surface (acres, 2 décimales) par valeur de champ, JSON trié et borné
pub fn acres_sum(rows: &[Clipped<'_>], field: &str, budget: usize) -> Result<String, VargeoError> {
    ensure_field(rows, field)?;
    let entries = accumulate(rows, field, true, |r| r.measure)
        .into_iter()
        .map(|(k, acres)| (k, Value::from(round2(acres))))
        .collect();
    sort_trim_grouped(entries, budget)
}

/// Longueur (pieds entiers) par valeur de champ, JSON trié et borné
pub fn feet_sum(rows: &[Clipped<'_>], field: &str, budget: usize) -> Result<String, VargeoError> {
    ensure_field(rows, field)?;
    let entries = accumulate(rows, field, true, |r| r.measure)
        .into_iter()
        .map(|(k, feet)| (k, Value::from(feet.trunc() as i64)))
        .collect();
    sort_trim_grouped(entries, budget)
}

/// Nombre de features par valeur de champ, JSON trié et borné
pub fn attr_count(rows: &[Clipped<'_>], field: &str, budget: usize) -> Result<String, VargeoError> {
    ensure_field(rows, field)?;
    let entries = accumulate(rows, field, false, |_| 1.0)
        .into_iter()
        .map(|(k, count)| (k, Value::from(count as i64)))
        .collect();
    sort_trim_grouped(entries, budget)
}

/// Conversion numérique tolérante (les valeurs non numériques sont ignorées)
fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Somme d'un champ numérique, pondérée par la part intersectée si elle existe
pub fn value_sum(rows: &[Clipped<'_>], field: &str) -> Result<i64, VargeoError> {
    ensure_field(rows, field)?;
    let total: f64 = rows
        .iter()
        .filter_map(|r| numeric(r.feature.attributes.get(field)).map(|v| v * r.ratio.unwrap_or(1.0)))
        .sum();
    Ok(total.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Feature;
    use geo::{Geometry, Point};
    use serde_json::{json, Map};

    fn feature(attrs: Value) -> Feature {
        let Value::Object(map) = attrs else {
            return Feature::new(Geometry::Point(Point::new(0.0, 0.0)), Map::new());
        };
        Feature::new(Geometry::Point(Point::new(0.0, 0.0)), map)
    }

    fn rows<'a>(features: &'a [Feature], ratios: &[f64], measures: &[f64]) -> Vec<Clipped<'a>> {
        features
            .iter()
            .zip(ratios.iter().zip(measures))
            .map(|(feature, (&ratio, &measure))| Clipped {
                feature,
                geometry: feature.geometry.clone(),
                ratio: Some(ratio),
                measure,
            })
            .collect()
    }

    #[test]
    fn test_acres_sum_groups_and_no_data() {
        let features = vec![
            feature(json!({"OWNER": "BLM"})),
            feature(json!({"OWNER": "BLM"})),
            feature(json!({"OWNER": null})),
            feature(json!({"OWNER": "  "})),
        ];
        let rows = rows(&features, &[1.0; 4], &[1.004, 2.0, 0.5, 0.25]);
        assert_eq!(
            acres_sum(&rows, "OWNER", 5000).unwrap(),
            r#"{"BLM":3.0,"No Data":0.75}"#
        );
    }

    #[test]
    fn test_value_sum_weighted_and_coerced() {
        let features = vec![
            feature(json!({"POP": 10})),
            feature(json!({"POP": "7"})),
            feature(json!({"POP": "n/a"})),
        ];
        let rows = rows(&features, &[0.5, 1.0, 1.0], &[0.0; 3]);
        assert_eq!(value_sum(&rows, "POP").unwrap(), 12);
    }

    #[test]
    fn test_attr_count() {
        let features = vec![
            feature(json!({"TYPE": "cabin"})),
            feature(json!({"TYPE": "cabin"})),
            feature(json!({"TYPE": null})),
        ];
        let rows = rows(&features, &[1.0; 3], &[0.0; 3]);
        assert_eq!(
            attr_count(&rows, "TYPE", 5000).unwrap(),
            r#"{"cabin":2,"No Data":1}"#
        );
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let features = vec![feature(json!({"TYPE": "cabin"}))];
        let rows = rows(&features, &[1.0], &[0.0]);
        assert!(value_sum(&rows, "POP").is_err());
    }

    #[test]
    fn test_ties_follow_sorted_keys() {
        let features = vec![
            feature(json!({"TYPE": "shed"})),
            feature(json!({"TYPE": null})),
            feature(json!({"TYPE": "barn"})),
            feature(json!({"TYPE": "cabin"})),
            feature(json!({"TYPE": "cabin"})),
        ];
        let rows = rows(&features, &[1.0; 5], &[0.0; 5]);
        assert_eq!(
            attr_count(&rows, "TYPE", 5000).unwrap(),
            r#"{"cabin":2,"barn":1,"shed":1,"No Data":1}"#
        );
    }
}
