//! Types de données pour le crate vargeo

use std::fmt;

use geo::{Geometry, MultiPolygon};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::VargeoError;

/// Niveau d'anneau autour d'un feu (0 = périmètre, sinon tampon en miles)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RingLevel {
    Fire,
    OneMile,
    ThreeMiles,
    FiveMiles,
}

impl RingLevel {
    /// Tous les niveaux, du périmètre vers le tampon maximal
    pub const ALL: [RingLevel; 4] = [
        RingLevel::Fire,
        RingLevel::OneMile,
        RingLevel::ThreeMiles,
        RingLevel::FiveMiles,
    ];

    /// Distance du tampon en miles (clé de sortie)
    pub fn miles(self) -> u8 {
        match self {
            RingLevel::Fire => 0,
            RingLevel::OneMile => 1,
            RingLevel::ThreeMiles => 3,
            RingLevel::FiveMiles => 5,
        }
    }

    /// Distance du tampon en mètres (EPSG:3338)
    pub fn buffer_meters(self) -> f64 {
        match self {
            RingLevel::Fire => 0.0,
            RingLevel::OneMile => 1609.34,
            RingLevel::ThreeMiles => 4828.03,
            RingLevel::FiveMiles => 8046.72,
        }
    }

    pub fn from_miles(miles: u64) -> Option<Self> {
        match miles {
            0 => Some(RingLevel::Fire),
            1 => Some(RingLevel::OneMile),
            3 => Some(RingLevel::ThreeMiles),
            5 => Some(RingLevel::FiveMiles),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            RingLevel::Fire => 0,
            RingLevel::OneMile => 1,
            RingLevel::ThreeMiles => 2,
            RingLevel::FiveMiles => 3,
        }
    }
}

impl fmt::Display for RingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.miles())
    }
}

impl Serialize for RingLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.miles())
    }
}

/// Famille géométrique d'un jeu de données
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GeometryKind {
    Areal,
    Linear,
    Point,
}

impl GeometryKind {
    /// Détermine la famille d'une géométrie (None pour les collections)
    pub fn of(geometry: &Geometry) -> Option<Self> {
        match geometry {
            Geometry::Polygon(_)
            | Geometry::MultiPolygon(_)
            | Geometry::Rect(_)
            | Geometry::Triangle(_) => Some(GeometryKind::Areal),
            Geometry::LineString(_) | Geometry::MultiLineString(_) | Geometry::Line(_) => {
                Some(GeometryKind::Linear)
            }
            Geometry::Point(_) | Geometry::MultiPoint(_) => Some(GeometryKind::Point),
            Geometry::GeometryCollection(_) => None,
        }
    }
}

/// Une feature d'un jeu de valeurs à risque
#[derive(Debug, Clone)]
pub struct Feature {
    /// Géométrie en EPSG:3338
    pub geometry: Geometry,

    /// Attributs tels que renvoyés par le service
    pub attributes: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry, attributes: Map<String, Value>) -> Self {
        Self {
            geometry,
            attributes,
        }
    }

    /// Valeur d'un attribut, `None` si absent ou null
    pub fn attribute(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field).filter(|v| !v.is_null())
    }
}

/// Jeu de données homogène renvoyé par une requête
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Alias de la source (préfixe des attributs)
    pub alias: String,

    /// Famille géométrique commune à toutes les features
    pub kind: GeometryKind,

    pub features: Vec<Feature>,
}

impl Dataset {
    /// Construit un jeu de données en vérifiant son homogénéité
    pub fn new(alias: impl Into<String>, features: Vec<Feature>) -> Result<Self, VargeoError> {
        let alias = alias.into();
        let Some(first) = features.first() else {
            return Err(VargeoError::invalid_dataset(alias, "no features"));
        };
        let kind = GeometryKind::of(&first.geometry).ok_or_else(|| {
            VargeoError::invalid_dataset(&alias, "geometry collections are not supported")
        })?;

        if let Some(other) = features
            .iter()
            .find(|f| GeometryKind::of(&f.geometry) != Some(kind))
        {
            return Err(VargeoError::invalid_dataset(
                &alias,
                format!(
                    "mixed geometry kinds: {:?} and {:?}",
                    kind,
                    GeometryKind::of(&other.geometry)
                ),
            ));
        }

        Ok(Self {
            alias,
            kind,
            features,
        })
    }

    /// Sous-ensemble possédé des features retenues par le prédicat
    pub fn subset<P>(&self, mut predicate: P) -> Dataset
    where
        P: FnMut(&Feature) -> bool,
    {
        Dataset {
            alias: self.alias.clone(),
            kind: self.kind,
            features: self
                .features
                .iter()
                .filter(|f| predicate(f))
                .cloned()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Périmètre d'un feu et ses tampons, un polygone par niveau
#[derive(Debug, Clone)]
pub struct FireRings {
    pub fire_id: String,
    rings: [MultiPolygon; 4],
}

impl FireRings {
    /// Construit l'ensemble des anneaux; exige exactement un polygone par niveau
    pub fn new(
        fire_id: impl Into<String>,
        rings: Vec<(RingLevel, MultiPolygon)>,
    ) -> Result<Self, VargeoError> {
        let fire_id = fire_id.into();
        let mut slots: [Option<MultiPolygon>; 4] = [None, None, None, None];

        for (level, geometry) in rings {
            if geometry.0.is_empty() {
                return Err(VargeoError::InvalidFireRings {
                    fire_id,
                    reason: format!("empty geometry for ring level {}", level),
                });
            }
            let slot = &mut slots[level.index()];
            if slot.is_some() {
                return Err(VargeoError::InvalidFireRings {
                    fire_id,
                    reason: format!("duplicate ring level {}", level),
                });
            }
            *slot = Some(geometry);
        }

        let [fire, one, three, five] = slots;
        match (fire, one, three, five) {
            (Some(fire), Some(one), Some(three), Some(five)) => Ok(Self {
                fire_id,
                rings: [fire, one, three, five],
            }),
            (fire, one, three, five) => {
                let missing: Vec<String> = [fire.is_none(), one.is_none(), three.is_none(), five.is_none()]
                    .iter()
                    .zip(RingLevel::ALL)
                    .filter(|(absent, _)| **absent)
                    .map(|(_, level)| level.to_string())
                    .collect();
                Err(VargeoError::InvalidFireRings {
                    fire_id,
                    reason: format!("missing ring levels {}", missing.join(", ")),
                })
            }
        }
    }

    pub fn ring(&self, level: RingLevel) -> &MultiPolygon {
        &self.rings[level.index()]
    }

    /// Périmètre du feu (niveau 0)
    pub fn fire(&self) -> &MultiPolygon {
        self.ring(RingLevel::Fire)
    }

    /// Tampon maximal, utilisé pour l'enveloppe de requête
    pub fn max_ring(&self) -> &MultiPolygon {
        self.ring(RingLevel::FiveMiles)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RingLevel, &MultiPolygon)> {
        RingLevel::ALL.into_iter().map(move |level| (level, self.ring(level)))
    }
}

/// Catégorie d'échec portée par un attribut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorKind {
    /// Le worker d'analyse a paniqué
    Exception,
    /// La requête a échoué (transport ou erreur du service)
    Query,
    /// Réponse du service au format inattendu
    Unexpected,
    /// L'analyse a renvoyé une erreur
    Analysis,
}

impl ErrorKind {
    /// Chaîne sentinelle écrite dans la table de sortie
    pub fn sentinel(self) -> &'static str {
        match self {
            ErrorKind::Exception => "!EXCEPTION!",
            ErrorKind::Query => "!QUERYERROR!",
            ErrorKind::Unexpected => "!UNEXPECTED!",
            ErrorKind::Analysis => "!ANALYSISERROR!",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sentinel())
    }
}

/// Valeur d'un attribut calculé
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Int(i64),
    Float(f64),
    /// Texte, y compris les objets JSON déjà sérialisés
    Text(String),
    Error(ErrorKind),
}

impl AttributeValue {
    pub fn is_error(&self) -> bool {
        matches!(self, AttributeValue::Error(_))
    }

    /// Conversion vers JSON; les erreurs deviennent leur sentinelle
    pub fn to_json(&self) -> Value {
        match self {
            AttributeValue::Null => Value::Null,
            AttributeValue::Int(i) => Value::from(*i),
            AttributeValue::Float(f) => Value::from(*f),
            AttributeValue::Text(s) => Value::String(s.clone()),
            AttributeValue::Error(kind) => Value::String(kind.sentinel().to_string()),
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttributeValue::Null => serializer.serialize_none(),
            AttributeValue::Int(i) => serializer.serialize_i64(*i),
            AttributeValue::Float(f) => serializer.serialize_f64(*f),
            AttributeValue::Text(s) => serializer.serialize_str(s),
            AttributeValue::Error(kind) => serializer.serialize_str(kind.sentinel()),
        }
    }
}

/// Tuple d'attribution (feu, niveau, attribut, valeur)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub fire_id: String,
    pub ring: RingLevel,
    pub name: String,
    pub value: AttributeValue,
}

impl Attribution {
    pub fn new(
        fire_id: impl Into<String>,
        ring: RingLevel,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> Self {
        Self {
            fire_id: fire_id.into(),
            ring,
            name: name.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Point};

    fn square() -> MultiPolygon {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ]])
    }

    #[test]
    fn test_fire_rings_complete() {
        let rings = RingLevel::ALL.iter().map(|&l| (l, square())).collect();
        let fire = FireRings::new("F1", rings).unwrap();
        assert_eq!(fire.iter().count(), 4);
    }

    #[test]
    fn test_fire_rings_missing_level() {
        let rings = vec![(RingLevel::Fire, square()), (RingLevel::OneMile, square())];
        let err = FireRings::new("F1", rings).unwrap_err();
        assert!(err.to_string().contains("missing ring levels 3, 5"));
    }

    #[test]
    fn test_fire_rings_duplicate_level() {
        let rings = vec![(RingLevel::Fire, square()), (RingLevel::Fire, square())];
        assert!(FireRings::new("F1", rings).is_err());
    }

    #[test]
    fn test_fire_rings_empty_geometry() {
        let mut rings: Vec<_> = RingLevel::ALL.iter().map(|&l| (l, square())).collect();
        rings[2].1 = MultiPolygon::new(Vec::new());
        let err = FireRings::new("F1", rings).unwrap_err();
        assert!(err.to_string().contains("empty geometry"));
    }

    #[test]
    fn test_dataset_rejects_mixed_kinds() {
        let features = vec![
            Feature::new(Geometry::Point(Point::new(0.0, 0.0)), Map::new()),
            Feature::new(Geometry::MultiPolygon(square()), Map::new()),
        ];
        assert!(Dataset::new("mixed", features).is_err());
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(ErrorKind::Query.sentinel(), "!QUERYERROR!");
        assert_eq!(
            serde_json::to_string(&AttributeValue::Error(ErrorKind::Analysis)).unwrap(),
            r#""!ANALYSISERROR!""#
        );
        assert_eq!(serde_json::to_string(&AttributeValue::Null).unwrap(), "null");
    }
}
