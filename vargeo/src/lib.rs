//! # vargeo
//!
//! Moteur géométrique des valeurs à risque autour des feux de forêt (Alaska, EPSG:3338).
//!
//! ## Features
//!
//! - Décodage des features Esri JSON et réparation des polygones multi-rings
//! - Analyseurs surfaciques, linéaires et ponctuels (acres, pieds, comptages, sommes)
//! - Analyse de proximité: features les plus proches du périmètre, direction, position DDM
//! - Sérialisation bornée en taille pour les attributs texte
//! - Reprojection Alaska Albers ↔ géographique en Rust pur
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vargeo::{analysis, esri, Directive, Operation, RingLevel};
//!
//! let dataset = esri::dataset_from_esri("parcels", &response["features"].as_array()?)?;
//! let directive = Directive::new("parcels", vec![Operation::FeatureCount, Operation::TotalAcres])?;
//!
//! for (level, ring) in fire.iter() {
//!     let tuples = analysis::analyze_ring(&fire.fire_id, level, ring, &dataset, &directive, 5000)?;
//!     println!("{}: {} attributes", level, tuples.len());
//! }
//! ```

pub mod analysis;
pub mod directive;
pub mod error;
pub mod esri;
pub mod project;
pub mod proximity;
pub mod repair;
pub mod serialize;
pub mod types;

pub use directive::{Directive, Operation};
pub use error::VargeoError;
pub use serialize::DEFAULT_BUDGET;
pub use types::{
    AttributeValue, Attribution, Dataset, ErrorKind, Feature, FireRings, GeometryKind, RingLevel,
};
