//! # wildfire-var
//!
//! Calcul concurrent des valeurs à risque autour des feux de forêt.
//!
//! ## Features
//!
//! - Requêtes spatiales concurrentes vers des services ArcGIS (retry, pagination)
//! - Tri des réponses: jeux de données à analyser ou valeurs sentinelles
//! - Analyses par vagues de threads (anneaux 0, 1, 3, 5 miles et proximité)
//! - Table d'attributs par (anneau, feu), export JSON et GeoJSON
//! - CLI simple
//!
//! ## Usage CLI
//!
//! ```bash
//! # Run complet
//! wildfire-var run --fires ./rings.geojson --plan ./plan.json --output ./out/ --geojson
//!
//! # Vérifier un plan
//! wildfire-var validate --plan ./plan.json
//! ```

pub mod config;
pub mod export;
pub mod fires;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod schedule;
pub mod table;
pub mod transport;

pub use config::{PlanConfig, RunSettings};
pub use pipeline::{Pipeline, PipelineError, RunOutput};
pub use report::{RunReport, RunStatus};
pub use table::AttributeTable;
pub use transport::{HttpClient, ReqwestClient};
