//! Modules d'export (table JSON, GeoJSON)

pub mod geojson;

pub use self::geojson::export_attributed_rings;
