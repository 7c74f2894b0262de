//! Export des anneaux attribués en GeoJSON avec geozero (streaming)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geo::Geometry;
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use serde_json::{json, Map, Value};
use vargeo::{esri, FireRings};

use crate::table::AttributeTable;

/// Exporte un polygone par (feu, anneau) avec les attributs de sa ligne
///
/// Les coordonnées restent en EPSG:3338.
pub fn export_attributed_rings(
    fires: &[FireRings],
    table: &AttributeTable,
    output_path: &Path,
) -> Result<usize> {
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    // Header FeatureCollection avec CRS
    write!(
        writer,
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}},"features":["#,
        esri::WKID
    )?;

    let mut count = 0;
    for fire in fires {
        for (level, ring) in fire.iter() {
            if count > 0 {
                write!(writer, ",")?;
            }
            let mut properties = Map::new();
            properties.insert("buf_dist".into(), json!(level.miles()));
            properties.insert("fire_id".into(), json!(fire.fire_id));
            if let Some(row) = table.row(&fire.fire_id, level) {
                for (name, value) in row {
                    properties.insert(name.clone(), value.to_json());
                }
            }
            let id = format!("{}_{}", fire.fire_id, level.miles());
            write_feature(&mut writer, &id, &Geometry::MultiPolygon(ring.clone()), &properties)?;
            count += 1;
        }
    }

    // Footer
    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(count)
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(
    writer: &mut W,
    id: &str,
    geometry: &Geometry<f64>,
    properties: &Map<String, Value>,
) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","id":{},"#, Value::from(id))?;

    // Géométrie via geozero
    write!(writer, r#""geometry":"#)?;
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    geometry.process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(writer, r#","properties":"#)?;
    serde_json::to_writer(&mut *writer, properties)?;
    write!(writer, "}}")?;

    Ok(())
}
