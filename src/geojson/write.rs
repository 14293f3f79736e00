//! GeoJSON output of assembled rows.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

use crate::models::{Attributes, Row};

/// Errors raised while writing the output file
#[derive(Debug, Error)]
pub enum SaveError {
    /// A row has no usable coordinate to rebuild its point from.
    #[error("row {row} has no numeric `{field}` attribute")]
    MissingCoordinate { row: usize, field: String },
    #[error("failed to create a temporary file next to {path}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write GeoJSON to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to replace {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Attribute names holding the WGS-84 coordinate of each row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateFields {
    pub longitude: String,
    pub latitude: String,
}

impl Default for CoordinateFields {
    fn default() -> Self {
        Self {
            longitude: "longitude".to_string(),
            latitude: "latitude".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OutCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<OutFeature>,
}

#[derive(Debug, Serialize)]
struct OutFeature {
    #[serde(rename = "type")]
    kind: &'static str,
    properties: Attributes,
    geometry: OutPoint,
}

#[derive(Debug, Serialize)]
struct OutPoint {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: [f64; 2],
}

fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn feature(row: &Row, fields: &CoordinateFields) -> Result<OutFeature, SaveError> {
    let missing = |field: &str| SaveError::MissingCoordinate {
        row: row.source_index,
        field: field.to_string(),
    };
    let lon = number(row.attributes.get(&fields.longitude))
        .ok_or_else(|| missing(&fields.longitude))?;
    let lat = number(row.attributes.get(&fields.latitude))
        .ok_or_else(|| missing(&fields.latitude))?;

    Ok(OutFeature {
        kind: "Feature",
        properties: row.to_attributes(),
        geometry: OutPoint {
            kind: "Point",
            coordinates: [lon, lat],
        },
    })
}

/// Every row is checked before anything is written.
fn build(rows: &[Row], fields: &CoordinateFields) -> Result<OutCollection, SaveError> {
    Ok(OutCollection {
        kind: "FeatureCollection",
        features: rows
            .iter()
            .map(|r| feature(r, fields))
            .collect::<Result<_, _>>()?,
    })
}

/// Write rows to `path`, replacing any existing file. Returns the row count.
pub fn save<P: AsRef<Path>>(rows: &[Row], path: P) -> Result<usize, SaveError> {
    save_with(rows, path, &CoordinateFields::default())
}

pub fn save_with<P: AsRef<Path>>(
    rows: &[Row],
    path: P,
    fields: &CoordinateFields,
) -> Result<usize, SaveError> {
    let path = path.as_ref();
    let collection = build(rows, fields)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|source| SaveError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    let write_err = |source: std::io::Error| SaveError::Write {
        path: path.to_path_buf(),
        source,
    };
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, &collection)
            .map_err(|e| write_err(e.into()))?;
        writer.flush().map_err(write_err)?;
    }

    tmp.persist(path).map_err(|e| SaveError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(index: usize, attributes: Value) -> Row {
        let Value::Object(attributes) = attributes else {
            unreachable!("test attributes must be an object")
        };
        Row {
            source_index: index,
            attributes,
            at_risk: true,
            zone_count: 1,
            zone_values: Attributes::new(),
        }
    }

    fn read(path: &Path) -> Value {
        let text = std::fs::read_to_string(path).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_save_rebuilds_points_from_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        let rows = vec![
            row(0, json!({"id": "a", "longitude": -1.5, "latitude": 52.25})),
            row(3, json!({"id": "b", "longitude": "0.125", "latitude": "51.0"})),
        ];

        assert_eq!(save(&rows, &path).unwrap(), 2);

        let out = read(&path);
        assert_eq!(out["type"], "FeatureCollection");
        let features = out["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["geometry"]["coordinates"], json!([-1.5, 52.25]));
        assert_eq!(features[1]["geometry"]["coordinates"], json!([0.125, 51.0]));
        assert_eq!(features[0]["properties"]["at_risk"], json!(true));
        assert_eq!(features[0]["properties"]["id"], json!("a"));
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        std::fs::write(&path, "stale").unwrap();

        assert_eq!(save(&[], &path).unwrap(), 0);
        let out = read(&path);
        assert_eq!(out["features"], json!([]));
    }

    #[test]
    fn test_missing_coordinate_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        let rows = vec![
            row(0, json!({"longitude": 1.0, "latitude": 2.0})),
            row(7, json!({"longitude": 1.0})),
        ];

        let err = save(&rows, &path).unwrap_err();
        assert!(matches!(
            err,
            SaveError::MissingCoordinate { row: 7, ref field } if field == "latitude"
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_custom_coordinate_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        let fields = CoordinateFields {
            longitude: "lon".into(),
            latitude: "lat".into(),
        };
        let rows = vec![row(0, json!({"lon": 4.0, "lat": 5.0}))];

        save_with(&rows, &path, &fields).unwrap();
        assert_eq!(read(&path)["features"][0]["geometry"]["coordinates"], json!([4.0, 5.0]));
    }

    #[test]
    fn test_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.geojson");

        let err = save(&[], &path).unwrap_err();
        assert!(matches!(err, SaveError::Create { .. }));
    }
}
