//! GeoJSON FeatureCollection loading.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use geo::{Coord, LineString, MultiLineString, MultiPoint, Point};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::crs::CrsId;
use crate::models::{Attributes, Feature, FeatureCollection, Geometry, Shape};

/// Errors raised while loading a GeoJSON file
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse GeoJSON from {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} is a GeoJSON {found}, expected a FeatureCollection")]
    NotFeatureCollection { path: PathBuf, found: String },
    #[error("feature {feature} in {path} has malformed geometry: {reason}")]
    Geometry {
        path: PathBuf,
        feature: usize,
        reason: String,
    },
    #[error("unrecognized coordinate reference system `{name}` in {path}")]
    UnknownCrs { path: PathBuf, name: String },
}

/// How a file without a `crs` member is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Treat a missing `crs` member as WGS-84 (the RFC 7946 default).
    /// When false the collection's CRS is left undefined.
    pub assume_wgs84: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { assume_wgs84: true }
    }
}

type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    crs: Option<RawCrs>,
    #[serde(default)]
    features: Vec<RawFeature>,
}

/// Legacy (GeoJSON 2008) named or EPSG-coded CRS member
#[derive(Debug, Deserialize)]
struct RawCrs {
    #[serde(default)]
    properties: RawCrsProperties,
}

#[derive(Debug, Default, Deserialize)]
struct RawCrsProperties {
    name: Option<String>,
    code: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<Attributes>,
}

/// Geometry object; members other than the ones named here (`bbox`,
/// foreign members) are ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<RawGeometry> },
}

fn coord(position: &[f64]) -> Result<Coord<f64>, String> {
    match position {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(format!(
            "position has {} values, at least 2 are required",
            position.len()
        )),
    }
}

fn line(positions: &[Position]) -> Result<LineString<f64>, String> {
    positions
        .iter()
        .map(|p| coord(p))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn shape(rings: &[Vec<Position>]) -> Result<Shape, String> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| "polygon has no outer ring".to_string())?;
    Ok(Shape::new(
        line(exterior)?,
        interiors.iter().map(|r| line(r)).collect::<Result<_, _>>()?,
    ))
}

impl RawGeometry {
    fn into_geometry(self) -> Result<Geometry, String> {
        Ok(match self {
            RawGeometry::Point { coordinates } => {
                Geometry::Point(Point::from(coord(&coordinates)?))
            }
            RawGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint::new(
                coordinates
                    .iter()
                    .map(|p| coord(p).map(Point::from))
                    .collect::<Result<_, _>>()?,
            )),
            RawGeometry::LineString { coordinates } => Geometry::LineString(line(&coordinates)?),
            RawGeometry::MultiLineString { coordinates } => {
                Geometry::MultiLineString(MultiLineString::new(
                    coordinates.iter().map(|l| line(l)).collect::<Result<_, _>>()?,
                ))
            }
            RawGeometry::Polygon { coordinates } => Geometry::Polygon(shape(&coordinates)?),
            RawGeometry::MultiPolygon { coordinates } => Geometry::MultiPolygon(
                coordinates
                    .iter()
                    .map(|p| shape(p))
                    .collect::<Result<_, _>>()?,
            ),
            RawGeometry::GeometryCollection { geometries } => Geometry::GeometryCollection(
                geometries
                    .into_iter()
                    .map(RawGeometry::into_geometry)
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

fn resolve_crs(
    raw: Option<RawCrs>,
    path: &Path,
    options: &LoadOptions,
) -> Result<Option<CrsId>, LoadError> {
    let Some(raw) = raw else {
        return Ok(options.assume_wgs84.then_some(CrsId::WGS84));
    };

    match (raw.properties.name, raw.properties.code) {
        (Some(name), _) => CrsId::parse(&name)
            .map(Some)
            .ok_or_else(|| LoadError::UnknownCrs {
                path: path.to_path_buf(),
                name,
            }),
        (None, Some(code)) => Ok(Some(CrsId::epsg(code))),
        (None, None) => Err(LoadError::UnknownCrs {
            path: path.to_path_buf(),
            name: "<empty crs member>".to_string(),
        }),
    }
}

/// Parse a FeatureCollection from any reader. `path` only labels errors.
pub fn from_reader<R: Read>(
    reader: R,
    path: &Path,
    options: &LoadOptions,
) -> Result<FeatureCollection, LoadError> {
    let raw: RawCollection =
        serde_json::from_reader(reader).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if raw.kind != "FeatureCollection" {
        return Err(LoadError::NotFeatureCollection {
            path: path.to_path_buf(),
            found: raw.kind,
        });
    }

    let crs = resolve_crs(raw.crs, path, options)?;

    let features = raw
        .features
        .into_iter()
        .enumerate()
        .map(|(i, f)| {
            let geometry = match f.geometry {
                Some(g) => g.into_geometry().map_err(|reason| LoadError::Geometry {
                    path: path.to_path_buf(),
                    feature: i,
                    reason,
                })?,
                None => Geometry::Null,
            };
            Ok(Feature::new(geometry, f.properties.unwrap_or_default()))
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    debug!(
        "Parsed {} features from {} ({})",
        features.len(),
        path.display(),
        crs.map_or_else(|| "no CRS".to_string(), |c| c.to_string())
    );

    Ok(FeatureCollection::new(crs, features))
}

/// Load a GeoJSON FeatureCollection, assuming WGS-84 when no CRS is declared.
pub fn load<P: AsRef<Path>>(path: P) -> Result<FeatureCollection, LoadError> {
    load_with(path, &LoadOptions::default())
}

pub fn load_with<P: AsRef<Path>>(
    path: P,
    options: &LoadOptions,
) -> Result<FeatureCollection, LoadError> {
    let path = path.as_ref();
    info!("Loading {}", path.display());

    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let collection = from_reader(BufReader::new(file), path, options)?;

    info!(
        "Loaded {} features from {}",
        collection.len(),
        path.display()
    );
    Ok(collection)
}
