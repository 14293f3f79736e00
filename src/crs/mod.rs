//! Coordinate reference systems and the normalizer that aligns collections.

mod projection;

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{Feature, FeatureCollection};

pub use projection::{Projection, Transform, WEB_MERCATOR_MAX_LAT};

/// EPSG-coded coordinate reference system identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrsId(u32);

impl CrsId {
    /// WGS-84 geographic, longitude/latitude axis order
    pub const WGS84: CrsId = CrsId(4326);
    pub const WEB_MERCATOR: CrsId = CrsId(3857);

    pub const fn epsg(code: u32) -> Self {
        Self(code)
    }

    pub fn code(&self) -> u32 {
        self.0
    }

    /// Parse the CRS names found in GeoJSON files and config.
    ///
    /// Accepts `EPSG:n`, OGC URNs (`urn:ogc:def:crs:EPSG::n`), OGC HTTP URIs,
    /// the `CRS84` aliases of WGS-84 and bare EPSG numbers.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if is_crs84(name) {
            return Some(Self::WGS84);
        }
        if let Ok(code) = name.parse::<u32>() {
            return Some(Self(code));
        }
        epsg_pattern()
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .map(Self)
    }
}

fn is_crs84(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    upper == "CRS84"
        || upper == "OGC:CRS84"
        || (upper.starts_with("URN:OGC:DEF:CRS:OGC:") && upper.ends_with(":CRS84"))
        || upper.ends_with("/OGC/1.3/CRS84")
}

fn epsg_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)^(?:epsg:",
            r"|urn:ogc:def:crs:epsg:[0-9.]*:",
            r"|https?://www\.opengis\.net/def/crs/epsg/[0-9.]+/)",
            r"([0-9]+)$",
        ))
        .expect("EPSG pattern is a valid regex")
    })
}

impl fmt::Display for CrsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognized coordinate reference system name `{0}`")]
pub struct ParseCrsError(pub String);

impl FromStr for CrsId {
    type Err = ParseCrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseCrsError(s.to_string()))
    }
}

/// Errors raised while aligning reference systems.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CrsError {
    /// The collection carries no reference system.
    #[error("feature collection has no coordinate reference system")]
    Undefined,
    /// No transform is known between the two systems.
    #[error("no coordinate transform known from {from} to {to}")]
    UnsupportedPair { from: CrsId, to: CrsId },
}

/// Build the transform taking coordinates from `from` to `to`.
pub fn transform(from: CrsId, to: CrsId) -> Result<Transform, CrsError> {
    let unsupported = || CrsError::UnsupportedPair { from, to };
    let source = Projection::for_crs(from).ok_or_else(unsupported)?;
    let target = Projection::for_crs(to).ok_or_else(unsupported)?;
    Ok(Transform::new(source, target))
}

/// Reproject every coordinate of `source` into `target`.
///
/// Returns `source` itself when it is already in `target`.
pub fn normalize(source: FeatureCollection, target: CrsId) -> Result<FeatureCollection, CrsError> {
    let from = source.crs.ok_or(CrsError::Undefined)?;
    if from == target {
        debug!("Collection already in {}, nothing to reproject", target);
        return Ok(source);
    }

    let t = transform(from, target)?;
    info!(
        "Reprojecting {} features from {} to {}",
        source.len(),
        from,
        target
    );

    let features: Vec<Feature> = source
        .features
        .into_iter()
        .map(|f| Feature::new(f.geometry.map_coords(|c| t.apply(c)), f.attributes))
        .collect();

    let lost = features.iter().filter(|f| !f.geometry.is_finite()).count();
    if lost > 0 {
        warn!(
            "{} of {} features have no finite position in {} and cannot match any zone",
            lost,
            features.len(),
            target
        );
    }

    Ok(FeatureCollection::new(Some(target), features))
}
