//! Floodmark - flags property locations that fall inside flood-risk zones.
//!
//! This library provides the geometry model, CRS normalization, the
//! point-in-polygon overlay and the GeoJSON boundary used by the binary.

pub mod assemble;
pub mod crs;
pub mod error;
pub mod geojson;
pub mod models;
pub mod pip;
pub mod pipeline;

pub use crs::{normalize, CrsError, CrsId};
pub use error::Error;
pub use models::{Feature, FeatureCollection, Geometry, Row};
pub use pip::{intersect, GeometryWarning, OverlayError};
