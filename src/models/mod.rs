//! Core data models for the flood overlay.

pub mod feature;
pub mod geometry;
pub mod row;

pub use feature::{Attributes, Feature, FeatureCollection};
pub use geometry::{Geometry, Shape};
pub use row::{Row, AT_RISK_FIELD, SHADOWED_AT_RISK_FIELD, ZONE_COUNT_FIELD};
