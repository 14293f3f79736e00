//! Features and feature collections.

use serde_json::{Map, Value};

use super::Geometry;
use crate::crs::CrsId;

/// Attribute mapping carried from the source file (name -> value)
pub type Attributes = Map<String, Value>;

/// One geometry plus its attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    pub attributes: Attributes,
}

impl Feature {
    pub fn new(geometry: Geometry, attributes: Attributes) -> Self {
        Self {
            geometry,
            attributes,
        }
    }
}

/// Ordered features sharing one coordinate reference system.
///
/// Built once at load time and treated as read-only afterwards; reprojection
/// produces a new collection.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    /// `None` when the source did not declare a CRS and none was assumed
    pub crs: Option<CrsId>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(crs: Option<CrsId>, features: Vec<Feature>) -> Self {
        Self { crs, features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }
}
