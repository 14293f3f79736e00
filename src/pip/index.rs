//! Spatial index for fast flood zone lookups.

use geo::{BoundingRect, Contains, Point};
use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use super::ZonePart;

/// Wrapper for R-tree indexing of zone polygons
#[derive(Debug, Clone)]
pub struct IndexedPart {
    pub part: ZonePart,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPart {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedPart {
    pub fn new(part: ZonePart) -> Option<Self> {
        let rect = part.polygon.bounding_rect()?;
        Some(Self {
            envelope: AABB::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            ),
            part,
        })
    }
}

/// Spatial index over validated zone polygons using an R-tree
pub struct ZoneIndex {
    tree: RTree<IndexedPart>,
}

impl ZoneIndex {
    /// Build spatial index from zone polygons
    pub fn build(parts: Vec<ZonePart>) -> Self {
        info!("Building spatial index for {} zone polygons...", parts.len());

        let indexed: Vec<IndexedPart> = parts.into_iter().filter_map(IndexedPart::new).collect();
        let tree = RTree::bulk_load(indexed);

        info!("Spatial index built with {} entries", tree.size());

        Self { tree }
    }

    /// Indices of every zone whose interior strictly contains `point`.
    ///
    /// Points on an outer ring or hole edge, or inside a hole, are not
    /// contained. Sorted ascending and deduplicated, so a zone made of several
    /// polygons is reported once.
    pub fn lookup(&self, point: Point<f64>) -> Vec<usize> {
        let query_envelope = AABB::from_point([point.x(), point.y()]);

        // R-tree narrows candidates by bounding box, exact containment decides
        let mut zones: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ip| ip.part.polygon.contains(&point))
            .map(|ip| ip.part.zone)
            .collect();

        zones.sort_unstable();
        zones.dedup();
        zones
    }

    /// Get total number of indexed polygons
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
