//! Point-in-Polygon (PIP) flood zone overlay.
//!
//! Validates zone polygons, indexes them in an R-tree and tests every
//! property point for strict interior containment.

mod boundary;
mod index;
mod overlay;

pub use boundary::{
    extract_zone_parts, validate, GeometryWarning, Malformation, RingRole, ZonePart, ZoneParts,
};
pub use index::ZoneIndex;
pub use overlay::{intersect, intersect_parallel, Overlay, OverlayError, PropertyMatch};
