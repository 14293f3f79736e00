//! Flood zone extraction and validation.

use geo::{Area, LineString, Polygon};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{FeatureCollection, Shape};

/// Which ring of a polygon a problem refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingRole {
    Outer,
    Hole(usize),
}

impl std::fmt::Display for RingRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RingRole::Outer => write!(f, "outer ring"),
            RingRole::Hole(i) => write!(f, "hole {}", i),
        }
    }
}

/// Why a polygon part was rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Malformation {
    #[error("{ring} has {count} positions, at least 4 are required")]
    TooFewPositions { ring: RingRole, count: usize },
    #[error("{ring} is not closed")]
    NotClosed { ring: RingRole },
    #[error("outer ring encloses no area")]
    ZeroArea,
}

/// Non-fatal problem found while preparing the overlay
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryWarning {
    /// A zone polygon failed validation and is left out of containment tests.
    #[error("zone {zone} polygon {part} skipped: {reason}")]
    MalformedZone {
        zone: usize,
        part: usize,
        reason: Malformation,
    },
    /// The zone has no polygon geometry at all.
    #[error("zone {zone} skipped: {kind} geometry is not polygonal")]
    NonPolygonalZone { zone: usize, kind: &'static str },
    /// The property is not a single point.
    #[error("property {property} skipped: {kind} geometry is not a point")]
    NonPointProperty {
        property: usize,
        kind: &'static str,
    },
    /// The property point has a NaN or infinite coordinate, usually after
    /// projecting far outside a UTM zone.
    #[error("property {property} skipped: coordinates are not finite")]
    NonFiniteProperty { property: usize },
}

/// A validated polygon belonging to one flood zone.
///
/// A MultiPolygon zone yields one part per valid member polygon.
#[derive(Debug, Clone)]
pub struct ZonePart {
    /// Index of the zone feature in its collection
    pub zone: usize,
    pub polygon: Polygon<f64>,
}

/// Result of zone extraction: usable parts plus what was skipped
#[derive(Debug, Clone, Default)]
pub struct ZoneParts {
    pub parts: Vec<ZonePart>,
    pub warnings: Vec<GeometryWarning>,
}

fn check_ring(ring: &LineString<f64>, role: RingRole) -> Result<(), Malformation> {
    let count = ring.0.len();
    if count < 4 {
        return Err(Malformation::TooFewPositions { ring: role, count });
    }
    if ring.0.first() != ring.0.last() {
        return Err(Malformation::NotClosed { ring: role });
    }
    Ok(())
}

/// Check a loaded shape and turn it into a polygon fit for containment tests.
pub fn validate(shape: &Shape) -> Result<Polygon<f64>, Malformation> {
    check_ring(&shape.exterior, RingRole::Outer)?;
    for (i, hole) in shape.interiors.iter().enumerate() {
        check_ring(hole, RingRole::Hole(i))?;
    }

    // rings are already closed, so construction leaves them untouched
    let polygon = Polygon::new(shape.exterior.clone(), shape.interiors.clone());
    let outer_area = Polygon::new(shape.exterior.clone(), vec![]).unsigned_area();
    if outer_area == 0.0 {
        return Err(Malformation::ZeroArea);
    }

    Ok(polygon)
}

/// Extract validated polygon parts from every zone feature.
///
/// Malformed or non-polygonal zones are recorded as warnings and skipped so
/// that one bad record does not abort the overlay.
pub fn extract_zone_parts(zones: &FeatureCollection) -> ZoneParts {
    info!("Extracting flood zone polygons from {} zones...", zones.len());

    let mut out = ZoneParts::default();

    for (zone, feature) in zones.iter().enumerate() {
        if !feature.geometry.is_polygonal() {
            out.warnings.push(GeometryWarning::NonPolygonalZone {
                zone,
                kind: feature.geometry.kind(),
            });
            continue;
        }

        for (part, shape) in feature.geometry.shapes().iter().enumerate() {
            match validate(shape) {
                Ok(polygon) => out.parts.push(ZonePart { zone, polygon }),
                Err(reason) => out.warnings.push(GeometryWarning::MalformedZone {
                    zone,
                    part,
                    reason,
                }),
            }
        }
    }

    for warning in &out.warnings {
        warn!("{}", warning);
    }
    debug!(
        "Kept {} zone polygons, skipped {}",
        out.parts.len(),
        out.warnings.len()
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::CrsId;
    use crate::models::{Attributes, Feature, Geometry};
    use geo::Point;

    fn ring(points: &[(f64, f64)]) -> LineString<f64> {
        LineString::from(points.to_vec())
    }

    fn square() -> LineString<f64> {
        ring(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)])
    }

    #[test]
    fn test_valid_square() {
        assert!(validate(&Shape::new(square(), vec![])).is_ok());
    }

    #[test]
    fn test_three_point_ring_is_rejected() {
        let shape = Shape::new(ring(&[(0.0, 0.0), (0.0, 1.0), (0.0, 0.0)]), vec![]);
        assert_eq!(
            validate(&shape).unwrap_err(),
            Malformation::TooFewPositions {
                ring: RingRole::Outer,
                count: 3
            }
        );
    }

    #[test]
    fn test_open_ring_is_rejected() {
        let shape = Shape::new(
            ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]),
            vec![],
        );
        assert_eq!(
            validate(&shape).unwrap_err(),
            Malformation::NotClosed {
                ring: RingRole::Outer
            }
        );
    }

    #[test]
    fn test_bad_hole_is_rejected() {
        let shape = Shape::new(square(), vec![ring(&[(4.0, 4.0), (5.0, 5.0)])]);
        assert_eq!(
            validate(&shape).unwrap_err(),
            Malformation::TooFewPositions {
                ring: RingRole::Hole(0),
                count: 2
            }
        );
    }

    #[test]
    fn test_collinear_ring_has_zero_area() {
        let shape = Shape::new(
            ring(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.0, 0.0)]),
            vec![],
        );
        assert_eq!(validate(&shape).unwrap_err(), Malformation::ZeroArea);
    }

    #[test]
    fn test_extract_skips_bad_parts_and_keeps_good_ones() {
        let zones = FeatureCollection::new(
            Some(CrsId::WGS84),
            vec![
                Feature::new(
                    Geometry::MultiPolygon(vec![
                        Shape::new(ring(&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]), vec![]),
                        Shape::new(square(), vec![]),
                    ]),
                    Attributes::new(),
                ),
                Feature::new(Geometry::Point(Point::new(1.0, 1.0)), Attributes::new()),
            ],
        );

        let extracted = extract_zone_parts(&zones);
        assert_eq!(extracted.parts.len(), 1);
        assert_eq!(extracted.parts[0].zone, 0);
        assert_eq!(extracted.warnings.len(), 2);
        assert!(matches!(
            extracted.warnings[0],
            GeometryWarning::MalformedZone {
                zone: 0,
                part: 0,
                ..
            }
        ));
        assert_eq!(
            extracted.warnings[1],
            GeometryWarning::NonPolygonalZone {
                zone: 1,
                kind: "Point"
            }
        );
    }
}
