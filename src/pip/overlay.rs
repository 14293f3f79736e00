//! Overlay of property points against flood zones.

use geo::Point;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{extract_zone_parts, GeometryWarning, ZoneIndex};
use crate::crs::CrsId;
use crate::models::{Attributes, Feature, FeatureCollection};

fn describe(crs: &Option<CrsId>) -> String {
    crs.map_or_else(|| "undefined".to_string(), |c| c.to_string())
}

/// Errors that stop the overlay
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OverlayError {
    /// The two collections are not in one reference system.
    #[error(
        "property CRS {} does not match zone CRS {}; normalize the properties first",
        describe(.properties),
        describe(.zones)
    )]
    CrsMismatch {
        properties: Option<CrsId>,
        zones: Option<CrsId>,
    },
}

/// One property lying strictly inside at least one zone
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMatch<'a> {
    /// Position of the property in its collection
    pub index: usize,
    pub location: Point<f64>,
    pub attributes: &'a Attributes,
    /// Attributes of every containing zone, in zone order
    pub zones: Vec<&'a Attributes>,
}

/// Overlay output: matches in property order plus skipped-geometry warnings
#[derive(Debug, Clone, Default)]
pub struct Overlay<'a> {
    pub matches: Vec<PropertyMatch<'a>>,
    pub warnings: Vec<GeometryWarning>,
}

impl Overlay<'_> {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

enum Outcome<'a> {
    Match(PropertyMatch<'a>),
    Miss,
    Skipped(GeometryWarning),
}

fn check_crs(
    properties: &FeatureCollection,
    zones: &FeatureCollection,
) -> Result<(), OverlayError> {
    match (properties.crs, zones.crs) {
        (Some(p), Some(z)) if p == z => Ok(()),
        (p, z) => Err(OverlayError::CrsMismatch {
            properties: p,
            zones: z,
        }),
    }
}

fn match_property<'a>(
    index: &ZoneIndex,
    zones: &'a FeatureCollection,
    property: usize,
    feature: &'a Feature,
) -> Outcome<'a> {
    let Some(location) = feature.geometry.as_point() else {
        return Outcome::Skipped(GeometryWarning::NonPointProperty {
            property,
            kind: feature.geometry.kind(),
        });
    };
    if !(location.x().is_finite() && location.y().is_finite()) {
        return Outcome::Skipped(GeometryWarning::NonFiniteProperty { property });
    }

    let hits = index.lookup(location);
    if hits.is_empty() {
        return Outcome::Miss;
    }

    debug!(
        "Property {} at ({}, {}) lies in {} zones",
        property,
        location.x(),
        location.y(),
        hits.len()
    );

    Outcome::Match(PropertyMatch {
        index: property,
        location,
        attributes: &feature.attributes,
        zones: hits.into_iter().map(|z| &zones.features[z].attributes).collect(),
    })
}

fn finish<'a>(mut warnings: Vec<GeometryWarning>, outcomes: Vec<Outcome<'a>>) -> Overlay<'a> {
    let mut matches = Vec::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Match(m) => matches.push(m),
            Outcome::Miss => {}
            Outcome::Skipped(w) => {
                warn!("{}", w);
                warnings.push(w);
            }
        }
    }

    info!(
        "Overlay matched {} properties ({} warnings)",
        matches.len(),
        warnings.len()
    );

    Overlay { matches, warnings }
}

fn prepare(
    properties: &FeatureCollection,
    zones: &FeatureCollection,
) -> Result<(ZoneIndex, Vec<GeometryWarning>), OverlayError> {
    check_crs(properties, zones)?;
    let extracted = extract_zone_parts(zones);
    info!(
        "Testing {} properties against {} zone polygons",
        properties.len(),
        extracted.parts.len()
    );
    Ok((ZoneIndex::build(extracted.parts), extracted.warnings))
}

/// Find every property point lying strictly inside one or more zones.
///
/// Both collections must already share a reference system. Properties with
/// no containing zone are dropped; the survivors keep their input order.
pub fn intersect<'a>(
    properties: &'a FeatureCollection,
    zones: &'a FeatureCollection,
) -> Result<Overlay<'a>, OverlayError> {
    let (index, warnings) = prepare(properties, zones)?;

    let outcomes = properties
        .iter()
        .enumerate()
        .map(|(i, feature)| match_property(&index, zones, i, feature))
        .collect();

    Ok(finish(warnings, outcomes))
}

/// Same as [`intersect`], with the property loop spread over the rayon pool.
///
/// The zone index is shared read-only and the indexed collect keeps the
/// output identical to the sequential run.
pub fn intersect_parallel<'a>(
    properties: &'a FeatureCollection,
    zones: &'a FeatureCollection,
) -> Result<Overlay<'a>, OverlayError> {
    let (index, warnings) = prepare(properties, zones)?;

    let outcomes = properties
        .features
        .par_iter()
        .enumerate()
        .map(|(i, feature)| match_property(&index, zones, i, feature))
        .collect();

    Ok(finish(warnings, outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Geometry, Shape};
    use geo::LineString;
    use serde_json::json;

    fn attrs(id: &str) -> Attributes {
        let mut a = Attributes::new();
        a.insert("id".into(), json!(id));
        a
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> LineString<f64> {
        LineString::from(vec![(x0, y0), (x0, y1), (x1, y1), (x1, y0), (x0, y0)])
    }

    fn zone(id: &str, shape: Shape) -> Feature {
        Feature::new(Geometry::Polygon(shape), attrs(id))
    }

    fn property(id: &str, x: f64, y: f64) -> Feature {
        Feature::new(Geometry::Point(Point::new(x, y)), attrs(id))
    }

    fn ids(overlay: &Overlay<'_>) -> Vec<String> {
        overlay
            .matches
            .iter()
            .map(|m| m.attributes["id"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn wgs84(features: Vec<Feature>) -> FeatureCollection {
        FeatureCollection::new(Some(CrsId::WGS84), features)
    }

    #[test]
    fn test_unit_square_containment() {
        let zones = wgs84(vec![zone("z", Shape::new(square(0.0, 0.0, 10.0, 10.0), vec![]))]);
        let props = wgs84(vec![
            property("inside", 5.0, 5.0),
            property("outside", 15.0, 15.0),
            property("edge", 0.0, 5.0),
        ]);

        let overlay = intersect(&props, &zones).unwrap();
        assert_eq!(ids(&overlay), vec!["inside"]);
        assert!(overlay.warnings.is_empty());
    }

    #[test]
    fn test_hole_exclusion() {
        let zones = wgs84(vec![zone(
            "z",
            Shape::new(square(0.0, 0.0, 10.0, 10.0), vec![square(4.0, 4.0, 6.0, 6.0)]),
        )]);
        let props = wgs84(vec![property("hole", 5.0, 5.0), property("ring", 1.0, 1.0)]);

        let overlay = intersect(&props, &zones).unwrap();
        assert_eq!(ids(&overlay), vec!["ring"]);
    }

    #[test]
    fn test_overlapping_zones_collected() {
        let zones = wgs84(vec![
            zone("a", Shape::new(square(0.0, 0.0, 10.0, 10.0), vec![])),
            zone("b", Shape::new(square(5.0, 5.0, 15.0, 15.0), vec![])),
        ]);
        let props = wgs84(vec![property("both", 7.0, 7.0)]);

        let overlay = intersect(&props, &zones).unwrap();
        assert_eq!(overlay.matches.len(), 1);
        let zone_ids: Vec<_> = overlay.matches[0]
            .zones
            .iter()
            .map(|z| z["id"].clone())
            .collect();
        assert_eq!(zone_ids, vec![json!("a"), json!("b")]);
    }

    #[test]
    fn test_order_preserved() {
        let zones = wgs84(vec![zone("z", Shape::new(square(0.0, 0.0, 10.0, 10.0), vec![]))]);
        let props = wgs84(vec![
            property("p1", 20.0, 20.0),
            property("p2", 1.0, 1.0),
            property("p3", -1.0, 4.0),
            property("p4", 9.0, 9.0),
            property("p5", 11.0, 5.0),
        ]);

        let overlay = intersect(&props, &zones).unwrap();
        assert_eq!(ids(&overlay), vec!["p2", "p4"]);
        assert_eq!(
            overlay.matches.iter().map(|m| m.index).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn test_malformed_zone_is_skipped_with_warning() {
        let zones = wgs84(vec![
            zone(
                "bad",
                Shape::new(LineString::from(vec![(0.0, 0.0), (0.0, 10.0), (0.0, 0.0)]), vec![]),
            ),
            zone("good", Shape::new(square(0.0, 0.0, 10.0, 10.0), vec![])),
        ]);
        let props = wgs84(vec![property("p", 5.0, 5.0)]);

        let overlay = intersect(&props, &zones).unwrap();
        assert_eq!(ids(&overlay), vec!["p"]);
        assert_eq!(overlay.matches[0].zones.len(), 1);
        assert_eq!(overlay.matches[0].zones[0]["id"], json!("good"));
        assert_eq!(overlay.warning_count(), 1);
        assert!(matches!(
            overlay.warnings[0],
            GeometryWarning::MalformedZone { zone: 0, .. }
        ));
    }

    #[test]
    fn test_non_point_property_is_skipped() {
        let zones = wgs84(vec![zone("z", Shape::new(square(0.0, 0.0, 10.0, 10.0), vec![]))]);
        let props = wgs84(vec![
            Feature::new(Geometry::Null, attrs("null")),
            property("p", 1.0, 1.0),
        ]);

        let overlay = intersect(&props, &zones).unwrap();
        assert_eq!(ids(&overlay), vec!["p"]);
        assert_eq!(
            overlay.warnings,
            vec![GeometryWarning::NonPointProperty {
                property: 0,
                kind: "null"
            }]
        );
    }

    #[test]
    fn test_non_finite_property_is_skipped() {
        let zones = wgs84(vec![zone("z", Shape::new(square(0.0, 0.0, 10.0, 10.0), vec![]))]);
        let props = wgs84(vec![
            property("lost", f64::INFINITY, 5.0),
            property("p", 1.0, 1.0),
        ]);

        let overlay = intersect(&props, &zones).unwrap();
        assert_eq!(ids(&overlay), vec!["p"]);
        assert_eq!(
            overlay.warnings,
            vec![GeometryWarning::NonFiniteProperty { property: 0 }]
        );
    }

    #[test]
    fn test_geometry_collection_zone_is_skipped() {
        let zones = wgs84(vec![
            Feature::new(Geometry::GeometryCollection(vec![]), attrs("gc")),
            zone("z", Shape::new(square(0.0, 0.0, 10.0, 10.0), vec![])),
        ]);
        let props = wgs84(vec![property("p", 1.0, 1.0)]);

        let overlay = intersect(&props, &zones).unwrap();
        assert_eq!(ids(&overlay), vec!["p"]);
        assert_eq!(
            overlay.warnings,
            vec![GeometryWarning::NonPolygonalZone {
                zone: 0,
                kind: "GeometryCollection"
            }]
        );
    }

    #[test]
    fn test_no_matches_is_empty() {
        let zones = wgs84(vec![zone("z", Shape::new(square(0.0, 0.0, 1.0, 1.0), vec![]))]);
        let props = wgs84(vec![property("far", 50.0, 50.0)]);

        let overlay = intersect(&props, &zones).unwrap();
        assert!(overlay.matches.is_empty());
    }

    #[test]
    fn test_crs_mismatch() {
        let zones = wgs84(vec![]);
        let props = FeatureCollection::new(Some(CrsId::WEB_MERCATOR), vec![]);

        let err = intersect(&props, &zones).unwrap_err();
        assert_eq!(
            err,
            OverlayError::CrsMismatch {
                properties: Some(CrsId::WEB_MERCATOR),
                zones: Some(CrsId::WGS84)
            }
        );
        assert!(err.to_string().contains("EPSG:3857"));

        let undefined = FeatureCollection::new(None, vec![]);
        assert!(intersect(&undefined, &FeatureCollection::new(None, vec![])).is_err());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let zones = wgs84(vec![
            zone(
                "a",
                Shape::new(square(0.0, 0.0, 50.0, 50.0), vec![square(10.0, 10.0, 20.0, 20.0)]),
            ),
            zone("b", Shape::new(square(40.0, 40.0, 100.0, 100.0), vec![])),
        ]);
        let props = wgs84(
            (0..500)
                .map(|i| {
                    let x = f64::from(i % 25) * 4.1;
                    let y = f64::from(i / 25) * 5.3;
                    property(&format!("p{}", i), x, y)
                })
                .collect(),
        );

        let sequential = intersect(&props, &zones).unwrap();
        let parallel = intersect_parallel(&props, &zones).unwrap();
        assert!(!sequential.matches.is_empty());
        assert_eq!(sequential.matches, parallel.matches);
        assert_eq!(sequential.warnings, parallel.warnings);
    }
}
