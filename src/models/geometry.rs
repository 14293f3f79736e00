//! Geometry as loaded from the interchange format.

use geo::{Coord, LineString, MultiLineString, MultiPoint, Point};

/// A polygon exactly as it was read: one outer ring plus zero or more holes.
///
/// Rings are kept verbatim and never closed automatically, so a truncated or
/// open ring is still visible when zones are validated for the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub exterior: LineString<f64>,
    pub interiors: Vec<LineString<f64>>,
}

impl Shape {
    pub fn new(exterior: LineString<f64>, interiors: Vec<LineString<f64>>) -> Self {
        Self {
            exterior,
            interiors,
        }
    }

    /// Outer ring followed by the holes
    pub fn rings(&self) -> impl Iterator<Item = &LineString<f64>> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    fn map_coords<F: Fn(Coord<f64>) -> Coord<f64>>(&self, f: &F) -> Self {
        Self {
            exterior: map_line(&self.exterior, f),
            interiors: self.interiors.iter().map(|r| map_line(r, f)).collect(),
        }
    }
}

/// Geometry of a single feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point<f64>),
    MultiPoint(MultiPoint<f64>),
    LineString(LineString<f64>),
    MultiLineString(MultiLineString<f64>),
    Polygon(Shape),
    MultiPolygon(Vec<Shape>),
    GeometryCollection(Vec<Geometry>),
    /// Feature without a location (`"geometry": null`)
    Null,
}

impl Geometry {
    /// GeoJSON type name, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::GeometryCollection(_) => "GeometryCollection",
            Geometry::Null => "null",
        }
    }

    pub fn as_point(&self) -> Option<Point<f64>> {
        match self {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Polygon parts of this geometry; empty for non-polygonal kinds.
    pub fn shapes(&self) -> &[Shape] {
        match self {
            Geometry::Polygon(shape) => std::slice::from_ref(shape),
            Geometry::MultiPolygon(shapes) => shapes,
            _ => &[],
        }
    }

    pub fn is_polygonal(&self) -> bool {
        matches!(self, Geometry::Polygon(_) | Geometry::MultiPolygon(_))
    }

    /// Apply `f` to every coordinate, keeping the structure intact.
    pub fn map_coords<F: Fn(Coord<f64>) -> Coord<f64>>(&self, f: F) -> Self {
        match self {
            Geometry::Point(p) => Geometry::Point(Point::from(f(p.0))),
            Geometry::MultiPoint(mp) => Geometry::MultiPoint(MultiPoint::new(
                mp.iter().map(|p| Point::from(f(p.0))).collect(),
            )),
            Geometry::LineString(ls) => Geometry::LineString(map_line(ls, &f)),
            Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString::new(
                mls.iter().map(|ls| map_line(ls, &f)).collect(),
            )),
            Geometry::Polygon(shape) => Geometry::Polygon(shape.map_coords(&f)),
            Geometry::MultiPolygon(shapes) => {
                Geometry::MultiPolygon(shapes.iter().map(|s| s.map_coords(&f)).collect())
            }
            Geometry::GeometryCollection(members) => Geometry::GeometryCollection(
                members
                    .iter()
                    .map(|g| g.map_coords(&f as &dyn Fn(Coord<f64>) -> Coord<f64>))
                    .collect(),
            ),
            Geometry::Null => Geometry::Null,
        }
    }

    /// False when any coordinate is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.coords()
            .iter()
            .all(|c| c.x.is_finite() && c.y.is_finite())
    }

    /// Every coordinate in storage order
    pub fn coords(&self) -> Vec<Coord<f64>> {
        match self {
            Geometry::Point(p) => vec![p.0],
            Geometry::MultiPoint(mp) => mp.iter().map(|p| p.0).collect(),
            Geometry::LineString(ls) => ls.0.clone(),
            Geometry::MultiLineString(mls) => {
                mls.iter().flat_map(|ls| ls.0.iter().copied()).collect()
            }
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => self
                .shapes()
                .iter()
                .flat_map(|s| s.rings())
                .flat_map(|r| r.0.iter().copied())
                .collect(),
            Geometry::GeometryCollection(members) => {
                members.iter().flat_map(|g| g.coords()).collect()
            }
            Geometry::Null => Vec::new(),
        }
    }
}

fn map_line<F: Fn(Coord<f64>) -> Coord<f64>>(line: &LineString<f64>, f: &F) -> LineString<f64> {
    LineString::new(line.0.iter().map(|c| f(*c)).collect())
}
