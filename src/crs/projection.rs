//! Forward and inverse projections between the supported reference systems.
//!
//! Every supported system converts to and from WGS-84 geographic
//! coordinates (longitude, latitude in degrees), which acts as the hub of
//! every transform.

use std::sync::OnceLock;

use geo::{coord, Coord};

use super::CrsId;

/// WGS-84 semi-major axis in metres
const WGS84_A: f64 = 6_378_137.0;
/// WGS-84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Latitude limit of the square Web Mercator world
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A coordinate system this crate knows how to project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Longitude/latitude in degrees on WGS-84
    Geographic,
    /// Spherical Mercator on the WGS-84 semi-major axis
    WebMercator,
    /// Universal Transverse Mercator on WGS-84
    Utm { zone: u8, north: bool },
}

impl Projection {
    /// Projection behind an EPSG code, if supported
    pub fn for_crs(crs: CrsId) -> Option<Self> {
        match crs.code() {
            4326 => Some(Projection::Geographic),
            3857 | 3785 | 900913 | 102100 => Some(Projection::WebMercator),
            code @ 32601..=32660 => Some(Projection::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            code @ 32701..=32760 => Some(Projection::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            _ => None,
        }
    }

    /// Projected coordinate -> WGS-84 longitude/latitude
    pub fn to_geographic(&self, c: Coord<f64>) -> Coord<f64> {
        match *self {
            Projection::Geographic => c,
            Projection::WebMercator => coord! {
                x: (c.x / WGS84_A).to_degrees(),
                y: (2.0 * (c.y / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees(),
            },
            Projection::Utm { zone, north } => utm_inverse(c, zone, north),
        }
    }

    /// WGS-84 longitude/latitude -> projected coordinate
    pub fn from_geographic(&self, c: Coord<f64>) -> Coord<f64> {
        match *self {
            Projection::Geographic => c,
            Projection::WebMercator => {
                let lat = c.y.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);
                coord! {
                    x: WGS84_A * c.x.to_radians(),
                    y: WGS84_A * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln(),
                }
            }
            Projection::Utm { zone, north } => utm_forward(c, zone, north),
        }
    }
}

/// Coordinate transform between two supported systems, routed through WGS-84.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    from: Projection,
    to: Projection,
}

impl Transform {
    pub fn new(from: Projection, to: Projection) -> Self {
        Self { from, to }
    }

    pub fn apply(&self, c: Coord<f64>) -> Coord<f64> {
        if self.from == self.to {
            return c;
        }
        self.to.from_geographic(self.from.to_geographic(c))
    }
}

/// Krüger n-series coefficients (third order) for WGS-84.
struct Krueger {
    /// Rectifying radius scaled by the UTM scale factor
    k0_a: f64,
    eccentricity: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
}

impl Krueger {
    fn wgs84() -> &'static Self {
        static SERIES: OnceLock<Krueger> = OnceLock::new();
        SERIES.get_or_init(Self::compute)
    }

    fn compute() -> Self {
        let n = WGS84_F / (2.0 - WGS84_F);
        let (n2, n3) = (n * n, n * n * n);
        let a = WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0);

        Self {
            k0_a: UTM_K0 * a,
            eccentricity: (WGS84_F * (2.0 - WGS84_F)).sqrt(),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
                n2 / 48.0 + n3 / 15.0,
                17.0 * n3 / 480.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
                56.0 * n3 / 15.0,
            ],
        }
    }
}

fn central_meridian(zone: u8) -> f64 {
    f64::from(zone) * 6.0 - 183.0
}

fn false_northing(north: bool) -> f64 {
    if north {
        0.0
    } else {
        UTM_FALSE_NORTHING_SOUTH
    }
}

fn utm_forward(c: Coord<f64>, zone: u8, north: bool) -> Coord<f64> {
    let k = Krueger::wgs84();
    let phi = c.y.to_radians();
    let dl = (c.x - central_meridian(zone)).to_radians();

    let sin_phi = phi.sin();
    let t = (sin_phi.atanh() - k.eccentricity * (k.eccentricity * sin_phi).atanh()).sinh();
    let xi_p = t.atan2(dl.cos());
    let eta_p = (dl.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut xi = xi_p;
    let mut eta = eta_p;
    for (j, alpha) in k.alpha.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        xi += alpha * (m * xi_p).sin() * (m * eta_p).cosh();
        eta += alpha * (m * xi_p).cos() * (m * eta_p).sinh();
    }

    coord! {
        x: UTM_FALSE_EASTING + k.k0_a * eta,
        y: false_northing(north) + k.k0_a * xi,
    }
}

fn utm_inverse(c: Coord<f64>, zone: u8, north: bool) -> Coord<f64> {
    let k = Krueger::wgs84();
    let xi = (c.y - false_northing(north)) / k.k0_a;
    let eta = (c.x - UTM_FALSE_EASTING) / k.k0_a;

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, beta) in k.beta.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        xi_p -= beta * (m * xi).sin() * (m * eta).cosh();
        eta_p -= beta * (m * xi).cos() * (m * eta).sinh();
    }

    let chi = (xi_p.sin() / eta_p.cosh()).asin();
    let mut phi = chi;
    for (j, delta) in k.delta.iter().enumerate() {
        let m = 2.0 * (j + 1) as f64;
        phi += delta * (m * chi).sin();
    }

    coord! {
        x: central_meridian(zone) + eta_p.sinh().atan2(xi_p.cos()).to_degrees(),
        y: phi.to_degrees(),
    }
}
