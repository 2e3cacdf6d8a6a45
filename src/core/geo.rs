use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::core::constants::{DEFAULT_CENTER, EARTH_RADIUS, MERCATOR_EARTH_RADIUS};

/// Canonical geographic coordinate in degrees.
///
/// Values are never clamped or wrapped: out-of-range input passes through
/// unmodified so the adapter stays faithful to whatever the SDK reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// The documented fallback coordinate used by the normalizer.
    pub fn default_center() -> Self {
        Self::from(DEFAULT_CENTER)
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0 && self.lng >= -180.0 && self.lng <= 180.0
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// Great-circle distance in meters using the haversine formula on a sphere
    /// of radius [`EARTH_RADIUS`].
    pub fn haversine_distance(&self, other: &GeoPoint) -> f64 {
        let rad_lat1 = self.lat.to_radians();
        let rad_lat2 = other.lat.to_radians();
        let a = rad_lat1 - rad_lat2;
        let b = (self.lng - other.lng).to_radians();

        let s = 2.0
            * ((a / 2.0).sin().powi(2) + rad_lat1.cos() * rad_lat2.cos() * (b / 2.0).sin().powi(2))
                .sqrt()
                .asin();

        s * EARTH_RADIUS
    }
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self::default_center()
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self::new(lng, lat)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lng, lat): (f64, f64)) -> Self {
        Self::new(lng, lat)
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        point.to_array()
    }
}

/// Ordered `[southwest, northeast]` pair.
///
/// Inverted boxes are accepted as given; nothing here reorders corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl Bounds {
    pub fn new(south_west: GeoPoint, north_east: GeoPoint) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Degenerate bounds covering a single point.
    pub fn from_point(point: GeoPoint) -> Self {
        Self::new(point, point)
    }

    /// `[west, south, east, north]`, the flat form `panToBounds` expects.
    pub fn to_flat(&self) -> [f64; 4] {
        [
            self.south_west.lng,
            self.south_west.lat,
            self.north_east.lng,
            self.north_east.lat,
        ]
    }

    pub fn to_array(&self) -> [[f64; 2]; 2] {
        [self.south_west.to_array(), self.north_east.to_array()]
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south_west.lng + self.north_east.lng) / 2.0,
            (self.south_west.lat + self.north_east.lat) / 2.0,
        )
    }
}

impl From<[[f64; 2]; 2]> for Bounds {
    fn from([sw, ne]: [[f64; 2]; 2]) -> Self {
        Self::new(sw.into(), ne.into())
    }
}

/// Represents a point in screen (container) pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for PixelPoint {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<[f64; 2]> for PixelPoint {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

/// A position in the normalised Mercator space where the world spans `[0, 1]`
/// on both axes and `z` is altitude in the same units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MercatorCoordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MercatorCoordinate {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_lng_lat(point: GeoPoint, altitude: f64) -> Self {
        Self::new(
            mercator_x_from_lng(point.lng),
            mercator_y_from_lat(point.lat),
            altitude / circumference_at_latitude(point.lat),
        )
    }

    pub fn to_lng_lat(&self) -> GeoPoint {
        GeoPoint::new(lng_from_mercator_x(self.x), lat_from_mercator_y(self.y))
    }

    /// Size of one meter at this coordinate's latitude, in Mercator units.
    pub fn meter_in_mercator_units(&self) -> f64 {
        let scale = 1.0 / lat_from_mercator_y(self.y).to_radians().cos();
        scale / earth_circumference()
    }
}

fn earth_circumference() -> f64 {
    2.0 * PI * MERCATOR_EARTH_RADIUS
}

fn circumference_at_latitude(lat: f64) -> f64 {
    earth_circumference() * lat.to_radians().cos()
}

fn mercator_x_from_lng(lng: f64) -> f64 {
    (180.0 + lng) / 360.0
}

fn mercator_y_from_lat(lat: f64) -> f64 {
    (180.0 - (180.0 / PI) * (PI / 4.0 + lat * PI / 360.0).tan().ln()) / 360.0
}

fn lng_from_mercator_x(x: f64) -> f64 {
    x * 360.0 - 180.0
}

fn lat_from_mercator_y(y: f64) -> f64 {
    let y2 = 180.0 - y * 360.0;
    360.0 / PI * (y2 * PI / 180.0).exp().atan() - 90.0
}

/// Arbitrarily nested coordinate lists (points, lines, polygons, multi-polygons).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordTree {
    Point([f64; 2]),
    Nested(Vec<CoordTree>),
}

impl CoordTree {
    /// Applies `f` to every leaf, preserving the nesting.
    pub fn map_points(&self, f: &impl Fn([f64; 2]) -> [f64; 2]) -> CoordTree {
        match self {
            CoordTree::Point(p) => CoordTree::Point(f(*p)),
            CoordTree::Nested(items) => {
                CoordTree::Nested(items.iter().map(|item| item.map_points(f)).collect())
            }
        }
    }
}
