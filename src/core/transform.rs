//! Geographic ↔ engine coordinate helpers that do not depend on the live map.

use crate::core::constants::TILE_RESOLUTION;
use crate::core::geo::{GeoPoint, MercatorCoordinate};
use nalgebra::{Matrix4, Vector3};

/// Converts the ground distance between `center` and `outer` into engine
/// coordinate units.
///
/// Returns `1.0` when the ground distance is zero or undefined (coincident
/// points, NaN coordinates).
pub fn meter_to_coord(center: GeoPoint, outer: GeoPoint) -> f64 {
    let center_mercator = MercatorCoordinate::from_lng_lat(center, 0.0);
    let outer_mercator = MercatorCoordinate::from_lng_lat(outer, 0.0);
    let coord_distance = ((center_mercator.x - outer_mercator.x).powi(2)
        + (center_mercator.y - outer_mercator.y).powi(2))
    .sqrt();

    let meter_distance = center.haversine_distance(&outer);
    if meter_distance == 0.0 || meter_distance.is_nan() {
        return 1.0;
    }
    coord_distance * TILE_RESOLUTION / meter_distance
}

pub fn lng_lat_to_mercator(point: GeoPoint, altitude: f64) -> MercatorCoordinate {
    MercatorCoordinate::from_lng_lat(point, altitude)
}

/// Builds the column-major model matrix anchoring a 3D object at `point`.
///
/// Translation, then scale (Y flipped), then rotations about X, Y and Z.
pub fn model_matrix(
    point: GeoPoint,
    altitude: f64,
    rotate: [f64; 3],
    scale: [f64; 3],
    origin: MercatorCoordinate,
) -> [f64; 16] {
    let anchor = MercatorCoordinate::from_lng_lat(point, altitude);
    let meters = anchor.meter_in_mercator_units();

    let mut matrix = Matrix4::new_translation(&Vector3::new(
        anchor.x - origin.x,
        anchor.y - origin.y,
        anchor.z - origin.z,
    ));
    matrix *= Matrix4::new_nonuniform_scaling(&Vector3::new(
        meters * scale[0],
        -meters * scale[1],
        meters * scale[2],
    ));
    matrix *= Matrix4::from_axis_angle(&Vector3::x_axis(), rotate[0]);
    matrix *= Matrix4::from_axis_angle(&Vector3::y_axis(), rotate[1]);
    matrix *= Matrix4::from_axis_angle(&Vector3::z_axis(), rotate[2]);

    let mut out = [0.0; 16];
    out.copy_from_slice(matrix.as_slice());
    out
}
