use crate::core::constants::{DEFAULT_ALTITUDE, TILE_SIZE};
use crate::core::geo::GeoPoint;
use nalgebra::{Matrix4, Perspective3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Camera state read from the live map, fed into [`Viewport::sync_with_map_camera`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub center: GeoPoint,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub bearing: f64,
    pub pitch: f64,
    pub zoom: f64,
    pub camera_height: f64,
}

/// The adapter's web-mercator projection of the live camera.
///
/// One instance is owned by each map service and updated in place on every
/// sync; it is never swapped for a fresh value.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: GeoPoint,
    /// Size of the viewport in pixels
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees, clockwise from north
    pub bearing: f64,
    /// Tilt in degrees
    pub pitch: f64,
    /// The current (canonical) zoom level
    pub zoom: f64,
    pub camera_height: f64,
    /// Projected center in flat world pixels
    center_flat: [f64; 2],
    view_matrix: Matrix4<f64>,
    view_matrix_uncentered: Matrix4<f64>,
    projection_matrix: Matrix4<f64>,
    view_projection_matrix: Matrix4<f64>,
    /// Number of syncs applied so far
    revision: u64,
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            center: GeoPoint::new(0.0, 0.0),
            width: 0.0,
            height: 0.0,
            bearing: 0.0,
            pitch: 0.0,
            zoom: 0.0,
            camera_height: 0.0,
            center_flat: [0.0, 0.0],
            view_matrix: Matrix4::identity(),
            view_matrix_uncentered: Matrix4::identity(),
            projection_matrix: Matrix4::identity(),
            view_projection_matrix: Matrix4::identity(),
            revision: 0,
        }
    }

    /// Recomputes the projection from the map's current camera.
    pub fn sync_with_map_camera(&mut self, camera: CameraState) {
        self.center = camera.center;
        self.width = camera.viewport_width;
        self.height = camera.viewport_height;
        self.bearing = camera.bearing;
        self.pitch = camera.pitch;
        self.zoom = camera.zoom;
        self.camera_height = camera.camera_height;
        self.revision += 1;

        self.center_flat = self.project_flat(self.center.to_array(), None);
        self.update_matrices();
    }

    fn update_matrices(&mut self) {
        if self.width <= 0.0 || self.height <= 0.0 {
            return;
        }

        self.view_matrix_uncentered = view_matrix(self.height, self.pitch, self.bearing, None);
        self.view_matrix = view_matrix(
            self.height,
            self.pitch,
            self.bearing,
            Some(Vector3::new(self.center_flat[0], self.center_flat[1], 0.0)),
        );

        let (fovy, aspect, near, far) = projection_parameters(self.width, self.height, self.pitch);
        self.projection_matrix = Perspective3::new(aspect, fovy, near, far).to_homogeneous();
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    /// Gets the scale factor for the current zoom level
    pub fn zoom_scale(&self) -> f64 {
        2_f64.powf(self.zoom)
    }

    /// Projects `[lng, lat]` into flat world pixels (y grows southwards).
    /// `scale` defaults to the current zoom scale.
    pub fn project_flat(&self, lng_lat: [f64; 2], scale: Option<f64>) -> [f64; 2] {
        let scale = scale.unwrap_or_else(|| self.zoom_scale()) * TILE_SIZE;
        let lambda = lng_lat[0].to_radians();
        let phi = lng_lat[1].to_radians();

        let x = scale * (lambda + PI) / (2.0 * PI);
        let y = scale * (PI - (PI / 4.0 + phi * 0.5).tan().ln()) / (2.0 * PI);
        [x, y]
    }

    /// Inverse of [`Viewport::project_flat`].
    pub fn unproject_flat(&self, xy: [f64; 2], scale: Option<f64>) -> [f64; 2] {
        let scale = scale.unwrap_or_else(|| self.zoom_scale()) * TILE_SIZE;
        let lambda = xy[0] / scale * (2.0 * PI) - PI;
        let phi = 2.0 * ((PI - xy[1] / scale * (2.0 * PI)).exp().atan() - PI / 4.0);
        [lambda.to_degrees(), phi.to_degrees()]
    }

    pub fn center_flat(&self) -> [f64; 2] {
        self.center_flat
    }

    pub fn view_matrix(&self) -> &Matrix4<f64> {
        &self.view_matrix
    }

    pub fn view_matrix_uncentered(&self) -> &Matrix4<f64> {
        &self.view_matrix_uncentered
    }

    pub fn projection_matrix(&self) -> &Matrix4<f64> {
        &self.projection_matrix
    }

    pub fn view_projection_matrix(&self) -> &Matrix4<f64> {
        &self.view_projection_matrix
    }

    pub fn focal_distance(&self) -> f64 {
        1.0
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

fn view_matrix(height: f64, pitch: f64, bearing: f64, center: Option<Vector3<f64>>) -> Matrix4<f64> {
    let mut vm = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -DEFAULT_ALTITUDE));
    vm *= Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 1.0, 1.0 / height));
    vm *= Matrix4::from_axis_angle(&Vector3::x_axis(), -pitch.to_radians());
    vm *= Matrix4::from_axis_angle(&Vector3::z_axis(), bearing.to_radians());
    vm *= Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, -1.0, 1.0));
    if let Some(center) = center {
        vm *= Matrix4::new_translation(&-center);
    }
    vm
}

/// `(fovy, aspect, near, far)` for a camera at [`DEFAULT_ALTITUDE`].
fn projection_parameters(width: f64, height: f64, pitch: f64) -> (f64, f64, f64, f64) {
    let pitch = pitch.to_radians();
    let half_fov = (0.5 / DEFAULT_ALTITUDE).atan();
    let top_half_surface_distance =
        half_fov.sin() * DEFAULT_ALTITUDE / (PI / 2.0 - pitch - half_fov).sin();
    let far = (PI / 2.0 - pitch).cos() * top_half_surface_distance + DEFAULT_ALTITUDE;

    (2.0 * half_fov, width / height, 0.1, far)
}
