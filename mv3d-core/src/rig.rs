/// Camera placement policy and orbit controls
use nalgebra::{Point3, Vector3};

use crate::geometry::Bounds;
use crate::projection::Camera;
use crate::request::ViewerRequest;

/// Point every load cycle ends up looking at
pub fn scene_center() -> Point3<f32> {
    Point3::origin()
}

/// Apply the host's camera overrides, then face the scene center.
///
/// Position and rotation are independent: an absent group leaves that part
/// of the pose as it was. Framing does not depend on `_bounds`; every asset
/// is viewed from the same fixed center.
pub fn apply_policy(camera: &mut Camera, request: &ViewerRequest, _bounds: Option<&Bounds>) {
    if let Some(position) = request.initial_camera_position {
        camera.position = position.to_point();
    }

    if let Some(rotation) = request.initial_camera_rotation {
        camera.rotation = rotation.to_vector().into();
    }

    camera.look_at(scene_center());
}

/// Orbit/zoom/pan interaction around the camera target
#[derive(Debug, Clone, Copy)]
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            pan_speed: 0.001,
            min_distance: 1.0,
        }
    }
}

impl OrbitControls {
    /// Rotate the camera around its target by a pointer delta in pixels
    pub fn rotate(&self, camera: &mut Camera, dx: f32, dy: f32) {
        let offset = camera.position - camera.target;
        let radius = offset.norm();
        if radius < 1e-6 {
            return;
        }

        let limit = std::f32::consts::FRAC_PI_2 - 0.01;
        let theta = offset.x.atan2(offset.z) - dx * self.rotate_speed;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).asin() + dy * self.rotate_speed).clamp(-limit, limit);

        let offset = Vector3::new(
            radius * theta.sin() * phi.cos(),
            radius * phi.sin(),
            radius * theta.cos() * phi.cos(),
        );
        camera.position = camera.target + offset;
        camera.look_at(camera.target);
    }

    /// Move towards (positive delta) or away from the target
    pub fn zoom(&self, camera: &mut Camera, delta: f32) {
        let offset = camera.position - camera.target;
        let distance = offset.norm();
        if distance < 1e-6 {
            return;
        }
        let new_distance = (distance * (1.0 - delta * self.zoom_speed)).max(self.min_distance);
        camera.position = camera.target + offset * (new_distance / distance);
    }

    /// Shift camera and target together in the view plane
    pub fn pan(&self, camera: &mut Camera, dx: f32, dy: f32) {
        let distance = (camera.position - camera.target).norm();
        let forward = camera.forward();
        let right = forward.cross(&camera.up).try_normalize(1e-6).unwrap_or_else(Vector3::x);
        let up = right.cross(&forward);
        let shift = (right * -dx + up * dy) * distance * self.pan_speed;
        camera.position += shift;
        camera.target += shift;
    }
}
