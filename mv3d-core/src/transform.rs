/// 3D transformation matrices, Euler rotation state and object placement
use nalgebra::{Matrix4, Vector3};

/// Rotation state around three axes (in radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }

    pub fn as_vector(&self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Vector3<f32>> for RotationState {
    fn from(v: Vector3<f32>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a rotation matrix from a rotation state
    pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(rotation.x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, rotation.y, 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, rotation.z));

        // Apply rotations in order: X, then Y, then Z
        rz * ry * rx
    }

    pub fn translation_matrix(offset: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new_translation(offset)
    }

    pub fn scale_matrix(scale: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(scale)
    }
}

/// Placement of a scene object, edited by the manipulation gizmo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectTransform {
    pub translation: Vector3<f32>,
    pub rotation: RotationState,
    pub scale: Vector3<f32>,
}

impl ObjectTransform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: RotationState::zero(),
            scale: Vector3::repeat(1.0),
        }
    }

    /// Translation * rotation * scale
    pub fn model_matrix(&self) -> Matrix4<f32> {
        Transform::translation_matrix(&self.translation)
            * Transform::rotation_matrix(&self.rotation)
            * Transform::scale_matrix(&self.scale)
    }
}

impl Default for ObjectTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_rotation_state() {
        let mut state = RotationState::zero();
        assert_eq!(state.x, 0.0);
        assert_eq!(state.y, 0.0);
        assert_eq!(state.z, 0.0);

        state.rotate(0.1, 0.2, 0.3);
        assert!((state.x - 0.1).abs() < 1e-6);
        assert!((state.y - 0.2).abs() < 1e-6);
        assert!((state.z - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_identity_rotation() {
        let rotation = RotationState::zero();
        let matrix = Transform::rotation_matrix(&rotation);
        assert!((matrix - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_object_transform_applies_scale_before_translation() {
        let transform = ObjectTransform {
            translation: Vector3::new(10.0, 0.0, 0.0),
            rotation: RotationState::zero(),
            scale: Vector3::new(2.0, 2.0, 2.0),
        };
        let p = transform.model_matrix().transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert!((p - Point3::new(12.0, 2.0, 2.0)).norm() < 1e-5);
    }

    #[test]
    fn test_quarter_turn_about_y() {
        let transform = ObjectTransform {
            rotation: RotationState::new(0.0, std::f32::consts::FRAC_PI_2, 0.0),
            ..ObjectTransform::identity()
        };
        let p = transform.model_matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((p - Point3::new(0.0, 0.0, -1.0)).norm() < 1e-5);
    }
}
