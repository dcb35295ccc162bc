/// Camera and projection utilities
use nalgebra::{Isometry3, Matrix4, Point3, Rotation3, Translation3, UnitQuaternion, Vector3, Vector4};

use crate::transform::RotationState;

/// Position, orientation and look-at target of the camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Point3<f32>,
    pub rotation: RotationState,
    pub target: Point3<f32>,
}

/// A point projected into screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    /// Normalized device depth, -1 at the near plane and 1 at the far plane
    pub depth: f32,
}

/// Camera configuration for 3D rendering
///
/// Orientation is stored as Euler angles (applied X, then Y, then Z) so that
/// hosts can set it verbatim; `look_at` recomputes it from a target.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub rotation: RotationState,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 250.0),
            rotation: RotationState::zero(),
            target: Point3::origin(),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            aspect: aspect_ratio(width, height),
            near: 1.0,
            far: 2000.0,
        }
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            rotation: self.rotation,
            target: self.target,
        }
    }

    /// Recompute the aspect ratio after the render surface changed size
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    /// Orient the camera so that it faces `target`
    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;

        let backward = self.position - target;
        if backward.norm_squared() < 1e-12 {
            return;
        }

        // Looking straight along the up vector is degenerate for face_towards
        let up = if backward.cross(&self.up).norm_squared() < 1e-12 {
            Vector3::new(0.0, 0.0, -1.0)
        } else {
            self.up
        };

        let rotation = Rotation3::face_towards(&backward, &up);
        let (roll, pitch, yaw) = rotation.euler_angles();
        self.rotation = RotationState::new(roll, pitch, yaw);
    }

    /// Direction the camera is facing
    pub fn forward(&self) -> Vector3<f32> {
        self.orientation() * Vector3::new(0.0, 0.0, -1.0)
    }

    fn orientation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_euler_angles(self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        let world = Isometry3::from_parts(Translation3::from(self.position.coords), self.orientation());
        world.inverse().to_homogeneous()
    }

    /// Create the perspective projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a 3D point to 2D screen space
    ///
    /// Points behind the camera yield `None`; points outside the viewport
    /// are still returned so callers can clip edges themselves.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        mvp: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<ScreenPoint> {
        let projected = clip_to_screen(&(mvp * point.to_homogeneous()), width, height)?;
        (-1.0..=1.0).contains(&projected.depth).then_some(projected)
    }

    /// Project a line segment, clipping the part that lies behind the near plane
    pub fn project_segment(
        &self,
        from: &Point3<f32>,
        to: &Point3<f32>,
        mvp: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(ScreenPoint, ScreenPoint)> {
        let mut a = mvp * from.to_homogeneous();
        let mut b = mvp * to.to_homogeneous();

        // z + w is the signed distance to the near plane in clip space
        let da = a.z + a.w;
        let db = b.z + b.w;
        if da < 0.0 && db < 0.0 {
            return None;
        }
        if da < 0.0 {
            a += (b - a) * (da / (da - db));
        } else if db < 0.0 {
            b += (a - b) * (db / (db - da));
        }

        Some((clip_to_screen(&a, width, height)?, clip_to_screen(&b, width, height)?))
    }
}

fn clip_to_screen(clip: &Vector4<f32>, width: u32, height: u32) -> Option<ScreenPoint> {
    // Prevent division by near-zero depth values
    if clip.w < 1e-6 {
        return None;
    }

    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    Some(ScreenPoint {
        x: (ndc_x + 1.0) * 0.5 * width as f32,
        y: (1.0 - ndc_y) * 0.5 * height as f32,
        depth: clip.z / clip.w,
    })
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert!((camera.fov - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert_eq!(camera.position, Point3::new(0.0, 0.0, 250.0));
    }

    #[test]
    fn test_zero_height_viewport_does_not_divide_by_zero() {
        let mut camera = Camera::default();
        camera.set_viewport(640, 0);
        assert!(camera.aspect.is_finite());
    }

    #[test]
    fn test_default_pose_sees_origin_at_center() {
        let camera = Camera::new(100, 100);
        let mvp = camera.view_projection();
        let p = camera.project_to_screen(&Point3::origin(), &mvp, 100, 100).unwrap();
        assert!((p.x - 50.0).abs() < 1e-3);
        assert!((p.y - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_look_at_faces_target() {
        let mut camera = Camera::default();
        camera.position = Point3::new(10.0, 20.0, 30.0);
        camera.look_at(Point3::origin());

        let expected = (Point3::origin() - camera.position).normalize();
        assert!((camera.forward() - expected).norm() < 1e-4);

        let mvp = camera.view_projection();
        let p = camera.project_to_screen(&Point3::origin(), &mvp, 200, 100).unwrap();
        assert!((p.x - 100.0).abs() < 1e-2);
        assert!((p.y - 50.0).abs() < 1e-2);
    }

    #[test]
    fn test_look_at_straight_down() {
        let mut camera = Camera::default();
        camera.position = Point3::new(0.0, 100.0, 0.0);
        camera.look_at(Point3::origin());
        assert!((camera.forward() - Vector3::new(0.0, -1.0, 0.0)).norm() < 1e-4);
    }

    #[test]
    fn test_point_behind_camera_is_culled() {
        let camera = Camera::default();
        let mvp = camera.view_projection();
        assert!(camera
            .project_to_screen(&Point3::new(0.0, 0.0, 400.0), &mvp, 100, 100)
            .is_none());
    }

    #[test]
    fn test_segment_crossing_the_camera_is_clipped() {
        let camera = Camera::new(100, 100);
        let mvp = camera.view_projection();
        let (a, b) = camera
            .project_segment(&Point3::origin(), &Point3::new(0.0, 0.0, 500.0), &mvp, 100, 100)
            .unwrap();
        assert!((a.x - 50.0).abs() < 1e-3);
        assert!((b.depth + 1.0).abs() < 1e-3);

        let behind = camera.project_segment(
            &Point3::new(0.0, 0.0, 300.0),
            &Point3::new(10.0, 0.0, 400.0),
            &mvp,
            100,
            100,
        );
        assert!(behind.is_none());
    }
}
