/// Manipulation gizmo: translate/rotate/scale handles for the primary object
use nalgebra::{Point3, Vector3};

use crate::projection::Camera;
use crate::scene::NodeId;
use crate::transform::{ObjectTransform, Transform};

/// Translation snap increment in world units while snapping is held
pub const TRANSLATION_SNAP: f32 = 100.0;
/// Rotation snap increment while snapping is held
pub const ROTATION_SNAP_DEGREES: f32 = 15.0;
/// Visual size change per grow/shrink command
pub const SIZE_STEP: f32 = 0.1;
pub const MIN_SIZE: f32 = 0.1;
/// Handle length relative to the camera distance at size 1.0
const HANDLE_SCALE: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoMode {
    Translate,
    Rotate,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoSpace {
    Local,
    World,
}

impl GizmoSpace {
    pub fn toggled(self) -> Self {
        match self {
            GizmoSpace::Local => GizmoSpace::World,
            GizmoSpace::World => GizmoSpace::Local,
        }
    }
}

/// Commands issued from the keyboard table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoCommand {
    SetMode(GizmoMode),
    ToggleSpace,
    EnableSnap,
    DisableSnap,
    Grow,
    Shrink,
}

/// Fired when a drag changed the attached object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoEvent {
    Changed,
}

/// What a renderer needs to draw the handles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoView {
    pub origin: Point3<f32>,
    /// Unit axes of the handles (object axes in local space)
    pub axes: [Vector3<f32>; 3],
    pub length: f32,
    pub mode: GizmoMode,
}

/// Operations the viewer needs from a gizmo
pub trait ManipulationGizmo {
    fn attach(&mut self, node: NodeId);
    fn detach(&mut self);
    fn attached(&self) -> Option<NodeId>;
    fn mode(&self) -> GizmoMode;

    /// Scene node holding the handles, if added
    fn visual(&self) -> Option<NodeId>;
    fn set_visual(&mut self, node: Option<NodeId>);

    /// Per-frame refresh against the camera and attached object
    fn update(&mut self, camera: &Camera, target: Option<&ObjectTransform>);
    fn view(&self) -> Option<GizmoView>;

    fn apply(&mut self, command: GizmoCommand);

    /// Apply a drag to the attached object
    fn drag(&mut self, target: &mut ObjectTransform, delta: Vector3<f32>) -> Option<GizmoEvent>;
}

/// Default gizmo, modelled on editor transform controls
#[derive(Debug, Clone)]
pub struct TransformGizmo {
    pub mode: GizmoMode,
    pub space: GizmoSpace,
    pub size: f32,
    pub translation_snap: Option<f32>,
    pub rotation_snap: Option<f32>,
    attached: Option<NodeId>,
    visual: Option<NodeId>,
    view: Option<GizmoView>,
}

impl TransformGizmo {
    pub fn new() -> Self {
        Self {
            mode: GizmoMode::Translate,
            space: GizmoSpace::World,
            size: 1.0,
            translation_snap: None,
            rotation_snap: None,
            attached: None,
            visual: None,
            view: None,
        }
    }
}

impl Default for TransformGizmo {
    fn default() -> Self {
        Self::new()
    }
}

fn snap(value: f32, increment: Option<f32>) -> f32 {
    match increment {
        Some(step) if step > 0.0 => (value / step).round() * step,
        _ => value,
    }
}

impl ManipulationGizmo for TransformGizmo {
    fn attach(&mut self, node: NodeId) {
        self.attached = Some(node);
    }

    fn detach(&mut self) {
        self.attached = None;
        self.visual = None;
        self.view = None;
    }

    fn attached(&self) -> Option<NodeId> {
        self.attached
    }

    fn mode(&self) -> GizmoMode {
        self.mode
    }

    fn visual(&self) -> Option<NodeId> {
        self.visual
    }

    fn set_visual(&mut self, node: Option<NodeId>) {
        self.visual = node;
    }

    fn update(&mut self, camera: &Camera, target: Option<&ObjectTransform>) {
        self.view = match (self.attached, target) {
            (Some(_), Some(target)) => {
                let origin = Point3::from(target.translation);
                let axes = match self.space {
                    GizmoSpace::World => [Vector3::x(), Vector3::y(), Vector3::z()],
                    GizmoSpace::Local => {
                        let rotation = Transform::rotation_matrix(&target.rotation);
                        [Vector3::x(), Vector3::y(), Vector3::z()].map(|a| rotation.transform_vector(&a))
                    }
                };
                let distance = (camera.position - origin).norm();
                Some(GizmoView {
                    origin,
                    axes,
                    length: distance * HANDLE_SCALE * self.size,
                    mode: self.mode,
                })
            }
            _ => None,
        };
    }

    fn view(&self) -> Option<GizmoView> {
        self.view
    }

    fn apply(&mut self, command: GizmoCommand) {
        match command {
            GizmoCommand::SetMode(mode) => self.mode = mode,
            GizmoCommand::ToggleSpace => self.space = self.space.toggled(),
            GizmoCommand::EnableSnap => {
                self.translation_snap = Some(TRANSLATION_SNAP);
                self.rotation_snap = Some(ROTATION_SNAP_DEGREES.to_radians());
            }
            GizmoCommand::DisableSnap => {
                self.translation_snap = None;
                self.rotation_snap = None;
            }
            GizmoCommand::Grow => self.size += SIZE_STEP,
            GizmoCommand::Shrink => self.size = (self.size - SIZE_STEP).max(MIN_SIZE),
        }
    }

    fn drag(&mut self, target: &mut ObjectTransform, delta: Vector3<f32>) -> Option<GizmoEvent> {
        self.attached?;
        if delta.norm_squared() == 0.0 {
            return None;
        }

        let before = *target;
        match self.mode {
            GizmoMode::Translate => {
                let delta = match self.space {
                    GizmoSpace::World => delta,
                    GizmoSpace::Local => Transform::rotation_matrix(&target.rotation).transform_vector(&delta),
                };
                target.translation = (target.translation + delta).map(|c| snap(c, self.translation_snap));
            }
            GizmoMode::Rotate => {
                target.rotation.rotate(delta.x, delta.y, delta.z);
                target.rotation.x = snap(target.rotation.x, self.rotation_snap);
                target.rotation.y = snap(target.rotation.y, self.rotation_snap);
                target.rotation.z = snap(target.rotation.z, self.rotation_snap);
            }
            GizmoMode::Scale => {
                // Scale never collapses or mirrors the object
                target.scale = (target.scale + delta).map(|c| c.max(0.001));
            }
        }

        (*target != before).then_some(GizmoEvent::Changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attached() -> TransformGizmo {
        let mut gizmo = TransformGizmo::new();
        gizmo.attach(7);
        gizmo
    }

    #[test]
    fn test_size_has_a_floor() {
        let mut gizmo = TransformGizmo::new();
        for _ in 0..20 {
            gizmo.apply(GizmoCommand::Shrink);
        }
        assert!((gizmo.size - MIN_SIZE).abs() < 1e-6);
        gizmo.apply(GizmoCommand::Grow);
        assert!((gizmo.size - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_snap_toggle() {
        let mut gizmo = TransformGizmo::new();
        gizmo.apply(GizmoCommand::EnableSnap);
        assert_eq!(gizmo.translation_snap, Some(100.0));
        assert!((gizmo.rotation_snap.unwrap() - 15f32.to_radians()).abs() < 1e-6);
        gizmo.apply(GizmoCommand::DisableSnap);
        assert_eq!(gizmo.translation_snap, None);
        assert_eq!(gizmo.rotation_snap, None);
    }

    #[test]
    fn test_space_toggle() {
        let mut gizmo = TransformGizmo::new();
        gizmo.apply(GizmoCommand::ToggleSpace);
        assert_eq!(gizmo.space, GizmoSpace::Local);
        gizmo.apply(GizmoCommand::ToggleSpace);
        assert_eq!(gizmo.space, GizmoSpace::World);
    }

    #[test]
    fn test_translate_drag_with_snap() {
        let mut gizmo = attached();
        let mut target = ObjectTransform::identity();
        assert_eq!(gizmo.drag(&mut target, Vector3::new(30.0, 0.0, 0.0)), Some(GizmoEvent::Changed));
        assert_eq!(target.translation, Vector3::new(30.0, 0.0, 0.0));

        gizmo.apply(GizmoCommand::EnableSnap);
        gizmo.drag(&mut target, Vector3::new(40.0, 0.0, 0.0));
        assert_eq!(target.translation, Vector3::new(100.0, 0.0, 0.0));

        // Snapping back to the same increment is not a change
        assert_eq!(gizmo.drag(&mut target, Vector3::new(10.0, 0.0, 0.0)), None);
    }

    #[test]
    fn test_rotate_and_scale_modes() {
        let mut gizmo = attached();
        let mut target = ObjectTransform::identity();

        gizmo.apply(GizmoCommand::SetMode(GizmoMode::Rotate));
        gizmo.drag(&mut target, Vector3::new(0.0, 0.5, 0.0));
        assert!((target.rotation.y - 0.5).abs() < 1e-6);

        gizmo.apply(GizmoCommand::SetMode(GizmoMode::Scale));
        gizmo.drag(&mut target, Vector3::new(-5.0, 1.0, 0.0));
        assert!((target.scale.x - 0.001).abs() < 1e-6);
        assert!((target.scale.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_detached_gizmo_ignores_drags() {
        let mut gizmo = TransformGizmo::new();
        let mut target = ObjectTransform::identity();
        assert_eq!(gizmo.drag(&mut target, Vector3::new(1.0, 0.0, 0.0)), None);
        assert_eq!(target, ObjectTransform::identity());
    }

    #[test]
    fn test_update_scales_handles_with_camera_distance() {
        let mut gizmo = attached();
        let camera = Camera::default();
        let target = ObjectTransform::identity();
        gizmo.update(&camera, Some(&target));
        let view = gizmo.view().unwrap();
        assert!((view.length - 250.0 * HANDLE_SCALE).abs() < 1e-3);

        gizmo.detach();
        gizmo.update(&camera, Some(&target));
        assert!(gizmo.view().is_none());
    }
}
