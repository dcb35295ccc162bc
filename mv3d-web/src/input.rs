/// Pointer handling: drag to orbit, Shift+drag to move the gizmo
use nalgebra::Vector3;

use mv3d_core::GizmoMode;

/// World units per pixel when translating
const TRANSLATE_PER_PIXEL: f32 = 1.0;
/// Radians per pixel when rotating
const ROTATE_PER_PIXEL: f32 = 0.01;
/// Scale factor change per pixel
const SCALE_PER_PIXEL: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerAction {
    Orbit { dx: f32, dy: f32 },
    DragGizmo(Vector3<f32>),
}

#[derive(Debug, Default)]
pub struct PointerState {
    last: Option<(f32, f32)>,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.last.is_some()
    }

    pub fn press(&mut self, x: f32, y: f32) {
        self.last = Some((x, y));
    }

    pub fn release(&mut self) {
        self.last = None;
    }

    /// Movement while a button is held. `gizmo` is the active gizmo mode,
    /// if a gizmo exists; without one Shift+drag orbits like a plain drag.
    pub fn move_to(&mut self, x: f32, y: f32, shift: bool, gizmo: Option<GizmoMode>) -> Option<PointerAction> {
        let (last_x, last_y) = self.last?;
        self.last = Some((x, y));
        let (dx, dy) = (x - last_x, y - last_y);
        if dx == 0.0 && dy == 0.0 {
            return None;
        }

        // Screen y grows downwards
        let action = match (shift, gizmo) {
            (true, Some(GizmoMode::Translate)) => {
                PointerAction::DragGizmo(Vector3::new(dx, -dy, 0.0) * TRANSLATE_PER_PIXEL)
            }
            (true, Some(GizmoMode::Rotate)) => PointerAction::DragGizmo(Vector3::new(dy, dx, 0.0) * ROTATE_PER_PIXEL),
            (true, Some(GizmoMode::Scale)) => {
                PointerAction::DragGizmo(Vector3::new(dx, -dy, 0.0) * SCALE_PER_PIXEL)
            }
            _ => PointerAction::Orbit { dx, dy },
        };
        Some(action)
    }
}

/// Wheel delta to zoom notches; scrolling up zooms in
pub fn wheel_zoom(delta_y: f64) -> f32 {
    if delta_y == 0.0 {
        0.0
    } else {
        -(delta_y.signum() as f32)
    }
}
