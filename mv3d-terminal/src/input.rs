/// Translation of crossterm events into viewer actions
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use mv3d_core::Key;

/// Orbit step per arrow key press, in pointer pixels
const ORBIT_STEP: f32 = 20.0;
/// Zoom step per page key press; positive moves towards the target
const ZOOM_STEP: f32 = 1.0;

/// What an input event asks the app to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    KeyDown(Key),
    KeyUp(Key),
    Orbit { dx: f32, dy: f32 },
    Zoom(f32),
    /// Unit drag direction in screen axes; the app scales it by gizmo mode
    DragGizmo { x: f32, y: f32 },
    Resize { columns: u16, rows: u16 },
}

/// Tracks modifier state across events
///
/// Terminals rarely report a bare Ctrl press, so snapping follows the Ctrl
/// modifier carried by each key event instead.
#[derive(Debug, Default)]
pub struct InputState {
    control_held: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn control_held(&self) -> bool {
        self.control_held
    }

    pub fn translate(&mut self, event: &Event) -> Vec<Action> {
        match event {
            Event::Key(key) => self.translate_key(key),
            Event::Resize(columns, rows) => vec![Action::Resize {
                columns: *columns,
                rows: *rows,
            }],
            _ => Vec::new(),
        }
    }

    fn translate_key(&mut self, event: &KeyEvent) -> Vec<Action> {
        let mut actions = Vec::new();

        let control = event.modifiers.contains(KeyModifiers::CONTROL);
        if control != self.control_held {
            self.control_held = control;
            actions.push(if control {
                Action::KeyDown(Key::Control)
            } else {
                Action::KeyUp(Key::Control)
            });
        }

        if event.kind == KeyEventKind::Release {
            if let KeyCode::Char(c) = event.code {
                actions.push(Action::KeyUp(Key::Char(c)));
            }
            return actions;
        }

        let shift = event.modifiers.contains(KeyModifiers::SHIFT);
        let action = match event.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Char('c') if control => Action::Quit,
            KeyCode::Char(c) => Action::KeyDown(Key::Char(c)),
            KeyCode::Left if shift => Action::DragGizmo { x: -1.0, y: 0.0 },
            KeyCode::Right if shift => Action::DragGizmo { x: 1.0, y: 0.0 },
            KeyCode::Up if shift => Action::DragGizmo { x: 0.0, y: 1.0 },
            KeyCode::Down if shift => Action::DragGizmo { x: 0.0, y: -1.0 },
            KeyCode::Left => Action::Orbit {
                dx: -ORBIT_STEP,
                dy: 0.0,
            },
            KeyCode::Right => Action::Orbit {
                dx: ORBIT_STEP,
                dy: 0.0,
            },
            KeyCode::Up => Action::Orbit {
                dx: 0.0,
                dy: -ORBIT_STEP,
            },
            KeyCode::Down => Action::Orbit {
                dx: 0.0,
                dy: ORBIT_STEP,
            },
            KeyCode::PageUp => Action::Zoom(ZOOM_STEP),
            KeyCode::PageDown => Action::Zoom(-ZOOM_STEP),
            _ => return actions,
        };
        actions.push(action);
        actions
    }
}
