/// Keyboard shortcuts for the manipulation gizmo
use crate::gizmo::{GizmoCommand, GizmoMode};

/// A key as delivered by the host, independent of its event system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Control,
    NumpadAdd,
    NumpadSubtract,
    Other,
}

impl Key {
    /// Map a DOM `keyCode`
    pub fn from_key_code(code: u32) -> Key {
        match code {
            17 => Key::Control,
            107 => Key::NumpadAdd,
            109 => Key::NumpadSubtract,
            187 => Key::Char('='),
            189 => Key::Char('-'),
            65..=90 => char::from_u32(code)
                .map(|c| Key::Char(c.to_ascii_lowercase()))
                .unwrap_or(Key::Other),
            _ => Key::Other,
        }
    }
}

pub fn key_down_command(key: Key) -> Option<GizmoCommand> {
    let command = match key {
        Key::Control => GizmoCommand::EnableSnap,
        Key::NumpadAdd => GizmoCommand::Grow,
        Key::NumpadSubtract => GizmoCommand::Shrink,
        Key::Char(c) => match c.to_ascii_lowercase() {
            'q' => GizmoCommand::ToggleSpace,
            'w' => GizmoCommand::SetMode(GizmoMode::Translate),
            'e' => GizmoCommand::SetMode(GizmoMode::Rotate),
            'r' => GizmoCommand::SetMode(GizmoMode::Scale),
            '+' | '=' => GizmoCommand::Grow,
            '-' | '_' => GizmoCommand::Shrink,
            _ => return None,
        },
        Key::Other => return None,
    };
    Some(command)
}

pub fn key_up_command(key: Key) -> Option<GizmoCommand> {
    match key {
        Key::Control => Some(GizmoCommand::DisableSnap),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dom_key_codes() {
        let table = [
            (81, Some(GizmoCommand::ToggleSpace)),
            (17, Some(GizmoCommand::EnableSnap)),
            (87, Some(GizmoCommand::SetMode(GizmoMode::Translate))),
            (69, Some(GizmoCommand::SetMode(GizmoMode::Rotate))),
            (82, Some(GizmoCommand::SetMode(GizmoMode::Scale))),
            (187, Some(GizmoCommand::Grow)),
            (107, Some(GizmoCommand::Grow)),
            (189, Some(GizmoCommand::Shrink)),
            (109, Some(GizmoCommand::Shrink)),
            (65, None),
            (13, None),
        ];
        for (code, expected) in table {
            assert_eq!(key_down_command(Key::from_key_code(code)), expected, "keyCode {}", code);
        }
    }

    #[test]
    fn test_only_control_has_a_release_action() {
        assert_eq!(key_up_command(Key::Control), Some(GizmoCommand::DisableSnap));
        assert_eq!(key_up_command(Key::Char('w')), None);
        assert_eq!(key_up_command(Key::from_key_code(81)), None);
    }

    #[test]
    fn test_shifted_characters() {
        assert_eq!(key_down_command(Key::Char('+')), Some(GizmoCommand::Grow));
        assert_eq!(key_down_command(Key::Char('_')), Some(GizmoCommand::Shrink));
        assert_eq!(key_down_command(Key::Char('W')), Some(GizmoCommand::SetMode(GizmoMode::Translate)));
    }
}
