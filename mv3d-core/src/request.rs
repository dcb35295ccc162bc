/// Viewer inputs supplied by the host and the load state it observes
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// A plain `{x, y, z}` triple as supplied by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3Config {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3Config {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_point(self) -> Point3<f32> {
        Point3::new(self.x, self.y, self.z)
    }

    pub fn to_vector(self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }
}

/// Everything the host asks the viewer to show. A new request replaces the
/// previous one in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerRequest {
    pub asset_url: String,
    #[serde(default)]
    pub format_hint: Option<String>,
    #[serde(default, alias = "backgroundColor")]
    pub clear_color: Option<String>,
    #[serde(default)]
    pub initial_camera_position: Option<Vec3Config>,
    #[serde(default)]
    pub initial_camera_rotation: Option<Vec3Config>,
    #[serde(default = "default_gizmo_enabled")]
    pub gizmo_enabled: bool,
}

fn default_gizmo_enabled() -> bool {
    true
}

impl ViewerRequest {
    pub fn new(asset_url: impl Into<String>) -> Self {
        Self {
            asset_url: asset_url.into(),
            format_hint: None,
            clear_color: None,
            initial_camera_position: None,
            initial_camera_rotation: None,
            gizmo_enabled: true,
        }
    }

    /// The clear colour, if one was given and it parses
    pub fn clear_color(&self) -> Option<Rgb> {
        let raw = self.clear_color.as_deref()?;
        match raw.parse() {
            Ok(color) => Some(color),
            Err(e) => {
                tracing::warn!("ignoring clear colour: {}", e);
                None
            }
        }
    }
}

/// Progress of the current load cycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading(String),
    Loaded,
    Failed(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_host_json() {
        let json = r##"{
            "assetUrl": "models/chair.obj",
            "backgroundColor": "#202020",
            "initialCameraPosition": {"x": 10, "y": 20, "z": 30}
        }"##;
        let request: ViewerRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.asset_url, "models/chair.obj");
        assert_eq!(request.format_hint, None);
        assert_eq!(request.clear_color(), Some(Rgb::from_hex(0x202020)));
        assert_eq!(request.initial_camera_position, Some(Vec3Config::new(10.0, 20.0, 30.0)));
        assert!(request.initial_camera_rotation.is_none());
        assert!(request.gizmo_enabled);
    }

    #[test]
    fn test_request_from_toml() {
        let request: ViewerRequest = toml::from_str(
            r#"
            assetUrl = "robot.bin"
            formatHint = "fbx"
            gizmoEnabled = false
            "#,
        )
        .unwrap();
        assert_eq!(request.format_hint.as_deref(), Some("fbx"));
        assert!(!request.gizmo_enabled);
    }

    #[test]
    fn test_bad_clear_color_is_ignored() {
        let mut request = ViewerRequest::new("a.obj");
        request.clear_color = Some("not a colour".into());
        assert_eq!(request.clear_color(), None);
    }

    #[test]
    fn test_only_loading_reports_loading() {
        assert!(LoadState::Loading("MATERIALS".into()).is_loading());
        assert!(!LoadState::Idle.is_loading());
        assert!(!LoadState::Loaded.is_loading());
        assert!(!LoadState::Failed("boom".into()).is_loading());
    }
}
