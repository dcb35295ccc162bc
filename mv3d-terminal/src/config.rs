use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use mv3d_core::{Rgb, Vec3Config, ViewerRequest};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "mv3d-terminal")]
#[command(about = "Terminal model viewer for OBJ and FBX assets")]
#[command(version)]
pub struct Cli {
    /// Asset path (OBJ or FBX)
    pub asset: Option<String>,

    /// Format tag overriding the file extension
    #[arg(long, env = "MV3D_FORMAT")]
    pub format: Option<String>,

    /// Background colour, e.g. #202020
    #[arg(long, alias = "background-color")]
    pub clear_color: Option<String>,

    /// Initial camera position as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    pub camera_position: Option<Vec3Config>,

    /// Initial camera rotation in radians as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    pub camera_rotation: Option<Vec3Config>,

    /// Do not attach the manipulation gizmo
    #[arg(long)]
    pub no_gizmo: bool,

    /// Viewer configuration file (TOML)
    #[arg(short, long, env = "MV3D_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log file path
    #[arg(long, env = "MV3D_LOG_FILE", default_value = "mv3d-terminal.log")]
    pub log_file: PathBuf,

    /// Log level
    #[arg(long, env = "MV3D_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Viewer settings as written in a config file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub asset_url: Option<String>,
    pub format_hint: Option<String>,
    #[serde(alias = "backgroundColor")]
    pub clear_color: Option<String>,
    pub initial_camera_position: Option<Vec3Config>,
    pub initial_camera_rotation: Option<Vec3Config>,
    pub gizmo_enabled: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text).context("Failed to parse config file")
    }
}

impl Cli {
    /// Build the viewer request from the config file, then override with flags
    pub fn request(&self) -> Result<ViewerRequest> {
        let file = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        self.merge(file)
    }

    fn merge(&self, file: ConfigFile) -> Result<ViewerRequest> {
        let Some(asset_url) = self.asset.clone().or(file.asset_url) else {
            bail!("no asset given; pass a path or set assetUrl in the config file");
        };

        let mut request = ViewerRequest::new(asset_url);
        request.format_hint = self.format.clone().or(file.format_hint);
        request.clear_color = self.clear_color.clone().or(file.clear_color);
        request.initial_camera_position = self.camera_position.or(file.initial_camera_position);
        request.initial_camera_rotation = self.camera_rotation.or(file.initial_camera_rotation);
        request.gizmo_enabled = !self.no_gizmo && file.gizmo_enabled.unwrap_or(true);

        validate(&request)?;
        Ok(request)
    }
}

fn validate(request: &ViewerRequest) -> Result<()> {
    if let Some(color) = &request.clear_color {
        color
            .parse::<Rgb>()
            .with_context(|| format!("invalid clear colour '{}'", color))?;
    }
    Ok(())
}

/// Parse `x,y,z`
fn parse_vec3(s: &str) -> Result<Vec3Config, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| format!("'{}': {}", p.trim(), e)))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vec3Config::new(*x, *y, *z)),
        _ => Err(format!("expected x,y,z but got {} components", parts.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mv3d-terminal").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_build_request() {
        let request = cli(&[
            "model.obj",
            "--camera-position",
            "10,20,30",
            "--camera-rotation",
            "-0.5,0,0",
            "--no-gizmo",
        ])
        .request()
        .unwrap();

        assert_eq!(request.asset_url, "model.obj");
        assert_eq!(request.initial_camera_position, Some(Vec3Config::new(10.0, 20.0, 30.0)));
        assert_eq!(request.initial_camera_rotation, Some(Vec3Config::new(-0.5, 0.0, 0.0)));
        assert!(!request.gizmo_enabled);
        assert_eq!(request.format_hint, None);
    }

    #[test]
    fn test_flags_override_file() {
        let file: ConfigFile = toml::from_str(
            r##"
            assetUrl = "from-file.fbx"
            backgroundColor = "#101010"
            formatHint = "fbx"
            gizmoEnabled = false

            [initialCameraPosition]
            x = 1.0
            y = 2.0
            z = 3.0
            "##,
        )
        .unwrap();

        let request = cli(&["--clear-color", "#ffffff"]).merge(file).unwrap();
        assert_eq!(request.asset_url, "from-file.fbx");
        assert_eq!(request.clear_color.as_deref(), Some("#ffffff"));
        assert_eq!(request.format_hint.as_deref(), Some("fbx"));
        assert_eq!(request.initial_camera_position, Some(Vec3Config::new(1.0, 2.0, 3.0)));
        assert!(!request.gizmo_enabled);
    }

    #[test]
    fn test_missing_asset_is_an_error() {
        assert!(cli(&[]).merge(ConfigFile::default()).is_err());
    }

    #[test]
    fn test_invalid_clear_color_is_rejected() {
        let err = cli(&["a.obj", "--clear-color", "nope"]).request().unwrap_err();
        assert!(err.to_string().contains("invalid clear colour"));
    }

    #[test]
    fn test_parse_vec3() {
        assert_eq!(parse_vec3("1, 2.5,-3"), Ok(Vec3Config::new(1.0, 2.5, -3.0)));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,x,3").is_err());
    }
}
