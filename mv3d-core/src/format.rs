/// Asset format resolution from hints and URLs
use std::fmt;

/// Supported asset formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFormat {
    /// Wavefront OBJ with an optional companion MTL library
    Obj,
    /// Autodesk FBX (binary), may carry animation clips
    Fbx,
}

impl AssetFormat {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "obj" => Some(AssetFormat::Obj),
            "fbx" => Some(AssetFormat::Fbx),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            AssetFormat::Obj => "OBJ",
            AssetFormat::Fbx => "FBX",
        }
    }

    /// Whether loaded objects of this format play their first clip
    pub fn is_animated(&self) -> bool {
        matches!(self, AssetFormat::Fbx)
    }
}

impl fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Lower-cased text after the final `.` of the URL, or the whole URL
/// lower-cased when it has no `.`
pub fn file_extension(url: &str) -> String {
    url.rsplit('.').next().unwrap_or(url).to_lowercase()
}

/// The format tag to use: the explicit hint when present, else the suffix
pub fn resolve_tag(hint: Option<&str>, url: &str) -> String {
    match hint {
        Some(hint) if !hint.trim().is_empty() => hint.trim().to_lowercase(),
        _ => file_extension(url),
    }
}

pub fn resolve_format(hint: Option<&str>, url: &str) -> Option<AssetFormat> {
    AssetFormat::from_tag(&resolve_tag(hint, url))
}

/// URL of the material library that accompanies an OBJ asset
pub fn materials_url(url: &str) -> String {
    match url.rfind('.') {
        Some(dot) if !url[dot..].contains('/') => format!("{}.mtl", &url[..dot]),
        _ => format!("{}.mtl", url),
    }
}
