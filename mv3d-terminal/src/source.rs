/// Filesystem asset source
use std::io::ErrorKind;
use std::path::PathBuf;

use mv3d_core::{AssetSource, FetchCallback, FetchError};
use tracing::debug;

/// Reads asset "URLs" as paths, relative to `root` when one is set
#[derive(Debug, Clone, Default)]
pub struct FsSource {
    root: Option<PathBuf>,
}

impl FsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = url.strip_prefix("file://").unwrap_or(url);
        match &self.root {
            Some(root) => root.join(path),
            None => PathBuf::from(path),
        }
    }

    pub fn read(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(url);
        debug!("reading {}", path.display());
        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::NotFound { url: url.to_string() },
            _ => FetchError::Failed {
                url: url.to_string(),
                reason: e.to_string(),
            },
        })
    }
}

impl AssetSource for FsSource {
    /// Completes before returning; the viewer still applies the result on its next tick
    fn fetch(&self, url: &str, on_done: FetchCallback) {
        on_done(self.read(url));
    }
}
