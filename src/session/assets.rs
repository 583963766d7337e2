//! Registry of produced output paths.

use std::path::{Path, PathBuf};

/// Records the output paths a build produces.
pub trait AssetRegistry {
    fn register(&mut self, path: &Path);
}

/// In-memory asset registry that can be written out as a JSON manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    assets: Vec<PathBuf>,
}

impl AssetManifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered paths, in registration order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.assets
    }

    /// Serialize the registered paths as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.assets)
    }

    /// Write the manifest to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl AssetRegistry for AssetManifest {
    fn register(&mut self, path: &Path) {
        if !self.assets.iter().any(|p| p == path) {
            tracing::debug!(path = %path.display(), "Registered asset");
            self.assets.push(path.to_path_buf());
        }
    }
}
