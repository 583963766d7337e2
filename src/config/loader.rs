//! Build configuration discovery.
//!
//! An explicit `--config` file must exist. Without one, the project file
//! (`.standalone-sass.toml`) wins over the per-user file, and a build with
//! neither runs on defaults.

use std::path::{Path, PathBuf};

use super::BuildConfig;

const PROJECT_FILE: &str = ".standalone-sass.toml";
const USER_DIR: &str = "standalone-sass";
const USER_FILE: &str = "config.toml";

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named on the command line.
    Explicit(PathBuf),
    /// Found in the project directory or the user config directory.
    Discovered(PathBuf),
    /// No file; built-in defaults.
    Defaults,
}

/// Resolves and reads the build configuration.
#[derive(Debug)]
pub struct ConfigLoader {
    explicit: Option<PathBuf>,
    candidates: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Discover configuration relative to the current directory.
    #[must_use]
    pub fn new() -> Self {
        Self::discover_in(Path::new("."))
    }

    /// Discover configuration for a project rooted at `root`.
    #[must_use]
    pub fn discover_in(root: &Path) -> Self {
        let mut candidates = vec![root.join(PROJECT_FILE)];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join(USER_DIR).join(USER_FILE));
        }
        Self {
            explicit: None,
            candidates,
        }
    }

    /// Load exactly `path`; a missing file is an error.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            explicit: Some(path),
            candidates: Vec::new(),
        }
    }

    /// Which file `load` would read.
    #[must_use]
    pub fn resolve(&self) -> ConfigSource {
        if let Some(path) = &self.explicit {
            return ConfigSource::Explicit(path.clone());
        }
        self.candidates
            .iter()
            .find(|path| path.is_file())
            .map_or(ConfigSource::Defaults, |path| {
                ConfigSource::Discovered(path.clone())
            })
    }

    /// Read and parse the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] when the file cannot be read
    /// (including an explicit path that does not exist) and
    /// [`ConfigError::ParseError`] when it is not valid TOML for
    /// [`BuildConfig`].
    pub fn load(&self) -> Result<(BuildConfig, ConfigSource), ConfigError> {
        let source = self.resolve();
        let config = match &source {
            ConfigSource::Explicit(path) | ConfigSource::Discovered(path) => {
                tracing::debug!(path = %path.display(), "Loading config file");
                read_config(path)?
            }
            ConfigSource::Defaults => {
                tracing::debug!(candidates = ?self.candidates, "No config file found, using defaults");
                BuildConfig::default()
            }
        };
        Ok((config, source))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_config(path: &Path) -> Result<BuildConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}
