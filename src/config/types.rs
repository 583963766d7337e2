//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Autoprefixer (post-process stage) configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutoprefixerConfig {
    /// Run the post-processor after every successful compile.
    pub enabled: bool,
}

impl Default for AutoprefixerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Desktop notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Announce successful recompiles.
    pub on_success: bool,
    /// Announce failed compiles.
    pub on_failure: bool,
    /// Icon attached to every notification.
    pub icon: Option<PathBuf>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            on_success: true,
            on_failure: true,
            icon: None,
        }
    }
}

/// Locations and invocation details of the external tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Local tool installation directory, relative to the working directory.
    pub bin_dir: PathBuf,
    /// Stylesheet compiler executable name.
    pub compiler: String,
    /// Post-processor executable name.
    pub post_processor: String,
    /// Post-processor config file, relative to the working directory.
    pub postcss_config: PathBuf,
    /// Run both tools through the platform shell.
    pub use_shell: bool,
    /// Numeric precision passed to the compiler.
    pub precision: u8,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            bin_dir: PathBuf::from("node_modules/.bin"),
            compiler: "node-sass".to_string(),
            post_processor: "postcss".to_string(),
            postcss_config: PathBuf::from("postcss.config.js"),
            use_shell: true,
            precision: 8,
        }
    }
}

/// Process-wide build configuration.
///
/// Built once before a session starts and passed by value into the
/// session and pipeline; nothing reads it from global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// Build for production (compressed output, no source maps).
    pub production: bool,
    /// Embed source maps outside production.
    pub source_maps: bool,
    pub autoprefixer: AutoprefixerConfig,
    pub notifications: NotificationConfig,
    pub tools: ToolsConfig,
}

impl BuildConfig {
    /// Whether the compiler should embed a source map.
    #[must_use]
    pub fn embeds_source_maps(&self) -> bool {
        self.source_maps && !self.production
    }

    /// Output style flag value for the compiler.
    #[must_use]
    pub fn output_style(&self) -> &'static str {
        if self.production {
            "compressed"
        } else {
            "expanded"
        }
    }
}
