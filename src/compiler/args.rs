//! Command-line construction for the compile and post-process stages.

use std::path::{Path, PathBuf};

use super::StageSpec;
use crate::config::BuildConfig;

/// Suffix of the intermediate artifact handed from the compiler to the
/// post-processor.
pub const INTERMEDIATE_SUFFIX: &str = ".dist";

/// Options forwarded to the stylesheet compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOptions {
    /// Extra directories searched for imports.
    pub include_paths: Vec<PathBuf>,
    /// Custom importer module.
    pub importer: Option<PathBuf>,
}

/// A stylesheet to compile and where to write it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileTarget {
    source: PathBuf,
    output: PathBuf,
    plugin_options: PluginOptions,
}

impl CompileTarget {
    /// Create a target. When `output` is an existing directory the file name
    /// is derived from the source: `<output>/<source stem>.css`.
    #[must_use]
    pub fn new(
        source: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        plugin_options: PluginOptions,
    ) -> Self {
        let source = source.into();
        let mut output = output.into();

        if output.is_dir() {
            let stem = source
                .file_stem()
                .map_or_else(|| "app".into(), |s| s.to_string_lossy().into_owned());
            output = output.join(format!("{stem}.css"));
        }

        Self {
            source,
            output,
            plugin_options,
        }
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Final artifact path.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    #[must_use]
    pub fn plugin_options(&self) -> &PluginOptions {
        &self.plugin_options
    }

    /// The `.dist` sibling of the final artifact.
    #[must_use]
    pub fn intermediate(&self) -> PathBuf {
        let mut path = self.output.clone().into_os_string();
        path.push(INTERMEDIATE_SUFFIX);
        PathBuf::from(path)
    }
}

/// Builds the stage invocations for one target under one configuration.
#[derive(Debug, Clone)]
pub struct CommandSet {
    target: CompileTarget,
    config: BuildConfig,
    root: PathBuf,
}

impl CommandSet {
    /// Create a command set whose tool paths resolve against `root`.
    #[must_use]
    pub fn new(target: CompileTarget, config: BuildConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            target,
            config,
            root: root.into(),
        }
    }

    /// Create a command set rooted at the current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be determined.
    pub fn from_cwd(target: CompileTarget, config: BuildConfig) -> std::io::Result<Self> {
        Ok(Self::new(target, config, std::env::current_dir()?))
    }

    #[must_use]
    pub fn target(&self) -> &CompileTarget {
        &self.target
    }

    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Whether a post-process stage follows the compiler.
    #[must_use]
    pub fn has_post_process(&self) -> bool {
        self.config.autoprefixer.enabled
    }

    /// The intermediate artifact, present only with a post-process stage.
    #[must_use]
    pub fn intermediate(&self) -> Option<PathBuf> {
        self.has_post_process().then(|| self.target.intermediate())
    }

    /// Where the compiler writes: the intermediate artifact when a
    /// post-process stage follows, the final artifact otherwise.
    #[must_use]
    pub fn compile_output(&self) -> PathBuf {
        self.intermediate()
            .unwrap_or_else(|| self.target.output.clone())
    }

    fn tool(&self, name: &str) -> PathBuf {
        self.root.join(&self.config.tools.bin_dir).join(name)
    }

    /// Compiler invocation.
    #[must_use]
    pub fn compile(&self, watch: bool) -> StageSpec {
        let mut args = vec![
            self.target.source.to_string_lossy().into_owned(),
            self.compile_output().to_string_lossy().into_owned(),
            format!("--precision={}", self.config.tools.precision),
            format!("--output-style={}", self.config.output_style()),
        ];

        if watch {
            args.push("--watch".to_string());
        }

        for path in &self.target.plugin_options.include_paths {
            args.push(format!("--include-path={}", path.display()));
        }

        if let Some(importer) = &self.target.plugin_options.importer {
            args.push("--importer".to_string());
            args.push(importer.to_string_lossy().into_owned());
        }

        if self.config.embeds_source_maps() {
            args.push("--source-map-embed".to_string());
        }

        StageSpec::new(self.tool(&self.config.tools.compiler), args)
            .through_shell(self.config.tools.use_shell)
    }

    /// Post-processor invocation, if one is configured.
    ///
    /// A watching post-processor polls, since it cannot share the
    /// compiler's native filesystem watch.
    #[must_use]
    pub fn post_process(&self, watch: bool) -> Option<StageSpec> {
        let intermediate = self.intermediate()?;

        let mut args = vec![
            intermediate.to_string_lossy().into_owned(),
            "-o".to_string(),
            self.target.output.to_string_lossy().into_owned(),
            "--config".to_string(),
            self.root
                .join(&self.config.tools.postcss_config)
                .to_string_lossy()
                .into_owned(),
            "--verbose".to_string(),
        ];

        if watch {
            args.push("--watch".to_string());
            args.push("--poll".to_string());
        }

        Some(
            StageSpec::new(self.tool(&self.config.tools.post_processor), args)
                .through_shell(self.config.tools.use_shell),
        )
    }
}
