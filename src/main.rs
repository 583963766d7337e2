//! Standalone Sass - supervised stylesheet compilation.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use standalone_sass::compiler::{CompileTarget, PluginOptions};
use standalone_sass::config::{BuildConfig, ConfigLoader};
use standalone_sass::display;
use standalone_sass::session::{
    AssetManifest, CompileSession, DesktopNotifier, SessionResult, WatchMode,
};

#[derive(Parser)]
#[command(
    name = "standalone-sass",
    about = "Compile a Sass entry point outside the bundler, with optional PostCSS and watch mode",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Sass entry point.
    source: PathBuf,
    /// Output file, or a directory to place `<name>.css` in.
    output: PathBuf,

    /// Keep watching sources and recompile on change.
    #[arg(short, long)]
    watch: bool,
    /// Build for production (compressed, no source maps).
    #[arg(long)]
    production: bool,
    /// Embed source maps (ignored in production).
    #[arg(long)]
    source_maps: bool,
    /// Skip the PostCSS pass.
    #[arg(long)]
    no_autoprefixer: bool,
    /// Disable desktop notifications.
    #[arg(long)]
    no_notifications: bool,
    /// Additional import search directory (repeatable).
    #[arg(long = "include-path", value_name = "DIR")]
    include_paths: Vec<PathBuf>,
    /// Custom Sass importer module.
    #[arg(long)]
    importer: Option<PathBuf>,
    /// Config file to use instead of the default search paths.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Write the registered output paths to this JSON manifest.
    #[arg(long)]
    manifest: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut BuildConfig) {
        config.production |= self.production;
        config.source_maps |= self.source_maps;
        if self.no_autoprefixer {
            config.autoprefixer.enabled = false;
        }
        if self.no_notifications {
            config.notifications.on_success = false;
            config.notifications.on_failure = false;
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = cli
        .config
        .clone()
        .map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let mut config = match loader.load() {
        Ok((config, source)) => {
            tracing::debug!(?source, "Configuration resolved");
            config
        }
        Err(e) => {
            display::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);

    let target = CompileTarget::new(
        &cli.source,
        &cli.output,
        PluginOptions {
            include_paths: cli.include_paths.clone(),
            importer: cli.importer.clone(),
        },
    );
    let mode = WatchMode::from_flag(cli.watch);

    tracing::info!(
        source = %target.source().display(),
        output = %target.output().display(),
        ?mode,
        production = config.production,
        post_process = config.autoprefixer.enabled,
        "Starting standalone Sass"
    );

    let mut manifest = AssetManifest::new();
    let cancel = CancellationToken::new();
    let mut session = match CompileSession::new(target, config, mode, &mut manifest) {
        Ok(session) => session
            .with_notifier(Box::new(DesktopNotifier::new()))
            .with_cancellation(cancel.clone()),
        Err(e) => {
            display::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &cli.manifest {
        if let Err(e) = manifest.write(path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write asset manifest");
        }
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match session.run().await {
        Ok(SessionResult::Terminated { .. }) => ExitCode::FAILURE,
        Ok(result) => {
            tracing::debug!(?result, "Session ended");
            ExitCode::SUCCESS
        }
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
