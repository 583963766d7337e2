//! Compile session: success and failure policy over a running pipeline.
//!
//! The session owns the [`Pipeline`], counts completed builds and decides
//! what every outcome means: print, notify, keep watching, or terminate.

use tokio_util::sync::CancellationToken;

use crate::compiler::{
    CommandSet, CompileTarget, ErrorReport, Pipeline, PipelineError, PipelineEvent,
};
use crate::config::{BuildConfig, NotificationConfig};
use crate::display;

use super::{
    AssetRegistry, Notification, Notifier, SessionState, SessionStateMachine, SessionStats,
    TracingNotifier, WatchMode,
};

/// Error type for session operations.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// A stage could not be started.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// The working directory could not be resolved.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a compile session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResult {
    /// Every stage exited on its own.
    Finished {
        /// Number of completed pipeline runs.
        successes: u64,
    },
    /// A one-shot build failed; the host should exit with a failure status.
    Terminated {
        report: ErrorReport,
    },
    /// The session was cancelled via its cancellation token.
    Cancelled {
        successes: u64,
    },
}

impl SessionResult {
    /// Returns true if the host process should exit unsuccessfully.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Terminated { .. })
    }
}

/// What the session does after handling an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    Continue,
    Terminate(ErrorReport),
}

/// A supervised compile of one target.
pub struct CompileSession {
    pipeline: Pipeline,
    mode: WatchMode,
    notifications: NotificationConfig,
    notifier: Box<dyn Notifier>,
    state: SessionStateMachine,
    cancel: Option<CancellationToken>,
}

impl CompileSession {
    /// Create a session for `target`, registering its output path.
    ///
    /// Tool paths resolve against the current working directory.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Io` if the working directory cannot be resolved.
    pub fn new(
        target: CompileTarget,
        config: BuildConfig,
        mode: WatchMode,
        registry: &mut dyn AssetRegistry,
    ) -> Result<Self, SessionError> {
        registry.register(target.output());
        let commands = CommandSet::from_cwd(target, config)?;
        Ok(Self::from_commands(commands, mode))
    }

    /// Create a session from prepared commands.
    #[must_use]
    pub fn from_commands(commands: CommandSet, mode: WatchMode) -> Self {
        let notifications = commands.config().notifications.clone();
        Self {
            pipeline: Pipeline::new(commands),
            mode,
            notifications,
            notifier: Box::new(TracingNotifier),
            state: SessionStateMachine::new(),
            cancel: None,
        }
    }

    /// Replace the notification sink.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Set a cancellation token for graceful shutdown.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.state()
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.state.stats()
    }

    /// Start the configured runs and handle events until the session ends.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Pipeline` if a compile stage cannot be started.
    pub async fn run(&mut self) -> Result<SessionResult, SessionError> {
        self.state.transition(SessionState::Compiling);
        for &watch in self.mode.runs() {
            if let Err(e) = self.pipeline.start_run(watch) {
                self.pipeline.shutdown().await;
                self.state.transition(SessionState::Failed);
                return Err(e.into());
            }
        }

        let cancel = self.cancel.clone().unwrap_or_default();
        loop {
            let event = tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::info!("Session cancelled via token");
                    self.pipeline.shutdown().await;
                    return Ok(SessionResult::Cancelled {
                        successes: self.state.stats().successes,
                    });
                }
                event = self.pipeline.next_event() => event,
            };

            let Some(event) = event else {
                tracing::debug!(state = ?self.state.state(), "All stages exited");
                return Ok(SessionResult::Finished {
                    successes: self.state.stats().successes,
                });
            };

            if let SessionAction::Terminate(report) = self.handle_event(event) {
                self.pipeline.shutdown().await;
                return Ok(SessionResult::Terminated { report });
            }
        }
    }

    /// Apply policy to a single pipeline event.
    pub fn handle_event(&mut self, event: PipelineEvent) -> SessionAction {
        match event {
            PipelineEvent::Changed { stage, text } => {
                tracing::debug!(stage = ?stage, "Compiler output");
                if matches!(
                    self.state.state(),
                    SessionState::Succeeded | SessionState::Failed
                ) {
                    self.state.transition(SessionState::Compiling);
                }
                display::print_change(&text);
                SessionAction::Continue
            }
            PipelineEvent::Succeeded { text, .. } => self.on_success(&text),
            PipelineEvent::Failed { text, .. } => self.on_fail(&text),
        }
    }

    /// Handle a completed pipeline run.
    ///
    /// Only recompiles are announced: the first success of a session never
    /// triggers a notification.
    pub fn on_success(&mut self, text: &str) -> SessionAction {
        if !text.is_empty() {
            display::print_compiled(text);
        }

        let count = self.state.record_success();
        self.state.transition(SessionState::Succeeded);

        let output = self.pipeline.commands().target().output().display().to_string();
        display::print_success(&output, count);
        tracing::info!(output = %output, count, "Compilation succeeded");

        if self.notifications.on_success && count > 1 {
            self.notifier
                .notify(&Notification::success(self.notifications.icon.clone()));
        }

        SessionAction::Continue
    }

    /// Handle a failed stage: report it, notify, and terminate a one-shot
    /// build.
    pub fn on_fail(&mut self, text: &str) -> SessionAction {
        let report = ErrorReport::parse(text);
        display::print_failure_banner(&report);
        tracing::warn!(
            status = report.status,
            file = report.file.as_deref(),
            line = report.line,
            column = report.column,
            message = %report.message,
            "Compilation failed"
        );

        self.state.record_failure();
        self.state.transition(SessionState::Failed);

        if self.notifications.on_failure {
            self.notifier.notify(&Notification::failure(
                report.message.clone(),
                self.notifications.icon.clone(),
            ));
        }

        if self.mode.terminates_on_failure() {
            self.state.transition(SessionState::Terminated);
            SessionAction::Terminate(report)
        } else {
            SessionAction::Continue
        }
    }
}
