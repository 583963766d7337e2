//! Composition of the compile stage and the optional post-process stage.
//!
//! All stages send on one channel and [`Pipeline::next_event`] is the only
//! consumer, so per-stream order is preserved and no callbacks re-enter the
//! pipeline. The hand-off from compiler to post-processor happens inside the
//! dispatch loop: a compiler success starts the post-processor instead of
//! completing the pipeline.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_util::sync::CancellationToken;

use super::{
    CommandSet, LifecycleEvent, ProcessStage, StageError, StageId, StageKind, StageMessage,
    StageSpec,
};

/// Default buffer size for the stage message channel.
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// Error type for pipeline operations.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// A stage failed to start.
    #[error("Failed to start {kind:?} stage: {source}")]
    Spawn {
        kind: StageKind,
        #[source]
        source: StageError,
    },
}

/// Outcome-relevant events surfaced to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Incremental output from any stage. Observational only.
    Changed { stage: StageId, text: String },
    /// The final stage of a run succeeded.
    Succeeded { stage: StageId, text: String },
    /// A stage reported a failure.
    Failed { stage: StageId, text: String },
}

/// Supervises the stage processes for one compile target.
#[derive(Debug)]
pub struct Pipeline {
    commands: CommandSet,
    tx: Sender<StageMessage>,
    rx: Receiver<StageMessage>,
    stages: HashMap<StageId, ProcessStage>,
    watching: Vec<bool>,
    errored: HashSet<StageId>,
    spawned: usize,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Create an idle pipeline for the given commands.
    #[must_use]
    pub fn new(commands: CommandSet) -> Self {
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        Self {
            commands,
            tx,
            rx,
            stages: HashMap::new(),
            watching: Vec::new(),
            errored: HashSet::new(),
            spawned: 0,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    /// Path of the intermediate artifact, if a post-process stage exists.
    #[must_use]
    pub fn intermediate(&self) -> Option<PathBuf> {
        self.commands.intermediate()
    }

    /// Number of stage processes that have not yet been reported as exited.
    #[must_use]
    pub fn running_stages(&self) -> usize {
        self.stages.len()
    }

    /// Start a run: spawn the compile stage, optionally in watch mode.
    ///
    /// Returns the run index used in the [`StageId`]s of its stages.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Spawn` if the compiler cannot be started.
    pub fn start_run(&mut self, watch: bool) -> Result<usize, PipelineError> {
        let run = self.watching.len();
        self.watching.push(watch);

        let spec = self.commands.compile(watch);
        let id = self.next_id(run, StageKind::Compile);
        self.spawn(id, &spec)?;

        tracing::info!(
            run,
            watch,
            source = %self.commands.target().source().display(),
            output = %self.commands.compile_output().display(),
            "Compile run started"
        );
        Ok(run)
    }

    fn next_id(&mut self, run: usize, kind: StageKind) -> StageId {
        let seq = self.spawned;
        self.spawned += 1;
        StageId { run, kind, seq }
    }

    fn spawn(&mut self, id: StageId, spec: &StageSpec) -> Result<(), PipelineError> {
        let stage = ProcessStage::start(spec, id, self.tx.clone(), self.cancel.child_token())
            .map_err(|source| PipelineError::Spawn {
                kind: id.kind,
                source,
            })?;
        self.stages.insert(id, stage);
        Ok(())
    }

    /// Wait for the next outcome-relevant event.
    ///
    /// Returns `None` once every started stage has exited.
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        loop {
            if self.stages.is_empty() {
                return None;
            }

            // The pipeline holds a sender, so the channel cannot close here.
            let message = self.rx.recv().await?;

            match message {
                StageMessage::Output { stage, event, .. } => {
                    if let Some(event) = self.dispatch(stage, event).await {
                        return Some(event);
                    }
                }
                StageMessage::Exited { stage, status } => {
                    self.on_exit(stage, status).await;
                }
            }
        }
    }

    async fn dispatch(
        &mut self,
        stage: StageId,
        event: LifecycleEvent,
    ) -> Option<PipelineEvent> {
        match event {
            LifecycleEvent::Change(text) => Some(PipelineEvent::Changed { stage, text }),
            LifecycleEvent::Error(text) => {
                self.errored.insert(stage);
                Some(PipelineEvent::Failed { stage, text })
            }
            LifecycleEvent::Success(text) => {
                if stage.kind == StageKind::Compile && self.commands.has_post_process() {
                    self.hand_off(stage.run).await
                } else {
                    Some(PipelineEvent::Succeeded { stage, text })
                }
            }
        }
    }

    /// Start the post-processor for `run` on the freshly written intermediate.
    async fn hand_off(&mut self, run: usize) -> Option<PipelineEvent> {
        let post_processing = self.stages.values().any(|stage| {
            let id = stage.id();
            id.run == run && id.kind == StageKind::PostProcess && !stage.is_finished()
        });

        if post_processing {
            // A watching post-processor polls the intermediate itself.
            tracing::debug!(run, "Post-processor already running, skipping hand-off");
            return None;
        }

        let watch = self.watching.get(run).copied().unwrap_or(false);
        let spec = self.commands.post_process(watch)?;

        let id = self.next_id(run, StageKind::PostProcess);
        match self.spawn(id, &spec) {
            Ok(()) => {
                tracing::info!(run, watch, "Compiler finished, post-processing");
                None
            }
            Err(e) => {
                tracing::error!(run, error = %e, "Failed to start post-processor");
                self.remove_intermediate().await;
                Some(PipelineEvent::Failed {
                    stage: id,
                    text: e.to_string(),
                })
            }
        }
    }

    async fn on_exit(&mut self, stage: StageId, status: Option<std::process::ExitStatus>) {
        self.stages.remove(&stage);
        let errored = self.errored.remove(&stage);

        match status {
            Some(status) if !status.success() && !errored => {
                tracing::warn!(
                    stage = ?stage,
                    %status,
                    "Stage exited unsuccessfully without reporting an error"
                );
            }
            _ => tracing::debug!(stage = ?stage, ?status, "Stage exited"),
        }

        if stage.kind == StageKind::PostProcess {
            self.remove_intermediate().await;
        }
    }

    /// Delete the intermediate artifact.
    ///
    /// Failures are ignored: the file may already be gone or still be held
    /// by another process, and neither affects the build result.
    async fn remove_intermediate(&self) {
        let Some(path) = self.intermediate() else {
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed intermediate artifact"),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Ignoring intermediate cleanup failure");
            }
        }
    }

    /// Terminate every running stage and clean up the intermediate artifact.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();

        while !self.stages.is_empty() {
            match self.rx.recv().await {
                Some(StageMessage::Exited { stage, .. }) => {
                    self.stages.remove(&stage);
                }
                Some(StageMessage::Output { .. }) => {}
                None => break,
            }
        }

        self.remove_intermediate().await;
        tracing::debug!("Pipeline shut down");
    }
}
