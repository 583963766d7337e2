//! Lifecycle events derived from raw compiler output.
//!
//! Every chunk read from a child's stdout or stderr is classified exactly
//! once, without buffering across chunks. A marker split over two reads is
//! therefore not detected.

/// Which output stream of a child process a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Which streams are checked for the error marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStreams {
    /// Only stderr. Informational stdout lines may contain the marker.
    StderrOnly,
    /// Both stdout and stderr.
    Both,
}

impl ErrorStreams {
    fn includes(self, stream: StreamKind) -> bool {
        match self {
            Self::StderrOnly => stream == StreamKind::Stderr,
            Self::Both => true,
        }
    }
}

/// Marker phrases that complete or fail a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageMarkers {
    pub success: String,
    pub error: String,
    pub error_streams: ErrorStreams,
}

impl StageMarkers {
    /// Markers for the primary stylesheet compiler.
    #[must_use]
    pub fn compiler() -> Self {
        Self {
            success: "Wrote CSS".to_string(),
            error: "Error".to_string(),
            error_streams: ErrorStreams::StderrOnly,
        }
    }

    /// Markers for the post-processor.
    #[must_use]
    pub fn post_processor() -> Self {
        Self {
            success: "Finished".to_string(),
            error: "Error".to_string(),
            error_streams: ErrorStreams::Both,
        }
    }

    /// Classify a single chunk of output read from `stream`.
    #[must_use]
    pub fn classify(&self, chunk: &[u8], stream: StreamKind) -> LifecycleEvent {
        let text = String::from_utf8_lossy(chunk);

        if self.error_streams.includes(stream) && text.contains(self.error.as_str()) {
            LifecycleEvent::Error(text.into_owned())
        } else if text.contains(self.success.as_str()) {
            // Whatever preceded the marker is dropped on purpose.
            LifecycleEvent::Success(String::new())
        } else {
            LifecycleEvent::Change(text.into_owned())
        }
    }
}

/// Three-way classification of a chunk of process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Incremental or log output, forwarded verbatim.
    Change(String),
    /// The stage finished writing its output.
    Success(String),
    /// The tool reported a failure; carries the full chunk text.
    Error(String),
}

impl LifecycleEvent {
    /// Returns true if this event completes a stage, successfully or not.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Error(_))
    }
}

/// Classify `chunk` against explicit marker strings.
///
/// Convenience form of [`StageMarkers::classify`] that checks the error
/// marker on every stream.
#[must_use]
pub fn classify(chunk: &[u8], success_marker: &str, error_marker: &str) -> LifecycleEvent {
    StageMarkers {
        success: success_marker.to_string(),
        error: error_marker.to_string(),
        error_streams: ErrorStreams::Both,
    }
    .classify(chunk, StreamKind::Stderr)
}
