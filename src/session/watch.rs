//! Watch mode selection.

/// Whether the session builds once or keeps the tools watching.
///
/// In watch mode the session starts an ordinary build and, alongside it, a
/// compiler running its own file watcher. The orchestrator never restarts
/// the watching compiler; every recompile arrives as new output from the
/// same process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchMode {
    #[default]
    Once,
    Watch,
}

impl WatchMode {
    #[must_use]
    pub fn from_flag(watch: bool) -> Self {
        if watch {
            Self::Watch
        } else {
            Self::Once
        }
    }

    #[must_use]
    pub fn is_watching(self) -> bool {
        self == Self::Watch
    }

    /// The runs to start, as their `watch` flags.
    #[must_use]
    pub fn runs(self) -> &'static [bool] {
        match self {
            Self::Once => &[false],
            Self::Watch => &[false, true],
        }
    }

    /// Whether a failed compile ends the session.
    #[must_use]
    pub fn terminates_on_failure(self) -> bool {
        !self.is_watching()
    }
}
