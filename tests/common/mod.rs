//! Shared fixtures: a temporary project with fake compiler tools.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use standalone_sass::compiler::{CommandSet, CompileTarget, PluginOptions};
use standalone_sass::config::BuildConfig;
use standalone_sass::session::{Notification, Notifier};

/// Fake compiler that writes its output file and reports success.
pub const SASS_OK: &str = r#"printf 'body { color: red; }' > "$2"
echo "Wrote CSS to $2""#;

/// Fake compiler that reports a structured error on stderr.
pub const SASS_FAIL: &str = r#"printf '%s\n' '{"status":1,"file":"a.scss","line":3,"column":5,"message":"bad syntax","formatted":"Error: bad syntax\n  on line 3"}' >&2
exit 1"#;

/// Fake compiler that recompiles twice when watching.
pub const SASS_WATCH_TWICE: &str = r#"printf 'a{}' > "$2"
echo "Wrote CSS to $2"
case " $* " in
  *" --watch "*)
    sleep 0.2
    printf 'b{}' > "$2"
    echo "Wrote CSS to $2"
    ;;
esac"#;

/// Fake compiler whose watcher sees one bad edit, then a fix.
pub const SASS_WATCH_BAD_EDIT: &str = r#"case " $* " in
  *" --watch "*)
    sleep 0.2
    echo '{"status":1,"message":"Undefined variable","formatted":"Error: Undefined variable"}' >&2
    sleep 0.2
    ;;
esac
printf 'a{}' > "$2"
echo "Wrote CSS to $2""#;

/// Fake post-processor: copies `$1` to the `-o` target.
pub const POSTCSS_OK: &str = r#"cp "$1" "$3"
echo "Finished $1 in 4 ms" >&2"#;

/// Fake post-processor that logs each start; when watching it reprocesses
/// once more before exiting.
pub const POSTCSS_WATCH: &str = r#"echo start >> "$(dirname "$0")/postcss.starts"
cp "$1" "$3"
echo "Finished $1 in 4 ms" >&2
case " $* " in
  *" --watch "*)
    sleep 0.6
    cp "$1" "$3"
    echo "Finished $1 in 3 ms" >&2
    ;;
esac"#;

/// Fake compiler that exits non-zero without printing an error.
pub const SASS_SILENT_CRASH: &str = r#"echo "partial output" >&2
exit 2"#;

/// Fake post-processor that fails without writing output.
pub const POSTCSS_FAIL: &str = r#"echo "CssSyntaxError: Error: Unclosed block" >&2
exit 1"#;

/// A temporary project directory with a `bin/` tool directory.
pub struct Project {
    pub dir: tempfile::TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("app.scss"), "body { color: red; }").unwrap();
        Self { dir }
    }

    /// Install a fake tool script under `bin/`.
    #[cfg(unix)]
    pub fn tool(&self, name: &str, body: &str) -> &Self {
        use std::os::unix::fs::PermissionsExt;

        let path = self.dir.path().join("bin").join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        self
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("app.css")
    }

    pub fn intermediate(&self) -> PathBuf {
        self.dir.path().join("app.css.dist")
    }

    /// How many times `tool` logged a start to `bin/<tool>.starts`.
    pub fn starts(&self, tool: &str) -> usize {
        std::fs::read_to_string(self.dir.path().join("bin").join(format!("{tool}.starts")))
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }

    pub fn config(&self, post_process: bool) -> BuildConfig {
        let mut config = BuildConfig::default();
        config.autoprefixer.enabled = post_process;
        config.tools.bin_dir = PathBuf::from("bin");
        config.tools.use_shell = false;
        config
    }

    pub fn commands(&self, config: BuildConfig) -> CommandSet {
        let target = CompileTarget::new(
            self.dir.path().join("app.scss"),
            self.output(),
            PluginOptions::default(),
        );
        CommandSet::new(target, config, self.dir.path())
    }
}

/// Notifier that keeps every notification it receives.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.sent.lock().unwrap().push(notification.clone());
    }
}

/// Collects formatted `tracing` output so tests can assert on log lines.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
