//! Script execution with live output
//!
//! [`Executor::execute`] launches `interpreter <script>` and turns the child's
//! two output pipes into one line feed:
//!
//! ```text
//!  stdout reader ──┐
//!  stderr reader ──┼──> mpsc merge channel ──> drain loop ──> on_output(line)
//!  waiter ─────────┘    (terminal line, then Finished)
//! ```
//!
//! Each reader forwards complete lines as they arrive; stderr lines get the
//! [`STDERR_PREFIX`]. The waiter blocks until the child exits, reaps it, gives
//! the readers a short grace period to flush what the child left in the pipes,
//! then pushes one terminal status line and the `Finished` signal, which ends
//! the drain loop. A background job that inherited the pipes does not hold the
//! run open; whatever it writes after that is dropped. The drain loop runs on
//! the caller's thread, never on the thread that manages the process. Once
//! draining is done the run is recorded in the [`Registry`], whatever the exit
//! code was.
//!
//! A script that exits non-zero is a normal outcome: it shows up as a failure
//! line in the feed and `execute` still returns `Ok`.

use crate::catalog::ScriptEntry;
use crate::config::AppConfig;
use crate::error::ExecError;
use crate::process_guard::{ChildRegistry, CommandProcessGroup, signal_process_group};
use crate::registry::Registry;
use chrono::Utc;
use nix::sys::signal::Signal;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use strum::Display;
use tracing::{Span, error, info, warn};

/// Prefix added to every line read from the child's stderr
pub const STDERR_PREFIX: &str = "ERROR: ";

/// How long readers may keep delivering output once the child has exited
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    /// Format a raw line from this stream for the output feed
    pub fn tag(self, line: &str) -> String {
        match self {
            Self::Stdout => line.to_string(),
            Self::Stderr => format!("{STDERR_PREFIX}{line}"),
        }
    }
}

/// Summary of a script run that started successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Exit code; `None` if the child was killed by a signal or lost
    pub exit_code: Option<i32>,
    /// Whether the child exited with status 0
    pub success: bool,
    /// Whether the run was cancelled through its [`CancelToken`]
    pub cancelled: bool,
    /// Lines delivered to the output callback, terminal line included
    pub lines: usize,
}

/// Messages sent by [`Executor::spawn`] to the consuming thread
#[derive(Debug)]
pub enum ExecEvent {
    /// A line of merged output
    Line(String),
    /// The run is over; no further events follow
    Finished {
        name: String,
        result: Result<RunReport, ExecError>,
    },
}

/// Request to stop a running script.
///
/// Cancelling sends SIGTERM to the script's process group. A token cancelled
/// before the script starts stops it as soon as it is spawned.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    /// Process group of the attached run
    pgid: Mutex<Option<u32>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let pgid = self.inner.pgid.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pgid) = *pgid {
            let _ = signal_process_group(pgid, Signal::SIGTERM);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    fn attach(&self, pgid: u32) {
        let mut slot = self.inner.pgid.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(pgid);
        if self.is_cancelled() {
            let _ = signal_process_group(pgid, Signal::SIGTERM);
        }
    }

    fn detach(&self) {
        *self.inner.pgid.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Wait for `child` to exit and reap it.
    ///
    /// The token is detached before the pid is released; a later `cancel`
    /// signals nothing.
    fn reap(&self, child: &mut Child) -> io::Result<ExitStatus> {
        // On failure fall back to a plain wait below
        let _ = await_exit(child.id());
        let mut slot = self.inner.pgid.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
        child.wait()
    }
}

/// Block until `pid` has exited, leaving it unreaped
#[cfg(target_os = "linux")]
fn await_exit(pid: u32) -> nix::Result<()> {
    use nix::errno::Errno;
    use nix::sys::wait::{Id, WaitPidFlag, waitid};

    let id = || Id::Pid(nix::unistd::Pid::from_raw(pid as i32));
    loop {
        match waitid(id(), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT) {
            Err(Errno::EINTR) => continue,
            result => return result.map(drop),
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn await_exit(_pid: u32) -> nix::Result<()> {
    Ok(())
}

/// Items on the merge channel
enum Feed {
    Line(String),
    /// End of stream; always the last item the waiter sends
    Finished(Completion),
}

struct Completion {
    exit_code: Option<i32>,
    success: bool,
    cancelled: bool,
}

/// Runs catalog entries through the configured interpreter
#[derive(Debug)]
pub struct Executor {
    interpreter: PathBuf,
    scripts_dir: PathBuf,
    registry: Arc<Registry>,
    span: Span,
}

impl Executor {
    pub fn new(
        interpreter: impl Into<PathBuf>,
        scripts_dir: impl Into<PathBuf>,
        registry: Arc<Registry>,
        span: Span,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            scripts_dir: scripts_dir.into(),
            registry,
            span,
        }
    }

    /// Executor using the interpreter and scripts directory from `config`
    pub fn from_config(config: &AppConfig, registry: Arc<Registry>, span: Span) -> Self {
        Self::new(&config.python_path, &config.scripts_dir, registry, span)
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Absolute path of the script file for `entry`
    pub fn script_path(&self, entry: &ScriptEntry) -> PathBuf {
        let joined = self.scripts_dir.join(&entry.path);
        std::path::absolute(&joined).unwrap_or(joined)
    }

    /// Run `entry` to completion, calling `on_output` once per line.
    pub fn execute<F>(&self, entry: &ScriptEntry, on_output: F) -> Result<RunReport, ExecError>
    where
        F: FnMut(&str),
    {
        self.execute_with_cancel(entry, &CancelToken::new(), on_output)
    }

    /// Run `entry` to completion or until `cancel` fires.
    ///
    /// Returns `Err` only when the script could not be started; `on_output` is
    /// never called in that case and no run is recorded.
    pub fn execute_with_cancel<F>(
        &self,
        entry: &ScriptEntry,
        cancel: &CancelToken,
        mut on_output: F,
    ) -> Result<RunReport, ExecError>
    where
        F: FnMut(&str),
    {
        let script_path = self.script_path(entry);
        info!(
            parent: &self.span,
            script = %entry.name,
            path = %script_path.display(),
            interpreter = %self.interpreter.display(),
            "Executing script"
        );

        let child = Command::new(&self.interpreter)
            .arg(&script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group()
            .spawn()
            .map_err(|source| ExecError::SpawnFailed {
                interpreter: self.interpreter.clone(),
                source,
            })
            .inspect_err(|e| {
                error!(parent: &self.span, script = %entry.name, error = %e, "Failed to start script");
            })?;

        let pid = child.id();
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }
        cancel.attach(pid);

        let (tx, rx) = mpsc::channel();
        if let Err(e) = self.start_session(child, entry, cancel, tx) {
            error!(parent: &self.span, script = %entry.name, error = %e, "Failed to capture script output");
            return Err(e);
        }

        let mut lines = 0;
        let completion = loop {
            match rx.recv() {
                Ok(Feed::Line(line)) => {
                    info!(parent: &self.span, script = %entry.name, line = %line, "Script output");
                    on_output(&line);
                    lines += 1;
                }
                Ok(Feed::Finished(completion)) => break completion,
                Err(_) => {
                    // Every sender is gone without a Finished signal
                    let line = "Script execution failed: output feed closed unexpectedly";
                    warn!(parent: &self.span, script = %entry.name, "Output feed closed early");
                    on_output(line);
                    lines += 1;
                    break Completion {
                        exit_code: None,
                        success: false,
                        cancelled: cancel.is_cancelled(),
                    };
                }
            }
        };

        info!(
            parent: &self.span,
            script = %entry.name,
            exit_code = ?completion.exit_code,
            success = completion.success,
            cancelled = completion.cancelled,
            "Script finished"
        );

        if let Err(e) = self.registry.record_run(&entry.name, Utc::now()) {
            warn!(parent: &self.span, script = %entry.name, error = %e, "Run was not recorded");
        }

        Ok(RunReport {
            exit_code: completion.exit_code,
            success: completion.success,
            cancelled: completion.cancelled,
            lines,
        })
    }

    /// Start the two readers and the waiter for a freshly spawned child.
    ///
    /// On failure the child is killed and unregistered before returning.
    fn start_session(
        &self,
        mut child: Child,
        entry: &ScriptEntry,
        cancel: &CancelToken,
        tx: Sender<Feed>,
    ) -> Result<(), ExecError> {
        let pid = child.id();

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            abandon(&mut child, cancel);
            return Err(ExecError::StreamSetupFailed("output pipes were not attached".into()));
        };

        let mut readers = Vec::with_capacity(2);
        for (source, stream) in [
            (Box::new(stdout) as Box<dyn Read + Send>, OutputStream::Stdout),
            (Box::new(stderr) as Box<dyn Read + Send>, OutputStream::Stderr),
        ] {
            match spawn_reader(source, stream, tx.clone(), self.span.clone()) {
                Ok(handle) => readers.push(handle),
                Err(e) => {
                    abandon(&mut child, cancel);
                    return Err(ExecError::StreamSetupFailed(format!(
                        "failed to start {stream} reader: {e}"
                    )));
                }
            }
        }

        let name = entry.name.clone();
        let waiter_cancel = cancel.clone();
        let span = self.span.clone();
        let spawned = thread::Builder::new()
            .name("xscript-wait".into())
            .spawn(move || wait_for_exit(child, readers, &name, &waiter_cancel, tx, &span));

        if let Err(e) = spawned {
            // The child handle went down with the closure; kill the group by pid
            let _ = signal_process_group(pid, Signal::SIGKILL);
            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.unregister(pid);
            }
            cancel.detach();
            return Err(ExecError::StreamSetupFailed(format!(
                "failed to start waiter: {e}"
            )));
        }

        Ok(())
    }

    /// Run `entry` on a worker thread, forwarding output as [`ExecEvent`]s.
    ///
    /// The last event is always `ExecEvent::Finished`.
    pub fn spawn(
        self: &Arc<Self>,
        entry: ScriptEntry,
        cancel: CancelToken,
        events: Sender<ExecEvent>,
    ) -> io::Result<JoinHandle<()>> {
        let executor = Arc::clone(self);
        thread::Builder::new()
            .name("xscript-run".into())
            .spawn(move || {
                let line_events = events.clone();
                let result = executor.execute_with_cancel(&entry, &cancel, |line| {
                    let _ = line_events.send(ExecEvent::Line(line.to_string()));
                });
                let _ = events.send(ExecEvent::Finished {
                    name: entry.name,
                    result,
                });
            })
    }
}

/// Kill a child whose session could not be set up, reap it and forget it
fn abandon(child: &mut Child, cancel: &CancelToken) {
    let pid = child.id();
    let _ = signal_process_group(pid, Signal::SIGKILL);
    let _ = child.kill();
    let _ = child.wait();
    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.unregister(pid);
    }
    cancel.detach();
}

fn spawn_reader(
    source: Box<dyn Read + Send>,
    stream: OutputStream,
    tx: Sender<Feed>,
    span: Span,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("xscript-{stream}"))
        .spawn(move || {
            let mut reader = BufReader::new(source);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = stream.tag(&decode_line(&buf));
                        if tx.send(Feed::Line(line)).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        // Only this stream stops; the other reader and the waiter carry on
                        warn!(parent: &span, stream = %stream, error = %e, "Output stream read failed");
                        break;
                    }
                }
            }
        })
}

/// Turn raw pipe bytes into a line: lossy UTF-8, line terminator removed
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Wait for the readers to reach end of stream, for at most `grace`.
///
/// Returns how many were left behind, still blocked on a pipe that some
/// other process holds open. Their sends fail once the drain loop is gone.
fn join_readers(readers: Vec<JoinHandle<()>>, grace: Duration) -> usize {
    let deadline = Instant::now() + grace;
    while readers.iter().any(|r| !r.is_finished()) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }

    let mut left_behind = 0;
    for reader in readers {
        if reader.is_finished() {
            let _ = reader.join();
        } else {
            left_behind += 1;
        }
    }
    left_behind
}

/// Waiter body: reap the child, let the readers flush, report exactly one
/// terminal line and then `Finished`.
fn wait_for_exit(
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    name: &str,
    cancel: &CancelToken,
    tx: Sender<Feed>,
    span: &Span,
) {
    let pid = child.id();
    let status = cancel.reap(&mut child);
    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.unregister(pid);
    }

    let left_behind = join_readers(readers, OUTPUT_DRAIN_GRACE);
    if left_behind > 0 {
        warn!(
            parent: span,
            script = %name,
            left_behind,
            "Script exited but its output pipes are still open, likely held by a background job"
        );
    }

    let cancelled = cancel.is_cancelled();
    let (line, completion) = match status {
        Ok(status) if cancelled && !status.success() => (
            format!("Script '{name}' was cancelled"),
            Completion {
                exit_code: status.code(),
                success: false,
                cancelled: true,
            },
        ),
        Ok(status) if status.success() => (
            format!("Script '{name}' completed successfully"),
            Completion {
                exit_code: status.code(),
                success: true,
                cancelled,
            },
        ),
        Ok(status) => (
            format!("Script execution failed: {status}"),
            Completion {
                exit_code: status.code(),
                success: false,
                cancelled,
            },
        ),
        Err(e) => (
            format!("Script execution failed: {e}"),
            Completion {
                exit_code: None,
                success: false,
                cancelled,
            },
        ),
    };

    let _ = tx.send(Feed::Line(line));
    let _ = tx.send(Feed::Finished(completion));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line_strips_terminators() {
        assert_eq!(decode_line(b"hello\n"), "hello");
        assert_eq!(decode_line(b"dos\r\n"), "dos");
        assert_eq!(decode_line(b"tail"), "tail");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[test]
    fn test_decode_line_is_lossy() {
        let line = decode_line(b"\xffabc\n");
        assert!(line.ends_with("abc"));
        assert!(line.starts_with('\u{FFFD}'));
    }

    #[test]
    fn test_stream_tag() {
        assert_eq!(OutputStream::Stdout.tag("ok"), "ok");
        assert_eq!(OutputStream::Stderr.tag("bad"), "ERROR: bad");
        assert_eq!(OutputStream::Stderr.to_string(), "stderr");
    }

    #[test]
    fn test_reap_detaches_before_returning() {
        let token = CancelToken::new();
        let mut child = Command::new("sh")
            .args(["-c", "exit 4"])
            .in_new_process_group()
            .spawn()
            .unwrap();
        token.attach(child.id());

        let status = token.reap(&mut child).unwrap();

        assert_eq!(status.code(), Some(4));
        assert!(token.inner.pgid.lock().unwrap().is_none());
        // Nothing left to signal
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_join_readers_leaves_blocked_threads_behind() {
        let done = thread::spawn(|| {});
        let (_hold, rx) = mpsc::channel::<()>();
        let blocked = thread::spawn(move || {
            let _ = rx.recv();
        });

        let start = Instant::now();
        let left_behind = join_readers(vec![done, blocked], Duration::from_millis(50));

        assert_eq!(left_behind, 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
