//! Logging setup
//!
//! Logs go to a file in the app data directory through a non-blocking writer.
//! In CLI mode a compact stderr layer can be added; the TUI never logs to the
//! terminal it draws on. The log file is rotated at startup once it grows past
//! `max_log_size`: `x-script.log` becomes `x-script.log.1`, `.1` becomes `.2`,
//! and so on up to `max_log_files`.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Flushes buffered log lines when dropped; keep it alive until exit
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level.
pub fn init(config: &AppConfig, base_dir: &Path, console: bool) -> Result<LoggingGuard> {
    let log_path = config.log_path(base_dir);
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }

    let rotated = rotate_if_oversized(&log_path, config.max_log_bytes(), config.max_log_files)
        .with_context(|| format!("Failed to rotate log file {:?}", log_path))?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;
    let (file_writer, file_guard) = tracing_appender::non_blocking(file);

    let level = config.effective_log_level();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = console.then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::info!(
        log_path = %log_path.display(),
        level = %level,
        rotated,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Rotate `path` if it is larger than `max_bytes`.
///
/// Returns whether a rotation happened. A `max_bytes` of zero disables
/// rotation; a `max_files` of zero discards the oversized file.
pub fn rotate_if_oversized(path: &Path, max_bytes: u64, max_files: u32) -> io::Result<bool> {
    let Ok(metadata) = fs::metadata(path) else {
        return Ok(false);
    };
    if max_bytes == 0 || metadata.len() <= max_bytes {
        return Ok(false);
    }

    if max_files == 0 {
        fs::remove_file(path)?;
        return Ok(true);
    }

    for index in (0..max_files).rev() {
        let from = if index == 0 {
            path.to_path_buf()
        } else {
            numbered(path, index)
        };
        if from.exists() {
            fs::rename(&from, numbered(path, index + 1))?;
        }
    }

    Ok(true)
}

/// `path` with `.n` appended
fn numbered(path: &Path, n: u32) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_small_file_is_not_rotated() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("x.log");
        fs::write(&log, "short").unwrap();

        assert!(!rotate_if_oversized(&log, 1024, 3).unwrap());
        assert!(log.exists());
    }

    #[test]
    fn test_missing_file_is_not_rotated() {
        let dir = TempDir::new().unwrap();
        assert!(!rotate_if_oversized(&dir.path().join("x.log"), 1, 3).unwrap());
    }

    #[test]
    fn test_rotation_shifts_numbered_files() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("x.log");
        fs::write(&log, "current log content").unwrap();
        fs::write(numbered(&log, 1), "first").unwrap();
        fs::write(numbered(&log, 2), "second").unwrap();

        assert!(rotate_if_oversized(&log, 4, 3).unwrap());

        assert!(!log.exists());
        assert_eq!(fs::read_to_string(numbered(&log, 1)).unwrap(), "current log content");
        assert_eq!(fs::read_to_string(numbered(&log, 2)).unwrap(), "first");
        assert_eq!(fs::read_to_string(numbered(&log, 3)).unwrap(), "second");
    }

    #[test]
    fn test_rotation_drops_oldest_beyond_limit() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("x.log");
        fs::write(&log, "new").unwrap();
        fs::write(numbered(&log, 1), "old").unwrap();

        assert!(rotate_if_oversized(&log, 1, 1).unwrap());

        assert_eq!(fs::read_to_string(numbered(&log, 1)).unwrap(), "new");
        assert!(!numbered(&log, 2).exists());
    }

    #[test]
    fn test_zero_kept_files_removes_log() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("x.log");
        fs::write(&log, "oversized").unwrap();

        assert!(rotate_if_oversized(&log, 1, 0).unwrap());
        assert!(!log.exists());
    }
}
