//! JSONL activity log: append-only line-delimited JSON.
//!
//! Each line is a self-contained JSON object, assembled in memory and
//! written with a single `write_all` so a process tailing the file never
//! sees a partial line.
//!
//! When the primary file becomes unwritable the writer falls back to
//! stderr (prefixed `[APL-JSONL]`), and if that fails too it discards
//! silently — the simulation must never crash over logging.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::core::errors::{AplError, Result};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Log event types matching the simulation activity model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SimulationStart,
    SimulationStop,
    CycleComplete,
    CycleFailed,
    RecordsGenerated,
    IngestionError,
    ReportPersisted,
    ArchiveComplete,
    ArchiveError,
    Error,
}

/// A single JSONL log entry — all fields optional except `ts`, `event`,
/// `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    /// Event type identifier.
    pub event: EventType,
    /// Severity level.
    pub severity: Severity,
    /// Cycle id the event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<u64>,
    /// Mission code involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission: Option<String>,
    /// Affected file path (when applicable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Record count relevant to the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Duration of the action in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Whether the action succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// APL error code if the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Human-readable error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            cycle: None,
            mission: None,
            path: None,
            count: None,
            duration_ms: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    /// Log file path.
    pub path: PathBuf,
    /// Maximum file size before rotation (bytes). Default: 100 MiB.
    pub max_size_bytes: u64,
    /// Number of rotated files to keep. Default: 5.
    pub max_rotated_files: u32,
    /// Seconds between forced fsync calls. Default: 10.
    pub fsync_interval_secs: u64,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("activity.jsonl"),
            max_size_bytes: 100 * 1024 * 1024,
            max_rotated_files: 5,
            fsync_interval_secs: 10,
        }
    }
}

/// Where log lines currently go. Transitions are one-way:
/// File → Stderr → Gone.
enum Sink {
    /// Primary path is open; tracks bytes written for rotation.
    File { writer: BufWriter<File>, size: u64 },
    Stderr,
    Gone,
}

/// Append-only JSONL log writer with rotation and stderr fallback.
pub struct JsonlWriter {
    config: JsonlConfig,
    sink: Sink,
    last_fsync: SystemTime,
}

impl JsonlWriter {
    /// Open the JSONL log file, degrading to stderr if the path is
    /// unusable.
    pub fn open(config: JsonlConfig) -> Self {
        let sink = match file_sink(&config.path) {
            Ok(sink) => sink,
            Err(_) => {
                let _ = writeln!(
                    io::stderr(),
                    "[APL-JSONL] log path failed to open, using stderr: {}",
                    config.path.display()
                );
                Sink::Stderr
            }
        };
        Self {
            config,
            sink,
            last_fsync: SystemTime::now(),
        }
    }

    /// Write a single log entry as one atomic JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(mut line) => {
                line.push('\n');
                self.emit(&line);
            }
            Err(e) => {
                // A LogEntry that fails to serialize is a programming error.
                let _ = writeln!(io::stderr(), "[APL-JSONL] serialize error: {e}");
            }
        }
    }

    /// Flush buffers.
    pub fn flush(&mut self) {
        if let Sink::File { writer, .. } = &mut self.sink {
            let _ = writer.flush();
        }
    }

    /// Force an fsync on the underlying file.
    pub fn fsync(&mut self) {
        if let Sink::File { writer, .. } = &mut self.sink {
            let _ = writer.flush();
            let _ = writer.get_ref().sync_data();
            self.last_fsync = SystemTime::now();
        }
    }

    /// Current degradation state.
    pub fn state(&self) -> &str {
        match self.sink {
            Sink::File { .. } => "normal",
            Sink::Stderr => "stderr",
            Sink::Gone => "discard",
        }
    }

    /// Number of bytes written to the current file, 0 once degraded.
    pub fn bytes_written(&self) -> u64 {
        match self.sink {
            Sink::File { size, .. } => size,
            Sink::Stderr | Sink::Gone => 0,
        }
    }

    // ──────────────────────── internals ────────────────────────

    /// Send one line down the current sink, degrading on failure until a
    /// level accepts it (stderr accepts everything; Gone drops).
    fn emit(&mut self, line: &str) {
        if let Sink::File { size, .. } = &self.sink {
            if *size + line.len() as u64 > self.config.max_size_bytes {
                self.rotate();
            }
        }

        loop {
            match &mut self.sink {
                Sink::File { writer, size } => {
                    if writer.write_all(line.as_bytes()).is_ok() {
                        *size += line.len() as u64;
                        self.fsync_if_due();
                        return;
                    }
                    self.sink = Sink::Stderr;
                    let _ = writeln!(io::stderr(), "[APL-JSONL] log write failed, using stderr");
                }
                Sink::Stderr => {
                    if write!(io::stderr(), "[APL-JSONL] {line}").is_ok() {
                        return;
                    }
                    self.sink = Sink::Gone;
                }
                Sink::Gone => return,
            }
        }
    }

    fn fsync_if_due(&mut self) {
        let due = SystemTime::now()
            .duration_since(self.last_fsync)
            .unwrap_or(Duration::ZERO)
            .as_secs()
            >= self.config.fsync_interval_secs;
        if due {
            self.fsync();
        }
    }

    /// Shift `path.1 … path.N` up by one (dropping the oldest), move the
    /// live file to `path.1`, and reopen a fresh live file.
    fn rotate(&mut self) {
        self.flush();
        self.sink = Sink::Gone;

        let live = &self.config.path;
        let keep = self.config.max_rotated_files;
        let _ = fs::remove_file(rotation_path(live, keep));
        for slot in (1..keep).rev() {
            let _ = fs::rename(rotation_path(live, slot), rotation_path(live, slot + 1));
        }
        let _ = fs::rename(live, rotation_path(live, 1));

        self.sink = match file_sink(live) {
            Ok(sink) => sink,
            Err(_) => {
                let _ = writeln!(io::stderr(), "[APL-JSONL] log rotation failed, using stderr");
                Sink::Stderr
            }
        };
    }
}

// ──────────────────────── helpers ────────────────────────

/// Open (creating parents as needed) the primary log file for append.
fn file_sink(path: &Path) -> Result<Sink> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| AplError::io(parent, source))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AplError::io(path, source))?;
    let size = file.metadata().map_or(0, |m| m.len());
    Ok(Sink::File {
        writer: BufWriter::with_capacity(64 * 1024, file),
        size,
    })
}

/// Rotation slot name: `activity.jsonl` → `activity.jsonl.3`.
fn rotation_path(base: &Path, slot: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{slot}"));
    PathBuf::from(name)
}

/// Format current UTC time as ISO 8601.
fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────
