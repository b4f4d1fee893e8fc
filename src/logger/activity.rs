//! Activity-log coordinator: a dedicated logger thread owns the
//! [`JsonlWriter`]; all other threads send [`ActivityEvent`] via a bounded
//! crossbeam channel. Non-blocking `try_send()` ensures the simulation loop
//! is never blocked by logging back-pressure.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{AplError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Default bounded channel capacity for log events.
const CHANNEL_CAPACITY: usize = 1024;

// ──────────────────── public event type ────────────────────

/// Events that can be logged through the activity coordinator.
#[derive(Debug, Clone)]
pub enum ActivityEvent {
    SimulationStarted {
        version: String,
        interval_secs: u64,
    },
    SimulationStopped {
        reason: String,
        cycles_completed: u64,
    },
    CycleCompleted {
        cycle: u64,
        mission: String,
        generated: u64,
        aggregated: u64,
        archived: u64,
        duration_ms: u64,
    },
    CycleFailed {
        cycle: u64,
        error_code: String,
        message: String,
    },
    RecordsGenerated {
        cycle: u64,
        mission: String,
        count: u64,
    },
    IngestionError {
        cycle: u64,
        path: String,
        error_code: String,
        message: String,
    },
    ReportPersisted {
        cycle: u64,
        path: String,
    },
    ArchiveCompleted {
        cycle: u64,
        archived: u64,
        missing: u64,
    },
    ArchiveError {
        cycle: u64,
        path: String,
        error_code: String,
        message: String,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sentinel to request graceful shutdown of the logger thread.
    Shutdown,
}

// ──────────────────── public handle ────────────────────

/// Thread-safe, cheaply-cloneable handle for sending log events.
///
/// Internally wraps a bounded crossbeam `Sender`. The `send()` method uses
/// `try_send()` so callers are never blocked by logging back-pressure.
#[derive(Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// Send an event to the logger thread. Non-blocking.
    ///
    /// If the channel is full the event is dropped and the dropped-events
    /// counter is incremented.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
        // Disconnected is fine during shutdown.
    }

    /// Number of events dropped due to channel back-pressure.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Request graceful shutdown of the logger thread.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }
}

// ──────────────────── spawn ────────────────────

/// Spawn the logger thread and return a handle.
///
/// The returned handle is `Clone + Send` and can be shared across threads.
/// The logger thread runs until `handle.shutdown()` is called or all
/// senders are dropped.
pub fn spawn_logger(
    jsonl_config: JsonlConfig,
    channel_capacity: usize,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let capacity = if channel_capacity == 0 {
        CHANNEL_CAPACITY
    } else {
        channel_capacity
    };
    let (tx, rx) = bounded::<ActivityEvent>(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = Arc::clone(&dropped);

    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: dropped,
    };

    let join = thread::Builder::new()
        .name("aplsim-logger".to_string())
        .spawn(move || {
            logger_thread_main(&rx, jsonl_config, &dropped_clone);
        })
        .map_err(|e| AplError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

// ──────────────────── logger thread ────────────────────

fn logger_thread_main(
    rx: &Receiver<ActivityEvent>,
    jsonl_config: JsonlConfig,
    dropped: &Arc<AtomicU64>,
) {
    let mut jsonl = JsonlWriter::open(jsonl_config);

    // Process events until Shutdown or channel disconnect.
    while let Ok(event) = rx.recv() {
        // Report dropped events when observed.
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warning);
            warn.details = Some(format!("{d} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if matches!(event, ActivityEvent::Shutdown) {
            jsonl.flush();
            jsonl.fsync();
            break;
        }

        jsonl.write_entry(&entry_for(event));
    }

    jsonl.flush();
}

fn entry_for(event: ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::SimulationStarted {
            version,
            interval_secs,
        } => {
            let mut e = LogEntry::new(EventType::SimulationStart, Severity::Info);
            e.details = Some(format!("v{version}, interval {interval_secs}s"));
            e
        }
        ActivityEvent::SimulationStopped {
            reason,
            cycles_completed,
        } => {
            let mut e = LogEntry::new(EventType::SimulationStop, Severity::Info);
            e.count = Some(cycles_completed);
            e.details = Some(reason);
            e
        }
        ActivityEvent::CycleCompleted {
            cycle,
            mission,
            generated,
            aggregated,
            archived,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::CycleComplete, Severity::Info);
            e.cycle = Some(cycle);
            e.mission = Some(mission);
            e.count = Some(aggregated);
            e.duration_ms = Some(duration_ms);
            e.ok = Some(true);
            e.details = Some(format!("generated {generated}, archived {archived}"));
            e
        }
        ActivityEvent::CycleFailed {
            cycle,
            error_code,
            message,
        } => {
            let mut e = LogEntry::new(EventType::CycleFailed, Severity::Warning);
            e.cycle = Some(cycle);
            e.ok = Some(false);
            e.error_code = Some(error_code);
            e.error_message = Some(message);
            e
        }
        ActivityEvent::RecordsGenerated {
            cycle,
            mission,
            count,
        } => {
            let mut e = LogEntry::new(EventType::RecordsGenerated, Severity::Info);
            e.cycle = Some(cycle);
            e.mission = Some(mission);
            e.count = Some(count);
            e
        }
        ActivityEvent::IngestionError {
            cycle,
            path,
            error_code,
            message,
        } => {
            let mut e = LogEntry::new(EventType::IngestionError, Severity::Warning);
            e.cycle = Some(cycle);
            e.path = Some(path);
            e.error_code = Some(error_code);
            e.error_message = Some(message);
            e
        }
        ActivityEvent::ReportPersisted { cycle, path } => {
            let mut e = LogEntry::new(EventType::ReportPersisted, Severity::Info);
            e.cycle = Some(cycle);
            e.path = Some(path);
            e.ok = Some(true);
            e
        }
        ActivityEvent::ArchiveCompleted {
            cycle,
            archived,
            missing,
        } => {
            let mut e = LogEntry::new(EventType::ArchiveComplete, Severity::Info);
            e.cycle = Some(cycle);
            e.count = Some(archived);
            if missing > 0 {
                e.details = Some(format!("{missing} sources already moved"));
            }
            e
        }
        ActivityEvent::ArchiveError {
            cycle,
            path,
            error_code,
            message,
        } => {
            let mut e = LogEntry::new(EventType::ArchiveError, Severity::Warning);
            e.cycle = Some(cycle);
            e.path = Some(path);
            e.error_code = Some(error_code);
            e.error_message = Some(message);
            e
        }
        ActivityEvent::Error { code, message } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Critical);
            e.error_code = Some(code);
            e.error_message = Some(message);
            e
        }
        ActivityEvent::Shutdown => LogEntry::new(EventType::SimulationStop, Severity::Info),
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn spawn_at(path: std::path::PathBuf) -> (ActivityLoggerHandle, thread::JoinHandle<()>) {
        let config = JsonlConfig {
            path,
            ..JsonlConfig::default()
        };
        spawn_logger(config, 64).unwrap()
    }

    #[test]
    fn events_reach_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let (handle, join) = spawn_at(path.clone());

        handle.send(ActivityEvent::SimulationStarted {
            version: "0.3.1".to_string(),
            interval_secs: 20,
        });
        handle.send(ActivityEvent::CycleCompleted {
            cycle: 1,
            mission: "ORBONE".to_string(),
            generated: 10,
            aggregated: 10,
            archived: 10,
            duration_ms: 12,
        });
        handle.shutdown();
        join.join().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"event\":\"simulation_start\""));
        assert!(raw.contains("\"event\":\"cycle_complete\""));
        assert!(raw.contains("\"mission\":\"ORBONE\""));
    }

    #[test]
    fn shutdown_sentinel_is_not_logged_as_an_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let (handle, join) = spawn_at(path.clone());

        handle.shutdown();
        join.join().unwrap();

        let raw = fs::read_to_string(&path).unwrap_or_default();
        assert!(raw.is_empty());
    }

    #[test]
    fn logger_thread_exits_when_all_handles_drop() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_at(dir.path().join("activity.jsonl"));
        drop(handle);
        join.join().unwrap();
    }

    #[test]
    fn handle_is_cloneable_across_threads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let (handle, join) = spawn_at(path.clone());

        let h2 = handle.clone();
        let worker = thread::spawn(move || {
            h2.send(ActivityEvent::Error {
                code: "APL-3900".to_string(),
                message: "from worker".to_string(),
            });
        });
        worker.join().unwrap();

        handle.shutdown();
        join.join().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("from worker"));
    }

    #[test]
    fn dropped_counter_starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_at(dir.path().join("activity.jsonl"));
        assert_eq!(handle.dropped_events(), 0);
        handle.shutdown();
        join.join().unwrap();
    }
}
