//! Simulation scheduler: drives the repeating
//! generate → aggregate → persist → archive cycle.
//!
//! One background thread runs the loop; everything else in the process reads
//! only persisted artifacts (or the status snapshot behind the handle).
//! Stopping is cooperative: the in-flight iteration always completes, and
//! the stop signal doubles as the inter-cycle wait channel so shutdown does
//! not have to sit out a full interval.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::RwLock;
use rand::Rng;

use crate::analysis::AnalysisResult;
use crate::archive::Archivist;
use crate::core::config::Config;
use crate::core::errors::{AplError, Result};
use crate::core::layout::DataLayout;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::report::store::ReportStore;
use crate::telemetry::generator::RecordGenerator;
use crate::telemetry::ingest::ActiveRecords;

/// Per-cycle accounting, published in the status snapshot and logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Cycle this outcome belongs to.
    pub cycle_id: u64,
    /// Mission the generator produced records for this cycle.
    pub mission: String,
    /// Records written by the generator.
    pub generated: u64,
    /// Well-formed records aggregated (the full active set, not just this
    /// cycle's).
    pub aggregated: u64,
    /// Files skipped as ingestion errors.
    pub malformed: u64,
    /// Files moved to backup.
    pub archived: u64,
    /// Archive sources already gone.
    pub archive_missing: u64,
    /// Archive moves that failed.
    pub archive_failed: u64,
    /// Snapshot artifact written for this cycle.
    pub report_path: PathBuf,
}

/// Scheduler-owned state, readable through [`SimulationHandle::status`].
#[derive(Debug, Clone, Default)]
pub struct SchedulerStatus {
    /// Whether the loop is between `start` and its exit.
    pub running: bool,
    /// Id of the most recently started cycle (monotonic from 1).
    pub cycle_id: u64,
    /// Outcome of the most recent successful cycle.
    pub last_outcome: Option<CycleOutcome>,
}

/// Owns the cycle pipeline and the loop that drives it.
pub struct SimulationScheduler {
    layout: DataLayout,
    missions: Vec<String>,
    disconnection_threshold: u64,
    interval: Duration,
    generator: RecordGenerator,
    report_store: ReportStore,
    archivist: Archivist,
    logger: ActivityLoggerHandle,
    status: Arc<RwLock<SchedulerStatus>>,
}

impl std::fmt::Debug for SimulationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationScheduler")
            .field("layout", &self.layout)
            .field("missions", &self.missions)
            .field("disconnection_threshold", &self.disconnection_threshold)
            .field("interval", &self.interval)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl SimulationScheduler {
    /// Wire the pipeline from a validated config. Creates the storage
    /// directories; an uncreatable directory is fatal here, before the
    /// loop begins.
    pub fn new(config: &Config, logger: ActivityLoggerHandle) -> Result<Self> {
        let layout = DataLayout::from_config(config);
        layout.ensure()?;

        let generator = RecordGenerator::new(layout.devices_dir.clone(), &config.simulation);
        let report_store = ReportStore::new(layout.reports_dir.clone());
        let archivist = Archivist::new(layout.backup_dir.clone());

        Ok(Self {
            layout,
            missions: config.simulation.missions.clone(),
            disconnection_threshold: config.analysis.disconnection_threshold,
            interval: Duration::from_secs(config.simulation.interval_secs),
            generator,
            report_store,
            archivist,
            logger,
            status: Arc::new(RwLock::new(SchedulerStatus::default())),
        })
    }

    /// Shared status snapshot handle.
    #[must_use]
    pub fn status_handle(&self) -> Arc<RwLock<SchedulerStatus>> {
        Arc::clone(&self.status)
    }

    /// Configured inter-cycle interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Execute one full cycle.
    ///
    /// Errors returned here fail this cycle only; the loop logs them and
    /// proceeds to the next interval.
    pub fn run_cycle(&self, cycle_id: u64) -> Result<CycleOutcome> {
        let mission = self.pick_mission()?;

        let batch = self.generator.generate_cycle(&mission, cycle_id)?;
        self.logger.send(ActivityEvent::RecordsGenerated {
            cycle: cycle_id,
            mission: mission.clone(),
            count: u64::from(batch.count),
        });

        // Snapshot the active set once; the archivist later moves exactly
        // these files, so records landing mid-cycle wait for the next one.
        let active = ActiveRecords::load(&self.layout.devices_dir)?;
        for bad in &active.malformed {
            self.logger.send(ActivityEvent::IngestionError {
                cycle: cycle_id,
                path: bad.path.display().to_string(),
                error_code: bad.error.code().to_string(),
                message: bad.error.to_string(),
            });
        }

        let analysis = AnalysisResult::compute(active.records(), self.disconnection_threshold);

        // Persist before archiving: a crash here leaves the records in the
        // active area for re-aggregation rather than losing them.
        let report_path = self.report_store.persist(&analysis, cycle_id)?;
        self.logger.send(ActivityEvent::ReportPersisted {
            cycle: cycle_id,
            path: report_path.display().to_string(),
        });

        let archive = self.archivist.archive(&active.paths());
        for (path, error) in &archive.failed {
            self.logger.send(ActivityEvent::ArchiveError {
                cycle: cycle_id,
                path: path.display().to_string(),
                error_code: error.code().to_string(),
                message: error.to_string(),
            });
        }
        self.logger.send(ActivityEvent::ArchiveCompleted {
            cycle: cycle_id,
            archived: archive.archived,
            missing: archive.missing.len() as u64,
        });

        Ok(CycleOutcome {
            cycle_id,
            mission,
            generated: u64::from(batch.count),
            aggregated: active.entries.len() as u64,
            malformed: active.malformed.len() as u64,
            archived: archive.archived,
            archive_missing: archive.missing.len() as u64,
            archive_failed: archive.failed.len() as u64,
            report_path,
        })
    }

    /// Run the loop on the calling thread until `stop_rx` signals (or all
    /// senders drop).
    ///
    /// A failed cycle is logged and the loop proceeds to the next interval;
    /// a single bad cycle never kills the scheduler.
    pub fn start(&self, interval: Duration, stop_rx: &Receiver<()>) {
        {
            let mut status = self.status.write();
            status.running = true;
            status.cycle_id = 0;
        }
        self.logger.send(ActivityEvent::SimulationStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            interval_secs: interval.as_secs(),
        });

        let mut cycle_id: u64 = 0;
        loop {
            cycle_id += 1;
            self.status.write().cycle_id = cycle_id;

            let started = Instant::now();
            match self.run_cycle(cycle_id) {
                Ok(outcome) => {
                    self.logger.send(ActivityEvent::CycleCompleted {
                        cycle: cycle_id,
                        mission: outcome.mission.clone(),
                        generated: outcome.generated,
                        aggregated: outcome.aggregated,
                        archived: outcome.archived,
                        duration_ms: started.elapsed().as_millis() as u64,
                    });
                    self.status.write().last_outcome = Some(outcome);
                }
                Err(error) => {
                    self.logger.send(ActivityEvent::CycleFailed {
                        cycle: cycle_id,
                        error_code: error.code().to_string(),
                        message: error.to_string(),
                    });
                }
            }

            // Interruptible inter-cycle wait, keyed on the stop signal.
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.status.write().running = false;
        self.logger.send(ActivityEvent::SimulationStopped {
            reason: "stop requested".to_string(),
            cycles_completed: cycle_id,
        });
    }

    /// Launch the loop on a background thread with the configured interval.
    ///
    /// Does not block; the caller keeps working (e.g. the read-only
    /// dashboard viewer) and stops the simulation through the returned
    /// handle.
    pub fn run(self) -> Result<SimulationHandle> {
        let interval = self.interval;
        self.run_with_interval(interval)
    }

    /// Launch the loop with an explicit interval override.
    pub fn run_with_interval(self, interval: Duration) -> Result<SimulationHandle> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let status = Arc::clone(&self.status);

        let join = thread::Builder::new()
            .name("aplsim-cycle".to_string())
            .spawn(move || {
                self.start(interval, &stop_rx);
            })
            .map_err(|e| AplError::Runtime {
                details: format!("failed to spawn simulation thread: {e}"),
            })?;

        Ok(SimulationHandle {
            stop_tx,
            join: Some(join),
            status,
        })
    }

    fn pick_mission(&self) -> Result<String> {
        if self.missions.is_empty() {
            return Err(AplError::Runtime {
                details: "mission vocabulary is empty".to_string(),
            });
        }
        let idx = rand::rng().random_range(0..self.missions.len());
        Ok(self.missions[idx].clone())
    }
}

/// Controlled handle over a running simulation loop.
pub struct SimulationHandle {
    stop_tx: Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    status: Arc<RwLock<SchedulerStatus>>,
}

impl SimulationHandle {
    /// Request cooperative stop and wait for the loop to finish.
    ///
    /// The in-flight iteration (if any) completes; only the inter-cycle
    /// wait is cut short.
    pub fn stop(mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    /// Whether the loop is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status.read().running
    }

    /// Snapshot of the scheduler state.
    #[must_use]
    pub fn status(&self) -> SchedulerStatus {
        self.status.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::activity::spawn_logger;
    use crate::logger::jsonl::JsonlConfig;
    use std::fs;
    use std::path::Path;

    fn test_config(base: &Path) -> Config {
        let mut config = Config::default();
        config.paths.base_dir = base.to_path_buf();
        config.simulation.min_records_per_cycle = 2;
        config.simulation.max_records_per_cycle = 6;
        config.simulation.interval_secs = 60;
        config
    }

    fn test_scheduler(base: &Path) -> (SimulationScheduler, thread::JoinHandle<()>) {
        let config = test_config(base);
        let (logger, join) = spawn_logger(
            JsonlConfig {
                path: config.paths.jsonl_log(),
                ..JsonlConfig::default()
            },
            64,
        )
        .unwrap();
        let scheduler = SimulationScheduler::new(&config, logger).unwrap();
        (scheduler, join)
    }

    #[test]
    fn one_cycle_archives_everything_it_aggregated() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, _logger_join) = test_scheduler(dir.path());

        let outcome = scheduler.run_cycle(1).unwrap();
        assert_eq!(outcome.cycle_id, 1);
        assert!(outcome.generated >= 2);
        assert_eq!(outcome.aggregated, outcome.generated);
        assert_eq!(outcome.archived, outcome.aggregated);
        assert_eq!(outcome.archive_failed, 0);
        assert_eq!(outcome.malformed, 0);

        // Active area drained, backups populated, one report + dashboard.
        let devices = dir.path().join("devices");
        assert_eq!(fs::read_dir(&devices).unwrap().count(), 0);
        let backups = dir.path().join("backups");
        assert_eq!(
            fs::read_dir(&backups).unwrap().count() as u64,
            outcome.archived
        );
        assert!(outcome.report_path.exists());
        assert!(dir.path().join("reports").join("Dashboard.md").exists());
    }

    #[test]
    fn malformed_records_do_not_fail_the_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, _logger_join) = test_scheduler(dir.path());

        let devices = dir.path().join("devices");
        fs::write(devices.join("APLBAD-0001000.log"), b"garbage").unwrap();

        let outcome = scheduler.run_cycle(1).unwrap();
        assert_eq!(outcome.malformed, 1);
        assert_eq!(outcome.aggregated, outcome.generated);
        // The malformed file was not archived and stays in the active area.
        assert!(devices.join("APLBAD-0001000.log").exists());
    }

    #[test]
    fn status_reflects_run_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, logger_join) = test_scheduler(dir.path());
        let logger_stop = {
            // Keep a handle to shut the logger down after the run.
            scheduler.logger.clone()
        };

        let handle = scheduler.run().unwrap();

        // Wait for the first cycle to land.
        let deadline = Instant::now() + Duration::from_secs(10);
        while handle.status().last_outcome.is_none() {
            assert!(Instant::now() < deadline, "first cycle never completed");
            thread::sleep(Duration::from_millis(10));
        }
        assert!(handle.is_running());
        let status = handle.status();
        assert_eq!(status.cycle_id, 1);

        handle.stop();
        logger_stop.shutdown();
        logger_join.join().unwrap();
    }

    #[test]
    fn stop_interrupts_the_intercycle_wait() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, _logger_join) = test_scheduler(dir.path());

        // 60s interval: without an interruptible wait this test would hang.
        let started = Instant::now();
        let handle = scheduler.run().unwrap();
        while handle.status().last_outcome.is_none() {
            thread::sleep(Duration::from_millis(10));
        }
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn exactly_one_cycle_when_stopped_within_first_interval() {
        let dir = tempfile::tempdir().unwrap();
        let (scheduler, _logger_join) = test_scheduler(dir.path());

        let handle = scheduler.run().unwrap();
        while handle.status().last_outcome.is_none() {
            thread::sleep(Duration::from_millis(10));
        }
        handle.stop();

        let reports: Vec<_> = fs::read_dir(dir.path().join("reports"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("APLSTATS-REPORTE-")
            })
            .collect();
        assert_eq!(reports.len(), 1);

        let dashboard =
            fs::read_to_string(dir.path().join("reports").join("Dashboard.md")).unwrap();
        assert_eq!(dashboard.matches("# Análisis para Ciclo").count(), 1);
        assert_eq!(fs::read_dir(dir.path().join("devices")).unwrap().count(), 0);
    }

    #[test]
    fn new_fails_when_layout_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("base");
        fs::write(&blocker, b"file").unwrap();

        let config = test_config(&blocker);
        let (logger, logger_join) = spawn_logger(
            JsonlConfig {
                path: dir.path().join("activity.jsonl"),
                ..JsonlConfig::default()
            },
            64,
        )
        .unwrap();

        let err = SimulationScheduler::new(&config, logger.clone()).unwrap_err();
        assert_eq!(err.code(), "APL-3002");
        logger.shutdown();
        logger_join.join().unwrap();
    }
}
