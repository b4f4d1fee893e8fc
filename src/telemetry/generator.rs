//! Synthetic record generator: one randomized batch of device-status
//! records per (mission, cycle).
//!
//! Each record is written to a temporary file and renamed into place, so a
//! record is never visible to ingestion half-written.

use std::fs;
use std::path::PathBuf;

use chrono::Local;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::core::config::SimulationConfig;
use crate::core::errors::{AplError, Result};
use crate::telemetry::record::{DeviceStatus, Record, record_filename};

/// Writes randomized telemetry records into the active devices area.
pub struct RecordGenerator {
    devices_dir: PathBuf,
    device_types: Vec<String>,
    min_records: u32,
    max_records: u32,
}

/// Outcome of one generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBatch {
    /// Records written.
    pub count: u32,
    /// Shared capture timestamp stamped into every record of the batch.
    pub timestamp: String,
}

impl RecordGenerator {
    /// Build a generator over the given devices directory.
    #[must_use]
    pub fn new(devices_dir: PathBuf, simulation: &SimulationConfig) -> Self {
        Self {
            devices_dir,
            device_types: simulation.device_types.clone(),
            min_records: simulation.min_records_per_cycle,
            max_records: simulation.max_records_per_cycle,
        }
    }

    /// Generate one batch of records for `mission` and `cycle_id`.
    ///
    /// The batch size is uniform in the configured range; device type and
    /// status are uniform over their vocabularies.
    pub fn generate_cycle(&self, mission: &str, cycle_id: u64) -> Result<GeneratedBatch> {
        let timestamp = capture_timestamp();
        let mut rng = rand::rng();
        let count = rng.random_range(self.min_records..=self.max_records);

        for seq in 0..count {
            let device_type = self
                .device_types
                .choose(&mut rng)
                .ok_or_else(|| AplError::Runtime {
                    details: "device type vocabulary is empty".to_string(),
                })?
                .clone();
            let status = DeviceStatus::ALL[rng.random_range(0..DeviceStatus::ALL.len())];

            let record = Record::new(timestamp.clone(), mission.to_string(), device_type, status);
            self.write_record(&record_filename(mission, cycle_id, seq), &record)?;
        }

        Ok(GeneratedBatch { count, timestamp })
    }

    /// Write one record atomically: serialize to `<name>.tmp`, then rename.
    fn write_record(&self, filename: &str, record: &Record) -> Result<()> {
        let target = self.devices_dir.join(filename);
        let tmp_path = target.with_extension("tmp");

        let data = serde_json::to_vec(record)?;
        fs::write(&tmp_path, data).map_err(|source| AplError::io(&tmp_path, source))?;
        fs::rename(&tmp_path, &target).map_err(|source| AplError::io(&target, source))?;
        Ok(())
    }
}

/// Local capture time in the record wire format (`%d%m%y%H%M%S`).
#[must_use]
pub fn capture_timestamp() -> String {
    Local::now().format("%d%m%y%H%M%S").to_string()
}
