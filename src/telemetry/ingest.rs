//! Active-record ingestion: enumerate and parse the devices area.
//!
//! Malformed or unreadable record files are skipped and reported per-file;
//! they never fail the cycle. Only files present at enumeration time are
//! returned, so the archivist later moves exactly the set that was
//! aggregated. Records written mid-cycle wait for the next one.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::{AplError, Result};
use crate::telemetry::record::{RECORD_EXTENSION, Record};

/// One successfully parsed record together with its backing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRecord {
    /// Backing file in the devices area; doubles as the record's identity.
    pub path: PathBuf,
    /// Parsed contents.
    pub record: Record,
}

/// A record file that could not be ingested.
#[derive(Debug)]
pub struct MalformedRecord {
    pub path: PathBuf,
    pub error: AplError,
}

/// Snapshot of the active record set at one point in time.
#[derive(Debug, Default)]
pub struct ActiveRecords {
    /// Well-formed records, sorted by file name.
    pub entries: Vec<ActiveRecord>,
    /// Files skipped as ingestion errors.
    pub malformed: Vec<MalformedRecord>,
}

impl ActiveRecords {
    /// Enumerate and parse every `*.log` file under `devices_dir`.
    ///
    /// An unreadable directory is an error (the storage area is gone);
    /// individual file failures are collected in `malformed`.
    pub fn load(devices_dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = Vec::new();
        let dir = fs::read_dir(devices_dir).map_err(|source| AplError::io(devices_dir, source))?;
        for entry in dir {
            let entry = entry.map_err(|source| AplError::io(devices_dir, source))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut out = Self::default();
        for path in paths {
            match read_record(&path) {
                Ok(record) => out.entries.push(ActiveRecord { path, record }),
                Err(error) => out.malformed.push(MalformedRecord { path, error }),
            }
        }
        Ok(out)
    }

    /// Parsed records, without their backing paths.
    #[must_use]
    pub fn records(&self) -> Vec<&Record> {
        self.entries.iter().map(|e| &e.record).collect()
    }

    /// Backing paths of the well-formed records.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.malformed.is_empty()
    }
}

fn read_record(path: &Path) -> Result<Record> {
    let raw = fs::read_to_string(path).map_err(|source| AplError::io(path, source))?;
    serde_json::from_str(&raw).map_err(|error| AplError::RecordParse {
        path: path.to_path_buf(),
        details: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::record::DeviceStatus;

    fn write_record(dir: &Path, name: &str, mission: &str, status: DeviceStatus) {
        let record = Record::new(
            "010124120000".to_string(),
            mission.to_string(),
            "Satélite".to_string(),
            status,
        );
        fs::write(dir.join(name), serde_json::to_vec(&record).unwrap()).unwrap();
    }

    #[test]
    fn loads_all_well_formed_records_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "APLORBONE-0001001.log", "ORBONE", DeviceStatus::Good);
        write_record(dir.path(), "APLORBONE-0001000.log", "ORBONE", DeviceStatus::Killed);

        let active = ActiveRecords::load(dir.path()).unwrap();
        assert_eq!(active.entries.len(), 2);
        assert!(active.malformed.is_empty());
        assert!(active.entries[0].path < active.entries[1].path);
    }

    #[test]
    fn malformed_files_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "APLTMRS-0001000.log", "TMRS", DeviceStatus::Warning);
        fs::write(dir.path().join("APLTMRS-0001001.log"), b"{ not json").unwrap();
        fs::write(dir.path().join("APLTMRS-0001002.log"), b"{\"date\": 3}").unwrap();

        let active = ActiveRecords::load(dir.path()).unwrap();
        assert_eq!(active.entries.len(), 1);
        assert_eq!(active.malformed.len(), 2);
        for bad in &active.malformed {
            assert_eq!(bad.error.code(), "APL-2001");
        }
    }

    #[test]
    fn ignores_files_without_record_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "APLCLNM-0001000.log", "CLNM", DeviceStatus::Faulty);
        fs::write(dir.path().join("APLCLNM-0001001.tmp"), b"half-written").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();

        let active = ActiveRecords::load(dir.path()).unwrap();
        assert_eq!(active.entries.len(), 1);
        assert!(active.malformed.is_empty());
    }

    #[test]
    fn empty_directory_yields_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let active = ActiveRecords::load(dir.path()).unwrap();
        assert!(active.is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let err = ActiveRecords::load(&missing).unwrap_err();
        assert_eq!(err.code(), "APL-3002");
    }
}
