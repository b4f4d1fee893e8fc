//! Telemetry record model: status vocabulary, integrity hash, file naming.
//!
//! A record is one device-status observation, serialized as a single JSON
//! object per file. Records are immutable once written; identity is the
//! backing file name, which encodes mission, cycle id, and sequence index.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Reported condition of a simulated device. Exactly six values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Excellent,
    Good,
    Warning,
    Faulty,
    Killed,
    Unknown,
}

impl DeviceStatus {
    /// All statuses in canonical reporting order.
    pub const ALL: [Self; 6] = [
        Self::Excellent,
        Self::Good,
        Self::Warning,
        Self::Faulty,
        Self::Killed,
        Self::Unknown,
    ];

    /// Wire/report label for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Faulty => "faulty",
            Self::Killed => "killed",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a device in this status counts as inoperable.
    #[must_use]
    pub const fn is_inoperable(self) -> bool {
        matches!(self, Self::Killed | Self::Unknown)
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One telemetry observation, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Capture time, `%d%m%y%H%M%S`.
    pub date: String,
    /// Mission code (vocabulary plus the `UNKN` sentinel).
    pub mission: String,
    /// Device-type label.
    pub device_type: String,
    /// Reported status.
    pub device_status: DeviceStatus,
    /// SHA-256 over (date, mission, device_type, device_status).
    pub hash: String,
}

impl Record {
    /// Build a record, stamping the integrity hash.
    #[must_use]
    pub fn new(date: String, mission: String, device_type: String, status: DeviceStatus) -> Self {
        let hash = integrity_hash(&date, &mission, &device_type, status);
        Self {
            date,
            mission,
            device_type,
            device_status: status,
            hash,
        }
    }

    /// Recompute the content hash and compare against the stored one.
    /// Tamper evidence only; not used for dedup.
    #[must_use]
    pub fn integrity_ok(&self) -> bool {
        integrity_hash(&self.date, &self.mission, &self.device_type, self.device_status)
            == self.hash
    }
}

/// SHA-256 hex digest over the concatenated record fields.
#[must_use]
pub fn integrity_hash(date: &str, mission: &str, device_type: &str, status: DeviceStatus) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.as_bytes());
    hasher.update(mission.as_bytes());
    hasher.update(device_type.as_bytes());
    hasher.update(status.as_str().as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
}

/// File name for a record: `APL{mission}-{cycle:04}{seq:03}.log`.
#[must_use]
pub fn record_filename(mission: &str, cycle_id: u64, seq: u32) -> String {
    format!("APL{mission}-{cycle_id:04}{seq:03}.log")
}

/// Extension shared by record files in the devices and backup areas.
pub const RECORD_EXTENSION: &str = "log";
