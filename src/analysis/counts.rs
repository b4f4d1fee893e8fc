//! Per-(mission, device_type) status counting, the base analysis every
//! other analysis is derived from.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::telemetry::record::{DeviceStatus, Record};

/// Counters for all six statuses of one (mission, device_type) pair.
///
/// Every status field exists from construction, so consumers never observe a
/// missing status key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCounts {
    pub excellent: u64,
    pub good: u64,
    pub warning: u64,
    pub faulty: u64,
    pub killed: u64,
    pub unknown: u64,
}

impl StatusCounts {
    /// Counter for one status.
    #[must_use]
    pub const fn get(&self, status: DeviceStatus) -> u64 {
        match status {
            DeviceStatus::Excellent => self.excellent,
            DeviceStatus::Good => self.good,
            DeviceStatus::Warning => self.warning,
            DeviceStatus::Faulty => self.faulty,
            DeviceStatus::Killed => self.killed,
            DeviceStatus::Unknown => self.unknown,
        }
    }

    /// Increment the counter for one status.
    pub const fn increment(&mut self, status: DeviceStatus) {
        match status {
            DeviceStatus::Excellent => self.excellent += 1,
            DeviceStatus::Good => self.good += 1,
            DeviceStatus::Warning => self.warning += 1,
            DeviceStatus::Faulty => self.faulty += 1,
            DeviceStatus::Killed => self.killed += 1,
            DeviceStatus::Unknown => self.unknown += 1,
        }
    }

    /// Sum over all six counters.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.excellent + self.good + self.warning + self.faulty + self.killed + self.unknown
    }

    /// Devices counted as inoperable: `killed + unknown`.
    #[must_use]
    pub const fn inoperable(&self) -> u64 {
        self.killed + self.unknown
    }

    /// (status, count) pairs in canonical reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (DeviceStatus, u64)> + '_ {
        DeviceStatus::ALL.into_iter().map(|s| (s, self.get(s)))
    }
}

/// Event counts per mission and device type.
///
/// BTreeMap keys give deterministic iteration, so serialized reports and
/// rendered dashboards are stable for a given record set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCounts(BTreeMap<String, BTreeMap<String, StatusCounts>>);

impl EventCounts {
    /// Count a record set, grouping by (mission, device_type).
    ///
    /// Only well-formed records reach this function; the ingester has
    /// already filtered out malformed files.
    #[must_use]
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut counts = Self::default();
        for record in records {
            counts.record(&record.mission, &record.device_type, record.device_status);
        }
        counts
    }

    /// Register one observation.
    pub fn record(&mut self, mission: &str, device_type: &str, status: DeviceStatus) {
        self.0
            .entry(mission.to_string())
            .or_default()
            .entry(device_type.to_string())
            .or_default()
            .increment(status);
    }

    /// Counters for one (mission, device_type) pair, if observed.
    #[must_use]
    pub fn get(&self, mission: &str, device_type: &str) -> Option<&StatusCounts> {
        self.0.get(mission).and_then(|d| d.get(device_type))
    }

    /// Iterate `(mission, device_type, counts)` in key order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, &StatusCounts)> {
        self.0.iter().flat_map(|(mission, devices)| {
            devices
                .iter()
                .map(move |(device_type, counts)| (mission.as_str(), device_type.as_str(), counts))
        })
    }

    /// Iterate missions in key order.
    pub fn missions(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, StatusCounts>)> {
        self.0.iter().map(|(m, d)| (m.as_str(), d))
    }

    /// Whether any record was counted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of (mission, device_type) pairs observed.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }
}
