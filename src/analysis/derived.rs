//! Analyses derived from [`EventCounts`]: disconnection flags, fleet-wide
//! consolidation, and percentage breakdowns.
//!
//! All three consume the same `EventCounts` value computed once per cycle,
//! never re-reading records from disk, so a cycle reports one consistent
//! view even if new records land mid-cycle.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::counts::{EventCounts, StatusCounts};
use crate::telemetry::record::DeviceStatus;

/// A device type flagged for exceeding the unknown-status threshold within
/// one mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectionEntry {
    pub device_type: String,
    pub unknown_count: u64,
}

/// Disconnection entries grouped by mission. Missions with no flagged
/// devices are absent.
pub type Disconnections = BTreeMap<String, Vec<DisconnectionEntry>>;

/// Fleet-wide inoperable-device totals per device type.
pub type ConsolidationTotals = BTreeMap<String, u64>;

/// Percentage share per status for one (mission, device_type) pair.
/// Always carries all six statuses; unobserved ones are 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusShares {
    pub excellent: f64,
    pub good: f64,
    pub warning: f64,
    pub faulty: f64,
    pub killed: f64,
    pub unknown: f64,
}

impl StatusShares {
    /// Share for one status.
    #[must_use]
    pub const fn get(&self, status: DeviceStatus) -> f64 {
        match status {
            DeviceStatus::Excellent => self.excellent,
            DeviceStatus::Good => self.good,
            DeviceStatus::Warning => self.warning,
            DeviceStatus::Faulty => self.faulty,
            DeviceStatus::Killed => self.killed,
            DeviceStatus::Unknown => self.unknown,
        }
    }

    /// (status, share) pairs in canonical reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (DeviceStatus, f64)> + '_ {
        DeviceStatus::ALL.into_iter().map(|s| (s, self.get(s)))
    }

    /// Sum over all six shares; ≈ 100 for any observed pair.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.iter().map(|(_, share)| share).sum()
    }

    /// Shares of one pair's counters. `counts.total()` must be non-zero,
    /// which holds for every pair present in an [`EventCounts`].
    #[must_use]
    pub fn from_counts(counts: &StatusCounts) -> Self {
        let total = counts.total() as f64;
        Self {
            excellent: counts.excellent as f64 / total * 100.0,
            good: counts.good as f64 / total * 100.0,
            warning: counts.warning as f64 / total * 100.0,
            faulty: counts.faulty as f64 / total * 100.0,
            killed: counts.killed as f64 / total * 100.0,
            unknown: counts.unknown as f64 / total * 100.0,
        }
    }
}

/// Percentage breakdown per mission and device type.
pub type Percentages = BTreeMap<String, BTreeMap<String, StatusShares>>;

/// Flag (mission, device_type) pairs whose `unknown` count strictly exceeds
/// `threshold`. Equal-to-threshold does not qualify.
#[must_use]
pub fn compute_disconnections(counts: &EventCounts, threshold: u64) -> Disconnections {
    let mut out = Disconnections::new();
    for (mission, device_type, pair) in counts.pairs() {
        if pair.unknown > threshold {
            out.entry(mission.to_string())
                .or_default()
                .push(DisconnectionEntry {
                    device_type: device_type.to_string(),
                    unknown_count: pair.unknown,
                });
        }
    }
    out
}

/// Sum inoperable devices (`killed + unknown`) per device type across all
/// missions: "how many of this device type are down fleet-wide".
#[must_use]
pub fn compute_consolidation(counts: &EventCounts) -> ConsolidationTotals {
    let mut out = ConsolidationTotals::new();
    for (_, device_type, pair) in counts.pairs() {
        *out.entry(device_type.to_string()).or_default() += pair.inoperable();
    }
    out
}

/// Percentage of each status within its (mission, device_type) pair.
///
/// A pair key only exists after at least one increment, so its total is
/// never zero.
#[must_use]
pub fn compute_percentages(counts: &EventCounts) -> Percentages {
    let mut out = Percentages::new();
    for (mission, device_type, pair) in counts.pairs() {
        out.entry(mission.to_string())
            .or_default()
            .insert(device_type.to_string(), StatusShares::from_counts(pair));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::record::Record;

    const EPSILON: f64 = 1e-6;

    fn record(mission: &str, device_type: &str, status: DeviceStatus) -> Record {
        Record::new(
            "010124120000".to_string(),
            mission.to_string(),
            device_type.to_string(),
            status,
        )
    }

    fn counts_of(records: &[Record]) -> EventCounts {
        EventCounts::from_records(records)
    }

    #[test]
    fn disconnection_threshold_is_strict() {
        let two_unknown = counts_of(&[
            record("ORBONE", "Satélite", DeviceStatus::Unknown),
            record("ORBONE", "Satélite", DeviceStatus::Unknown),
        ]);
        let flagged = compute_disconnections(&two_unknown, 1);
        assert_eq!(flagged.len(), 1);
        let entries = &flagged["ORBONE"];
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].device_type, "Satélite");
        assert_eq!(entries[0].unknown_count, 2);

        let one_unknown = counts_of(&[record("ORBONE", "Satélite", DeviceStatus::Unknown)]);
        assert!(compute_disconnections(&one_unknown, 1).is_empty());
    }

    #[test]
    fn disconnections_group_by_mission() {
        let counts = counts_of(&[
            record("ORBONE", "Nave", DeviceStatus::Unknown),
            record("ORBONE", "Nave", DeviceStatus::Unknown),
            record("TMRS", "Traje", DeviceStatus::Unknown),
            record("TMRS", "Traje", DeviceStatus::Unknown),
            record("TMRS", "Traje", DeviceStatus::Unknown),
        ]);
        let flagged = compute_disconnections(&counts, 1);
        assert_eq!(flagged.len(), 2);
        assert_eq!(flagged["TMRS"][0].unknown_count, 3);
    }

    #[test]
    fn consolidation_sums_across_missions() {
        // Two missions each contributing killed:1 + unknown:1 for Satélite.
        let counts = counts_of(&[
            record("ORBONE", "Satélite", DeviceStatus::Killed),
            record("ORBONE", "Satélite", DeviceStatus::Unknown),
            record("TMRS", "Satélite", DeviceStatus::Killed),
            record("TMRS", "Satélite", DeviceStatus::Unknown),
        ]);
        let totals = compute_consolidation(&counts);
        assert_eq!(totals["Satélite"], 4);
    }

    #[test]
    fn consolidation_ignores_operable_statuses() {
        let counts = counts_of(&[
            record("CLNM", "Nave", DeviceStatus::Excellent),
            record("CLNM", "Nave", DeviceStatus::Warning),
            record("CLNM", "Nave", DeviceStatus::Faulty),
        ]);
        let totals = compute_consolidation(&counts);
        assert_eq!(totals["Nave"], 0);
    }

    #[test]
    fn percentages_cover_all_statuses_and_sum_to_hundred() {
        let counts = counts_of(&[
            record("GALXONE", "Traje", DeviceStatus::Excellent),
            record("GALXONE", "Traje", DeviceStatus::Excellent),
            record("GALXONE", "Traje", DeviceStatus::Excellent),
            record("GALXONE", "Traje", DeviceStatus::Good),
        ]);
        let pct = compute_percentages(&counts);
        let shares = &pct["GALXONE"]["Traje"];

        assert!((shares.excellent - 75.0).abs() < EPSILON);
        assert!((shares.good - 25.0).abs() < EPSILON);
        assert!(shares.warning.abs() < EPSILON);
        assert!(shares.faulty.abs() < EPSILON);
        assert!(shares.killed.abs() < EPSILON);
        assert!(shares.unknown.abs() < EPSILON);
        assert!((shares.sum() - 100.0).abs() < EPSILON);
    }

    #[test]
    fn percentages_only_cover_observed_pairs() {
        let counts = counts_of(&[record("UNKN", "Satélite", DeviceStatus::Unknown)]);
        let pct = compute_percentages(&counts);
        assert_eq!(pct.len(), 1);
        assert_eq!(pct["UNKN"].len(), 1);
        assert!((pct["UNKN"]["Satélite"].unknown - 100.0).abs() < EPSILON);
    }
}
