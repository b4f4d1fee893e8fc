//! Property-based tests for aggregation invariants.
//!
//! Uses `proptest` to verify, over arbitrary record sets: counter
//! conservation, all-statuses-present, percentage normalization, threshold
//! strictness, and idempotence.

use proptest::prelude::*;

use super::AnalysisResult;
use super::counts::EventCounts;
use super::derived::{compute_consolidation, compute_disconnections, compute_percentages};
use crate::telemetry::record::{DeviceStatus, Record};

const EPSILON: f64 = 1e-6;

// ──────────────────── strategies ────────────────────

fn arb_mission() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("ORBONE"),
        Just("CLNM"),
        Just("TMRS"),
        Just("GALXONE"),
        Just("UNKN"),
    ]
}

fn arb_device_type() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("Satélite"),
        Just("Nave"),
        Just("Traje"),
        Just("Vehículo espacial"),
    ]
}

fn arb_status() -> impl Strategy<Value = DeviceStatus> {
    prop_oneof![
        Just(DeviceStatus::Excellent),
        Just(DeviceStatus::Good),
        Just(DeviceStatus::Warning),
        Just(DeviceStatus::Faulty),
        Just(DeviceStatus::Killed),
        Just(DeviceStatus::Unknown),
    ]
}

fn arb_record() -> impl Strategy<Value = Record> {
    (arb_mission(), arb_device_type(), arb_status()).prop_map(|(mission, device_type, status)| {
        Record::new(
            "010124120000".to_string(),
            mission.to_string(),
            device_type.to_string(),
            status,
        )
    })
}

fn arb_records() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(arb_record(), 0..200)
}

// ──────────────────── properties ────────────────────

proptest! {
    #[test]
    fn pair_counter_sum_equals_matching_record_count(records in arb_records()) {
        let counts = EventCounts::from_records(&records);
        for (mission, device_type, pair) in counts.pairs() {
            let expected = records
                .iter()
                .filter(|r| r.mission == mission && r.device_type == device_type)
                .count() as u64;
            prop_assert_eq!(pair.total(), expected);
        }
    }

    #[test]
    fn no_record_is_dropped_or_double_counted(records in arb_records()) {
        let counts = EventCounts::from_records(&records);
        let total: u64 = counts.pairs().map(|(_, _, pair)| pair.total()).sum();
        prop_assert_eq!(total, records.len() as u64);
    }

    #[test]
    fn every_observed_pair_carries_all_six_statuses(records in arb_records()) {
        let counts = EventCounts::from_records(&records);
        for (_, _, pair) in counts.pairs() {
            prop_assert_eq!(pair.iter().count(), 6);
        }
    }

    #[test]
    fn percentages_normalize_to_hundred(records in arb_records()) {
        let counts = EventCounts::from_records(&records);
        let pct = compute_percentages(&counts);
        for devices in pct.values() {
            for shares in devices.values() {
                prop_assert!((shares.sum() - 100.0).abs() < EPSILON);
                for (_, share) in shares.iter() {
                    prop_assert!((0.0..=100.0 + EPSILON).contains(&share));
                }
            }
        }
    }

    #[test]
    fn disconnection_entries_strictly_exceed_threshold(
        records in arb_records(),
        threshold in 0u64..5,
    ) {
        let counts = EventCounts::from_records(&records);
        let flagged = compute_disconnections(&counts, threshold);
        for (mission, entries) in &flagged {
            for entry in entries {
                prop_assert!(entry.unknown_count > threshold);
                let pair = counts.get(mission, &entry.device_type).unwrap();
                prop_assert_eq!(pair.unknown, entry.unknown_count);
            }
        }
        // Completeness: every pair above threshold is flagged.
        for (mission, device_type, pair) in counts.pairs() {
            if pair.unknown > threshold {
                let entries = flagged.get(mission);
                prop_assert!(
                    entries.is_some_and(|es| es.iter().any(|e| e.device_type == device_type))
                );
            }
        }
    }

    #[test]
    fn consolidation_conserves_inoperable_count(records in arb_records()) {
        let counts = EventCounts::from_records(&records);
        let totals = compute_consolidation(&counts);
        let expected = records
            .iter()
            .filter(|r| r.device_status.is_inoperable())
            .count() as u64;
        let summed: u64 = totals.values().sum();
        prop_assert_eq!(summed, expected);
    }

    #[test]
    fn aggregation_is_idempotent(records in arb_records(), threshold in 0u64..5) {
        let first = AnalysisResult::compute(&records, threshold);
        let second = AnalysisResult::compute(&records, threshold);
        prop_assert_eq!(first, second);
    }
}
