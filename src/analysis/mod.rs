//! Aggregation engine: pure transforms from a record set to the four
//! per-cycle analyses.

pub mod counts;
pub mod derived;

#[cfg(test)]
mod test_properties;

use serde::{Deserialize, Serialize};

use crate::analysis::counts::EventCounts;
use crate::analysis::derived::{
    ConsolidationTotals, Disconnections, Percentages, compute_consolidation,
    compute_disconnections, compute_percentages,
};
use crate::telemetry::record::Record;

/// The four analyses computed once per cycle, in report wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub events_analysis: EventCounts,
    pub disconnection_management: Disconnections,
    pub consolidation: ConsolidationTotals,
    pub percentage_calculation: Percentages,
}

impl AnalysisResult {
    /// Compute all four analyses from one record set.
    ///
    /// The event counts are computed exactly once and feed the other three
    /// analyses, so every section of the result reflects the same view of
    /// the record set.
    #[must_use]
    pub fn compute<'a, I>(records: I, disconnection_threshold: u64) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let events_analysis = EventCounts::from_records(records);
        let disconnection_management =
            compute_disconnections(&events_analysis, disconnection_threshold);
        let consolidation = compute_consolidation(&events_analysis);
        let percentage_calculation = compute_percentages(&events_analysis);
        Self {
            events_analysis,
            disconnection_management,
            consolidation,
            percentage_calculation,
        }
    }
}
