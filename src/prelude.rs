//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use apolo_telemetry::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{AplError, Result};
pub use crate::core::layout::DataLayout;

// Telemetry
pub use crate::telemetry::generator::RecordGenerator;
pub use crate::telemetry::ingest::ActiveRecords;
pub use crate::telemetry::record::{DeviceStatus, Record};

// Analysis
pub use crate::analysis::AnalysisResult;
pub use crate::analysis::counts::{EventCounts, StatusCounts};
pub use crate::analysis::derived::{DisconnectionEntry, StatusShares};

// Report
pub use crate::report::dashboard::render_cycle_section;
pub use crate::report::store::ReportStore;

// Archive
pub use crate::archive::{ArchiveOutcome, Archivist};

// Simulation
pub use crate::sim::scheduler::{SimulationHandle, SimulationScheduler};

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
pub use crate::logger::jsonl::JsonlConfig;
