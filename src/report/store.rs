//! Report persistence: one JSON snapshot per cycle plus the cumulative
//! append-only dashboard.
//!
//! The snapshot is written via temp-file-then-rename before the dashboard
//! append, and the scheduler archives records only after `persist` returns,
//! so a crash mid-cycle leaves the records in place for re-aggregation.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::analysis::AnalysisResult;
use crate::core::errors::{AplError, Result};
use crate::report::dashboard::render_cycle_section;

/// Fixed name prefix for report snapshot files.
pub const REPORT_PREFIX: &str = "APLSTATS-REPORTE-";

/// Name of the cumulative dashboard artifact.
pub const DASHBOARD_FILENAME: &str = "Dashboard.md";

/// Persists per-cycle analysis artifacts under the reports directory.
pub struct ReportStore {
    reports_dir: PathBuf,
}

impl ReportStore {
    /// Build a store over the given reports directory.
    #[must_use]
    pub fn new(reports_dir: PathBuf) -> Self {
        Self { reports_dir }
    }

    /// Path of the cumulative dashboard artifact.
    #[must_use]
    pub fn dashboard_path(&self) -> PathBuf {
        self.reports_dir.join(DASHBOARD_FILENAME)
    }

    /// Persist one cycle: write the snapshot, then append the dashboard
    /// section. Returns the snapshot path.
    pub fn persist(&self, analysis: &AnalysisResult, cycle_id: u64) -> Result<PathBuf> {
        let path = self.reports_dir.join(report_filename_now());
        let data = serde_json::to_vec(analysis)?;

        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, data).map_err(|source| AplError::io(&tmp_path, source))?;
        fs::rename(&tmp_path, &path).map_err(|source| AplError::io(&path, source))?;

        self.append_dashboard_section(analysis, cycle_id)?;
        Ok(path)
    }

    /// Snapshot paths under the reports directory, sorted by name (and so
    /// by timestamp).
    pub fn list_reports(&self) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        let dir =
            fs::read_dir(&self.reports_dir).map_err(|source| AplError::io(&self.reports_dir, source))?;
        for entry in dir {
            let entry = entry.map_err(|source| AplError::io(&self.reports_dir, source))?;
            let path = entry.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(REPORT_PREFIX) && n.ends_with(".log"))
            {
                out.push(path);
            }
        }
        out.sort();
        Ok(out)
    }

    /// Load one snapshot back into memory (read-only viewer path).
    pub fn load_report(&self, path: &Path) -> Result<AnalysisResult> {
        let raw = fs::read_to_string(path).map_err(|source| AplError::io(path, source))?;
        serde_json::from_str(&raw).map_err(|error| AplError::Serialization {
            context: "report",
            details: format!("{}: {error}", path.display()),
        })
    }

    /// Append one cycle's section to `Dashboard.md`. Never truncates or
    /// reorders prior sections.
    fn append_dashboard_section(&self, analysis: &AnalysisResult, cycle_id: u64) -> Result<()> {
        let path = self.dashboard_path();
        let section = render_cycle_section(analysis, cycle_id);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AplError::io(&path, source))?;
        file.write_all(section.as_bytes())
            .map_err(|source| AplError::io(&path, source))?;
        Ok(())
    }
}

/// Snapshot file name stamped with the current local time.
///
/// Millisecond precision keeps names unique even at sub-second cycle rates.
#[must_use]
pub fn report_filename_now() -> String {
    format!(
        "{REPORT_PREFIX}{}.log",
        Local::now().format("%d%m%y%H%M%S%3f")
    )
}
