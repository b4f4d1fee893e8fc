//! On-disk storage layout: devices, backups, and reports directories.

use std::fs;
use std::path::PathBuf;

use crate::core::config::Config;
use crate::core::errors::{AplError, Result};

/// Resolved storage directories for one simulator instance.
///
/// A record file lives in exactly one of `devices_dir` (active) or
/// `backup_dir` (archived) at any observable time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    /// Active record storage, mutated by the generator (adds) and the
    /// archivist (removes).
    pub devices_dir: PathBuf,
    /// Archived record storage.
    pub backup_dir: PathBuf,
    /// Report snapshots and the cumulative dashboard.
    pub reports_dir: PathBuf,
}

impl DataLayout {
    /// Resolve the layout from a validated config.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            devices_dir: config.paths.devices_dir(),
            backup_dir: config.paths.backup_dir(),
            reports_dir: config.paths.reports_dir(),
        }
    }

    /// Create all storage directories.
    ///
    /// An uncreatable directory is a startup-time configuration error and
    /// unrecoverable; nothing else in the simulator treats IO failures as
    /// fatal.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.devices_dir, &self.backup_dir, &self.reports_dir] {
            fs::create_dir_all(dir).map_err(|source| AplError::io(dir, source))?;
        }
        Ok(())
    }

    /// Path of the cumulative dashboard artifact.
    #[must_use]
    pub fn dashboard_path(&self) -> PathBuf {
        self.reports_dir.join("Dashboard.md")
    }
}
