//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{AplError, Result};

/// Full simulator configuration model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub simulation: SimulationConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

/// Filesystem layout for record, backup, and report storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub base_dir: PathBuf,
    /// Active record storage. Defaults to `<base_dir>/devices`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices_dir: Option<PathBuf>,
    /// Archived record storage. Defaults to `<base_dir>/backups`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
    /// Report and dashboard artifacts. Defaults to `<base_dir>/reports`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,
    /// Activity log. Defaults to `<base_dir>/activity.jsonl`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsonl_log: Option<PathBuf>,
}

/// Cycle cadence and synthetic record generation knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seconds between cycles.
    pub interval_secs: u64,
    pub min_records_per_cycle: u32,
    pub max_records_per_cycle: u32,
    /// Mission vocabulary, sentinel included.
    pub missions: Vec<String>,
    pub device_types: Vec<String>,
}

/// Aggregation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// A (mission, device_type) pair is flagged disconnected when its
    /// `unknown` count strictly exceeds this value.
    pub disconnection_threshold: u64,
}

/// Activity-log tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
    pub channel_capacity: usize,
}

/// Default mission vocabulary, `UNKN` sentinel last.
pub const DEFAULT_MISSIONS: [&str; 5] = ["ORBONE", "CLNM", "TMRS", "GALXONE", "UNKN"];

/// Default device-type vocabulary.
pub const DEFAULT_DEVICE_TYPES: [&str; 4] = ["Satélite", "Nave", "Traje", "Vehículo espacial"];

fn default_base_dir() -> PathBuf {
    let home_dir = env::var_os("HOME").map_or_else(
        || {
            eprintln!("[APL-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    );
    home_dir.join(".local").join("share").join("aplsim")
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[APL-CONFIG] WARNING: HOME not set, falling back to /tmp for config path"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("aplsim").join("config.toml"),
            base_dir: default_base_dir(),
            devices_dir: None,
            backup_dir: None,
            reports_dir: None,
            jsonl_log: None,
        }
    }
}

impl PathsConfig {
    /// Active record directory, resolved against `base_dir`.
    #[must_use]
    pub fn devices_dir(&self) -> PathBuf {
        self.devices_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("devices"))
    }

    /// Backup record directory, resolved against `base_dir`.
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.backup_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("backups"))
    }

    /// Report directory, resolved against `base_dir`.
    #[must_use]
    pub fn reports_dir(&self) -> PathBuf {
        self.reports_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("reports"))
    }

    /// Activity log path, resolved against `base_dir`.
    #[must_use]
    pub fn jsonl_log(&self) -> PathBuf {
        self.jsonl_log
            .clone()
            .unwrap_or_else(|| self.base_dir.join("activity.jsonl"))
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval_secs: 20,
            min_records_per_cycle: 1,
            max_records_per_cycle: 100,
            missions: DEFAULT_MISSIONS.iter().map(ToString::to_string).collect(),
            device_types: DEFAULT_DEVICE_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            disconnection_threshold: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 100 * 1024 * 1024, // 100 MiB
            max_rotated_files: 5,
            channel_capacity: 1024,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| AplError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(AplError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        // paths
        if let Some(raw) = env_var("APLSIM_BASE_DIR") {
            self.paths.base_dir = PathBuf::from(raw);
        }
        if let Some(raw) = env_var("APLSIM_DEVICES_DIR") {
            self.paths.devices_dir = Some(PathBuf::from(raw));
        }
        if let Some(raw) = env_var("APLSIM_BACKUP_DIR") {
            self.paths.backup_dir = Some(PathBuf::from(raw));
        }
        if let Some(raw) = env_var("APLSIM_REPORTS_DIR") {
            self.paths.reports_dir = Some(PathBuf::from(raw));
        }
        if let Some(raw) = env_var("APLSIM_JSONL_LOG") {
            self.paths.jsonl_log = Some(PathBuf::from(raw));
        }

        // simulation
        set_env_u64(
            "APLSIM_SIMULATION_INTERVAL_SECS",
            &mut self.simulation.interval_secs,
        )?;
        set_env_u32(
            "APLSIM_SIMULATION_MIN_RECORDS_PER_CYCLE",
            &mut self.simulation.min_records_per_cycle,
        )?;
        set_env_u32(
            "APLSIM_SIMULATION_MAX_RECORDS_PER_CYCLE",
            &mut self.simulation.max_records_per_cycle,
        )?;

        // analysis
        set_env_u64(
            "APLSIM_ANALYSIS_DISCONNECTION_THRESHOLD",
            &mut self.analysis.disconnection_threshold,
        )?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.simulation.interval_secs == 0 {
            return Err(AplError::InvalidConfig {
                details: "simulation.interval_secs must be >= 1".to_string(),
            });
        }
        if self.simulation.min_records_per_cycle == 0 {
            return Err(AplError::InvalidConfig {
                details: "simulation.min_records_per_cycle must be >= 1".to_string(),
            });
        }
        if self.simulation.min_records_per_cycle > self.simulation.max_records_per_cycle {
            return Err(AplError::InvalidConfig {
                details: format!(
                    "simulation.min_records_per_cycle ({}) must not exceed max_records_per_cycle ({})",
                    self.simulation.min_records_per_cycle, self.simulation.max_records_per_cycle
                ),
            });
        }
        if self.simulation.missions.is_empty() {
            return Err(AplError::InvalidConfig {
                details: "simulation.missions must not be empty".to_string(),
            });
        }
        if self.simulation.device_types.is_empty() {
            return Err(AplError::InvalidConfig {
                details: "simulation.device_types must not be empty".to_string(),
            });
        }
        if self.logging.channel_capacity == 0 {
            return Err(AplError::InvalidConfig {
                details: "logging.channel_capacity must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_env_u64(name: &str, slot: &mut u64) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<u64>().map_err(|error| AplError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_env_u32(name: &str, slot: &mut u32) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *slot = raw.parse::<u32>().map_err(|error| AplError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.simulation.interval_secs, 20);
        assert_eq!(cfg.analysis.disconnection_threshold, 1);
        assert_eq!(cfg.simulation.missions.len(), 5);
        assert_eq!(cfg.simulation.missions.last().unwrap(), "UNKN");
        assert_eq!(cfg.simulation.device_types.len(), 4);
    }

    #[test]
    fn derived_paths_follow_base_dir() {
        let mut cfg = Config::default();
        cfg.paths.base_dir = PathBuf::from("/srv/aplsim");
        assert_eq!(cfg.paths.devices_dir(), PathBuf::from("/srv/aplsim/devices"));
        assert_eq!(cfg.paths.backup_dir(), PathBuf::from("/srv/aplsim/backups"));
        assert_eq!(cfg.paths.reports_dir(), PathBuf::from("/srv/aplsim/reports"));
        assert_eq!(
            cfg.paths.jsonl_log(),
            PathBuf::from("/srv/aplsim/activity.jsonl")
        );
    }

    #[test]
    fn explicit_dirs_override_base_dir() {
        let mut cfg = Config::default();
        cfg.paths.base_dir = PathBuf::from("/srv/aplsim");
        cfg.paths.devices_dir = Some(PathBuf::from("/mnt/fast/devices"));
        assert_eq!(cfg.paths.devices_dir(), PathBuf::from("/mnt/fast/devices"));
        assert_eq!(cfg.paths.backup_dir(), PathBuf::from("/srv/aplsim/backups"));
    }

    #[test]
    fn rejects_zero_interval() {
        let mut cfg = Config::default();
        cfg.simulation.interval_secs = 0;
        assert!(matches!(
            cfg.validate(),
            Err(AplError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn rejects_inverted_record_range() {
        let mut cfg = Config::default();
        cfg.simulation.min_records_per_cycle = 50;
        cfg.simulation.max_records_per_cycle = 10;
        assert!(matches!(
            cfg.validate(),
            Err(AplError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn rejects_empty_mission_vocabulary() {
        let mut cfg = Config::default();
        cfg.simulation.missions.clear();
        assert!(matches!(
            cfg.validate(),
            Err(AplError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn load_missing_explicit_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert_eq!(err.code(), "APL-1002");
    }

    #[test]
    fn load_parses_toml_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[simulation]
interval_secs = 5
max_records_per_cycle = 10

[analysis]
disconnection_threshold = 3
"#,
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.simulation.interval_secs, 5);
        assert_eq!(cfg.simulation.max_records_per_cycle, 10);
        assert_eq!(cfg.analysis.disconnection_threshold, 3);
        // Untouched sections keep defaults.
        assert_eq!(cfg.simulation.min_records_per_cycle, 1);
    }

    #[test]
    fn load_rejects_invalid_toml_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[simulation]\ninterval_secs = 0\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(err.code(), "APL-1001");
    }
}
