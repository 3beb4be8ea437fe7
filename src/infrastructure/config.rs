// Configuration: TOML file with per-section defaults
// Every section and every key may be omitted

use crate::application::gateway::GatewaySettings;
use crate::application::scheduling_service::ServiceSettings;
use crate::domain::{
    models::SolverConfig,
    repair::RepairPolicy,
    schedule::{ContractRules, ObjectiveWeights},
    value_objects::SolverBackend,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub solver: SolverSection,
    pub contract: ContractRules,
    pub objective: ObjectiveWeights,
    pub repair: RepairPolicy,
    pub history: HistorySection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverSection {
    pub backend: SolverBackend,
    pub time_limit_secs: f64,
    pub workers: u32,
    pub grace_secs: f64,
    pub progress_capacity: usize,
    pub observe_progress: bool,
    pub verbose: bool,
}

impl Default for SolverSection {
    fn default() -> Self {
        Self {
            backend: SolverBackend::Auto,
            time_limit_secs: 30.0,
            workers: 8,
            grace_secs: 5.0,
            progress_capacity: 64,
            observe_progress: true,
            verbose: false,
        }
    }
}

impl SolverSection {
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            backend: self.backend,
            time_limit: Some(self.time_limit_secs),
            num_workers: self.workers,
            verbose: self.verbose,
        }
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            grace: Duration::from_secs_f64(self.grace_secs),
            progress_capacity: self.progress_capacity,
            observe_progress: self.observe_progress,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    pub enabled: bool,
    /// Defaults to `shiftopt-runs` under the system temp directory
    pub directory: Option<PathBuf>,
    pub max_files: usize,
    pub max_age_days: u32,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            max_files: 50,
            max_age_days: 14,
        }
    }
}

impl HistorySection {
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("shiftopt-runs"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// EnvFilter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Loads `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            solver: self.solver.solver_config(),
            gateway: self.solver.gateway_settings(),
            contract: self.contract,
            objective: self.objective,
            repair: self.repair,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let solver = &self.solver;
        if !solver.time_limit_secs.is_finite() || solver.time_limit_secs <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "solver.time_limit_secs must be positive, got {}",
                solver.time_limit_secs
            )));
        }
        if !solver.grace_secs.is_finite() || solver.grace_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "solver.grace_secs must not be negative, got {}",
                solver.grace_secs
            )));
        }
        if solver.workers == 0 {
            return Err(ConfigError::Invalid("solver.workers must be at least 1".into()));
        }
        if self.contract.hours_per_shift == 0 {
            return Err(ConfigError::Invalid(
                "contract.hours_per_shift must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("", Path::new("inline")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.solver.time_limit_secs, 30.0);
        assert_eq!(config.solver.workers, 8);
        assert_eq!(config.contract.large.shifts, 10);
        assert_eq!(config.objective.unavailable_penalty, -1000);
        assert_eq!(config.repair.max_iterations, 20);
        assert_eq!(config.history.max_files, 50);
    }

    #[test]
    fn sections_override_individually() {
        let text = r#"
            [solver]
            backend = "microlp"
            time_limit_secs = 2.5

            [contract]
            hours_per_shift = 6
            small = { shifts = 2, max_hours = 12 }

            [repair]
            max_iterations = 3
        "#;
        let config = AppConfig::from_toml(text, Path::new("inline")).unwrap();
        assert_eq!(config.solver.backend, SolverBackend::Microlp);
        assert_eq!(config.solver.solver_config().time_limit, Some(2.5));
        assert_eq!(config.solver.workers, 8);
        assert_eq!(config.contract.small.shifts, 2);
        assert_eq!(config.contract.large.shifts, 10);
        assert_eq!(config.repair.max_iterations, 3);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(matches!(
            AppConfig::from_toml("[solver]\ntime_limit_secs = 0", Path::new("inline")),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_toml("[solver]\nbackend = \"gurobi\"", Path::new("inline")),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");

        let missing = AppConfig::load(Path::new("/nonexistent/shiftopt.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
