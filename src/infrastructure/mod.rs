// Infrastructure layer: configuration, diagnostics, run history and the stdin/stdout runner

pub mod config;
pub mod history;
pub mod logging;
pub mod runner;

pub use config::{AppConfig, ConfigError};
pub use history::{FileRunHistory, PersistError, RunHistory, RunMode, RunSummary};
pub use runner::{run_once, RunError, Runner};
