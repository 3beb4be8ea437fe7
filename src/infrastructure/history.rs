// Run history: one small JSON summary per run in a private directory.
// Files are named `run-<UTC timestamp>-<success|failure>.json`, written via a
// temporary file and an atomic rename, and evicted oldest-first once the
// directory holds more than `max_files`, then by age.

use super::config::HistorySection;
use crate::domain::value_objects::SolutionStatus;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const PREFIX: &str = "run-";
const SUFFIX: &str = ".json";
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.6fZ";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("history I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode run summary: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("could not move run summary into place: {0}")]
    Rename(#[from] tempfile::PersistError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Schedule,
    Model,
}

/// What a run leaves behind; never includes assignment content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub recorded_at: DateTime<Utc>,
    pub mode: RunMode,
    pub success: bool,
    pub status: Option<SolutionStatus>,
    pub solver: Option<String>,
    pub solve_time_ms: u64,
    pub variables: usize,
    pub constraints: usize,
    pub violations: usize,
    pub critical_violations: usize,
    pub repair_iterations: usize,
    pub error: Option<String>,
}

impl RunSummary {
    pub fn new(mode: RunMode, success: bool) -> Self {
        Self {
            recorded_at: Utc::now(),
            mode,
            success,
            status: None,
            solver: None,
            solve_time_ms: 0,
            variables: 0,
            constraints: 0,
            violations: 0,
            critical_violations: 0,
            repair_iterations: 0,
            error: None,
        }
    }
}

pub trait RunHistory: Send + Sync {
    fn record_run(&self, summary: &RunSummary) -> Result<(), PersistError>;
}

#[derive(Debug, Clone)]
pub struct FileRunHistory {
    directory: PathBuf,
    max_files: usize,
    max_age: Duration,
}

impl FileRunHistory {
    pub fn new(directory: impl Into<PathBuf>, max_files: usize, max_age_days: u32) -> Self {
        Self {
            directory: directory.into(),
            max_files,
            max_age: Duration::days(i64::from(max_age_days)),
        }
    }

    pub fn from_section(section: &HistorySection) -> Self {
        Self::new(
            section.resolved_directory(),
            section.max_files,
            section.max_age_days,
        )
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn ensure_directory(&self) -> Result<(), PersistError> {
        fs::create_dir_all(&self.directory)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.directory, fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }

    fn file_name(summary: &RunSummary) -> String {
        let tag = if summary.success { "success" } else { "failure" };
        format!(
            "{PREFIX}{}-{tag}{SUFFIX}",
            summary.recorded_at.format(TIMESTAMP_FORMAT)
        )
    }

    /// History files with their embedded timestamps, oldest first.
    pub fn list_runs(&self) -> Result<Vec<(DateTime<Utc>, PathBuf)>, PersistError> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            let Some(stamp) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_timestamp)
            else {
                continue;
            };
            runs.push((stamp, path));
        }
        runs.sort();
        Ok(runs)
    }

    /// Applies the count limit, then the age limit. Returns the number of files removed.
    pub fn cleanup(&self, now: DateTime<Utc>) -> Result<usize, PersistError> {
        let mut runs = self.list_runs()?;
        let mut removed = 0;

        let excess = runs.len().saturating_sub(self.max_files);
        for (_, path) in runs.drain(..excess) {
            fs::remove_file(&path)?;
            removed += 1;
        }

        let cutoff = now - self.max_age;
        for (stamp, path) in runs {
            if stamp < cutoff {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(removed, directory = %self.directory.display(), "evicted old run summaries");
        }
        Ok(removed)
    }
}

impl RunHistory for FileRunHistory {
    fn record_run(&self, summary: &RunSummary) -> Result<(), PersistError> {
        self.ensure_directory()?;

        let mut file = tempfile::NamedTempFile::new_in(&self.directory)?;
        serde_json::to_writer_pretty(&mut file, summary)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        let target = self.directory.join(Self::file_name(summary));
        file.persist(&target)?;
        debug!(path = %target.display(), "run summary written");

        self.cleanup(Utc::now())?;
        Ok(())
    }
}

fn parse_timestamp(file_name: &str) -> Option<DateTime<Utc>> {
    let rest = file_name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    let (stamp, tag) = rest.split_once('-')?;
    if tag != "success" && tag != "failure" {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
