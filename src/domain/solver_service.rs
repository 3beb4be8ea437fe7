// Domain service interface for solving lowered scheduling problems
// Any solver backend plugs in behind this trait; the gateway never sees a concrete engine

use super::models::{OptimizationProblem, Solution};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Error types for the solver service
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),

    #[error("Solver execution failed: {0}")]
    ExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// One improving solution observed during the search
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Seconds since the solve started
    pub elapsed_time: f64,
    pub objective_value: f64,
    pub bound: f64,
    pub solution_index: u64,
}

/// Sending half of the progress channel handed to a backend.
///
/// Reporting never blocks: when the observer lags and the bounded channel is
/// full the event is dropped with a warning.
#[derive(Debug)]
pub struct ProgressSink {
    sender: Option<mpsc::Sender<ProgressEvent>>,
    started: Instant,
    solutions: AtomicU64,
}

impl ProgressSink {
    pub fn new(sender: mpsc::Sender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
            started: Instant::now(),
            solutions: AtomicU64::new(0),
        }
    }

    /// A sink that only counts solutions.
    pub fn disabled() -> Self {
        Self {
            sender: None,
            started: Instant::now(),
            solutions: AtomicU64::new(0),
        }
    }

    /// Records an improving solution.
    pub fn improving_solution(&self, objective_value: f64, bound: f64) {
        let solution_index = self.solutions.fetch_add(1, Ordering::Relaxed) + 1;
        let Some(sender) = &self.sender else {
            return;
        };

        let event = ProgressEvent {
            elapsed_time: self.started.elapsed().as_secs_f64(),
            objective_value,
            bound,
            solution_index,
        };
        match sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(
                    solution = event.solution_index,
                    "progress channel full, dropping event"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("progress observer gone, event discarded");
            }
        }
    }

    pub fn solutions_found(&self) -> u64 {
        self.solutions.load(Ordering::Relaxed)
    }
}

/// Domain service interface for solver backends
///
/// Implementations translate the lowered problem to their engine, honour the
/// configured time limit and worker count where the engine supports them,
/// and report improving solutions through the sink.
pub trait SolverService: Send + Sync {
    /// Solve a lowered problem
    fn solve(&self, problem: &OptimizationProblem, progress: &ProgressSink) -> Result<Solution>;

    /// Validate a problem without solving it
    fn validate(&self, problem: &OptimizationProblem) -> Result<()> {
        let mut errors = Vec::new();
        let num_vars = problem.num_variables();

        for (i, term) in problem.objective.terms.iter().enumerate() {
            if term.0 >= num_vars {
                errors.push(format!(
                    "Objective term {} references column {} but problem has {} variables",
                    i, term.0, num_vars
                ));
            }
        }

        for (i, constraint) in problem.constraints.iter().enumerate() {
            if let Some(&(col, _)) = constraint.terms.iter().find(|(col, _)| *col >= num_vars) {
                errors.push(format!(
                    "Constraint {} '{}' references column {} but problem has {} variables",
                    i, constraint.name, col, num_vars
                ));
            }
        }

        for (i, var) in problem.variables.iter().enumerate() {
            if let Some(upper) = var.upper_bound {
                if var.lower_bound > upper {
                    errors.push(format!(
                        "Variable {} '{}' has lower bound ({}) > upper bound ({})",
                        i, var.name, var.lower_bound, upper
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SolverError::InvalidProblem(errors.join("; ")))
        }
    }

    /// Get the name of this solver backend
    fn name(&self) -> &str;

    /// Whether the backend stops on its own at the configured time limit
    fn honours_time_limit(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_numbers_solutions_and_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = ProgressSink::new(tx);

        sink.improving_solution(10.0, 12.0);
        sink.improving_solution(11.0, 12.0);

        let first = rx.try_recv().expect("first event delivered");
        assert_eq!(first.solution_index, 1);
        assert_eq!(first.objective_value, 10.0);
        assert!(rx.try_recv().is_err());
        assert_eq!(sink.solutions_found(), 2);
    }

    #[test]
    fn disabled_sink_still_counts() {
        let sink = ProgressSink::disabled();
        sink.improving_solution(1.0, 1.0);
        assert_eq!(sink.solutions_found(), 1);
    }
}
