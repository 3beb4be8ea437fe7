// Solver gateway: runs one lowered problem on a blocking thread under a
// wall-clock budget, with an optional progress observer task

use crate::domain::{
    models::{OptimizationProblem, Solution},
    solver_service::{ProgressEvent, ProgressSink, SolverError, SolverService},
    value_objects::SolutionStatus,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Extra time granted past the solver's own limit before giving up on it
    pub grace: Duration,
    pub progress_capacity: usize,
    pub observe_progress: bool,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            progress_capacity: 64,
            observe_progress: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayOutcome {
    pub solution: Solution,
    pub progress: Vec<ProgressEvent>,
    pub solver: String,
    pub elapsed: Duration,
}

pub struct SolverGateway {
    solver: Arc<dyn SolverService>,
    settings: GatewaySettings,
}

impl SolverGateway {
    pub fn new(solver: Arc<dyn SolverService>, settings: GatewaySettings) -> Self {
        Self { solver, settings }
    }

    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    pub async fn solve(&self, problem: OptimizationProblem) -> Result<GatewayOutcome, SolverError> {
        let started = Instant::now();
        let solver_name = self.solver.name().to_string();

        if let Some(solution) = Self::shortcut(&problem) {
            debug!(status = %solution.status, "solved without invoking the backend");
            return Ok(GatewayOutcome {
                solution,
                progress: Vec::new(),
                solver: solver_name,
                elapsed: started.elapsed(),
            });
        }

        let (sink, observer) = self.progress_channel();
        let budget = problem
            .solver_config
            .time_limit
            .map(|secs| Duration::from_secs_f64(secs.max(0.0)) + self.settings.grace);

        info!(
            solver = %solver_name,
            problem = %problem.name,
            variables = problem.num_variables(),
            constraints = problem.constraints.len(),
            time_limit = ?problem.solver_config.time_limit,
            workers = problem.solver_config.num_workers,
            "Solving"
        );

        let solver = Arc::clone(&self.solver);
        let handle = tokio::task::spawn_blocking(move || solver.solve(&problem, &sink));

        let joined = match budget {
            Some(budget) => match tokio::time::timeout(budget, handle).await {
                Ok(joined) => Some(joined),
                Err(_) => None,
            },
            None => Some(handle.await),
        };

        let (solution, progress) = match joined {
            Some(Ok(result)) => {
                let solution = result?;
                let progress = match observer {
                    Some(observer) => observer.await.unwrap_or_default(),
                    None => Vec::new(),
                };
                (solution, progress)
            }
            Some(Err(join_error)) => {
                if let Some(observer) = observer {
                    observer.abort();
                }
                return Err(SolverError::ExecutionFailed(format!(
                    "solver thread failed: {join_error}"
                )));
            }
            None => {
                // The blocking thread still owns the sink, so the observer would never finish.
                if let Some(observer) = observer {
                    observer.abort();
                }
                warn!(solver = %solver_name, "time budget exhausted without a result");
                (
                    Solution::new(
                        SolutionStatus::Unknown,
                        "Time budget exhausted before the solver returned",
                    ),
                    Vec::new(),
                )
            }
        };

        info!(
            status = %solution.status,
            objective = ?solution.objective_value,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Solve finished"
        );

        Ok(GatewayOutcome {
            solution,
            progress,
            solver: solver_name,
            elapsed: started.elapsed(),
        })
    }

    fn shortcut(problem: &OptimizationProblem) -> Option<Solution> {
        if problem.trivially_infeasible {
            return Some(Solution::new(
                SolutionStatus::Infeasible,
                "Model contains a constraint that can never hold",
            ));
        }
        if problem.num_variables() == 0 {
            return Some(Solution::optimal(problem.objective.constant, Vec::new()));
        }
        None
    }

    fn progress_channel(&self) -> (ProgressSink, Option<JoinHandle<Vec<ProgressEvent>>>) {
        if !self.settings.observe_progress {
            return (ProgressSink::disabled(), None);
        }

        let (tx, rx) = mpsc::channel::<ProgressEvent>(self.settings.progress_capacity.max(1));
        let observer = tokio::spawn(async move {
            let mut stream = ReceiverStream::new(rx);
            let mut events = Vec::new();
            while let Some(event) = stream.next().await {
                info!(
                    solution = event.solution_index,
                    objective = event.objective_value,
                    bound = event.bound,
                    elapsed = event.elapsed_time,
                    "Improving solution"
                );
                events.push(event);
            }
            events
        });
        (ProgressSink::new(tx), Some(observer))
    }
}
