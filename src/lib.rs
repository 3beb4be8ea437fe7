// Domain layer: scheduling entities, rules, validation and repair
pub mod domain;

// Constraint model shared by the schedule builder and the expression interpreter
pub mod model;

// Expression DSL for caller-supplied models
pub mod expression;

// Solver adapters: Concrete implementations of SolverService
pub mod solver;

// Application layer: Use cases and service orchestration
pub mod application;

// Infrastructure layer: External concerns (config, logging, history, I/O)
pub mod infrastructure;

// Re-export commonly used types
pub use domain::{
    ContractRules, Employee, ObjectiveWeights, OptimizationProblem, RepairPolicy, Roster,
    ScheduleInput, Shift, Solution, SolutionStatus, SolverBackend, SolverConfig, SolverError,
    SolverService, Violation, ViolationKind,
};

pub use application::{SchedulingService, ServiceSettings, SolveResponse};

pub use infrastructure::{run_once, AppConfig, Runner};

pub use solver::{MicrolpSolver, SolverFactory};
