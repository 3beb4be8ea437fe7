// Domain module: scheduling entities, rules and the solver contract

pub mod models;
pub mod repair;
pub mod schedule;
pub mod solver_service;
pub mod value_objects;
pub mod violations;

pub use models::*;
pub use repair::{repair_roster, Move, RepairOutcome, RepairPolicy};
pub use schedule::*;
pub use solver_service::*;
pub use value_objects::*;
pub use violations::{count_critical_violations, detect_violations, Violation, ViolationKind};
