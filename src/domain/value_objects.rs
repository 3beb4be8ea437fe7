// Domain value objects representing core scheduling and solver concepts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of decision variable in the lowered linear program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    /// Integer number (x ∈ ℤ)
    Integer,
    /// Binary variable (x ∈ {0, 1})
    Binary,
}

/// Type of constraint comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    /// Less than or equal (≤)
    LessThanOrEqual,
    /// Equal (=)
    Equal,
    /// Greater than or equal (≥)
    GreaterThanOrEqual,
}

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationType {
    /// Minimize the objective function
    Minimize,
    /// Maximize the objective function
    #[default]
    Maximize,
}

/// Outcome reported by the solver gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolutionStatus {
    /// Best possible assignment under the model
    Optimal,
    /// Valid assignment, optimality not proven (typically a time-out)
    Feasible,
    /// No assignment satisfies all hard constraints
    Infeasible,
    /// Neither proved nor timed out with a candidate
    Unknown,
}

impl SolutionStatus {
    /// Only optimal and feasible outcomes carry a usable valuation.
    pub fn has_solution(self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "OPTIMAL"),
            SolutionStatus::Feasible => write!(f, "FEASIBLE"),
            SolutionStatus::Infeasible => write!(f, "INFEASIBLE"),
            SolutionStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Solver backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverBackend {
    /// Pick the strongest backend compiled into this build
    #[default]
    Auto,
    /// Pure-Rust microlp branch and bound
    Microlp,
    /// COIN-OR CBC solver
    CoinCbc,
    /// HiGHS solver
    Highs,
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverBackend::Auto => write!(f, "Auto"),
            SolverBackend::Microlp => write!(f, "microlp"),
            SolverBackend::CoinCbc => write!(f, "COIN-OR CBC"),
            SolverBackend::Highs => write!(f, "HiGHS"),
        }
    }
}

/// Employee category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Manager,
    Experienced,
    Trainee,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Manager => write!(f, "manager"),
            Category::Experienced => write!(f, "experienced"),
            Category::Trainee => write!(f, "trainee"),
        }
    }
}

/// Contract size; decides the exact shift count and the hour ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractSize {
    Small,
    #[default]
    Large,
}

impl fmt::Display for ContractSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractSize::Small => write!(f, "small"),
            ContractSize::Large => write!(f, "large"),
        }
    }
}

/// Availability of an employee for a shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AvailabilityLevel {
    Unavailable,
    Preferred,
    #[default]
    Available,
}

impl AvailabilityLevel {
    /// Maps the wire code (0 unavailable, 1 preferred, 2 available).
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(AvailabilityLevel::Unavailable),
            1 => Some(AvailabilityLevel::Preferred),
            2 => Some(AvailabilityLevel::Available),
            _ => None,
        }
    }

    /// Maps the alternate preference scale (1 preferred, 2 available, 3 unavailable).
    pub fn from_preference_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(AvailabilityLevel::Preferred),
            2 => Some(AvailabilityLevel::Available),
            3 => Some(AvailabilityLevel::Unavailable),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            AvailabilityLevel::Unavailable => 0,
            AvailabilityLevel::Preferred => 1,
            AvailabilityLevel::Available => 2,
        }
    }

    /// Whether a decision variable may exist for this level.
    pub fn is_eligible(self) -> bool {
        !matches!(self, AvailabilityLevel::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_codes_cover_both_scales() {
        assert_eq!(AvailabilityLevel::from_code(0), Some(AvailabilityLevel::Unavailable));
        assert_eq!(AvailabilityLevel::from_code(1), Some(AvailabilityLevel::Preferred));
        assert_eq!(AvailabilityLevel::from_code(7), None);
        assert_eq!(
            AvailabilityLevel::from_preference_level(3),
            Some(AvailabilityLevel::Unavailable)
        );
        assert!(!AvailabilityLevel::Unavailable.is_eligible());
        assert!(AvailabilityLevel::Available.is_eligible());
    }

    #[test]
    fn only_optimal_and_feasible_carry_solutions() {
        assert!(SolutionStatus::Optimal.has_solution());
        assert!(SolutionStatus::Feasible.has_solution());
        assert!(!SolutionStatus::Infeasible.has_solution());
        assert!(!SolutionStatus::Unknown.has_solution());
        assert_eq!(SolutionStatus::Infeasible.to_string(), "INFEASIBLE");
    }
}
