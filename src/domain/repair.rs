// Post-solve repair
// Greedy local search over single moves. Each iteration derives candidate
// moves from the current violations, scores every candidate by re-running
// the detector and commits the best one only when it strictly lowers
// `(critical, total)`. The critical count therefore never increases.

use super::schedule::{ContractRules, Employee, Roster, ScheduleInput};
use super::violations::{count_critical_violations, detect_violations, Violation, ViolationKind};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepairPolicy {
    pub max_iterations: usize,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self { max_iterations: 20 }
    }
}

/// One roster edit
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Move {
    Assign {
        employee_id: String,
        shift_id: String,
    },
    Unassign {
        employee_id: String,
        shift_id: String,
    },
    Reassign {
        employee_id: String,
        from: String,
        to: String,
    },
}

impl Move {
    /// Applies the move; false when it changed nothing.
    fn apply(&self, roster: &mut Roster) -> bool {
        match self {
            Move::Assign {
                employee_id,
                shift_id,
            } => roster.assign(shift_id, employee_id),
            Move::Unassign {
                employee_id,
                shift_id,
            } => roster.unassign(shift_id, employee_id),
            Move::Reassign {
                employee_id,
                from,
                to,
            } => roster.unassign(from, employee_id) && roster.assign(to, employee_id),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Assign {
                employee_id,
                shift_id,
            } => write!(f, "assign {employee_id} to shift {shift_id}"),
            Move::Unassign {
                employee_id,
                shift_id,
            } => write!(f, "remove {employee_id} from shift {shift_id}"),
            Move::Reassign {
                employee_id,
                from,
                to,
            } => write!(f, "move {employee_id} from shift {from} to shift {to}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub roster: Roster,
    pub violations: Vec<Violation>,
    pub iterations: usize,
    /// One line per committed move
    pub applied: Vec<String>,
    pub initial_critical: usize,
    pub final_critical: usize,
}

type Score = (usize, usize);

fn score(violations: &[Violation]) -> Score {
    (count_critical_violations(violations), violations.len())
}

pub fn repair_roster(
    input: &ScheduleInput,
    mut roster: Roster,
    rules: &ContractRules,
    policy: &RepairPolicy,
) -> RepairOutcome {
    let mut violations = detect_violations(input, &roster, rules);
    let mut current = score(&violations);
    let initial_critical = current.0;
    let mut applied = Vec::new();
    let mut iterations = 0;

    while current.0 > 0 && iterations < policy.max_iterations {
        let mut best: Option<(Score, Move, Roster, Vec<Violation>)> = None;

        for candidate in candidate_moves(input, &roster, &violations, rules) {
            let mut trial = roster.clone();
            if !candidate.apply(&mut trial) {
                continue;
            }
            let trial_violations = detect_violations(input, &trial, rules);
            let trial_score = score(&trial_violations);
            let threshold = best.as_ref().map_or(current, |(s, ..)| *s);
            if trial_score < threshold {
                best = Some((trial_score, candidate, trial, trial_violations));
            }
        }

        let Some((next, mv, next_roster, next_violations)) = best else {
            debug!(iterations, critical = current.0, "no improving move left");
            break;
        };

        iterations += 1;
        debug!(iteration = iterations, %mv, critical = next.0, total = next.1, "repair move committed");
        applied.push(format!(
            "Repair {iterations}: {mv} (critical {} -> {})",
            current.0, next.0
        ));
        roster = next_roster;
        violations = next_violations;
        current = next;
    }

    info!(
        iterations,
        initial_critical,
        final_critical = current.0,
        "repair finished"
    );

    RepairOutcome {
        roster,
        violations,
        iterations,
        applied,
        initial_critical,
        final_critical: current.0,
    }
}

fn candidate_moves(
    input: &ScheduleInput,
    roster: &Roster,
    violations: &[Violation],
    rules: &ContractRules,
) -> BTreeSet<Move> {
    let mut moves = BTreeSet::new();

    for violation in violations {
        match violation.kind {
            ViolationKind::Understaffed | ViolationKind::WorkingAlone => {
                if let Some(shift_id) = &violation.shift_id {
                    staff_shift(input, roster, shift_id, |_| true, &mut moves);
                }
            }
            ViolationKind::TraineeUnsupervised => {
                if let Some(shift_id) = &violation.shift_id {
                    staff_shift(input, roster, shift_id, Employee::is_experienced, &mut moves);
                    for id in roster.employees_on(shift_id) {
                        if input.employee(id).is_some_and(Employee::is_trainee) {
                            moves.insert(Move::Unassign {
                                employee_id: id.clone(),
                                shift_id: shift_id.clone(),
                            });
                        }
                    }
                }
            }
            ViolationKind::Overstaffed => {
                if let Some(shift_id) = &violation.shift_id {
                    for id in roster.employees_on(shift_id) {
                        moves.insert(Move::Unassign {
                            employee_id: id.clone(),
                            shift_id: shift_id.clone(),
                        });
                    }
                }
            }
            ViolationKind::MultipleShifts => {
                if let (Some(employee_id), Some(date)) = (&violation.employee_id, &violation.date) {
                    for shift in input.shifts.iter().filter(|s| &s.date == date) {
                        if roster.is_assigned(employee_id, &shift.id) {
                            moves.insert(Move::Unassign {
                                employee_id: employee_id.clone(),
                                shift_id: shift.id.clone(),
                            });
                        }
                    }
                }
            }
            ViolationKind::ContractViolation => {
                let Some(employee) = violation
                    .employee_id
                    .as_deref()
                    .and_then(|id| input.employee(id))
                else {
                    continue;
                };
                let target = rules.terms(employee.contract).shifts as usize;
                let worked = roster.shift_count(&employee.id);
                if worked < target {
                    for shift in &input.shifts {
                        if input.level(&employee.id, &shift.id).is_eligible()
                            && !works_on(input, roster, &employee.id, &shift.date)
                        {
                            moves.insert(Move::Assign {
                                employee_id: employee.id.clone(),
                                shift_id: shift.id.clone(),
                            });
                        }
                    }
                } else {
                    for shift in &input.shifts {
                        if roster.is_assigned(&employee.id, &shift.id) {
                            moves.insert(Move::Unassign {
                                employee_id: employee.id.clone(),
                                shift_id: shift.id.clone(),
                            });
                        }
                    }
                }
            }
            ViolationKind::NoEligibleShifts => {}
        }
    }

    moves
}

/// Moves that put a matching eligible worker on `shift_id`, pulling them off
/// a same-day shift when they already work that date.
fn staff_shift(
    input: &ScheduleInput,
    roster: &Roster,
    shift_id: &str,
    wanted: impl Fn(&Employee) -> bool,
    moves: &mut BTreeSet<Move>,
) {
    let Some(shift) = input.shift(shift_id) else {
        return;
    };
    for employee in input.schedulable_employees().filter(|e| wanted(e)) {
        if roster.is_assigned(&employee.id, shift_id)
            || !input.level(&employee.id, shift_id).is_eligible()
        {
            continue;
        }
        let same_day = input
            .shifts
            .iter()
            .find(|s| s.date == shift.date && roster.is_assigned(&employee.id, &s.id));
        moves.insert(match same_day {
            Some(other) => Move::Reassign {
                employee_id: employee.id.clone(),
                from: other.id.clone(),
                to: shift_id.to_string(),
            },
            None => Move::Assign {
                employee_id: employee.id.clone(),
                shift_id: shift_id.to_string(),
            },
        });
    }
}

fn works_on(input: &ScheduleInput, roster: &Roster, employee_id: &str, date: &str) -> bool {
    input
        .shifts
        .iter()
        .any(|s| s.date == date && roster.is_assigned(employee_id, &s.id))
}
