// Post-solve violation detection
// Re-checks a concrete roster against the domain rules without looking at
// the optimisation model, so it catches solver bugs as well as gaps between
// what the model encodes and what the business expects.

use super::schedule::{ContractRules, Roster, ScheduleInput};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViolationKind {
    Understaffed,
    TraineeUnsupervised,
    MultipleShifts,
    ContractViolation,
    Overstaffed,
    WorkingAlone,
    NoEligibleShifts,
}

impl ViolationKind {
    pub fn tag(self) -> &'static str {
        match self {
            ViolationKind::Understaffed => "UNDERSTAFFED",
            ViolationKind::TraineeUnsupervised => "TRAINEE_UNSUPERVISED",
            ViolationKind::MultipleShifts => "MULTIPLE_SHIFTS",
            ViolationKind::ContractViolation => "CONTRACT_VIOLATION",
            ViolationKind::Overstaffed => "OVERSTAFFED",
            ViolationKind::WorkingAlone => "WORKING_ALONE",
            ViolationKind::NoEligibleShifts => "NO_ELIGIBLE_SHIFTS",
        }
    }

    /// Critical kinds decide the success flag.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            ViolationKind::Understaffed
                | ViolationKind::TraineeUnsupervised
                | ViolationKind::ContractViolation
        )
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub detail: String,
    pub shift_id: Option<String>,
    pub employee_id: Option<String>,
    pub date: Option<String>,
}

impl Violation {
    fn new(kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            shift_id: None,
            employee_id: None,
            date: None,
        }
    }

    fn on_shift(mut self, shift_id: &str) -> Self {
        self.shift_id = Some(shift_id.to_string());
        self
    }

    fn for_employee(mut self, employee_id: &str) -> Self {
        self.employee_id = Some(employee_id.to_string());
        self
    }

    fn on_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }

    pub fn is_critical(&self) -> bool {
        self.kind.is_critical()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

pub fn count_critical_violations(violations: &[Violation]) -> usize {
    violations.iter().filter(|v| v.is_critical()).count()
}

/// Detects every rule breach in `roster`.
///
/// Deterministic: shifts in input order, then employees in input order, then
/// dates in calendar order.
pub fn detect_violations(
    input: &ScheduleInput,
    roster: &Roster,
    rules: &ContractRules,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for shift in &input.shifts {
        let assigned = roster.employees_on(&shift.id);
        let count = assigned.len() as u32;

        if count < shift.min_workers {
            violations.push(
                Violation::new(
                    ViolationKind::Understaffed,
                    format!(
                        "Shift {} has {} employees but requires {}",
                        shift.id, count, shift.min_workers
                    ),
                )
                .on_shift(&shift.id),
            );
        }
        if count > shift.max_workers {
            violations.push(
                Violation::new(
                    ViolationKind::Overstaffed,
                    format!(
                        "Shift {} has {} employees but allows at most {}",
                        shift.id, count, shift.max_workers
                    ),
                )
                .on_shift(&shift.id),
            );
        }

        let members: Vec<_> = assigned.iter().filter_map(|id| input.employee(id)).collect();
        let has_trainee = members.iter().any(|e| e.is_trainee());
        let has_experienced = members.iter().any(|e| e.is_experienced());
        if has_trainee && !has_experienced {
            violations.push(
                Violation::new(
                    ViolationKind::TraineeUnsupervised,
                    format!(
                        "Shift {} has trainee but no experienced employee",
                        shift.id
                    ),
                )
                .on_shift(&shift.id),
            );
        }

        if let [only] = members.as_slice() {
            if !only.may_work_alone() {
                violations.push(
                    Violation::new(
                        ViolationKind::WorkingAlone,
                        format!(
                            "{} is working alone in shift {} but cannot work alone",
                            only.display_name(),
                            shift.id
                        ),
                    )
                    .on_shift(&shift.id)
                    .for_employee(&only.id),
                );
            }
        }
    }

    let by_date = input.shifts_by_date();
    for employee in &input.employees {
        for (date, day_shifts) in &by_date {
            let worked = day_shifts
                .iter()
                .filter(|s| roster.is_assigned(&employee.id, &s.id))
                .count();
            if worked > 1 {
                violations.push(
                    Violation::new(
                        ViolationKind::MultipleShifts,
                        format!(
                            "{} has {} shifts on {}",
                            employee.display_name(),
                            worked,
                            date
                        ),
                    )
                    .for_employee(&employee.id)
                    .on_date(date),
                );
            }
        }
    }

    if !input.shifts.is_empty() {
        for employee in input.schedulable_employees() {
            if input.eligible_shift_count(&employee.id) == 0 {
                violations.push(
                    Violation::new(
                        ViolationKind::NoEligibleShifts,
                        format!(
                            "{} is unavailable for every shift; contract target not enforced",
                            employee.display_name()
                        ),
                    )
                    .for_employee(&employee.id),
                );
                continue;
            }

            let expected = rules.terms(employee.contract).shifts as usize;
            let total = roster.shift_count(&employee.id);
            if total != expected {
                violations.push(
                    Violation::new(
                        ViolationKind::ContractViolation,
                        format!(
                            "{} has {} shifts but should have exactly {} ({} contract)",
                            employee.display_name(),
                            total,
                            expected,
                            employee.contract
                        ),
                    )
                    .for_employee(&employee.id),
                );
            }
        }
    }

    violations
}
