// Domain model builder
// Creates one boolean per eligible (employee, shift) pair and emits, in
// order: daily exclusivity, staffing bounds, supervision, the solo-work
// exception, exact contract load and the hour cap, followed by the
// availability-weighted objective.

use super::{CpModel, LinearExpr, Literal, Relation, VarId};
use crate::domain::schedule::{ContractRules, Employee, ObjectiveWeights, ScheduleInput, Shift};
use crate::domain::value_objects::AvailabilityLevel;
use std::collections::HashMap;

/// Prefix of assignment variable names: `assign_<employeeId>_<shiftId>`.
pub const ASSIGNMENT_PREFIX: &str = "assign_";

pub fn assignment_var_name(employee_id: &str, shift_id: &str) -> String {
    format!("{ASSIGNMENT_PREFIX}{employee_id}_{shift_id}")
}

/// Decision variable for one (employee, shift) pair
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentVar {
    pub employee_id: String,
    pub shift_id: String,
    pub level: AvailabilityLevel,
    pub var: VarId,
}

/// The built model plus the bookkeeping needed to read a valuation back
#[derive(Debug)]
pub struct ScheduleModel {
    pub model: CpModel,
    pub assignments: Vec<AssignmentVar>,
    /// Schedulable employees that had no eligible shift
    pub skipped_employees: Vec<String>,
    pub report: Vec<String>,
    index: HashMap<(String, String), VarId>,
}

impl ScheduleModel {
    pub fn var_for(&self, employee_id: &str, shift_id: &str) -> Option<VarId> {
        self.index
            .get(&(employee_id.to_string(), shift_id.to_string()))
            .copied()
    }

    fn vars_where<'a>(
        &'a self,
        pred: impl Fn(&AssignmentVar) -> bool + 'a,
    ) -> impl Iterator<Item = VarId> + 'a {
        self.assignments
            .iter()
            .filter(move |a| pred(a))
            .map(|a| a.var)
    }
}

pub fn build_schedule_model(
    input: &ScheduleInput,
    rules: &ContractRules,
    weights: &ObjectiveWeights,
) -> ScheduleModel {
    let mut schedule = ScheduleModel {
        model: CpModel::new(),
        assignments: Vec::new(),
        skipped_employees: Vec::new(),
        report: Vec::new(),
        index: HashMap::new(),
    };

    let workers: Vec<&Employee> = input.schedulable_employees().collect();
    schedule.report.push(format!(
        "Building model with {} shifts and {} employees",
        input.shifts.len(),
        workers.len()
    ));

    for employee in &workers {
        for shift in &input.shifts {
            let level = input.level(&employee.id, &shift.id);
            if !level.is_eligible() {
                continue;
            }
            let var = schedule
                .model
                .new_bool_var(assignment_var_name(&employee.id, &shift.id));
            schedule
                .index
                .insert((employee.id.clone(), shift.id.clone()), var);
            schedule.assignments.push(AssignmentVar {
                employee_id: employee.id.clone(),
                shift_id: shift.id.clone(),
                level,
                var,
            });
        }
    }
    tracing::debug!(
        variables = schedule.assignments.len(),
        "created assignment variables"
    );

    add_daily_exclusivity(&mut schedule, input, &workers);
    add_staffing_bounds(&mut schedule, input);
    add_supervision(&mut schedule, input, &workers);
    add_solo_work_exception(&mut schedule, input, &workers);
    add_contract_load(&mut schedule, input, &workers, rules);
    add_objective(&mut schedule, weights);

    tracing::debug!(
        variables = schedule.model.num_variables(),
        constraints = schedule.model.num_constraints(),
        "schedule model built"
    );
    schedule
}

fn add_daily_exclusivity(schedule: &mut ScheduleModel, input: &ScheduleInput, workers: &[&Employee]) {
    for employee in workers {
        for (date, day_shifts) in input.shifts_by_date() {
            let vars: Vec<VarId> = day_shifts
                .iter()
                .filter_map(|s| schedule.var_for(&employee.id, &s.id))
                .collect();
            if vars.is_empty() {
                continue;
            }
            schedule.model.add_linear(
                format!("one_shift_per_day_{}_{}", employee.id, date),
                LinearExpr::sum(vars),
                Relation::Le,
                1,
            );
        }
    }
}

fn add_staffing_bounds(schedule: &mut ScheduleModel, input: &ScheduleInput) {
    for shift in &input.shifts {
        let vars: Vec<VarId> = schedule
            .vars_where(|a| a.shift_id == shift.id)
            .collect();
        if vars.is_empty() {
            continue;
        }
        let count = LinearExpr::sum(vars);
        schedule.model.add_linear(
            format!("min_workers_{}", shift.id),
            count.clone(),
            Relation::Ge,
            i64::from(shift.min_workers),
        );
        schedule.model.add_linear(
            format!("max_workers_{}", shift.id),
            count,
            Relation::Le,
            i64::from(shift.max_workers),
        );
    }
}

fn add_supervision(schedule: &mut ScheduleModel, input: &ScheduleInput, workers: &[&Employee]) {
    for shift in &input.shifts {
        let on_shift = |pred: fn(&Employee) -> bool| -> Vec<VarId> {
            workers
                .iter()
                .filter(|e| pred(e))
                .filter_map(|e| schedule.var_for(&e.id, &shift.id))
                .collect()
        };
        let trainees = on_shift(Employee::is_trainee);
        let experienced = on_shift(Employee::is_experienced);

        for trainee in trainees {
            // An empty experienced sum forbids the trainee outright.
            schedule.model.add_enforced(
                format!("supervision_{}_{}", shift.id, trainee.index()),
                LinearExpr::sum(experienced.iter().copied()),
                Relation::Ge,
                1,
                vec![trainee.into()],
            );
        }
    }
}

fn add_solo_work_exception(
    schedule: &mut ScheduleModel,
    input: &ScheduleInput,
    workers: &[&Employee],
) {
    for shift in &input.shifts {
        let count = LinearExpr::sum(schedule.vars_where(|a| a.shift_id == shift.id).collect::<Vec<_>>());
        let cannot_alone: Vec<VarId> = workers
            .iter()
            .filter(|e| !e.may_work_alone())
            .filter_map(|e| schedule.var_for(&e.id, &shift.id))
            .collect();

        let one_worker = schedule
            .model
            .new_bool_var(format!("shift_{}_one_worker", shift.id));
        let exactly_one = Literal::positive(one_worker);
        schedule.model.add_enforced(
            format!("one_worker_{}", shift.id),
            count.clone(),
            Relation::Eq,
            1,
            vec![exactly_one],
        );
        schedule.model.add_enforced(
            format!("not_one_worker_{}", shift.id),
            count,
            Relation::Ne,
            1,
            vec![exactly_one.not()],
        );

        if cannot_alone.is_empty() {
            continue;
        }
        let restricted = schedule
            .model
            .new_bool_var(format!("shift_{}_cannot_work_alone", shift.id));
        let has_restricted = Literal::positive(restricted);
        let restricted_count = LinearExpr::sum(cannot_alone);
        schedule.model.add_enforced(
            format!("has_restricted_{}", shift.id),
            restricted_count.clone(),
            Relation::Ge,
            1,
            vec![has_restricted],
        );
        schedule.model.add_enforced(
            format!("no_restricted_{}", shift.id),
            restricted_count,
            Relation::Eq,
            0,
            vec![has_restricted.not()],
        );
        schedule.model.add_implication(
            format!("solo_work_{}", shift.id),
            exactly_one,
            has_restricted.not(),
        );
    }
}

fn add_contract_load(
    schedule: &mut ScheduleModel,
    input: &ScheduleInput,
    workers: &[&Employee],
    rules: &ContractRules,
) {
    for employee in workers {
        let vars: Vec<VarId> = input
            .shifts
            .iter()
            .filter_map(|s: &Shift| schedule.var_for(&employee.id, &s.id))
            .collect();
        let terms = rules.terms(employee.contract);

        if vars.is_empty() {
            schedule.skipped_employees.push(employee.id.clone());
            schedule.report.push(format!(
                "Employee {}: no eligible shifts, contract target not enforced",
                employee.display_name()
            ));
            continue;
        }

        schedule.model.add_linear(
            format!("exact_shifts_{}", employee.id),
            LinearExpr::sum(vars.iter().copied()),
            Relation::Eq,
            i64::from(terms.shifts),
        );
        schedule.report.push(format!(
            "Employee {}: {} shifts ({} contract)",
            employee.display_name(),
            terms.shifts,
            employee.contract
        ));

        let hours = vars.iter().fold(LinearExpr::zero(), |acc, &var| {
            acc.add(&LinearExpr::term(var, i64::from(rules.hours_per_shift)))
        });
        schedule.model.add_linear(
            format!("max_hours_{}", employee.id),
            hours,
            Relation::Le,
            i64::from(terms.max_hours),
        );
    }
}

fn add_objective(schedule: &mut ScheduleModel, weights: &ObjectiveWeights) {
    let objective = schedule
        .assignments
        .iter()
        .fold(LinearExpr::zero(), |acc, a| {
            acc.add(&LinearExpr::term(a.var, weights.weight(a.level)))
        });
    schedule.model.maximize(objective);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::AvailabilityRecord;
    use crate::domain::value_objects::{Category, ContractSize};

    fn record(e: &str, s: &str, level: AvailabilityLevel) -> AvailabilityRecord {
        AvailabilityRecord {
            employee_id: e.into(),
            shift_id: s.into(),
            level,
        }
    }

    #[test]
    fn no_variable_for_unavailable_pairs() {
        let input = ScheduleInput::new(
            vec![
                Employee::new("e1", Category::Experienced, ContractSize::Large),
                Employee::new("m1", Category::Manager, ContractSize::Large),
            ],
            vec![Shift::new("s1", "d1", 1, 2), Shift::new("s2", "d2", 1, 2)],
            &[record("e1", "s2", AvailabilityLevel::Unavailable)],
        );
        let built = build_schedule_model(&input, &ContractRules::default(), &ObjectiveWeights::default());

        assert_eq!(built.assignments.len(), 1);
        assert!(built.var_for("e1", "s1").is_some());
        assert!(built.var_for("e1", "s2").is_none());
        assert!(built.var_for("m1", "s1").is_none());
        let name = &built.model.var(built.assignments[0].var).name;
        assert_eq!(name, "assign_e1_s1");
    }

    #[test]
    fn empty_input_builds_empty_model() {
        let built = build_schedule_model(
            &ScheduleInput::default(),
            &ContractRules::default(),
            &ObjectiveWeights::default(),
        );
        assert_eq!(built.model.num_variables(), 0);
        assert_eq!(built.model.num_constraints(), 0);
        assert!(built.skipped_employees.is_empty());
    }

    #[test]
    fn employee_without_eligible_shift_gets_no_exact_count() {
        let input = ScheduleInput::new(
            vec![Employee::new("e1", Category::Trainee, ContractSize::Small)],
            vec![Shift::new("s1", "d1", 0, 2)],
            &[record("e1", "s1", AvailabilityLevel::Unavailable)],
        );
        let built = build_schedule_model(&input, &ContractRules::default(), &ObjectiveWeights::default());

        assert_eq!(built.skipped_employees, vec!["e1".to_string()]);
        assert!(built
            .model
            .constraints()
            .iter()
            .all(|c| !c.name.starts_with("exact_shifts_")));
    }

    #[test]
    fn objective_weights_follow_availability() {
        let input = ScheduleInput::new(
            vec![Employee::new("e1", Category::Experienced, ContractSize::Large)],
            vec![Shift::new("s1", "d1", 0, 1), Shift::new("s2", "d2", 0, 1)],
            &[record("e1", "s1", AvailabilityLevel::Preferred)],
        );
        let built = build_schedule_model(&input, &ContractRules::default(), &ObjectiveWeights::default());
        let objective = built.model.objective().expect("objective set");

        let s1 = built.var_for("e1", "s1").unwrap();
        let s2 = built.var_for("e1", "s2").unwrap();
        assert_eq!(objective.expr.terms[&s1], 10);
        assert_eq!(objective.expr.terms[&s2], 5);
    }

    #[test]
    fn emits_one_supervision_implication_per_trainee() {
        let input = ScheduleInput::new(
            vec![
                Employee::new("x1", Category::Experienced, ContractSize::Large),
                Employee::new("t1", Category::Trainee, ContractSize::Small),
                Employee::new("t2", Category::Trainee, ContractSize::Small),
            ],
            vec![Shift::new("s1", "d1", 1, 3)],
            &[],
        );
        let built = build_schedule_model(&input, &ContractRules::default(), &ObjectiveWeights::default());
        let supervision: Vec<_> = built
            .model
            .constraints()
            .iter()
            .filter(|c| c.name.starts_with("supervision_"))
            .collect();
        assert_eq!(supervision.len(), 2);
        assert!(supervision.iter().all(|c| c.enforcement.len() == 1));
    }

    #[test]
    fn hour_cap_scales_by_hours_per_shift() {
        let input = ScheduleInput::new(
            vec![Employee::new("e1", Category::Experienced, ContractSize::Small)],
            vec![Shift::new("s1", "d1", 0, 1)],
            &[],
        );
        let built = build_schedule_model(&input, &ContractRules::default(), &ObjectiveWeights::default());
        let cap = built
            .model
            .constraints()
            .iter()
            .find(|c| c.name == "max_hours_e1")
            .expect("hour cap emitted");
        assert_eq!(cap.rhs, 20);
        assert_eq!(cap.expr.terms.values().copied().collect::<Vec<_>>(), vec![8]);
    }
}
