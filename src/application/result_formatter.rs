// Result formatter: valuation → caller-facing assignments

use super::mappers::AssignmentRecord;
use crate::domain::{
    schedule::{Roster, ScheduleInput},
    value_objects::{AvailabilityLevel, Category},
};
use crate::model::{builder::ASSIGNMENT_PREFIX, CpModel, ScheduleModel};
use std::collections::{BTreeMap, BTreeSet};

/// Threshold above which a boolean column counts as true.
const TRUE_THRESHOLD: f64 = 0.5;

fn is_set(values: &[f64], index: usize) -> bool {
    values.get(index).is_some_and(|&v| v > TRUE_THRESHOLD)
}

/// Builds the shift → employees roster from a domain-mode valuation.
///
/// Every shift gets an entry, employees appear in input order.
pub fn roster_from_values(input: &ScheduleInput, schedule: &ScheduleModel, values: &[f64]) -> Roster {
    let mut roster = Roster::for_shifts(&input.shifts);
    for assignment in &schedule.assignments {
        if is_set(values, assignment.var.index()) {
            roster.assign(&assignment.shift_id, &assignment.employee_id);
        }
    }
    roster
}

/// Splits `assign_<employeeId>_<shiftId>` at the first underscore after the prefix.
pub fn parse_assignment_name(name: &str) -> Option<(&str, &str)> {
    let rest = name.strip_prefix(ASSIGNMENT_PREFIX)?;
    let (employee_id, shift_id) = rest.split_once('_')?;
    (!employee_id.is_empty() && !shift_id.is_empty()).then_some((employee_id, shift_id))
}

/// Model-mode assignments: every true variable whose name follows the assignment pattern.
pub fn assignment_records(model: &CpModel, values: &[f64]) -> Vec<AssignmentRecord> {
    model
        .variables()
        .iter()
        .enumerate()
        .filter(|&(i, _)| is_set(values, i))
        .filter_map(|(_, def)| parse_assignment_name(&def.name))
        .map(|(employee_id, shift_id)| AssignmentRecord {
            employee_id: employee_id.to_string(),
            shift_id: shift_id.to_string(),
        })
        .collect()
}

/// All model variables by name.
pub fn variable_values(model: &CpModel, values: &[f64]) -> BTreeMap<String, f64> {
    model
        .variables()
        .iter()
        .zip(values)
        .map(|(def, &value)| (def.name.clone(), value))
        .collect()
}

/// Puts each active manager on the shifts they marked preferred, at most one per date.
///
/// Returns one report line per manager placed.
pub fn assign_managers(input: &ScheduleInput, roster: &mut Roster) -> Vec<String> {
    let mut report = Vec::new();
    let by_date = input.shifts_by_date();

    for manager in input
        .employees
        .iter()
        .filter(|e| e.is_active && e.category == Category::Manager)
    {
        let mut placed = BTreeSet::new();
        for (date, shifts) in &by_date {
            let preferred = shifts
                .iter()
                .find(|s| input.level(&manager.id, &s.id) == AvailabilityLevel::Preferred);
            if let Some(shift) = preferred {
                if roster.assign(&shift.id, &manager.id) {
                    placed.insert(*date);
                }
            }
        }
        if !placed.is_empty() {
            report.push(format!(
                "Manager {} assigned to {} preferred shift(s)",
                manager.display_name(),
                placed.len()
            ));
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::{AvailabilityRecord, ContractRules, Employee, ObjectiveWeights, Shift};
    use crate::domain::value_objects::ContractSize;
    use crate::model::build_schedule_model;

    #[test]
    fn parses_assignment_names() {
        assert_eq!(parse_assignment_name("assign_e1_s1"), Some(("e1", "s1")));
        assert_eq!(
            parse_assignment_name("assign_e1_mon_early"),
            Some(("e1", "mon_early"))
        );
        assert_eq!(parse_assignment_name("assign_e1"), None);
        assert_eq!(parse_assignment_name("shift_s1_one_worker"), None);
    }

    #[test]
    fn model_mode_records_and_values() {
        let mut model = CpModel::new();
        model.new_bool_var("assign_e1_s1");
        model.new_bool_var("assign_e2_s1");
        model.new_int_var("load", 0, Some(9));

        let values = [1.0, 0.0, 4.0];
        let records = assignment_records(&model, &values);
        assert_eq!(
            records,
            vec![AssignmentRecord {
                employee_id: "e1".into(),
                shift_id: "s1".into(),
            }]
        );
        assert_eq!(variable_values(&model, &values)["load"], 4.0);
    }

    #[test]
    fn roster_lists_every_shift() {
        let input = ScheduleInput::new(
            vec![Employee::new("e1", Category::Experienced, ContractSize::Small)],
            vec![
                Shift::new("s1", "2024-01-01", 1, 2),
                Shift::new("s2", "2024-01-02", 1, 2),
            ],
            &[],
        );
        let schedule =
            build_schedule_model(&input, &ContractRules::default(), &ObjectiveWeights::default());
        let s1 = schedule.var_for("e1", "s1").unwrap();
        let mut values = vec![0.0; schedule.model.num_variables()];
        values[s1.index()] = 1.0;

        let roster = roster_from_values(&input, &schedule, &values);
        assert_eq!(roster.employees_on("s1"), ["e1".to_string()]);
        assert!(roster.employees_on("s2").is_empty());
        assert_eq!(roster.iter().count(), 2);
    }

    #[test]
    fn managers_take_one_preferred_shift_per_day() {
        let preferred = |shift: &str| AvailabilityRecord {
            employee_id: "m".into(),
            shift_id: shift.into(),
            level: AvailabilityLevel::Preferred,
        };
        let input = ScheduleInput::new(
            vec![Employee::new("m", Category::Manager, ContractSize::Large)],
            vec![
                Shift::new("am", "2024-01-01", 1, 3),
                Shift::new("pm", "2024-01-01", 1, 3),
                Shift::new("tue", "2024-01-02", 1, 3),
                Shift::new("wed", "2024-01-03", 1, 3),
            ],
            &[preferred("am"), preferred("pm"), preferred("tue")],
        );
        let mut roster = Roster::for_shifts(&input.shifts);
        let report = assign_managers(&input, &mut roster);

        assert!(roster.is_assigned("m", "am"));
        assert!(!roster.is_assigned("m", "pm"));
        assert!(roster.is_assigned("m", "tue"));
        assert!(!roster.is_assigned("m", "wed"));
        assert_eq!(report.len(), 1);
    }
}
