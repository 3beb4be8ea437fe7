// Scheduling entities: employees, shifts, availability and the roster
// that maps each shift to its assigned employees.
// Everything here is built fresh per request and never mutated once the
// model builder has seen it, except `Roster`, which the repair loop edits.

use super::value_objects::{AvailabilityLevel, Category, ContractSize};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Date key used when a shift carries no date.
pub const UNKNOWN_DATE: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: String,
    pub name: Option<String>,
    pub category: Category,
    pub contract: ContractSize,
    pub can_work_alone: bool,
    pub is_active: bool,
}

impl Employee {
    pub fn new(id: impl Into<String>, category: Category, contract: ContractSize) -> Self {
        Self {
            id: id.into(),
            name: None,
            category,
            contract,
            can_work_alone: false,
            is_active: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn working_alone(mut self, can_work_alone: bool) -> Self {
        self.can_work_alone = can_work_alone;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Active non-managers are the ones the optimisation model assigns.
    pub fn is_schedulable(&self) -> bool {
        self.is_active && self.category != Category::Manager
    }

    pub fn is_experienced(&self) -> bool {
        self.category == Category::Experienced
    }

    pub fn is_trainee(&self) -> bool {
        self.category == Category::Trainee
    }

    /// Experienced and flagged as able to staff a shift alone.
    pub fn may_work_alone(&self) -> bool {
        self.is_experienced() && self.can_work_alone
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shift {
    pub id: String,
    pub date: String,
    pub min_workers: u32,
    pub max_workers: u32,
}

impl Shift {
    pub fn new(id: impl Into<String>, date: impl Into<String>, min: u32, max: u32) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
            min_workers: min,
            max_workers: max,
        }
    }
}

/// Reduces an ISO timestamp to its calendar date; empty input maps to [`UNKNOWN_DATE`].
pub fn normalize_date(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(date) if !date.is_empty() => date.split('T').next().unwrap_or(date).to_string(),
        _ => UNKNOWN_DATE.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityRecord {
    pub employee_id: String,
    pub shift_id: String,
    pub level: AvailabilityLevel,
}

/// Availability lookup; absent pairs are available, the first record for a pair wins.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityIndex {
    levels: HashMap<(String, String), AvailabilityLevel>,
}

impl AvailabilityIndex {
    pub fn from_records(records: &[AvailabilityRecord]) -> Self {
        let mut levels = HashMap::with_capacity(records.len());
        for record in records {
            levels
                .entry((record.employee_id.clone(), record.shift_id.clone()))
                .or_insert(record.level);
        }
        Self { levels }
    }

    pub fn level(&self, employee_id: &str, shift_id: &str) -> AvailabilityLevel {
        self.levels
            .get(&(employee_id.to_string(), shift_id.to_string()))
            .copied()
            .unwrap_or_default()
    }
}

/// Exact shift count and hour ceiling for one contract size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContractTerms {
    pub shifts: u32,
    pub max_hours: u32,
}

/// Named numeric parameters of the contract rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractRules {
    pub hours_per_shift: u32,
    pub large: ContractTerms,
    pub small: ContractTerms,
}

impl Default for ContractRules {
    fn default() -> Self {
        Self {
            hours_per_shift: 8,
            large: ContractTerms {
                shifts: 10,
                max_hours: 40,
            },
            small: ContractTerms {
                shifts: 5,
                max_hours: 20,
            },
        }
    }
}

impl ContractRules {
    pub fn terms(&self, contract: ContractSize) -> ContractTerms {
        match contract {
            ContractSize::Large => self.large,
            ContractSize::Small => self.small,
        }
    }
}

/// Objective weight per availability level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub preferred: i64,
    pub available: i64,
    pub unavailable_penalty: i64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            preferred: 10,
            available: 5,
            unavailable_penalty: -1000,
        }
    }
}

impl ObjectiveWeights {
    pub fn weight(&self, level: AvailabilityLevel) -> i64 {
        match level {
            AvailabilityLevel::Preferred => self.preferred,
            AvailabilityLevel::Available => self.available,
            AvailabilityLevel::Unavailable => self.unavailable_penalty,
        }
    }
}

/// Everything one scheduling run is computed from
#[derive(Debug, Clone, Default)]
pub struct ScheduleInput {
    pub employees: Vec<Employee>,
    pub shifts: Vec<Shift>,
    pub availability: AvailabilityIndex,
}

impl ScheduleInput {
    pub fn new(
        employees: Vec<Employee>,
        shifts: Vec<Shift>,
        records: &[AvailabilityRecord],
    ) -> Self {
        Self {
            employees,
            shifts,
            availability: AvailabilityIndex::from_records(records),
        }
    }

    pub fn employee(&self, id: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }

    pub fn shift(&self, id: &str) -> Option<&Shift> {
        self.shifts.iter().find(|s| s.id == id)
    }

    pub fn schedulable_employees(&self) -> impl Iterator<Item = &Employee> {
        self.employees.iter().filter(|e| e.is_schedulable())
    }

    /// Shifts grouped by calendar date, in date order, shift order preserved.
    pub fn shifts_by_date(&self) -> BTreeMap<&str, Vec<&Shift>> {
        let mut groups: BTreeMap<&str, Vec<&Shift>> = BTreeMap::new();
        for shift in &self.shifts {
            groups.entry(shift.date.as_str()).or_default().push(shift);
        }
        groups
    }

    pub fn level(&self, employee_id: &str, shift_id: &str) -> AvailabilityLevel {
        self.availability.level(employee_id, shift_id)
    }

    /// Number of shifts a decision variable could exist for.
    pub fn eligible_shift_count(&self, employee_id: &str) -> usize {
        self.shifts
            .iter()
            .filter(|s| self.level(employee_id, &s.id).is_eligible())
            .count()
    }
}

/// Shift id → assigned employee ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Roster(BTreeMap<String, Vec<String>>);

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// A roster with an empty slot for every shift.
    pub fn for_shifts(shifts: &[Shift]) -> Self {
        Self(shifts.iter().map(|s| (s.id.clone(), Vec::new())).collect())
    }

    /// Adds the employee to the shift; returns false if already there.
    pub fn assign(&mut self, shift_id: &str, employee_id: &str) -> bool {
        let slot = self.0.entry(shift_id.to_string()).or_default();
        if slot.iter().any(|e| e == employee_id) {
            return false;
        }
        slot.push(employee_id.to_string());
        true
    }

    pub fn unassign(&mut self, shift_id: &str, employee_id: &str) -> bool {
        match self.0.get_mut(shift_id) {
            Some(slot) => {
                let before = slot.len();
                slot.retain(|e| e != employee_id);
                slot.len() != before
            }
            None => false,
        }
    }

    pub fn employees_on(&self, shift_id: &str) -> &[String] {
        self.0.get(shift_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_assigned(&self, employee_id: &str, shift_id: &str) -> bool {
        self.employees_on(shift_id).iter().any(|e| e == employee_id)
    }

    pub fn shift_count(&self, employee_id: &str) -> usize {
        self.0
            .values()
            .filter(|slot| slot.iter().any(|e| e == employee_id))
            .count()
    }

    pub fn total_assignments(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_availability_record_wins() {
        let records = vec![
            AvailabilityRecord {
                employee_id: "e1".into(),
                shift_id: "s1".into(),
                level: AvailabilityLevel::Preferred,
            },
            AvailabilityRecord {
                employee_id: "e1".into(),
                shift_id: "s1".into(),
                level: AvailabilityLevel::Unavailable,
            },
        ];
        let index = AvailabilityIndex::from_records(&records);
        assert_eq!(index.level("e1", "s1"), AvailabilityLevel::Preferred);
        assert_eq!(index.level("e1", "s2"), AvailabilityLevel::Available);
    }

    #[test]
    fn dates_are_reduced_to_calendar_day() {
        assert_eq!(normalize_date(Some("2024-03-04T08:00:00Z")), "2024-03-04");
        assert_eq!(normalize_date(Some("2024-03-04")), "2024-03-04");
        assert_eq!(normalize_date(Some("  ")), UNKNOWN_DATE);
        assert_eq!(normalize_date(None), UNKNOWN_DATE);
    }

    #[test]
    fn roster_assignment_is_idempotent() {
        let shifts = vec![Shift::new("s1", "d1", 1, 2)];
        let mut roster = Roster::for_shifts(&shifts);
        assert!(roster.assign("s1", "e1"));
        assert!(!roster.assign("s1", "e1"));
        assert_eq!(roster.shift_count("e1"), 1);
        assert!(roster.unassign("s1", "e1"));
        assert!(!roster.unassign("s1", "e1"));
        assert_eq!(roster.total_assignments(), 0);
    }

    #[test]
    fn managers_and_inactive_employees_are_not_schedulable() {
        let manager = Employee::new("m", Category::Manager, ContractSize::Large);
        let gone = Employee::new("g", Category::Experienced, ContractSize::Large).inactive();
        let worker = Employee::new("w", Category::Trainee, ContractSize::Small);
        assert!(!manager.is_schedulable());
        assert!(!gone.is_schedulable());
        assert!(worker.is_schedulable());
    }
}
