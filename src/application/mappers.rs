// Mappers: Convert between the JSON wire format and domain models
// Keeps serde field naming out of the domain layer

use crate::domain::{
    schedule::{normalize_date, AvailabilityRecord, Employee, ScheduleInput, Shift},
    solver_service::ProgressEvent,
    value_objects::{AvailabilityLevel, Category, ContractSize, SolutionStatus},
    Roster,
};
use crate::expression::ModelData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Input-shape errors; these end the run with a failure response
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid request: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("shift {id}: minWorkers ({min}) exceeds maxWorkers ({max})")]
    InvalidStaffing { id: String, min: u32, max: u32 },

    #[error("availability for employee {employee_id} on shift {shift_id}: unknown level {value}")]
    InvalidAvailability {
        employee_id: String,
        shift_id: String,
        value: i64,
    },
}

/// Either request shape accepted on stdin
#[derive(Debug)]
pub enum SolveRequest {
    Schedule(ScheduleRequest),
    Model(ModelData),
}

impl SolveRequest {
    /// Dispatches on the presence of a `modelData` key.
    pub fn from_json(value: serde_json::Value) -> Result<Self, RequestError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ModelEnvelope {
            model_data: ModelData,
        }

        if value.get("modelData").is_some() {
            let envelope: ModelEnvelope = serde_json::from_value(value)?;
            Ok(SolveRequest::Model(envelope.model_data))
        } else {
            Ok(SolveRequest::Schedule(serde_json::from_value(value)?))
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    #[serde(default)]
    pub shift_plan: ShiftPlanDto,
    #[serde(default)]
    pub employees: Vec<EmployeeDto>,
    #[serde(default)]
    pub availabilities: Vec<AvailabilityDto>,
    /// Accepted for compatibility; contract rules come from configuration.
    #[serde(default)]
    pub constraints: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShiftPlanDto {
    #[serde(default)]
    pub shifts: Vec<ShiftDto>,
}

fn default_min_workers() -> u32 {
    1
}

fn default_max_workers() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftDto {
    pub id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default = "default_min_workers")]
    pub min_workers: u32,
    #[serde(default = "default_max_workers")]
    pub max_workers: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    pub employee_type: Category,
    #[serde(default)]
    pub contract_type: ContractSize,
    #[serde(default)]
    pub can_work_alone: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityDto {
    pub employee_id: String,
    pub shift_id: String,
    /// 0 unavailable, 1 preferred, 2 available
    #[serde(default)]
    pub availability: Option<i64>,
    /// 1 preferred, 2 available, 3 unavailable
    #[serde(default)]
    pub preference_level: Option<i64>,
}

impl EmployeeDto {
    fn display_name(&self) -> Option<String> {
        if let Some(name) = &self.name {
            return Some(name.clone());
        }
        let parts: Vec<&str> = [self.firstname.as_deref(), self.lastname.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    fn to_domain(&self) -> Employee {
        let mut employee = Employee::new(self.id.clone(), self.employee_type, self.contract_type)
            .working_alone(self.can_work_alone);
        employee.name = self.display_name();
        if !self.is_active {
            employee = employee.inactive();
        }
        employee
    }
}

impl ShiftDto {
    fn to_domain(&self) -> Result<Shift, RequestError> {
        if self.min_workers > self.max_workers {
            return Err(RequestError::InvalidStaffing {
                id: self.id.clone(),
                min: self.min_workers,
                max: self.max_workers,
            });
        }
        Ok(Shift::new(
            self.id.clone(),
            normalize_date(self.date.as_deref()),
            self.min_workers,
            self.max_workers,
        ))
    }
}

impl AvailabilityDto {
    fn to_domain(&self) -> Result<AvailabilityRecord, RequestError> {
        let level = match (self.availability, self.preference_level) {
            (Some(code), _) => AvailabilityLevel::from_code(code).ok_or(code),
            (None, Some(level)) => AvailabilityLevel::from_preference_level(level).ok_or(level),
            (None, None) => Ok(AvailabilityLevel::Available),
        }
        .map_err(|value| RequestError::InvalidAvailability {
            employee_id: self.employee_id.clone(),
            shift_id: self.shift_id.clone(),
            value,
        })?;

        Ok(AvailabilityRecord {
            employee_id: self.employee_id.clone(),
            shift_id: self.shift_id.clone(),
            level,
        })
    }
}

impl ScheduleRequest {
    /// Converts the request to the domain input; inactive employees are dropped here.
    pub fn to_input(&self) -> Result<ScheduleInput, RequestError> {
        let shifts = self
            .shift_plan
            .shifts
            .iter()
            .map(ShiftDto::to_domain)
            .collect::<Result<Vec<_>, _>>()?;
        let employees = self
            .employees
            .iter()
            .filter(|e| e.is_active)
            .map(EmployeeDto::to_domain)
            .collect();
        let records = self
            .availabilities
            .iter()
            .map(AvailabilityDto::to_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ScheduleInput::new(employees, shifts, &records))
    }
}

/// One `(employee, shift)` pair read back from a model-mode valuation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub employee_id: String,
    pub shift_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Assignments {
    ByShift(Roster),
    Records(Vec<AssignmentRecord>),
}

impl Default for Assignments {
    fn default() -> Self {
        Assignments::ByShift(Roster::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Milliseconds
    pub solve_time: u64,
    pub constraints_added: usize,
    pub variables_created: usize,
    pub optimal: bool,
    pub status: SolutionStatus,
    pub solver: String,
    pub constraints_skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective_value: Option<f64>,
    pub repair_iterations: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolveResponse {
    pub assignments: Assignments,
    pub violations: Vec<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub progress: Vec<ProgressEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_report: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, f64>>,
}

impl SolveResponse {
    /// Response for a run that could not be carried out at all.
    pub fn failure(error: impl std::fmt::Display) -> Self {
        let message = error.to_string();
        Self {
            violations: vec![format!("Error: {message}")],
            resolution_report: Some(vec![format!("Critical error: {message}")]),
            error: Some(message),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_domain_request_with_defaults() {
        let request = SolveRequest::from_json(json!({
            "shiftPlan": { "shifts": [ { "id": "s1", "date": "2024-03-04T08:00:00Z" } ] },
            "employees": [
                { "id": "e1", "firstname": "Ada", "lastname": "L", "employeeType": "experienced",
                  "contractType": "small", "canWorkAlone": true },
                { "id": "e2", "employeeType": "trainee", "isActive": false }
            ],
            "availabilities": [
                { "employeeId": "e1", "shiftId": "s1", "preferenceLevel": 3 }
            ],
            "constraints": []
        }))
        .unwrap();

        let SolveRequest::Schedule(request) = request else {
            panic!("expected domain request");
        };
        let input = request.to_input().unwrap();
        assert_eq!(input.shifts[0].date, "2024-03-04");
        assert_eq!((input.shifts[0].min_workers, input.shifts[0].max_workers), (1, 3));
        assert_eq!(input.employees.len(), 1);
        assert_eq!(input.employees[0].display_name(), "Ada L");
        assert_eq!(input.level("e1", "s1"), AvailabilityLevel::Unavailable);
    }

    #[test]
    fn model_data_key_selects_model_mode() {
        let request = SolveRequest::from_json(json!({
            "modelData": { "variables": { "x": { "type": "bool" } }, "constraints": [] }
        }))
        .unwrap();
        assert!(matches!(request, SolveRequest::Model(data) if data.variables.len() == 1));
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(
            SolveRequest::from_json(json!({ "employees": "nope" })),
            Err(RequestError::Malformed(_))
        ));

        let request: ScheduleRequest = serde_json::from_value(json!({
            "shiftPlan": { "shifts": [ { "id": "s1", "minWorkers": 4, "maxWorkers": 2 } ] }
        }))
        .unwrap();
        assert!(matches!(
            request.to_input(),
            Err(RequestError::InvalidStaffing { min: 4, max: 2, .. })
        ));

        let request: ScheduleRequest = serde_json::from_value(json!({
            "availabilities": [ { "employeeId": "e", "shiftId": "s", "availability": 7 } ]
        }))
        .unwrap();
        assert!(matches!(
            request.to_input(),
            Err(RequestError::InvalidAvailability { value: 7, .. })
        ));
    }

    #[test]
    fn failure_response_shape() {
        let value = serde_json::to_value(SolveResponse::failure("boom")).unwrap();
        assert_eq!(
            value,
            json!({
                "assignments": {},
                "violations": ["Error: boom"],
                "success": false,
                "resolution_report": ["Critical error: boom"],
                "error": "boom"
            })
        );
    }
}
