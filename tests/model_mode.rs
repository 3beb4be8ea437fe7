use serde_json::json;
use shiftopt::application::{Assignments, SchedulingService, ServiceSettings};
use shiftopt::{MicrolpSolver, SolutionStatus};
use std::sync::Arc;

fn service() -> SchedulingService {
    SchedulingService::new(Arc::new(MicrolpSolver::new()), ServiceSettings::default())
}

#[tokio::test]
async fn interprets_expressions_and_skips_garbage() {
    let response = service()
        .handle_json(json!({
            "modelData": {
                "variables": {
                    "x": { "type": "int", "min": 0, "max": 5 },
                    "y": { "type": "int", "min": 0, "max": 5 }
                },
                "constraints": [
                    { "expression": "3 * x + 2 * y <= 10" },
                    { "expression": "x +* y", "description": "broken" }
                ],
                "objective": { "type": "maximize", "expression": "x + y" }
            }
        }))
        .await
        .unwrap();

    assert!(response.success);
    let metadata = response.metadata.as_ref().unwrap();
    assert_eq!(metadata.status, SolutionStatus::Optimal);
    assert_eq!(metadata.constraints_added, 1);
    assert_eq!(metadata.constraints_skipped, 1);
    assert_eq!(metadata.objective_value, Some(5.0));

    let variables = response.variables.as_ref().unwrap();
    assert_eq!(variables["x"], 0.0);
    assert_eq!(variables["y"], 5.0);
    assert_eq!(response.assignments, Assignments::Records(Vec::new()));

    let report = response.resolution_report.as_ref().unwrap();
    assert!(report.iter().any(|line| line.starts_with("Skipped constraint 'broken'")));
}

#[tokio::test]
async fn implications_and_assignment_names() {
    let response = service()
        .handle_json(json!({
            "modelData": {
                "variables": {
                    "assign_ann_s1": { "type": "bool" },
                    "assign_bob_s1": { "type": "bool" },
                    "assign_bob_s2": { "type": "bool" }
                },
                "constraints": [
                    { "expression": "assign_ann_s1 => assign_bob_s1" },
                    { "expression": "assign_bob_s1 + assign_bob_s2 <= 1" },
                    { "expression": "assign_ann_s1 == 1" }
                ],
                "objective": { "type": "maximize", "expression": "assign_bob_s2" }
            }
        }))
        .await
        .unwrap();

    assert!(response.success);
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(
        value["assignments"],
        json!([
            { "employeeId": "ann", "shiftId": "s1" },
            { "employeeId": "bob", "shiftId": "s1" }
        ])
    );
    assert_eq!(value["variables"]["assign_bob_s2"], 0.0);
}

#[tokio::test]
async fn contradictions_fail_without_variables() {
    let response = service()
        .handle_json(json!({
            "modelData": {
                "variables": { "x": { "type": "bool" } },
                "constraints": [
                    { "expression": "x >= 1" },
                    { "expression": "x <= 0" }
                ]
            }
        }))
        .await
        .unwrap();

    assert!(!response.success);
    assert!(response.variables.is_none());
    assert_eq!(
        response.metadata.as_ref().unwrap().status,
        SolutionStatus::Infeasible
    );
    assert_eq!(response.violations.len(), 1);
}

#[tokio::test]
async fn overflowing_constraint_is_skipped_not_fatal() {
    let response = service()
        .handle_json(json!({
            "modelData": {
                "variables": { "x": { "type": "int", "min": 0, "max": 3 } },
                "constraints": [
                    { "expression": "9223372036854775807 + 1 + x <= 5" },
                    { "expression": "x <= 2" }
                ],
                "objective": { "type": "maximize", "expression": "x" }
            }
        }))
        .await
        .unwrap();

    assert!(response.success);
    let metadata = response.metadata.as_ref().unwrap();
    assert_eq!(metadata.constraints_skipped, 1);
    assert_eq!(metadata.constraints_added, 1);
    assert_eq!(response.variables.as_ref().unwrap()["x"], 2.0);
}
