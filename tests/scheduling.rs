use serde_json::{json, Value};
use shiftopt::application::{SchedulingService, ServiceSettings};
use shiftopt::infrastructure::AppConfig;
use shiftopt::MicrolpSolver;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

fn service_with(large: u32, small: u32) -> SchedulingService {
    let mut settings = ServiceSettings::default();
    settings.contract.large.shifts = large;
    settings.contract.small.shifts = small;
    SchedulingService::new(Arc::new(MicrolpSolver::new()), settings)
}

async fn run(service: &SchedulingService, request: Value) -> Value {
    let response = service.handle_json(request).await.unwrap();
    serde_json::to_value(&response).unwrap()
}

fn roster(response: &Value) -> BTreeMap<String, Vec<String>> {
    serde_json::from_value(response["assignments"].clone()).unwrap()
}

#[tokio::test]
async fn contradictory_contracts_report_infeasible() {
    let response = run(
        &service_with(10, 5),
        json!({
            "shiftPlan": { "shifts": [
                { "id": "s1", "date": "2024-01-01", "minWorkers": 1, "maxWorkers": 2 },
                { "id": "s2", "date": "2024-01-02", "minWorkers": 1, "maxWorkers": 2 }
            ]},
            "employees": [
                { "id": "t", "employeeType": "trainee", "contractType": "small" },
                { "id": "x", "employeeType": "experienced", "contractType": "large" }
            ],
            "availabilities": [
                { "employeeId": "t", "shiftId": "s1", "availability": 2 },
                { "employeeId": "t", "shiftId": "s2", "availability": 2 },
                { "employeeId": "x", "shiftId": "s1", "availability": 2 },
                { "employeeId": "x", "shiftId": "s2", "availability": 2 }
            ]
        }),
    )
    .await;

    assert_eq!(response["success"], false);
    assert_eq!(response["assignments"], json!({}));
    assert_eq!(response["metadata"]["status"], "INFEASIBLE");
    assert_eq!(response["metadata"]["optimal"], false);
}

#[tokio::test]
async fn empty_rosters_are_still_validated() {
    let service = service_with(10, 5);

    let response = run(&service, json!({ "shiftPlan": { "shifts": [] }, "employees": [] })).await;
    assert_eq!(response["success"], true);
    assert_eq!(response["assignments"], json!({}));

    let response = run(
        &service,
        json!({ "shiftPlan": { "shifts": [
            { "id": "s1", "date": "2024-01-01", "minWorkers": 0 }
        ] }, "employees": [] }),
    )
    .await;
    assert_eq!(response["success"], true);
    assert_eq!(response["assignments"], json!({ "s1": [] }));

    // Default minWorkers is 1, so an empty shift is understaffed.
    let response = run(
        &service,
        json!({ "shiftPlan": { "shifts": [ { "id": "s1", "date": "2024-01-01" } ] }, "employees": [] }),
    )
    .await;
    assert_eq!(response["success"], false);
    assert_eq!(response["assignments"], json!({ "s1": [] }));
    assert!(response["violations"][0].as_str().unwrap().starts_with("UNDERSTAFFED"));
}

#[tokio::test]
async fn feasible_week_respects_staffing_supervision_and_days() {
    let response = run(
        &service_with(2, 2),
        json!({
            "shiftPlan": { "shifts": [
                { "id": "mon_early", "date": "2024-01-01T06:00:00Z", "minWorkers": 1, "maxWorkers": 3 },
                { "id": "mon_late", "date": "2024-01-01T14:00:00Z", "minWorkers": 0, "maxWorkers": 2 },
                { "id": "tue", "date": "2024-01-02", "minWorkers": 1, "maxWorkers": 3 },
                { "id": "wed", "date": "2024-01-03", "minWorkers": 1, "maxWorkers": 3 }
            ]},
            "employees": [
                { "id": "x", "firstname": "Xavier", "employeeType": "experienced", "contractType": "large" },
                { "id": "y", "employeeType": "experienced", "contractType": "large" },
                { "id": "t", "employeeType": "trainee", "contractType": "small" },
                { "id": "gone", "employeeType": "experienced", "isActive": false }
            ],
            "availabilities": [
                { "employeeId": "x", "shiftId": "mon_early", "preferenceLevel": 1 },
                { "employeeId": "t", "shiftId": "wed", "availability": 0 }
            ],
            "constraints": { "ignored": true }
        }),
    )
    .await;

    assert_eq!(response["success"], true, "{response:#}");
    let roster = roster(&response);
    assert_eq!(roster.len(), 4);

    let experienced = ["x", "y"];
    let experienced_count = |slot: &[String]| {
        slot.iter()
            .filter(|e| experienced.contains(&e.as_str()))
            .count()
    };
    for (shift, slot) in &roster {
        assert!(slot.len() <= 3, "{shift} overstaffed");
        assert!(!slot.iter().any(|e| e == "gone"));
        assert_ne!(slot.len(), 1, "{shift} staffed by one non-solo worker");
        if slot.iter().any(|e| e == "t") {
            assert!(experienced_count(slot.as_slice()) >= 1, "{shift} trainee unsupervised");
        }
    }
    assert!(!roster["wed"].contains(&"t".to_string()));

    for employee in ["x", "y", "t"] {
        let monday = ["mon_early", "mon_late"]
            .iter()
            .filter(|s| roster[**s].iter().any(|e| e == employee))
            .count();
        assert!(monday <= 1, "{employee} works twice on Monday");
        let total = roster.values().filter(|slot| slot.iter().any(|e| e == employee)).count();
        assert_eq!(total, 2, "{employee} contract load");
    }

    let report: Vec<String> = serde_json::from_value(response["resolution_report"].clone()).unwrap();
    assert_eq!(report.last().map(String::as_str), Some("Scheduling completed: true"));
}

#[tokio::test]
async fn experienced_solo_worker_is_allowed_alone() {
    let response = run(
        &service_with(1, 1),
        json!({
            "shiftPlan": { "shifts": [
                { "id": "night", "date": "2024-02-01", "minWorkers": 1, "maxWorkers": 1 }
            ]},
            "employees": [
                { "id": "solo", "employeeType": "experienced", "contractType": "large", "canWorkAlone": true }
            ]
        }),
    )
    .await;

    assert_eq!(response["success"], true);
    assert_eq!(response["assignments"], json!({ "night": ["solo"] }));
    assert_eq!(response["violations"], json!([]));
}

#[tokio::test]
async fn configuration_drives_the_contract_rules() {
    let config = AppConfig::from_toml(
        r#"
        [solver]
        backend = "microlp"
        time_limit_secs = 10

        [contract.large]
        shifts = 1
        max_hours = 8
        "#,
        Path::new("inline"),
    )
    .unwrap();
    let service = SchedulingService::from_settings(config.service_settings()).unwrap();

    let response = run(
        &service,
        json!({
            "shiftPlan": { "shifts": [
                { "id": "a", "date": "2024-03-01", "minWorkers": 1, "maxWorkers": 1 },
                { "id": "b", "date": "2024-03-02", "minWorkers": 0, "maxWorkers": 1 }
            ]},
            "employees": [
                { "id": "e", "employeeType": "experienced", "contractType": "large", "canWorkAlone": true }
            ]
        }),
    )
    .await;

    assert_eq!(response["success"], true, "{response:#}");
    assert_eq!(response["assignments"], json!({ "a": ["e"], "b": [] }));
    assert_eq!(response["metadata"]["solver"], "microlp");
}
