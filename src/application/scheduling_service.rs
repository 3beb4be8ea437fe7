// Scheduling service: orchestrates one request end to end
// build → lower → solve → extract → validate → repair → format

use super::gateway::{GatewayOutcome, GatewaySettings, SolverGateway};
use super::mappers::{
    Assignments, RequestError, ResponseMetadata, ScheduleRequest, SolveRequest, SolveResponse,
};
use super::result_formatter::{
    assign_managers, assignment_records, roster_from_values, variable_values,
};
use super::run_recorder::RunRecorder;
use crate::domain::{
    models::SolverConfig,
    repair::{repair_roster, RepairPolicy},
    schedule::{ContractRules, ObjectiveWeights, Roster, ScheduleInput},
    solver_service::{SolverError, SolverService},
    value_objects::{Category, SolutionStatus},
    violations::{count_critical_violations, detect_violations},
};
use crate::expression::{build_generic_model, ModelData};
use crate::infrastructure::history::{RunMode, RunSummary};
use crate::model::build_schedule_model;
use crate::solver::SolverFactory;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything the service needs besides the solver itself
#[derive(Debug, Clone, Default)]
pub struct ServiceSettings {
    pub solver: SolverConfig,
    pub gateway: GatewaySettings,
    pub contract: ContractRules,
    pub objective: ObjectiveWeights,
    pub repair: RepairPolicy,
}

pub struct SchedulingService {
    gateway: SolverGateway,
    settings: ServiceSettings,
    recorder: RunRecorder,
}

impl SchedulingService {
    pub fn new(solver: Arc<dyn SolverService>, settings: ServiceSettings) -> Self {
        Self {
            gateway: SolverGateway::new(solver, settings.gateway.clone()),
            settings,
            recorder: RunRecorder::disabled(),
        }
    }

    /// Picks the backend named in the settings.
    pub fn from_settings(settings: ServiceSettings) -> Result<Self, SolverError> {
        let solver = SolverFactory::create_from_backend(settings.solver.backend)?;
        Ok(Self::new(solver, settings))
    }

    pub fn with_recorder(mut self, recorder: RunRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// Handles the request text read from the caller.
    pub async fn handle_str(&self, raw: &str) -> Result<SolveResponse, RequestError> {
        match serde_json::from_str(raw) {
            Ok(value) => self.handle_json(value).await,
            Err(e) => Err(self.rejected(e.into())),
        }
    }

    /// Handles a parsed request document of either shape.
    pub async fn handle_json(&self, value: serde_json::Value) -> Result<SolveResponse, RequestError> {
        match SolveRequest::from_json(value) {
            Ok(SolveRequest::Model(data)) => Ok(self.solve_model(&data).await),
            Ok(SolveRequest::Schedule(request)) => {
                self.schedule(&request).await.map_err(|e| self.rejected(e))
            }
            Err(e) => Err(self.rejected(e)),
        }
    }

    pub async fn schedule(&self, request: &ScheduleRequest) -> Result<SolveResponse, RequestError> {
        if !request.constraints.is_null() {
            debug!("request-level constraints are ignored; contract rules come from configuration");
        }
        let input = request.to_input()?;
        Ok(self.schedule_input(&input).await)
    }

    /// Domain-mode pipeline for an already validated input.
    pub async fn schedule_input(&self, input: &ScheduleInput) -> SolveResponse {
        let started = Instant::now();
        let settings = &self.settings;
        let mut report = vec!["Starting scheduling optimization".to_string()];

        let count = |category: Category| input.employees.iter().filter(|e| e.category == category).count();
        report.push(format!(
            "Employee counts: {} managers, {} experienced, {} trainees",
            count(Category::Manager),
            count(Category::Experienced),
            count(Category::Trainee)
        ));

        if input.employees.is_empty() || input.shifts.is_empty() {
            // No solver run; the empty roster is judged like any other.
            let roster = Roster::for_shifts(&input.shifts);
            let violations = detect_violations(input, &roster, &settings.contract);
            let critical = count_critical_violations(&violations);
            let success = critical == 0;
            report.push("Nothing to schedule: no employees or no shifts".to_string());
            report.push(format!("Scheduling completed: {success}"));
            let response = SolveResponse {
                assignments: Assignments::ByShift(roster),
                violations: violations.iter().map(ToString::to_string).collect(),
                success,
                metadata: Some(ResponseMetadata {
                    solve_time: started.elapsed().as_millis() as u64,
                    constraints_added: 0,
                    variables_created: 0,
                    optimal: true,
                    status: SolutionStatus::Optimal,
                    solver: self.gateway.solver_name().to_string(),
                    constraints_skipped: 0,
                    objective_value: None,
                    repair_iterations: 0,
                }),
                resolution_report: Some(report),
                ..SolveResponse::default()
            };
            self.record(RunMode::Schedule, &response, critical);
            return response;
        }

        let schedule = build_schedule_model(input, &settings.contract, &settings.objective);
        report.extend(schedule.report.iter().cloned());

        let problem = match schedule.model.lower(settings.solver.clone()) {
            Ok(problem) => problem.with_name("shift-schedule"),
            Err(e) => return self.failed(RunMode::Schedule, e),
        };

        report.push("Solving optimization model".to_string());
        let outcome = match self.gateway.solve(problem).await {
            Ok(outcome) => outcome,
            Err(e) => return self.failed(RunMode::Schedule, e),
        };
        report.push(status_line(&outcome));

        let mut metadata = ResponseMetadata {
            solve_time: started.elapsed().as_millis() as u64,
            constraints_added: schedule.model.num_constraints(),
            variables_created: schedule.model.num_variables(),
            optimal: outcome.solution.is_optimal(),
            status: outcome.solution.status,
            solver: outcome.solver.clone(),
            constraints_skipped: 0,
            objective_value: outcome.solution.objective_value,
            repair_iterations: 0,
        };

        if !outcome.solution.is_feasible() {
            let response = SolveResponse {
                assignments: Assignments::ByShift(Roster::new()),
                violations: vec![format!(
                    "No solution found ({}): {}",
                    outcome.solution.status, outcome.solution.message
                )],
                success: false,
                metadata: Some(metadata),
                progress: outcome.progress,
                resolution_report: Some(report),
                ..SolveResponse::default()
            };
            self.record(RunMode::Schedule, &response, 0);
            return response;
        }

        let mut roster = roster_from_values(input, &schedule, &outcome.solution.variable_values);
        let found = detect_violations(input, &roster, &settings.contract);
        let critical = count_critical_violations(&found);
        if critical > 0 {
            report.push(format!(
                "Found {critical} critical violations, attempting repair"
            ));
            let repaired = repair_roster(input, roster, &settings.contract, &settings.repair);
            report.extend(repaired.applied);
            metadata.repair_iterations = repaired.iterations;
            roster = repaired.roster;
        }

        report.extend(assign_managers(input, &mut roster));

        let violations = detect_violations(input, &roster, &settings.contract);
        let critical = count_critical_violations(&violations);
        let success = critical == 0;
        report.push(format!("Scheduling completed: {success}"));
        metadata.solve_time = started.elapsed().as_millis() as u64;

        info!(
            success,
            violations = violations.len(),
            critical,
            "Scheduling finished"
        );

        let response = SolveResponse {
            assignments: Assignments::ByShift(roster),
            violations: violations.iter().map(ToString::to_string).collect(),
            success,
            metadata: Some(metadata),
            progress: outcome.progress,
            resolution_report: Some(report),
            ..SolveResponse::default()
        };
        self.record(RunMode::Schedule, &response, critical);
        response
    }

    /// Model-mode pipeline: interpret expressions, solve, report raw variables.
    pub async fn solve_model(&self, data: &ModelData) -> SolveResponse {
        let started = Instant::now();
        let generic = build_generic_model(data);
        let mut report = generic.report.clone();

        let problem = match generic.model.lower(self.settings.solver.clone()) {
            Ok(problem) => problem.with_name("expression-model"),
            Err(e) => return self.failed(RunMode::Model, e),
        };
        let outcome = match self.gateway.solve(problem).await {
            Ok(outcome) => outcome,
            Err(e) => return self.failed(RunMode::Model, e),
        };
        report.push(status_line(&outcome));

        let solution = &outcome.solution;
        let feasible = solution.is_feasible();
        let (assignments, variables, violations) = if feasible {
            (
                assignment_records(&generic.model, &solution.variable_values),
                Some(variable_values(&generic.model, &solution.variable_values)),
                Vec::new(),
            )
        } else {
            (
                Vec::new(),
                None,
                vec![format!(
                    "No solution found ({}): {}",
                    solution.status, solution.message
                )],
            )
        };

        let response = SolveResponse {
            assignments: Assignments::Records(assignments),
            violations,
            success: feasible,
            metadata: Some(ResponseMetadata {
                solve_time: started.elapsed().as_millis() as u64,
                constraints_added: generic.constraints_added,
                variables_created: generic.model.num_variables(),
                optimal: solution.is_optimal(),
                status: solution.status,
                solver: outcome.solver.clone(),
                constraints_skipped: generic.constraints_skipped,
                objective_value: solution.objective_value,
                repair_iterations: 0,
            }),
            progress: outcome.progress.clone(),
            resolution_report: Some(report),
            variables,
            ..SolveResponse::default()
        };
        self.record(RunMode::Model, &response, 0);
        response
    }

    /// Waits for pending history writes.
    pub async fn finish(&self) {
        self.recorder.drain().await;
    }

    fn rejected(&self, error: RequestError) -> RequestError {
        warn!(error = %error, "request rejected");
        let mut summary = RunSummary::new(RunMode::Schedule, false);
        summary.error = Some(error.to_string());
        self.recorder.submit(summary);
        error
    }

    fn failed(&self, mode: RunMode, error: impl std::fmt::Display) -> SolveResponse {
        warn!(error = %error, "run failed");
        let response = SolveResponse::failure(error);
        self.record(mode, &response, 0);
        response
    }

    fn record(&self, mode: RunMode, response: &SolveResponse, critical: usize) {
        let mut summary = RunSummary::new(mode, response.success);
        if let Some(metadata) = &response.metadata {
            summary.status = Some(metadata.status);
            summary.solver = Some(metadata.solver.clone());
            summary.solve_time_ms = metadata.solve_time;
            summary.variables = metadata.variables_created;
            summary.constraints = metadata.constraints_added;
            summary.repair_iterations = metadata.repair_iterations;
        }
        summary.violations = response.violations.len();
        summary.critical_violations = critical;
        summary.error = response.error.clone();
        self.recorder.submit(summary);
    }
}

fn status_line(outcome: &GatewayOutcome) -> String {
    match outcome.solution.status {
        SolutionStatus::Optimal => "Optimal solution found".to_string(),
        SolutionStatus::Feasible => "Feasible solution found (may not be optimal)".to_string(),
        status => format!("No solution found ({status})"),
    }
}
