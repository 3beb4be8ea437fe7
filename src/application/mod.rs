// Application layer: request handling, solver orchestration and result shaping

pub mod gateway;
pub mod mappers;
pub mod result_formatter;
pub mod run_recorder;
pub mod scheduling_service;

pub use gateway::{GatewayOutcome, GatewaySettings, SolverGateway};
pub use mappers::{
    AssignmentRecord, Assignments, RequestError, ResponseMetadata, ScheduleRequest, SolveRequest,
    SolveResponse,
};
pub use run_recorder::RunRecorder;
pub use scheduling_service::{SchedulingService, ServiceSettings};
