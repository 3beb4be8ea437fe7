// Infrastructure: one-shot runner
// Reads one request document and writes exactly one response document

use super::config::AppConfig;
use super::history::FileRunHistory;
use crate::application::{RunRecorder, SchedulingService, SolveResponse};
use crate::domain::solver_service::SolverError;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct Runner {
    service: SchedulingService,
}

impl Runner {
    pub fn new(service: SchedulingService) -> Self {
        Self { service }
    }

    pub fn from_config(config: &AppConfig, record_history: bool) -> Result<Self, SolverError> {
        let mut service = SchedulingService::from_settings(config.service_settings())?;
        if record_history && config.history.enabled {
            let history = FileRunHistory::from_section(&config.history);
            info!(directory = %history.directory().display(), "recording run history");
            service = service.with_recorder(RunRecorder::new(Arc::new(history)));
        }
        Ok(Self::new(service))
    }

    /// Returns whether the request was accepted; a rejected request still gets a response.
    pub async fn run<R, W>(&self, mut input: R, mut output: W) -> Result<bool, RunError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut raw = String::new();
        input.read_to_string(&mut raw).await?;

        let (response, accepted) = match self.service.handle_str(&raw).await {
            Ok(response) => (response, true),
            Err(e) => (SolveResponse::failure(&e), false),
        };
        write_response(&mut output, &response).await?;

        self.service.finish().await;
        Ok(accepted)
    }
}

pub async fn write_response<W>(output: &mut W, response: &SolveResponse) -> Result<(), RunError>
where
    W: AsyncWrite + Unpin,
{
    let mut body = serde_json::to_vec(response)?;
    body.push(b'\n');
    output.write_all(&body).await?;
    output.flush().await?;
    Ok(())
}

/// Serves one request from stdin to stdout.
pub async fn run_once(config: &AppConfig, record_history: bool) -> Result<bool, RunError> {
    let mut stdout = tokio::io::stdout();
    let runner = match Runner::from_config(config, record_history) {
        Ok(runner) => runner,
        Err(e) => {
            error!(error = %e, "no solver backend");
            write_response(&mut stdout, &SolveResponse::failure(&e)).await?;
            return Ok(false);
        }
    };
    runner.run(tokio::io::stdin(), stdout).await
}
