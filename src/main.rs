use clap::Parser;
use shiftopt::infrastructure::{logging, run_once, AppConfig};
use shiftopt::SolveResponse;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// Reads a scheduling or model request on stdin and writes the response on stdout.
#[derive(Debug, Parser)]
#[command(name = "shiftopt", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "SHIFTOPT_CONFIG")]
    config: Option<PathBuf>,

    /// Do not write a run summary to the history directory
    #[arg(long)]
    no_history: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            tracing::error!(error = %e, "configuration rejected");
            return answer_with_failure(&e);
        }
    };
    logging::init(&config.logging.level);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => return answer_with_failure(&e),
    };

    let outcome = runtime.block_on(run_once(&config, !cli.no_history));
    // A solve abandoned at its time budget keeps its blocking thread; do not wait for it.
    runtime.shutdown_background();

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            answer_with_failure(&e)
        }
    }
}

fn answer_with_failure(error: &dyn std::fmt::Display) -> ExitCode {
    let response = SolveResponse::failure(error);
    let mut stdout = std::io::stdout().lock();
    if let Ok(body) = serde_json::to_string(&response) {
        let _ = writeln!(stdout, "{body}");
    }
    ExitCode::FAILURE
}
