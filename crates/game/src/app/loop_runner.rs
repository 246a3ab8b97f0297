use std::process::ExitCode;

use stage_engine::run_app;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_app(app.config, app.components) {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                script_failures = summary.script_failures,
                reason = ?summary.stop_reason,
                "run_complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
