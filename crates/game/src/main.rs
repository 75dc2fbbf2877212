use std::process::ExitCode;

use tracing::error;

mod app;

fn main() -> ExitCode {
    let wiring = app::bootstrap::build_app();
    match engine::run_app(wiring.config, wiring.session, wiring.pump) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "app_failed");
            eprintln!("rollmill failed: {err}");
            ExitCode::from(1)
        }
    }
}
