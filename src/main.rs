//! Binary entrypoint that serves the question wizard.

use std::process::ExitCode;

use mcq_wizard::start_mcq_wizard;

/// Start the wizard HTTP server.
fn main() -> ExitCode {
    start_mcq_wizard::run()
}
