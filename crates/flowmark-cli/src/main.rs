//! Flowmark CLI entry point.
//!
//! Logs go through `env_logger` at the `--log-level` threshold (`RUST_LOG`
//! can refine it per module). Failures are always printed to stderr as
//! miette reports, whatever the log level, and exit with status 1.

use std::process::ExitCode;

use clap::Parser;
use log::{debug, info};

use flowmark_cli::{Args, error_adapter::to_reportables};

fn main() -> ExitCode {
    miette::set_panic_hook();

    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .parse_env(env_logger::Env::default())
        .init();
    debug!(args:?; "Parsed arguments");

    match flowmark_cli::run(&args) {
        Ok(()) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let reporter = miette::GraphicalReportHandler::new();
            for reportable in to_reportables(&err) {
                let mut report = String::new();
                if reporter.render_report(&mut report, &reportable).is_err() {
                    report = err.to_string();
                }
                eprintln!("{report}");
            }
            ExitCode::FAILURE
        }
    }
}
