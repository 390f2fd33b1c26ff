use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wikifork::cli::{self, Cli};
use wikifork::ui::output;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "WIKIFORK_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    match cli::run_with(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "wikifork=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
