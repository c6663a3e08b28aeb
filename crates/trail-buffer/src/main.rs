mod cli;
mod logging;
mod run;

use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let settings = cli::Settings::parse();
    logging::setup_logging(settings.verbose);
    tracing::debug!("Settings: {:?}", settings);

    match run::run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
