use sensor_stream::{
    cli::CliArgs,
    config::Config,
    logging,
    session::{Session, SessionOutcome},
    sink, source, CancelToken,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

fn main() -> Result<()> {
    // Parse command-line arguments
    let cli_args = CliArgs::parse();

    // Setup logging
    sensor_stream::initialize(cli_args.verbosity(), cli_args.log_file.as_deref())?;

    // Load configuration
    let config = Config::load(&cli_args)?;
    logging::log_app_config(&config);

    let cancel = CancelToken::new();
    cancel
        .install_ctrlc_handler()
        .context("Failed to install Ctrl-C handler")?;

    let byte_source = source::from_config(&config.source, config.limits.max_line_len, cancel.clone())?;
    let mut sinks = sink::build_sinks(&config)?;

    let mut session = Session::new(byte_source, config.limits.clone(), cancel)
        .with_max_frames(config.output.max_frames);

    match session.run(&mut sinks) {
        Ok(summary) => {
            if summary.outcome == SessionOutcome::Cancelled {
                info!("Acquisition cancelled, application shutting down");
            }
            Ok(())
        }
        Err(e) => {
            error!("Acquisition failed: {:#}", e);
            Err(e.into())
        }
    }
}
