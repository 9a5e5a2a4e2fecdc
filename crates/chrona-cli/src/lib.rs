//! Command-line front end: argument parsing, logging bootstrap, and exit status.

pub mod cli_args;

use anyhow::{Context, Result};
use chrona_core::{
    Credentials, LoggingDestination, LoggingGuard, RunOutcome, RunRequest, Settings,
    SettingsSource, apply_overrides, init_logging, load_settings, save_settings, settings_path,
};
use tracing::{info, warn};

pub use cli_args::{Cli, Command, ConfigCommand, RunArgs};

/// Install logging for this invocation. Keep the guard until the process exits.
pub fn start_logging(cli: &Cli) -> Result<LoggingGuard> {
    let destination = if cli.log_file {
        LoggingDestination::FileAndStderr
    } else {
        LoggingDestination::StderrOnly
    };
    init_logging(destination).context("failed to initialise logging")
}

/// Run the parsed command line and return the process exit status.
pub async fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Some(Command::Config(command)) => {
            handle_config_command(command, cli.config.as_deref())?;
            Ok(0)
        }
        None => Ok(run_post(&cli.run, cli.config.as_deref()).await.exit_code()),
    }
}

/// Resolve settings, apply command-line overrides, and log any warnings.
pub fn resolve_settings(args: &RunArgs, config: Option<&str>) -> Settings {
    let load = load_settings(&settings_path(config));
    let mut warnings = load.warnings;
    let mut settings = load.settings;
    apply_overrides(&mut settings, &args.to_overrides(), &mut warnings);

    match load.source {
        SettingsSource::File => info!(path = %load.path.display(), "Loaded settings"),
        SettingsSource::Default => info!("Using default settings"),
    }
    for warning in warnings {
        warn!("{warning}");
    }
    settings
}

async fn run_post(args: &RunArgs, config: Option<&str>) -> RunOutcome {
    info!("chrona starting");
    let settings = resolve_settings(args, config);
    let credentials = Credentials::from_env();

    let mut request = RunRequest::today(&settings);
    if let Some(date) = args.date {
        request.date = date;
    }
    request.dry_run = args.dry_run;

    let outcome = chrona_core::run(&request, &settings, &credentials).await;
    if outcome.is_success() {
        info!("chrona finished");
    }
    if let RunOutcome::DryRun { text } = &outcome {
        println!("{text}");
    }
    outcome
}

fn handle_config_command(command: ConfigCommand, config: Option<&str>) -> Result<()> {
    let path = settings_path(config);
    match command {
        ConfigCommand::Init { force } => {
            save_settings(&path, &Settings::default(), force)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote default settings to {}", path.display());
        }
        ConfigCommand::Show => {
            let settings = resolve_settings(&RunArgs::default(), config);
            let rendered = chrona_core::config::to_toml(&settings)
                .context("failed to render settings as TOML")?;
            print!("{rendered}");
        }
    }
    Ok(())
}
