use chrona_cli::{Cli, Command, ConfigCommand, resolve_settings};
use chrona_core::FillPolicy;
use chrono::NaiveDate;
use clap::Parser;
use std::fs;
use tempfile::tempdir;

// Parsing tests for the scheduled invocation and its preview flags.

#[test]
fn no_arguments_is_a_plain_run() {
    let cli = Cli::try_parse_from(["chrona"]).expect("parse");
    assert!(cli.command.is_none());
    assert!(!cli.run.dry_run);
    assert!(cli.run.date.is_none());
    assert!(cli.run.to_overrides().is_empty());
    assert!(!cli.log_file);
}

#[test]
fn preview_flags_parse() {
    let cli = Cli::try_parse_from([
        "chrona",
        "--dry-run",
        "--date",
        "2024-12-31",
        "--policy",
        "floor-by-step",
        "--width",
        "12",
    ])
    .expect("parse");

    assert!(cli.run.dry_run);
    assert_eq!(cli.run.date, NaiveDate::from_ymd_opt(2024, 12, 31));
    let overrides = cli.run.to_overrides();
    assert_eq!(overrides.policy, Some(FillPolicy::FloorByStep));
    assert_eq!(overrides.width, Some(12));
}

#[test]
fn invalid_values_are_rejected() {
    assert!(Cli::try_parse_from(["chrona", "--date", "2024-02-30"]).is_err());
    assert!(Cli::try_parse_from(["chrona", "--policy", "ceiling"]).is_err());
    assert!(Cli::try_parse_from(["chrona", "--width", "-1"]).is_err());
}

#[test]
fn config_subcommands_accept_global_config_path() {
    let cli = Cli::try_parse_from(["chrona", "config", "init", "--force", "--config", "x.toml"])
        .expect("parse");
    assert_eq!(cli.config.as_deref(), Some("x.toml"));
    match cli.command {
        Some(Command::Config(ConfigCommand::Init { force })) => assert!(force),
        other => panic!("unexpected command: {other:?}"),
    }

    let cli = Cli::try_parse_from(["chrona", "config", "show"]).expect("parse");
    assert!(matches!(
        cli.command,
        Some(Command::Config(ConfigCommand::Show))
    ));
}

#[test]
fn command_line_overrides_settings_file() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("config.toml");
    fs::write(&path, "[bar]\nwidth = 20\nfilled = \"#\"\n").expect("write fixture");

    let cli = Cli::try_parse_from(["chrona", "--policy", "floor-by-step"]).expect("parse");
    let settings = resolve_settings(&cli.run, path.to_str());

    assert_eq!(settings.bar.width, 20);
    assert_eq!(settings.bar.filled, "#");
    assert_eq!(settings.bar.policy, FillPolicy::FloorByStep);
}
