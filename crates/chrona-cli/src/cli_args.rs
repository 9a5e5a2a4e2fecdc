use chrona_core::{FillPolicy, SettingsOverrides};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

/// Post today's year progress to X.
#[derive(Parser, Debug, Clone)]
#[command(name = "chrona", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,

    /// Settings file (defaults to $CHRONA_CONFIG, then the per-user config directory).
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    /// Also write JSON logs under the config directory.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Supported subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Settings file management.
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Write the default settings to the settings file.
    Init {
        /// Overwrite an existing file.
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Print the effective settings as TOML.
    Show,
}

/// Arguments for the default posting flow. None are needed for a scheduled run.
#[derive(Debug, Clone, Args, Default)]
pub struct RunArgs {
    /// Compose and log the post without publishing it.
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Compose for this date (YYYY-MM-DD) instead of today.
    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,

    /// Fill policy for the bar: nearest or floor-by-step.
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<FillPolicy>,

    /// Number of glyphs in the bar.
    #[arg(long, value_name = "N")]
    pub width: Option<usize>,
}

impl RunArgs {
    pub fn to_overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            policy: self.policy,
            width: self.width,
        }
    }
}
