//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use flutter_probar::journey::JourneyKind;
use std::path::PathBuf;

/// flutter-probador: run Flutter Web E2E journeys against the app and the
/// backend test API
#[derive(Parser, Debug)]
#[command(name = "flutter-probador")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Harness configuration file (YAML)
    #[arg(long, global = true, env = "FLUTTER_PROBAR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log events as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the backend test API is up
    Health,

    /// Seed a named scenario and print its payload
    Setup(SetupArgs),

    /// Wipe all seeded test data
    Reset,

    /// Run a journey and write its report
    Run(RunArgs),

    /// Enable accessibility on one route and list its semantics nodes
    Inspect(InspectArgs),

    /// Show the effective harness configuration
    Config(ConfigArgs),
}

/// Arguments for the setup command
#[derive(Parser, Debug)]
pub struct SetupArgs {
    /// Scenario name (cotraining, feedback_loop, ...)
    pub scenario: String,

    /// Print compact JSON instead of pretty JSON
    #[arg(long)]
    pub compact: bool,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Journey to run (smoke, welcome, auth, cotraining, feedback-loop, session-access)
    #[arg(value_parser = parse_journey)]
    pub journey: JourneyKind,

    /// Directory for the report and failure screenshots
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Skip writing the JSON report
    #[arg(long)]
    pub no_report: bool,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Route to open, relative to the app URL
    #[arg(short, long, default_value = "/")]
    pub path: String,

    /// Print nodes as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print built-in defaults, ignoring file and environment
    #[arg(long)]
    pub defaults: bool,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

fn parse_journey(value: &str) -> Result<JourneyKind, String> {
    value.parse().map_err(|e: flutter_probar::ProbeError| e.to_string())
}
