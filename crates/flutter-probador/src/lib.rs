//! flutter-probador: command-line front end for flutter-probar.
//!
//! ```bash
//! flutter-probador health                  # backend test API up?
//! flutter-probador setup cotraining        # seed and print a scenario
//! flutter-probador run cotraining -o out   # run a journey, write its report
//! flutter-probador inspect --path /login   # list semantics nodes of a route
//! flutter-probador config                  # effective configuration
//! ```

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, InspectArgs, RunArgs, SetupArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{format_step, format_summary, Reporter};
