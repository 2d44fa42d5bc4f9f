//! flutter-probador: run Flutter Web E2E journeys from the command line
//!
//! ## Usage
//!
//! ```bash
//! flutter-probador run smoke
//! flutter-probador run feedback-loop --output target/e2e -v
//! ```

use clap::Parser;
use flutter_probar::backend::BackendClient;
use flutter_probar::logging::init_tracing;
use flutter_probador::{handlers, Cli, CliConfig, CliResult, ColorChoice, Commands, Reporter, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(&config.log_settings());
    let mut reporter = Reporter::from_config(&config);

    match cli.command {
        Commands::Config(args) => handlers::execute_config(&config, &args, &reporter),
        command => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(dispatch(command, &config, &mut reporter))
        }
    }
}

async fn dispatch(command: Commands, config: &CliConfig, reporter: &mut Reporter) -> CliResult<()> {
    match command {
        Commands::Health => handlers::execute_health(&backend(config)?, reporter).await,
        Commands::Setup(args) => handlers::execute_setup(&backend(config)?, &args, reporter).await,
        Commands::Reset => handlers::execute_reset(&backend(config)?, reporter).await,
        Commands::Run(args) => handlers::execute_run(config, &args, reporter).await,
        Commands::Inspect(args) => handlers::execute_inspect(config, &args, reporter).await,
        Commands::Config(args) => handlers::execute_config(config, &args, reporter),
    }
}

fn backend(config: &CliConfig) -> CliResult<BackendClient> {
    let harness = config.harness_config()?;
    Ok(BackendClient::new(&harness.api_url))
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.clone().into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(color)
        .with_json_logs(cli.json_logs)
        .with_config_path(cli.config.clone())
}
