//! Backend test API commands: health, setup and reset

use flutter_probar::backend::BackendClient;
use flutter_probar::ProbeError;

use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use crate::SetupArgs;

/// Execute the health command
pub async fn execute_health(client: &BackendClient, reporter: &Reporter) -> CliResult<()> {
    let health = client.health().await?;
    if !health.is_ok() {
        return Err(ProbeError::assertion(format!(
            "backend at {} reports status {:?}",
            client.base_url(),
            health.status
        ))
        .into());
    }
    reporter.success(&format!(
        "backend {} is up (database: {})",
        client.base_url(),
        health.database.as_deref().unwrap_or("unknown")
    ));
    Ok(())
}

/// Execute the setup command; prints the seeded payload as JSON
pub async fn execute_setup(
    client: &BackendClient,
    args: &SetupArgs,
    reporter: &Reporter,
) -> CliResult<()> {
    let scenario = normalize_scenario(&args.scenario)?;
    let payload = client.setup(&scenario).await?;
    let text = if args.compact {
        serde_json::to_string(&payload)?
    } else {
        serde_json::to_string_pretty(&payload)?
    };
    reporter.raw(&text);
    Ok(())
}

/// Execute the reset command
pub async fn execute_reset(client: &BackendClient, reporter: &Reporter) -> CliResult<()> {
    client.reset().await?;
    reporter.success(&format!("backend {} reset", client.base_url()));
    Ok(())
}

/// Scenario names travel in the URL path: lowercase, `-` folded to `_`,
/// ASCII alphanumerics and underscores only
pub fn normalize_scenario(name: &str) -> CliResult<String> {
    let scenario = name.trim().to_ascii_lowercase().replace('-', "_");
    if scenario.is_empty() {
        return Err(CliError::invalid_argument("scenario name is empty"));
    }
    if !scenario
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(CliError::invalid_argument(format!(
            "scenario name {name:?} may only contain letters, digits, '-' and '_'"
        )));
    }
    Ok(scenario)
}
