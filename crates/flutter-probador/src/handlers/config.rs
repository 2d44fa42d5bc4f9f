//! Config command handler

use flutter_probar::ProbeConfig;

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::Reporter;
use crate::ConfigArgs;

/// Execute the config command
pub fn execute_config(config: &CliConfig, args: &ConfigArgs, reporter: &Reporter) -> CliResult<()> {
    reporter.raw(&render_config(config, args.defaults)?);
    Ok(())
}

/// Effective configuration as YAML, headed by a comment naming its sources
pub fn render_config(config: &CliConfig, defaults: bool) -> CliResult<String> {
    let (harness, source) = if defaults {
        (ProbeConfig::default(), "built-in defaults".to_string())
    } else {
        let source = match &config.config_path {
            Some(path) => format!("defaults, {}, environment", path.display()),
            None => "defaults, environment".to_string(),
        };
        (config.harness_config()?, source)
    };
    Ok(format!("# {source}\n{}", harness.to_yaml()?))
}
