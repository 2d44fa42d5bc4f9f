//! Inspect command handler: dump the semantics nodes of one route

use flutter_probar::{NodeSnapshot, ProbeConfig};

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::Reporter;
use crate::InspectArgs;

/// Execute the inspect command
pub async fn execute_inspect(
    config: &CliConfig,
    args: &InspectArgs,
    reporter: &mut Reporter,
) -> CliResult<()> {
    let mut harness = config.harness_config()?;
    if args.headed {
        harness.browser.headless = false;
    }
    let url = harness.app_route(&args.path);

    reporter.start_spinner(&format!("inspecting {url}"));
    let nodes = inspect_url(&harness, &url).await;
    reporter.finish_spinner();
    let nodes = nodes?;

    if args.json {
        reporter.raw(&serde_json::to_string_pretty(&nodes)?);
    } else {
        reporter.info(&format!("{} semantics nodes on {url}", nodes.len()));
        reporter.raw(&render_nodes(&nodes));
    }
    Ok(())
}

#[cfg(feature = "browser")]
async fn inspect_url(harness: &ProbeConfig, url: &str) -> CliResult<Vec<NodeSnapshot>> {
    use flutter_probar::browser::CdpBrowser;
    use flutter_probar::{FlutterHelper, ProbeResult};

    let browser = CdpBrowser::launch(&harness.browser).await?;
    let page = browser.new_page().await?;
    let flutter = FlutterHelper::new(&page, harness.timeouts);
    let nodes: ProbeResult<Vec<NodeSnapshot>> = async {
        flutter.open(url).await?;
        flutter.debug_elements().await
    }
    .await;

    if let Err(e) = browser.close_page(page).await {
        tracing::warn!(error = %e, "page did not close cleanly");
    }
    if let Err(e) = browser.close().await {
        tracing::warn!(error = %e, "chromium did not shut down cleanly");
    }
    Ok(nodes?)
}

#[cfg(not(feature = "browser"))]
async fn inspect_url(_harness: &ProbeConfig, _url: &str) -> CliResult<Vec<NodeSnapshot>> {
    Err(crate::CliError::FeatureDisabled(
        "inspect drives a browser, which this build does not include. Rebuild with --features browser"
            .to_string(),
    ))
}

/// One line per node: index, role, label and text; hidden nodes flagged
#[must_use]
pub fn render_nodes(nodes: &[NodeSnapshot]) -> String {
    nodes
        .iter()
        .map(|node| {
            let mut line = format!(
                "{:>3}  {:<12}",
                node.index,
                node.role.as_deref().unwrap_or("-")
            );
            if let Some(label) = &node.label {
                line.push_str(&format!(" label={label:?}"));
            }
            if let Some(text) = &node.text {
                line.push_str(&format!(" text={text:?}"));
            }
            if !node.visible {
                line.push_str(" (hidden)");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
