//! Run command handler

use flutter_probar::backend::BackendClient;
use flutter_probar::journey::{self, JourneyKind, JourneyReport};
use flutter_probar::ProbeConfig;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use crate::RunArgs;

/// Execute the run command
pub async fn execute_run(
    config: &CliConfig,
    args: &RunArgs,
    reporter: &mut Reporter,
) -> CliResult<()> {
    let mut harness = config.harness_config()?;
    if let Some(output) = &args.output {
        harness.output_dir.clone_from(output);
    }
    if args.headed {
        harness.browser.headless = false;
    }
    run_with(&harness, args, reporter).await
}

/// Run a journey with an already resolved configuration
pub async fn run_with(harness: &ProbeConfig, args: &RunArgs, reporter: &mut Reporter) -> CliResult<()> {
    let client = BackendClient::new(&harness.api_url);

    reporter.start_spinner(&format!("running {}", args.journey));
    let outcome = run_journey(args.journey, &client, harness).await;
    reporter.finish_spinner();
    let report = outcome?;

    reporter.journey(&report);
    if !args.no_report {
        let path = report.write_to(&harness.output_dir).await?;
        reporter.report_written(&path);
    }

    if report.passed() {
        return Ok(());
    }
    let step = report
        .first_failure()
        .map_or_else(|| "no steps ran".to_string(), |s| s.name.clone());
    Err(CliError::journey_failed(report.journey.as_str(), step))
}

/// Run `kind`, launching a browser when it needs one
pub async fn run_journey(
    kind: JourneyKind,
    client: &BackendClient,
    harness: &ProbeConfig,
) -> CliResult<JourneyReport> {
    tracing::info!(journey = %kind, app = %harness.app_url, api = %harness.api_url, "starting journey");
    if kind.needs_browser() {
        browser_journey(kind, client, harness).await
    } else {
        Ok(journey::smoke(client).await)
    }
}

#[cfg(feature = "browser")]
async fn browser_journey(
    kind: JourneyKind,
    client: &BackendClient,
    harness: &ProbeConfig,
) -> CliResult<JourneyReport> {
    use flutter_probar::browser::CdpBrowser;

    let browser = CdpBrowser::launch(&harness.browser).await?;
    let outcome = drive(&browser, kind, client, harness).await;
    if let Err(e) = browser.close().await {
        tracing::warn!(error = %e, "chromium did not shut down cleanly");
    }
    outcome
}

#[cfg(feature = "browser")]
async fn drive(
    browser: &flutter_probar::browser::CdpBrowser,
    kind: JourneyKind,
    client: &BackendClient,
    harness: &ProbeConfig,
) -> CliResult<JourneyReport> {
    let report = match kind {
        JourneyKind::Smoke => journey::smoke(client).await,
        JourneyKind::Welcome | JourneyKind::Auth | JourneyKind::SessionAccess => {
            let page = browser.new_page().await?;
            let report = match kind {
                JourneyKind::Auth => journey::auth(client, &page, harness).await,
                JourneyKind::SessionAccess => journey::session_access(client, &page, harness).await,
                _ => journey::welcome(&page, harness).await,
            };
            close_page(browser, page).await;
            report
        }
        JourneyKind::Cotraining | JourneyKind::FeedbackLoop => {
            let trainer = browser.new_page().await?;
            let student = browser.new_page().await?;
            let report = if kind == JourneyKind::Cotraining {
                journey::cotraining(client, &trainer, &student, harness).await
            } else {
                journey::feedback_loop(client, &trainer, &student, harness).await
            };
            close_page(browser, trainer).await;
            close_page(browser, student).await;
            report
        }
    };
    Ok(report)
}

#[cfg(feature = "browser")]
async fn close_page(
    browser: &flutter_probar::browser::CdpBrowser,
    page: flutter_probar::browser::CdpPage,
) {
    if let Err(e) = browser.close_page(page).await {
        tracing::warn!(error = %e, "page did not close cleanly");
    }
}

#[cfg(not(feature = "browser"))]
async fn browser_journey(
    kind: JourneyKind,
    _client: &BackendClient,
    _harness: &ProbeConfig,
) -> CliResult<JourneyReport> {
    Err(CliError::FeatureDisabled(format!(
        "journey {kind} drives a browser, which this build does not include. Rebuild with --features browser"
    )))
}
