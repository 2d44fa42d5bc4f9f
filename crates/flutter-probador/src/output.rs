//! Output formatting and progress reporting

use console::{style, Style, Term};
use flutter_probar::journey::{JourneyReport, StepReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::config::CliConfig;

/// Styled terminal output for command results
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Show per-step timings and details of passing steps
    pub verbose: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false, false)
    }
}

impl Reporter {
    /// Create a new reporter writing to stdout
    #[must_use]
    pub fn new(use_color: bool, quiet: bool, verbose: bool) -> Self {
        Self {
            term: Term::stdout(),
            spinner: None,
            use_color,
            quiet,
            verbose,
        }
    }

    /// Reporter matching the CLI flags
    #[must_use]
    pub fn from_config(config: &CliConfig) -> Self {
        Self::new(
            config.color.should_color(),
            config.verbosity.is_quiet(),
            config.verbosity.is_verbose(),
        )
    }

    /// Show a spinner on stderr until [`Self::finish_spinner`]
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(120));
        self.spinner = Some(spinner);
    }

    /// Clear the spinner, if any
    pub fn finish_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message; shown even in quiet mode
    pub fn failure(&self, message: &str) {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an informational line
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self.term.write_line(message);
    }

    /// Print raw output (JSON, YAML); never suppressed
    pub fn raw(&self, text: &str) {
        let _ = self.term.write_line(text.trim_end());
    }

    /// Print a journey report: one line per step, then a summary
    pub fn journey(&self, report: &JourneyReport) {
        if !self.quiet {
            let title = format!("journey {}", report.journey);
            let header = if self.use_color {
                style(title).bold().underlined().to_string()
            } else {
                format!("=== {title} ===")
            };
            let _ = self.term.write_line(&header);
        }
        for step in &report.steps {
            if step.passed && self.quiet {
                continue;
            }
            let _ = self
                .term
                .write_line(&format_step(step, self.use_color, self.verbose));
        }
        if !self.quiet || !report.passed() {
            let _ = self
                .term
                .write_line(&format_summary(report, self.use_color));
        }
    }

    /// Point at the written report file
    pub fn report_written(&self, path: &Path) {
        self.info(&format!("report: {}", path.display()));
    }
}

/// One step line, with failure detail and screenshots underneath
#[must_use]
pub fn format_step(step: &StepReport, use_color: bool, verbose: bool) -> String {
    let marker = match (step.passed, use_color) {
        (true, true) => style("✓").green().bold().to_string(),
        (false, true) => style("✗").red().bold().to_string(),
        (true, false) => "PASS".to_string(),
        (false, false) => "FAIL".to_string(),
    };
    let mut line = format!("{marker} {}", step.name);
    if verbose || !step.passed {
        let timing = format!("({} ms)", step.duration_ms);
        if use_color {
            line.push_str(&format!(" {}", style(timing).dim()));
        } else {
            line.push_str(&format!(" {timing}"));
        }
    }
    if let Some(detail) = &step.detail {
        if !step.passed || verbose {
            line.push_str(&format!("\n    {detail}"));
        }
    }
    for shot in &step.screenshots {
        line.push_str(&format!("\n    screenshot: {}", shot.display()));
    }
    line
}

/// `PASSED`/`FAILED` with step counts and wall time
#[must_use]
pub fn format_summary(report: &JourneyReport, use_color: bool) -> String {
    let total = report.steps.len();
    let passed = report.steps.iter().filter(|s| s.passed).count();
    let failed = total - passed;
    let secs = report.duration_ms() as f64 / 1000.0;
    let ok = report.passed();

    if use_color {
        let status = if ok {
            Style::new().green().bold().apply_to("PASSED")
        } else {
            Style::new().red().bold().apply_to("FAILED")
        };
        format!(
            "{status} {} in {secs:.2}s ({passed}/{total} steps passed, {failed} failed)",
            report.journey
        )
    } else {
        let status = if ok { "PASSED" } else { "FAILED" };
        format!(
            "{status} {} in {secs:.2}s ({passed}/{total} steps passed, {failed} failed)",
            report.journey
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use flutter_probar::journey::JourneyKind;
    use std::path::PathBuf;

    fn step(name: &str, passed: bool) -> StepReport {
        StepReport {
            name: name.to_string(),
            passed,
            duration_ms: 42,
            detail: None,
            screenshots: Vec::new(),
        }
    }

    mod step_tests {
        use super::*;

        #[test]
        fn test_passing_step_is_terse() {
            assert_eq!(format_step(&step("backend health", true), false, false), "PASS backend health");
        }

        #[test]
        fn test_verbose_adds_timing() {
            assert_eq!(
                format_step(&step("backend health", true), false, true),
                "PASS backend health (42 ms)"
            );
        }

        #[test]
        fn test_failure_shows_detail_and_screenshots() {
            let mut failed = step("trainer logs in", false);
            failed.detail = Some("Timeout after 10000ms".to_string());
            failed.screenshots = vec![PathBuf::from("out/cotraining-trainer.png")];
            let line = format_step(&failed, false, false);
            assert_eq!(
                line,
                "FAIL trainer logs in (42 ms)\n    Timeout after 10000ms\n    screenshot: out/cotraining-trainer.png"
            );
        }

        #[test]
        fn test_colored_output_keeps_name() {
            let line = format_step(&step("reset backend", true), true, false);
            assert!(line.contains("reset backend"));
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn test_passed_summary() {
            let mut report = JourneyReport::new(JourneyKind::Smoke);
            report.steps = vec![step("backend health", true), step("reset backend", true)];
            let line = format_summary(&report, false);
            assert!(line.starts_with("PASSED smoke in "));
            assert!(line.ends_with("(2/2 steps passed, 0 failed)"));
        }

        #[test]
        fn test_failed_summary() {
            let mut report = JourneyReport::new(JourneyKind::Cotraining);
            report.steps = vec![step("seed cotraining scenario", false), step("reset backend", true)];
            let line = format_summary(&report, false);
            assert!(line.starts_with("FAILED cotraining"));
            assert!(line.contains("1/2 steps passed, 1 failed"));
        }

        #[test]
        fn test_empty_report_fails() {
            let report = JourneyReport::new(JourneyKind::Welcome);
            assert!(format_summary(&report, false).starts_with("FAILED"));
        }
    }

    #[test]
    fn test_reporter_from_config() {
        use crate::config::{ColorChoice, Verbosity};
        let config = CliConfig::new()
            .with_verbosity(Verbosity::Quiet)
            .with_color(ColorChoice::Never);
        let reporter = Reporter::from_config(&config);
        assert!(reporter.quiet);
        assert!(!reporter.use_color);
        assert!(!reporter.verbose);
    }
}
