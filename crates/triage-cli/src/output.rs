//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use triage::{RunObserver, RunReport, Scenario, ScenarioReport, ScenarioStatus};

/// Progress reporter for a scenario run
///
/// Scenario lines go to stderr so stdout stays clean for `--format json`
/// consumers piping the summary.
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: ProgressBar,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        let progress_bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb
        };
        Self {
            term: Term::stderr(),
            progress_bar,
            use_color,
            quiet,
        }
    }

    fn write_line(&self, line: &str) {
        self.progress_bar.suspend(|| {
            let _ = self.term.write_line(line);
        });
    }

    fn status_prefix(&self, status: ScenarioStatus) -> String {
        match (status, self.use_color) {
            (ScenarioStatus::Passed, true) => style("✓").green().bold().to_string(),
            (ScenarioStatus::Failed, true) => style("✗").red().bold().to_string(),
            (ScenarioStatus::Aborted, true) => style("⊘").yellow().bold().to_string(),
            (ScenarioStatus::Passed, false) => "PASS".to_string(),
            (ScenarioStatus::Failed, false) => "FAIL".to_string(),
            (ScenarioStatus::Aborted, false) => "ABORT".to_string(),
        }
    }

    /// One line per finished scenario, failures expanded
    pub fn scenario_line(&self, report: &ScenarioReport) {
        // failures print even in quiet mode
        if self.quiet && report.status.is_passed() {
            return;
        }
        let prefix = self.status_prefix(report.status);
        self.write_line(&format!(
            "{prefix} {} ({}ms)",
            report.title(),
            report.duration_ms
        ));
        if report.status.is_passed() {
            return;
        }
        if let Some(step) = &report.failing_step {
            self.write_line(&format!("    step: {step}"));
        }
        if let Some(error) = &report.error {
            self.write_line(&format!("    {error}"));
        }
        if let Some(artifact) = &report.artifact {
            self.write_line(&format!("    screenshot: {}", artifact.display()));
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        self.write_line("");
        self.write_line(&styled);
    }

    /// Print the run summary
    pub fn summary(&self, report: &RunReport) {
        let failed = report.failed_count();
        if self.quiet && failed == 0 {
            return;
        }
        let passed = report.passed_count();
        let total = report.total_count();
        let secs = report.duration().as_secs_f64();

        self.write_line("");
        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };
            self.write_line(&format!(
                "{status} {total} scenarios in {secs:.2}s ({} passed, {} failed)",
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            self.write_line(&format!(
                "{status} {total} scenarios in {secs:.2}s ({passed} passed, {failed} failed)"
            ));
        }
    }
}

impl RunObserver for ProgressReporter {
    fn run_started(&self, total: usize) {
        self.progress_bar.set_length(total as u64);
        self.progress_bar.set_position(0);
    }

    fn scenario_started(&self, title: &str) {
        self.progress_bar.set_message(title.to_string());
    }

    fn scenario_finished(&self, report: &ScenarioReport) {
        self.scenario_line(report);
        self.progress_bar.inc(1);
        if self.progress_bar.length() == Some(self.progress_bar.position()) {
            self.progress_bar.finish_and_clear();
        }
    }
}

/// Scenario listing, one "module › name (n steps)" line each
#[must_use]
pub fn render_listing(scenarios: &[Scenario]) -> String {
    let mut text = String::new();
    let mut module = "";
    for scenario in scenarios {
        if scenario.module() != module {
            module = scenario.module();
            text.push_str(module);
            text.push('\n');
        }
        text.push_str(&format!(
            "  {} ({} steps)\n",
            scenario.name(),
            scenario.steps().len()
        ));
    }
    text.push_str(&format!("{} scenarios\n", scenarios.len()));
    text
}

/// Scenario listing as a JSON array
pub fn render_listing_json(scenarios: &[Scenario]) -> serde_json::Result<String> {
    let entries: Vec<serde_json::Value> = scenarios
        .iter()
        .map(|s| {
            serde_json::json!({
                "module": s.module(),
                "name": s.name(),
                "steps": s.steps().iter().map(|step| step.name()).collect::<Vec<_>>(),
            })
        })
        .collect();
    serde_json::to_string_pretty(&entries)
}
