//! Run reports: per scenario and per step outcomes.
//!
//! ```text
//! RunReport
//!   └─ ScenarioReport   status, failing step, error kind, artifact
//!        └─ StepReport  passed | failed | skipped
//! ```
//!
//! A report renders as a one-line summary, a detailed text listing, JSON
//! and JUnit XML for CI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::{ErrorKind, TriageError, TriageResult};

/// Outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step completed
    Passed,
    /// Step returned an error
    Failed,
    /// Not run because an earlier step failed
    Skipped,
}

impl StepStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Outcome of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Every step passed
    Passed,
    /// A step failed
    Failed,
    /// Cancelled by the run deadline before it finished
    Aborted,
}

impl ScenarioStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Failed or aborted
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        !self.is_passed()
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed => "FAIL",
            Self::Aborted => "ABORT",
        }
    }
}

/// Recorded step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Step name
    pub name: String,
    /// Step status
    pub status: StepStatus,
    /// Time spent in the step
    pub duration_ms: u64,
    /// Error message if failed
    pub error: Option<String>,
}

impl StepReport {
    /// Create a passing step
    #[must_use]
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Passed,
            duration_ms: duration.as_millis() as u64,
            error: None,
        }
    }

    /// Create a failing step
    #[must_use]
    pub fn failed(name: impl Into<String>, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Failed,
            duration_ms: duration.as_millis() as u64,
            error: Some(error.into()),
        }
    }

    /// Create a skipped step
    #[must_use]
    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Skipped,
            duration_ms: 0,
            error: None,
        }
    }
}

/// Recorded scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Module the scenario belongs to
    pub module: String,
    /// Scenario name
    pub name: String,
    /// Scenario status
    pub status: ScenarioStatus,
    /// Steps in order
    pub steps: Vec<StepReport>,
    /// Name of the step that failed
    pub failing_step: Option<String>,
    /// Kind of the failure
    pub error_kind: Option<ErrorKind>,
    /// Failure message
    pub error: Option<String>,
    /// Screenshot written for the failure
    pub artifact: Option<PathBuf>,
    /// PNG bytes of the failure screenshot, kept whether or not it was written
    #[serde(skip)]
    pub screenshot: Option<Vec<u8>>,
    /// Wall time of the scenario
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// Report with every step passed
    #[must_use]
    pub fn passed(
        module: impl Into<String>,
        name: impl Into<String>,
        steps: Vec<StepReport>,
        duration: Duration,
    ) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            status: ScenarioStatus::Passed,
            steps,
            failing_step: None,
            error_kind: None,
            error: None,
            artifact: None,
            screenshot: None,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Report for a scenario that stopped at `failing_step`
    #[must_use]
    pub fn failed(
        module: impl Into<String>,
        name: impl Into<String>,
        steps: Vec<StepReport>,
        failing_step: Option<String>,
        error: &TriageError,
        duration: Duration,
    ) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            status: ScenarioStatus::Failed,
            steps,
            failing_step,
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
            artifact: None,
            screenshot: None,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Report for a scenario the run deadline cut short
    #[must_use]
    pub fn aborted<'a>(
        module: impl Into<String>,
        name: impl Into<String>,
        step_names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            status: ScenarioStatus::Aborted,
            steps: step_names.into_iter().map(StepReport::skipped).collect(),
            failing_step: None,
            error_kind: Some(ErrorKind::Aborted),
            error: Some("run deadline reached before the scenario finished".to_string()),
            artifact: None,
            screenshot: None,
            duration_ms: 0,
        }
    }

    /// Attach the failure screenshot path
    #[must_use]
    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact = Some(path.into());
        self
    }

    /// Attach the failure screenshot bytes
    #[must_use]
    pub fn with_screenshot(mut self, data: Vec<u8>) -> Self {
        self.screenshot = Some(data);
        self
    }

    /// `module › name`
    #[must_use]
    pub fn title(&self) -> String {
        format!("{} › {}", self.module, self.name)
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier
    pub run_id: Uuid,
    /// Suite name used in summaries and JUnit output
    pub suite_name: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Scenario reports in catalog order
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    /// Empty report stamped now
    #[must_use]
    pub fn new(suite_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            suite_name: suite_name.into(),
            started_at: now,
            finished_at: now,
            scenarios: Vec::new(),
        }
    }

    /// Get number of passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.status.is_passed()).count()
    }

    /// Get number of failed or aborted scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.status.is_failed()).count()
    }

    /// Get total scenario count
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.scenarios.len()
    }

    /// Get pass rate (0.0 to 1.0)
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.scenarios.is_empty() {
            return 1.0;
        }
        self.passed_count() as f64 / self.scenarios.len() as f64
    }

    /// Check if all scenarios passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Process exit status for this run
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.all_passed())
    }

    /// Wall time of the run
    #[must_use]
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Get failing scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.scenarios
            .iter()
            .filter(|s| s.status.is_failed())
            .collect()
    }

    /// Generate summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} passed ({:.1}%)",
            self.suite_name,
            self.passed_count(),
            self.total_count(),
            self.pass_rate() * 100.0
        )
    }

    /// One line per scenario, failures expanded, summary last
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut text = String::new();
        for scenario in &self.scenarios {
            text.push_str(&format!(
                "{} {} ({}ms)\n",
                scenario.status.label(),
                scenario.title(),
                scenario.duration_ms
            ));
            if scenario.status.is_passed() {
                continue;
            }
            if let Some(step) = &scenario.failing_step {
                text.push_str(&format!("    step: {step}\n"));
            }
            if let (Some(kind), Some(error)) = (scenario.error_kind, &scenario.error) {
                text.push_str(&format!("    {kind}: {error}\n"));
            }
            if let Some(artifact) = &scenario.artifact {
                text.push_str(&format!("    screenshot: {}\n", artifact.display()));
            }
        }
        text.push_str(&self.summary());
        text.push('\n');
        text
    }

    /// Pretty JSON
    pub fn to_json(&self) -> TriageResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write JSON report
    ///
    /// # Errors
    ///
    /// Returns error if file writing fails
    pub fn write_json(&self, output_path: &Path) -> TriageResult<()> {
        std::fs::write(output_path, self.to_json()?)?;
        Ok(())
    }

    /// Write JUnit XML for CI integration
    ///
    /// # Errors
    ///
    /// Returns error if file writing fails
    pub fn write_junit(&self, output_path: &Path) -> TriageResult<()> {
        std::fs::write(output_path, self.render_junit())?;
        Ok(())
    }

    /// Render JUnit XML content
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<testsuite name="{}" tests="{}" failures="{}" time="{:.3}" timestamp="{}">"#,
            escape_xml(&self.suite_name),
            self.total_count(),
            self.failed_count(),
            self.duration().as_secs_f64(),
            self.started_at.to_rfc3339()
        ));
        xml.push('\n');

        for scenario in &self.scenarios {
            xml.push_str(&format!(
                r#"  <testcase classname="{}" name="{}" time="{:.3}">"#,
                escape_xml(&scenario.module),
                escape_xml(&scenario.name),
                scenario.duration_ms as f64 / 1000.0
            ));
            xml.push('\n');

            if let Some(error) = &scenario.error {
                let kind = scenario.error_kind.map_or("Failure", ErrorKind::as_str);
                xml.push_str(&format!(
                    r#"    <failure type="{}" message="{}">{}</failure>"#,
                    kind,
                    escape_xml(error),
                    escape_xml(&failure_body(scenario, error))
                ));
                xml.push('\n');
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

fn failure_body(scenario: &ScenarioReport, error: &str) -> String {
    let mut body = String::new();
    if let Some(step) = &scenario.failing_step {
        body.push_str(&format!("step: {step}\n"));
    }
    body.push_str(error);
    if let Some(artifact) = &scenario.artifact {
        body.push_str(&format!("\nscreenshot: {}", artifact.display()));
    }
    body
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample() -> RunReport {
        let mut report = RunReport::new("clinic");
        report.scenarios.push(ScenarioReport::passed(
            "Authentication",
            "TC001: Successful login",
            vec![StepReport::passed("open", Duration::from_millis(20))],
            Duration::from_millis(20),
        ));
        let error = TriageError::assertion("expected location to contain \"login\"");
        report.scenarios.push(
            ScenarioReport::failed(
                "Authentication",
                "TC011: Logout <menu>",
                vec![
                    StepReport::passed("login", Duration::from_millis(5)),
                    StepReport::failed("logout", Duration::from_millis(7), error.to_string()),
                    StepReport::skipped("verify"),
                ],
                Some("logout".to_string()),
                &error,
                Duration::from_millis(12),
            )
            .with_artifact("artifacts/tc011.png"),
        );
        report
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_step_status() {
            assert!(StepStatus::Passed.is_passed());
            assert!(StepStatus::Failed.is_failed());
            assert!(!StepStatus::Skipped.is_failed());
        }

        #[test]
        fn test_aborted_counts_as_failed() {
            assert!(ScenarioStatus::Aborted.is_failed());
            let aborted = ScenarioReport::aborted("Navigation", "TC-04", ["a", "b"]);
            assert_eq!(aborted.error_kind, Some(ErrorKind::Aborted));
            assert!(aborted.steps.iter().all(|s| s.status == StepStatus::Skipped));
        }
    }

    mod summary_tests {
        use super::*;

        #[test]
        fn test_counts_and_exit_code() {
            let report = sample();
            assert_eq!(report.passed_count(), 1);
            assert_eq!(report.failed_count(), 1);
            assert_eq!(report.exit_code(), 1);
            assert_eq!(report.summary(), "clinic: 1/2 passed (50.0%)");
            assert_eq!(report.failures()[0].failing_step.as_deref(), Some("logout"));
        }

        #[test]
        fn test_empty_run_passes() {
            let report = RunReport::new("clinic");
            assert!(report.all_passed());
            assert_eq!(report.exit_code(), 0);
            assert_eq!(report.summary(), "clinic: 0/0 passed (100.0%)");
        }

        #[test]
        fn test_render_text_expands_failures() {
            let text = sample().render_text();
            assert!(text.contains("PASS Authentication › TC001: Successful login"));
            assert!(text.contains("    step: logout"));
            assert!(text.contains("    AssertionFailed: Assertion failed"));
            assert!(text.contains("screenshot: artifacts/tc011.png"));
            assert!(text.ends_with("clinic: 1/2 passed (50.0%)\n"));
        }
    }

    mod output_tests {
        use super::*;

        #[test]
        fn test_json_fields() {
            let json: serde_json::Value =
                serde_json::from_str(&sample().to_json().unwrap()).unwrap();
            let failed = &json["scenarios"][1];
            assert_eq!(failed["status"], "failed");
            assert_eq!(failed["error_kind"], "assertion_failed");
            assert_eq!(failed["steps"][2]["status"], "skipped");
            assert_eq!(failed["artifact"], "artifacts/tc011.png");
        }

        #[test]
        fn test_junit_escapes() {
            let xml = sample().render_junit();
            assert!(xml.starts_with("<?xml"));
            assert!(xml.contains(r#"tests="2" failures="1""#));
            assert!(xml.contains("TC011: Logout &lt;menu&gt;"));
            assert!(xml.contains("&quot;login&quot;"));
            assert!(xml.contains(r#"type="AssertionFailed""#));
        }

        #[test]
        fn test_write_files() {
            let dir = tempfile::tempdir().unwrap();
            let report = sample();
            report.write_json(&dir.path().join("report.json")).unwrap();
            report.write_junit(&dir.path().join("junit.xml")).unwrap();
            let xml = std::fs::read_to_string(dir.path().join("junit.xml")).unwrap();
            assert!(xml.ends_with("</testsuite>\n"));
            let back: RunReport = serde_json::from_str(
                &std::fs::read_to_string(dir.path().join("report.json")).unwrap(),
            )
            .unwrap();
            assert_eq!(back.scenarios, report.scenarios);
        }
    }
}
