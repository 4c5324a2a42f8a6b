//! Scenario runner: isolation, fail-fast steps and failure artifacts.
//!
//! ```text
//! catalog ──filter──► selected ──buffer_unordered(workers)──► ScenarioReport
//!                                  │
//!                                  ├─ SessionFactory::create()  fresh surface
//!                                  ├─ steps in order, stop at first failure
//!                                  ├─ failure: one screenshot, <dir>/<slug>.png
//!                                  └─ close surface
//! ```
//!
//! Every scenario runs under its own bound. An optional run deadline drops
//! whatever is still in flight and reports it as aborted.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::fixtures::CredentialSet;
use crate::pages::Pages;
use crate::reporter::{RunReport, ScenarioReport, StepReport};
use crate::result::{TriageError, TriageResult};
use crate::scenario::{Scenario, ScenarioContext};
use crate::session::{Session, SessionConfig, SessionFactory};
use crate::surface::Screenshot;

/// Default bound for one scenario (2 minutes)
pub const DEFAULT_SCENARIO_TIMEOUT_MS: u64 = 120_000;

/// Suite name used when none is configured
pub const DEFAULT_SUITE_NAME: &str = "triage";

// =============================================================================
// FILTER
// =============================================================================

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    Literal,
}

/// Selects scenarios by title
///
/// The pattern is compiled as a regular expression; when it does not
/// compile it is matched as a literal substring instead.
#[derive(Debug, Clone)]
pub struct ScenarioFilter {
    pattern: String,
    matcher: Matcher,
}

impl ScenarioFilter {
    /// Filter from a user pattern
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        let matcher = Regex::new(&pattern).map_or(Matcher::Literal, Matcher::Regex);
        Self { pattern, matcher }
    }

    /// The pattern as given
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the pattern compiled as a regex
    #[must_use]
    pub const fn is_regex(&self) -> bool {
        matches!(self.matcher, Matcher::Regex(_))
    }

    /// Whether `title` is selected
    #[must_use]
    pub fn matches(&self, title: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(re) => re.is_match(title),
            Matcher::Literal => title.contains(&self.pattern),
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Scenarios in flight at once
    pub workers: usize,
    /// Bound for one scenario unless it sets its own
    pub scenario_timeout: Duration,
    /// Bound for the whole run
    pub run_timeout: Option<Duration>,
    /// Where failure screenshots are written; none keeps them in memory only
    pub artifacts_dir: Option<PathBuf>,
    /// Scenario selection
    pub filter: Option<ScenarioFilter>,
    /// Suite name for reports
    pub suite_name: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            scenario_timeout: Duration::from_millis(DEFAULT_SCENARIO_TIMEOUT_MS),
            run_timeout: None,
            artifacts_dir: None,
            filter: None,
            suite_name: DEFAULT_SUITE_NAME.to_string(),
        }
    }
}

impl RunnerConfig {
    /// Create with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set parallelism, at least one
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set per-scenario bound
    #[must_use]
    pub const fn with_scenario_timeout(mut self, timeout: Duration) -> Self {
        self.scenario_timeout = timeout;
        self
    }

    /// Set run bound
    #[must_use]
    pub const fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// Set screenshot directory
    #[must_use]
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    /// Set title filter
    #[must_use]
    pub fn with_filter(mut self, pattern: impl Into<String>) -> Self {
        self.filter = Some(ScenarioFilter::new(pattern));
        self
    }

    /// Set suite name
    #[must_use]
    pub fn with_suite_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = name.into();
        self
    }
}

// =============================================================================
// OBSERVER
// =============================================================================

/// Progress callbacks, invoked from the runner task
pub trait RunObserver: Send + Sync {
    /// Selection done, `total` scenarios will run
    fn run_started(&self, _total: usize) {}

    /// A scenario acquired a worker
    fn scenario_started(&self, _title: &str) {}

    /// A scenario finished, failed or was aborted
    fn scenario_finished(&self, _report: &ScenarioReport) {}
}

#[derive(Debug)]
struct Silent;

impl RunObserver for Silent {}

// =============================================================================
// RUNNER
// =============================================================================

/// Runs scenarios against fresh sessions
pub struct ScenarioRunner {
    factory: Arc<dyn SessionFactory>,
    session_config: Arc<SessionConfig>,
    credentials: Arc<CredentialSet>,
    pages: Arc<Pages>,
    config: RunnerConfig,
    observer: Arc<dyn RunObserver>,
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("session_config", &self.session_config)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScenarioRunner {
    /// Runner over a session factory
    #[must_use]
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        session_config: SessionConfig,
        credentials: CredentialSet,
        config: RunnerConfig,
    ) -> Self {
        let pages = Arc::new(Pages::new(&session_config));
        Self {
            factory,
            session_config: Arc::new(session_config),
            credentials: Arc::new(credentials),
            pages,
            config,
            observer: Arc::new(Silent),
        }
    }

    /// Receive progress callbacks
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Runner configuration
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Scenarios the filter selects, in catalog order
    #[must_use]
    pub fn select(&self, scenarios: Vec<Scenario>) -> Vec<Scenario> {
        match &self.config.filter {
            Some(filter) => scenarios
                .into_iter()
                .filter(|s| filter.matches(&s.title()))
                .collect(),
            None => scenarios,
        }
    }

    /// Run the selected scenarios and report every one of them
    pub async fn run(&self, scenarios: Vec<Scenario>) -> RunReport {
        let mut report = RunReport::new(self.config.suite_name.clone());
        let selected = self.select(scenarios);
        info!(
            selected = selected.len(),
            workers = self.config.workers,
            "run started"
        );
        self.observer.run_started(selected.len());

        let mut finished: Vec<Option<ScenarioReport>> = selected.iter().map(|_| None).collect();
        {
            let mut in_flight = stream::iter(selected.iter().enumerate())
                .map(|(index, scenario)| async move { (index, self.run_scenario(scenario).await) })
                .buffer_unordered(self.config.workers.max(1));
            let deadline = self.config.run_timeout.map(|t| Instant::now() + t);

            loop {
                let next = match deadline {
                    Some(at) => match tokio::time::timeout_at(at, in_flight.next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            warn!("run deadline reached, aborting unfinished scenarios");
                            break;
                        }
                    },
                    None => in_flight.next().await,
                };
                match next {
                    Some((index, scenario_report)) => {
                        self.observer.scenario_finished(&scenario_report);
                        finished[index] = Some(scenario_report);
                    }
                    None => break,
                }
            }
        }

        for (scenario, slot) in selected.iter().zip(finished) {
            let scenario_report = slot.unwrap_or_else(|| {
                let aborted = ScenarioReport::aborted(
                    scenario.module(),
                    scenario.name(),
                    scenario.steps().iter().map(|s| s.name()),
                );
                self.observer.scenario_finished(&aborted);
                aborted
            });
            report.scenarios.push(scenario_report);
        }
        report.finished_at = chrono::Utc::now();
        info!(summary = %report.summary(), "run finished");
        report
    }

    /// Run one scenario in a fresh session
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioReport {
        let title = scenario.title();
        let started = Instant::now();
        self.observer.scenario_started(&title);
        info!(scenario = %title, "scenario started");

        let surface = match self.factory.create().await {
            Ok(surface) => surface,
            Err(e) => {
                warn!(scenario = %title, error = %e, "session could not be created");
                let steps = scenario
                    .steps()
                    .iter()
                    .map(|s| StepReport::skipped(s.name()))
                    .collect();
                return ScenarioReport::failed(
                    scenario.module(),
                    scenario.name(),
                    steps,
                    None,
                    &e,
                    started.elapsed(),
                );
            }
        };
        let cx = ScenarioContext {
            session: Session::new(surface, self.session_config.clone()),
            pages: self.pages.clone(),
            credentials: self.credentials.clone(),
        };

        let bound = scenario.timeout().unwrap_or(self.config.scenario_timeout);
        let deadline = started + bound;
        let mut steps = Vec::with_capacity(scenario.steps().len());
        let mut failure: Option<(String, TriageError)> = None;

        for step in scenario.steps() {
            if failure.is_some() {
                steps.push(StepReport::skipped(step.name()));
                continue;
            }
            let step_started = Instant::now();
            let outcome = match tokio::time::timeout_at(deadline, step.run(&cx)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(TriageError::timeout(
                    "finish scenario",
                    title.clone(),
                    bound.as_millis() as u64,
                    format!("still running step {:?}", step.name()),
                )),
            };
            match outcome {
                Ok(()) => {
                    debug!(scenario = %title, step = step.name(), "step passed");
                    steps.push(StepReport::passed(step.name(), step_started.elapsed()));
                }
                Err(e) => {
                    warn!(scenario = %title, step = step.name(), kind = %e.kind(), error = %e, "step failed");
                    steps.push(StepReport::failed(
                        step.name(),
                        step_started.elapsed(),
                        e.to_string(),
                    ));
                    failure = Some((step.name().to_string(), e));
                }
            }
        }

        let report = match failure {
            None => ScenarioReport::passed(scenario.module(), scenario.name(), steps, started.elapsed()),
            Some((step, error)) => {
                let report = ScenarioReport::failed(
                    scenario.module(),
                    scenario.name(),
                    steps,
                    Some(step),
                    &error,
                    started.elapsed(),
                );
                match self.capture_failure(&cx.session, &scenario.slug()).await {
                    Some(shot) => {
                        let report = match self.save_artifact(&scenario.slug(), &shot) {
                            Some(path) => report.with_artifact(path),
                            None => report,
                        };
                        report.with_screenshot(shot.data)
                    }
                    None => report,
                }
            }
        };

        if let Err(e) = cx.session.close().await {
            warn!(scenario = %title, error = %e, "session did not close cleanly");
        }
        info!(scenario = %title, status = ?report.status, "scenario finished");
        report
    }

    /// Take the single failure screenshot; losing it never hides the failure
    async fn capture_failure(&self, session: &Session, slug: &str) -> Option<Screenshot> {
        let bound = self.session_config.navigation_timeout;
        match tokio::time::timeout(bound, session.screenshot()).await {
            Ok(Ok(shot)) => Some(shot),
            Ok(Err(e)) => {
                warn!(scenario = slug, error = %e, "failure screenshot not taken");
                None
            }
            Err(_) => {
                warn!(scenario = slug, "failure screenshot timed out");
                None
            }
        }
    }

    /// Write the screenshot under `artifacts_dir`, when one is configured
    fn save_artifact(&self, slug: &str, shot: &Screenshot) -> Option<PathBuf> {
        let dir = self.config.artifacts_dir.as_deref()?;
        match write_artifact(dir, slug, &shot.data) {
            Ok(path) => {
                info!(path = %path.display(), bytes = shot.size_bytes(), "failure screenshot saved");
                Some(path)
            }
            Err(e) => {
                warn!(scenario = slug, error = %e, "failure screenshot not written");
                None
            }
        }
    }
}

fn write_artifact(dir: &Path, slug: &str, data: &[u8]) -> TriageResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{slug}.png"));
    std::fs::write(&path, data)?;
    Ok(path)
}
