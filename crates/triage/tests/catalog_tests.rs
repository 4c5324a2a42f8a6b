//! End-to-end runs of the scenario catalog against the in-memory clinic.
//!
//! The tokio clock is paused so every bounded wait completes instantly
//! while keeping its timing semantics.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::Instant;
use triage::mock::{ClinicOptions, LocationScreen, MockClinicFactory, QueueEntry};
use triage::{
    suite, CredentialSet, ErrorKind, RunReport, RunnerConfig, ScenarioRunner, ScenarioStatus,
    SessionConfig, StepStatus,
};

fn runner_for(options: ClinicOptions, config: RunnerConfig) -> ScenarioRunner {
    let session = SessionConfig::new().with_base_url(options.base_url.clone());
    ScenarioRunner::new(
        Arc::new(MockClinicFactory::new(options)),
        session,
        CredentialSet::default(),
        config,
    )
}

async fn run(options: ClinicOptions, config: RunnerConfig) -> RunReport {
    runner_for(options, config).run(suite::catalog()).await
}

fn failures(report: &RunReport) -> Vec<String> {
    report
        .failures()
        .iter()
        .map(|s| format!("{}: {:?}", s.title(), s.error))
        .collect()
}

// ============================================================================
// Whole catalog
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_catalog_passes_with_location_screen() {
    let report = run(ClinicOptions::default(), RunnerConfig::new().with_workers(4)).await;
    assert_eq!(report.total_count(), suite::catalog().len());
    assert!(report.all_passed(), "{:#?}", failures(&report));
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_catalog_passes_without_location_screen() {
    let options = ClinicOptions::default().with_location_screen(LocationScreen::Never);
    let report = run(options, RunnerConfig::new().with_workers(2)).await;
    assert!(report.all_passed(), "{:#?}", failures(&report));
}

#[tokio::test(start_paused = true)]
async fn test_slow_location_screen_within_probe_bound() {
    let options = ClinicOptions::default()
        .with_location_screen(LocationScreen::Delayed(Duration::from_secs(3)));
    let report = run(options, RunnerConfig::new().with_filter("TC001|TC010")).await;
    assert_eq!(report.total_count(), 2);
    assert!(report.all_passed(), "{:#?}", failures(&report));
}

#[tokio::test(start_paused = true)]
async fn test_empty_queue_still_passes_queue_scenarios() {
    let options = ClinicOptions::default().with_queue(Vec::new());
    let report = run(options, RunnerConfig::new().with_filter("Service Queues")).await;
    assert_eq!(report.total_count(), 3);
    assert!(report.all_passed(), "{:#?}", failures(&report));
}

#[tokio::test(start_paused = true)]
async fn test_long_queue() {
    let queue = (0..25).map(|i| QueueEntry::new(format!("Patient {i}"))).collect();
    let options = ClinicOptions::default().with_queue(queue);
    let report = run(options, RunnerConfig::new().with_filter("TC-06|TC017")).await;
    assert!(report.all_passed(), "{:#?}", failures(&report));
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_rejected_login_fails_with_one_screenshot() {
    let dir = TempDir::new().unwrap();
    let options = ClinicOptions {
        users: vec![("admin".into(), "rotated".into())],
        ..ClinicOptions::default()
    };
    let config = RunnerConfig::new()
        .with_filter("TC001")
        .with_artifacts_dir(dir.path());
    let report = run(options, config).await;

    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Failed);
    assert_eq!(scenario.failing_step.as_deref(), Some("Verify the dashboard is shown"));
    assert_eq!(scenario.error_kind, Some(ErrorKind::AssertionFailed));

    let statuses: Vec<StepStatus> = scenario.steps.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![StepStatus::Passed, StepStatus::Passed, StepStatus::Failed]
    );

    let shots: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(shots.len(), 1);
    assert_eq!(
        scenario.artifact.as_deref(),
        Some(
            dir.path()
                .join("authentication-tc001-successful-login-with-valid-credentials.png")
                .as_path()
        )
    );
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failure_does_not_leak_into_other_scenarios() {
    let options = ClinicOptions {
        users: vec![("admin".into(), "rotated".into())],
        ..ClinicOptions::default()
    };
    let report = run(options, RunnerConfig::new().with_workers(3)).await;
    // login-dependent scenarios fail; rejection scenarios still pass
    for title in ["TC002", "TC003", "TC004", "TC005", "TC007", "TC014"] {
        let scenario = report
            .scenarios
            .iter()
            .find(|s| s.name.starts_with(title))
            .unwrap();
        assert_eq!(scenario.status, ScenarioStatus::Passed, "{title}");
    }
    let failed = report
        .scenarios
        .iter()
        .find(|s| s.name.starts_with("TC-08"))
        .unwrap();
    assert_eq!(failed.status, ScenarioStatus::Failed);
    assert_eq!(failed.steps.last().unwrap().status, StepStatus::Skipped);
}

#[tokio::test(start_paused = true)]
async fn test_run_deadline_aborts_the_rest() {
    let config = RunnerConfig::new().with_run_timeout(Duration::from_secs(1));
    let started = Instant::now();
    let report = run(ClinicOptions::default(), config).await;
    assert!(started.elapsed() <= Duration::from_secs(2));
    assert_eq!(report.total_count(), suite::catalog().len());
    assert!(report
        .scenarios
        .iter()
        .any(|s| s.status == ScenarioStatus::Aborted));
    assert_eq!(report.exit_code(), 1);
}

// ============================================================================
// Timing properties
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_invalid_login_costs_one_probe_bound() {
    let config = RunnerConfig::new().with_filter("TC002");
    let started = Instant::now();
    let report = run(ClinicOptions::default(), config).await;
    assert!(report.all_passed(), "{:#?}", failures(&report));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(5), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(7), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_long_username_is_read_back_whole() {
    let report = run(ClinicOptions::default(), RunnerConfig::new().with_filter("TC009")).await;
    assert!(report.all_passed(), "{:#?}", failures(&report));
    let steps: Vec<&str> = report.scenarios[0]
        .steps
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert!(steps.contains(&"Verify the username is kept whole"));
    assert!(report.scenarios[0].steps.iter().all(|s| s.status == StepStatus::Passed));
}

// ============================================================================
// Reports
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_reports_cover_every_scenario() {
    let report = run(
        ClinicOptions::default(),
        RunnerConfig::new()
            .with_filter("Navigation")
            .with_suite_name("clinic"),
    )
    .await;
    assert_eq!(report.summary(), "clinic: 3/3 passed (100.0%)");
    let xml = report.render_junit();
    assert_eq!(xml.matches("<testcase ").count(), 3);
    assert!(!xml.contains("<failure"));
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["scenarios"].as_array().unwrap().len(), 3);
}
