//! Command execution

use crate::commands::{ListArgs, ReportFormat, RunArgs};
use crate::config::{RunConfig, Verbosity};
use crate::error::{CliError, CliResult};
use crate::output::{render_listing, render_listing_json, ProgressReporter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use triage::mock::{ClinicOptions, MockClinicFactory};
use triage::{suite, CredentialSet, RunReport, ScenarioFilter, ScenarioRunner, SessionFactory};

/// Install the global subscriber; `RUST_LOG` wins over `-v`
pub fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity == Verbosity::Debug)
        .try_init();
}

fn session_factory(config: &RunConfig) -> CliResult<Arc<dyn SessionFactory>> {
    if config.mock {
        let base_url = config.session_config().base_url;
        let options = ClinicOptions::default().with_base_url(base_url);
        return Ok(Arc::new(MockClinicFactory::new(options)));
    }
    browser_factory(config)
}

#[cfg(feature = "browser")]
fn browser_factory(config: &RunConfig) -> CliResult<Arc<dyn SessionFactory>> {
    Ok(Arc::new(triage::ChromiumFactory::new(
        config.surface_config(),
    )))
}

#[cfg(not(feature = "browser"))]
fn browser_factory(_config: &RunConfig) -> CliResult<Arc<dyn SessionFactory>> {
    Err(CliError::BrowserUnavailable)
}

/// Resolve the effective run configuration for `args`
pub fn resolve_config(args: &RunArgs) -> CliResult<RunConfig> {
    let mut config = RunConfig::load(args.config.as_deref())?
        .with_env(|key| std::env::var(key).ok())
        .with_args(args);
    if config.mock && config.base_url.is_none() {
        config.base_url = Some(ClinicOptions::default().base_url);
    }
    config.validate()?;
    Ok(config)
}

/// Write the report in the configured format; returns the file written
pub fn write_report(report: &RunReport, config: &RunConfig) -> CliResult<Option<PathBuf>> {
    let path = match config.format {
        ReportFormat::Text => return Ok(None),
        ReportFormat::Json => config.output_dir.join("report.json"),
        ReportFormat::Junit => config.output_dir.join("junit.xml"),
    };
    std::fs::create_dir_all(&config.output_dir)?;
    match config.format {
        ReportFormat::Json => report.write_json(&path)?,
        ReportFormat::Junit => report.write_junit(&path)?,
        ReportFormat::Text => {}
    }
    Ok(Some(path))
}

/// `triage run`; returns the process exit status
pub fn run_scenarios(args: &RunArgs, reporter: ProgressReporter) -> CliResult<u8> {
    let config = resolve_config(args)?;
    let factory = session_factory(&config)?;
    let session = config.session_config();
    tracing::info!(
        base_url = %session.base_url,
        workers = config.workers,
        mock = config.mock,
        "starting run"
    );

    let reporter = Arc::new(reporter);
    reporter.header(&format!("Running scenarios against {}", session.base_url));
    let runner = ScenarioRunner::new(
        factory,
        session,
        CredentialSet::from_env(),
        config.runner_config(),
    )
    .with_observer(reporter.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let scenarios = runner.select(suite::catalog());
    if scenarios.is_empty() {
        return Err(CliError::invalid_argument("filter matched no scenarios"));
    }
    let report = runtime.block_on(runner.run(scenarios));

    reporter.summary(&report);
    if let Some(path) = write_report(&report, &config)? {
        reporter.info(&format!("Report written to {}", path.display()));
    }
    println!("{}", report.summary());
    Ok(u8::from(!report.all_passed()))
}

/// `triage list`
pub fn list_scenarios(args: &ListArgs) -> CliResult<()> {
    let filter = args.filter.as_deref().map(ScenarioFilter::new);
    let scenarios: Vec<_> = suite::catalog()
        .into_iter()
        .filter(|s| filter.as_ref().map_or(true, |f| f.matches(&s.title())))
        .collect();
    if args.json {
        println!("{}", render_listing_json(&scenarios)?);
    } else {
        print!("{}", render_listing(&scenarios));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mock_gets_mock_base_url() {
        let args = RunArgs {
            mock: true,
            config: Some(PathBuf::from("/dev/null")),
            ..RunArgs::default()
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.base_url, Some(ClinicOptions::default().base_url));
        assert!(session_factory(&config).is_ok());
    }

    #[test]
    fn test_invalid_workers_rejected() {
        let args = RunArgs {
            workers: Some(0),
            config: Some(PathBuf::from("/dev/null")),
            ..RunArgs::default()
        };
        assert!(matches!(
            resolve_config(&args),
            Err(CliError::Config { .. })
        ));
    }

    #[test]
    fn test_write_report_formats() {
        let dir = TempDir::new().unwrap();
        let report = RunReport::new("triage");

        let text = RunConfig {
            output_dir: dir.path().join("text"),
            ..RunConfig::default()
        };
        assert!(write_report(&report, &text).unwrap().is_none());
        assert!(!text.output_dir.exists());

        let junit = RunConfig {
            output_dir: dir.path().join("out"),
            format: ReportFormat::Junit,
            ..RunConfig::default()
        };
        let path = write_report(&report, &junit).unwrap().unwrap();
        assert_eq!(path, dir.path().join("out/junit.xml"));
        assert!(std::fs::read_to_string(path).unwrap().contains("<testsuite"));
    }
}
