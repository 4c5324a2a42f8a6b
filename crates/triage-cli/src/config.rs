//! CLI configuration
//!
//! Precedence, lowest first: built-in defaults, `triage.yaml`, the
//! `TRIAGE_BASE_URL` environment variable, command-line flags.

use crate::commands::{ReportFormat, RunArgs};
use crate::error::{CliError, CliResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use triage::{RunnerConfig, SessionConfig, SurfaceConfig, DEFAULT_SCENARIO_TIMEOUT_MS};

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "triage.yaml";

/// Environment variable overriding the application root
pub const BASE_URL_ENV: &str = "TRIAGE_BASE_URL";

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Quiet - errors only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// From the `-q` flag and `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Default `tracing` filter when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info,triage=info",
            Self::Debug => "debug,chromiumoxide=info",
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when stderr is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// Settings for one `triage run`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Application root; `None` keeps the library default
    pub base_url: Option<String>,
    /// Run the browser without a window
    pub headless: bool,
    /// Scenarios run in parallel
    pub workers: usize,
    /// Per-scenario bound
    pub scenario_timeout_ms: u64,
    /// Whole-run bound
    pub run_timeout_ms: Option<u64>,
    /// Screenshots and reports land here
    pub output_dir: PathBuf,
    /// Report format
    pub format: ReportFormat,
    /// Location picked on the location screen
    pub location: Option<String>,
    /// Chromium binary
    pub chromium_path: Option<PathBuf>,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Actionability bound override
    pub action_timeout_ms: Option<u64>,
    /// Navigation bound override
    pub navigation_timeout_ms: Option<u64>,
    /// Optional-screen probe bound override
    pub probe_timeout_ms: Option<u64>,
    /// Scenario filter
    pub filter: Option<String>,
    /// Use the in-memory clinic
    pub mock: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            headless: true,
            workers: 1,
            scenario_timeout_ms: DEFAULT_SCENARIO_TIMEOUT_MS,
            run_timeout_ms: None,
            output_dir: PathBuf::from("target/triage"),
            format: ReportFormat::Text,
            location: None,
            chromium_path: None,
            viewport_width: 1280,
            viewport_height: 720,
            action_timeout_ms: None,
            navigation_timeout_ms: None,
            probe_timeout_ms: None,
            filter: None,
            mock: false,
        }
    }
}

impl RunConfig {
    /// Parse a YAML document
    pub fn from_yaml(text: &str, path: &Path) -> CliResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(text).map_err(|source| CliError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, or `./triage.yaml` when present, or the defaults
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|e| {
            CliError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Self::from_yaml(&text, &path)
    }

    /// Apply environment overrides read through `lookup`
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.is_empty()) {
            self.base_url = Some(url);
        }
        self
    }

    /// Apply command-line overrides
    #[must_use]
    pub fn with_args(mut self, args: &RunArgs) -> Self {
        if let Some(url) = &args.base_url {
            self.base_url = Some(url.clone());
        }
        if args.headed {
            self.headless = false;
        }
        if let Some(workers) = args.workers {
            self.workers = workers;
        }
        if let Some(timeout) = args.timeout {
            self.scenario_timeout_ms = timeout;
        }
        if let Some(timeout) = args.run_timeout {
            self.run_timeout_ms = Some(timeout);
        }
        if let Some(dir) = &args.output {
            self.output_dir.clone_from(dir);
        }
        if let Some(format) = args.format {
            self.format = format;
        }
        if let Some(location) = &args.location {
            self.location = Some(location.clone());
        }
        if let Some(path) = &args.chromium_path {
            self.chromium_path = Some(path.clone());
        }
        if let Some(filter) = &args.filter {
            self.filter = Some(filter.clone());
        }
        if args.mock {
            self.mock = true;
        }
        self
    }

    /// Reject settings the runner cannot honor
    pub fn validate(&self) -> CliResult<()> {
        if self.workers == 0 {
            return Err(CliError::config("workers must be at least 1"));
        }
        if self.scenario_timeout_ms == 0 {
            return Err(CliError::config("scenario timeout must be positive"));
        }
        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(CliError::config(format!(
                    "base URL must be http(s), got {url:?}"
                )));
            }
        }
        Ok(())
    }

    /// Session settings
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::new();
        if let Some(url) = &self.base_url {
            session = session.with_base_url(url.clone());
        }
        if let Some(location) = &self.location {
            session = session.with_location(location.clone());
        }
        if let Some(ms) = self.action_timeout_ms {
            session = session.with_action_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.navigation_timeout_ms {
            session = session.with_navigation_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.probe_timeout_ms {
            session = session.with_probe_timeout(Duration::from_millis(ms));
        }
        session
    }

    /// Runner settings; screenshots go to `<output_dir>/screenshots`
    #[must_use]
    pub fn runner_config(&self) -> RunnerConfig {
        let mut runner = RunnerConfig::new()
            .with_workers(self.workers)
            .with_scenario_timeout(Duration::from_millis(self.scenario_timeout_ms))
            .with_artifacts_dir(self.output_dir.join("screenshots"));
        if let Some(ms) = self.run_timeout_ms {
            runner = runner.with_run_timeout(Duration::from_millis(ms));
        }
        if let Some(filter) = &self.filter {
            runner = runner.with_filter(filter.clone());
        }
        runner
    }

    /// Browser launch settings
    #[must_use]
    pub fn surface_config(&self) -> SurfaceConfig {
        let mut surface = SurfaceConfig::new()
            .with_headless(self.headless)
            .with_viewport(self.viewport_width, self.viewport_height);
        if let Some(path) = &self.chromium_path {
            surface = surface.with_chromium_path(path.to_string_lossy().into_owned());
        }
        surface
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
            assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(false, 5), Verbosity::Debug);
        }

        #[test]
        fn test_log_filter() {
            assert_eq!(Verbosity::Normal.log_filter(), "warn");
            assert!(Verbosity::Debug.log_filter().starts_with("debug"));
        }
    }

    mod load_tests {
        use super::*;

        #[test]
        fn test_yaml_overrides_defaults() {
            let config = RunConfig::from_yaml(
                "base_url: http://localhost:8080/openmrs/spa/\nworkers: 3\nformat: junit\n",
                Path::new("triage.yaml"),
            )
            .unwrap();
            assert_eq!(
                config.base_url.as_deref(),
                Some("http://localhost:8080/openmrs/spa/")
            );
            assert_eq!(config.workers, 3);
            assert_eq!(config.format, ReportFormat::Junit);
            assert!(config.headless);
            assert_eq!(config.scenario_timeout_ms, DEFAULT_SCENARIO_TIMEOUT_MS);
        }

        #[test]
        fn test_unknown_key_rejected() {
            let err = RunConfig::from_yaml("wrokers: 3\n", Path::new("triage.yaml")).unwrap_err();
            assert!(matches!(err, CliError::ConfigFile { .. }));
        }

        #[test]
        fn test_load_explicit_file() {
            let mut file = NamedTempFile::new().unwrap();
            writeln!(file, "headless: false\nlocation: Outpatient Clinic").unwrap();
            let config = RunConfig::load(Some(file.path())).unwrap();
            assert!(!config.headless);
            assert_eq!(config.location.as_deref(), Some("Outpatient Clinic"));
        }

        #[test]
        fn test_load_missing_explicit_file() {
            let err = RunConfig::load(Some(Path::new("/nonexistent/triage.yaml"))).unwrap_err();
            assert!(matches!(err, CliError::Config { .. }));
        }
    }

    mod precedence_tests {
        use super::*;

        #[test]
        fn test_env_then_flags() {
            let from_file = RunConfig {
                base_url: Some("http://file.test/".into()),
                ..RunConfig::default()
            };
            let env = from_file
                .clone()
                .with_env(|key| (key == BASE_URL_ENV).then(|| "http://env.test/".to_string()));
            assert_eq!(env.base_url.as_deref(), Some("http://env.test/"));

            let args = RunArgs {
                base_url: Some("http://flag.test/".into()),
                workers: Some(2),
                headed: true,
                ..RunArgs::default()
            };
            let flags = env.with_args(&args);
            assert_eq!(flags.base_url.as_deref(), Some("http://flag.test/"));
            assert_eq!(flags.workers, 2);
            assert!(!flags.headless);
        }

        #[test]
        fn test_empty_env_ignored() {
            let config = RunConfig::default().with_env(|_| Some(String::new()));
            assert!(config.base_url.is_none());
        }
    }

    mod build_tests {
        use super::*;

        #[test]
        fn test_validate() {
            assert!(RunConfig::default().validate().is_ok());
            let zero = RunConfig {
                workers: 0,
                ..RunConfig::default()
            };
            assert!(zero.validate().is_err());
            let ftp = RunConfig {
                base_url: Some("ftp://clinic".into()),
                ..RunConfig::default()
            };
            assert!(ftp.validate().is_err());
        }

        #[test]
        fn test_session_config() {
            let config = RunConfig {
                base_url: Some("http://localhost/spa".into()),
                location: Some("Outpatient Clinic".into()),
                probe_timeout_ms: Some(2_000),
                ..RunConfig::default()
            };
            let session = config.session_config();
            assert_eq!(session.base_url, "http://localhost/spa/");
            assert_eq!(session.location, "Outpatient Clinic");
            assert_eq!(session.probe_timeout, Duration::from_secs(2));
        }

        #[test]
        fn test_runner_config() {
            let config = RunConfig {
                workers: 4,
                run_timeout_ms: Some(600_000),
                filter: Some("TC00".into()),
                ..RunConfig::default()
            };
            let runner = config.runner_config();
            assert_eq!(runner.workers, 4);
            assert_eq!(runner.run_timeout, Some(Duration::from_secs(600)));
            assert_eq!(
                runner.artifacts_dir.as_deref(),
                Some(Path::new("target/triage/screenshots"))
            );
            assert!(runner.filter.is_some());
        }

        #[test]
        fn test_surface_config() {
            let config = RunConfig {
                headless: false,
                chromium_path: Some(PathBuf::from("/usr/bin/chromium")),
                ..RunConfig::default()
            };
            let surface = config.surface_config();
            assert!(!surface.headless);
            assert_eq!(surface.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        }
    }
}
