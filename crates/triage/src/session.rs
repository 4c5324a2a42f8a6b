//! One scenario's connection to a live surface.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use crate::actions::Actions;
use crate::result::{TriageError, TriageResult};
use crate::surface::{Screenshot, Surface};
use crate::wait::{
    self, LoadState, WaitOptions, DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_NAVIGATION_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS,
};

/// Default application root
pub const DEFAULT_BASE_URL: &str = "https://o3.openmrs.org/openmrs/spa/";

/// Default location picked on the location screen
pub const DEFAULT_LOCATION: &str = "Inpatient Ward";

/// Default bound for the location screen probe (5 seconds)
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;

/// Default bound for retrying assertions (10 seconds)
pub const DEFAULT_ASSERTION_TIMEOUT_MS: u64 = 10_000;

/// Timing and addressing for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Application root, joined with relative paths
    pub base_url: String,
    /// Actionability bound for primitives
    pub action_timeout: Duration,
    /// Bound for navigation and load waits
    pub navigation_timeout: Duration,
    /// Bound for retrying assertions
    pub assertion_timeout: Duration,
    /// Bound for optional-screen probes
    pub probe_timeout: Duration,
    /// Poll granularity for every wait
    pub poll_interval: Duration,
    /// Location chosen on the location screen
    pub location: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            action_timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            navigation_timeout: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
            assertion_timeout: Duration::from_millis(DEFAULT_ASSERTION_TIMEOUT_MS),
            probe_timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            location: DEFAULT_LOCATION.to_string(),
        }
    }
}

impl SessionConfig {
    /// Create with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set application root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    /// Set action bound
    #[must_use]
    pub const fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Set navigation bound
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Set assertion bound
    #[must_use]
    pub const fn with_assertion_timeout(mut self, timeout: Duration) -> Self {
        self.assertion_timeout = timeout;
        self
    }

    /// Set optional-screen probe bound
    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set poll granularity
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set location for the location screen
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Wait options for a given bound
    #[must_use]
    pub const fn wait(&self, timeout: Duration) -> WaitOptions {
        WaitOptions {
            timeout,
            poll_interval: self.poll_interval,
        }
    }

    /// Absolute URL for a path relative to the application root
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if has_scheme(path) {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path.trim_start_matches('/'))
        }
    }
}

/// `about:`, `data:`, `http:` and friends are already absolute
fn has_scheme(path: &str) -> bool {
    static SCHEME: OnceLock<Option<Regex>> = OnceLock::new();
    SCHEME
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(path))
}

/// Creates an isolated surface per scenario
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// New surface with no state shared with any other
    async fn create(&self) -> TriageResult<Arc<dyn Surface>>;
}

/// A surface plus the timing it is driven with
#[derive(Clone)]
pub struct Session {
    surface: Arc<dyn Surface>,
    config: Arc<SessionConfig>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap a surface
    #[must_use]
    pub fn new(surface: Arc<dyn Surface>, config: Arc<SessionConfig>) -> Self {
        Self { surface, config }
    }

    /// Underlying surface
    #[must_use]
    pub fn surface(&self) -> &dyn Surface {
        self.surface.as_ref()
    }

    /// Session configuration
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Primitives with the default action bound
    #[must_use]
    pub fn act(&self) -> Actions<'_> {
        Actions::new(self.surface(), self.config.wait(self.config.action_timeout))
    }

    /// Navigate to a path under the application root and wait for `load`
    pub async fn goto(&self, path: &str) -> TriageResult<()> {
        let url = self.config.url_for(path);
        info!(%url, "navigate");
        self.surface
            .navigate(&url)
            .await
            .map_err(|e| match e {
                TriageError::Driver { message } => TriageError::Navigation {
                    url: url.clone(),
                    message,
                },
                other => other,
            })?;
        self.wait_for_load(LoadState::Load).await
    }

    /// Current location identifier
    pub async fn location(&self) -> TriageResult<String> {
        self.surface.current_url().await
    }

    /// History back, then wait for `load`
    pub async fn go_back(&self) -> TriageResult<()> {
        self.surface.go_back().await?;
        self.wait_for_load(LoadState::Load).await
    }

    /// Reload, then wait for `load`
    pub async fn reload(&self) -> TriageResult<()> {
        self.surface.reload().await?;
        self.wait_for_load(LoadState::Load).await
    }

    /// Wait for a load state within the navigation bound
    pub async fn wait_for_load(&self, state: LoadState) -> TriageResult<()> {
        wait::wait_for_load(
            self.surface(),
            state,
            self.config.wait(self.config.navigation_timeout),
        )
        .await
    }

    /// Wait until the location contains `fragment`
    pub async fn wait_for_location(&self, fragment: &str) -> TriageResult<String> {
        wait::wait_for_url(
            self.surface(),
            fragment,
            self.config.wait(self.config.navigation_timeout),
            |url| url.contains(fragment),
        )
        .await
    }

    /// Full-surface capture
    pub async fn screenshot(&self) -> TriageResult<Screenshot> {
        self.surface.screenshot().await
    }

    /// Release the surface
    pub async fn close(&self) -> TriageResult<()> {
        self.surface.close().await
    }
}
