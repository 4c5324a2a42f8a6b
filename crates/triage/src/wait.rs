//! Bounded waits.
//!
//! Every suspension point in the crate goes through [`poll_until`]: probe,
//! sleep one poll interval, probe again, and give up once the deadline has
//! passed. The final probe never happens later than one poll interval after
//! the deadline, and nothing here sleeps for a fixed duration.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::result::{TriageError, TriageResult};
use crate::surface::Surface;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default bound for an action's actionability wait (5 seconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;

/// Default bound for navigation and load waits (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// LOAD STATE
// =============================================================================

/// Document load states, ordered by progress
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Navigation started, nothing parsed yet
    Loading,
    /// `DOMContentLoaded` fired
    DomContentLoaded,
    /// `load` fired
    #[default]
    Load,
    /// No network activity for a quiet period
    NetworkIdle,
}

impl LoadState {
    /// Event name as the browser reports it
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::Load => "load",
            Self::NetworkIdle => "networkidle",
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Bound and granularity of one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Upper bound
    pub timeout: Duration,
    /// Delay between probes
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Create with a bound and the default poll interval
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Timeout in whole milliseconds
    #[must_use]
    pub const fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Outcome of one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Condition holds
    Ready(T),
    /// Not yet, with the reason
    Pending(String),
}

/// Probe until ready or until `options.timeout` elapses
///
/// Errors returned by `probe` end the wait immediately. On deadline the
/// error is `Timeout` carrying `action`, `target` and the last pending
/// reason.
pub async fn poll_until<T, F, Fut>(
    options: WaitOptions,
    action: &str,
    target: &str,
    mut probe: F,
) -> TriageResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TriageResult<Probe<T>>>,
{
    let deadline = Instant::now() + options.timeout;
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let last = match probe().await? {
            Probe::Ready(value) => return Ok(value),
            Probe::Pending(reason) => reason,
        };
        let now = Instant::now();
        if now >= deadline {
            debug!(action, target, attempts, "wait exhausted");
            return Err(TriageError::timeout(
                action,
                target,
                options.timeout_ms(),
                last,
            ));
        }
        tokio::time::sleep(options.poll_interval.min(deadline - now)).await;
    }
}

/// Wait until the surface reaches at least `state`
pub async fn wait_for_load(
    surface: &dyn Surface,
    state: LoadState,
    options: WaitOptions,
) -> TriageResult<()> {
    poll_until(options, "wait for", state.event_name(), || async move {
        let current = surface.load_state().await?;
        Ok(if current >= state {
            Probe::Ready(())
        } else {
            Probe::Pending(format!("document is at {current}"))
        })
    })
    .await
}

/// Wait until the current location satisfies `predicate`
pub async fn wait_for_url<P>(
    surface: &dyn Surface,
    description: &str,
    options: WaitOptions,
    predicate: P,
) -> TriageResult<String>
where
    P: Fn(&str) -> bool + Send + Sync,
{
    let predicate = &predicate;
    poll_until(options, "reach", description, || async move {
        let url = surface.current_url().await?;
        Ok(if predicate(&url) {
            Probe::Ready(url)
        } else {
            Probe::Pending(format!("location is {url}"))
        })
    })
    .await
}
