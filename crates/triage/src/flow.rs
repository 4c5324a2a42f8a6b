//! Optional intermediate screens.
//!
//! After some actions the target may or may not show an interstitial (the
//! location picker after login is the one the clinic has). The handler never
//! assumes either way:
//!
//! ```text
//!            marker visible within probe bound
//! Probing ─────────────────────────────────────▶ Present ──complete()──▶ Resolved
//!    │                                                        │
//!    │ probe bound elapses                                    └─ failure → UnexpectedScreen
//!    ▼
//!  Absent ───────────────────────────────────────────────────────────────▶ Resolved
//! ```
//!
//! Absence is an expected outcome and never an error.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::info;

use crate::actions::ElementCondition;
use crate::locator::{ElementDescriptor, TextMatch};
use crate::result::{TriageError, TriageResult};
use crate::session::Session;
use crate::wait::LoadState;

/// Handler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Waiting for the marker
    Probing,
    /// Marker seen, completing the screen
    Present,
    /// Marker never appeared
    Absent,
    /// Terminal
    Resolved,
}

/// Whether the screen was there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Shown and completed
    Present,
    /// Not shown
    Absent,
}

/// What happened while resolving one interstitial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReport {
    /// Interstitial name
    pub screen: String,
    /// Outcome
    pub outcome: FlowOutcome,
    /// States visited, in order
    pub transitions: Vec<FlowState>,
    /// Time spent
    pub elapsed: Duration,
}

/// An intermediate screen that may appear
#[async_trait]
pub trait Interstitial: Send + Sync {
    /// Name used in reports
    fn name(&self) -> &str;

    /// Element that distinguishes the screen
    fn marker(&self) -> &ElementDescriptor;

    /// How long to wait for the marker
    fn probe_timeout(&self) -> Duration;

    /// Required actions once the screen is present
    async fn complete(&self, session: &Session) -> TriageResult<()>;
}

/// Run the probe / complete state machine for `screen`
///
/// A probe `Timeout` means the screen is absent. Any other probe failure,
/// such as an ambiguous marker, propagates unchanged.
pub async fn resolve_interstitial(
    session: &Session,
    screen: &dyn Interstitial,
) -> TriageResult<FlowReport> {
    let start = Instant::now();
    let mut transitions = vec![FlowState::Probing];
    let probe = session
        .act()
        .with_timeout(screen.probe_timeout())
        .wait_for(screen.marker(), ElementCondition::Visible)
        .await;
    let outcome = match probe {
        Ok(()) => {
            transitions.push(FlowState::Present);
            info!(screen = screen.name(), "interstitial present");
            screen
                .complete(session)
                .await
                .map_err(|e| TriageError::UnexpectedScreen {
                    screen: screen.name().to_string(),
                    source: Box::new(e),
                })?;
            FlowOutcome::Present
        }
        Err(e) if e.is_timeout() => {
            transitions.push(FlowState::Absent);
            info!(screen = screen.name(), "interstitial absent");
            FlowOutcome::Absent
        }
        Err(e) => return Err(e),
    };
    transitions.push(FlowState::Resolved);
    Ok(FlowReport {
        screen: screen.name().to_string(),
        outcome,
        transitions,
        elapsed: start.elapsed(),
    })
}

/// Location picker shown after credential submission
#[derive(Debug, Clone)]
pub struct LocationSelection {
    marker: ElementDescriptor,
    confirm: ElementDescriptor,
    probe_timeout: Duration,
}

impl LocationSelection {
    /// Picker choosing `location`
    #[must_use]
    pub fn new(location: &str, probe_timeout: Duration) -> Self {
        Self {
            marker: ElementDescriptor::new(format!("{location} location"))
                .text(TextMatch::exact(location)),
            confirm: ElementDescriptor::new("location Confirm button")
                .role("button", TextMatch::exact("Confirm")),
            probe_timeout,
        }
    }
}

#[async_trait]
impl Interstitial for LocationSelection {
    fn name(&self) -> &str {
        "location selection"
    }

    fn marker(&self) -> &ElementDescriptor {
        &self.marker
    }

    fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    async fn complete(&self, session: &Session) -> TriageResult<()> {
        let act = session.act();
        act.click(&self.marker).await?;
        act.click(&self.confirm).await?;
        session.wait_for_load(LoadState::Load).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockElement, MockSurface};
    use crate::session::SessionConfig;
    use std::sync::Arc;

    fn session(surface: &Arc<MockSurface>) -> Session {
        let config = SessionConfig::new().with_action_timeout(Duration::from_millis(500));
        Session::new(surface.clone(), Arc::new(config))
    }

    fn picker() -> LocationSelection {
        LocationSelection::new("Inpatient Ward", Duration::from_secs(5))
    }

    mod absent_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_absent_resolves_without_error_within_bound() {
            let surface = Arc::new(MockSurface::new("http://clinic.test/openmrs/spa/home"));
            let start = Instant::now();
            let report = resolve_interstitial(&session(&surface), &picker())
                .await
                .unwrap();
            let elapsed = start.elapsed();
            assert_eq!(report.outcome, FlowOutcome::Absent);
            assert_eq!(
                report.transitions,
                vec![FlowState::Probing, FlowState::Absent, FlowState::Resolved]
            );
            assert!(elapsed >= Duration::from_secs(5));
            assert!(elapsed <= Duration::from_millis(5050));
            assert!(surface.dispatched().is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_ambiguous_marker_propagates() {
            let surface = Arc::new(MockSurface::new("http://clinic.test/"));
            surface.add(MockElement::new("label").text("Inpatient Ward"));
            surface.add(MockElement::new("label").text("Inpatient Ward"));
            let err = resolve_interstitial(&session(&surface), &picker())
                .await
                .unwrap_err();
            assert!(matches!(err, TriageError::Ambiguous { .. }));
        }
    }

    mod present_tests {
        use super::*;

        fn location_page(surface: &MockSurface, confirm_enabled: bool) {
            surface.add(
                MockElement::new("label")
                    .key("inpatient")
                    .text("Inpatient Ward")
                    .appear_after(Duration::from_millis(800)),
            );
            let confirm = MockElement::new("button").key("confirm").text("Confirm");
            surface.add(if confirm_enabled {
                confirm
            } else {
                confirm.disabled()
            });
        }

        #[tokio::test(start_paused = true)]
        async fn test_present_selects_and_confirms_once() {
            let surface = Arc::new(MockSurface::new("http://clinic.test/openmrs/spa/login/location"));
            location_page(&surface, true);
            let report = resolve_interstitial(&session(&surface), &picker())
                .await
                .unwrap();
            assert_eq!(report.outcome, FlowOutcome::Present);
            assert_eq!(
                report.transitions,
                vec![FlowState::Probing, FlowState::Present, FlowState::Resolved]
            );
            assert_eq!(surface.clicks_on("inpatient"), 1);
            assert_eq!(surface.clicks_on("confirm"), 1);
            assert_eq!(surface.dispatched().len(), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_failed_confirm_is_unexpected_screen() {
            let surface = Arc::new(MockSurface::new("http://clinic.test/openmrs/spa/login/location"));
            location_page(&surface, false);
            let err = resolve_interstitial(&session(&surface), &picker())
                .await
                .unwrap_err();
            match err {
                TriageError::UnexpectedScreen { screen, source } => {
                    assert_eq!(screen, "location selection");
                    assert!(source.is_timeout());
                }
                other => panic!("unexpected {other:?}"),
            }
            assert_eq!(surface.clicks_on("confirm"), 0);
        }
    }
}
