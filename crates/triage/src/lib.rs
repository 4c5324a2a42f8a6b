//! Triage: resilient UI-driving layer and end-to-end scenarios for the
//! OpenMRS clinic application.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Scenario Orchestrator   suite::catalog() → ScenarioRunner      │
//! │          │                                  → RunReport         │
//! │          ▼                                                      │
//! │  Page Surface Model      LoginPage, HomePage, QueuePage, ...    │
//! │          │               + flow handler for optional screens    │
//! │          ▼                                                      │
//! │  Action Primitives       fill, click, wait_for, expect(...)     │
//! │          │               bounded waits, actionability checks    │
//! │          ▼                                                      │
//! │  Locator Registry        ElementDescriptor → ElementPath        │
//! │          │                                                      │
//! │          ▼                                                      │
//! │  Surface                 ChromiumSurface (CDP) | MockSurface    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Observable results (visibility, text, location) flow back up to the
//! scenario steps, which assert on them.

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod actions;
mod assertion;
#[cfg(feature = "browser")]
mod browser;
mod fixtures;
mod flow;
mod locator;
mod page;
mod reporter;
mod result;
mod runner;
mod scenario;
mod session;
mod surface;
mod wait;

pub mod mock;
pub mod pages;
pub mod suite;

pub use actions::{Actions, ElementCondition};
pub use assertion::{expect, expect_location, Expect, ExpectLocation};
#[cfg(feature = "browser")]
pub use browser::{ChromiumFactory, ChromiumSurface};
pub use fixtures::{
    CredentialSet, Credentials, DEFAULT_PASSWORD, DEFAULT_USERNAME, LONG_USERNAME_LEN,
    PASSWORD_ENV, USERNAME_ENV,
};
pub use flow::{
    resolve_interstitial, FlowOutcome, FlowReport, FlowState, Interstitial, LocationSelection,
};
pub use locator::{
    normalize_whitespace, ElementDescriptor, ElementHandle, ElementPath, Pick, Segment, Strategy,
    TextMatch,
};
pub use page::PageSurface;
pub use reporter::{RunReport, ScenarioReport, ScenarioStatus, StepReport, StepStatus};
pub use result::{ErrorKind, TriageError, TriageResult};
pub use runner::{
    RunObserver, RunnerConfig, ScenarioFilter, ScenarioRunner, DEFAULT_SCENARIO_TIMEOUT_MS,
    DEFAULT_SUITE_NAME,
};
pub use scenario::{slugify, Scenario, ScenarioContext, Step, StepFn, StepFuture};
pub use session::{
    Session, SessionConfig, SessionFactory, DEFAULT_ASSERTION_TIMEOUT_MS, DEFAULT_BASE_URL,
    DEFAULT_LOCATION, DEFAULT_PROBE_TIMEOUT_MS,
};
pub use surface::{BoundingBox, ElementState, Screenshot, Surface, SurfaceConfig};
pub use wait::{
    LoadState, Probe, WaitOptions, DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_NAVIGATION_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS,
};

/// Locator resolution against a live surface
pub mod resolve {
    pub use crate::locator::{count, resolve};
    pub use crate::wait::{poll_until, wait_for_load, wait_for_url};
}
