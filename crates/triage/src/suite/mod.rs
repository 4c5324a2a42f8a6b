//! The clinic scenario catalog.
//!
//! | module          | scenarios                                   |
//! |-----------------|---------------------------------------------|
//! | Authentication  | TC001-TC012, TC014, TC015                   |
//! | Navigation      | TC-04, TC-05, TC016                         |
//! | Service Queues  | TC-06, TC015, TC017                         |
//! | Registration    | TC-08                                       |

mod auth;
mod navigation;
mod queues;
mod registration;

use crate::assertion::expect_location;
use crate::page::PageSurface;
use crate::result::TriageResult;
use crate::scenario::{Scenario, ScenarioContext};

/// Every scenario in catalog order
#[must_use]
pub fn catalog() -> Vec<Scenario> {
    let mut scenarios = auth::scenarios();
    scenarios.extend(navigation::scenarios());
    scenarios.extend(queues::scenarios());
    scenarios.extend(registration::scenarios());
    scenarios
}

/// Log in with the valid credentials and land on the dashboard
pub(crate) async fn sign_in(cx: &ScenarioContext) -> TriageResult<()> {
    let login = &cx.pages.login;
    login.open(&cx.session).await?;
    login.login(&cx.session, &cx.credentials.valid).await?;
    expect_location(&cx.session).not_to_contain("login").await?;
    cx.pages.home.wait_until_loaded(&cx.session).await
}

/// Logged in and on the service queues listing
pub(crate) async fn open_service_queues(cx: &ScenarioContext) -> TriageResult<()> {
    sign_in(cx).await?;
    cx.pages.home.go_to_service_queues(&cx.session).await?;
    expect_location(&cx.session).to_match("service-queues").await?;
    cx.pages.queue.wait_until_loaded(&cx.session).await
}
