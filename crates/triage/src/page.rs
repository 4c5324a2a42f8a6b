//! Page surfaces.
//!
//! A page surface owns the descriptors for one screen of the application
//! and exposes verbs composed from action primitives. Descriptors are not
//! shared between surfaces; two pages may describe the same element.

use async_trait::async_trait;
use tracing::debug;

use crate::actions::ElementCondition;
use crate::locator::ElementDescriptor;
use crate::result::TriageResult;
use crate::session::Session;
use crate::wait::LoadState;

/// One screen of the application under test
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// Page name used in logs
    fn name(&self) -> &str;

    /// Path relative to the application root
    fn path(&self) -> &str;

    /// Every descriptor this page owns
    fn descriptors(&self) -> Vec<&ElementDescriptor>;

    /// Element whose visibility means the page has rendered
    fn ready_marker(&self) -> &ElementDescriptor;

    /// Navigate directly to this page and wait for it to render
    async fn navigate(&self, session: &Session) -> TriageResult<()> {
        debug!(page = self.name(), "open");
        session.goto(self.path()).await?;
        self.wait_until_loaded(session).await
    }

    /// Wait for `load` and for the ready marker to be visible
    async fn wait_until_loaded(&self, session: &Session) -> TriageResult<()> {
        session.wait_for_load(LoadState::Load).await?;
        session
            .act()
            .wait_for(self.ready_marker(), ElementCondition::Visible)
            .await
    }
}
