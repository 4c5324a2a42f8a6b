//! Action primitives.
//!
//! Each primitive waits, within its bound, for the target to satisfy the
//! action's precondition and then dispatches exactly one interaction:
//!
//! | action            | precondition                                  |
//! |-------------------|-----------------------------------------------|
//! | `click`           | visible, enabled, same bounding box twice     |
//! | `fill`            | visible, enabled, editable                    |
//! | `check`/`uncheck` | visible, enabled, checkable                   |
//! | reads             | attached                                      |
//!
//! A descriptor that matches nothing is retried until the deadline; an
//! ambiguous one fails at once. Targets that can never take the action
//! (filling a button, checking a text box) fail with `NotActionable`.

use std::sync::Mutex;
use std::time::Duration;

use tracing::debug;

use crate::locator::{self, ElementDescriptor, ElementHandle};
use crate::result::{TriageError, TriageResult};
use crate::surface::{BoundingBox, ElementState, Surface};
use crate::wait::{poll_until, Probe, WaitOptions};

/// State to wait for in [`Actions::wait_for`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementCondition {
    /// Resolves and is rendered
    Visible,
    /// Does not resolve, or is not rendered
    Hidden,
    /// Resolves
    Attached,
    /// Does not resolve
    Detached,
}

impl ElementCondition {
    const fn verb(self) -> &'static str {
        match self {
            Self::Visible => "wait for visible",
            Self::Hidden => "wait for hidden",
            Self::Attached => "wait for attached",
            Self::Detached => "wait for detached",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Need {
    Attached,
    Click,
    Fill,
    Check,
}

/// Primitives bound to one surface and a default bound
#[derive(Clone, Copy)]
pub struct Actions<'a> {
    surface: &'a dyn Surface,
    options: WaitOptions,
}

impl std::fmt::Debug for Actions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actions")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> Actions<'a> {
    /// Bind primitives to `surface`
    #[must_use]
    pub const fn new(surface: &'a dyn Surface, options: WaitOptions) -> Self {
        Self { surface, options }
    }

    /// Same primitives with a different bound
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Current wait options
    #[must_use]
    pub const fn options(&self) -> WaitOptions {
        self.options
    }

    /// Replace the text of an input
    pub async fn fill(&self, descriptor: &ElementDescriptor, text: &str) -> TriageResult<()> {
        let handle = self.actionable("fill", descriptor, Need::Fill).await?;
        debug!(target_name = descriptor.name(), len = text.len(), "fill");
        self.surface.fill(&handle.path, text).await
    }

    /// Click an element
    pub async fn click(&self, descriptor: &ElementDescriptor) -> TriageResult<()> {
        let handle = self.actionable("click", descriptor, Need::Click).await?;
        debug!(target_name = descriptor.name(), "click");
        self.surface.click(&handle.path).await
    }

    /// Check a checkbox or radio
    pub async fn check(&self, descriptor: &ElementDescriptor) -> TriageResult<()> {
        self.set_checked(descriptor, true).await
    }

    /// Uncheck a checkbox
    pub async fn uncheck(&self, descriptor: &ElementDescriptor) -> TriageResult<()> {
        self.set_checked(descriptor, false).await
    }

    /// Set the checked state
    pub async fn set_checked(
        &self,
        descriptor: &ElementDescriptor,
        checked: bool,
    ) -> TriageResult<()> {
        let action = if checked { "check" } else { "uncheck" };
        let handle = self.actionable(action, descriptor, Need::Check).await?;
        debug!(target_name = descriptor.name(), checked, "set checked");
        self.surface.set_checked(&handle.path, checked).await
    }

    /// Checked state, once attached
    pub async fn is_checked(&self, descriptor: &ElementDescriptor) -> TriageResult<bool> {
        Ok(self.attached_state("read checked state of", descriptor).await?.checked)
    }

    /// Inner text, once attached
    pub async fn inner_text(&self, descriptor: &ElementDescriptor) -> TriageResult<String> {
        Ok(self.attached_state("read text of", descriptor).await?.text)
    }

    /// Input value, once attached
    pub async fn input_value(&self, descriptor: &ElementDescriptor) -> TriageResult<String> {
        Ok(self.attached_state("read value of", descriptor).await?.value)
    }

    /// Visible right now; never waits
    pub async fn is_visible(&self, descriptor: &ElementDescriptor) -> TriageResult<bool> {
        let handle = match locator::resolve(self.surface, descriptor).await {
            Ok(handle) => handle,
            Err(TriageError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };
        Ok(self
            .surface
            .inspect(&handle.path)
            .await?
            .is_some_and(|s| s.visible))
    }

    /// Number of current matches; never waits
    pub async fn count(&self, descriptor: &ElementDescriptor) -> TriageResult<usize> {
        locator::count(self.surface, descriptor).await
    }

    /// Wait until the descriptor reaches `condition`
    pub async fn wait_for(
        &self,
        descriptor: &ElementDescriptor,
        condition: ElementCondition,
    ) -> TriageResult<()> {
        let surface = self.surface;
        poll_until(self.options, condition.verb(), descriptor.name(), || async move {
            let state = match locator::resolve(surface, descriptor).await {
                Ok(handle) => surface.inspect(&handle.path).await?,
                Err(TriageError::NotFound { .. }) => None,
                Err(e) => return Err(e),
            };
            let reached = match (condition, &state) {
                (ElementCondition::Visible, Some(s)) => s.visible,
                (ElementCondition::Visible | ElementCondition::Attached, None) => false,
                (ElementCondition::Hidden, Some(s)) => !s.visible,
                (ElementCondition::Hidden | ElementCondition::Detached, None)
                | (ElementCondition::Attached, Some(_)) => true,
                (ElementCondition::Detached, Some(_)) => false,
            };
            Ok(if reached {
                Probe::Ready(())
            } else {
                Probe::Pending(describe(state.as_ref()))
            })
        })
        .await
    }

    async fn attached_state(
        &self,
        action: &str,
        descriptor: &ElementDescriptor,
    ) -> TriageResult<ElementState> {
        let surface = self.surface;
        poll_until(self.options, action, descriptor.name(), || async move {
            let handle = match locator::resolve(surface, descriptor).await {
                Ok(handle) => handle,
                Err(TriageError::NotFound { .. }) => {
                    return Ok(Probe::Pending("no element matches".into()))
                }
                Err(e) => return Err(e),
            };
            Ok(match surface.inspect(&handle.path).await? {
                Some(state) => Probe::Ready(state),
                None => Probe::Pending("element detached".into()),
            })
        })
        .await
    }

    async fn actionable(
        &self,
        action: &str,
        descriptor: &ElementDescriptor,
        need: Need,
    ) -> TriageResult<ElementHandle> {
        let surface = self.surface;
        let last_box: Mutex<Option<BoundingBox>> = Mutex::new(None);
        let last_box = &last_box;
        poll_until(self.options, action, descriptor.name(), || async move {
            let handle = match locator::resolve(surface, descriptor).await {
                Ok(handle) => handle,
                Err(TriageError::NotFound { .. }) => {
                    return Ok(Probe::Pending("no element matches".into()))
                }
                Err(e) => return Err(e),
            };
            let Some(state) = surface.inspect(&handle.path).await? else {
                return Ok(Probe::Pending("element detached".into()));
            };
            match need {
                Need::Fill if !state.editable => {
                    return Err(not_actionable(action, descriptor, &state, "is not editable"));
                }
                Need::Check if !state.checkable => {
                    return Err(not_actionable(action, descriptor, &state, "is not a checkbox or radio"));
                }
                _ => {}
            }
            if need == Need::Attached {
                return Ok(Probe::Ready(handle));
            }
            if !state.visible {
                return Ok(Probe::Pending("element is not visible".into()));
            }
            if !state.enabled {
                return Ok(Probe::Pending("element is disabled".into()));
            }
            if need == Need::Click {
                let mut previous = last_box
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                let current = state.bounding_box;
                let stable = previous.is_some() && *previous == current;
                *previous = current;
                if !stable {
                    return Ok(Probe::Pending("element is not stable".into()));
                }
            }
            Ok(Probe::Ready(handle))
        })
        .await
    }
}

fn not_actionable(
    action: &str,
    descriptor: &ElementDescriptor,
    state: &ElementState,
    reason: &str,
) -> TriageError {
    TriageError::NotActionable {
        action: action.to_string(),
        target: descriptor.name().to_string(),
        reason: format!("<{}> {reason}", state.tag),
    }
}

fn describe(state: Option<&ElementState>) -> String {
    match state {
        None => "no element matches".into(),
        Some(s) if s.visible => "element is visible".into(),
        Some(_) => "element is attached but not visible".into(),
    }
}
