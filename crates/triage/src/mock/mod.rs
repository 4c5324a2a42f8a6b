//! In-memory surfaces for tests.
//!
//! [`MockSurface`] answers every [`Surface`] call from a [`MockDom`] and
//! records what was dispatched. Behavior on navigation and clicks comes from
//! a [`MockApp`]; the default app is a static page, and [`MockClinic`] models
//! the clinic application end to end.

mod clinic;
mod dom;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

pub use clinic::{ClinicOptions, LocationScreen, MockClinic, QueueEntry};
pub use dom::{ElementId, MockDom, MockElement};

use crate::locator::{ElementPath, Strategy};
use crate::result::{TriageError, TriageResult};
use crate::session::SessionFactory;
use crate::surface::{ElementState, Screenshot, Surface};
use crate::wait::LoadState;

/// 1x1 transparent PNG
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

// =============================================================================
// PAGE + APP
// =============================================================================

/// Document currently shown by a mock surface
#[derive(Debug, Default)]
pub struct MockPage {
    /// Element tree
    pub dom: MockDom,
    /// Current location
    pub url: String,
    /// Back stack
    pub history: Vec<String>,
    loaded_at: Option<Instant>,
}

impl MockPage {
    /// Replace the document and push the old location
    pub fn visit(&mut self, url: impl Into<String>, load_time: Duration) {
        if !self.url.is_empty() {
            self.history.push(std::mem::take(&mut self.url));
        }
        self.replace(url, load_time);
    }

    /// Replace the document without touching history
    pub fn replace(&mut self, url: impl Into<String>, load_time: Duration) {
        self.url = url.into();
        self.dom.clear();
        self.loaded_at = Some(Instant::now() + load_time);
    }

    /// Load state on the tokio clock
    #[must_use]
    pub fn load_state(&self) -> LoadState {
        match self.loaded_at {
            Some(at) if Instant::now() < at => LoadState::DomContentLoaded,
            _ => LoadState::NetworkIdle,
        }
    }
}

/// Application behavior behind a mock surface
pub trait MockApp: Send + std::fmt::Debug {
    /// Handle `navigate(url)`
    fn navigate(&mut self, page: &mut MockPage, url: &str) {
        page.visit(url, Duration::ZERO);
    }

    /// Handle history back
    fn back(&mut self, page: &mut MockPage) {
        if let Some(previous) = page.history.pop() {
            page.url = previous;
        }
    }

    /// Handle reload
    fn reload(&mut self, _page: &mut MockPage) {}

    /// React to a click that was dispatched
    fn click(&mut self, _page: &mut MockPage, _id: ElementId) {}

    /// React to a fill that was dispatched
    fn fill(&mut self, page: &mut MockPage, id: ElementId, text: &str) {
        if let Some(el) = page.dom.get_mut(id) {
            el.value = text.to_string();
        }
    }
}

#[derive(Debug, Default)]
struct StaticApp;

impl MockApp for StaticApp {}

// =============================================================================
// CALL LOG
// =============================================================================

/// One call made against a mock surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    /// `navigate(url)`
    Navigate(String),
    /// `go_back()`
    GoBack,
    /// `reload()`
    Reload,
    /// `fill(target, text)`
    Fill {
        /// Element label
        target: String,
        /// Text filled
        text: String,
    },
    /// `click(target)`
    Click {
        /// Element label
        target: String,
    },
    /// `set_checked(target, checked)`
    SetChecked {
        /// Element label
        target: String,
        /// Requested state
        checked: bool,
    },
    /// `screenshot()`
    Screenshot,
}

impl SurfaceCall {
    /// Whether this call mutated an element
    #[must_use]
    pub const fn is_dispatch(&self) -> bool {
        matches!(
            self,
            Self::Fill { .. } | Self::Click { .. } | Self::SetChecked { .. }
        )
    }
}

// =============================================================================
// MOCK SURFACE
// =============================================================================

#[derive(Debug)]
struct MockState {
    page: MockPage,
    app: Box<dyn MockApp>,
    calls: Vec<SurfaceCall>,
    fail_screenshot: bool,
}

/// Surface backed by an in-memory tree
#[derive(Debug)]
pub struct MockSurface {
    state: Mutex<MockState>,
}

impl MockSurface {
    /// Static page at `url`
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_app(url, StaticApp)
    }

    /// Page driven by `app`, starting blank
    #[must_use]
    pub fn with_app(url: impl Into<String>, app: impl MockApp + 'static) -> Self {
        Self {
            state: Mutex::new(MockState {
                page: MockPage {
                    url: url.into(),
                    ..MockPage::default()
                },
                app: Box::new(app),
                calls: Vec::new(),
                fail_screenshot: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a top-level element
    pub fn add(&self, element: MockElement) -> ElementId {
        self.lock().page.dom.add(element)
    }

    /// Append under `parent`
    pub fn add_child(&self, parent: ElementId, element: MockElement) -> ElementId {
        self.lock().page.dom.add_child(parent, element)
    }

    /// Mutate an element in place
    pub fn update(&self, id: ElementId, f: impl FnOnce(&mut MockElement)) {
        if let Some(el) = self.lock().page.dom.get_mut(id) {
            f(el);
        }
    }

    /// Detach an element
    pub fn remove(&self, id: ElementId) {
        self.lock().page.dom.remove(id);
    }

    /// Read an element
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<MockElement> {
        self.lock().page.dom.get(id).cloned()
    }

    /// Make the next screenshots fail
    pub fn fail_screenshots(&self) {
        self.lock().fail_screenshot = true;
    }

    /// Every call so far
    #[must_use]
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.lock().calls.clone()
    }

    /// Element-mutating calls so far
    #[must_use]
    pub fn dispatched(&self) -> Vec<SurfaceCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_dispatch())
            .cloned()
            .collect()
    }

    /// Number of clicks dispatched to elements labelled `target`
    #[must_use]
    pub fn clicks_on(&self, target: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Click { target: t } if t == target))
            .count()
    }

    /// Whether any call of this kind was made
    #[must_use]
    pub fn was_called(&self, call: &SurfaceCall) -> bool {
        self.lock().calls.contains(call)
    }

    fn target(state: &MockState, path: &ElementPath) -> TriageResult<ElementId> {
        state
            .page
            .dom
            .locate(path)
            .ok_or_else(|| TriageError::driver(format!("stale element path {path}")))
    }
}

#[async_trait]
impl Surface for MockSurface {
    async fn navigate(&self, url: &str) -> TriageResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.calls.push(SurfaceCall::Navigate(url.to_string()));
        state.app.navigate(&mut state.page, url);
        Ok(())
    }

    async fn current_url(&self) -> TriageResult<String> {
        Ok(self.lock().page.url.clone())
    }

    async fn go_back(&self) -> TriageResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.calls.push(SurfaceCall::GoBack);
        state.app.back(&mut state.page);
        Ok(())
    }

    async fn reload(&self) -> TriageResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.calls.push(SurfaceCall::Reload);
        state.app.reload(&mut state.page);
        Ok(())
    }

    async fn load_state(&self) -> TriageResult<LoadState> {
        Ok(self.lock().page.load_state())
    }

    async fn count(&self, scope: &ElementPath, strategy: &Strategy) -> TriageResult<usize> {
        let state = self.lock();
        let scope_id = if scope.is_root() {
            None
        } else {
            match state.page.dom.locate(scope) {
                Some(id) => Some(id),
                None => return Ok(0),
            }
        };
        Ok(state.page.dom.query(scope_id, strategy).len())
    }

    async fn inspect(&self, path: &ElementPath) -> TriageResult<Option<ElementState>> {
        let state = self.lock();
        Ok(state
            .page
            .dom
            .locate(path)
            .and_then(|id| state.page.dom.state(id)))
    }

    async fn fill(&self, path: &ElementPath, text: &str) -> TriageResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let id = Self::target(state, path)?;
        let target = state.page.dom.get(id).map(MockElement::describe).unwrap_or_default();
        state.calls.push(SurfaceCall::Fill {
            target,
            text: text.to_string(),
        });
        state.app.fill(&mut state.page, id, text);
        Ok(())
    }

    async fn click(&self, path: &ElementPath) -> TriageResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let id = Self::target(state, path)?;
        let target = state.page.dom.get(id).map(MockElement::describe).unwrap_or_default();
        state.calls.push(SurfaceCall::Click { target });
        state.app.click(&mut state.page, id);
        Ok(())
    }

    async fn set_checked(&self, path: &ElementPath, checked: bool) -> TriageResult<()> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let id = Self::target(state, path)?;
        let target = state.page.dom.get(id).map(MockElement::describe).unwrap_or_default();
        state.calls.push(SurfaceCall::SetChecked { target, checked });
        state.page.dom.set_checked(id, checked);
        Ok(())
    }

    async fn screenshot(&self) -> TriageResult<Screenshot> {
        let mut state = self.lock();
        state.calls.push(SurfaceCall::Screenshot);
        if state.fail_screenshot {
            return Err(TriageError::Screenshot {
                message: "capture disabled".into(),
            });
        }
        Ok(Screenshot::new(PLACEHOLDER_PNG.to_vec()))
    }
}

// =============================================================================
// FACTORY
// =============================================================================

/// Hands out a fresh [`MockClinic`] surface per scenario
#[derive(Debug, Clone, Default)]
pub struct MockClinicFactory {
    options: ClinicOptions,
}

impl MockClinicFactory {
    /// Factory with these clinic options
    #[must_use]
    pub const fn new(options: ClinicOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl SessionFactory for MockClinicFactory {
    async fn create(&self) -> TriageResult<Arc<dyn Surface>> {
        Ok(Arc::new(MockClinic::surface(self.options.clone())))
    }
}
