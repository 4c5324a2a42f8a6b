//! Scenarios: named sequences of async steps.
//!
//! ```ignore
//! Scenario::new("Authentication", "TC001: Successful login")
//!     .step("Open the login page", |cx| Box::pin(async move {
//!         cx.pages.login.open(&cx.session).await
//!     }))
//!     .step("Verify the dashboard", |cx| Box::pin(async move {
//!         expect_location(&cx.session).not_to_contain("login").await
//!     }));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::fixtures::CredentialSet;
use crate::pages::Pages;
use crate::result::TriageResult;
use crate::session::Session;

/// Everything a step can reach
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    /// This scenario's own session
    pub session: Session,
    /// Page surfaces
    pub pages: Arc<Pages>,
    /// Credential fixtures
    pub credentials: Arc<CredentialSet>,
}

/// Future returned by a step body
pub type StepFuture<'a> = BoxFuture<'a, TriageResult<()>>;

/// Step body
pub type StepFn = Arc<dyn for<'a> Fn(&'a ScenarioContext) -> StepFuture<'a> + Send + Sync>;

/// One named unit of a scenario
#[derive(Clone)]
pub struct Step {
    name: String,
    run: StepFn,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Step {
    /// Step from a closure
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: for<'a> Fn(&'a ScenarioContext) -> StepFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(run),
        }
    }

    /// Step name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the body
    pub fn run<'a>(&self, cx: &'a ScenarioContext) -> StepFuture<'a> {
        (self.run)(cx)
    }
}

/// A named, ordered list of steps
#[derive(Debug, Clone)]
pub struct Scenario {
    module: String,
    name: String,
    steps: Vec<Step>,
    timeout: Option<Duration>,
}

impl Scenario {
    /// Empty scenario
    #[must_use]
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            steps: Vec::new(),
            timeout: None,
        }
    }

    /// Append a step
    #[must_use]
    pub fn step<F>(mut self, name: impl Into<String>, run: F) -> Self
    where
        F: for<'a> Fn(&'a ScenarioContext) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.steps.push(Step::new(name, run));
        self
    }

    /// Append a prepared step
    #[must_use]
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Override the runner's per-scenario bound
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Module the scenario belongs to
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Steps in order
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Own bound, if any
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// `module › name`, used for filtering and display
    #[must_use]
    pub fn title(&self) -> String {
        format!("{} › {}", self.module, self.name)
    }

    /// File-system safe identifier
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&format!("{} {}", self.module, self.name))
    }
}

/// Lower-case ASCII alphanumerics joined by single dashes
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::result::TriageError;

    mod builder_tests {
        use super::*;

        #[test]
        fn test_steps_keep_order() {
            let scenario = Scenario::new("Auth", "TC001: login")
                .step("first", |_| Box::pin(async { Ok(()) }))
                .step("second", |_| Box::pin(async { Err(TriageError::assertion("no")) }))
                .with_timeout(Duration::from_secs(3));
            let names: Vec<&str> = scenario.steps().iter().map(Step::name).collect();
            assert_eq!(names, vec!["first", "second"]);
            assert_eq!(scenario.timeout(), Some(Duration::from_secs(3)));
            assert_eq!(scenario.title(), "Auth › TC001: login");
        }

        #[test]
        fn test_step_debug_hides_body() {
            let step = Step::new("open", |_| Box::pin(async { Ok(()) }));
            assert_eq!(format!("{step:?}"), "Step { name: \"open\", .. }");
        }
    }

    mod slug_tests {
        use super::*;

        #[test]
        fn test_slug() {
            let scenario = Scenario::new("Module 1: Authentication", "TC001: Successful Login");
            assert_eq!(scenario.slug(), "module-1-authentication-tc001-successful-login");
        }

        #[test]
        fn test_slugify_edges() {
            assert_eq!(slugify("  --Hello, World!!  "), "hello-world");
            assert_eq!(slugify("TC-04 › Service queues"), "tc-04-service-queues");
            assert_eq!(slugify("›››"), "");
        }
    }
}
