//! Retrying assertions on observable outputs.
//!
//! `expect(session, descriptor).to_have_text("4").await?;`
//!
//! Every assertion re-reads the surface until it holds or the assertion
//! bound elapses, then fails with `AssertionFailed` describing the last
//! observation. Resolution errors other than "nothing matches" are not
//! retried.

use std::future::Future;
use std::time::Duration;

use regex::Regex;

use crate::locator::{self, normalize_whitespace, ElementDescriptor};
use crate::result::{TriageError, TriageResult};
use crate::session::Session;
use crate::surface::{ElementState, Surface};
use crate::wait::{poll_until, Probe, WaitOptions};

/// Expectations about one element
#[derive(Debug, Clone, Copy)]
pub struct Expect<'a> {
    session: &'a Session,
    descriptor: &'a ElementDescriptor,
    options: WaitOptions,
}

/// Start an expectation on `descriptor`
#[must_use]
pub fn expect<'a>(session: &'a Session, descriptor: &'a ElementDescriptor) -> Expect<'a> {
    let config = session.config();
    Expect {
        session,
        descriptor,
        options: config.wait(config.assertion_timeout),
    }
}

/// Expectations about the current location
#[derive(Debug, Clone, Copy)]
pub struct ExpectLocation<'a> {
    session: &'a Session,
    options: WaitOptions,
}

/// Start an expectation on the current location
#[must_use]
pub fn expect_location(session: &Session) -> ExpectLocation<'_> {
    let config = session.config();
    ExpectLocation {
        session,
        options: config.wait(config.assertion_timeout),
    }
}

fn compile(pattern: &str) -> TriageResult<Regex> {
    Regex::new(pattern).map_err(|e| TriageError::Config {
        message: format!("invalid pattern {pattern:?}: {e}"),
    })
}

/// Poll `probe`, turning a deadline into an assertion failure
async fn settle<F, Fut>(options: WaitOptions, subject: &str, expectation: &str, probe: F) -> TriageResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TriageResult<Probe<()>>>,
{
    match poll_until(options, expectation, subject, probe).await {
        Err(TriageError::Timeout { timeout_ms, last, .. }) => Err(TriageError::assertion(format!(
            "expected {subject} {expectation}, but {last} (after {timeout_ms}ms)"
        ))),
        other => other,
    }
}

async fn observe(
    surface: &dyn Surface,
    descriptor: &ElementDescriptor,
) -> TriageResult<Option<ElementState>> {
    match locator::resolve(surface, descriptor).await {
        Ok(handle) => surface.inspect(&handle.path).await,
        Err(TriageError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn check(holds: bool, observed: String) -> Probe<()> {
    if holds {
        Probe::Ready(())
    } else {
        Probe::Pending(observed)
    }
}

impl Expect<'_> {
    /// Override the bound for this expectation
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    async fn on_text<P>(&self, expectation: &str, holds: P) -> TriageResult<()>
    where
        P: Fn(&str) -> bool,
    {
        let surface = self.session.surface();
        let descriptor = self.descriptor;
        let holds = &holds;
        settle(self.options, descriptor.name(), expectation, || async move {
            Ok(match observe(surface, descriptor).await? {
                None => Probe::Pending("no element matches".into()),
                Some(state) => {
                    let text = normalize_whitespace(&state.text);
                    let ok = holds(&text);
                    check(ok, format!("text is {text:?}"))
                }
            })
        })
        .await
    }

    /// Element is rendered
    pub async fn to_be_visible(&self) -> TriageResult<()> {
        let surface = self.session.surface();
        let descriptor = self.descriptor;
        settle(self.options, descriptor.name(), "to be visible", || async move {
            Ok(match observe(surface, descriptor).await? {
                None => Probe::Pending("no element matches".into()),
                Some(state) => check(state.visible, "it is not visible".into()),
            })
        })
        .await
    }

    /// Element is absent or not rendered
    pub async fn to_be_hidden(&self) -> TriageResult<()> {
        let surface = self.session.surface();
        let descriptor = self.descriptor;
        settle(self.options, descriptor.name(), "to be hidden", || async move {
            let visible = observe(surface, descriptor).await?.is_some_and(|s| s.visible);
            Ok(check(!visible, "it is visible".into()))
        })
        .await
    }

    /// Text equals `expected` after whitespace normalization
    pub async fn to_have_text(&self, expected: &str) -> TriageResult<()> {
        let expected = normalize_whitespace(expected);
        self.on_text(&format!("to have text {expected:?}"), |text| text == expected)
            .await
    }

    /// Text contains `expected`
    pub async fn to_contain_text(&self, expected: &str) -> TriageResult<()> {
        let expected = normalize_whitespace(expected);
        self.on_text(&format!("to contain text {expected:?}"), |text| {
            text.contains(expected.as_str())
        })
        .await
    }

    /// Text matches a regular expression
    pub async fn to_match(&self, pattern: &str) -> TriageResult<()> {
        let re = compile(pattern)?;
        self.on_text(&format!("to match /{pattern}/"), |text| re.is_match(text))
            .await
    }

    /// Descriptor matches exactly `expected` elements
    pub async fn to_have_count(&self, expected: usize) -> TriageResult<()> {
        let surface = self.session.surface();
        let descriptor = self.descriptor;
        settle(
            self.options,
            descriptor.name(),
            &format!("to have count {expected}"),
            || async move {
                let n = locator::count(surface, descriptor).await?;
                Ok(check(n == expected, format!("count is {n}")))
            },
        )
        .await
    }
}

impl ExpectLocation<'_> {
    /// Override the bound for this expectation
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    async fn on_url<P>(&self, expectation: &str, holds: P) -> TriageResult<()>
    where
        P: Fn(&str) -> bool,
    {
        let surface = self.session.surface();
        let holds = &holds;
        settle(self.options, "location", expectation, || async move {
            let url = surface.current_url().await?;
            Ok(check(holds(&url), format!("location is {url}")))
        })
        .await
    }

    /// Location contains `fragment`
    pub async fn to_contain(&self, fragment: &str) -> TriageResult<()> {
        self.on_url(&format!("to contain {fragment:?}"), |url| url.contains(fragment))
            .await
    }

    /// Location does not contain `fragment`
    pub async fn not_to_contain(&self, fragment: &str) -> TriageResult<()> {
        self.on_url(&format!("not to contain {fragment:?}"), |url| {
            !url.contains(fragment)
        })
        .await
    }

    /// Location matches a regular expression
    pub async fn to_match(&self, pattern: &str) -> TriageResult<()> {
        let re = compile(pattern)?;
        self.on_url(&format!("to match /{pattern}/"), |url| re.is_match(url))
            .await
    }
}
