//! Element descriptors and lazy resolution.
//!
//! A descriptor is a semantic name plus an ordered list of strategies. Nothing
//! is inspected when a descriptor is built; every use re-resolves it against
//! the live surface, because the target re-renders continuously.
//!
//! # Resolution
//!
//! - Strategies are tried in canonical priority order (role, label,
//!   attribute, text, css).
//! - A strategy with zero matches falls through to the next one.
//! - More than one match is `Ambiguous` unless the descriptor asked for the
//!   first or nth match.
//! - When every strategy is exhausted the result is `NotFound`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::result::{TriageError, TriageResult};
use crate::surface::Surface;

// =============================================================================
// TEXT MATCHING
// =============================================================================

/// How a strategy compares text against the surface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum TextMatch {
    /// Whole text equals the value after whitespace normalization
    Exact(String),
    /// Text contains the value, case-insensitive
    Contains(String),
}

impl TextMatch {
    /// Exact match
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self::Exact(text.into())
    }

    /// Case-insensitive substring match
    #[must_use]
    pub fn contains(text: impl Into<String>) -> Self {
        Self::Contains(text.into())
    }

    /// Test `actual` against this matcher
    #[must_use]
    pub fn matches(&self, actual: &str) -> bool {
        let actual = normalize_whitespace(actual);
        match self {
            Self::Exact(expected) => actual == normalize_whitespace(expected),
            Self::Contains(expected) => actual
                .to_lowercase()
                .contains(&normalize_whitespace(expected).to_lowercase()),
        }
    }

    /// The raw value being matched
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Exact(v) | Self::Contains(v) => v,
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "\"{v}\""),
            Self::Contains(v) => write!(f, "~\"{v}\""),
        }
    }
}

/// Collapse runs of whitespace into single spaces and trim
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// STRATEGY
// =============================================================================

/// One way of finding an element, serialized for browser-side evaluation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// ARIA role, optionally with an accessible name
    Role {
        /// Role (explicit or implicit from the tag)
        role: String,
        /// Accessible name filter
        name: Option<TextMatch>,
    },
    /// Form control associated with a label
    Label {
        /// Label text
        text: TextMatch,
    },
    /// Stable non-visual attribute such as `data-testid`, `aria-label`, `name`
    Attribute {
        /// Attribute name
        name: String,
        /// Exact attribute value
        value: String,
    },
    /// Smallest element whose visible text matches
    Text {
        /// Text matcher
        text: TextMatch,
    },
    /// Structural / class selector, last resort
    Css {
        /// CSS selector
        selector: String,
        /// Optional text filter over the matched elements
        has_text: Option<TextMatch>,
    },
}

impl Strategy {
    /// Canonical priority, lower wins
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Role { .. } => 0,
            Self::Label { .. } => 1,
            Self::Attribute { .. } => 2,
            Self::Text { .. } => 3,
            Self::Css { .. } => 4,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role { role, name: None } => write!(f, "role={role}"),
            Self::Role {
                role,
                name: Some(name),
            } => write!(f, "role={role}[name={name}]"),
            Self::Label { text } => write!(f, "label={text}"),
            Self::Attribute { name, value } => write!(f, "[{name}=\"{value}\"]"),
            Self::Text { text } => write!(f, "text={text}"),
            Self::Css {
                selector,
                has_text: None,
            } => write!(f, "css={selector}"),
            Self::Css {
                selector,
                has_text: Some(text),
            } => write!(f, "css={selector}[has-text={text}]"),
        }
    }
}

// =============================================================================
// DESCRIPTOR
// =============================================================================

/// Which match to take when a strategy finds several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Pick {
    /// Exactly one match is required
    #[default]
    Strict,
    /// Take the first match in document order
    First,
    /// Take the match at this index; out of range falls through
    Nth(usize),
}

/// Semantic specification of how to find one UI element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDescriptor {
    name: String,
    strategies: Vec<Strategy>,
    pick: Pick,
    parent: Option<Box<ElementDescriptor>>,
}

impl ElementDescriptor {
    /// Create a descriptor with no strategies yet
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategies: Vec::new(),
            pick: Pick::Strict,
            parent: None,
        }
    }

    /// Add a strategy, keeping canonical priority order
    #[must_use]
    pub fn or(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        // stable: equal priorities keep declaration order
        self.strategies.sort_by_key(Strategy::priority);
        self
    }

    /// Role with accessible name
    #[must_use]
    pub fn role(self, role: impl Into<String>, name: TextMatch) -> Self {
        self.or(Strategy::Role {
            role: role.into(),
            name: Some(name),
        })
    }

    /// Role regardless of name
    #[must_use]
    pub fn role_any(self, role: impl Into<String>) -> Self {
        self.or(Strategy::Role {
            role: role.into(),
            name: None,
        })
    }

    /// Associated label
    #[must_use]
    pub fn label(self, text: TextMatch) -> Self {
        self.or(Strategy::Label { text })
    }

    /// Attribute equality
    #[must_use]
    pub fn attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.or(Strategy::Attribute {
            name: name.into(),
            value: value.into(),
        })
    }

    /// `data-testid` shorthand
    #[must_use]
    pub fn test_id(self, id: impl Into<String>) -> Self {
        self.attribute("data-testid", id)
    }

    /// Visible text
    #[must_use]
    pub fn text(self, text: TextMatch) -> Self {
        self.or(Strategy::Text { text })
    }

    /// CSS selector
    #[must_use]
    pub fn css(self, selector: impl Into<String>) -> Self {
        self.or(Strategy::Css {
            selector: selector.into(),
            has_text: None,
        })
    }

    /// CSS selector filtered by contained text
    #[must_use]
    pub fn css_with_text(self, selector: impl Into<String>, text: TextMatch) -> Self {
        self.or(Strategy::Css {
            selector: selector.into(),
            has_text: Some(text),
        })
    }

    /// Accept the first of several matches
    #[must_use]
    pub const fn first(mut self) -> Self {
        self.pick = Pick::First;
        self
    }

    /// Accept the match at `index`
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.pick = Pick::Nth(index);
        self
    }

    /// Resolve inside the element described by `parent`
    #[must_use]
    pub fn within(mut self, parent: Self) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Semantic name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Strategies in priority order
    #[must_use]
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Pick mode
    #[must_use]
    pub const fn pick(&self) -> Pick {
        self.pick
    }

    /// Containing descriptor, if any
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }

    /// Descriptor chain from the outermost container down to `self`
    fn chain(&self) -> Vec<&Self> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.parent() {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }
}

impl fmt::Display for ElementDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// =============================================================================
// HANDLES
// =============================================================================

/// One level of a resolved path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    /// Strategy that matched at this level
    pub strategy: Strategy,
    /// Index among that strategy's matches
    pub index: usize,
}

/// Deferred query re-evaluated by the surface on every use
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ElementPath(pub Vec<Segment>);

impl ElementPath {
    /// The document root
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Extend by one level
    #[must_use]
    pub fn child(&self, strategy: Strategy, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment { strategy, index });
        Self(segments)
    }

    /// Whether this is the document root
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(":root");
        }
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|s| format!("{}#{}", s.strategy, s.index))
            .collect();
        f.write_str(&parts.join(" >> "))
    }
}

/// Result of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    /// Descriptor name
    pub descriptor: String,
    /// How to reach the element
    pub path: ElementPath,
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolve `descriptor` against the current state of `surface`
pub async fn resolve(
    surface: &dyn Surface,
    descriptor: &ElementDescriptor,
) -> TriageResult<ElementHandle> {
    let mut scope = ElementPath::root();
    for level in descriptor.chain() {
        scope = resolve_level(surface, level, &scope).await?;
    }
    debug!(descriptor = descriptor.name(), path = %scope, "resolved");
    Ok(ElementHandle {
        descriptor: descriptor.name.clone(),
        path: scope,
    })
}

async fn resolve_level(
    surface: &dyn Surface,
    descriptor: &ElementDescriptor,
    scope: &ElementPath,
) -> TriageResult<ElementPath> {
    for strategy in &descriptor.strategies {
        let count = surface.count(scope, strategy).await?;
        let index = match (descriptor.pick, count) {
            (_, 0) => continue,
            (Pick::Nth(i), n) if i < n => i,
            (Pick::Nth(_), _) => continue,
            (Pick::First, _) | (Pick::Strict, 1) => 0,
            (Pick::Strict, n) => {
                return Err(TriageError::Ambiguous {
                    descriptor: descriptor.name.clone(),
                    count: n,
                })
            }
        };
        return Ok(scope.child(strategy.clone(), index));
    }
    Err(TriageError::NotFound {
        descriptor: descriptor.name.clone(),
    })
}

/// Number of elements the descriptor currently matches
///
/// Reports the count of the first strategy with any match. A missing
/// container counts as zero matches.
pub async fn count(surface: &dyn Surface, descriptor: &ElementDescriptor) -> TriageResult<usize> {
    let scope = match descriptor.parent() {
        Some(parent) => match resolve(surface, parent).await {
            Ok(handle) => handle.path,
            Err(TriageError::NotFound { .. }) => return Ok(0),
            Err(e) => return Err(e),
        },
        None => ElementPath::root(),
    };
    for strategy in &descriptor.strategies {
        let n = surface.count(&scope, strategy).await?;
        if n > 0 {
            return Ok(n);
        }
    }
    Ok(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockElement, MockSurface};

    mod text_match_tests {
        use super::*;

        #[test]
        fn test_exact_normalizes_whitespace() {
            let m = TextMatch::exact("Log In");
            assert!(m.matches("  Log \n In "));
            assert!(!m.matches("Log In now"));
            assert!(!m.matches("log in"));
        }

        #[test]
        fn test_contains_is_case_insensitive() {
            let m = TextMatch::contains("patients currently");
            assert!(m.matches("Patients currently in queue"));
            assert!(!m.matches("Patients"));
        }

        #[test]
        fn test_display() {
            assert_eq!(TextMatch::exact("a").to_string(), "\"a\"");
            assert_eq!(TextMatch::contains("a").to_string(), "~\"a\"");
        }
    }

    mod descriptor_tests {
        use super::*;

        #[test]
        fn test_strategies_sorted_by_priority() {
            let d = ElementDescriptor::new("username")
                .css("#username")
                .text(TextMatch::exact("Username"))
                .attribute("name", "username")
                .label(TextMatch::exact("Username"))
                .role("textbox", TextMatch::exact("Username"));
            let priorities: Vec<u8> = d.strategies().iter().map(Strategy::priority).collect();
            assert_eq!(priorities, vec![0, 1, 2, 3, 4]);
        }

        #[test]
        fn test_equal_priority_keeps_declaration_order() {
            let d = ElementDescriptor::new("x").css("#a").css("#b");
            assert_eq!(d.strategies()[0].to_string(), "css=#a");
            assert_eq!(d.strategies()[1].to_string(), "css=#b");
        }

        #[test]
        fn test_pick_modes() {
            assert_eq!(ElementDescriptor::new("x").pick(), Pick::Strict);
            assert_eq!(ElementDescriptor::new("x").first().pick(), Pick::First);
            assert_eq!(ElementDescriptor::new("x").nth(2).pick(), Pick::Nth(2));
        }

        #[test]
        fn test_strategy_json_shape() {
            let s = Strategy::Role {
                role: "button".into(),
                name: Some(TextMatch::exact("Log In")),
            };
            let json = serde_json::to_value(&s).unwrap();
            assert_eq!(json["kind"], "role");
            assert_eq!(json["name"]["mode"], "exact");
            assert_eq!(json["name"]["value"], "Log In");
        }

        #[test]
        fn test_path_display() {
            let path = ElementPath::root().child(
                Strategy::Css {
                    selector: "tbody > tr".into(),
                    has_text: None,
                },
                1,
            );
            assert_eq!(path.to_string(), "css=tbody > tr#1");
            assert_eq!(ElementPath::root().to_string(), ":root");
        }
    }

    mod resolve_tests {
        use super::*;

        fn login_surface() -> MockSurface {
            let surface = MockSurface::new("http://clinic.test/openmrs/spa/login");
            surface.add(
                MockElement::new("input")
                    .role("textbox")
                    .label("Username")
                    .attr("id", "username"),
            );
            surface.add(MockElement::new("button").role("button").name("Continue"));
            surface.add(MockElement::new("a").role("link").name("Help").text("Help"));
            surface.add(MockElement::new("a").role("link").name("Help").text("Help"));
            surface
        }

        #[tokio::test]
        async fn test_highest_priority_strategy_wins() {
            let surface = login_surface();
            let d = ElementDescriptor::new("username")
                .css("#missing")
                .label(TextMatch::exact("Username"));
            let handle = resolve(&surface, &d).await.unwrap();
            assert_eq!(handle.path.0.len(), 1);
            assert_eq!(handle.path.0[0].strategy.priority(), 1);
        }

        #[tokio::test]
        async fn test_falls_through_on_zero_matches() {
            let surface = login_surface();
            let d = ElementDescriptor::new("continue")
                .role("button", TextMatch::exact("Next"))
                .text(TextMatch::exact("Nope"))
                .role("button", TextMatch::exact("Continue"));
            let handle = resolve(&surface, &d).await.unwrap();
            assert_eq!(
                handle.path.0[0].strategy,
                Strategy::Role {
                    role: "button".into(),
                    name: Some(TextMatch::exact("Continue"))
                }
            );
        }

        #[tokio::test]
        async fn test_exhausted_is_not_found() {
            let surface = login_surface();
            let d = ElementDescriptor::new("logout").role("button", TextMatch::exact("Logout"));
            let err = resolve(&surface, &d).await.unwrap_err();
            assert!(matches!(err, TriageError::NotFound { ref descriptor } if descriptor == "logout"));
        }

        #[tokio::test]
        async fn test_no_strategies_is_not_found() {
            let surface = login_surface();
            let err = resolve(&surface, &ElementDescriptor::new("empty"))
                .await
                .unwrap_err();
            assert!(matches!(err, TriageError::NotFound { .. }));
        }

        #[tokio::test]
        async fn test_multiple_matches_are_ambiguous() {
            let surface = login_surface();
            let d = ElementDescriptor::new("help").role("link", TextMatch::exact("Help"));
            let err = resolve(&surface, &d).await.unwrap_err();
            assert!(matches!(err, TriageError::Ambiguous { count: 2, .. }));
        }

        #[tokio::test]
        async fn test_first_accepts_multiple() {
            let surface = login_surface();
            let d = ElementDescriptor::new("help")
                .role("link", TextMatch::exact("Help"))
                .first();
            assert_eq!(resolve(&surface, &d).await.unwrap().path.0[0].index, 0);
        }

        #[tokio::test]
        async fn test_nth_out_of_range_falls_through() {
            let surface = login_surface();
            let d = ElementDescriptor::new("help")
                .role("link", TextMatch::exact("Help"))
                .text(TextMatch::exact("Help"))
                .nth(1);
            let handle = resolve(&surface, &d).await.unwrap();
            assert_eq!(handle.path.0[0].index, 1);

            let d = ElementDescriptor::new("help").role("link", TextMatch::exact("Help")).nth(5);
            assert!(matches!(
                resolve(&surface, &d).await.unwrap_err(),
                TriageError::NotFound { .. }
            ));
        }

        #[tokio::test]
        async fn test_within_scopes_to_parent() {
            let surface = MockSurface::new("http://clinic.test/");
            let table = surface.add(MockElement::new("table").css_match("table.cds--data-table"));
            let row = surface.add_child(table, MockElement::new("tr").css_match("tbody > tr"));
            surface.add_child(row, MockElement::new("td").text("John Doe"));
            surface.add(MockElement::new("td").text("Outside"));

            let rows = ElementDescriptor::new("row")
                .css("tbody > tr")
                .within(ElementDescriptor::new("queue table").css("table.cds--data-table"));
            let handle = resolve(&surface, &rows).await.unwrap();
            assert_eq!(handle.path.0.len(), 2);
            assert_eq!(count(&surface, &rows).await.unwrap(), 1);

            let missing = ElementDescriptor::new("cell")
                .text(TextMatch::exact("John Doe"))
                .within(ElementDescriptor::new("other table").css("table.other"));
            assert_eq!(count(&surface, &missing).await.unwrap(), 0);
            assert!(matches!(
                resolve(&surface, &missing).await.unwrap_err(),
                TriageError::NotFound { ref descriptor } if descriptor == "other table"
            ));
        }

        #[tokio::test]
        async fn test_resolution_does_not_dispatch() {
            let surface = login_surface();
            let d = ElementDescriptor::new("username").label(TextMatch::exact("Username"));
            resolve(&surface, &d).await.unwrap();
            assert!(surface.dispatched().is_empty());
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_exact_matches_itself(s in "[a-zA-Z0-9 ]{0,40}") {
                prop_assert!(TextMatch::exact(s.clone()).matches(&s));
            }

            #[test]
            fn prop_contains_matches_any_case(s in "[a-zA-Z]{1,20}") {
                let haystack = format!("prefix {} suffix", s.to_uppercase());
                prop_assert!(TextMatch::contains(s.to_lowercase()).matches(&haystack));
            }

            #[test]
            fn prop_resolution_is_idempotent(buttons in 1usize..6, pick in 0usize..6) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                    .unwrap();
                rt.block_on(async {
                    let surface = MockSurface::new("http://clinic.test/");
                    for _ in 0..buttons {
                        surface.add(MockElement::new("button").role("button").name("Save"));
                    }
                    let d = ElementDescriptor::new("save")
                        .role("button", TextMatch::exact("Save"))
                        .nth(pick);
                    let first = resolve(&surface, &d).await;
                    let second = resolve(&surface, &d).await;
                    match (first, second) {
                        (Ok(a), Ok(b)) => assert_eq!(a, b),
                        (Err(a), Err(b)) => assert_eq!(a.kind(), b.kind()),
                        _ => panic!("resolution changed on an unchanged surface"),
                    }
                });
            }
        }
    }
}
