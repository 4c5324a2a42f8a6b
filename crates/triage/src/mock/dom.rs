//! In-memory element tree.
//!
//! Elements are stored in document order. Timed fields (`appear_after`,
//! `enable_after`, `settle_after`, `text_after`) are measured from the moment
//! the element was added, on the tokio clock, so paused-time tests see them
//! change deterministically.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::locator::{ElementPath, Strategy, TextMatch};
use crate::surface::{BoundingBox, ElementState};

/// Index of an element inside a [`MockDom`]
pub type ElementId = usize;

/// One element of the mock tree
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Stable key for call assertions
    pub key: Option<String>,
    /// Lower-case tag name
    pub tag: String,
    /// Explicit ARIA role
    pub role: Option<String>,
    /// Explicit accessible name
    pub name: Option<String>,
    /// Associated label text
    pub label: Option<String>,
    /// Attributes
    pub attrs: BTreeMap<String, String>,
    /// Own text
    pub text: String,
    /// CSS selectors this element answers to
    pub selectors: Vec<String>,
    /// Rendered
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Accepts text input
    pub editable: bool,
    /// Checkbox or radio
    pub checkable: bool,
    /// Checked state
    pub checked: bool,
    /// Input value
    pub value: String,
    /// Layout box when visible
    pub bbox: BoundingBox,
    /// Becomes visible this long after insertion
    pub appear_after: Option<Duration>,
    /// Becomes enabled this long after insertion
    pub enable_after: Option<Duration>,
    /// Moves until this long after insertion
    pub settle_after: Option<Duration>,
    /// Text replaced this long after insertion
    pub text_after: Option<(Duration, String)>,
    parent: Option<ElementId>,
    added_at: Instant,
}

impl MockElement {
    /// Create a visible, enabled element
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into().to_lowercase();
        let editable = matches!(tag.as_str(), "input" | "textarea");
        Self {
            key: None,
            tag,
            role: None,
            name: None,
            label: None,
            attrs: BTreeMap::new(),
            text: String::new(),
            selectors: Vec::new(),
            visible: true,
            enabled: true,
            editable,
            checkable: false,
            checked: false,
            value: String::new(),
            bbox: BoundingBox::new(0.0, 0.0, 120.0, 32.0),
            appear_after: None,
            enable_after: None,
            settle_after: None,
            text_after: None,
            parent: None,
            added_at: Instant::now(),
        }
    }

    /// Checkbox input
    #[must_use]
    pub fn checkbox() -> Self {
        Self::new("input").attr("type", "checkbox").checkable()
    }

    /// Radio input
    #[must_use]
    pub fn radio() -> Self {
        Self::new("input").attr("type", "radio").checkable()
    }

    /// Set key
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set role
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set accessible name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set label
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Set own text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Answer to a CSS selector
    #[must_use]
    pub fn css_match(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    /// Set value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Render hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Render disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Reject text input
    #[must_use]
    pub const fn readonly(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Make checkable
    #[must_use]
    pub const fn checkable(mut self) -> Self {
        self.checkable = true;
        self.editable = false;
        self
    }

    /// Appear after a delay
    #[must_use]
    pub const fn appear_after(mut self, delay: Duration) -> Self {
        self.appear_after = Some(delay);
        self
    }

    /// Enable after a delay
    #[must_use]
    pub const fn enable_after(mut self, delay: Duration) -> Self {
        self.enable_after = Some(delay);
        self
    }

    /// Keep moving for a while
    #[must_use]
    pub const fn settle_after(mut self, delay: Duration) -> Self {
        self.settle_after = Some(delay);
        self
    }

    /// Replace text after a delay
    #[must_use]
    pub fn text_after(mut self, delay: Duration, text: impl Into<String>) -> Self {
        self.text_after = Some((delay, text.into()));
        self
    }

    fn elapsed(&self) -> Duration {
        self.added_at.elapsed()
    }

    fn self_visible(&self) -> bool {
        self.visible && self.appear_after.map_or(true, |d| self.elapsed() >= d)
    }

    fn is_enabled(&self) -> bool {
        self.enabled && self.enable_after.map_or(true, |d| self.elapsed() >= d)
    }

    fn current_text(&self) -> &str {
        match &self.text_after {
            Some((delay, text)) if self.elapsed() >= *delay => text,
            _ => &self.text,
        }
    }

    fn current_bbox(&self) -> BoundingBox {
        match self.settle_after {
            Some(d) if self.elapsed() < d => {
                let drift = self.elapsed().as_millis() as f64;
                BoundingBox::new(self.bbox.x + drift, self.bbox.y, self.bbox.width, self.bbox.height)
            }
            _ => self.bbox,
        }
    }

    /// Role, explicit or implied by tag
    #[must_use]
    pub fn effective_role(&self) -> Option<&str> {
        if let Some(role) = &self.role {
            return Some(role);
        }
        let role = match self.tag.as_str() {
            "button" => "button",
            "a" => "link",
            "img" => "img",
            "table" => "table",
            "tr" => "row",
            "th" => "columnheader",
            "td" => "cell",
            "select" => "combobox",
            "p" => "paragraph",
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => "heading",
            "textarea" => "textbox",
            "input" => match self.attrs.get("type").map(String::as_str) {
                Some("checkbox") => "checkbox",
                Some("radio") => "radio",
                Some("button" | "submit") => "button",
                _ => "textbox",
            },
            _ => return None,
        };
        Some(role)
    }

    /// Display label for recorded calls
    #[must_use]
    pub fn describe(&self) -> String {
        self.key
            .clone()
            .or_else(|| self.name.clone())
            .or_else(|| self.label.clone())
            .unwrap_or_else(|| format!("<{}>", self.tag))
    }
}

/// Ordered element tree
#[derive(Debug, Clone, Default)]
pub struct MockDom {
    elements: Vec<Option<MockElement>>,
}

impl MockDom {
    /// Empty tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at top level
    pub fn add(&mut self, element: MockElement) -> ElementId {
        self.insert(None, element)
    }

    /// Append under `parent`
    pub fn add_child(&mut self, parent: ElementId, element: MockElement) -> ElementId {
        self.insert(Some(parent), element)
    }

    fn insert(&mut self, parent: Option<ElementId>, mut element: MockElement) -> ElementId {
        element.parent = parent;
        self.elements.push(Some(element));
        self.elements.len() - 1
    }

    /// Detach an element and its subtree
    pub fn remove(&mut self, id: ElementId) {
        let doomed: Vec<ElementId> = self
            .live()
            .filter(|&(other, _)| other == id || self.is_descendant(other, Some(id)))
            .map(|(other, _)| other)
            .collect();
        for other in doomed {
            self.elements[other] = None;
        }
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Borrow an element
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&MockElement> {
        self.elements.get(id).and_then(Option::as_ref)
    }

    /// Mutably borrow an element
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut MockElement> {
        self.elements.get_mut(id).and_then(Option::as_mut)
    }

    /// First live element with this key
    #[must_use]
    pub fn find_key(&self, key: &str) -> Option<ElementId> {
        self.live()
            .find(|(_, el)| el.key.as_deref() == Some(key))
            .map(|(id, _)| id)
    }

    fn live(&self) -> impl Iterator<Item = (ElementId, &MockElement)> {
        self.elements
            .iter()
            .enumerate()
            .filter_map(|(id, el)| el.as_ref().map(|el| (id, el)))
    }

    fn is_descendant(&self, id: ElementId, scope: Option<ElementId>) -> bool {
        let Some(scope) = scope else {
            return true;
        };
        let mut current = self.get(id).and_then(|el| el.parent);
        while let Some(parent) = current {
            if parent == scope {
                return true;
            }
            current = self.get(parent).and_then(|el| el.parent);
        }
        false
    }

    /// Visible including every ancestor
    #[must_use]
    pub fn is_visible(&self, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            match self.get(node) {
                Some(el) if el.self_visible() => current = el.parent,
                _ => return false,
            }
        }
        true
    }

    /// Own text plus descendants' text in document order
    #[must_use]
    pub fn text_content(&self, id: ElementId) -> String {
        let parts: Vec<&str> = self
            .live()
            .filter(|&(other, _)| other == id || self.is_descendant(other, Some(id)))
            .map(|(_, el)| el.current_text())
            .filter(|t| !t.is_empty())
            .collect();
        parts.join(" ")
    }

    fn accessible_name(&self, id: ElementId, el: &MockElement) -> String {
        el.name
            .clone()
            .or_else(|| el.attrs.get("aria-label").cloned())
            .or_else(|| el.label.clone())
            .unwrap_or_else(|| self.text_content(id))
    }

    fn matches(&self, id: ElementId, el: &MockElement, strategy: &Strategy) -> bool {
        match strategy {
            Strategy::Role { role, name } => {
                el.effective_role() == Some(role.as_str())
                    && self.is_visible(id)
                    && name
                        .as_ref()
                        .map_or(true, |n| n.matches(&self.accessible_name(id, el)))
            }
            Strategy::Label { text } => el.label.as_deref().is_some_and(|l| text.matches(l)),
            Strategy::Attribute { name, value } => el.attrs.get(name) == Some(value),
            Strategy::Text { text } => !el.current_text().is_empty() && text.matches(el.current_text()),
            Strategy::Css { selector, has_text } => {
                el.selectors.iter().any(|s| s == selector)
                    && has_text
                        .as_ref()
                        .map_or(true, |t: &TextMatch| t.matches(&self.text_content(id)))
            }
        }
    }

    /// Matches of `strategy` inside `scope`, in document order
    #[must_use]
    pub fn query(&self, scope: Option<ElementId>, strategy: &Strategy) -> Vec<ElementId> {
        self.live()
            .filter(|&(id, _)| Some(id) != scope && self.is_descendant(id, scope))
            .filter(|&(id, el)| self.matches(id, el, strategy))
            .map(|(id, _)| id)
            .collect()
    }

    /// Follow a resolved path
    #[must_use]
    pub fn locate(&self, path: &ElementPath) -> Option<ElementId> {
        let mut scope = None;
        for segment in &path.0 {
            let matches = self.query(scope, &segment.strategy);
            scope = Some(*matches.get(segment.index)?);
        }
        scope
    }

    /// Observable state of an element
    #[must_use]
    pub fn state(&self, id: ElementId) -> Option<ElementState> {
        let el = self.get(id)?;
        let visible = self.is_visible(id);
        Some(ElementState {
            tag: el.tag.clone(),
            visible,
            enabled: el.is_enabled(),
            editable: el.editable,
            checkable: el.checkable,
            checked: el.checked,
            text: self.text_content(id),
            value: el.value.clone(),
            bounding_box: visible.then(|| el.current_bbox()),
        })
    }

    /// Set checked state; checking a radio clears its group
    pub fn set_checked(&mut self, id: ElementId, checked: bool) {
        let group = self
            .get(id)
            .filter(|el| el.attrs.get("type").map(String::as_str) == Some("radio"))
            .and_then(|el| el.attrs.get("name").cloned());
        if let (Some(group), true) = (group, checked) {
            for slot in self.elements.iter_mut().flatten() {
                if slot.attrs.get("name") == Some(&group) {
                    slot.checked = false;
                }
            }
        }
        if let Some(el) = self.get_mut(id) {
            el.checked = checked;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod query_tests {
        use super::*;

        #[test]
        fn test_implicit_roles() {
            assert_eq!(MockElement::new("button").effective_role(), Some("button"));
            assert_eq!(MockElement::new("h3").effective_role(), Some("heading"));
            assert_eq!(MockElement::checkbox().effective_role(), Some("checkbox"));
            assert_eq!(MockElement::new("div").effective_role(), None);
        }

        #[test]
        fn test_role_requires_visibility() {
            let mut dom = MockDom::new();
            dom.add(MockElement::new("button").name("Save").hidden());
            let strategy = Strategy::Role {
                role: "button".into(),
                name: Some(TextMatch::exact("Save")),
            };
            assert!(dom.query(None, &strategy).is_empty());
        }

        #[test]
        fn test_accessible_name_falls_back_to_text() {
            let mut dom = MockDom::new();
            let tile = dom.add(MockElement::new("div").css_match(".cds--tile"));
            dom.add_child(tile, MockElement::new("h3").text("Checked in patients"));
            let heading = Strategy::Role {
                role: "heading".into(),
                name: Some(TextMatch::exact("Checked in patients")),
            };
            assert_eq!(dom.query(None, &heading).len(), 1);
            let tile_css = Strategy::Css {
                selector: ".cds--tile".into(),
                has_text: Some(TextMatch::contains("checked in")),
            };
            assert_eq!(dom.query(None, &tile_css), vec![tile]);
        }

        #[test]
        fn test_remove_drops_subtree() {
            let mut dom = MockDom::new();
            let parent = dom.add(MockElement::new("div").key("menu"));
            dom.add_child(parent, MockElement::new("button").key("logout"));
            dom.remove(parent);
            assert!(dom.find_key("menu").is_none());
            assert!(dom.find_key("logout").is_none());
        }

        #[test]
        fn test_radio_group_is_exclusive() {
            let mut dom = MockDom::new();
            let male = dom.add(MockElement::radio().attr("name", "gender").label("Male"));
            let female = dom.add(MockElement::radio().attr("name", "gender").label("Female"));
            dom.set_checked(male, true);
            dom.set_checked(female, true);
            assert!(!dom.get(male).unwrap().checked);
            assert!(dom.get(female).unwrap().checked);
        }
    }

    mod timing_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_appear_after() {
            let mut dom = MockDom::new();
            let id = dom.add(MockElement::new("p").appear_after(Duration::from_millis(200)));
            assert!(!dom.is_visible(id));
            tokio::time::advance(Duration::from_millis(200)).await;
            assert!(dom.is_visible(id));
        }

        #[tokio::test(start_paused = true)]
        async fn test_settling_box_moves() {
            let mut dom = MockDom::new();
            let id = dom.add(MockElement::new("button").settle_after(Duration::from_millis(100)));
            let first = dom.state(id).unwrap().bounding_box;
            tokio::time::advance(Duration::from_millis(50)).await;
            let second = dom.state(id).unwrap().bounding_box;
            assert_ne!(first, second);
            tokio::time::advance(Duration::from_millis(100)).await;
            let third = dom.state(id).unwrap().bounding_box;
            tokio::time::advance(Duration::from_millis(50)).await;
            assert_eq!(third, dom.state(id).unwrap().bounding_box);
        }

        #[tokio::test(start_paused = true)]
        async fn test_text_after() {
            let mut dom = MockDom::new();
            let id = dom.add(MockElement::new("p").text("--").text_after(Duration::from_secs(1), "4"));
            assert_eq!(dom.text_content(id), "--");
            tokio::time::advance(Duration::from_secs(1)).await;
            assert_eq!(dom.text_content(id), "4");
        }
    }
}
