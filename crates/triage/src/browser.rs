//! Chromium surface over CDP.
//!
//! Every scenario gets its own browser process. Element paths are shipped to
//! the page as JSON and re-resolved there by a small runtime on each call,
//! so no handle outlives the document it came from.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::locator::{ElementPath, Strategy};
use crate::result::{TriageError, TriageResult};
use crate::session::SessionFactory;
use crate::surface::{ElementState, Screenshot, Surface, SurfaceConfig};
use crate::wait::LoadState;

/// In-page resolver, installed once per document
const RUNTIME: &str = r#"
if (!window.__triage) {
  const norm = (s) => (s || "").replace(/\s+/g, " ").trim();
  const textMatches = (m, actual) => {
    const a = norm(actual);
    const v = norm(m.value);
    return m.mode === "exact" ? a === v : a.toLowerCase().includes(v.toLowerCase());
  };
  const visible = (el) => {
    if (!el.isConnected) return false;
    const style = getComputedStyle(el);
    if (style.display === "none" || style.visibility === "hidden" || style.opacity === "0") return false;
    const r = el.getBoundingClientRect();
    return r.width > 0 && r.height > 0;
  };
  const implicitRole = (el) => {
    const explicit = el.getAttribute("role");
    if (explicit) return explicit.split(" ")[0];
    const tag = el.tagName.toLowerCase();
    const type = (el.getAttribute("type") || "text").toLowerCase();
    if (tag === "button") return "button";
    if (tag === "a" && el.hasAttribute("href")) return "link";
    if (tag === "textarea") return "textbox";
    if (tag === "select") return "combobox";
    if (tag === "img") return "img";
    if (tag === "th") return "columnheader";
    if (tag === "td") return "cell";
    if (tag === "tr") return "row";
    if (tag === "table") return "table";
    if (tag === "p") return "paragraph";
    if (tag === "nav") return "navigation";
    if (tag === "dialog") return "dialog";
    if (/^h[1-6]$/.test(tag)) return "heading";
    if (tag === "input") {
      if (["button", "submit", "reset"].includes(type)) return "button";
      if (type === "checkbox") return "checkbox";
      if (type === "radio") return "radio";
      if (["text", "email", "tel", "url", "search"].includes(type)) return "textbox";
    }
    return null;
  };
  const labelText = (el) => {
    const parts = [];
    if (el.labels) for (const l of el.labels) parts.push(l.innerText);
    return norm(parts.join(" "));
  };
  const accessibleName = (el) => {
    const by = el.getAttribute("aria-labelledby");
    if (by) {
      const text = by.split(/\s+/).map((id) => document.getElementById(id)).filter(Boolean).map((n) => n.innerText).join(" ");
      if (norm(text)) return norm(text);
    }
    const aria = el.getAttribute("aria-label");
    if (norm(aria)) return norm(aria);
    const label = labelText(el);
    if (label) return label;
    if (el.getAttribute("alt")) return norm(el.getAttribute("alt"));
    const role = implicitRole(el);
    if (el.tagName !== "INPUT" && el.tagName !== "TEXTAREA" && role !== "menu") {
      const text = norm(el.innerText);
      if (text) return text;
    }
    return norm(el.getAttribute("title") || el.getAttribute("placeholder") || "");
  };
  const descendants = (root) => Array.from((root || document).querySelectorAll("*"));
  const query = (root, s) => {
    switch (s.kind) {
      case "role":
        return descendants(root).filter((el) =>
          implicitRole(el) === s.role && visible(el) && (!s.name || textMatches(s.name, accessibleName(el))));
      case "label": {
        const found = new Set();
        for (const el of descendants(root)) {
          const aria = el.getAttribute("aria-label");
          if (aria && textMatches(s.text, aria)) found.add(el);
          if (el.tagName === "LABEL" && textMatches(s.text, el.innerText) && el.control) found.add(el.control);
        }
        return descendants(root).filter((el) => found.has(el));
      }
      case "attribute":
        return descendants(root).filter((el) => el.getAttribute(s.name) === s.value);
      case "text":
        return descendants(root).filter((el) => {
          if (["SCRIPT", "STYLE", "HEAD"].includes(el.tagName)) return false;
          if (!textMatches(s.text, el.innerText)) return false;
          return !Array.from(el.children).some((c) => textMatches(s.text, c.innerText));
        });
      case "css": {
        const all = Array.from((root || document).querySelectorAll(s.selector));
        return s.has_text ? all.filter((el) => textMatches(s.has_text, el.textContent)) : all;
      }
      default:
        return [];
    }
  };
  const resolve = (path) => {
    let current = null;
    for (const seg of path) {
      const found = query(current, seg.strategy);
      if (seg.index >= found.length) return null;
      current = found[seg.index];
    }
    return current;
  };
  const editable = (el) =>
    (el.tagName === "INPUT" && !["checkbox", "radio", "button", "submit", "reset", "hidden"].includes((el.type || "").toLowerCase()))
    || el.tagName === "TEXTAREA" || el.isContentEditable;
  const state = (el) => {
    const r = el.getBoundingClientRect();
    const checkable = el.tagName === "INPUT" && ["checkbox", "radio"].includes(el.type);
    return {
      tag: el.tagName.toLowerCase(),
      visible: visible(el),
      enabled: !el.disabled && el.getAttribute("aria-disabled") !== "true",
      editable: editable(el) && !el.readOnly,
      checkable,
      checked: checkable ? el.checked : el.getAttribute("aria-checked") === "true",
      text: norm(el.innerText),
      value: "value" in el ? String(el.value ?? "") : "",
      bounding_box: r.width > 0 || r.height > 0 ? { x: r.x, y: r.y, width: r.width, height: r.height } : null,
    };
  };
  const loadState = () => {
    if (document.readyState === "loading") return "loading";
    if (document.readyState === "interactive") return "dom_content_loaded";
    const last = performance.getEntriesByType("resource").reduce((m, e) => Math.max(m, e.responseEnd), 0);
    return performance.now() - last > 500 ? "network_idle" : "load";
  };
  window.__triage = { query, resolve, state, loadState };
}
"#;

fn driver<E: std::fmt::Display>(e: E) -> TriageError {
    TriageError::driver(e.to_string())
}

/// A single Chromium page driven over CDP
pub struct ChromiumSurface {
    browser: Mutex<Browser>,
    page: Page,
    handler: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for ChromiumSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumSurface").finish_non_exhaustive()
    }
}

impl ChromiumSurface {
    /// Launch a browser and open a blank page
    ///
    /// # Errors
    ///
    /// Returns error if the browser cannot be launched
    pub async fn launch(config: &SurfaceConfig) -> TriageResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .request_timeout(config.request_timeout);
        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(driver)?;

        let (browser, mut handler) = Browser::launch(cdp_config).await.map_err(driver)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        let page = browser.new_page("about:blank").await.map_err(driver)?;
        info!(headless = config.headless, "chromium launched");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }

    /// Run `call` on the in-page runtime and decode its result
    async fn eval<T: DeserializeOwned>(&self, call: &str) -> TriageResult<T> {
        let script = format!("(() => {{ {RUNTIME}\n return {call}; }})()");
        let result = self.page.evaluate(script).await.map_err(driver)?;
        result.into_value().map_err(driver)
    }

    /// Run an action against the element at `path`
    async fn on_element(&self, path: &ElementPath, body: &str) -> TriageResult<()> {
        let call = format!(
            "((el) => {{ if (!el) return false; {body}; return true; }})(window.__triage.resolve({}))",
            json(path)?
        );
        if self.eval::<bool>(&call).await? {
            Ok(())
        } else {
            Err(TriageError::driver(format!("stale element path {path}")))
        }
    }
}

fn json<T: Serialize + ?Sized>(value: &T) -> TriageResult<String> {
    Ok(serde_json::to_string(value)?)
}

#[async_trait]
impl Surface for ChromiumSurface {
    async fn navigate(&self, url: &str) -> TriageResult<()> {
        debug!(url, "cdp navigate");
        self.page.goto(url).await.map_err(driver)?;
        Ok(())
    }

    async fn current_url(&self) -> TriageResult<String> {
        Ok(self.page.url().await.map_err(driver)?.unwrap_or_default())
    }

    async fn go_back(&self) -> TriageResult<()> {
        self.page.evaluate("history.back()").await.map_err(driver)?;
        Ok(())
    }

    async fn reload(&self) -> TriageResult<()> {
        self.page.reload().await.map_err(driver)?;
        Ok(())
    }

    async fn load_state(&self) -> TriageResult<LoadState> {
        let raw: String = self.eval("window.__triage.loadState()").await?;
        serde_json::from_value(serde_json::Value::String(raw)).map_err(Into::into)
    }

    async fn count(&self, scope: &ElementPath, strategy: &Strategy) -> TriageResult<usize> {
        let call = if scope.is_root() {
            format!("window.__triage.query(null, {}).length", json(strategy)?)
        } else {
            format!(
                "((root) => root ? window.__triage.query(root, {}).length : 0)(window.__triage.resolve({}))",
                json(strategy)?,
                json(scope)?
            )
        };
        self.eval(&call).await
    }

    async fn inspect(&self, path: &ElementPath) -> TriageResult<Option<ElementState>> {
        let call = format!(
            "((el) => el ? window.__triage.state(el) : null)(window.__triage.resolve({}))",
            json(path)?
        );
        self.eval(&call).await
    }

    async fn fill(&self, path: &ElementPath, text: &str) -> TriageResult<()> {
        let body = format!(
            "el.focus(); \
             const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
             Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, {}); \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }}))",
            json(text)?
        );
        self.on_element(path, &body).await
    }

    async fn click(&self, path: &ElementPath) -> TriageResult<()> {
        self.on_element(path, "el.scrollIntoView({ block: 'center' }); el.click()")
            .await
    }

    async fn set_checked(&self, path: &ElementPath, checked: bool) -> TriageResult<()> {
        let body = format!("if (el.checked !== {checked}) el.click()");
        self.on_element(path, &body).await
    }

    async fn screenshot(&self) -> TriageResult<Screenshot> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .capture_beyond_viewport(true)
            .build();
        let shot = self
            .page
            .execute(params)
            .await
            .map_err(|e| TriageError::Screenshot {
                message: e.to_string(),
            })?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| TriageError::Screenshot {
                message: e.to_string(),
            })?;
        Ok(Screenshot::new(data))
    }

    async fn close(&self) -> TriageResult<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(driver)?;
        exited_cleanly(&browser.wait().await);
        self.handler.abort();
        Ok(())
    }
}

/// Log a browser process that could not be reaped
fn exited_cleanly(result: &std::io::Result<Option<std::process::ExitStatus>>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "browser process did not exit cleanly");
            false
        }
    }
}

/// Launches one browser per scenario
#[derive(Debug, Clone, Default)]
pub struct ChromiumFactory {
    config: SurfaceConfig,
}

impl ChromiumFactory {
    /// Factory with this launch configuration
    #[must_use]
    pub const fn new(config: SurfaceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for ChromiumFactory {
    async fn create(&self) -> TriageResult<Arc<dyn Surface>> {
        Ok(Arc::new(ChromiumSurface::launch(&self.config).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_uses_serialized_tags() {
        let strategy = serde_json::to_value(Strategy::Css {
            selector: "p".into(),
            has_text: None,
        })
        .unwrap_or_default();
        assert_eq!(strategy["kind"], "css");
        for kind in ["\"role\"", "\"label\"", "\"attribute\"", "\"text\"", "\"css\""] {
            assert!(RUNTIME.contains(kind), "{kind}");
        }
    }

    #[test]
    fn test_load_states_parse() {
        for raw in ["loading", "dom_content_loaded", "load", "network_idle"] {
            let parsed: Result<LoadState, _> =
                serde_json::from_value(serde_json::Value::String(raw.into()));
            assert!(parsed.is_ok(), "{raw}");
        }
    }

    #[test]
    fn test_unreaped_browser_is_reported() {
        assert!(exited_cleanly(&Ok(None)));
        let gone = std::io::Error::new(std::io::ErrorKind::Other, "no such process");
        assert!(!exited_cleanly(&Err(gone)));
    }
}
