//! Surface - abstract remote UI the interaction layer drives.
//!
//! Two implementations ship with the crate:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Surface (async trait)                                       │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │  ChromiumSurface             │  MockSurface / MockClinic     │
//! │  CDP via chromiumoxide,      │  in-memory element tree for   │
//! │  paths evaluated in-page     │  unit and scenario tests      │
//! └──────────────────────────────┴───────────────────────────────┘
//! ```
//!
//! Every method is a single round trip. Waiting and actionability live one
//! layer up in [`crate::actions`] so both backends share the same timing.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::locator::{ElementPath, Strategy};
use crate::result::TriageResult;
use crate::wait::LoadState;

/// Element bounding box in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the box has any area
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Snapshot of one element as observed at call time
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementState {
    /// Lower-case tag name
    pub tag: String,
    /// Rendered and not hidden
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Accepts text input
    pub editable: bool,
    /// Checkbox or radio
    pub checkable: bool,
    /// Current checked state
    pub checked: bool,
    /// Inner text
    pub text: String,
    /// Current input value
    pub value: String,
    /// Layout box, absent when not rendered
    pub bounding_box: Option<BoundingBox>,
}

/// Full-surface capture
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Timestamp when the capture was taken
    pub taken_at: chrono::DateTime<chrono::Utc>,
}

impl Screenshot {
    /// Create a new screenshot
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            taken_at: chrono::Utc::now(),
        }
    }

    /// Size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Browser launch configuration
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Disable the Chromium sandbox (containers)
    pub no_sandbox: bool,
    /// Explicit Chromium binary
    pub chromium_path: Option<String>,
    /// Timeout for a single protocol round trip
    pub request_timeout: Duration,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            no_sandbox: true,
            chromium_path: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl SurfaceConfig {
    /// Create a new config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set Chromium binary
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set sandbox mode
    #[must_use]
    pub const fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.no_sandbox = !sandbox;
        self
    }
}

/// A live UI that can be queried and acted upon
#[async_trait]
pub trait Surface: Send + Sync {
    /// Start navigation to an absolute URL
    async fn navigate(&self, url: &str) -> TriageResult<()>;

    /// Current location identifier
    async fn current_url(&self) -> TriageResult<String>;

    /// History back
    async fn go_back(&self) -> TriageResult<()>;

    /// Reload current document
    async fn reload(&self) -> TriageResult<()>;

    /// Load state of the current document
    async fn load_state(&self) -> TriageResult<LoadState>;

    /// Number of elements `strategy` matches inside `scope`
    async fn count(&self, scope: &ElementPath, strategy: &Strategy) -> TriageResult<usize>;

    /// State of the element at `path`, `None` if the path no longer resolves
    async fn inspect(&self, path: &ElementPath) -> TriageResult<Option<ElementState>>;

    /// Replace the value of a text input
    async fn fill(&self, path: &ElementPath, text: &str) -> TriageResult<()>;

    /// Click the element
    async fn click(&self, path: &ElementPath) -> TriageResult<()>;

    /// Set checked state of a checkbox or radio
    async fn set_checked(&self, path: &ElementPath, checked: bool) -> TriageResult<()>;

    /// Capture the full surface
    async fn screenshot(&self) -> TriageResult<Screenshot>;

    /// Release backend resources
    async fn close(&self) -> TriageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod config_tests {
        use super::*;

        #[test]
        fn test_default_config() {
            let config = SurfaceConfig::default();
            assert!(config.headless);
            assert!(config.no_sandbox);
            assert_eq!(config.viewport_width, 1280);
            assert!(config.chromium_path.is_none());
        }

        #[test]
        fn test_builder() {
            let config = SurfaceConfig::new()
                .with_headless(false)
                .with_viewport(800, 600)
                .with_sandbox(true)
                .with_chromium_path("/usr/bin/chromium");
            assert!(!config.headless);
            assert!(!config.no_sandbox);
            assert_eq!(config.viewport_height, 600);
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        }
    }

    mod state_tests {
        use super::*;

        #[test]
        fn test_bounding_box_area() {
            assert!(BoundingBox::new(0.0, 0.0, 10.0, 5.0).has_area());
            assert!(!BoundingBox::new(3.0, 3.0, 0.0, 5.0).has_area());
        }

        #[test]
        fn test_screenshot_size() {
            assert_eq!(Screenshot::new(vec![1, 2, 3]).size_bytes(), 3);
        }
    }
}
