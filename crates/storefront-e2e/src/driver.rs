//! Storefront driver abstraction.
//!
//! Page objects never talk to a browser directly. They act on a [`Surface`],
//! which pairs a [`StorefrontDriver`] with the identity of the browser
//! surface it controls. Drivers take `&self` everywhere so that every page
//! object of one workflow can share the same surface.
//!
//! # Implementations
//!
//! - `ChromiumDriver` (feature `browser`) - CDP via chromiumoxide
//! - [`MockStorefront`](crate::mock::MockStorefront) - in-memory storefront for tests

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dialog::Dialog;
use crate::locator::{Locator, SelectorExpr};
use crate::result::{StorefrontError, StorefrontResult};
use crate::wait::LoadState;

/// Identity of one browser surface (page/tab)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    /// Allocate a fresh surface id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Screenshot data with metadata
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Timestamp when screenshot was taken
    pub taken_at: chrono::DateTime<chrono::Local>,
}

impl Screenshot {
    /// Create a new screenshot
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            taken_at: chrono::Local::now(),
        }
    }

    /// Get the size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check if screenshot has data
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty()
    }
}

/// Browser configuration for drivers that launch a browser
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Timeout for navigation
    pub navigation_timeout: Duration,
    /// Executable path override
    pub executable_path: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            navigation_timeout: Duration::from_secs(30),
            executable_path: None,
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Set the browser executable
    #[must_use]
    pub fn executable_path(mut self, path: impl Into<String>) -> Self {
        self.executable_path = Some(path.into());
        self
    }
}

/// Browser capability consumed by page objects.
///
/// Counting methods count every match of a selector. Element methods act on
/// the element chosen by the locator's [`MatchPolicy`](crate::locator::MatchPolicy)
/// and fail with [`StorefrontError::AmbiguousMatch`] when a strict locator
/// matches several elements.
#[async_trait]
pub trait StorefrontDriver: Send + Sync {
    /// Identity of the surface this driver controls
    fn surface_id(&self) -> SurfaceId;

    /// Navigate to URL
    async fn goto(&self, url: &str) -> StorefrontResult<()>;

    /// Get current URL
    async fn current_url(&self) -> StorefrontResult<String>;

    /// Go back in history
    async fn go_back(&self) -> StorefrontResult<()>;

    /// Most advanced load state the current document has reached
    async fn load_state(&self) -> StorefrontResult<LoadState>;

    /// Number of elements matching a selector
    async fn count(&self, selector: &SelectorExpr) -> StorefrontResult<usize>;

    /// Whether the targeted element exists and is rendered
    async fn is_visible(&self, locator: &Locator) -> StorefrontResult<bool>;

    /// Click the targeted element
    async fn click(&self, locator: &Locator) -> StorefrontResult<()>;

    /// Replace the value of the targeted input
    async fn fill(&self, locator: &Locator, value: &str) -> StorefrontResult<()>;

    /// Text content of the targeted element, `None` when nothing matches
    async fn text_content(&self, locator: &Locator) -> StorefrontResult<Option<String>>;

    /// Text content of every match, in document order
    async fn all_text_contents(&self, selector: &SelectorExpr) -> StorefrontResult<Vec<String>>;

    /// Accept the next native dialog that opens, exactly once
    async fn arm_dialog_acceptance(&self) -> StorefrontResult<()>;

    /// Withdraw an armed acceptance that no dialog has used
    async fn disarm_dialog_acceptance(&self) -> StorefrontResult<()>;

    /// Take the record of the last acknowledged dialog, if any
    async fn take_dialog(&self) -> StorefrontResult<Option<Dialog>>;

    /// Capture a PNG screenshot of the viewport
    async fn screenshot(&self) -> StorefrontResult<Screenshot>;
}

/// Resolve the element index a locator targets given the match count
pub fn target_index(locator: &Locator, count: usize) -> StorefrontResult<Option<usize>> {
    locator
        .policy()
        .pick(count)
        .map_err(|count| StorefrontError::AmbiguousMatch {
            locator: locator.to_string(),
            count,
        })
}

/// Like [`target_index`], but a missing element is an error
pub fn require_target(locator: &Locator, count: usize) -> StorefrontResult<usize> {
    target_index(locator, count)?.ok_or_else(|| StorefrontError::ElementNotFound {
        locator: locator.to_string(),
    })
}

/// A shared handle to one browser surface
#[derive(Clone)]
pub struct Surface {
    id: SurfaceId,
    driver: Arc<dyn StorefrontDriver>,
}

impl Surface {
    /// Wrap a driver
    pub fn new(driver: impl StorefrontDriver + 'static) -> Self {
        Self::from_arc(Arc::new(driver))
    }

    /// Wrap an already shared driver
    #[must_use]
    pub fn from_arc(driver: Arc<dyn StorefrontDriver>) -> Self {
        Self {
            id: driver.surface_id(),
            driver,
        }
    }

    /// Surface identity
    #[must_use]
    pub const fn id(&self) -> SurfaceId {
        self.id
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &dyn StorefrontDriver {
        self.driver.as_ref()
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::MatchPolicy;

    mod surface_id_tests {
        use super::*;

        #[test]
        fn test_surface_ids_are_unique() {
            assert_ne!(SurfaceId::new(), SurfaceId::new());
        }

        #[test]
        fn test_display_is_compact() {
            let id = SurfaceId::new();
            assert_eq!(id.to_string().len(), 32);
        }
    }

    mod target_tests {
        use super::*;

        fn locator(policy: MatchPolicy) -> Locator {
            Locator::new("cartRow", SelectorExpr::css("#tbodyid tr")).with_policy(policy)
        }

        #[test]
        fn test_strict_ambiguity_is_an_error() {
            let err = target_index(&locator(MatchPolicy::Strict), 3).unwrap_err();
            assert!(matches!(err, StorefrontError::AmbiguousMatch { count: 3, .. }));
        }

        #[test]
        fn test_first_tolerates_duplicates() {
            assert_eq!(target_index(&locator(MatchPolicy::First), 3).unwrap(), Some(0));
        }

        #[test]
        fn test_require_target_reports_missing() {
            let err = require_target(&locator(MatchPolicy::First), 0).unwrap_err();
            assert!(matches!(err, StorefrontError::ElementNotFound { .. }));
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_driver_config_default() {
            let config = DriverConfig::default();
            assert!(config.headless);
            assert_eq!(config.viewport_width, 1920);
            assert_eq!(config.navigation_timeout, Duration::from_secs(30));
        }

        #[test]
        fn test_driver_config_builder() {
            let config = DriverConfig::new()
                .headless(false)
                .viewport(1280, 720)
                .navigation_timeout(Duration::from_secs(5))
                .executable_path("/usr/bin/chromium");
            assert!(!config.headless);
            assert_eq!(config.viewport_height, 720);
            assert_eq!(config.executable_path.as_deref(), Some("/usr/bin/chromium"));
        }
    }

    mod screenshot_tests {
        use super::*;

        #[test]
        fn test_screenshot_validity() {
            assert!(Screenshot::new(vec![0x89, b'P', b'N', b'G']).is_valid());
            assert!(!Screenshot::new(Vec::new()).is_valid());
        }
    }
}
