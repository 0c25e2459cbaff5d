//! Shared page plumbing.
//!
//! [`PageBase`] owns the surface, the family registry bound to it, and a
//! [`Waiter`]. Every action waits for its target first, so page objects never
//! sleep for a fixed interval.

use std::time::Duration;

use crate::assertion::SoftAssertions;
use crate::config::SuiteConfig;
use crate::driver::Surface;
use crate::locator::Locator;
use crate::registry::{DynamicKey, LocatorKey, LocatorRegistry, PageFamily};
use crate::result::{StorefrontError, StorefrontResult};
use crate::wait::{CountPredicate, LoadState, Poll, WaitOptions, WaitResult, Waiter};

/// Trait implemented by every page object.
pub trait PageObject {
    /// Shared plumbing
    fn base(&self) -> &PageBase;

    /// Mutable shared plumbing
    fn base_mut(&mut self) -> &mut PageBase;

    /// URL fragment identifying the page (e.g. "cart.html")
    fn url_pattern(&self) -> &'static str {
        ""
    }

    /// Page family name for logging
    fn page_name(&self) -> &'static str {
        self.base().family().name()
    }

    /// Rebind to another surface
    fn rebind(&mut self, surface: &Surface) {
        self.base_mut().rebind(surface);
    }
}

/// Surface, registry and waiter shared by every page object
#[derive(Debug, Clone)]
pub struct PageBase {
    surface: Surface,
    registry: LocatorRegistry,
    waiter: Waiter,
    base_url: String,
    navigation_timeout: Duration,
}

impl PageBase {
    /// Bind the `family` registry to `surface` using the configured dialect
    #[must_use]
    pub fn new(family: PageFamily, surface: &Surface, config: &SuiteConfig) -> Self {
        let registry = LocatorRegistry::bind(family, config.dialect, surface.id());
        Self::with_registry(registry, surface, config)
    }

    /// Use a prebuilt registry.
    ///
    /// The registry is checked against the surface on every resolution, so a
    /// registry bound elsewhere fails with [`StorefrontError::StaleSurface`].
    #[must_use]
    pub fn with_registry(registry: LocatorRegistry, surface: &Surface, config: &SuiteConfig) -> Self {
        Self {
            surface: surface.clone(),
            registry,
            waiter: Waiter::new(surface.clone(), config.wait_options()),
            base_url: config.base_url.clone(),
            navigation_timeout: config.navigation_timeout(),
        }
    }

    /// Move to another surface, rebuilding the registry when the id changes
    pub fn rebind(&mut self, surface: &Surface) {
        if self.registry.surface_id() != surface.id() {
            tracing::debug!(
                family = self.registry.family().name(),
                from = %self.registry.surface_id(),
                to = %surface.id(),
                "rebinding page"
            );
            self.registry = self.registry.rebound(surface.id());
        }
        self.waiter = Waiter::new(surface.clone(), self.waiter.options());
        self.surface = surface.clone();
    }

    /// Page family
    #[must_use]
    pub const fn family(&self) -> PageFamily {
        self.registry.family()
    }

    /// Surface the page drives
    #[must_use]
    pub const fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Bound registry
    #[must_use]
    pub const fn registry(&self) -> &LocatorRegistry {
        &self.registry
    }

    /// Wait defaults
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        self.waiter.options()
    }

    /// Timeout for navigation settles
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        self.navigation_timeout
    }

    /// Waiter on this page's surface
    #[must_use]
    pub const fn waiter(&self) -> &Waiter {
        &self.waiter
    }

    fn check_surface(&self) -> StorefrontResult<()> {
        if self.registry.surface_id() == self.surface.id() {
            Ok(())
        } else {
            Err(StorefrontError::StaleSurface {
                family: self.registry.family().name(),
                bound: self.registry.surface_id().to_string(),
                active: self.surface.id().to_string(),
            })
        }
    }

    /// Resolve a static key
    pub fn locator(&self, key: LocatorKey) -> StorefrontResult<Locator> {
        self.check_surface()?;
        self.registry.resolve(key)
    }

    /// Resolve a parameterized key
    pub fn dynamic(&self, key: DynamicKey, param: &str) -> StorefrontResult<Locator> {
        self.check_surface()?;
        self.registry.resolve_with(key, param)
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Wait for the element to be visible, then click it
    pub async fn click(&self, key: LocatorKey) -> StorefrontResult<()> {
        let locator = self.locator(key)?;
        self.click_locator(&locator).await
    }

    /// Wait for the element to be visible, then click it
    pub async fn click_locator(&self, locator: &Locator) -> StorefrontResult<()> {
        self.waiter.wait_visible(locator, None).await?;
        tracing::debug!(%locator, "click");
        self.surface.driver().click(locator).await
    }

    /// Wait for the input to be visible, then replace its value
    pub async fn fill(&self, key: LocatorKey, value: &str) -> StorefrontResult<()> {
        let locator = self.locator(key)?;
        self.waiter.wait_visible(&locator, None).await?;
        tracing::debug!(%locator, "fill");
        self.surface.driver().fill(&locator, value).await
    }

    /// Text of the element, waiting until it is attached
    pub async fn text(&self, key: LocatorKey) -> StorefrontResult<String> {
        let locator = self.locator(key)?;
        self.text_of(&locator).await
    }

    /// Text of the element, waiting until it is attached
    pub async fn text_of(&self, locator: &Locator) -> StorefrontResult<String> {
        let driver = self.surface.driver();
        self.waiter
            .poll_until(format!("{locator} to be attached"), None, || async move {
                Ok(match driver.text_content(locator).await? {
                    Some(text) => Poll::Ready(text),
                    None => Poll::Pending("detached".to_string()),
                })
            })
            .await
            .map(|(text, _)| text)
    }

    /// Text of every match
    pub async fn all_texts(&self, key: LocatorKey) -> StorefrontResult<Vec<String>> {
        let locator = self.locator(key)?;
        self.surface.driver().all_text_contents(locator.selector()).await
    }

    /// Current number of matches
    pub async fn count(&self, key: LocatorKey) -> StorefrontResult<usize> {
        let locator = self.locator(key)?;
        self.surface.driver().count(locator.selector()).await
    }

    /// Whether the element is visible right now
    pub async fn is_visible(&self, key: LocatorKey) -> StorefrontResult<bool> {
        let locator = self.locator(key)?;
        self.surface.driver().is_visible(&locator).await
    }

    // =========================================================================
    // WAITS
    // =========================================================================

    /// Wait until the element is visible
    pub async fn wait_visible(
        &self,
        key: LocatorKey,
        timeout: Option<Duration>,
    ) -> StorefrontResult<WaitResult> {
        let locator = self.locator(key)?;
        self.waiter.wait_visible(&locator, timeout).await
    }

    /// Wait until the element is hidden or detached
    pub async fn wait_hidden(
        &self,
        key: LocatorKey,
        timeout: Option<Duration>,
    ) -> StorefrontResult<WaitResult> {
        let locator = self.locator(key)?;
        self.waiter.wait_hidden(&locator, timeout).await
    }

    /// Wait until the number of matches satisfies `predicate`
    pub async fn wait_count(
        &self,
        key: LocatorKey,
        predicate: CountPredicate,
        timeout: Option<Duration>,
    ) -> StorefrontResult<usize> {
        let locator = self.locator(key)?;
        self.waiter.wait_count(&locator, predicate, timeout).await
    }

    /// Wait for DOM content loaded, bounded by the navigation timeout
    pub async fn wait_dom_loaded(&self) -> StorefrontResult<WaitResult> {
        self.waiter
            .wait_load_state(LoadState::DomContentLoaded, Some(self.navigation_timeout))
            .await
    }

    /// Wait for network idle, bounded by the navigation timeout
    pub async fn wait_network_idle(&self) -> StorefrontResult<WaitResult> {
        self.waiter
            .wait_load_state(LoadState::NetworkIdle, Some(self.navigation_timeout))
            .await
    }

    /// Navigate and settle: DOM loaded, then `marker` visible
    pub async fn navigate_and_settle(&self, action: Navigation<'_>, marker: LocatorKey) -> StorefrontResult<()> {
        match action {
            Navigation::Goto(url) => self.surface.driver().goto(url).await?,
            Navigation::Click(key) => self.click(key).await?,
            Navigation::Back => self.surface.driver().go_back().await?,
        }
        self.wait_dom_loaded().await?;
        self.wait_visible(marker, Some(self.navigation_timeout)).await?;
        Ok(())
    }

    /// Open the configured base URL
    pub async fn goto_base(&self) -> StorefrontResult<()> {
        tracing::info!(url = %self.base_url, "opening storefront");
        self.surface.driver().goto(&self.base_url).await
    }

    /// Configured base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =========================================================================
    // SOFT CHECKS
    // =========================================================================

    /// Soft check that the element becomes visible.
    ///
    /// A timeout is recorded as a failure; other errors propagate.
    pub async fn expect_visible(
        &self,
        key: LocatorKey,
        soft: &mut SoftAssertions,
        message: &str,
    ) -> StorefrontResult<bool> {
        soften(self.wait_visible(key, None).await, soft, message)
    }

    /// Soft check that the element becomes hidden
    pub async fn expect_hidden(
        &self,
        key: LocatorKey,
        soft: &mut SoftAssertions,
        message: &str,
    ) -> StorefrontResult<bool> {
        soften(self.wait_hidden(key, None).await, soft, message)
    }
}

/// How a navigation is triggered
#[derive(Debug, Clone, Copy)]
pub enum Navigation<'a> {
    /// Load a URL
    Goto(&'a str),
    /// Click a link
    Click(LocatorKey),
    /// History back
    Back,
}

/// Turn a wait timeout into a soft failure
pub(crate) fn soften<T>(
    result: StorefrontResult<T>,
    soft: &mut SoftAssertions,
    message: &str,
) -> StorefrontResult<bool> {
    match result {
        Ok(_) => {
            soft.assert_true(true, message);
            Ok(true)
        }
        Err(err @ StorefrontError::WaitTimeout { .. }) => {
            soft.fail(format!("{message}: {err}"));
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::SelectorDialect;
    use crate::mock::MockStorefront;

    fn fast_config() -> SuiteConfig {
        SuiteConfig::default()
            .with_timeout_ms(200)
            .with_poll_interval_ms(5)
            .with_navigation_timeout_ms(200)
    }

    mod resolution_tests {
        use super::*;

        #[test]
        fn test_page_resolves_common_keys() {
            let surface = Surface::new(MockStorefront::new());
            let page = PageBase::new(PageFamily::Cart, &surface, &fast_config());
            assert!(page.locator(LocatorKey::NavbarHome).is_ok());
            assert!(page.locator(LocatorKey::CartRow).is_ok());
            assert!(matches!(
                page.locator(LocatorKey::UsernameInput),
                Err(StorefrontError::LocatorResolution { family: "cart", .. })
            ));
        }

        #[test]
        fn test_foreign_registry_is_stale() {
            let surface = Surface::new(MockStorefront::new());
            let other = Surface::new(MockStorefront::new());
            let registry =
                LocatorRegistry::bind(PageFamily::Home, SelectorDialect::Short, other.id());
            let page = PageBase::with_registry(registry, &surface, &fast_config());
            assert!(matches!(
                page.locator(LocatorKey::NavbarCart),
                Err(StorefrontError::StaleSurface { family: "home", .. })
            ));
        }

        #[test]
        fn test_rebind_clears_staleness() {
            let surface = Surface::new(MockStorefront::new());
            let other = Surface::new(MockStorefront::new());
            let mut page = PageBase::new(PageFamily::Home, &surface, &fast_config());
            page.rebind(&other);
            assert_eq!(page.registry().surface_id(), other.id());
            assert!(page.locator(LocatorKey::NavbarCart).is_ok());
        }
    }

    mod action_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_waits_for_visibility() {
            let surface = Surface::new(MockStorefront::new());
            let page = PageBase::new(PageFamily::Login, &surface, &fast_config());
            let err = page.click(LocatorKey::LoginButton).await.unwrap_err();
            assert!(matches!(err, StorefrontError::WaitTimeout { .. }));
        }

        #[tokio::test]
        async fn test_navigate_and_settle() {
            let surface = Surface::new(MockStorefront::new());
            let page = PageBase::new(PageFamily::Home, &surface, &fast_config());
            page.navigate_and_settle(Navigation::Goto(page.base_url()), LocatorKey::ProductList)
                .await
                .unwrap();
            page.navigate_and_settle(Navigation::Click(LocatorKey::NavbarCart), LocatorKey::PlaceOrderButton)
                .await
                .unwrap();
            assert!(page.is_visible(LocatorKey::PlaceOrderButton).await.unwrap());
        }

        #[tokio::test]
        async fn test_expect_visible_softens_timeouts_only() {
            let surface = Surface::new(MockStorefront::new());
            let page = PageBase::new(PageFamily::Home, &surface, &fast_config());
            let mut soft = SoftAssertions::new();
            let seen = page
                .expect_visible(LocatorKey::WelcomeMessage, &mut soft, "welcome banner")
                .await
                .unwrap();
            assert!(!seen);
            assert_eq!(soft.failure_count(), 1);
        }
    }
}
