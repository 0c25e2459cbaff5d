//! Workflow orchestration.
//!
//! A [`PageBundle`] holds one page object per family, all bound to the same
//! surface. [`authenticated_session`] is the setup every logged-in scenario
//! starts from; [`reset_cart`] is the empty-cart precondition.

use std::time::Duration;

use crate::config::SuiteConfig;
use crate::driver::Surface;
use crate::fixtures::{Category, CheckoutInfo, Credentials};
use crate::pages::{
    CartPage, CheckoutPage, ClearCartReport, HomePage, LoginPage, PageObject, ProductDetailPage,
    DEFAULT_CLEAR_TIMEOUT,
};
use crate::registry::LocatorKey;
use crate::result::{StorefrontError, StorefrontResult};

/// One page object per family, all on one surface
#[derive(Debug, Clone)]
pub struct PageBundle {
    /// Login modal
    pub login: LoginPage,
    /// Home page
    pub home: HomePage,
    /// Product detail page
    pub product_detail: ProductDetailPage,
    /// Cart page
    pub cart: CartPage,
    /// Order form and confirmation
    pub checkout: CheckoutPage,
    surface: Surface,
    clear_timeout: Duration,
}

impl PageBundle {
    /// Bind every page to `surface`
    #[must_use]
    pub fn new(surface: &Surface, config: &SuiteConfig) -> Self {
        Self {
            login: LoginPage::new(surface, config),
            home: HomePage::new(surface, config),
            product_detail: ProductDetailPage::new(surface, config),
            cart: CartPage::new(surface, config),
            checkout: CheckoutPage::new(surface, config),
            surface: surface.clone(),
            clear_timeout: DEFAULT_CLEAR_TIMEOUT,
        }
    }

    /// Bound for [`Self::clear_cart`]
    #[must_use]
    pub const fn with_clear_timeout(mut self, timeout: Duration) -> Self {
        self.clear_timeout = timeout;
        self
    }

    /// Move every page to another surface
    pub fn rebind(&mut self, surface: &Surface) {
        self.login.rebind(surface);
        self.home.rebind(surface);
        self.product_detail.rebind(surface);
        self.cart.rebind(surface);
        self.checkout.rebind(surface);
        self.surface = surface.clone();
    }

    /// Surface the bundle drives
    #[must_use]
    pub const fn surface(&self) -> &Surface {
        &self.surface
    }

    // =========================================================================
    // FACADE
    // =========================================================================

    /// Log in from the current page
    pub async fn login(&self, credentials: &Credentials) -> StorefrontResult<()> {
        self.login.login(credentials).await
    }

    pub async fn select_category(&self, category: Category) -> StorefrontResult<()> {
        self.home.select_category(category).await
    }

    pub async fn select_product(&self, name: &str) -> StorefrontResult<()> {
        self.home.select_product(name).await
    }

    /// Add the open product to the cart; returns the alert message
    pub async fn add_to_cart(&self) -> StorefrontResult<String> {
        self.product_detail.add_to_cart().await
    }

    /// Open `name` from the home page, add it, and come back home
    pub async fn add_product(&self, name: &str) -> StorefrontResult<String> {
        self.home.navigate_to_home().await?;
        self.home.select_product(name).await?;
        self.product_detail.add_to_cart().await
    }

    pub async fn navigate_to_cart(&self) -> StorefrontResult<()> {
        self.home.navigate_to_cart().await
    }

    pub async fn cart_items(&self) -> StorefrontResult<Vec<String>> {
        self.cart.cart_items().await
    }

    pub async fn remove_line_item(&self, name: &str) -> StorefrontResult<()> {
        self.cart.remove_line_item(name).await
    }

    pub async fn total_price(&self) -> StorefrontResult<f64> {
        self.cart.total_price().await
    }

    /// Clear the cart page currently shown
    pub async fn clear_cart(&self) -> StorefrontResult<ClearCartReport> {
        self.cart.clear_cart(self.clear_timeout).await
    }

    pub async fn place_order(&self) -> StorefrontResult<()> {
        self.cart.place_order().await
    }

    pub async fn fill_checkout_form(&self, info: &CheckoutInfo) -> StorefrontResult<()> {
        self.checkout.fill_checkout_form(info).await
    }

    pub async fn submit_purchase(&self) -> StorefrontResult<()> {
        self.checkout.submit_purchase().await
    }

    pub async fn order_id(&self) -> StorefrontResult<String> {
        self.checkout.order_id().await
    }

    pub async fn order_amount(&self) -> StorefrontResult<u64> {
        self.checkout.order_amount().await
    }

    pub async fn logout(&self) -> StorefrontResult<()> {
        self.home.logout().await
    }
}

/// Open the storefront, log in and return pages bound to `surface`.
///
/// Every failure is reported as [`StorefrontError::SetupFailed`] naming the
/// stage that broke.
pub async fn authenticated_session(
    surface: &Surface,
    config: &SuiteConfig,
    credentials: &Credentials,
) -> StorefrontResult<PageBundle> {
    let bundle = PageBundle::new(surface, config);
    let base = bundle.home.base();

    tracing::info!(surface = %surface.id(), user = %credentials.username, "starting session");
    base.goto_base()
        .await
        .map_err(|e| StorefrontError::setup("open storefront", e))?;
    base.wait_dom_loaded()
        .await
        .map_err(|e| StorefrontError::setup("wait for page load", e))?;
    bundle
        .login
        .login(credentials)
        .await
        .map_err(|e| StorefrontError::setup("login", e))?;
    base.wait_visible(LocatorKey::WelcomeMessage, None)
        .await
        .map_err(|e| StorefrontError::setup("wait for welcome banner", e))?;
    Ok(bundle)
}

/// Start from an empty cart on the home page
pub async fn reset_cart(bundle: &PageBundle) -> StorefrontResult<ClearCartReport> {
    bundle.home.base().goto_base().await?;
    bundle.home.base().wait_dom_loaded().await?;
    bundle.home.navigate_to_cart().await?;
    let report = bundle.clear_cart().await?;
    bundle.home.navigate_to_home().await?;
    Ok(report)
}
