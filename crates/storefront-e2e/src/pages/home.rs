//! Home page: navbar, categories and the product grid.

use crate::assertion::SoftAssertions;
use crate::config::SuiteConfig;
use crate::driver::Surface;
use crate::fixtures::Category;
use crate::pages::common::{Navigation, PageBase, PageObject};
use crate::registry::{DynamicKey, LocatorKey, PageFamily};
use crate::result::StorefrontResult;
use crate::step::step;

/// Storefront home page
#[derive(Debug, Clone)]
pub struct HomePage {
    base: PageBase,
}

impl PageObject for HomePage {
    fn base(&self) -> &PageBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PageBase {
        &mut self.base
    }

    fn url_pattern(&self) -> &'static str {
        "index.html"
    }
}

const fn category_key(category: Category) -> LocatorKey {
    match category {
        Category::Phones => LocatorKey::CategoryPhones,
        Category::Laptops => LocatorKey::CategoryLaptops,
        Category::Monitors => LocatorKey::CategoryMonitors,
    }
}

impl HomePage {
    #[must_use]
    pub fn new(surface: &Surface, config: &SuiteConfig) -> Self {
        Self {
            base: PageBase::new(PageFamily::Home, surface, config),
        }
    }

    #[must_use]
    pub const fn from_base(base: PageBase) -> Self {
        Self { base }
    }

    /// Open the base URL and wait for the product grid
    pub async fn open(&self) -> StorefrontResult<()> {
        self.base
            .navigate_and_settle(Navigation::Goto(self.base.base_url()), LocatorKey::ProductList)
            .await
    }

    /// Filter the grid by category
    pub async fn select_category(&self, category: Category) -> StorefrontResult<()> {
        step(&format!("Select category {category}"), async {
            self.base.click(category_key(category)).await?;
            self.base.wait_visible(LocatorKey::ProductList, None).await?;
            Ok(())
        })
        .await
    }

    /// Open a product's detail page by name.
    ///
    /// Waits for the card, clicks it, then waits for the detail page's
    /// add-to-cart control.
    pub async fn select_product(&self, name: &str) -> StorefrontResult<()> {
        step(&format!("Select product {name}"), async {
            let card = self.base.dynamic(DynamicKey::ProductCard, name)?;
            self.base
                .waiter()
                .wait_visible(&card, Some(self.base.navigation_timeout()))
                .await?;
            self.base.click_locator(&card).await?;
            self.base.wait_dom_loaded().await?;
            self.base
                .wait_visible(LocatorKey::AddToCartButton, Some(self.base.navigation_timeout()))
                .await?;
            Ok(())
        })
        .await
    }

    /// Names on the product grid
    pub async fn product_names(&self) -> StorefrontResult<Vec<String>> {
        self.base.wait_visible(LocatorKey::ProductList, None).await?;
        Ok(self
            .base
            .all_texts(LocatorKey::ProductList)
            .await?
            .into_iter()
            .map(|name| name.trim().to_string())
            .collect())
    }

    /// Go to the cart and wait for it to settle
    pub async fn navigate_to_cart(&self) -> StorefrontResult<()> {
        step("Navigate to cart", async {
            self.base
                .navigate_and_settle(Navigation::Click(LocatorKey::NavbarCart), LocatorKey::PlaceOrderButton)
                .await?;
            self.base.wait_network_idle().await?;
            Ok(())
        })
        .await
    }

    /// Go to the home page and wait for the product grid
    pub async fn navigate_to_home(&self) -> StorefrontResult<()> {
        step("Navigate to home", async {
            self.base
                .navigate_and_settle(Navigation::Click(LocatorKey::NavbarHome), LocatorKey::ProductList)
                .await
        })
        .await
    }

    /// Log out and wait for the login link
    pub async fn logout(&self) -> StorefrontResult<()> {
        step("Logout", async {
            self.base.click(LocatorKey::NavbarLogout).await?;
            self.base.wait_visible(LocatorKey::NavbarLogin, None).await?;
            Ok(())
        })
        .await
    }

    /// Soft check of the welcome banner text
    pub async fn verify_welcome_message(
        &self,
        username: &str,
        soft: &mut SoftAssertions,
    ) -> StorefrontResult<()> {
        if self
            .base
            .expect_visible(LocatorKey::WelcomeMessage, soft, "welcome banner visible")
            .await?
        {
            let text = self.base.text(LocatorKey::WelcomeMessage).await?;
            soft.assert_eq(
                &text.trim().to_string(),
                &format!("Welcome {username}"),
                "welcome banner",
            );
        }
        Ok(())
    }
}
