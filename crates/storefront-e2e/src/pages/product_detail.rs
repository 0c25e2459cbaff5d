//! Product detail page.

use crate::assertion::SoftAssertions;
use crate::config::SuiteConfig;
use crate::driver::Surface;
use crate::extract::{or_sentinel, parse_price};
use crate::pages::common::{Navigation, PageBase, PageObject};
use crate::registry::{LocatorKey, PageFamily};
use crate::result::StorefrontResult;
use crate::step::step;
use crate::wait::Poll;

/// Detail page of a single product
#[derive(Debug, Clone)]
pub struct ProductDetailPage {
    base: PageBase,
}

impl PageObject for ProductDetailPage {
    fn base(&self) -> &PageBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PageBase {
        &mut self.base
    }

    fn url_pattern(&self) -> &'static str {
        "prod.html"
    }
}

impl ProductDetailPage {
    #[must_use]
    pub fn new(surface: &Surface, config: &SuiteConfig) -> Self {
        Self {
            base: PageBase::new(PageFamily::ProductDetail, surface, config),
        }
    }

    #[must_use]
    pub const fn from_base(base: PageBase) -> Self {
        Self { base }
    }

    /// Add the product to the cart.
    ///
    /// Arms a one-shot acceptance for the confirmation alert before clicking
    /// and returns once the alert has been acknowledged, with its message.
    /// The acceptance is withdrawn if the click or the wait fails.
    pub async fn add_to_cart(&self) -> StorefrontResult<String> {
        step("Add product to cart", async {
            let driver = self.base.surface().driver();
            driver.arm_dialog_acceptance().await?;
            let acknowledged = async {
                self.base.click(LocatorKey::AddToCartButton).await?;
                self.base
                    .waiter()
                    .poll_until("add-to-cart alert to be acknowledged", None, || async move {
                        Ok(match driver.take_dialog().await? {
                            Some(dialog) => Poll::Ready(dialog),
                            None => Poll::Pending("no dialog yet".to_string()),
                        })
                    })
                    .await
            }
            .await;
            if acknowledged.is_err() {
                driver.disarm_dialog_acceptance().await?;
            }
            let (dialog, _) = acknowledged?;
            tracing::info!(message = dialog.message(), "add-to-cart acknowledged");
            Ok(dialog.message().to_string())
        })
        .await
    }

    /// Product heading
    pub async fn product_name(&self) -> StorefrontResult<String> {
        Ok(self.base.text(LocatorKey::ProductName).await?.trim().to_string())
    }

    /// Displayed price, `0.0` when the text cannot be parsed
    pub async fn product_price(&self) -> StorefrontResult<f64> {
        let text = self.base.text(LocatorKey::ProductPrice).await?;
        Ok(or_sentinel(parse_price(&text)))
    }

    /// Product description text
    pub async fn product_description(&self) -> StorefrontResult<String> {
        Ok(self
            .base
            .text(LocatorKey::ProductDescription)
            .await?
            .trim()
            .to_string())
    }

    /// Soft check of the heading
    pub async fn verify_product_name(
        &self,
        expected: &str,
        soft: &mut SoftAssertions,
    ) -> StorefrontResult<()> {
        let name = self.product_name().await?;
        soft.assert_eq(&name.as_str(), &expected, "product name");
        Ok(())
    }

    /// Soft check of the price; unparsable text is recorded as a failure
    pub async fn verify_product_price(
        &self,
        expected: f64,
        soft: &mut SoftAssertions,
    ) -> StorefrontResult<()> {
        let text = self.base.text(LocatorKey::ProductPrice).await?;
        match parse_price(&text) {
            Ok(price) => soft.assert_amount(price, expected, "product price"),
            Err(mismatch) => soft.record_mismatch(&mismatch),
        }
        Ok(())
    }

    /// History back to the product grid
    pub async fn navigate_back(&self) -> StorefrontResult<()> {
        step("Navigate back", async {
            self.base
                .navigate_and_settle(Navigation::Back, LocatorKey::NavbarHome)
                .await
        })
        .await
    }
}
