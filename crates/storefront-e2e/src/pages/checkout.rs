//! Order form and purchase confirmation.

use crate::assertion::SoftAssertions;
use crate::config::SuiteConfig;
use crate::driver::Surface;
use crate::extract::{or_sentinel, parse_order_amount, parse_order_id};
use crate::fixtures::CheckoutInfo;
use crate::pages::common::{PageBase, PageObject};
use crate::registry::{LocatorKey, PageFamily};
use crate::result::StorefrontResult;
use crate::step::step;

/// Heading of a successful purchase
pub const PURCHASE_CONFIRMED: &str = "Thank you for your purchase!";

/// Order modal opened from the cart, and the confirmation that follows it
#[derive(Debug, Clone)]
pub struct CheckoutPage {
    base: PageBase,
}

impl PageObject for CheckoutPage {
    fn base(&self) -> &PageBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PageBase {
        &mut self.base
    }

    fn url_pattern(&self) -> &'static str {
        "cart.html"
    }
}

impl CheckoutPage {
    #[must_use]
    pub fn new(surface: &Surface, config: &SuiteConfig) -> Self {
        Self {
            base: PageBase::new(PageFamily::Checkout, surface, config),
        }
    }

    #[must_use]
    pub const fn from_base(base: PageBase) -> Self {
        Self { base }
    }

    /// Fill every field of the order form
    pub async fn fill_checkout_form(&self, info: &CheckoutInfo) -> StorefrontResult<()> {
        info.validate()?;
        step("Fill checkout form", async {
            self.base.wait_visible(LocatorKey::CheckoutModal, None).await?;
            let fields = [
                (LocatorKey::NameInput, &info.name),
                (LocatorKey::CountryInput, &info.country),
                (LocatorKey::CityInput, &info.city),
                (LocatorKey::CreditCardInput, &info.credit_card),
                (LocatorKey::MonthInput, &info.month),
                (LocatorKey::YearInput, &info.year),
            ];
            for (key, value) in fields {
                self.base.fill(key, value).await?;
            }
            Ok(())
        })
        .await
    }

    /// Submit the form and wait for the confirmation
    pub async fn submit_purchase(&self) -> StorefrontResult<()> {
        step("Submit purchase", async {
            self.base.click(LocatorKey::PurchaseButton).await?;
            self.base.wait_visible(LocatorKey::ConfirmationModal, None).await?;
            Ok(())
        })
        .await
    }

    /// Close the order form without buying
    pub async fn close_checkout(&self) -> StorefrontResult<()> {
        self.base.click(LocatorKey::CloseCheckoutButton).await?;
        self.base.wait_hidden(LocatorKey::CheckoutModal, None).await?;
        Ok(())
    }

    /// Confirmation heading
    pub async fn confirmation_message(&self) -> StorefrontResult<String> {
        Ok(self
            .base
            .text(LocatorKey::ConfirmationMessage)
            .await?
            .trim()
            .to_string())
    }

    /// Raw confirmation details
    pub async fn order_details(&self) -> StorefrontResult<String> {
        self.base.text(LocatorKey::OrderDetails).await
    }

    /// Order id from the confirmation, empty when absent
    pub async fn order_id(&self) -> StorefrontResult<String> {
        let details = self.order_details().await?;
        Ok(or_sentinel(parse_order_id(&details)))
    }

    /// Charged amount from the confirmation, `0` when absent
    pub async fn order_amount(&self) -> StorefrontResult<u64> {
        let details = self.order_details().await?;
        Ok(or_sentinel(parse_order_amount(&details)))
    }

    /// Dismiss the confirmation and wait for the home page
    pub async fn acknowledge_confirmation(&self) -> StorefrontResult<()> {
        step("Acknowledge confirmation", async {
            self.base.click(LocatorKey::ConfirmOkButton).await?;
            self.base.wait_hidden(LocatorKey::ConfirmationModal, None).await?;
            self.base
                .wait_visible(LocatorKey::ProductList, Some(self.base.navigation_timeout()))
                .await?;
            Ok(())
        })
        .await
    }

    /// Fill, submit, read the order id and amount, then acknowledge
    pub async fn complete_checkout(&self, info: &CheckoutInfo) -> StorefrontResult<(String, u64)> {
        self.fill_checkout_form(info).await?;
        self.submit_purchase().await?;
        let id = self.order_id().await?;
        let amount = self.order_amount().await?;
        tracing::info!(order_id = %id, amount, "order placed");
        self.acknowledge_confirmation().await?;
        Ok((id, amount))
    }

    /// Soft check of the confirmation heading
    pub async fn verify_confirmation_message(&self, soft: &mut SoftAssertions) -> StorefrontResult<()> {
        let message = self.confirmation_message().await?;
        soft.assert_eq(&message.as_str(), &PURCHASE_CONFIRMED, "confirmation message");
        Ok(())
    }

    /// Soft check that the confirmation carries an id and a positive amount.
    ///
    /// Returns the id and amount as read, sentinels included.
    pub async fn verify_order_confirmation(
        &self,
        soft: &mut SoftAssertions,
    ) -> StorefrontResult<(String, u64)> {
        let details = self.order_details().await?;
        let id = match parse_order_id(&details) {
            Ok(id) => id,
            Err(mismatch) => {
                soft.record_mismatch(&mismatch);
                String::new()
            }
        };
        let amount = match parse_order_amount(&details) {
            Ok(amount) => {
                soft.assert_true(amount > 0, "order amount is positive");
                amount
            }
            Err(mismatch) => {
                soft.record_mismatch(&mismatch);
                0
            }
        };
        Ok((id, amount))
    }
}
