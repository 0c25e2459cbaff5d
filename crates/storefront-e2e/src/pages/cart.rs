//! Cart page and the cart-clearing convergence loop.
//!
//! Line items and the total are always read from the page. The total shown
//! by the storefront is authoritative; it is never recomputed from rows.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::assertion::SoftAssertions;
use crate::config::SuiteConfig;
use crate::driver::Surface;
use crate::extract::{or_sentinel, parse_price};
use crate::locator::Locator;
use crate::pages::common::{soften, PageBase, PageObject};
use crate::registry::{DynamicKey, LocatorKey, PageFamily};
use crate::result::{StorefrontError, StorefrontResult};
use crate::step::step;
use crate::wait::{CountPredicate, Poll};

/// Default bound for [`CartPage::clear_cart`]
pub const DEFAULT_CLEAR_TIMEOUT: Duration = Duration::from_secs(30);

/// One row of the cart as rendered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    /// Product name cell
    pub name: String,
    /// Price cell, `0.0` when unparsable
    pub unit_price: f64,
}

/// Outcome of a successful [`CartPage::clear_cart`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearCartReport {
    /// Rows present when clearing started
    pub initial_count: usize,
    /// Delete controls clicked
    pub removals: usize,
    /// Wall-clock time spent
    pub elapsed: Duration,
}

/// The cart page
#[derive(Debug, Clone)]
pub struct CartPage {
    base: PageBase,
}

impl PageObject for CartPage {
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

impl CartPage {
    #[must_use]
    pub fn new(surface: &Surface, config: &SuiteConfig) -> Self {
        Self {
            base: PageBase::new(PageFamily::Cart, surface, config),
        }
    }

    #[must_use]
    pub const fn from_base(base: PageBase) -> Self {
        Self { base }
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Product names in row order
    pub async fn cart_items(&self) -> StorefrontResult<Vec<String>> {
        Ok(self
            .base
            .all_texts(LocatorKey::CartRowName)
            .await?
            .into_iter()
            .map(|name| name.trim().to_string())
            .collect())
    }

    /// Name and price of every row.
    ///
    /// Names and prices are read separately, so both are re-read until they
    /// describe the same number of rows.
    pub async fn line_items(&self) -> StorefrontResult<Vec<LineItem>> {
        self.base
            .waiter()
            .poll_until("cart names and prices to line up", None, || async move {
                let names = self.cart_items().await?;
                let prices = self.base.all_texts(LocatorKey::CartRowPrice).await?;
                if names.len() != prices.len() {
                    return Ok(Poll::Pending(format!(
                        "{} names, {} prices",
                        names.len(),
                        prices.len()
                    )));
                }
                Ok(Poll::Ready(
                    names
                        .into_iter()
                        .zip(prices)
                        .map(|(name, price)| LineItem {
                            name,
                            unit_price: or_sentinel(parse_price(&price)),
                        })
                        .collect::<Vec<_>>(),
                ))
            })
            .await
            .map(|(items, _)| items)
    }

    /// Number of rows
    pub async fn item_count(&self) -> StorefrontResult<usize> {
        self.base.count(LocatorKey::CartRow).await
    }

    /// Total shown on the page, `0.0` when empty or unparsable
    pub async fn total_price(&self) -> StorefrontResult<f64> {
        let locator = self.base.locator(LocatorKey::TotalPrice)?;
        let text = self
            .base
            .surface()
            .driver()
            .text_content(&locator)
            .await?
            .unwrap_or_default();
        Ok(or_sentinel(parse_price(&text)))
    }

    /// Price cell of the first row naming `name`
    pub async fn product_price(&self, name: &str) -> StorefrontResult<f64> {
        let locator = self.base.dynamic(DynamicKey::CartProductPrice, name)?;
        let text = self.base.text_of(&locator).await?;
        Ok(or_sentinel(parse_price(&text)))
    }

    // =========================================================================
    // REMOVAL
    // =========================================================================

    /// Delete the first row naming `name` and wait for the table to shrink
    pub async fn remove_line_item(&self, name: &str) -> StorefrontResult<()> {
        step(&format!("Remove {name} from cart"), async {
            let delete = self.base.dynamic(DynamicKey::CartDeleteButtonFor, name)?;
            self.remove_with(&delete).await
        })
        .await
    }

    /// Delete the first row and wait for the table to shrink
    pub async fn remove_first_line_item(&self) -> StorefrontResult<()> {
        let delete = self.base.locator(LocatorKey::CartDeleteButton)?;
        self.remove_with(&delete).await
    }

    async fn remove_with(&self, delete: &Locator) -> StorefrontResult<()> {
        let before = self.item_count().await?;
        self.base.click_locator(delete).await?;
        self.base
            .wait_count(
                LocatorKey::CartRow,
                CountPredicate::Exactly(before.saturating_sub(1)),
                None,
            )
            .await?;
        Ok(())
    }

    /// Remove rows until none remain.
    ///
    /// Each round counts the delete controls, clicks the first one and waits
    /// for the count to drop by one. Rows added while clearing are picked up
    /// by the next round. A round that never sees the drop within what is
    /// left of `timeout` ends with [`StorefrontError::ConvergenceTimeout`].
    pub async fn clear_cart(&self, timeout: Duration) -> StorefrontResult<ClearCartReport> {
        step("Clear cart", async {
            let delete = self.base.locator(LocatorKey::CartDeleteButton)?;
            let driver = self.base.surface().driver();
            let start = Instant::now();
            let mut removals = 0;
            let mut initial_count = None;

            loop {
                let before = driver.count(delete.selector()).await?;
                let initial = *initial_count.get_or_insert(before);
                if before == 0 {
                    let report = ClearCartReport {
                        initial_count: initial,
                        removals,
                        elapsed: start.elapsed(),
                    };
                    tracing::info!(
                        initial_count = report.initial_count,
                        removals = report.removals,
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        "cart cleared"
                    );
                    return Ok(report);
                }

                let remaining = timeout.saturating_sub(start.elapsed());
                if remaining.is_zero() {
                    return Err(convergence_timeout(before, start, removals));
                }

                tracing::debug!(rows = before, "deleting first row");
                driver.click(&delete).await?;
                removals += 1;

                let observed = AtomicUsize::new(before);
                let shrunk = self
                    .base
                    .waiter()
                    .poll_until(
                        format!("{delete} count to be {}", before - 1),
                        Some(remaining),
                        || {
                            let (observed, delete) = (&observed, &delete);
                            async move {
                                let count = driver.count(delete.selector()).await?;
                                observed.store(count, Ordering::Relaxed);
                                Ok(if count == before - 1 {
                                    Poll::Ready(())
                                } else {
                                    Poll::Pending(format!("{count} element(s)"))
                                })
                            }
                        },
                    )
                    .await;
                match shrunk {
                    Ok(_) => {}
                    Err(StorefrontError::WaitTimeout { .. }) => {
                        let last = observed.load(Ordering::Relaxed);
                        return Err(convergence_timeout(last, start, removals));
                    }
                    Err(err) => return Err(err),
                }
            }
        })
        .await
    }

    // =========================================================================
    // CHECKOUT
    // =========================================================================

    /// Open the order form
    pub async fn place_order(&self) -> StorefrontResult<()> {
        step("Place order", async {
            self.base.click(LocatorKey::PlaceOrderButton).await?;
            self.base.wait_visible(LocatorKey::CheckoutModal, None).await?;
            Ok(())
        })
        .await
    }

    // =========================================================================
    // VERIFICATION
    // =========================================================================

    /// Soft check that a row names `name`
    pub async fn verify_product_in_cart(
        &self,
        name: &str,
        soft: &mut SoftAssertions,
    ) -> StorefrontResult<()> {
        let locator = self.base.dynamic(DynamicKey::CartProductName, name)?;
        let visible = self.base.waiter().wait_visible(&locator, None).await;
        soften(visible, soft, &format!("{name} in cart")).map(|_| ())
    }

    /// Soft check of the price cell of `name`
    pub async fn verify_product_price(
        &self,
        name: &str,
        expected: f64,
        soft: &mut SoftAssertions,
    ) -> StorefrontResult<()> {
        let locator = self.base.dynamic(DynamicKey::CartProductPrice, name)?;
        let text = self.base.text_of(&locator).await?;
        match parse_price(&text) {
            Ok(price) => soft.assert_amount(price, expected, &format!("price of {name}")),
            Err(mismatch) => soft.record_mismatch(&mismatch),
        }
        Ok(())
    }

    /// Soft check of the total shown on the page
    pub async fn verify_total_price(
        &self,
        expected: f64,
        soft: &mut SoftAssertions,
    ) -> StorefrontResult<()> {
        let locator = self.base.locator(LocatorKey::TotalPrice)?;
        let text = self.base.text_of(&locator).await?;
        match parse_price(&text) {
            Ok(total) => soft.assert_amount(total, expected, "cart total"),
            Err(mismatch) => soft.record_mismatch(&mismatch),
        }
        Ok(())
    }

    /// Soft check that no rows remain
    pub async fn verify_cart_empty(&self, soft: &mut SoftAssertions) -> StorefrontResult<()> {
        let remaining = self
            .base
            .wait_count(LocatorKey::CartRow, CountPredicate::Zero, None)
            .await;
        soften(remaining, soft, "cart empty").map(|_| ())
    }
}

fn convergence_timeout(last_observed: usize, start: Instant, removals: usize) -> StorefrontError {
    let err = StorefrontError::ConvergenceTimeout {
        last_observed,
        elapsed_ms: start.elapsed().as_millis() as u64,
        removals,
    };
    tracing::warn!(error = %err, "cart did not converge");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ProductInfo;
    use crate::mock::MockStorefront;

    fn config() -> SuiteConfig {
        SuiteConfig::default()
            .with_timeout_ms(300)
            .with_poll_interval_ms(5)
            .with_navigation_timeout_ms(300)
    }

    async fn cart_with(mock: &MockStorefront, products: &[ProductInfo]) -> CartPage {
        mock.seed_cart(products);
        let surface = Surface::new(mock.clone());
        let page = CartPage::new(&surface, &config());
        surface
            .driver()
            .goto("https://www.demoblaze.com/cart.html")
            .await
            .unwrap();
        page
    }

    mod read_tests {
        use super::*;

        #[tokio::test]
        async fn test_line_items_and_total() {
            let mock = MockStorefront::new();
            let page = cart_with(&mock, &[ProductInfo::SAMSUNG_GALAXY_S6, ProductInfo::MACBOOK_PRO]).await;
            assert_eq!(
                page.line_items().await.unwrap(),
                vec![
                    LineItem {
                        name: "Samsung galaxy s6".to_string(),
                        unit_price: 360.0
                    },
                    LineItem {
                        name: "MacBook Pro".to_string(),
                        unit_price: 1100.0
                    },
                ]
            );
            assert_eq!(page.total_price().await.unwrap(), 1460.0);
            assert_eq!(page.product_price("MacBook Pro").await.unwrap(), 1100.0);
        }

        #[tokio::test]
        async fn test_line_items_reread_when_a_row_lands_between_reads() {
            let mock = MockStorefront::new();
            let page = cart_with(&mock, &[ProductInfo::SONY_VAIO_I5, ProductInfo::MACBOOK_AIR]).await;
            mock.inject_on_removal(1, ProductInfo::APPLE_MONITOR_24);
            let delete = page.base().locator(LocatorKey::CartDeleteButton).unwrap();
            page.base().surface().driver().click(&delete).await.unwrap();

            // The injected row shows up after the names are read.
            let items = page.line_items().await.unwrap();
            let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
            assert_eq!(names, vec!["MacBook air", "Apple monitor 24"]);
            assert_eq!(items[1].unit_price, 400.0);
        }

        #[tokio::test]
        async fn test_empty_cart_total_is_sentinel() {
            let mock = MockStorefront::new();
            let page = cart_with(&mock, &[]).await;
            assert_eq!(page.total_price().await.unwrap(), 0.0);
            assert!(page.cart_items().await.unwrap().is_empty());
        }
    }

    mod removal_tests {
        use super::*;

        #[tokio::test]
        async fn test_remove_by_name_takes_first_duplicate_only() {
            let mock = MockStorefront::new();
            let page = cart_with(
                &mock,
                &[ProductInfo::MACBOOK_AIR, ProductInfo::SONY_XPERIA_Z5, ProductInfo::MACBOOK_AIR],
            )
            .await;
            page.remove_line_item("MacBook air").await.unwrap();
            assert_eq!(page.cart_items().await.unwrap(), vec!["Sony xperia z5", "MacBook air"]);
        }

        #[tokio::test]
        async fn test_clear_cart_counts_removals() {
            let mock = MockStorefront::new().with_removal_frames(3);
            let page = cart_with(
                &mock,
                &[ProductInfo::MACBOOK_PRO, ProductInfo::MACBOOK_PRO, ProductInfo::APPLE_MONITOR_24],
            )
            .await;
            let report = page.clear_cart(DEFAULT_CLEAR_TIMEOUT).await.unwrap();
            assert_eq!(report.initial_count, 3);
            assert_eq!(report.removals, 3);
            assert!(mock.cart_names().is_empty());
        }

        #[tokio::test]
        async fn test_clear_empty_cart_is_noop() {
            let mock = MockStorefront::new();
            let page = cart_with(&mock, &[]).await;
            let report = page.clear_cart(DEFAULT_CLEAR_TIMEOUT).await.unwrap();
            assert_eq!(report.removals, 0);
            assert_eq!(report.initial_count, 0);
        }

        #[tokio::test]
        async fn test_stuck_removal_is_convergence_timeout() {
            let mock = MockStorefront::new().with_stuck_removals();
            let page = cart_with(&mock, &[ProductInfo::SONY_VAIO_I5]).await;
            let err = page.clear_cart(Duration::from_millis(100)).await.unwrap_err();
            match err {
                StorefrontError::ConvergenceTimeout {
                    last_observed,
                    removals,
                    ..
                } => {
                    assert_eq!(last_observed, 1);
                    assert_eq!(removals, 1);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    mod convergence_tests {
        use super::*;

        #[tokio::test]
        async fn test_timeout_reports_count_seen_by_the_wait() {
            let mock = MockStorefront::new().with_stuck_removals();
            let page = cart_with(
                &mock,
                &[ProductInfo::SONY_VAIO_I5, ProductInfo::MACBOOK_AIR, ProductInfo::MACBOOK_PRO],
            )
            .await;
            let err = page.clear_cart(Duration::from_millis(80)).await.unwrap_err();
            let StorefrontError::ConvergenceTimeout {
                last_observed,
                removals,
                elapsed_ms,
            } = err
            else {
                panic!("unexpected error: {err}");
            };
            assert_eq!(last_observed, 3);
            assert_eq!(removals, 1);
            assert!(elapsed_ms >= 80);
            assert_eq!(mock.cart_names().len(), last_observed);
        }
    }

    mod verify_tests {
        use super::*;

        #[tokio::test]
        async fn test_verifications_pass_on_matching_cart() {
            let mock = MockStorefront::new();
            let page = cart_with(&mock, &[ProductInfo::MACBOOK_AIR]).await;
            let mut soft = SoftAssertions::new();
            page.verify_product_in_cart("MacBook air", &mut soft).await.unwrap();
            page.verify_product_price("MacBook air", 700.0, &mut soft).await.unwrap();
            page.verify_total_price(700.0, &mut soft).await.unwrap();
            assert!(soft.verify().is_ok());

            page.verify_cart_empty(&mut soft).await.unwrap();
            assert_eq!(soft.failure_count(), 1);
        }
    }
}
