//! Storefront E2E: page objects for an e-commerce storefront test suite.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Workflow     │──►│ Page Objects │──►│ Waiter       │──►│ Storefront   │
//! │ (PageBundle) │   │ (PageBase)   │   │ (poll/sleep) │   │ Driver       │
//! └──────────────┘   └──────┬───────┘   └──────────────┘   └──────────────┘
//!                           │
//!                    ┌──────▼───────┐
//!                    │ Locator      │  semantic key ──► selector (dialect)
//!                    │ Registry     │
//!                    └──────────────┘
//! ```
//!
//! Page objects never see selectors: they resolve [`LocatorKey`]s through a
//! [`LocatorRegistry`] bound to their page family, selector dialect and
//! surface. Every action waits on a condition first; nothing sleeps for a
//! fixed interval.
//!
//! # Example
//!
//! ```
//! use storefront_e2e::{authenticated_session, Credentials, MockStorefront, Surface, SuiteConfig};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let surface = Surface::new(MockStorefront::new());
//! let config = SuiteConfig::default().with_poll_interval_ms(5);
//! let credentials = Credentials::new("storefront_tester", "storefront_tester");
//! let pages = authenticated_session(&surface, &config, &credentials).await?;
//! pages.select_product("Samsung galaxy s6").await?;
//! pages.add_to_cart().await?;
//! pages.navigate_to_cart().await?;
//! assert_eq!(pages.total_price().await?, 360.0);
//! # Ok::<_, storefront_e2e::StorefrontError>(())
//! # }).unwrap();
//! ```

#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod artifacts;
pub mod assertion;
pub mod config;
pub mod dialog;
pub mod driver;
pub mod extract;
pub mod fixtures;
pub mod locator;
pub mod logging;
pub mod mock;
pub mod pages;
pub mod registry;
pub mod result;
pub mod step;
pub mod wait;
pub mod workflow;

/// Chromium driver (requires the `browser` feature)
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::significant_drop_tightening)]
pub mod cdp;

pub use artifacts::{sanitize_file_name, save_screenshot};
pub use assertion::{AssertionFailure, SoftAssertionError, SoftAssertions};
pub use config::SuiteConfig;
pub use dialog::{Dialog, DialogAction, DialogSlot, DialogType};
pub use driver::{DriverConfig, Screenshot, StorefrontDriver, Surface, SurfaceId};
pub use extract::{parse_order_amount, parse_order_id, parse_price};
pub use fixtures::{Category, CheckoutInfo, Credentials, ProductInfo, UsersFile};
pub use locator::{Locator, MatchPolicy, SelectorDialect, SelectorExpr};
pub use mock::{MockBehavior, MockStorefront};
pub use pages::{
    CartPage, CheckoutPage, ClearCartReport, HomePage, LineItem, LoginPage, PageBase, PageObject,
    ProductDetailPage,
};
pub use registry::{DynamicKey, LocatorKey, LocatorRegistry, PageFamily};
pub use result::{ExtractionMismatch, StorefrontError, StorefrontResult};
pub use step::step;
pub use wait::{CountPredicate, LoadState, WaitOptions, Waiter};
pub use workflow::{authenticated_session, reset_cart, PageBundle};

#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;
