//! Page objects.
//!
//! Each page object wraps a [`PageBase`] bound to one page family. Callers
//! speak in semantic keys and business operations; selectors and waits stay
//! inside.

pub mod cart;
pub mod checkout;
pub mod common;
pub mod home;
pub mod login;
pub mod product_detail;

pub use cart::{CartPage, ClearCartReport, LineItem, DEFAULT_CLEAR_TIMEOUT};
pub use checkout::{CheckoutPage, PURCHASE_CONFIRMED};
pub use common::{Navigation, PageBase, PageObject};
pub use home::HomePage;
pub use login::LoginPage;
pub use product_detail::ProductDetailPage;
