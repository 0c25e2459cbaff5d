//! Locator registries: semantic element names → selectors, per page family.
//!
//! Every page family composes the common navigation table with its own
//! entries. Each entry carries one strategy per [`SelectorDialect`]; binding a
//! registry picks the dialect once and computes every static locator eagerly,
//! so a bound registry is a total, immutable mapping over the keys its family
//! declares. Rebinding to another surface builds a fresh registry.

use std::collections::HashMap;
use std::fmt;

use crate::driver::SurfaceId;
use crate::locator::{xpath_literal, Locator, MatchPolicy, SelectorDialect, SelectorExpr};
use crate::result::{StorefrontError, StorefrontResult};

/// Logical page families of the storefront
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageFamily {
    /// Navigation elements present on every page
    Common,
    /// Login modal
    Login,
    /// Home page with categories and product cards
    Home,
    /// Single product page
    ProductDetail,
    /// Cart page
    Cart,
    /// Place-order modal and purchase confirmation
    Checkout,
}

impl PageFamily {
    /// All page families
    pub const ALL: [Self; 6] = [
        Self::Common,
        Self::Login,
        Self::Home,
        Self::ProductDetail,
        Self::Cart,
        Self::Checkout,
    ];

    /// Family name used in logs and errors
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Login => "login",
            Self::Home => "home",
            Self::ProductDetail => "product-detail",
            Self::Cart => "cart",
            Self::Checkout => "checkout",
        }
    }
}

impl fmt::Display for PageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static semantic element names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorKey {
    NavbarHome,
    NavbarCart,
    NavbarLogin,
    NavbarLogout,
    WelcomeMessage,
    LoginModal,
    UsernameInput,
    PasswordInput,
    LoginButton,
    CloseLoginModal,
    CategoryPhones,
    CategoryLaptops,
    CategoryMonitors,
    ProductList,
    ProductName,
    ProductPrice,
    ProductDescription,
    AddToCartButton,
    CartTable,
    CartRow,
    CartRowName,
    CartRowPrice,
    CartDeleteButton,
    TotalPrice,
    PlaceOrderButton,
    CheckoutModal,
    NameInput,
    CountryInput,
    CityInput,
    CreditCardInput,
    MonthInput,
    YearInput,
    PurchaseButton,
    CloseCheckoutButton,
    ConfirmationModal,
    ConfirmationMessage,
    OrderDetails,
    ConfirmOkButton,
}

impl LocatorKey {
    /// Semantic name of the key
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NavbarHome => "navbarHome",
            Self::NavbarCart => "navbarCart",
            Self::NavbarLogin => "navbarLogin",
            Self::NavbarLogout => "navbarLogout",
            Self::WelcomeMessage => "welcomeMessage",
            Self::LoginModal => "loginModal",
            Self::UsernameInput => "usernameInput",
            Self::PasswordInput => "passwordInput",
            Self::LoginButton => "loginButton",
            Self::CloseLoginModal => "closeLoginModal",
            Self::CategoryPhones => "categoryPhones",
            Self::CategoryLaptops => "categoryLaptops",
            Self::CategoryMonitors => "categoryMonitors",
            Self::ProductList => "productList",
            Self::ProductName => "productName",
            Self::ProductPrice => "productPrice",
            Self::ProductDescription => "productDescription",
            Self::AddToCartButton => "addToCartButton",
            Self::CartTable => "cartTable",
            Self::CartRow => "cartRow",
            Self::CartRowName => "cartRowName",
            Self::CartRowPrice => "cartRowPrice",
            Self::CartDeleteButton => "cartDeleteButton",
            Self::TotalPrice => "totalPrice",
            Self::PlaceOrderButton => "placeOrderButton",
            Self::CheckoutModal => "checkoutModal",
            Self::NameInput => "nameInput",
            Self::CountryInput => "countryInput",
            Self::CityInput => "cityInput",
            Self::CreditCardInput => "creditCardInput",
            Self::MonthInput => "monthInput",
            Self::YearInput => "yearInput",
            Self::PurchaseButton => "purchaseButton",
            Self::CloseCheckoutButton => "closeCheckoutButton",
            Self::ConfirmationModal => "confirmationModal",
            Self::ConfirmationMessage => "confirmationMessage",
            Self::OrderDetails => "orderDetails",
            Self::ConfirmOkButton => "confirmOkButton",
        }
    }
}

impl fmt::Display for LocatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameterised semantic element names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicKey {
    /// Product card link on the home page, by product name
    ProductCard,
    /// Name cell of the cart row holding a product
    CartProductName,
    /// Price cell of the cart row holding a product
    CartProductPrice,
    /// Delete control of the cart row holding a product
    CartDeleteButtonFor,
}

impl DynamicKey {
    /// Semantic name of the key
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProductCard => "productCard",
            Self::CartProductName => "cartProductName",
            Self::CartProductPrice => "cartProductPrice",
            Self::CartDeleteButtonFor => "cartDeleteButtonFor",
        }
    }
}

impl fmt::Display for DynamicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selector together with the policy it must be applied with
#[derive(Debug, Clone)]
pub struct Strategy {
    selector: SelectorExpr,
    policy: MatchPolicy,
}

impl Strategy {
    fn css(css: &str) -> Self {
        Self {
            selector: SelectorExpr::css(css),
            policy: MatchPolicy::Strict,
        }
    }

    fn css_text(css: &str, text: &str) -> Self {
        Self {
            selector: SelectorExpr::css_with_text(css, text),
            policy: MatchPolicy::Strict,
        }
    }

    fn xpath(xpath: &str) -> Self {
        Self {
            selector: SelectorExpr::xpath(xpath),
            policy: MatchPolicy::Strict,
        }
    }

    const fn first(mut self) -> Self {
        self.policy = MatchPolicy::First;
        self
    }

    const fn nth(mut self, n: usize) -> Self {
        self.policy = MatchPolicy::Nth(n);
        self
    }
}

/// One strategy per dialect for a static key
#[derive(Debug, Clone)]
pub struct Strategies {
    short: Strategy,
    structural: Strategy,
}

impl Strategies {
    fn pick(&self, dialect: SelectorDialect) -> &Strategy {
        match dialect {
            SelectorDialect::Short => &self.short,
            SelectorDialect::Structural => &self.structural,
        }
    }
}

/// Builder of a dynamic selector from its run-time parameter
pub type SelectorFn = fn(&str) -> SelectorExpr;

/// One builder per dialect for a dynamic key
#[derive(Debug, Clone, Copy)]
pub struct DynamicStrategies {
    short: SelectorFn,
    structural: SelectorFn,
    policy: MatchPolicy,
}

/// A dynamic locator bound to one dialect.
///
/// Dynamic locators always use the [`MatchPolicy::First`] policy: product
/// names may repeat in the cart, and the first row in document order is the
/// one acted upon.
#[derive(Debug, Clone, Copy)]
pub struct DynamicLocator {
    key: DynamicKey,
    build: SelectorFn,
    policy: MatchPolicy,
}

impl DynamicLocator {
    /// Resolve for a parameter
    #[must_use]
    pub fn resolve(&self, param: &str) -> Locator {
        Locator::new(format!("{}({param:?})", self.key), (self.build)(param))
            .with_policy(self.policy)
    }
}

/// Unbound table of strategies for one page family
#[derive(Debug, Clone)]
pub struct LocatorTable {
    family: PageFamily,
    statics: Vec<(LocatorKey, Strategies)>,
    dynamics: Vec<(DynamicKey, DynamicStrategies)>,
}

fn entry(key: LocatorKey, short: Strategy, structural: Strategy) -> (LocatorKey, Strategies) {
    (key, Strategies { short, structural })
}

impl LocatorTable {
    /// Navigation elements shared by every page
    #[must_use]
    pub fn common() -> Self {
        use LocatorKey as K;
        Self {
            family: PageFamily::Common,
            statics: vec![
                entry(
                    K::NavbarHome,
                    Strategy::css_text("a.nav-link", "Home").first(),
                    Strategy::xpath("//a[contains(@class, 'nav-link') and contains(., 'Home')]")
                        .first(),
                ),
                entry(
                    K::NavbarCart,
                    Strategy::css("a#cartur"),
                    Strategy::xpath("//a[@id='cartur']"),
                ),
                entry(
                    K::NavbarLogin,
                    Strategy::css("a#login2"),
                    Strategy::xpath("//a[@id='login2']"),
                ),
                entry(
                    K::NavbarLogout,
                    Strategy::css("a#logout2"),
                    Strategy::xpath("//a[@id='logout2']"),
                ),
                entry(
                    K::WelcomeMessage,
                    Strategy::css("a#nameofuser"),
                    Strategy::xpath("//a[@id='nameofuser']"),
                ),
            ],
            dynamics: Vec::new(),
        }
    }

    /// Entries owned by a family, without the common base.
    ///
    /// Besides its declared keys, a family borrows the marker elements of
    /// the pages its operations navigate to, so that navigation can wait for
    /// the destination to render.
    #[must_use]
    pub fn own(family: PageFamily) -> Self {
        use LocatorKey as K;
        let mut table = Self::declared(family);
        let markers: &[(PageFamily, LocatorKey)] = match family {
            PageFamily::Home => &[
                (PageFamily::ProductDetail, K::AddToCartButton),
                (PageFamily::Cart, K::PlaceOrderButton),
            ],
            PageFamily::Cart => &[(PageFamily::Checkout, K::CheckoutModal)],
            PageFamily::Checkout => &[(PageFamily::Home, K::ProductList)],
            PageFamily::Common | PageFamily::Login | PageFamily::ProductDetail => &[],
        };
        for (source, key) in markers {
            table.borrow_from(&Self::declared(*source), *key);
        }
        table
    }

    fn borrow_from(&mut self, source: &Self, key: LocatorKey) {
        if let Some(entry) = source.statics.iter().find(|(k, _)| *k == key) {
            self.statics.push(entry.clone());
        }
    }

    fn declared(family: PageFamily) -> Self {
        match family {
            PageFamily::Common => Self {
                family,
                statics: Vec::new(),
                dynamics: Vec::new(),
            },
            PageFamily::Login => Self::login(),
            PageFamily::Home => Self::home(),
            PageFamily::ProductDetail => Self::product_detail(),
            PageFamily::Cart => Self::cart(),
            PageFamily::Checkout => Self::checkout(),
        }
    }

    fn login() -> Self {
        use LocatorKey as K;
        Self {
            family: PageFamily::Login,
            statics: vec![
                entry(
                    K::LoginModal,
                    Strategy::css("#logInModal"),
                    Strategy::xpath("//div[@id='logInModal']"),
                ),
                entry(
                    K::UsernameInput,
                    Strategy::css("#loginusername"),
                    Strategy::xpath("//input[@id='loginusername']"),
                ),
                entry(
                    K::PasswordInput,
                    Strategy::css("#loginpassword"),
                    Strategy::xpath("//input[@id='loginpassword']"),
                ),
                // The navbar link and the modal button share the caption.
                entry(
                    K::LoginButton,
                    Strategy::css_text("button", "Log in").nth(1),
                    Strategy::xpath("//div[@id='logInModal']//button[normalize-space(.)='Log in']"),
                ),
                entry(
                    K::CloseLoginModal,
                    Strategy::css("#logInModal .close"),
                    Strategy::xpath("//div[@id='logInModal']//button[@class='close']"),
                ),
            ],
            dynamics: Vec::new(),
        }
    }

    fn home() -> Self {
        use LocatorKey as K;
        Self {
            family: PageFamily::Home,
            statics: vec![
                entry(
                    K::CategoryPhones,
                    Strategy::css_text("a", "Phones"),
                    Strategy::xpath("//a[normalize-space(.)='Phones']"),
                ),
                entry(
                    K::CategoryLaptops,
                    Strategy::css_text("a", "Laptops"),
                    Strategy::xpath("//a[normalize-space(.)='Laptops']"),
                ),
                entry(
                    K::CategoryMonitors,
                    Strategy::css_text("a", "Monitors"),
                    Strategy::xpath("//a[normalize-space(.)='Monitors']"),
                ),
                entry(
                    K::ProductList,
                    Strategy::css(".card-title a").first(),
                    Strategy::xpath("//h4[@class='card-title']//a").first(),
                ),
            ],
            dynamics: vec![(
                DynamicKey::ProductCard,
                DynamicStrategies {
                    short: |name| SelectorExpr::css_with_text(".card-title a", name),
                    structural: |name| {
                        SelectorExpr::xpath(format!(
                            "//h4[@class='card-title']//a[contains(text(), {})]",
                            xpath_literal(name)
                        ))
                    },
                    policy: MatchPolicy::First,
                },
            )],
        }
    }

    fn product_detail() -> Self {
        use LocatorKey as K;
        Self {
            family: PageFamily::ProductDetail,
            statics: vec![
                entry(
                    K::ProductName,
                    Strategy::css("h2.name"),
                    Strategy::xpath("//h2[@class='name']"),
                ),
                entry(
                    K::ProductPrice,
                    Strategy::css("h3.price-container"),
                    Strategy::xpath("//h3[@class='price-container']"),
                ),
                entry(
                    K::ProductDescription,
                    Strategy::css("#more-information"),
                    Strategy::xpath("//div[@id='more-information']"),
                ),
                entry(
                    K::AddToCartButton,
                    Strategy::css_text("a", "Add to cart"),
                    Strategy::xpath("//a[contains(text(), 'Add to cart')]"),
                ),
            ],
            dynamics: Vec::new(),
        }
    }

    fn cart() -> Self {
        use LocatorKey as K;
        Self {
            family: PageFamily::Cart,
            statics: vec![
                entry(
                    K::CartTable,
                    Strategy::css("#tbodyid"),
                    Strategy::xpath("//tbody[@id='tbodyid']"),
                ),
                entry(
                    K::CartRow,
                    Strategy::css("#tbodyid tr").first(),
                    Strategy::xpath("//tbody[@id='tbodyid']/tr").first(),
                ),
                entry(
                    K::CartRowName,
                    Strategy::css("#tbodyid tr td:nth-child(2)").first(),
                    Strategy::xpath("//tbody[@id='tbodyid']/tr/td[2]").first(),
                ),
                entry(
                    K::CartRowPrice,
                    Strategy::css("#tbodyid tr td:nth-child(3)").first(),
                    Strategy::xpath("//tbody[@id='tbodyid']/tr/td[3]").first(),
                ),
                entry(
                    K::CartDeleteButton,
                    Strategy::css_text("#tbodyid a", "Delete").first(),
                    Strategy::xpath("//tbody[@id='tbodyid']//a[contains(text(), 'Delete')]").first(),
                ),
                entry(
                    K::TotalPrice,
                    Strategy::css("#totalp"),
                    Strategy::xpath("//h3[@id='totalp']"),
                ),
                entry(
                    K::PlaceOrderButton,
                    Strategy::css_text("button", "Place Order"),
                    Strategy::xpath("//button[normalize-space(.)='Place Order']"),
                ),
            ],
            dynamics: vec![
                (
                    DynamicKey::CartProductName,
                    DynamicStrategies {
                        short: |name| {
                            SelectorExpr::css_with_text("#tbodyid tr", name)
                                .descendant("td:nth-child(2)")
                        },
                        structural: |name| {
                            SelectorExpr::xpath(format!(
                                "//tbody[@id='tbodyid']//tr[contains(., {})]//td[2]",
                                xpath_literal(name)
                            ))
                        },
                        policy: MatchPolicy::First,
                    },
                ),
                (
                    DynamicKey::CartProductPrice,
                    DynamicStrategies {
                        short: |name| {
                            SelectorExpr::css_with_text("#tbodyid tr", name)
                                .descendant("td:nth-child(3)")
                        },
                        structural: |name| {
                            SelectorExpr::xpath(format!(
                                "//tbody[@id='tbodyid']//tr[contains(., {})]//td[3]",
                                xpath_literal(name)
                            ))
                        },
                        policy: MatchPolicy::First,
                    },
                ),
                (
                    DynamicKey::CartDeleteButtonFor,
                    DynamicStrategies {
                        short: |name| SelectorExpr::css_with_text("#tbodyid tr", name).descendant("td a"),
                        structural: |name| {
                            SelectorExpr::xpath(format!(
                                "//tbody[@id='tbodyid']//tr[contains(., {})]//td//a",
                                xpath_literal(name)
                            ))
                        },
                        policy: MatchPolicy::First,
                    },
                ),
            ],
        }
    }

    fn checkout() -> Self {
        use LocatorKey as K;
        let input = |key, id: &str| {
            entry(
                key,
                Strategy::css(&format!("#{id}")),
                Strategy::xpath(&format!("//input[@id='{id}']")),
            )
        };
        Self {
            family: PageFamily::Checkout,
            statics: vec![
                entry(
                    K::CheckoutModal,
                    Strategy::css("#orderModal"),
                    Strategy::xpath("//div[@id='orderModal']"),
                ),
                input(K::NameInput, "name"),
                input(K::CountryInput, "country"),
                input(K::CityInput, "city"),
                input(K::CreditCardInput, "card"),
                input(K::MonthInput, "month"),
                input(K::YearInput, "year"),
                entry(
                    K::PurchaseButton,
                    Strategy::css_text("button", "Purchase"),
                    Strategy::xpath("//div[@id='orderModal']//button[normalize-space(.)='Purchase']"),
                ),
                entry(
                    K::CloseCheckoutButton,
                    Strategy::css("#orderModal .close"),
                    Strategy::xpath("//div[@id='orderModal']//button[@class='close']"),
                ),
                entry(
                    K::ConfirmationModal,
                    Strategy::css(".sweet-alert"),
                    Strategy::xpath("//div[contains(@class, 'sweet-alert')]"),
                ),
                entry(
                    K::ConfirmationMessage,
                    Strategy::css(".sweet-alert h2"),
                    Strategy::xpath("//div[contains(@class, 'sweet-alert')]/h2"),
                ),
                entry(
                    K::OrderDetails,
                    Strategy::css(".sweet-alert p"),
                    Strategy::xpath("//div[contains(@class, 'sweet-alert')]/p"),
                ),
                entry(
                    K::ConfirmOkButton,
                    Strategy::css_text(".sweet-alert button", "OK"),
                    Strategy::xpath("//div[contains(@class, 'sweet-alert')]//button[normalize-space(.)='OK']"),
                ),
            ],
            dynamics: Vec::new(),
        }
    }

    /// Compose a base table with a family's own entries.
    ///
    /// # Panics
    ///
    /// Panics if the family redeclares a key of the base table; a key must
    /// have exactly one strategy per dialect.
    #[must_use]
    pub fn compose(base: &Self, own: Self) -> Self {
        let mut statics = base.statics.clone();
        for (key, strategies) in own.statics {
            assert!(
                !statics.iter().any(|(k, _)| *k == key),
                "{key} is declared by both the base table and the {} table",
                own.family
            );
            statics.push((key, strategies));
        }
        let mut dynamics = base.dynamics.clone();
        dynamics.extend(own.dynamics);
        Self {
            family: own.family,
            statics,
            dynamics,
        }
    }

    /// Family of this table
    #[must_use]
    pub const fn family(&self) -> PageFamily {
        self.family
    }
}

/// Bound, dialect-resolved locators for one page family on one surface
#[derive(Debug, Clone)]
pub struct LocatorRegistry {
    family: PageFamily,
    dialect: SelectorDialect,
    surface: SurfaceId,
    statics: HashMap<LocatorKey, Locator>,
    dynamics: HashMap<DynamicKey, DynamicLocator>,
}

impl LocatorRegistry {
    /// Bind a family's registry (common base + own entries) to a surface
    #[must_use]
    pub fn bind(family: PageFamily, dialect: SelectorDialect, surface: SurfaceId) -> Self {
        Self::bind_with_base(&LocatorTable::common(), family, dialect, surface)
    }

    /// Bind with an explicitly supplied base table
    #[must_use]
    pub fn bind_with_base(
        base: &LocatorTable,
        family: PageFamily,
        dialect: SelectorDialect,
        surface: SurfaceId,
    ) -> Self {
        let table = LocatorTable::compose(base, LocatorTable::own(family));
        Self::from_table(&table, dialect, surface)
    }

    /// Bind an already composed table
    #[must_use]
    pub fn from_table(table: &LocatorTable, dialect: SelectorDialect, surface: SurfaceId) -> Self {
        let statics = table
            .statics
            .iter()
            .map(|(key, strategies)| {
                let strategy = strategies.pick(dialect);
                let locator = Locator::new(key.as_str(), strategy.selector.clone())
                    .with_policy(strategy.policy);
                (*key, locator)
            })
            .collect();
        let dynamics = table
            .dynamics
            .iter()
            .map(|(key, strategies)| {
                let build = match dialect {
                    SelectorDialect::Short => strategies.short,
                    SelectorDialect::Structural => strategies.structural,
                };
                (
                    *key,
                    DynamicLocator {
                        key: *key,
                        build,
                        policy: strategies.policy,
                    },
                )
            })
            .collect();

        tracing::debug!(family = %table.family, %dialect, %surface, "bound locator registry");

        Self {
            family: table.family,
            dialect,
            surface,
            statics,
            dynamics,
        }
    }

    /// Rebuild this registry for another surface, keeping family and dialect
    #[must_use]
    pub fn rebound(&self, surface: SurfaceId) -> Self {
        Self::bind(self.family, self.dialect, surface)
    }

    /// Resolve a static key
    pub fn resolve(&self, key: LocatorKey) -> StorefrontResult<Locator> {
        self.statics
            .get(&key)
            .cloned()
            .ok_or_else(|| StorefrontError::LocatorResolution {
                family: self.family.name(),
                key: key.to_string(),
            })
    }

    /// Resolve a dynamic key for a run-time parameter
    pub fn resolve_with(&self, key: DynamicKey, param: &str) -> StorefrontResult<Locator> {
        self.dynamics
            .get(&key)
            .map(|dynamic| dynamic.resolve(param))
            .ok_or_else(|| StorefrontError::LocatorResolution {
                family: self.family.name(),
                key: key.to_string(),
            })
    }

    /// Whether the family declares a static key
    #[must_use]
    pub fn declares(&self, key: LocatorKey) -> bool {
        self.statics.contains_key(&key)
    }

    /// All bound static locators
    pub fn entries(&self) -> impl Iterator<Item = (LocatorKey, &Locator)> {
        self.statics.iter().map(|(key, locator)| (*key, locator))
    }

    /// All bound dynamic keys
    pub fn dynamic_keys(&self) -> impl Iterator<Item = DynamicKey> + '_ {
        self.dynamics.keys().copied()
    }

    /// Page family
    #[must_use]
    pub const fn family(&self) -> PageFamily {
        self.family
    }

    /// Active dialect
    #[must_use]
    pub const fn dialect(&self) -> SelectorDialect {
        self.dialect
    }

    /// Surface this registry was bound to
    #[must_use]
    pub const fn surface_id(&self) -> SurfaceId {
        self.surface
    }
}
