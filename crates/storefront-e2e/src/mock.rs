//! In-memory storefront implementing [`StorefrontDriver`].
//!
//! The mock understands exactly the selectors the locator registries
//! produce, in both dialects, by mapping each selector back to its semantic
//! key. Page state advances deterministically: every observation (count,
//! visibility, text) is one animation frame, so delayed behaviour such as a
//! cart row fading out is expressed in frames rather than wall-clock time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use async_trait::async_trait;

use crate::dialog::{Dialog, DialogAction, DialogSlot};
use crate::driver::{require_target, target_index, Screenshot, StorefrontDriver, SurfaceId};
use crate::fixtures::{Category, Credentials, ProductInfo};
use crate::locator::{xpath_literal, Locator, SelectorDialect, SelectorExpr};
use crate::pages::checkout::PURCHASE_CONFIRMED;
use crate::registry::{DynamicKey, LocatorKey, LocatorRegistry, PageFamily};
use crate::result::{StorefrontError, StorefrontResult};
use crate::wait::LoadState;

/// Message of the add-to-cart alert
pub const PRODUCT_ADDED: &str = "Product added.";

const MOCK_BASE_URL: &str = "https://www.demoblaze.com/";

// 1x1 transparent PNG
const PIXEL_PNG: [u8; 67] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Knobs for the storefront's timing and failure behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockBehavior {
    /// Frames a deleted cart row stays in the table before it disappears
    pub removal_frames: usize,
    /// Delete controls do nothing
    pub stuck_removals: bool,
    /// The login button never closes the modal
    pub login_never_completes: bool,
    /// The confirmation details omit the order id
    pub malformed_confirmation: bool,
    /// Id given to the first order
    pub first_order_id: u64,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            removal_frames: 0,
            stuck_removals: false,
            login_never_completes: false,
            malformed_confirmation: false,
            first_order_id: 8_123_456,
        }
    }
}

/// A placed order
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    /// Order id shown in the confirmation
    pub id: u64,
    /// Whole-unit amount charged
    pub amount: u64,
    /// Customer name from the form
    pub name: String,
    /// Products bought
    pub products: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Screen {
    Blank,
    Home,
    Product(ProductInfo),
    Cart,
}

#[derive(Debug, Clone)]
struct CartLine {
    product: ProductInfo,
    fading: Option<usize>,
}

#[derive(Debug, Clone)]
struct Element {
    visible: bool,
    text: String,
}

impl Element {
    fn shown(text: impl Into<String>) -> Self {
        Self {
            visible: true,
            text: text.into(),
        }
    }

    fn when(visible: bool, text: impl Into<String>) -> Self {
        Self {
            visible,
            text: text.into(),
        }
    }
}

/// How a dynamic selector compares its parameter, read off the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextRule {
    /// Anywhere in the text of the whole cart row
    RowContains,
    /// Anywhere in the element's own caption
    CaptionContains,
    /// Equal to the text of one cell of the row
    CellEquals,
}

impl TextRule {
    fn matches(self, product: &ProductInfo, param: &str) -> bool {
        match self {
            Self::RowContains => row_text(product).contains(param),
            Self::CaptionContains => product.name.contains(param),
            Self::CellEquals => product.name == param || format!("{}", product.price) == param,
        }
    }
}

fn row_text(product: &ProductInfo) -> String {
    format!("{} {} Delete", product.name, product.price)
}

#[derive(Debug, Clone)]
enum Target {
    Static(LocatorKey, SelectorDialect),
    Dynamic {
        key: DynamicKey,
        param: String,
        rule: TextRule,
    },
}

#[derive(Debug)]
struct StoreState {
    behavior: MockBehavior,
    base_url: String,
    screen: Screen,
    history: Vec<Screen>,
    load_state: LoadState,
    accounts: Vec<Credentials>,
    user: Option<String>,
    login_modal: bool,
    login_fields: HashMap<LocatorKey, String>,
    category: Option<Category>,
    cart: Vec<CartLine>,
    removals: usize,
    injections: Vec<(usize, ProductInfo)>,
    pending: Vec<(ProductInfo, bool)>,
    order_modal: bool,
    order_fields: HashMap<LocatorKey, String>,
    confirmation: Option<PlacedOrder>,
    orders: Vec<PlacedOrder>,
    unhandled_dialogs: Vec<Dialog>,
}

impl StoreState {
    fn new() -> Self {
        Self {
            behavior: MockBehavior::default(),
            base_url: MOCK_BASE_URL.to_string(),
            screen: Screen::Blank,
            history: Vec::new(),
            load_state: LoadState::Loading,
            accounts: vec![Credentials::new("storefront_tester", "storefront_tester")],
            user: None,
            login_modal: false,
            login_fields: HashMap::new(),
            category: None,
            cart: Vec::new(),
            removals: 0,
            injections: Vec::new(),
            pending: Vec::new(),
            order_modal: false,
            order_fields: HashMap::new(),
            confirmation: None,
            orders: Vec::new(),
            unhandled_dialogs: Vec::new(),
        }
    }

    fn navigate(&mut self, screen: Screen) {
        if self.screen != Screen::Blank {
            self.history.push(self.screen);
        }
        self.enter(screen);
    }

    fn enter(&mut self, screen: Screen) {
        self.screen = screen;
        self.load_state = LoadState::Loading;
        self.login_modal = false;
        self.order_modal = false;
        self.confirmation = None;
        if screen == Screen::Home {
            self.category = None;
        }
    }

    fn url(&self) -> String {
        match self.screen {
            Screen::Blank => "about:blank".to_string(),
            Screen::Home => self.base_url.clone(),
            Screen::Cart => format!("{}cart.html", self.base_url),
            Screen::Product(product) => {
                let idp = ProductInfo::CATALOG
                    .iter()
                    .position(|p| p.name == product.name)
                    .map_or(0, |i| i + 1);
                format!("{}prod.html?idp_={idp}", self.base_url)
            }
        }
    }

    /// One animation frame
    fn tick(&mut self) {
        let armed: Vec<ProductInfo> = self
            .pending
            .iter()
            .filter(|(_, armed)| *armed)
            .map(|(product, _)| *product)
            .collect();
        self.pending.retain(|(_, armed)| !armed);
        for product in armed {
            tracing::debug!(product = product.name, "injecting cart line");
            self.cart.push(CartLine {
                product,
                fading: None,
            });
        }

        let mut finished = 0;
        self.cart.retain_mut(|line| match line.fading {
            Some(0 | 1) => {
                finished += 1;
                false
            }
            Some(ref mut frames) => {
                *frames -= 1;
                true
            }
            None => true,
        });
        for _ in 0..finished {
            self.removal_finished();
        }

        if self.load_state < LoadState::NetworkIdle && self.screen != Screen::Blank {
            self.load_state = match self.load_state {
                LoadState::Loading => LoadState::DomContentLoaded,
                LoadState::DomContentLoaded => LoadState::Load,
                _ => LoadState::NetworkIdle,
            };
        }
    }

    /// Lines queued by removals become visible after one observation
    fn arm_pending(&mut self) {
        for (_, armed) in &mut self.pending {
            *armed = true;
        }
    }

    fn removal_finished(&mut self) {
        self.removals += 1;
        let due: Vec<ProductInfo> = self
            .injections
            .iter()
            .filter(|(after, _)| *after == self.removals)
            .map(|(_, product)| *product)
            .collect();
        self.pending.extend(due.into_iter().map(|product| (product, false)));
    }

    fn start_removal(&mut self, index: usize) {
        if self.behavior.stuck_removals {
            tracing::debug!("delete ignored");
            return;
        }
        let frames = self.behavior.removal_frames;
        let Some(line) = self.cart.get_mut(index) else {
            return;
        };
        if line.fading.is_some() {
            return;
        }
        if frames == 0 {
            self.cart.remove(index);
            self.removal_finished();
        } else {
            line.fading = Some(frames);
        }
    }

    fn visible_cards(&self) -> Vec<ProductInfo> {
        ProductInfo::CATALOG
            .iter()
            .copied()
            .filter(|p| self.category.map_or(true, |c| p.category == c))
            .collect()
    }

    fn cart_total(&self) -> String {
        if self.cart.is_empty() {
            return String::new();
        }
        let total: f64 = self.cart.iter().map(|line| line.product.price).sum();
        format!("{total}")
    }

    fn rows_matching(&self, param: &str, rule: TextRule) -> Vec<&CartLine> {
        self.cart
            .iter()
            .filter(|line| rule.matches(&line.product, param))
            .collect()
    }

    fn elements(&self, target: &Target) -> Vec<Element> {
        if self.screen == Screen::Blank {
            return Vec::new();
        }
        match target {
            Target::Static(key, dialect) => self.static_elements(*key, *dialect),
            Target::Dynamic { key, param, rule } => self.dynamic_elements(*key, param, *rule),
        }
    }

    fn static_elements(&self, key: LocatorKey, dialect: SelectorDialect) -> Vec<Element> {
        use LocatorKey as K;
        let logged_in = self.user.is_some();
        let on_home = self.screen == Screen::Home;
        let on_cart = self.screen == Screen::Cart;
        let product = match self.screen {
            Screen::Product(p) => Some(p),
            _ => None,
        };
        let one = |present: bool, element: Element| if present { vec![element] } else { Vec::new() };

        match key {
            K::NavbarHome => vec![Element::shown("Home (current)")],
            K::NavbarCart => vec![Element::shown("Cart")],
            K::NavbarLogin => vec![Element::when(!logged_in, "Log in")],
            K::NavbarLogout => vec![Element::when(logged_in, "Log out")],
            K::WelcomeMessage => vec![Element::when(
                logged_in,
                self.user
                    .as_ref()
                    .map(|u| format!("Welcome {u}"))
                    .unwrap_or_default(),
            )],
            K::LoginModal | K::UsernameInput | K::PasswordInput | K::CloseLoginModal => {
                vec![Element::when(self.login_modal, "")]
            }
            K::LoginButton => {
                let button = Element::when(self.login_modal, "Log in");
                match dialect {
                    // The first button captioned "Log in" is not the one in the modal.
                    SelectorDialect::Short => vec![Element::when(false, "Log in"), button],
                    SelectorDialect::Structural => vec![button],
                }
            }
            K::CategoryPhones => one(on_home, Element::shown("Phones")),
            K::CategoryLaptops => one(on_home, Element::shown("Laptops")),
            K::CategoryMonitors => one(on_home, Element::shown("Monitors")),
            K::ProductList => {
                if on_home {
                    self.visible_cards()
                        .into_iter()
                        .map(|p| Element::shown(p.name))
                        .collect()
                } else {
                    Vec::new()
                }
            }
            K::ProductName => product.map(|p| Element::shown(p.name)).into_iter().collect(),
            K::ProductPrice => product
                .map(|p| Element::shown(format!("${} *includes tax", p.price)))
                .into_iter()
                .collect(),
            K::ProductDescription => product
                .map(|p| Element::shown(p.description.unwrap_or("Product description")))
                .into_iter()
                .collect(),
            K::AddToCartButton => product
                .map(|_| Element::shown("Add to cart"))
                .into_iter()
                .collect(),
            K::CartTable => one(on_cart, Element::when(!self.cart.is_empty(), "")),
            K::CartRow | K::CartRowName | K::CartRowPrice | K::CartDeleteButton => {
                if !on_cart {
                    return Vec::new();
                }
                self.cart
                    .iter()
                    .map(|line| {
                        let p = line.product;
                        Element::shown(match key {
                            K::CartRowName => p.name.to_string(),
                            K::CartRowPrice => format!("{}", p.price),
                            K::CartDeleteButton => "Delete".to_string(),
                            _ => row_text(&p),
                        })
                    })
                    .collect()
            }
            K::TotalPrice => one(on_cart, Element::when(!self.cart.is_empty(), self.cart_total())),
            K::PlaceOrderButton => one(on_cart, Element::shown("Place Order")),
            K::CheckoutModal
            | K::NameInput
            | K::CountryInput
            | K::CityInput
            | K::CreditCardInput
            | K::MonthInput
            | K::YearInput
            | K::PurchaseButton
            | K::CloseCheckoutButton => one(on_cart, Element::when(self.order_modal, "")),
            K::ConfirmationModal | K::ConfirmationMessage | K::OrderDetails | K::ConfirmOkButton => {
                let Some(order) = &self.confirmation else {
                    return Vec::new();
                };
                let text = match key {
                    K::ConfirmationMessage => PURCHASE_CONFIRMED.to_string(),
                    K::OrderDetails => self.order_details(order),
                    K::ConfirmOkButton => "OK".to_string(),
                    _ => String::new(),
                };
                vec![Element::shown(text)]
            }
        }
    }

    fn dynamic_elements(&self, key: DynamicKey, param: &str, rule: TextRule) -> Vec<Element> {
        match key {
            DynamicKey::ProductCard => {
                if self.screen != Screen::Home {
                    return Vec::new();
                }
                self.visible_cards()
                    .into_iter()
                    .filter(|p| rule.matches(p, param))
                    .map(|p| Element::shown(p.name))
                    .collect()
            }
            DynamicKey::CartProductName | DynamicKey::CartProductPrice | DynamicKey::CartDeleteButtonFor => {
                if self.screen != Screen::Cart {
                    return Vec::new();
                }
                self.rows_matching(param, rule)
                    .into_iter()
                    .map(|line| {
                        Element::shown(match key {
                            DynamicKey::CartProductName => line.product.name.to_string(),
                            DynamicKey::CartProductPrice => format!("{}", line.product.price),
                            _ => "Delete".to_string(),
                        })
                    })
                    .collect()
            }
        }
    }

    fn order_details(&self, order: &PlacedOrder) -> String {
        let card = self
            .order_fields
            .get(&LocatorKey::CreditCardInput)
            .cloned()
            .unwrap_or_default();
        let date = chrono::Local::now().format("%-d/%-m/%Y");
        let body = format!(
            "Amount: {} USD\nCard Number: {card}\nName: {}\nDate: {date}",
            order.amount, order.name
        );
        if self.behavior.malformed_confirmation {
            body
        } else {
            format!("Id: {}\n{body}", order.id)
        }
    }
}

fn all_registries() -> &'static [LocatorRegistry] {
    static REGISTRIES: OnceLock<Vec<LocatorRegistry>> = OnceLock::new();
    REGISTRIES.get_or_init(|| {
        let surface = SurfaceId::new();
        PageFamily::ALL
            .iter()
            .flat_map(|family| {
                [SelectorDialect::Short, SelectorDialect::Structural]
                    .map(|dialect| LocatorRegistry::bind(*family, dialect, surface))
            })
            .collect()
    })
}

fn static_index() -> &'static HashMap<SelectorExpr, LocatorKey> {
    static INDEX: OnceLock<HashMap<SelectorExpr, LocatorKey>> = OnceLock::new();
    INDEX.get_or_init(|| {
        all_registries()
            .iter()
            .flat_map(|registry| registry.entries())
            .map(|(key, locator)| (locator.selector().clone(), key))
            .collect()
    })
}

fn identify(selector: &SelectorExpr) -> Option<Target> {
    if let Some(key) = static_index().get(selector) {
        return Some(Target::Static(*key, selector.dialect()));
    }
    all_registries().iter().find_map(|registry| {
        registry.dynamic_keys().find_map(|key| {
            let template = registry.resolve_with(key, PARAM_MARK).ok()?;
            let (param, rule) = read_dynamic(template.selector(), selector)?;
            Some(Target::Dynamic { key, param, rule })
        })
    })
}

/// Stands in for the parameter when building a dynamic key's template
const PARAM_MARK: &str = "\u{1}";

/// Recover the parameter of `selector` and the rule it applies, given the
/// same key's selector built around [`PARAM_MARK`].
fn read_dynamic(template: &SelectorExpr, selector: &SelectorExpr) -> Option<(String, TextRule)> {
    match (template, selector) {
        (
            SelectorExpr::Short {
                css, descendant, ..
            },
            SelectorExpr::Short {
                css: actual_css,
                has_text: Some(param),
                descendant: actual_descendant,
            },
        ) if css == actual_css && descendant == actual_descendant => {
            // The text filter runs on the row when a descendant is picked from it.
            let rule = if descendant.is_some() {
                TextRule::RowContains
            } else {
                TextRule::CaptionContains
            };
            Some((param.clone(), rule))
        }
        (SelectorExpr::Structural { xpath: template }, SelectorExpr::Structural { xpath }) => {
            let (prefix, suffix) = template.split_once(&xpath_literal(PARAM_MARK))?;
            let literal = xpath.strip_prefix(prefix)?.strip_suffix(suffix)?;
            Some((parse_xpath_literal(literal)?, structural_rule(prefix)?))
        }
        _ => None,
    }
}

fn structural_rule(prefix: &str) -> Option<TextRule> {
    if prefix.ends_with("tr[contains(., ") {
        Some(TextRule::RowContains)
    } else if prefix.ends_with("[contains(text(), ") {
        Some(TextRule::CaptionContains)
    } else if prefix.ends_with("td[text() = ") {
        Some(TextRule::CellEquals)
    } else {
        None
    }
}

/// Inverse of [`xpath_literal`], including its `concat()` form
fn parse_xpath_literal(literal: &str) -> Option<String> {
    let mut rest = literal
        .strip_prefix("concat(")
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(literal)
        .trim();
    let mut value = String::new();
    while let Some(quote) = rest.chars().next() {
        if quote != '"' && quote != '\'' {
            return None;
        }
        let end = rest[1..].find(quote)? + 1;
        value.push_str(&rest[1..end]);
        rest = rest[end + 1..].trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }
    Some(value)
}

/// Deterministic in-memory storefront.
///
/// Clones share state, so a test can keep a handle for inspection and
/// knob-twisting while page objects drive another.
#[derive(Debug, Clone)]
pub struct MockStorefront {
    id: SurfaceId,
    state: Arc<Mutex<StoreState>>,
    dialogs: DialogSlot,
}

impl Default for MockStorefront {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStorefront {
    /// Blank storefront with one registered account
    /// (`storefront_tester` / `storefront_tester`)
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SurfaceId::new(),
            state: Arc::new(Mutex::new(StoreState::new())),
            dialogs: DialogSlot::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace all behaviour knobs
    #[must_use]
    pub fn with_behavior(self, behavior: MockBehavior) -> Self {
        self.state().behavior = behavior;
        self
    }

    /// Deleted rows linger for `frames` observations
    #[must_use]
    pub fn with_removal_frames(self, frames: usize) -> Self {
        self.state().behavior.removal_frames = frames;
        self
    }

    /// Delete controls stop working
    #[must_use]
    pub fn with_stuck_removals(self) -> Self {
        self.state().behavior.stuck_removals = true;
        self
    }

    /// Login never completes
    #[must_use]
    pub fn with_login_never_completing(self) -> Self {
        self.state().behavior.login_never_completes = true;
        self
    }

    /// Confirmation details lack the order id
    #[must_use]
    pub fn with_malformed_confirmation(self) -> Self {
        self.state().behavior.malformed_confirmation = true;
        self
    }

    /// Register an additional account
    #[must_use]
    pub fn with_account(self, credentials: Credentials) -> Self {
        self.state().accounts.push(credentials);
        self
    }

    /// Serve under another base URL
    #[must_use]
    pub fn with_base_url(self, url: impl Into<String>) -> Self {
        self.state().base_url = url.into();
        self
    }

    /// Put products in the server-side cart
    pub fn seed_cart(&self, products: &[ProductInfo]) {
        let mut state = self.state();
        state.cart.extend(products.iter().map(|product| CartLine {
            product: *product,
            fading: None,
        }));
    }

    /// Add `product` to the cart once the `nth` removal has completed
    pub fn inject_on_removal(&self, nth: usize, product: ProductInfo) {
        self.state().injections.push((nth, product));
    }

    /// Names of the products in the cart, including rows still fading out
    #[must_use]
    pub fn cart_names(&self) -> Vec<String> {
        self.state()
            .cart
            .iter()
            .map(|line| line.product.name.to_string())
            .collect()
    }

    /// Completed removals
    #[must_use]
    pub fn removals(&self) -> usize {
        self.state().removals
    }

    /// Logged in account, if any
    #[must_use]
    pub fn logged_in_user(&self) -> Option<String> {
        self.state().user.clone()
    }

    /// Orders placed so far
    #[must_use]
    pub fn orders(&self) -> Vec<PlacedOrder> {
        self.state().orders.clone()
    }

    /// Dialogs that opened while nothing was armed to accept them
    #[must_use]
    pub fn unhandled_dialogs(&self) -> Vec<Dialog> {
        self.state().unhandled_dialogs.clone()
    }

    fn raise_dialog(&self, state: &mut StoreState, dialog: Dialog) {
        if self.dialogs.on_opened(dialog.clone()) == DialogAction::Pending {
            tracing::debug!(message = dialog.message(), "dialog left unhandled");
            state.unhandled_dialogs.push(dialog);
        }
    }

    fn observe(&self, selector: &SelectorExpr) -> Vec<Element> {
        let mut state = self.state();
        state.tick();
        let elements = identify(selector)
            .map(|target| state.elements(&target))
            .unwrap_or_default();
        state.arm_pending();
        elements
    }

    fn targeted(&self, locator: &Locator) -> StorefrontResult<Option<Element>> {
        let elements = self.observe(locator.selector());
        Ok(target_index(locator, elements.len())?.map(|i| elements[i].clone()))
    }

    fn act(&self, state: &mut StoreState, target: &Target, index: usize) {
        use LocatorKey as K;
        match target {
            Target::Static(key, _) => match *key {
                K::NavbarHome => state.navigate(Screen::Home),
                K::NavbarCart => state.navigate(Screen::Cart),
                K::NavbarLogin => state.login_modal = true,
                K::NavbarLogout => {
                    state.user = None;
                    state.navigate(Screen::Home);
                }
                K::CloseLoginModal => state.login_modal = false,
                K::LoginButton => self.submit_login(state),
                K::CategoryPhones => state.category = Some(Category::Phones),
                K::CategoryLaptops => state.category = Some(Category::Laptops),
                K::CategoryMonitors => state.category = Some(Category::Monitors),
                K::ProductList => {
                    if let Some(product) = state.visible_cards().get(index).copied() {
                        state.navigate(Screen::Product(product));
                    }
                }
                K::AddToCartButton => {
                    if let Screen::Product(product) = state.screen {
                        state.cart.push(CartLine {
                            product,
                            fading: None,
                        });
                        self.raise_dialog(state, Dialog::alert(PRODUCT_ADDED));
                    }
                }
                K::CartDeleteButton => state.start_removal(index),
                K::PlaceOrderButton => state.order_modal = true,
                K::CloseCheckoutButton => state.order_modal = false,
                K::PurchaseButton => self.submit_order(state),
                K::ConfirmOkButton => {
                    state.confirmation = None;
                    state.navigate(Screen::Home);
                }
                _ => {}
            },
            Target::Dynamic { key, param, rule } => match *key {
                DynamicKey::ProductCard => {
                    let cards: Vec<ProductInfo> = state
                        .visible_cards()
                        .into_iter()
                        .filter(|p| rule.matches(p, param))
                        .collect();
                    if let Some(product) = cards.get(index).copied() {
                        state.navigate(Screen::Product(product));
                    }
                }
                DynamicKey::CartDeleteButtonFor => {
                    let line_index = state
                        .cart
                        .iter()
                        .enumerate()
                        .filter(|(_, line)| rule.matches(&line.product, param))
                        .nth(index)
                        .map(|(i, _)| i);
                    if let Some(i) = line_index {
                        state.start_removal(i);
                    }
                }
                DynamicKey::CartProductName | DynamicKey::CartProductPrice => {}
            },
        }
    }

    fn submit_login(&self, state: &mut StoreState) {
        if state.behavior.login_never_completes {
            return;
        }
        let username = state
            .login_fields
            .get(&LocatorKey::UsernameInput)
            .cloned()
            .unwrap_or_default();
        let password = state
            .login_fields
            .get(&LocatorKey::PasswordInput)
            .cloned()
            .unwrap_or_default();
        let account = state.accounts.iter().find(|a| a.username == username).cloned();
        match account {
            Some(account) if account.password == password => {
                state.user = Some(username);
                state.login_modal = false;
                state.login_fields.clear();
            }
            Some(_) => self.raise_dialog(state, Dialog::alert("Wrong password.")),
            None => self.raise_dialog(state, Dialog::alert("User does not exist.")),
        }
    }

    fn submit_order(&self, state: &mut StoreState) {
        let field = |key| state.order_fields.get(&key).cloned().unwrap_or_default();
        let name = field(LocatorKey::NameInput);
        let card = field(LocatorKey::CreditCardInput);
        if name.is_empty() || card.is_empty() {
            self.raise_dialog(state, Dialog::alert("Please fill out Name and Creditcard."));
            return;
        }
        let amount = state.cart.iter().map(|line| line.product.price).sum::<f64>() as u64;
        let order = PlacedOrder {
            id: state.behavior.first_order_id + state.orders.len() as u64,
            amount,
            name,
            products: state
                .cart
                .iter()
                .map(|line| line.product.name.to_string())
                .collect(),
        };
        state.cart.clear();
        state.order_modal = false;
        state.orders.push(order.clone());
        state.confirmation = Some(order);
    }
}

#[async_trait]
impl StorefrontDriver for MockStorefront {
    fn surface_id(&self) -> SurfaceId {
        self.id
    }

    async fn goto(&self, url: &str) -> StorefrontResult<()> {
        let mut state = self.state();
        let Some(path) = url.strip_prefix(state.base_url.as_str()) else {
            return Err(StorefrontError::Navigation {
                url: url.to_string(),
                message: "host not served by this storefront".to_string(),
            });
        };
        let screen = if path.starts_with("cart.html") {
            Screen::Cart
        } else {
            Screen::Home
        };
        state.navigate(screen);
        Ok(())
    }

    async fn current_url(&self) -> StorefrontResult<String> {
        Ok(self.state().url())
    }

    async fn go_back(&self) -> StorefrontResult<()> {
        let mut state = self.state();
        if let Some(previous) = state.history.pop() {
            state.enter(previous);
        }
        Ok(())
    }

    async fn load_state(&self) -> StorefrontResult<LoadState> {
        let mut state = self.state();
        state.tick();
        state.arm_pending();
        Ok(state.load_state)
    }

    async fn count(&self, selector: &SelectorExpr) -> StorefrontResult<usize> {
        Ok(self.observe(selector).len())
    }

    async fn is_visible(&self, locator: &Locator) -> StorefrontResult<bool> {
        Ok(self.targeted(locator)?.is_some_and(|element| element.visible))
    }

    async fn click(&self, locator: &Locator) -> StorefrontResult<()> {
        let mut state = self.state();
        let target = identify(locator.selector());
        let elements = target
            .as_ref()
            .map(|t| state.elements(t))
            .unwrap_or_default();
        let index = require_target(locator, elements.len())?;
        if !elements[index].visible {
            return Err(StorefrontError::driver(format!("{locator} is not visible")));
        }
        if let Some(target) = target {
            tracing::trace!(%locator, index, "mock click");
            self.act(&mut state, &target, index);
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> StorefrontResult<()> {
        use LocatorKey as K;
        let mut state = self.state();
        let target = identify(locator.selector());
        let elements = target
            .as_ref()
            .map(|t| state.elements(t))
            .unwrap_or_default();
        let index = require_target(locator, elements.len())?;
        if !elements[index].visible {
            return Err(StorefrontError::driver(format!("{locator} is not visible")));
        }
        match target {
            Some(Target::Static(key @ (K::UsernameInput | K::PasswordInput), _)) => {
                state.login_fields.insert(key, value.to_string());
            }
            Some(Target::Static(
                key @ (K::NameInput
                | K::CountryInput
                | K::CityInput
                | K::CreditCardInput
                | K::MonthInput
                | K::YearInput),
                _,
            )) => {
                state.order_fields.insert(key, value.to_string());
            }
            _ => {
                return Err(StorefrontError::driver(format!("{locator} is not an input")));
            }
        }
        Ok(())
    }

    async fn text_content(&self, locator: &Locator) -> StorefrontResult<Option<String>> {
        Ok(self.targeted(locator)?.map(|element| element.text))
    }

    async fn all_text_contents(&self, selector: &SelectorExpr) -> StorefrontResult<Vec<String>> {
        Ok(self
            .observe(selector)
            .into_iter()
            .map(|element| element.text)
            .collect())
    }

    async fn arm_dialog_acceptance(&self) -> StorefrontResult<()> {
        self.dialogs.arm();
        Ok(())
    }

    async fn disarm_dialog_acceptance(&self) -> StorefrontResult<()> {
        self.dialogs.disarm();
        Ok(())
    }

    async fn take_dialog(&self) -> StorefrontResult<Option<Dialog>> {
        Ok(self.dialogs.take())
    }

    async fn screenshot(&self) -> StorefrontResult<Screenshot> {
        Ok(Screenshot::new(PIXEL_PNG.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(family: PageFamily, dialect: SelectorDialect, mock: &MockStorefront) -> LocatorRegistry {
        LocatorRegistry::bind(family, dialect, mock.surface_id())
    }

    async fn open_home(mock: &MockStorefront) {
        mock.goto(MOCK_BASE_URL).await.unwrap();
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test]
        async fn test_blank_until_navigated() {
            let mock = MockStorefront::new();
            let navbar = registry(PageFamily::Common, SelectorDialect::Short, &mock)
                .resolve(LocatorKey::NavbarCart)
                .unwrap();
            assert!(!mock.is_visible(&navbar).await.unwrap());
            open_home(&mock).await;
            assert!(mock.is_visible(&navbar).await.unwrap());
        }

        #[tokio::test]
        async fn test_load_state_progresses_per_observation() {
            let mock = MockStorefront::new();
            open_home(&mock).await;
            assert_eq!(mock.load_state().await.unwrap(), LoadState::DomContentLoaded);
            assert_eq!(mock.load_state().await.unwrap(), LoadState::Load);
            assert_eq!(mock.load_state().await.unwrap(), LoadState::NetworkIdle);
        }

        #[tokio::test]
        async fn test_foreign_host_is_a_navigation_error() {
            let mock = MockStorefront::new();
            let err = mock.goto("https://example.org/").await.unwrap_err();
            assert!(matches!(err, StorefrontError::Navigation { .. }));
        }

        #[tokio::test]
        async fn test_urls() {
            let mock = MockStorefront::new();
            mock.goto(&format!("{MOCK_BASE_URL}cart.html")).await.unwrap();
            assert!(mock.current_url().await.unwrap().ends_with("cart.html"));
            mock.go_back().await.unwrap();
            assert!(mock.current_url().await.unwrap().ends_with("cart.html"));
        }
    }

    mod selector_tests {
        use super::*;

        #[tokio::test]
        async fn test_both_dialects_see_the_same_cart() {
            let mock = MockStorefront::new();
            mock.seed_cart(&[ProductInfo::MACBOOK_PRO, ProductInfo::SAMSUNG_GALAXY_S6]);
            mock.goto(&format!("{MOCK_BASE_URL}cart.html")).await.unwrap();
            for dialect in [SelectorDialect::Short, SelectorDialect::Structural] {
                let cart = registry(PageFamily::Cart, dialect, &mock);
                let rows = cart.resolve(LocatorKey::CartRow).unwrap();
                assert_eq!(mock.count(rows.selector()).await.unwrap(), 2);
                let price = cart
                    .resolve_with(DynamicKey::CartProductPrice, "MacBook Pro")
                    .unwrap();
                assert_eq!(mock.text_content(&price).await.unwrap().as_deref(), Some("1100"));
            }
        }

        #[tokio::test]
        async fn test_unknown_selector_matches_nothing() {
            let mock = MockStorefront::new();
            open_home(&mock).await;
            let locator = Locator::new("banner", SelectorExpr::css("#carouselExampleIndicators"));
            assert_eq!(mock.count(locator.selector()).await.unwrap(), 0);
            assert!(matches!(
                mock.click(&locator).await,
                Err(StorefrontError::ElementNotFound { .. })
            ));
        }

        #[tokio::test]
        async fn test_strict_locator_over_duplicates_is_ambiguous() {
            let mock = MockStorefront::new();
            mock.seed_cart(&[ProductInfo::MACBOOK_PRO, ProductInfo::MACBOOK_PRO]);
            mock.goto(&format!("{MOCK_BASE_URL}cart.html")).await.unwrap();
            let rows = registry(PageFamily::Cart, SelectorDialect::Short, &mock)
                .resolve(LocatorKey::CartRow)
                .unwrap()
                .with_policy(crate::locator::MatchPolicy::Strict);
            assert!(matches!(
                mock.is_visible(&rows).await,
                Err(StorefrontError::AmbiguousMatch { count: 2, .. })
            ));
        }
    }

    mod dynamic_key_tests {
        use super::*;

        const PARAMS: [&str; 5] = ["MacBook", "700", "Samsung galaxy s6", "O'Brien \"Jr\"", "Nokia"];

        #[test]
        fn test_parameter_round_trips_through_every_dynamic_selector() {
            for registry in all_registries() {
                for key in registry.dynamic_keys() {
                    for param in PARAMS {
                        let locator = registry.resolve_with(key, param).unwrap();
                        match identify(locator.selector()) {
                            Some(Target::Dynamic {
                                key: found,
                                param: read,
                                ..
                            }) => {
                                assert_eq!(found, key);
                                assert_eq!(read, param, "{locator}");
                            }
                            other => panic!("{locator} identified as {other:?}"),
                        }
                    }
                }
            }
        }

        #[test]
        fn test_dialects_apply_the_same_text_rule() {
            let surface = SurfaceId::new();
            for family in PageFamily::ALL {
                let short = LocatorRegistry::bind(family, SelectorDialect::Short, surface);
                let structural = LocatorRegistry::bind(family, SelectorDialect::Structural, surface);
                for key in short.dynamic_keys() {
                    let rule_of = |registry: &LocatorRegistry| {
                        let locator = registry.resolve_with(key, "MacBook").unwrap();
                        match identify(locator.selector()) {
                            Some(Target::Dynamic { rule, .. }) => rule,
                            other => panic!("{locator} identified as {other:?}"),
                        }
                    };
                    assert_eq!(rule_of(&short), rule_of(&structural), "{family:?} {key}");
                }
            }
        }

        #[tokio::test]
        async fn test_dialects_select_the_same_rows() {
            let mock = MockStorefront::new();
            mock.seed_cart(&[
                ProductInfo::SAMSUNG_GALAXY_S6,
                ProductInfo::MACBOOK_AIR,
                ProductInfo::MACBOOK_PRO,
            ]);
            mock.goto(&format!("{MOCK_BASE_URL}cart.html")).await.unwrap();
            let short = registry(PageFamily::Cart, SelectorDialect::Short, &mock);
            let structural = registry(PageFamily::Cart, SelectorDialect::Structural, &mock);
            for key in short.dynamic_keys() {
                for param in PARAMS {
                    let a = short.resolve_with(key, param).unwrap();
                    let b = structural.resolve_with(key, param).unwrap();
                    assert_eq!(
                        mock.all_text_contents(a.selector()).await.unwrap(),
                        mock.all_text_contents(b.selector()).await.unwrap(),
                        "{key} with {param:?}"
                    );
                }
            }

            let by_price = structural
                .resolve_with(DynamicKey::CartDeleteButtonFor, "700")
                .unwrap();
            assert_eq!(mock.count(by_price.selector()).await.unwrap(), 1);
        }

        #[test]
        fn test_exact_cell_predicate_is_read_as_equality() {
            let selector = SelectorExpr::xpath(format!(
                "//tbody[@id='tbodyid']//td[text() = {}]/following-sibling::td//a",
                xpath_literal("MacBook")
            ));
            let template = SelectorExpr::xpath(format!(
                "//tbody[@id='tbodyid']//td[text() = {}]/following-sibling::td//a",
                xpath_literal(PARAM_MARK)
            ));
            let (param, rule) = read_dynamic(&template, &selector).unwrap();
            assert_eq!(param, "MacBook");
            assert_eq!(rule, TextRule::CellEquals);
            assert!(!rule.matches(&ProductInfo::MACBOOK_AIR, "MacBook"));
            assert!(rule.matches(&ProductInfo::MACBOOK_AIR, "700"));
            assert!(TextRule::RowContains.matches(&ProductInfo::MACBOOK_AIR, "MacBook"));
        }
    }

    mod cart_tests {
        use super::*;

        async fn delete_first(mock: &MockStorefront) {
            let delete = registry(PageFamily::Cart, SelectorDialect::Structural, mock)
                .resolve(LocatorKey::CartDeleteButton)
                .unwrap();
            mock.click(&delete).await.unwrap();
        }

        async fn row_count(mock: &MockStorefront) -> usize {
            let rows = registry(PageFamily::Cart, SelectorDialect::Structural, mock)
                .resolve(LocatorKey::CartRow)
                .unwrap();
            mock.count(rows.selector()).await.unwrap()
        }

        #[tokio::test]
        async fn test_fading_row_lingers_for_frames() {
            let mock = MockStorefront::new().with_removal_frames(2);
            mock.seed_cart(&[ProductInfo::SONY_VAIO_I5]);
            mock.goto(&format!("{MOCK_BASE_URL}cart.html")).await.unwrap();
            delete_first(&mock).await;
            assert_eq!(row_count(&mock).await, 1);
            assert_eq!(row_count(&mock).await, 0);
            assert_eq!(mock.removals(), 1);
        }

        #[tokio::test]
        async fn test_injection_appears_after_removal_is_observed() {
            let mock = MockStorefront::new();
            mock.seed_cart(&[ProductInfo::SONY_VAIO_I5, ProductInfo::MACBOOK_AIR]);
            mock.inject_on_removal(1, ProductInfo::APPLE_MONITOR_24);
            mock.goto(&format!("{MOCK_BASE_URL}cart.html")).await.unwrap();
            delete_first(&mock).await;
            assert_eq!(row_count(&mock).await, 1);
            assert_eq!(row_count(&mock).await, 2);
            assert_eq!(mock.cart_names(), vec!["MacBook air", "Apple monitor 24"]);
        }

        #[tokio::test]
        async fn test_stuck_removal_keeps_row() {
            let mock = MockStorefront::new().with_stuck_removals();
            mock.seed_cart(&[ProductInfo::SONY_VAIO_I5]);
            mock.goto(&format!("{MOCK_BASE_URL}cart.html")).await.unwrap();
            delete_first(&mock).await;
            assert_eq!(row_count(&mock).await, 1);
            assert_eq!(mock.removals(), 0);
        }
    }

    mod dialog_tests {
        use super::*;

        #[tokio::test]
        async fn test_add_to_cart_alert_goes_to_armed_slot() {
            let mock = MockStorefront::new();
            open_home(&mock).await;
            let home = registry(PageFamily::Home, SelectorDialect::Short, &mock);
            let card = home.resolve_with(DynamicKey::ProductCard, "Sony vaio i5").unwrap();
            mock.click(&card).await.unwrap();
            let add = home.resolve(LocatorKey::AddToCartButton).unwrap();

            mock.click(&add).await.unwrap();
            assert_eq!(mock.unhandled_dialogs().len(), 1);

            mock.arm_dialog_acceptance().await.unwrap();
            mock.click(&add).await.unwrap();
            let dialog = mock.take_dialog().await.unwrap().unwrap();
            assert_eq!(dialog.message(), PRODUCT_ADDED);
            assert_eq!(mock.cart_names().len(), 2);
        }
    }
}
