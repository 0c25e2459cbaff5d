//! Selector expressions and locators.
//!
//! A [`SelectorExpr`] is a tagged variant over the two selector dialects the
//! storefront has been tested with: short CSS-like selectors (optionally
//! filtered by text, optionally descending into children) and structural
//! XPath selectors. A [`Locator`] pairs an expression with a [`MatchPolicy`]
//! and a human-readable label used in logs and timeout messages.
//!
//! Drivers execute both dialects through one function:
//! [`SelectorExpr::to_query_all`] produces a JavaScript expression that
//! evaluates to the array of matching elements.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which selector dialect a registry resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorDialect {
    /// CSS selectors with an optional text filter
    #[default]
    Short,
    /// XPath selectors
    Structural,
}

impl fmt::Display for SelectorDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short => write!(f, "short"),
            Self::Structural => write!(f, "structural"),
        }
    }
}

/// A selector in one of the two supported dialects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SelectorExpr {
    /// CSS selector, optionally narrowed by contained text and then by a
    /// descendant CSS selector evaluated inside every surviving element
    Short {
        /// Base CSS selector
        css: String,
        /// Keep only elements whose text contains this value
        has_text: Option<String>,
        /// Descend into each surviving element with this CSS selector
        descendant: Option<String>,
    },
    /// XPath selector
    Structural {
        /// XPath expression
        xpath: String,
    },
}

impl SelectorExpr {
    /// Create a plain CSS selector
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self::Short {
            css: css.into(),
            has_text: None,
            descendant: None,
        }
    }

    /// Create a CSS selector filtered by contained text
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Short {
            css: css.into(),
            has_text: Some(text.into()),
            descendant: None,
        }
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(xpath: impl Into<String>) -> Self {
        Self::Structural {
            xpath: xpath.into(),
        }
    }

    /// Narrow a short selector to descendants matching `css`.
    ///
    /// Structural selectors express descent in the path itself, so they are
    /// returned unchanged.
    #[must_use]
    pub fn descendant(self, css: impl Into<String>) -> Self {
        match self {
            Self::Short { css: base, has_text, .. } => Self::Short {
                css: base,
                has_text,
                descendant: Some(css.into()),
            },
            other => other,
        }
    }

    /// Dialect of this expression
    #[must_use]
    pub const fn dialect(&self) -> SelectorDialect {
        match self {
            Self::Short { .. } => SelectorDialect::Short,
            Self::Structural { .. } => SelectorDialect::Structural,
        }
    }

    /// JavaScript expression evaluating to an array of matching elements
    #[must_use]
    pub fn to_query_all(&self) -> String {
        match self {
            Self::Short {
                css,
                has_text,
                descendant,
            } => {
                let mut query = format!("Array.from(document.querySelectorAll({}))", js_string(css));
                if let Some(text) = has_text {
                    query.push_str(&format!(
                        ".filter(el => (el.textContent || '').includes({}))",
                        js_string(text)
                    ));
                }
                if let Some(child) = descendant {
                    query.push_str(&format!(
                        ".flatMap(el => Array.from(el.querySelectorAll({})))",
                        js_string(child)
                    ));
                }
                query
            }
            Self::Structural { xpath } => format!(
                "(() => {{ const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 return Array.from({{ length: r.snapshotLength }}, (_, i) => r.snapshotItem(i)); }})()",
                js_string(xpath)
            ),
        }
    }
}

impl fmt::Display for SelectorExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short {
                css,
                has_text,
                descendant,
            } => {
                write!(f, "{css}")?;
                if let Some(text) = has_text {
                    write!(f, ":has-text({text:?})")?;
                }
                if let Some(child) = descendant {
                    write!(f, " >> {child}")?;
                }
                Ok(())
            }
            Self::Structural { xpath } => write!(f, "{xpath}"),
        }
    }
}

/// Which of the matched elements an action or visibility check targets.
///
/// Counting always counts every match regardless of the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MatchPolicy {
    /// The first match in document order
    First,
    /// The n-th match (zero based) in document order
    Nth(usize),
    /// Exactly one element must match
    #[default]
    Strict,
}

impl MatchPolicy {
    /// Index into the match list this policy selects, given the match count.
    ///
    /// `Err(count)` means a strict policy saw more than one element.
    pub const fn pick(self, count: usize) -> Result<Option<usize>, usize> {
        match self {
            Self::First => Ok(if count > 0 { Some(0) } else { None }),
            Self::Nth(n) => Ok(if n < count { Some(n) } else { None }),
            Self::Strict => match count {
                0 => Ok(None),
                1 => Ok(Some(0)),
                n => Err(n),
            },
        }
    }

    /// JavaScript expression picking the element from an array named `els`
    #[must_use]
    pub fn to_js_pick(self) -> String {
        match self {
            Self::First => "(els.length > 0 ? els[0] : null)".to_string(),
            Self::Nth(n) => format!("(els.length > {n} ? els[{n}] : null)"),
            Self::Strict => "(els.length === 1 ? els[0] : null)".to_string(),
        }
    }
}

/// A resolved, policy-carrying selector ready for the driver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    selector: SelectorExpr,
    policy: MatchPolicy,
    label: String,
}

impl Locator {
    /// Create a locator with the default strict policy
    #[must_use]
    pub fn new(label: impl Into<String>, selector: SelectorExpr) -> Self {
        Self {
            selector,
            policy: MatchPolicy::default(),
            label: label.into(),
        }
    }

    /// Set the match policy
    #[must_use]
    pub const fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Target the first match
    #[must_use]
    pub const fn first(self) -> Self {
        self.with_policy(MatchPolicy::First)
    }

    /// Target the n-th match
    #[must_use]
    pub const fn nth(self, n: usize) -> Self {
        self.with_policy(MatchPolicy::Nth(n))
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &SelectorExpr {
        &self.selector
    }

    /// Get the match policy
    #[must_use]
    pub const fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Get the semantic label
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.selector)?;
        match self.policy {
            MatchPolicy::Strict => Ok(()),
            MatchPolicy::First => write!(f, "[first]"),
            MatchPolicy::Nth(n) => write!(f, "[{n}]"),
        }
    }
}

/// Encode a value as a JavaScript string literal
#[must_use]
pub fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Encode a value as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so values holding both quote kinds are
/// spliced together with `concat()`.
#[must_use]
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    let parts: Vec<String> = value
        .split('"')
        .map(|part| format!("\"{part}\""))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_css_query() {
            let query = SelectorExpr::css("a#cartur").to_query_all();
            assert!(query.contains("querySelectorAll(\"a#cartur\")"));
            assert!(!query.contains("filter"));
        }

        #[test]
        fn test_css_with_text_query() {
            let query = SelectorExpr::css_with_text("a", "Phones").to_query_all();
            assert!(query.contains(".filter("));
            assert!(query.contains("\"Phones\""));
        }

        #[test]
        fn test_descendant_query() {
            let query = SelectorExpr::css_with_text("#tbodyid tr", "MacBook Pro")
                .descendant("td:nth-child(3)")
                .to_query_all();
            assert!(query.contains(".flatMap("));
            assert!(query.contains("td:nth-child(3)"));
        }

        #[test]
        fn test_descendant_leaves_structural_untouched() {
            let expr = SelectorExpr::xpath("//h2[@class='name']");
            assert_eq!(expr.clone().descendant("td"), expr);
        }

        #[test]
        fn test_xpath_query() {
            let query = SelectorExpr::xpath("//a[@id='login2']").to_query_all();
            assert!(query.contains("document.evaluate"));
            assert!(query.contains("ORDERED_NODE_SNAPSHOT_TYPE"));
        }

        #[test]
        fn test_text_is_escaped_in_query() {
            let query = SelectorExpr::css_with_text("a", "say \"hi\"\n").to_query_all();
            assert!(query.contains(r#""say \"hi\"\n""#));
        }

        #[test]
        fn test_dialect() {
            assert_eq!(SelectorExpr::css("a").dialect(), SelectorDialect::Short);
            assert_eq!(
                SelectorExpr::xpath("//a").dialect(),
                SelectorDialect::Structural
            );
        }

        #[test]
        fn test_display() {
            let expr = SelectorExpr::css_with_text("button", "Log in");
            assert_eq!(expr.to_string(), "button:has-text(\"Log in\")");
        }
    }

    mod policy_tests {
        use super::*;

        #[test]
        fn test_first() {
            assert_eq!(MatchPolicy::First.pick(0), Ok(None));
            assert_eq!(MatchPolicy::First.pick(3), Ok(Some(0)));
        }

        #[test]
        fn test_nth() {
            assert_eq!(MatchPolicy::Nth(1).pick(1), Ok(None));
            assert_eq!(MatchPolicy::Nth(1).pick(2), Ok(Some(1)));
        }

        #[test]
        fn test_strict() {
            assert_eq!(MatchPolicy::Strict.pick(0), Ok(None));
            assert_eq!(MatchPolicy::Strict.pick(1), Ok(Some(0)));
            assert_eq!(MatchPolicy::Strict.pick(2), Err(2));
        }

        #[test]
        fn test_js_pick() {
            assert!(MatchPolicy::Nth(1).to_js_pick().contains("els[1]"));
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_default_policy_is_strict() {
            let locator = Locator::new("navbarCart", SelectorExpr::css("a#cartur"));
            assert_eq!(locator.policy(), MatchPolicy::Strict);
        }

        #[test]
        fn test_display_includes_label_and_policy() {
            let locator =
                Locator::new("loginButton", SelectorExpr::css_with_text("button", "Log in")).nth(1);
            let text = locator.to_string();
            assert!(text.starts_with("loginButton ("));
            assert!(text.ends_with("[1]"));
        }
    }

    mod escaping_tests {
        use super::*;
        use proptest::prelude::*;

        #[test]
        fn test_xpath_literal_plain() {
            assert_eq!(xpath_literal("MacBook Pro"), "\"MacBook Pro\"");
        }

        #[test]
        fn test_xpath_literal_double_quote() {
            assert_eq!(xpath_literal("24\" monitor"), "'24\" monitor'");
        }

        #[test]
        fn test_xpath_literal_both_quotes() {
            assert_eq!(
                xpath_literal("it's 24\""),
                "concat(\"it's 24\", '\"', \"\")"
            );
        }

        proptest! {
            #[test]
            fn prop_js_string_round_trips(s in ".*") {
                let encoded = js_string(&s);
                let decoded: String = serde_json::from_str(&encoded).unwrap();
                prop_assert_eq!(decoded, s);
            }

            #[test]
            fn prop_xpath_literal_never_breaks_out(s in "[a-zA-Z0-9 '\"]{0,24}") {
                let lit = xpath_literal(&s);
                if lit.starts_with("concat(") {
                    prop_assert!(s.contains('"') && s.contains('\''));
                } else {
                    let quote = lit.chars().next().unwrap();
                    let inner = &lit[1..lit.len() - 1];
                    prop_assert!(!inner.contains(quote));
                    prop_assert_eq!(inner, s.as_str());
                }
            }
        }
    }
}
