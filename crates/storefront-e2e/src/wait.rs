//! Synchronization primitives.
//!
//! Every wait polls a condition against the live surface and yields to the
//! runtime between polls. Nothing here sleeps for a fixed amount of time
//! expecting the page to be ready afterwards. A wait that expires reports
//! what it waited for, the timeout, and the last value it observed.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::driver::Surface;
use crate::locator::Locator;
use crate::result::{StorefrontError, StorefrontResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// LOAD STATE
// =============================================================================

/// Page load states, ordered by how far loading has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LoadState {
    /// Nothing usable yet
    #[default]
    Loading,
    /// `DOMContentLoaded` has fired
    DomContentLoaded,
    /// `load` has fired
    Load,
    /// No network activity after `load`
    NetworkIdle,
}

impl LoadState {
    /// Get the event name for this load state
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::Load => "load",
            Self::NetworkIdle => "networkidle",
        }
    }

    /// Whether having reached `self` satisfies a wait for `wanted`
    #[must_use]
    pub fn satisfies(self, wanted: Self) -> bool {
        self >= wanted
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds, used when a wait passes no explicit timeout
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// COUNT PREDICATE
// =============================================================================

/// Condition on the number of elements matching a locator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountPredicate {
    /// Exactly n matches
    Exactly(usize),
    /// At least n matches
    AtLeast(usize),
    /// At most n matches
    AtMost(usize),
    /// No matches
    Zero,
}

impl CountPredicate {
    /// Check an observed count
    #[must_use]
    pub const fn holds(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::AtLeast(n) => count >= n,
            Self::AtMost(n) => count <= n,
            Self::Zero => count == 0,
        }
    }
}

impl fmt::Display for CountPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "exactly {n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
            Self::AtMost(n) => write!(f, "at most {n}"),
            Self::Zero => write!(f, "zero"),
        }
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

impl WaitResult {
    /// Create a successful wait result
    #[must_use]
    pub fn success(elapsed: Duration, waited_for: impl Into<String>) -> Self {
        Self {
            elapsed,
            waited_for: waited_for.into(),
        }
    }
}

/// Outcome of one poll of a condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    /// Condition holds
    Ready(T),
    /// Condition does not hold yet; carries a description of what was seen
    Pending(String),
}

// =============================================================================
// WAITER IMPLEMENTATION
// =============================================================================

/// Waiter for synchronization operations on one surface
#[derive(Debug, Clone)]
pub struct Waiter {
    surface: Surface,
    options: WaitOptions,
}

impl Waiter {
    /// Create a waiter for a surface
    #[must_use]
    pub const fn new(surface: Surface, options: WaitOptions) -> Self {
        Self { surface, options }
    }

    /// Default options
    #[must_use]
    pub const fn options(&self) -> WaitOptions {
        self.options
    }

    /// Surface this waiter observes
    #[must_use]
    pub const fn surface(&self) -> &Surface {
        &self.surface
    }

    fn resolve_timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or_else(|| self.options.timeout())
    }

    /// Poll `probe` until it is ready or `timeout` elapses.
    ///
    /// Probe errors abort the wait immediately.
    pub async fn poll_until<T, F, Fut>(
        &self,
        waited_for: impl Into<String>,
        timeout: Option<Duration>,
        mut probe: F,
    ) -> StorefrontResult<(T, WaitResult)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorefrontResult<Poll<T>>>,
    {
        let waited_for = waited_for.into();
        let timeout = self.resolve_timeout(timeout);
        let start = Instant::now();

        loop {
            let last_observed = match probe().await? {
                Poll::Ready(value) => {
                    let result = WaitResult::success(start.elapsed(), waited_for);
                    tracing::trace!(
                        waited_for = %result.waited_for,
                        elapsed_ms = result.elapsed.as_millis() as u64,
                        "wait satisfied"
                    );
                    return Ok((value, result));
                }
                Poll::Pending(observed) => observed,
            };

            if start.elapsed() >= timeout {
                tracing::debug!(%waited_for, %last_observed, "wait timed out");
                return Err(StorefrontError::WaitTimeout {
                    waited_for,
                    timeout_ms: timeout.as_millis() as u64,
                    last_observed,
                });
            }
            tokio::time::sleep(self.options.poll_interval()).await;
        }
    }

    /// Wait until the targeted element is visible
    pub async fn wait_visible(
        &self,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> StorefrontResult<WaitResult> {
        let driver = self.surface.driver();
        self.poll_until(format!("{locator} to be visible"), timeout, || async move {
            Ok(if driver.is_visible(locator).await? {
                Poll::Ready(())
            } else {
                Poll::Pending("not visible".to_string())
            })
        })
        .await
        .map(|(_, result)| result)
    }

    /// Wait until the targeted element is hidden or detached
    pub async fn wait_hidden(
        &self,
        locator: &Locator,
        timeout: Option<Duration>,
    ) -> StorefrontResult<WaitResult> {
        let driver = self.surface.driver();
        self.poll_until(format!("{locator} to be hidden"), timeout, || async move {
            Ok(if driver.is_visible(locator).await? {
                Poll::Pending("visible".to_string())
            } else {
                Poll::Ready(())
            })
        })
        .await
        .map(|(_, result)| result)
    }

    /// Wait until the number of matches satisfies a predicate.
    ///
    /// Returns the count that satisfied it.
    pub async fn wait_count(
        &self,
        locator: &Locator,
        predicate: CountPredicate,
        timeout: Option<Duration>,
    ) -> StorefrontResult<usize> {
        let driver = self.surface.driver();
        let selector = locator.selector();
        self.poll_until(
            format!("{locator} count to be {predicate}"),
            timeout,
            || async move {
                let count = driver.count(selector).await?;
                Ok(if predicate.holds(count) {
                    Poll::Ready(count)
                } else {
                    Poll::Pending(format!("{count} element(s)"))
                })
            },
        )
        .await
        .map(|(count, _)| count)
    }

    /// Wait until the document reaches a load state
    pub async fn wait_load_state(
        &self,
        state: LoadState,
        timeout: Option<Duration>,
    ) -> StorefrontResult<WaitResult> {
        let driver = self.surface.driver();
        self.poll_until(format!("load state {state}"), timeout, || async move {
            let current = driver.load_state().await?;
            Ok(if current.satisfies(state) {
                Poll::Ready(())
            } else {
                Poll::Pending(current.to_string())
            })
        })
        .await
        .map(|(_, result)| result)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::SelectorExpr;
    use crate::mock::MockStorefront;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn waiter(mock: &MockStorefront) -> Waiter {
        Waiter::new(
            Surface::new(mock.clone()),
            WaitOptions::new().with_timeout(200).with_poll_interval(5),
        )
    }

    mod load_state_tests {
        use super::*;

        #[test]
        fn test_load_state_ordering() {
            assert!(LoadState::Load.satisfies(LoadState::DomContentLoaded));
            assert!(LoadState::NetworkIdle.satisfies(LoadState::Load));
            assert!(!LoadState::DomContentLoaded.satisfies(LoadState::Load));
            assert!(!LoadState::Loading.satisfies(LoadState::DomContentLoaded));
        }

        #[test]
        fn test_load_state_display() {
            assert_eq!(LoadState::DomContentLoaded.to_string(), "DOMContentLoaded");
            assert_eq!(LoadState::NetworkIdle.to_string(), "networkidle");
        }
    }

    mod options_tests {
        use super::*;

        #[test]
        fn test_wait_options_default() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
            assert_eq!(opts.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        }

        #[test]
        fn test_wait_options_chained() {
            let opts = WaitOptions::new().with_timeout(750).with_poll_interval(10);
            assert_eq!(opts.timeout(), Duration::from_millis(750));
            assert_eq!(opts.poll_interval(), Duration::from_millis(10));
        }
    }

    mod predicate_tests {
        use super::*;

        #[test]
        fn test_predicates() {
            assert!(CountPredicate::Exactly(2).holds(2));
            assert!(!CountPredicate::Exactly(2).holds(3));
            assert!(CountPredicate::AtLeast(1).holds(4));
            assert!(CountPredicate::AtMost(1).holds(0));
            assert!(CountPredicate::Zero.holds(0));
            assert!(!CountPredicate::Zero.holds(1));
        }

        #[test]
        fn test_predicate_display() {
            assert_eq!(CountPredicate::Exactly(3).to_string(), "exactly 3");
            assert_eq!(CountPredicate::Zero.to_string(), "zero");
        }
    }

    mod waiter_tests {
        use super::*;

        #[tokio::test]
        async fn test_poll_until_ready_after_some_polls() {
            let mock = MockStorefront::new();
            let w = waiter(&mock);
            let polls = AtomicUsize::new(0);
            let (value, result) = w
                .poll_until("third poll", None, || {
                    let n = polls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        Ok(if n >= 2 {
                            Poll::Ready(n)
                        } else {
                            Poll::Pending(format!("poll {n}"))
                        })
                    }
                })
                .await
                .unwrap();
            assert_eq!(value, 2);
            assert_eq!(result.waited_for, "third poll");
        }

        #[tokio::test]
        async fn test_poll_until_reports_last_observation() {
            let mock = MockStorefront::new();
            let w = waiter(&mock);
            let err = w
                .poll_until("never", Some(Duration::from_millis(20)), || async {
                    Ok(Poll::<()>::Pending("still nothing".to_string()))
                })
                .await
                .unwrap_err();
            match err {
                StorefrontError::WaitTimeout {
                    waited_for,
                    timeout_ms,
                    last_observed,
                } => {
                    assert_eq!(waited_for, "never");
                    assert_eq!(timeout_ms, 20);
                    assert_eq!(last_observed, "still nothing");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn test_probe_error_aborts_wait() {
            let mock = MockStorefront::new();
            let w = waiter(&mock);
            let err = w
                .poll_until("broken", None, || async {
                    Err::<Poll<()>, _>(StorefrontError::driver("socket closed"))
                })
                .await
                .unwrap_err();
            assert!(matches!(err, StorefrontError::Driver { .. }));
        }

        #[tokio::test]
        async fn test_wait_visible_timeout_names_locator() {
            let mock = MockStorefront::new();
            let w = waiter(&mock);
            let locator = Locator::new("welcomeMessage", SelectorExpr::css("a#nameofuser"));
            let err = w
                .wait_visible(&locator, Some(Duration::from_millis(15)))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("welcomeMessage"));
        }

        #[tokio::test]
        async fn test_wait_hidden_on_absent_element() {
            let mock = MockStorefront::new();
            let w = waiter(&mock);
            let locator = Locator::new("loginModal", SelectorExpr::css("#logInModal"));
            assert!(w.wait_hidden(&locator, None).await.is_ok());
        }

        #[tokio::test]
        async fn test_wait_count_zero_on_empty_cart() {
            let mock = MockStorefront::new();
            let w = waiter(&mock);
            let locator = Locator::new("cartRow", SelectorExpr::css("#tbodyid tr")).first();
            let count = w.wait_count(&locator, CountPredicate::Zero, None).await.unwrap();
            assert_eq!(count, 0);
        }

        #[tokio::test]
        async fn test_wait_load_state_after_navigation() {
            let mock = MockStorefront::new();
            let w = waiter(&mock);
            w.surface()
                .driver()
                .goto("https://www.demoblaze.com/")
                .await
                .unwrap();
            assert!(w
                .wait_load_state(LoadState::DomContentLoaded, None)
                .await
                .is_ok());
        }
    }
}
