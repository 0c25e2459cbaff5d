//! Soft assertions.
//!
//! Collect several verification failures in one scenario without stopping
//! it. Page-level `verify_*` operations record into a [`SoftAssertions`]
//! collector; the scenario calls [`SoftAssertions::verify`] at its end.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Instant;

use crate::result::ExtractionMismatch;

/// A single assertion failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionFailure {
    /// Message describing the failure
    pub message: String,
    /// Timestamp when the failure occurred
    #[serde(skip)]
    pub timestamp: Option<Instant>,
    /// Index of this assertion in the sequence
    pub index: usize,
}

impl AssertionFailure {
    /// Create a new assertion failure
    #[must_use]
    pub fn new(message: impl Into<String>, index: usize) -> Self {
        Self {
            message: message.into(),
            timestamp: Some(Instant::now()),
            index,
        }
    }
}

/// Soft assertions collector
///
/// ## Example
///
/// ```
/// use storefront_e2e::assertion::SoftAssertions;
///
/// let mut soft = SoftAssertions::new();
/// soft.assert_eq(&360.0, &320.0, "price of Samsung galaxy s6");
/// soft.assert_true(false, "cart is empty");
/// assert_eq!(soft.failure_count(), 2);
/// assert!(soft.verify().is_err());
/// ```
#[derive(Debug, Default)]
pub struct SoftAssertions {
    failures: Vec<AssertionFailure>,
    assertion_count: usize,
}

impl SoftAssertions {
    /// Create a new soft assertions collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert two values are equal
    pub fn assert_eq<T: PartialEq + Debug>(&mut self, actual: &T, expected: &T, message: &str) {
        self.assertion_count += 1;
        if actual != expected {
            let failure_msg = format!("{message}: expected {expected:?}, got {actual:?}");
            self.record_failure(failure_msg);
        }
    }

    /// Assert a condition is true
    pub fn assert_true(&mut self, condition: bool, message: &str) {
        self.assertion_count += 1;
        if !condition {
            self.record_failure(format!("{message}: expected true, got false"));
        }
    }

    /// Assert a string contains a substring
    pub fn assert_contains(&mut self, haystack: &str, needle: &str, message: &str) {
        self.assertion_count += 1;
        if !haystack.contains(needle) {
            self.record_failure(format!(
                "{message}: expected '{haystack}' to contain '{needle}'"
            ));
        }
    }

    /// Assert a collection does not contain an item
    pub fn assert_not_contains<T: PartialEq + Debug>(
        &mut self,
        collection: &[T],
        item: &T,
        message: &str,
    ) {
        self.assertion_count += 1;
        if collection.contains(item) {
            self.record_failure(format!("{message}: {item:?} unexpectedly present in {collection:?}"));
        }
    }

    /// Assert two amounts are equal to the cent
    pub fn assert_amount(&mut self, actual: f64, expected: f64, message: &str) {
        self.assertion_count += 1;
        if (actual - expected).abs() >= 0.005 {
            self.record_failure(format!("{message}: expected {expected}, got {actual}"));
        }
    }

    /// Record a text extraction that did not match its pattern
    pub fn record_mismatch(&mut self, mismatch: &ExtractionMismatch) {
        self.assertion_count += 1;
        self.record_failure(mismatch.to_string());
    }

    /// Record a custom failure
    pub fn fail(&mut self, message: impl Into<String>) {
        self.assertion_count += 1;
        self.record_failure(message.into());
    }

    fn record_failure(&mut self, message: String) {
        tracing::warn!(%message, "soft assertion failed");
        let failure = AssertionFailure::new(message, self.failures.len());
        self.failures.push(failure);
    }

    /// Get all failures
    #[must_use]
    pub fn failures(&self) -> &[AssertionFailure] {
        &self.failures
    }

    /// Get the number of failures
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Get the total number of assertions checked
    #[must_use]
    pub const fn assertion_count(&self) -> usize {
        self.assertion_count
    }

    /// Check if all assertions passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Verify all assertions passed, returning error if any failed
    pub fn verify(&self) -> Result<(), SoftAssertionError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(SoftAssertionError::new(&self.failures))
        }
    }

    /// Get a summary of the assertions
    #[must_use]
    pub fn summary(&self) -> AssertionSummary {
        AssertionSummary {
            total: self.assertion_count,
            passed: self.assertion_count - self.failures.len(),
            failed: self.failures.len(),
        }
    }
}

/// Summary of assertion results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionSummary {
    /// Total assertions checked
    pub total: usize,
    /// Assertions that passed
    pub passed: usize,
    /// Assertions that failed
    pub failed: usize,
}

/// Error type for soft assertion failures
#[derive(Debug, Clone)]
pub struct SoftAssertionError {
    /// All failure messages
    pub failures: Vec<String>,
    /// Number of failed assertions
    pub count: usize,
}

impl SoftAssertionError {
    /// Create a new error from failures
    #[must_use]
    pub fn new(failures: &[AssertionFailure]) -> Self {
        Self {
            failures: failures.iter().map(|f| f.message.clone()).collect(),
            count: failures.len(),
        }
    }
}

impl std::fmt::Display for SoftAssertionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} assertion(s) failed:", self.count)?;
        for (i, failure) in self.failures.iter().enumerate() {
            writeln!(f, "  {}. {failure}", i + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for SoftAssertionError {}

#[cfg(test)]
mod tests {
    use super::*;

    mod collect_tests {
        use super::*;

        #[test]
        fn test_passing_assertions() {
            let mut soft = SoftAssertions::new();
            soft.assert_eq(&"MacBook Pro", &"MacBook Pro", "name");
            soft.assert_true(true, "visible");
            soft.assert_contains("Thank you for your purchase!", "Thank you", "message");
            soft.assert_amount(1460.0, 1460.0, "total");
            assert!(soft.all_passed());
            assert!(soft.verify().is_ok());
            assert_eq!(soft.assertion_count(), 4);
        }

        #[test]
        fn test_failures_are_collected_in_order() {
            let mut soft = SoftAssertions::new();
            soft.assert_eq(&1, &2, "first");
            soft.assert_true(true, "passes");
            soft.fail("second");
            let failures = soft.failures();
            assert_eq!(failures.len(), 2);
            assert_eq!(failures[0].index, 0);
            assert!(failures[0].message.starts_with("first"));
            assert_eq!(failures[1].message, "second");
        }

        #[test]
        fn test_not_contains() {
            let mut soft = SoftAssertions::new();
            let items = vec!["MacBook air".to_string()];
            soft.assert_not_contains(&items, &"Sony xperia z5".to_string(), "removed");
            assert!(soft.all_passed());
            soft.assert_not_contains(&items, &"MacBook air".to_string(), "removed");
            assert_eq!(soft.failure_count(), 1);
        }

        #[test]
        fn test_amount_tolerates_float_noise() {
            let mut soft = SoftAssertions::new();
            soft.assert_amount(0.1 + 0.2, 0.3, "sum");
            assert!(soft.all_passed());
        }

        #[test]
        fn test_mismatch_is_recorded() {
            let mut soft = SoftAssertions::new();
            soft.record_mismatch(&ExtractionMismatch::new("order id", "Amount: 5 USD"));
            assert!(soft.failures()[0].message.contains("order id"));
        }
    }

    mod report_tests {
        use super::*;

        #[test]
        fn test_summary() {
            let mut soft = SoftAssertions::new();
            soft.assert_true(true, "a");
            soft.assert_true(false, "b");
            soft.assert_true(false, "c");
            let summary = soft.summary();
            assert_eq!(summary.total, 3);
            assert_eq!(summary.passed, 1);
            assert_eq!(summary.failed, 2);
        }

        #[test]
        fn test_error_display_lists_every_failure() {
            let mut soft = SoftAssertions::new();
            soft.fail("price mismatch");
            soft.fail("item missing");
            let err = soft.verify().unwrap_err();
            let text = err.to_string();
            assert!(text.starts_with("2 assertion(s) failed:"));
            assert!(text.contains("1. price mismatch"));
            assert!(text.contains("2. item missing"));
        }
    }
}
