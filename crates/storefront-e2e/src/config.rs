//! Suite configuration.
//!
//! Defaults target the public demo storefront. A YAML or JSON file can
//! override them, and `STOREFRONT_*` environment variables override both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::DriverConfig;
use crate::locator::SelectorDialect;
use crate::result::{StorefrontError, StorefrontResult};
use crate::wait::{WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

/// Default storefront under test
pub const DEFAULT_BASE_URL: &str = "https://www.demoblaze.com/";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "STOREFRONT_";

/// Configuration shared by every workflow of a suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Storefront home URL
    pub base_url: String,
    /// Default timeout for element waits (ms)
    pub default_timeout_ms: u64,
    /// Interval between condition polls (ms)
    pub poll_interval_ms: u64,
    /// Timeout for navigations and load states (ms)
    pub navigation_timeout_ms: u64,
    /// Selector dialect the registries resolve to
    pub dialect: SelectorDialect,
    /// Where screenshots are written
    pub artifacts_dir: PathBuf,
    /// Run the browser without a window
    pub headless: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            navigation_timeout_ms: 30_000,
            dialect: SelectorDialect::default(),
            artifacts_dir: PathBuf::from("test-results"),
            headless: true,
        }
    }
}

impl SuiteConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a YAML string
    pub fn from_yaml(yaml: &str) -> StorefrontResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> StorefrontResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a `.yaml`, `.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> StorefrontResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&content),
            Some("json") => Self::from_json(&content),
            _ => Err(StorefrontError::Config {
                message: format!("unsupported config file {}", path.display()),
            }),
        }
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> StorefrontResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `STOREFRONT_*` overrides from the process environment
    pub fn with_env_overrides(self) -> StorefrontResult<Self> {
        self.with_overrides(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok())
    }

    /// Apply overrides from a lookup keyed by unprefixed variable name
    pub fn with_overrides<F>(mut self, lookup: F) -> StorefrontResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BASE_URL") {
            self.base_url = url;
        }
        if let Some(ms) = lookup("TIMEOUT_MS") {
            self.default_timeout_ms = parse_number("TIMEOUT_MS", &ms)?;
        }
        if let Some(ms) = lookup("POLL_INTERVAL_MS") {
            self.poll_interval_ms = parse_number("POLL_INTERVAL_MS", &ms)?;
        }
        if let Some(ms) = lookup("NAVIGATION_TIMEOUT_MS") {
            self.navigation_timeout_ms = parse_number("NAVIGATION_TIMEOUT_MS", &ms)?;
        }
        if let Some(dialect) = lookup("DIALECT") {
            self.dialect = match dialect.to_ascii_lowercase().as_str() {
                "short" => SelectorDialect::Short,
                "structural" => SelectorDialect::Structural,
                other => {
                    return Err(StorefrontError::Config {
                        message: format!("{ENV_PREFIX}DIALECT: unknown dialect {other:?}"),
                    })
                }
            };
        }
        if let Some(dir) = lookup("ARTIFACTS_DIR") {
            self.artifacts_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup("HEADLESS") {
            self.headless = !matches!(flag.to_ascii_lowercase().as_str(), "0" | "false" | "no");
        }
        Ok(self)
    }

    /// Set the storefront URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the default element timeout
    #[must_use]
    pub const fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.default_timeout_ms = ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout_ms(mut self, ms: u64) -> Self {
        self.navigation_timeout_ms = ms;
        self
    }

    /// Set the selector dialect
    #[must_use]
    pub const fn with_dialect(mut self, dialect: SelectorDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the artifacts directory
    #[must_use]
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    /// Wait options derived from this config
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.default_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Navigation timeout as Duration
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Browser settings derived from this config
    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig::new()
            .headless(self.headless)
            .navigation_timeout(self.navigation_timeout())
    }
}

fn parse_number(name: &str, value: &str) -> StorefrontResult<u64> {
    value.trim().parse().map_err(|_| StorefrontError::Config {
        message: format!("{ENV_PREFIX}{name}: expected milliseconds, got {value:?}"),
    })
}
