//! Tracing subscriber setup for suite runs.
//!
//! Reads `RUST_LOG`; defaults to `storefront_e2e=info`. Output goes to
//! stderr.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "storefront_e2e=info";

/// Output format of the subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// `STOREFRONT_LOG_FORMAT=json` selects JSON output
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var("STOREFRONT_LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Compact,
        }
    }
}

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Install the global subscriber with the format chosen by the environment.
///
/// Safe to call from every test; only the first call installs anything.
/// Returns whether this process now has the suite's subscriber installed.
pub fn init() -> bool {
    init_with(LogFormat::from_env())
}

/// Install the global subscriber with an explicit format
pub fn init_with(format: LogFormat) -> bool {
    *INSTALLED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let registry = tracing_subscriber::registry().with(filter);
        let installed = match format {
            LogFormat::Compact => registry
                .with(fmt::layer().with_writer(std::io::stderr).compact())
                .try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().with_writer(std::io::stderr).json())
                .try_init(),
        };
        installed.is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let first = init_with(LogFormat::Compact);
        let second = init_with(LogFormat::Json);
        assert_eq!(first, second);
        tracing::info!("logging initialised");
    }

    #[test]
    fn test_default_format() {
        assert_eq!(LogFormat::default(), LogFormat::Compact);
    }
}
