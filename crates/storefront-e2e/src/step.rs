//! Named steps.
//!
//! Business operations are wrapped in [`step`], which runs them inside a
//! `step` span, logs their start and outcome, and hands the result back
//! unchanged.

use std::future::Future;
use std::time::Instant;

use tracing::Instrument;

use crate::result::StorefrontResult;

/// Run `operation` as the named step
pub async fn step<T, F>(name: &str, operation: F) -> StorefrontResult<T>
where
    F: Future<Output = StorefrontResult<T>>,
{
    let span = tracing::info_span!("step", step = name);
    async move {
        tracing::info!("[STEP] {name}");
        let start = Instant::now();
        let result = operation.await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::debug!(elapsed_ms, "step finished"),
            Err(err) => tracing::error!(elapsed_ms, error = %err, "[STEP] error in {name}"),
        }
        result
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::StorefrontError;

    #[tokio::test]
    async fn test_step_returns_value() {
        let value = step("add to cart", async { Ok::<_, StorefrontError>(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_step_passes_error_through() {
        let err = step("login", async {
            Err::<(), _>(StorefrontError::ElementNotFound {
                locator: "a#login2".to_string(),
            })
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StorefrontError::ElementNotFound { .. }));
    }
}
