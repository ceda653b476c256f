//! Bounded-time wrappers for calls into external collaborators.
//!
//! Every embedding, language-model, speech and search call goes through one of
//! these so a stalled backend turns into `Error::Provider` instead of a hung
//! request.
use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Await `fut`, failing with a provider timeout after `limit`.
pub async fn with_timeout<T, F>(provider: &str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::provider(
            provider,
            format!("timed out after {}ms", limit.as_millis()),
        )),
    }
}

/// Run synchronous, potentially slow work (local inference, blocking HTTP)
/// on the blocking pool, bounded by `limit`.
pub async fn run_blocking<T, F>(provider: &str, limit: Duration, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let task = async {
        tokio::task::spawn_blocking(work)
            .await
            .map_err(|e| Error::provider(provider, format!("worker task failed: {e}")))?
    };
    with_timeout(provider, limit, task).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let value = with_timeout("test", Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_with_timeout_elapsed_is_provider_error() {
        let result: Result<()> = with_timeout("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(Error::Provider { provider, message }) => {
                assert_eq!(provider, "slow");
                assert!(message.contains("timed out"));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_blocking_propagates_error() {
        let result: Result<()> = run_blocking("embedder", Duration::from_secs(1), || {
            Err(Error::provider("embedder", "unavailable"))
        })
        .await;
        assert!(matches!(result, Err(Error::Provider { .. })));
    }
}
