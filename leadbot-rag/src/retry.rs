//! Timeout and bounded-retry decorator for embedding providers.
//!
//! [`RetryingEmbeddingProvider`] wraps any [`EmbeddingProvider`] and layers
//! robustness policy on top of it, leaving the pipeline and retrieval logic
//! free of retry loops.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::{sync::Arc, time::Duration};
//! use leadbot_rag::{RetryingEmbeddingProvider, openai::OpenAIEmbeddingProvider};
//!
//! let embedder = RetryingEmbeddingProvider::new(Arc::new(OpenAIEmbeddingProvider::from_env()?))
//!     .with_max_attempts(3)
//!     .with_timeout(Duration::from_secs(10));
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(200);

/// An [`EmbeddingProvider`] that retries transient failures with exponential
/// backoff.
///
/// Only errors for which [`RagError::is_transient`] holds are retried; a
/// rejected key or an empty text fails on the first attempt. A call exceeding
/// the configured timeout counts as a transient failure. Batches are
/// forwarded whole to the inner provider under the same policy.
pub struct RetryingEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    max_attempts: u32,
    initial_backoff: Duration,
    timeout: Option<Duration>,
}

impl RetryingEmbeddingProvider {
    /// Wrap `inner` with the default policy (3 attempts, 200ms initial backoff, no timeout).
    pub fn new(inner: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            inner,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            timeout: None,
        }
    }

    /// Set the total number of attempts (at least one).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the delay before the first retry; it doubles after each failure.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Bound each attempt by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run `call` under the timeout, retrying transient failures with backoff.
    async fn call_with_retries<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Fn() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            let result = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call()).await.unwrap_or_else(|_| {
                    Err(RagError::transient_embedding("retry", format!("timed out after {limit:?}")))
                }),
                None => call().await,
            };
            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(operation, attempt, max_attempts = self.max_attempts, error = %e, "embedding attempt failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for RetryingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.call_with_retries("embed", || self.inner.embed(text)).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.call_with_retries("embed_batch", || self.inner.embed_batch(texts)).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct Flaky {
        failures_before_success: u32,
        transient: bool,
        calls: AtomicU32,
        batch_calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures_before_success: u32) -> Self {
            Self {
                failures_before_success,
                transient: true,
                calls: AtomicU32::new(0),
                batch_calls: AtomicU32::new(0),
            }
        }

        fn failure(&self) -> RagError {
            if self.transient {
                RagError::transient_embedding("flaky", "API returned 503 Service Unavailable")
            } else {
                RagError::embedding("flaky", "API returned 401 Unauthorized")
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for Flaky {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success { Err(self.failure()) } else { Ok(vec![1.0, 0.0]) }
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            let call = self.batch_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(self.failure())
            } else {
                Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
            }
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    struct Slow;

    #[async_trait]
    impl EmbeddingProvider for Slow {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![1.0])
        }

        fn dimensions(&self) -> usize {
            1
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let inner = Arc::new(Flaky::new(2));
        let provider = RetryingEmbeddingProvider::new(inner.clone()).with_max_attempts(3);

        assert_eq!(provider.embed("text").await.unwrap(), vec![1.0, 0.0]);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let inner = Arc::new(Flaky::new(u32::MAX));
        let provider = RetryingEmbeddingProvider::new(inner.clone()).with_max_attempts(2);

        let err = provider.embed("text").await.unwrap_err();
        assert!(matches!(err, RagError::Embedding { .. }));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_an_embedding_error() {
        let provider = RetryingEmbeddingProvider::new(Arc::new(Slow))
            .with_max_attempts(1)
            .with_timeout(Duration::from_secs(1));

        let err = provider.embed("text").await.unwrap_err();
        assert!(matches!(err, RagError::Embedding { ref message, .. } if message.contains("timed out")));
        assert!(err.is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let inner = Arc::new(Flaky { transient: false, ..Flaky::new(u32::MAX) });
        let provider = RetryingEmbeddingProvider::new(inner.clone()).with_max_attempts(3);

        let err = provider.embed("text").await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn batches_are_forwarded_whole_and_retried() {
        let inner = Arc::new(Flaky::new(1));
        let provider = RetryingEmbeddingProvider::new(inner.clone()).with_max_attempts(3);

        let vectors = provider.embed_batch(&["uno", "dos", "tres"]).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(inner.batch_calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_batches_time_out_per_attempt() {
        let provider = RetryingEmbeddingProvider::new(Arc::new(Slow))
            .with_max_attempts(2)
            .with_timeout(Duration::from_secs(1));

        let err = provider.embed_batch(&["uno", "dos"]).await.unwrap_err();
        assert!(err.is_transient());
    }
}
