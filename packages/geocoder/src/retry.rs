//! Bounded retry for transient provider failures.
//!
//! [`RetryingProvider`] wraps another provider and retries a `geocode`
//! call when the error is [transient](GeocodeError::is_transient): rate
//! limiting, connection failures and timeouts. Waits double on each
//! attempt (`base_delay`, `2 * base_delay`, ...). Every other error, and
//! the last transient one, is returned unchanged.
//!
//! The liveness probe is never retried: a provider that cannot answer the
//! probe should stop the run before any batch work starts.

use std::time::Duration;

use crate::{Candidate, GeocodeError, GeocodingProvider};

/// A provider that retries transient failures of an inner provider.
pub struct RetryingProvider {
    inner: Box<dyn GeocodingProvider>,
    max_retries: u32,
    base_delay: Duration,
}

impl RetryingProvider {
    #[must_use]
    pub fn new(inner: Box<dyn GeocodingProvider>, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << (attempt - 1).min(16))
    }
}

#[async_trait::async_trait]
impl GeocodingProvider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn geocode(&self, address: &str) -> Result<Vec<Candidate>, GeocodeError> {
        let mut attempt = 0;
        loop {
            match self.inner.geocode(address).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "{}: {e}, retry {attempt}/{} in {delay:?}",
                        self.inner.name(),
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    async fn probe(&self) -> Result<(), GeocodeError> {
        self.inner.probe().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Fails with `RateLimited` for the first `failures` calls.
    struct FlakyProvider {
        failures: u32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl GeocodingProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn geocode(&self, _address: &str) -> Result<Vec<Candidate>, GeocodeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(GeocodeError::RateLimited)
            } else {
                Ok(vec![Candidate::new(1.0, 2.0)])
            }
        }
    }

    struct DeniedProvider {
        calls: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl GeocodingProvider for DeniedProvider {
        fn name(&self) -> &str {
            "denied"
        }

        async fn geocode(&self, _address: &str) -> Result<Vec<Candidate>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GeocodeError::Rejected {
                message: "denied".to_string(),
            })
        }
    }

    fn flaky(failures: u32, max_retries: u32) -> (RetryingProvider, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let inner = FlakyProvider {
            failures,
            calls: Arc::clone(&calls),
        };
        (
            RetryingProvider::new(Box::new(inner), max_retries, Duration::ZERO),
            calls,
        )
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let (provider, calls) = flaky(2, 3);
        let candidates = provider.geocode("1 Main St").await.unwrap();
        assert_eq!(candidates, vec![Candidate::new(1.0, 2.0)]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let (provider, calls) = flaky(5, 2);
        let err = provider.geocode("1 Main St").await.unwrap_err();
        assert!(matches!(err, GeocodeError::RateLimited));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_retries_fails_fast() {
        let (provider, calls) = flaky(1, 0);
        assert!(provider.geocode("1 Main St").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let provider = RetryingProvider::new(
            Box::new(DeniedProvider {
                calls: Arc::clone(&calls),
            }),
            5,
            Duration::ZERO,
        );
        assert!(provider.geocode("1 Main St").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let (provider, _) = flaky(0, 3);
        let provider = RetryingProvider {
            base_delay: Duration::from_secs(2),
            ..provider
        };
        assert_eq!(provider.delay_for(1), Duration::from_secs(2));
        assert_eq!(provider.delay_for(2), Duration::from_secs(4));
        assert_eq!(provider.delay_for(3), Duration::from_secs(8));
    }
}
