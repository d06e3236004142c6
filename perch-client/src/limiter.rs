//! Admission control for outbound requests
//!
//! Every client operation acquires a permit before its request is sent. The
//! limiter is shared by all concurrently running invocations and is injected
//! at construction, so tests can swap in [`Unlimited`].

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, Result};

/// Sustained operations per second allowed by [`TokenBucket::default`]
pub const DEFAULT_RATE_PER_SECOND: NonZeroU32 = NonZeroU32::new(10).unwrap();

/// Burst capacity of [`TokenBucket::default`]
pub const DEFAULT_BURST: NonZeroU32 = NonZeroU32::new(20).unwrap();

/// Gate that every outbound request passes through
#[async_trait]
pub trait RateLimiter: Send + Sync + std::fmt::Debug {
    /// Wait until a request may be issued
    ///
    /// Returns [`ClientError::Cancelled`] if `cancel` fires first.
    async fn acquire(&self, cancel: &CancellationToken) -> Result<()>;
}

/// Token-bucket limiter: bursts up to `burst`, refills at `rate` per second
pub struct TokenBucket {
    limiter: DefaultDirectRateLimiter,
    rate: NonZeroU32,
    burst: NonZeroU32,
}

impl TokenBucket {
    pub fn new(rate: NonZeroU32, burst: NonZeroU32) -> Self {
        let quota = Quota::per_second(rate).allow_burst(burst);
        Self {
            limiter: governor::RateLimiter::direct(quota),
            rate,
            burst,
        }
    }

    /// Take a permit if one is available right now, without waiting
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub fn rate(&self) -> NonZeroU32 {
        self.rate
    }

    pub fn burst(&self) -> NonZeroU32 {
        self.burst
    }
}

impl Default for TokenBucket {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_PER_SECOND, DEFAULT_BURST)
    }
}

impl std::fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket")
            .field("rate", &self.rate)
            .field("burst", &self.burst)
            .finish()
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            _ = self.limiter.until_ready() => Ok(()),
        }
    }
}

/// Limiter that admits everything immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[test]
    fn test_burst_capacity() {
        let bucket = TokenBucket::default();
        assert_eq!(bucket.rate(), DEFAULT_RATE_PER_SECOND);
        assert_eq!(bucket.burst(), DEFAULT_BURST);

        for _ in 0..bucket.burst().get() {
            assert!(bucket.try_acquire());
        }
        assert!(!bucket.try_acquire());
    }

    #[tokio::test]
    async fn test_refill_throttles_after_burst() {
        let bucket = TokenBucket::default();
        let cancel = CancellationToken::new();
        let start = Instant::now();

        for _ in 0..20 {
            bucket.acquire(&cancel).await.unwrap();
        }
        let burst_elapsed = start.elapsed();

        for _ in 0..10 {
            bucket.acquire(&cancel).await.unwrap();
        }
        let total_elapsed = start.elapsed();

        // 20 permits are free; the remaining 10 refill at 100ms each
        assert!(burst_elapsed < Duration::from_millis(200));
        assert!(total_elapsed >= Duration::from_millis(850));
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let bucket: Arc<dyn RateLimiter> = Arc::new(TokenBucket::new(
            NonZeroU32::new(50).unwrap(),
            NonZeroU32::new(5).unwrap(),
        ));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let bucket = Arc::clone(&bucket);
                tokio::spawn(async move { bucket.acquire(&CancellationToken::new()).await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let bucket = TokenBucket::new(NonZeroU32::new(1).unwrap(), NonZeroU32::new(1).unwrap());
        assert!(bucket.try_acquire());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = bucket.acquire(&cancel).await;
        assert!(matches!(result, Err(ClientError::Cancelled)));
        assert!(start.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_unlimited_respects_cancellation() {
        let cancel = CancellationToken::new();
        assert!(Unlimited.acquire(&cancel).await.is_ok());

        cancel.cancel();
        assert!(matches!(
            Unlimited.acquire(&cancel).await,
            Err(ClientError::Cancelled)
        ));
    }
}
