use crate::domain::ports::{GotoOptions, PageNavigator};
use crate::utils::error::{CrawlError, Result};
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Produces the pause before retry number `attempt` (1-based).
pub type DelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Bounded retry with a delay drawn fresh for every failed attempt.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: DelayFn,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Arc::new(delay),
        }
    }

    /// Uniformly random delay in `min..=max`.
    pub fn randomized(max_attempts: u32, min: Duration, max: Duration) -> Self {
        let min_ms = min.as_millis() as u64;
        let max_ms = (max.as_millis() as u64).max(min_ms);
        Self::new(max_attempts, move |_| {
            Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
        })
    }

    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, |_| Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        (self.delay)(attempt)
    }

    /// Runs `op` until it succeeds or the attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, target: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        self.max_attempts,
                        target,
                        e
                    );
                    last_error = e.to_string();
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.delay_for(attempt)).await;
                    }
                }
            }
        }

        tracing::error!("All {} attempts failed for {}", self.max_attempts, target);
        Err(CrawlError::NavigationExhausted {
            url: target.to_string(),
            attempts: self.max_attempts,
            last_error,
        })
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// A page whose navigations go through a [`RetryPolicy`].
pub struct RetryingNavigator<'a, N: PageNavigator> {
    page: &'a N,
    policy: &'a RetryPolicy,
}

impl<'a, N: PageNavigator> RetryingNavigator<'a, N> {
    pub fn new(page: &'a N, policy: &'a RetryPolicy) -> Self {
        Self { page, policy }
    }

    pub fn page(&self) -> &'a N {
        self.page
    }

    pub async fn goto_with_retry(&self, url: &str, options: &GotoOptions) -> Result<()> {
        self.policy
            .run(url, || self.page.goto(url, options))
            .await
    }
}
