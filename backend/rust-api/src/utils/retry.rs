use rand::Rng;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl RetryConfig {
    /// Transaction conflicts: short waits, more attempts.
    pub fn conflict() -> Self {
        Self {
            max_attempts: 8,
            base_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(250),
            jitter_max: Some(Duration::from_millis(20)),
        }
    }

    fn delay(&self, backoff: Duration) -> Duration {
        match self.jitter_max {
            Some(jitter) if !jitter.is_zero() => {
                let extra = rand::rng().random_range(0..=jitter.as_millis() as u64);
                backoff + Duration::from_millis(extra)
            }
            _ => backoff,
        }
    }
}

/// Runs `f` until it succeeds, `should_retry` rejects the error, or
/// `max_attempts` calls have been made. Backoff doubles up to `max_backoff`.
pub async fn retry_async_if<F, Fut, T, E, P>(
    config: RetryConfig,
    should_retry: P,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempts_left = config.max_attempts;
    let mut backoff = config.base_backoff;

    loop {
        let err = match f().await {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };

        attempts_left = attempts_left.saturating_sub(1);
        if attempts_left == 0 || !should_retry(&err) {
            return Err(err);
        }

        tokio::time::sleep(config.delay(backoff)).await;
        backoff = std::cmp::min(backoff * 2, config.max_backoff);
    }
}
