//! A minimal interval limiter for rate-limiting calls to a single upstream
//! host (§4.1: "sleep >=300 ms between calls within a pass").

use std::time::Duration;

use tokio::time::Instant;

pub struct IntervalLimiter {
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl IntervalLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval: Duration::from_millis(min_interval_ms),
            last_call: None,
        }
    }

    /// Sleep just long enough that at least `min_interval` has elapsed since
    /// the previous call to `wait()`, then record `now` as the new baseline.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enforces_minimum_interval() {
        let mut limiter = IntervalLimiter::new(50);
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn enforces_300ms_between_calls_to_the_same_host() {
        let mut limiter = IntervalLimiter::new(300);
        let start = Instant::now();
        limiter.wait().await; // first call never sleeps
        limiter.wait().await; // second call must wait out the remaining interval
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn first_call_does_not_sleep() {
        let mut limiter = IntervalLimiter::new(300);
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_millis(300));
    }
}
