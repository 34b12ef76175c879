use std::time::Duration;

use tokio::time::Instant;

/// Politeness delay between requests: each request waits until a random
/// interval in `[min, max)` has passed since the previous one.
pub struct Pacer {
    min: Duration,
    max: Duration,
    last_request: Option<Instant>,
}

impl Pacer {
    pub fn new(min: Duration, max: Duration) -> Self {
        Pacer {
            min,
            max: max.max(min),
            last_request: None,
        }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Pacer::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    #[cfg(test)]
    pub fn unpaced() -> Self {
        Pacer::new(Duration::ZERO, Duration::ZERO)
    }

    fn next_interval(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let ms = rand::random_range(self.min.as_millis() as u64..self.max.as_millis() as u64);
        Duration::from_millis(ms)
    }

    /// Sleep as needed, then mark a request as started.
    pub async fn wait(&mut self) {
        let interval = self.next_interval();
        let ready_at = match self.last_request {
            Some(last) => last + interval,
            None => Instant::now() + interval,
        };
        tokio::time::sleep_until(ready_at).await;
        self.last_request = Some(Instant::now());
    }
}
