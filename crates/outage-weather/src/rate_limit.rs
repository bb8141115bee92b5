//! Points-per-window throttle for the weather API.
//!
//! Counts the location points sent over the network. Once the count has
//! reached the threshold, the next request waits out a fixed cooldown and
//! the count starts again from zero. This approximates the upstream limit;
//! it is not an exact sliding window.

use std::time::Duration;

use outage_core::RateLimitConfig;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_points: usize,
    cooldown: Duration,
    points: usize,
    cooldowns: usize,
}

impl RateLimiter {
    pub fn new(max_points: usize, cooldown: Duration) -> Self {
        Self {
            max_points,
            cooldown,
            points: 0,
            cooldowns: 0,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_points, Duration::from_secs(config.cooldown_secs))
    }

    /// Whether the next request has to wait.
    pub fn needs_cooldown(&self) -> bool {
        self.points >= self.max_points
    }

    /// Call before sending a request; sleeps if the threshold was reached.
    pub async fn acquire(&mut self) {
        if self.needs_cooldown() {
            tracing::warn!(
                "{} points queried, sleeping {:?} to respect rate limits",
                self.points,
                self.cooldown
            );
            tokio::time::sleep(self.cooldown).await;
            self.points = 0;
            self.cooldowns += 1;
        }
    }

    /// Call after a request went out over the network.
    pub fn record(&mut self, points: usize) {
        self.points += points;
    }

    pub fn points(&self) -> usize {
        self.points
    }

    pub fn cooldowns(&self) -> usize {
        self.cooldowns
    }
}
