//! Sliding-window request limiter keyed by caller identity

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Per-identity sliding-window limiter
///
/// An identity may make at most `max_requests` admitted calls in any window of
/// `window` length. Rejected calls are not recorded.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    /// Admitted call times per identity, oldest first
    clients: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    /// `max_requests` is raised to at least one
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            clients: DashMap::new(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject a call from `identity` made now
    pub fn allow(&self, identity: &str) -> bool {
        self.allow_at(identity, Instant::now())
    }

    /// Admit or reject a call from `identity` made at `now`
    pub fn allow_at(&self, identity: &str, now: Instant) -> bool {
        let mut timestamps = self.clients.entry(identity.to_string()).or_default();
        prune(&mut timestamps, now, self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// Time until `identity` may be admitted again; zero if it may call now
    pub fn retry_after(&self, identity: &str, now: Instant) -> Duration {
        let Some(timestamps) = self.clients.get(identity) else {
            return Duration::ZERO;
        };

        let live: Vec<Instant> = timestamps
            .iter()
            .copied()
            .filter(|&t| now.saturating_duration_since(t) < self.window)
            .collect();
        if live.len() < self.max_requests {
            return Duration::ZERO;
        }

        // The oldest admitted call that must expire before a slot opens
        let blocking = live[live.len() - self.max_requests];
        self.window.saturating_sub(now.saturating_duration_since(blocking))
    }

    /// Drop identities with no admitted call inside the window
    ///
    /// Returns the number of identities removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|&t| now.saturating_duration_since(t) < self.window)
        });
        let evicted = before.saturating_sub(self.clients.len());
        if evicted > 0 {
            tracing::debug!("Evicted {} idle rate-limit entries", evicted);
        }
        evicted
    }

    /// Number of identities currently tracked
    pub fn tracked_identities(&self) -> usize {
        self.clients.len()
    }
}

fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = timestamps.front() {
        if now.saturating_duration_since(oldest) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}
