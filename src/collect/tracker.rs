//! Per-endpoint circuit breaker for collection pulls.
//!
//! Failures are counted per endpoint. Once the count reaches the threshold
//! the endpoint is suspended for the cooldown. Nothing runs on a timer: the
//! first `can_request` after the deadline clears the endpoint's state.
//! Successful pulls leave the counter alone.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use crate::config::CollectSettings;

#[derive(Debug, Default, Clone, Copy)]
struct EndpointState {
    failures: u32,
    suspended_until: Option<Instant>,
}

#[derive(Debug)]
pub struct FailureTracker {
    threshold: u32,
    cooldown: Duration,
    endpoints: Mutex<HashMap<String, EndpointState>>,
}

impl FailureTracker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            endpoints: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &CollectSettings) -> Self {
        Self::new(
            settings.failure_threshold,
            Duration::from_secs(settings.cooldown_secs),
        )
    }

    /// `false` while the endpoint is suspended. A passed deadline resets
    /// the endpoint's counter and suspension.
    pub fn can_request(&self, endpoint: &str) -> bool {
        let mut endpoints = self.lock();
        let Some(deadline) = endpoints.get(endpoint).and_then(|s| s.suspended_until) else {
            return true;
        };
        if Instant::now() < deadline {
            return false;
        }
        endpoints.remove(endpoint);
        true
    }

    /// Count one failure. Every failure at or past the threshold pushes the
    /// suspension deadline to `now + cooldown`.
    pub fn record_failure(&self, endpoint: &str) {
        let mut endpoints = self.lock();
        let state = endpoints.entry(endpoint.to_string()).or_default();
        state.failures = state.failures.saturating_add(1);
        if state.failures >= self.threshold {
            state.suspended_until = Some(Instant::now() + self.cooldown);
            warn!(
                endpoint = %endpoint,
                failures = state.failures,
                cooldown_secs = self.cooldown.as_secs(),
                "Collection endpoint suspended"
            );
        }
    }

    pub fn failures(&self, endpoint: &str) -> u32 {
        self.lock().get(endpoint).map_or(0, |s| s.failures)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, EndpointState>> {
        self.endpoints.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
