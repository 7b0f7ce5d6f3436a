//! Application state shared across handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use apisim_core::{AppConfig, PageRequest, Store, TsClock};

/// Shared application state.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<AppState>,
}

struct AppState {
    config: AppConfig,
    store: Store,
    clock: TsClock,
    started_at: Instant,
    requests_served: AtomicU64,
}

impl SharedState {
    /// Create new application state around an opened store.
    #[must_use]
    pub fn new(config: AppConfig, store: Store) -> Self {
        Self {
            inner: Arc::new(AppState {
                config,
                store,
                clock: TsClock::new(),
                started_at: Instant::now(),
                requests_served: AtomicU64::new(0),
            }),
        }
    }

    /// Loaded configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Workspace store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Clock used to stamp new messages.
    #[must_use]
    pub fn clock(&self) -> &TsClock {
        &self.inner.clock
    }

    /// Time since the state was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    /// Count a request and return its 1-based sequence number.
    pub fn record_request(&self) -> u64 {
        self.inner.requests_served.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Requests counted so far.
    #[must_use]
    pub fn requests_served(&self) -> u64 {
        self.inner.requests_served.load(Ordering::Relaxed)
    }

    /// Page request built from raw `cursor`/`limit` arguments and the configured limits.
    #[must_use]
    pub fn page(&self, cursor: Option<&str>, limit: Option<u64>) -> PageRequest {
        PageRequest::new(cursor, limit, &self.inner.config.pagination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counter_is_sequential() {
        let state = SharedState::new(AppConfig::default(), Store::open_in_memory().unwrap());
        assert_eq!(state.requests_served(), 0);
        assert_eq!(state.record_request(), 1);
        assert_eq!(state.clone().record_request(), 2);
        assert_eq!(state.requests_served(), 2);
    }

    #[test]
    fn test_page_uses_configured_limits() {
        let state = SharedState::new(AppConfig::default(), Store::open_in_memory().unwrap());
        assert_eq!(state.page(None, None).limit, 100);
        assert_eq!(state.page(Some("C1"), Some(5_000)).limit, 1000);
        assert_eq!(state.page(Some(""), Some(5)).cursor, None);
    }
}
