//! Request scheduler for politeness and concurrency limits
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Minimum delay between consecutive requests to the same host
//! - Per-host request counting for crawl reports

use crate::config::CrawlerConfig;
use crate::state::HostState;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A slot to send one request; the permit is released on drop
pub struct ScheduledRequest {
    pub host: String,
    pub _permit: OwnedSemaphorePermit,
}

/// Scheduler shared by every fetch of one fetcher
///
/// The scheduler coordinates:
/// - Global concurrency limits (max requests in flight)
/// - Per-host rate limits (minimum time between requests)
pub struct Scheduler {
    /// Global semaphore for limiting concurrent fetches
    global_semaphore: Arc<Semaphore>,

    /// Per-host state tracking
    host_states: Mutex<HashMap<String, HostState>>,

    /// Minimum time between two requests to the same host
    min_delay: Duration,
}

impl Scheduler {
    /// Creates a new scheduler from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            global_semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests as usize)),
            host_states: Mutex::new(HashMap::new()),
            min_delay: Duration::from_millis(config.request_delay_ms),
        }
    }

    /// Waits until a request to `host` may be sent
    ///
    /// This method:
    /// 1. Waits until the host's minimum delay has passed
    /// 2. Acquires a global semaphore permit
    /// 3. Re-checks the host under the permit, since another request to it
    ///    may have gone out meanwhile, and records the request
    ///
    /// No permit is held while a host is cooling down.
    ///
    /// # Returns
    ///
    /// * `Some(ScheduledRequest)` - The request may be sent now
    /// * `None` - The semaphore was closed
    pub async fn acquire(&self, host: &str) -> Option<ScheduledRequest> {
        loop {
            if let Some(wait) = self.host_wait(host) {
                tracing::trace!("Host {} not ready, waiting {:?}", host, wait);
                tokio::time::sleep(wait).await;
                continue;
            }

            let permit = self.global_semaphore.clone().acquire_owned().await.ok()?;

            let ready = {
                let mut states = self.lock_states();
                let state = states.entry(host.to_string()).or_default();
                let now = Instant::now();
                let ready = state.time_until_next_request(self.min_delay, now).is_none();
                if ready {
                    state.record_request(now);
                }
                ready
            };

            if ready {
                return Some(ScheduledRequest {
                    host: host.to_string(),
                    _permit: permit,
                });
            }
            // Another request to this host went first; release and wait again
            drop(permit);
        }
    }

    fn host_wait(&self, host: &str) -> Option<Duration> {
        let now = Instant::now();
        self.lock_states()
            .get(host)
            .and_then(|state| state.time_until_next_request(self.min_delay, now))
    }

    /// Number of requests sent so far, per host
    pub fn request_counts(&self) -> BTreeMap<String, u32> {
        self.lock_states()
            .iter()
            .map(|(host, state)| (host.clone(), state.request_count))
            .collect()
    }

    /// Returns the number of available permits
    pub fn available_permits(&self) -> usize {
        self.global_semaphore.available_permits()
    }

    fn lock_states(&self) -> MutexGuard<'_, HashMap<String, HostState>> {
        // Host bookkeeping stays usable even if a holder panicked
        self.host_states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
