//! In-flight request coalescing.
//!
//! Concurrent requests for the same key share one underlying future. Entries
//! carry a hard age limit: a caller that finds an entry older than the limit
//! evicts it and starts fresh, and every wait is bounded by the same limit, so
//! a stuck future can never block later callers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use tokio::sync::Mutex;

use crate::error_handling::{ClassifiedError, ErrorKind};

type SharedResult<T> = Shared<BoxFuture<'static, Result<T, ClassifiedError>>>;

struct Entry<T: Clone> {
    future: SharedResult<T>,
    started: Instant,
    id: u64,
}

/// Map of in-flight operations keyed by target identity (e.g. `domain:kind`).
pub struct InflightCoalescer<T: Clone> {
    entries: Mutex<HashMap<String, Entry<T>>>,
    max_age: Duration,
    next_id: AtomicU64,
}

impl<T> InflightCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(max_age: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_age,
            next_id: AtomicU64::new(0),
        }
    }

    /// Runs `make()` for `key`, or joins the operation already in flight.
    ///
    /// # Errors
    ///
    /// The shared operation's error, or `timeout` when it does not settle
    /// within the age limit.
    pub async fn run<F>(&self, key: &str, make: F) -> Result<T, ClassifiedError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<T, ClassifiedError>>,
    {
        let (future, id, deadline) = {
            let mut entries = self.entries.lock().await;
            let joined = entries
                .get(key)
                .filter(|entry| entry.started.elapsed() < self.max_age)
                .map(|entry| {
                    (
                        entry.future.clone(),
                        entry.id,
                        self.max_age.saturating_sub(entry.started.elapsed()),
                    )
                });

            match joined {
                Some(joined) => {
                    debug!("Joining in-flight operation for {}", key);
                    joined
                }
                None => {
                    if entries.remove(key).is_some() {
                        warn!("Evicting stale in-flight entry for {}", key);
                    }
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let future = make().shared();
                    entries.insert(
                        key.to_string(),
                        Entry {
                            future: future.clone(),
                            started: Instant::now(),
                            id,
                        },
                    );
                    (future, id, self.max_age)
                }
            }
        };

        let result = match tokio::time::timeout(deadline, future).await {
            Ok(result) => result,
            Err(_) => Err(ClassifiedError::new(
                ErrorKind::Timeout,
                format!("in-flight operation for {key} did not settle"),
            )),
        };

        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(|entry| entry.id == id) {
            entries.remove(key);
        }
        result
    }

    /// Number of keys currently in flight.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
