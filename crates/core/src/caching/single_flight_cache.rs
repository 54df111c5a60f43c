use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    #[error("the computation for this key ended without producing a value")]
    Abandoned,
}

struct Ready<V> {
    value: V,
    written_at: Instant,
}

/// Finished values are bounded and evictable. In-flight computations live
/// outside the LRU so they can never be evicted while running.
struct Entries<K, V> {
    ready: LruCache<K, Ready<V>>,
    pending: HashMap<K, watch::Receiver<Option<V>>>,
}

enum Lookup<V> {
    Hit(V),
    Wait(watch::Receiver<Option<V>>),
    Miss,
}

/// Bounded LRU cache that runs at most one computation per key at a time.
///
/// The first caller for a missing key publishes a pending slot and spawns the
/// computation; later callers wait on that slot. The computation runs on its
/// own task, so it completes even if every caller goes away. Entries expire a
/// fixed `ttl` after they are written.
pub struct SingleFlightCache<K, V> {
    entries: Arc<Mutex<Entries<K, V>>>,
    ttl: Duration,
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Entries {
                ready: LruCache::new(capacity),
                pending: HashMap::new(),
            })),
            ttl,
        }
    }

    /// Returns the finished, unexpired value for `key` without computing.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.ready.get(key) {
            Some(ready) if ready.written_at.elapsed() < self.ttl => Some(ready.value.clone()),
            _ => None,
        }
    }

    /// Returns the cached value for `key`, computing it if absent or expired.
    ///
    /// `compute` is only invoked by the caller that wins the slot.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let mut rx = {
            let mut entries = self.entries.lock();
            let lookup = match entries.ready.get(&key) {
                Some(ready) if ready.written_at.elapsed() < self.ttl => {
                    Lookup::Hit(ready.value.clone())
                }
                _ => match entries.pending.get(&key) {
                    // A closed channel means the computing task died.
                    Some(rx) if rx.has_changed().is_ok() => Lookup::Wait(rx.clone()),
                    _ => Lookup::Miss,
                },
            };
            match lookup {
                Lookup::Hit(value) => return Ok(value),
                Lookup::Wait(rx) => rx,
                Lookup::Miss => {
                    let (tx, rx) = watch::channel(None);
                    entries.pending.insert(key.clone(), rx.clone());
                    drop(entries);
                    self.spawn_leader(key, tx, compute());
                    rx
                }
            }
        };

        let settled = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| CacheError::Abandoned)?;
        (*settled).clone().ok_or(CacheError::Abandoned)
    }

    fn spawn_leader<Fut>(&self, key: K, tx: watch::Sender<Option<V>>, work: Fut)
    where
        Fut: Future<Output = V> + Send + 'static,
    {
        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            let value = work.await;
            // Publish before waking waiters so late arrivals see a ready slot.
            {
                let mut entries = entries.lock();
                entries.pending.remove(&key);
                entries.ready.put(
                    key,
                    Ready {
                        value: value.clone(),
                        written_at: Instant::now(),
                    },
                );
            }
            let _ = tx.send(Some(value));
        });
    }

    /// Number of keys held, in-flight ones included.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock();
        entries.ready.len() + entries.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
