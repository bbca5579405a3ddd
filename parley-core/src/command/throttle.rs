use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

/// How often a command may be used per user: `usages` times every `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttling {
    pub usages: u32,
    pub duration: Duration,
}
impl Throttling {
    pub fn new(usages: u32, duration_secs: u64) -> Self {
        Self {
            usages,
            duration: Duration::from_secs(duration_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleCheck {
    pub blocked: bool,
    /// Time until the current window resets.
    pub remaining: Duration,
}

type ThrottleKey = (String, Id<UserMarker>);

struct Record {
    start: Instant,
    usages: u32,
    generation: u64,
    expiry: JoinHandle<()>,
}

type Records = Arc<Mutex<HashMap<ThrottleKey, Record>>>;

fn lock(records: &Records) -> MutexGuard<'_, HashMap<ThrottleKey, Record>> {
    records.lock().unwrap_or_else(|e| e.into_inner())
}

/// Per (command, user) usage windows.
///
/// Every record has a single timer that deletes it once its window has passed. Dropping the
/// tracker aborts every timer.
pub struct ThrottleTracker {
    records: Records,
    owners: HashSet<Id<UserMarker>>,
    generation: AtomicU64,
}
impl ThrottleTracker {
    pub fn new(owners: impl IntoIterator<Item = Id<UserMarker>>) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            owners: owners.into_iter().collect(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn is_owner(&self, user: Id<UserMarker>) -> bool {
        self.owners.contains(&user)
    }

    /// Whether `user` has used up the current window of `command`. Counts nothing, see
    /// [`ThrottleTracker::record`]. Owners are never throttled.
    pub fn check(&self, command: &str, throttling: &Throttling, user: Id<UserMarker>) -> ThrottleCheck {
        let open = ThrottleCheck {
            blocked: false,
            remaining: throttling.duration,
        };
        if self.is_owner(user) || throttling.usages == 0 {
            return open;
        }

        let records = lock(&self.records);
        let Some(record) = records.get(&(command.to_owned(), user)) else {
            return open;
        };

        let elapsed = Instant::now().duration_since(record.start);
        if elapsed >= throttling.duration {
            return open;
        }
        ThrottleCheck {
            blocked: record.usages >= throttling.usages,
            remaining: throttling.duration - elapsed,
        }
    }

    /// Counts one use of `command` by `user`, opening a new window when none is running.
    /// Owners are never counted.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn record(&self, command: &str, throttling: &Throttling, user: Id<UserMarker>) {
        if self.is_owner(user) || throttling.usages == 0 {
            return;
        }

        let now = Instant::now();
        let key = (command.to_owned(), user);
        let mut records = lock(&self.records);

        if let Some(record) = records.get_mut(&key) {
            if now.duration_since(record.start) < throttling.duration {
                record.usages = record.usages.saturating_add(1);
                return;
            }

            // window is over but the timer hasn't run yet
            if let Some(stale) = records.remove(&key) {
                stale.expiry.abort();
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let expiry = {
            let records = self.records.clone();
            let key = key.clone();
            let duration = throttling.duration;
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                let mut records = lock(&records);
                if records.get(&key).is_some_and(|r| r.generation == generation) {
                    records.remove(&key);
                }
            })
        };

        records.insert(key, Record {
            start: now,
            usages: 1,
            generation,
            expiry,
        });
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aborts every expiry timer and forgets every record.
    pub fn shutdown(&self) {
        for (_, record) in lock(&self.records).drain() {
            record.expiry.abort();
        }
    }
}
impl Drop for ThrottleTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
