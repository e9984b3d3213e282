use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// At most one fetch per key is in flight; concurrent callers share its outcome.
///
/// The first caller for a key becomes the leader and gets a [`Flight`]. Later
/// callers get a receiver that yields whatever the leader publishes, errors
/// included. The key's entry is removed when the leader's flight ends.
pub struct QueryCoalescer<K, V> {
    inflight: Mutex<HashMap<K, watch::Receiver<Option<V>>>>,
}

pub enum Claim<'a, K, V>
where
    K: Eq + Hash + Clone,
{
    Leader(Flight<'a, K, V>),
    Follower(watch::Receiver<Option<V>>),
}

/// The leader's slot for one key. Dropping it without [`Flight::finish`]
/// closes the channel so followers can claim the key again.
pub struct Flight<'a, K, V>
where
    K: Eq + Hash + Clone,
{
    coalescer: &'a QueryCoalescer<K, V>,
    key: K,
    outcome: watch::Sender<Option<V>>,
}

impl<K, V> Default for QueryCoalescer<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> QueryCoalescer<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, watch::Receiver<Option<V>>>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn claim(&self, key: &K) -> Claim<'_, K, V> {
        let mut inflight = self.lock();
        if let Some(existing) = inflight.get(key) {
            return Claim::Follower(existing.clone());
        }
        let (outcome, rx) = watch::channel(None);
        inflight.insert(key.clone(), rx);
        Claim::Leader(Flight {
            coalescer: self,
            key: key.clone(),
            outcome,
        })
    }

    /// Number of keys with a fetch in flight.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Flight<'_, K, V>
where
    K: Eq + Hash + Clone,
{
    /// Publishes the outcome to every follower and releases the key.
    pub fn finish(self, outcome: V) {
        self.outcome.send_replace(Some(outcome));
    }
}

impl<K, V> Drop for Flight<'_, K, V>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        self.coalescer.lock().remove(&self.key);
    }
}
