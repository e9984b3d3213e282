use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info};

use super::coalesce::{Claim, QueryCoalescer};
use super::key::{QueryKey, ResourceKind};
use super::view::ViewGuard;
use crate::error::{DisabledReason, QueryError, RemoteError};
use crate::models::ProjectId;
use crate::session::SessionState;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    fetched_at: Instant,
}

/// Version of a key's cache slot; a fetch only stores its result if the
/// stamp taken before the request still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    epoch: u64,
    generation: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    by_kind: HashMap<ResourceKind, HashSet<QueryKey>>,
    generations: HashMap<(ResourceKind, Option<ProjectId>), u64>,
    epoch: u64,
}

impl CacheState {
    fn stamp(&self, key: &QueryKey) -> Stamp {
        Stamp {
            epoch: self.epoch,
            generation: self
                .generations
                .get(&(key.kind, key.scope.clone()))
                .copied()
                .unwrap_or(0),
        }
    }

    fn insert(&mut self, key: &QueryKey, value: Value) {
        self.by_kind.entry(key.kind).or_default().insert(key.clone());
        self.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    fn invalidate(&mut self, kind: ResourceKind, scope: Option<&ProjectId>) -> usize {
        *self
            .generations
            .entry((kind, scope.cloned()))
            .or_insert(0) += 1;

        let Some(keys) = self.by_kind.get_mut(&kind) else {
            return 0;
        };
        let doomed: Vec<QueryKey> = keys
            .iter()
            .filter(|key| key.scope.as_ref() == scope)
            .cloned()
            .collect();
        for key in &doomed {
            keys.remove(key);
            self.entries.remove(key);
        }
        doomed.len()
    }

    fn drop_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.by_kind.clear();
        self.epoch += 1;
        count
    }
}

/// Cache of remote read results keyed by `(kind, scope, params)`.
pub struct QueryClient {
    state: Mutex<CacheState>,
    coalescer: QueryCoalescer<QueryKey, Result<Value, QueryError>>,
    session: watch::Receiver<SessionState>,
    scope: watch::Receiver<Option<ProjectId>>,
}

impl QueryClient {
    pub fn new(
        session: watch::Receiver<SessionState>,
        scope: watch::Receiver<Option<ProjectId>>,
    ) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            coalescer: QueryCoalescer::new(),
            session,
            scope,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks whether a read for `key` may run right now.
    pub fn check_enabled(&self, key: &QueryKey) -> Result<(), QueryError> {
        match &*self.session.borrow() {
            SessionState::Unresolved => {
                return Err(QueryError::Disabled(DisabledReason::SessionUnresolved))
            }
            SessionState::Unauthenticated => {
                return Err(QueryError::Disabled(DisabledReason::SignedOut))
            }
            SessionState::Authenticated(_) => {}
        }
        if !key.kind.is_scoped() {
            return Ok(());
        }
        match (&key.scope, &*self.scope.borrow()) {
            (_, None) => Err(QueryError::Disabled(DisabledReason::NoScope)),
            (Some(wanted), Some(current)) if wanted == current => Ok(()),
            _ => Err(QueryError::Disabled(DisabledReason::ScopeMismatch)),
        }
    }

    pub fn is_enabled(&self, key: &QueryKey) -> bool {
        self.check_enabled(key).is_ok()
    }

    /// Returns the cached value for `key`, fetching it if absent.
    ///
    /// Concurrent calls for the same key share one remote request and its
    /// outcome, failures included. A result whose key was disabled or
    /// invalidated while in flight is not stored, and a result for an
    /// unmounted view is not delivered; both surface as
    /// `QueryError::Discarded`. Remote failures leave the key absent.
    pub async fn fetch<F, Fut>(
        &self,
        key: &QueryKey,
        view: &ViewGuard,
        fetcher: F,
    ) -> Result<Value, QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, RemoteError>>,
    {
        loop {
            self.check_enabled(key)?;
            match self.coalescer.claim(key) {
                Claim::Leader(flight) => {
                    let outcome = self.load(key, fetcher).await;
                    flight.finish(outcome.clone());
                    return outcome.and_then(|value| Self::deliver(view, value));
                }
                Claim::Follower(mut rx) => {
                    let shared = rx
                        .wait_for(Option::is_some)
                        .await
                        .ok()
                        .and_then(|outcome| (*outcome).clone());
                    if let Some(outcome) = shared {
                        debug!(%key, "query joined in-flight fetch");
                        return outcome.and_then(|value| Self::deliver(view, value));
                    }
                    debug!(%key, "in-flight fetch abandoned; claiming the key");
                }
            }
        }
    }

    /// Cache lookup, then the remote call; run only by the key's leader.
    async fn load<F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<Value, QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, RemoteError>>,
    {
        let stamp = {
            let state = self.lock();
            if let Some(entry) = state.entries.get(key) {
                debug!(%key, age_ms = entry.fetched_at.elapsed().as_millis() as u64, "query cache hit");
                return Ok(entry.value.clone());
            }
            state.stamp(key)
        };

        debug!(%key, "query fetch");
        let value = fetcher().await.map_err(|err| {
            debug!(%key, error = %err, "query fetch failed");
            QueryError::Remote(err)
        })?;

        if self.check_enabled(key).is_err() {
            debug!(%key, "query result discarded: key no longer enabled");
            return Err(QueryError::Discarded);
        }
        let mut state = self.lock();
        if state.stamp(key) != stamp {
            debug!(%key, "query result discarded: invalidated while in flight");
            return Err(QueryError::Discarded);
        }
        state.insert(key, value.clone());
        Ok(value)
    }

    fn deliver(view: &ViewGuard, value: Value) -> Result<Value, QueryError> {
        if view.is_mounted() {
            Ok(value)
        } else {
            Err(QueryError::Discarded)
        }
    }

    /// Runs a mutation; on success invalidates `kinds` under `scope`.
    ///
    /// A failed mutation leaves the cache untouched.
    pub async fn mutate<T, Fut>(
        &self,
        scope: Option<&ProjectId>,
        kinds: &[ResourceKind],
        op: Fut,
    ) -> Result<T, RemoteError>
    where
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let out = op.await?;
        for kind in kinds {
            self.invalidate(*kind, scope);
        }
        Ok(out)
    }

    /// Drops every cached read of `kind` under `scope`.
    pub fn invalidate(&self, kind: ResourceKind, scope: Option<&ProjectId>) {
        let removed = self.lock().invalidate(kind, scope);
        debug!(kind = kind.as_str(), scope = ?scope.map(ProjectId::as_str), removed, "query cache invalidated");
    }

    /// Coarse fallback: drops every cached read.
    pub fn invalidate_all(&self) {
        let removed = self.lock().drop_all();
        debug!(removed, "query cache invalidated (all)");
    }

    /// Drops everything, e.g. when the signed-in user changes.
    pub fn clear(&self) {
        let removed = self.lock().drop_all();
        info!(removed, "query cache cleared");
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn get(&self, key: &QueryKey) -> Option<Value> {
        self.lock().entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every cached value by key.
    pub fn snapshot(&self) -> HashMap<QueryKey, Value> {
        self.lock()
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }
}
