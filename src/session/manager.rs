use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::subscription::{Subscription, SubscriptionSlot};
use super::{AuthEvent, Session, SessionState};
use crate::error::RemoteError;
use crate::remote::AuthProvider;

/// Retry delay for a refresh attempt that failed on the network.
const REFRESH_RETRY: Duration = Duration::from_secs(30);

/// Single source of truth for "is there a logged-in user".
pub struct SessionManager {
    provider: Arc<dyn AuthProvider>,
    state: watch::Sender<SessionState>,
    resolve_timeout: Duration,
    resolve_lock: tokio::sync::Mutex<()>,
    /// Serializes sign-in, sign-out and refresh completion with their persistence.
    transition: tokio::sync::Mutex<()>,
    subscriber: Mutex<Option<Arc<SubscriptionSlot>>>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn AuthProvider>, resolve_timeout: Duration) -> Self {
        let (state, _) = watch::channel(SessionState::Unresolved);
        Self {
            provider,
            state,
            resolve_timeout,
            resolve_lock: tokio::sync::Mutex::new(()),
            transition: tokio::sync::Mutex::new(()),
            subscriber: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Authenticated(_))
    }

    /// Read-only view of the session state for gates and API callers.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolves the session once per process.
    ///
    /// Provider errors and timeouts resolve to `Unauthenticated`. Later calls
    /// return the resolved value without contacting the provider.
    pub async fn resolve_initial_session(&self) -> Option<Session> {
        let _guard = self.resolve_lock.lock().await;
        {
            let current = self.state.borrow();
            if current.is_resolved() {
                return current.session().cloned();
            }
        }

        let session = match tokio::time::timeout(self.resolve_timeout, self.provider.get_session()).await {
            Ok(Ok(session)) => session,
            Ok(Err(err)) => {
                warn!(error = %err, "session resolution failed; continuing signed out");
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.resolve_timeout.as_millis() as u64,
                    "session resolution timed out; continuing signed out"
                );
                None
            }
        };

        let next = match &session {
            Some(session) => SessionState::Authenticated(session.clone()),
            None => SessionState::Unauthenticated,
        };
        self.state.send_replace(next);
        info!(authenticated = session.is_some(), "session resolved");
        session
    }

    /// Registers the single change listener, cancelling any previous one.
    ///
    /// The callback sees `Some(session)` for sign-in and token refresh and
    /// `None` for sign-out. It never fires for the initial resolution.
    pub fn subscribe<F>(&self, mut on_change: F) -> Subscription
    where
        F: FnMut(Option<Session>) + Send + 'static,
    {
        let slot = SubscriptionSlot::new();
        let mut rx = self.state.subscribe();
        let task_slot = Arc::clone(&slot);
        let mut resolved = rx.borrow().is_resolved();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = task_slot.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = rx.borrow_and_update().clone();
                        if !resolved {
                            // Leaving `Unresolved` is the initial resolution.
                            resolved = state.is_resolved();
                            continue;
                        }
                        let payload = match state {
                            SessionState::Unresolved => continue,
                            SessionState::Authenticated(session) => Some(session),
                            SessionState::Unauthenticated => None,
                        };
                        if !task_slot.deliver_if_active(|| on_change(payload)) {
                            break;
                        }
                    }
                }
            }
            debug!("session subscription task finished");
        });

        let previous = self
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&slot));
        if let Some(previous) = previous {
            debug!("replacing previous session subscriber");
            previous.cancel();
        }
        Subscription::new(slot)
    }

    /// Applies a change notification. Ignored until the initial resolution.
    pub fn apply(&self, event: AuthEvent) {
        let next = match event {
            AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => {
                SessionState::Authenticated(session)
            }
            AuthEvent::SignedOut => SessionState::Unauthenticated,
        };
        let applied = self.state.send_if_modified(|current| {
            if !current.is_resolved() {
                return false;
            }
            *current = next;
            true
        });
        if !applied {
            debug!("auth event ignored before initial session resolution");
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let _transition = self.transition.lock().await;
        let session = self.provider.sign_in_with_password(email, password).await?;
        info!(user_id = %session.user_id(), "signed in");
        self.state.send_replace(SessionState::Authenticated(session.clone()));
        Ok(session)
    }

    /// Signs out locally even when the provider call fails.
    pub async fn sign_out(&self) {
        let _transition = self.transition.lock().await;
        if let Some(session) = self.current() {
            if let Err(err) = self.provider.sign_out(&session).await {
                warn!(error = %err, "remote sign-out failed; clearing local session anyway");
            }
        }
        self.apply(AuthEvent::SignedOut);
        info!("signed out");
    }

    /// Spawns the background token refresh loop.
    ///
    /// The session is re-issued `margin` before expiry. A rejected refresh
    /// token signs the user out; network failures retry.
    pub fn spawn_refresh(self: &Arc<Self>, margin: Duration) -> RefreshTask {
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut rx = manager.watch();
            loop {
                let session = rx.borrow_and_update().session().cloned();
                let Some(session) = session else {
                    if rx.changed().await.is_err() {
                        break;
                    }
                    continue;
                };

                let until_refresh = (session.expires_at - Utc::now())
                    .to_std()
                    .unwrap_or_default()
                    .saturating_sub(margin);

                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    _ = tokio::time::sleep(until_refresh) => {}
                }

                match manager.provider.refresh_session(&session.refresh_token).await {
                    Err(RemoteError::Network { message }) => {
                        warn!(error = %message, "token refresh failed; retrying");
                        tokio::time::sleep(REFRESH_RETRY.min(margin.max(Duration::from_secs(1)))).await;
                    }
                    outcome => manager.finish_refresh(&session, outcome).await,
                }
            }
        });
        RefreshTask { handle }
    }

    /// Installs a refresh outcome only if `started_from` is still the current session.
    ///
    /// A sign-out or a different sign-in while the request was in flight wins;
    /// the late outcome is dropped and nothing is persisted.
    async fn finish_refresh(&self, started_from: &Session, outcome: Result<Session, RemoteError>) {
        let _transition = self.transition.lock().await;
        match outcome {
            Ok(refreshed) => {
                let next = SessionState::Authenticated(refreshed.clone());
                if !self.replace_if_current(started_from, next) {
                    debug!(user_id = %refreshed.user_id(), "stale token refresh dropped");
                    return;
                }
                debug!(user_id = %refreshed.user_id(), "session token refreshed");
                if let Err(err) = self.provider.store_session(&refreshed).await {
                    warn!(error = %err, "refreshed session not persisted");
                }
            }
            Err(err) => {
                if self.replace_if_current(started_from, SessionState::Unauthenticated) {
                    warn!(error = %err, "refresh token rejected; signing out");
                } else {
                    debug!(error = %err, "stale refresh rejection dropped");
                }
            }
        }
    }

    /// Compare-and-swap on the session: `next` replaces the state only while
    /// it still holds `expected` (same user and refresh token).
    fn replace_if_current(&self, expected: &Session, next: SessionState) -> bool {
        self.state.send_if_modified(|current| {
            let unchanged = matches!(
                &*current,
                SessionState::Authenticated(held)
                    if held.user_id() == expected.user_id()
                        && held.refresh_token == expected.refresh_token
            );
            if unchanged {
                *current = next;
            }
            unchanged
        })
    }
}

/// Background refresh loop; aborted on drop.
#[derive(Debug)]
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
