use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use super::{AuthProvider, BackendHttp};
use crate::database::SessionStore;
use crate::error::RemoteError;
use crate::session::Session;

/// Auth provider that persists the session locally and restores it at start.
pub struct PersistedAuth {
    http: BackendHttp,
    store: SessionStore,
    refresh_margin: Duration,
}

impl PersistedAuth {
    pub fn new(http: BackendHttp, store: SessionStore, refresh_margin: Duration) -> Self {
        Self {
            http,
            store,
            refresh_margin,
        }
    }
}

#[async_trait]
impl AuthProvider for PersistedAuth {
    async fn get_session(&self) -> Result<Option<Session>, RemoteError> {
        let Some(stored) = self.store.load().await? else {
            return Ok(None);
        };
        let margin = chrono::Duration::from_std(self.refresh_margin).unwrap_or_default();
        if !stored.is_expired_at(Utc::now() + margin) {
            return Ok(Some(stored));
        }

        match self.http.refresh_grant(&stored.refresh_token).await {
            Ok(session) => {
                self.store.save(&session).await?;
                info!(user_id = %session.user_id(), "restored session refreshed");
                Ok(Some(session))
            }
            Err(RemoteError::Network { .. }) if !stored.is_expired_at(Utc::now()) => Ok(Some(stored)),
            Err(err @ RemoteError::Network { .. }) => Err(err),
            Err(err) => {
                warn!(error = %err, "stored session rejected; clearing");
                self.store.clear().await?;
                Ok(None)
            }
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let session = self.http.password_grant(email, password).await?;
        self.store.save(&session).await?;
        Ok(session)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, RemoteError> {
        self.http.refresh_grant(refresh_token).await
    }

    async fn store_session(&self, session: &Session) -> Result<(), RemoteError> {
        self.store.save(session).await?;
        Ok(())
    }

    async fn sign_out(&self, session: &Session) -> Result<(), RemoteError> {
        let remote = self.http.logout(&session.access_token).await;
        self.store.clear().await?;
        remote
    }
}
