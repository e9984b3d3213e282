use sqlx::{Pool, Sqlite};
use tracing::warn;

use super::db::{connection, migrate, queries};
use super::models::StoredSession;
use crate::error::StoreError;
use crate::session::Session;

/// Local persistence for the authentication session.
#[derive(Clone)]
pub struct SessionStore {
    pool: Pool<Sqlite>,
}

impl SessionStore {
    pub async fn open(db_url: &str) -> Result<Self, StoreError> {
        let pool = connection::get_db_pool(db_url).await?;
        Self::with_pool(pool).await
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = connection::get_memory_pool().await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: Pool<Sqlite>) -> Result<Self, StoreError> {
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn save(&self, session: &Session) -> Result<(), StoreError> {
        queries::save_session(&self.pool, session).await?;
        Ok(())
    }

    /// Loads the stored session; an unreadable row is dropped and reported as absent.
    pub async fn load(&self) -> Result<Option<Session>, StoreError> {
        match queries::load_session(&self.pool).await {
            Ok(row) => Ok(row.map(StoredSession::into_session)),
            Err(err @ sqlx::Error::ColumnDecode { .. }) => {
                warn!(error = %err, "discarding unreadable stored session");
                queries::clear_session(&self.pool).await?;
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        queries::clear_session(&self.pool).await?;
        Ok(())
    }
}
