//! Backend boundary: auth provider and RPC transport.

mod auth;
mod http;

pub use auth::PersistedAuth;
pub use http::BackendHttp;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RemoteError;
use crate::session::Session;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current session from persisted state, refreshed if it has expired.
    async fn get_session(&self) -> Result<Option<Session>, RemoteError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, RemoteError>;

    /// Exchanges a refresh token for a new session without persisting it.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, RemoteError>;

    /// Persists a session the manager has accepted as current.
    async fn store_session(&self, session: &Session) -> Result<(), RemoteError>;

    async fn sign_out(&self, session: &Session) -> Result<(), RemoteError>;
}

/// Remote procedure and table access, authorized by a bearer token.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn rpc(&self, bearer: &str, function: &str, params: Value) -> Result<Value, RemoteError>;

    async fn select(&self, bearer: &str, query: &TableQuery) -> Result<Value, RemoteError>;

    async fn insert(&self, bearer: &str, table: &str, row: Value) -> Result<(), RemoteError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Filtered, sorted and limited read of a table or view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: String,
    pub eq: Vec<(String, String)>,
    pub order: Option<(String, SortOrder)>,
    pub limit: Option<u32>,
}

impl TableQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            eq: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.eq.push((column.into(), value.into()));
        self
    }

    pub fn order(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order = Some((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query string pairs in the backend's filter syntax.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        for (column, value) in &self.eq {
            pairs.push((column.clone(), format!("eq.{value}")));
        }
        if let Some((column, order)) = &self.order {
            let dir = match order {
                SortOrder::Asc => "asc",
                SortOrder::Desc => "desc",
            };
            pairs.push(("order".to_string(), format!("{column}.{dir}")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}
