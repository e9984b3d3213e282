use thiserror::Error;

/// Failure reported by the remote backend boundary (auth or RPC).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("network error: {message}")]
    Network { message: String },
    #[error("unexpected response: {message}")]
    Decode { message: String },
    #[error("not signed in")]
    Unauthorized,
    #[error("backend is not configured")]
    NotConfigured,
    #[error("invalid backend configuration: {message}")]
    InvalidConfig { message: String },
    #[error("local session store: {message}")]
    LocalStore { message: String },
}

impl RemoteError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: None,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            RemoteError::decode(value.to_string())
        } else {
            RemoteError::network(value.to_string())
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(value: serde_json::Error) -> Self {
        RemoteError::decode(value.to_string())
    }
}

/// Why a query did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledReason {
    SessionUnresolved,
    SignedOut,
    NoScope,
    ScopeMismatch,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("query disabled: {0:?}")]
    Disabled(DisabledReason),
    /// The result arrived for a key or view that is no longer current.
    #[error("result discarded")]
    Discarded,
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl QueryError {
    /// Disabled and discarded outcomes are expected control flow, not user-facing failures.
    pub fn is_silent(&self) -> bool {
        matches!(self, QueryError::Disabled(_) | QueryError::Discarded)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("session store migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl From<StoreError> for RemoteError {
    fn from(value: StoreError) -> Self {
        RemoteError::LocalStore {
            message: value.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {name}")]
    Invalid { name: &'static str, value: String },
}
