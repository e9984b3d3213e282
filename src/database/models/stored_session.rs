use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::session::{Session, User};

#[derive(FromRow, Debug, Clone)]
pub struct StoredSession {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at,
            user: User {
                id: self.user_id,
                email: self.email,
            },
        }
    }
}
