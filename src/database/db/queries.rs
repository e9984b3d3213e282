use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::database::models::StoredSession;
use crate::session::Session;

/*==========Session Queries=========== */

// Replace the persisted session (single slot)
pub async fn save_session(pool: &Pool<Sqlite>, session: &Session) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO auth_session (slot, user_id, email, access_token, refresh_token, expires_at, saved_at)
        VALUES (1, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(slot) DO UPDATE SET
            user_id       = excluded.user_id,
            email         = excluded.email,
            access_token  = excluded.access_token,
            refresh_token = excluded.refresh_token,
            expires_at    = excluded.expires_at,
            saved_at      = excluded.saved_at
        "#,
    )
    .bind(&session.user.id)
    .bind(session.user.email.as_deref())
    .bind(&session.access_token)
    .bind(&session.refresh_token)
    .bind(session.expires_at)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

// Load the persisted session, if any
pub async fn load_session(pool: &Pool<Sqlite>) -> Result<Option<StoredSession>, sqlx::Error> {
    sqlx::query_as::<_, StoredSession>(
        r#"
        SELECT user_id, email, access_token, refresh_token, expires_at
        FROM auth_session
        WHERE slot = 1
        "#,
    )
    .fetch_optional(pool)
    .await
}

// Forget the persisted session
pub async fn clear_session(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM auth_session")
        .execute(pool)
        .await?;
    Ok(())
}
