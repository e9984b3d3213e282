mod support;

use std::time::Duration;

use chrono::{TimeZone, Utc};

use shared_expense_tracker::database::SessionStore;
use shared_expense_tracker::remote::{AuthProvider, BackendHttp, PersistedAuth};
use support::session_expiring;

fn at_offset(secs: i64) -> chrono::DateTime<Utc> {
    // Stored timestamps carry whole seconds.
    Utc.timestamp_opt(Utc::now().timestamp() + secs, 0).unwrap()
}

/// Nothing listens on the discard port, so refresh attempts fail as network errors.
fn unreachable_backend() -> BackendHttp {
    BackendHttp::new("http://127.0.0.1:9", "anon-key", Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn session_round_trips_through_sqlite() {
    let store = SessionStore::in_memory().await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);

    let session = session_expiring("u1", at_offset(3600));
    store.save(&session).await.unwrap();
    assert_eq!(store.load().await.unwrap(), Some(session));

    let replacement = session_expiring("u2", at_offset(7200));
    store.save(&replacement).await.unwrap();
    assert_eq!(store.load().await.unwrap(), Some(replacement));

    store.clear().await.unwrap();
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn fresh_stored_session_is_restored_without_the_network() {
    let store = SessionStore::in_memory().await.unwrap();
    let session = session_expiring("u1", at_offset(3600));
    store.save(&session).await.unwrap();
    let auth = PersistedAuth::new(unreachable_backend(), store, Duration::from_secs(60));

    assert_eq!(auth.get_session().await.unwrap(), Some(session));
}

#[tokio::test]
async fn offline_restore_keeps_a_session_that_has_not_expired() {
    let store = SessionStore::in_memory().await.unwrap();
    let session = session_expiring("u1", at_offset(30));
    store.save(&session).await.unwrap();
    let auth = PersistedAuth::new(unreachable_backend(), store.clone(), Duration::from_secs(60));

    assert_eq!(auth.get_session().await.unwrap(), Some(session.clone()));
    assert_eq!(store.load().await.unwrap(), Some(session));
}

#[tokio::test]
async fn offline_restore_of_an_expired_session_is_an_error() {
    let store = SessionStore::in_memory().await.unwrap();
    store.save(&session_expiring("u1", at_offset(-30))).await.unwrap();
    let auth = PersistedAuth::new(unreachable_backend(), store, Duration::from_secs(60));

    assert!(auth.get_session().await.is_err());
}

#[tokio::test]
async fn timestamps_are_stored_as_sqlite_datetimes() {
    let store = SessionStore::in_memory().await.unwrap();
    let expires_at = at_offset(3600);
    store.save(&session_expiring("u1", expires_at)).await.unwrap();

    let (stored_expiry, saved_at): (chrono::DateTime<Utc>, chrono::DateTime<Utc>) =
        sqlx::query_as("SELECT expires_at, saved_at FROM auth_session")
            .fetch_one(store.pool())
            .await
            .unwrap();

    assert_eq!(stored_expiry, expires_at);
    assert!(saved_at <= Utc::now());
}

#[tokio::test]
async fn unreadable_row_is_dropped() {
    let store = SessionStore::in_memory().await.unwrap();
    sqlx::query(
        "INSERT INTO auth_session (slot, user_id, email, access_token, refresh_token, expires_at, saved_at)
         VALUES (1, 'u1', NULL, 'a', 'r', 'next tuesday', 'now')",
    )
    .execute(store.pool())
    .await
    .unwrap();

    assert_eq!(store.load().await.unwrap(), None);
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_session")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(rows, 0);
}
