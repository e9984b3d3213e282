#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use shared_expense_tracker::error::RemoteError;
use shared_expense_tracker::remote::{AuthProvider, RpcTransport, TableQuery};
use shared_expense_tracker::runtime::AppRuntime;
use shared_expense_tracker::session::{Session, User};

pub fn session_expiring(user: &str, expires_at: DateTime<Utc>) -> Session {
    Session {
        access_token: format!("access-{user}"),
        refresh_token: format!("refresh-{user}"),
        expires_at,
        user: User {
            id: user.to_string(),
            email: Some(format!("{user}@example.com")),
        },
    }
}

pub fn session_for(user: &str) -> Session {
    session_expiring(user, Utc::now() + chrono::Duration::hours(1))
}

/// In-memory backend standing in for both the auth service and the RPC API.
///
/// Calls are recorded by name: `get_session`, `sign_in`, `refresh`,
/// `store_session`, `sign_out`, RPC function names, `select:<table>` and `insert:<table>`.
pub struct FakeBackend {
    calls: Mutex<Vec<String>>,
    stored: Mutex<Option<Session>>,
    session_delay: Mutex<Option<Duration>>,
    responses: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashMap<String, RemoteError>>,
    held: Mutex<HashSet<String>>,
    gate: Semaphore,
    inserted: Mutex<Vec<(String, Value)>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            stored: Mutex::new(None),
            session_delay: Mutex::new(None),
            responses: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            held: Mutex::new(HashSet::new()),
            gate: Semaphore::new(0),
            inserted: Mutex::new(Vec::new()),
        })
    }

    pub fn signed_in(user: &str) -> Arc<Self> {
        let backend = Self::new();
        backend.set_stored(Some(session_for(user)));
        backend
    }

    pub fn set_stored(&self, session: Option<Session>) {
        *self.stored.lock().unwrap() = session;
    }

    pub fn stored(&self) -> Option<Session> {
        self.stored.lock().unwrap().clone()
    }

    pub fn delay_session(&self, delay: Duration) {
        *self.session_delay.lock().unwrap() = Some(delay);
    }

    pub fn respond(&self, name: &str, value: Value) {
        self.responses.lock().unwrap().insert(name.to_string(), value);
    }

    pub fn fail(&self, name: &str, err: RemoteError) {
        self.failures.lock().unwrap().insert(name.to_string(), err);
    }

    pub fn succeed(&self, name: &str) {
        self.failures.lock().unwrap().remove(name);
    }

    /// Makes calls named `name` wait until `release` hands out a permit.
    pub fn hold(&self, name: &str) {
        self.held.lock().unwrap().insert(name.to_string());
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    pub fn remote_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !matches!(c.as_str(), "get_session" | "sign_in" | "refresh" | "store_session" | "sign_out"))
            .count()
    }

    pub fn inserted(&self) -> Vec<(String, Value)> {
        self.inserted.lock().unwrap().clone()
    }

    /// Yields until a call named `name` has been recorded.
    pub async fn wait_for_call(&self, name: &str) {
        while self.count(name) == 0 {
            tokio::task::yield_now().await;
        }
    }

    async fn enter(&self, name: &str) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(name.to_string());
        let held = self.held.lock().unwrap().contains(name);
        if held {
            self.gate.acquire().await.unwrap().forget();
        }
        match self.failures.lock().unwrap().get(name) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn response(&self, name: &str) -> Value {
        self.responses
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| json!([]))
    }
}

#[async_trait]
impl AuthProvider for FakeBackend {
    async fn get_session(&self) -> Result<Option<Session>, RemoteError> {
        self.calls.lock().unwrap().push("get_session".into());
        let delay = *self.session_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failures.lock().unwrap().get("get_session") {
            return Err(err.clone());
        }
        Ok(self.stored.lock().unwrap().clone())
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Session, RemoteError> {
        self.enter("sign_in").await?;
        let user = email.split('@').next().unwrap_or(email);
        let session = session_for(user);
        self.set_stored(Some(session.clone()));
        Ok(session)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, RemoteError> {
        self.enter("refresh").await?;
        let user = refresh_token.trim_start_matches("refresh-");
        let mut session = session_for(user);
        session.access_token = format!("access-{user}-refreshed");
        Ok(session)
    }

    async fn store_session(&self, session: &Session) -> Result<(), RemoteError> {
        self.enter("store_session").await?;
        self.set_stored(Some(session.clone()));
        Ok(())
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), RemoteError> {
        let result = self.enter("sign_out").await;
        self.set_stored(None);
        result
    }
}

#[async_trait]
impl RpcTransport for FakeBackend {
    async fn rpc(&self, _bearer: &str, function: &str, _params: Value) -> Result<Value, RemoteError> {
        self.enter(function).await?;
        Ok(self.response(function))
    }

    async fn select(&self, _bearer: &str, query: &TableQuery) -> Result<Value, RemoteError> {
        let name = format!("select:{}", query.table);
        self.enter(&name).await?;
        Ok(self.response(&name))
    }

    async fn insert(&self, _bearer: &str, table: &str, row: Value) -> Result<(), RemoteError> {
        self.enter(&format!("insert:{table}")).await?;
        self.inserted.lock().unwrap().push((table.to_string(), row));
        Ok(())
    }
}

pub fn runtime(backend: &Arc<FakeBackend>) -> Arc<AppRuntime> {
    Arc::new(AppRuntime::new(
        backend.clone(),
        backend.clone(),
        Duration::from_secs(5),
    ))
}

/// Runtime with the session already resolved from the backend's stored session.
pub async fn started(backend: &Arc<FakeBackend>) -> Arc<AppRuntime> {
    let rt = runtime(backend);
    rt.start().await;
    rt
}
