use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{RpcTransport, TableQuery};
use crate::config::AppConfig;
use crate::error::RemoteError;
use crate::session::{Session, User};

/// HTTP client for the backend-as-a-service REST, RPC and auth endpoints.
#[derive(Clone)]
pub struct BackendHttp {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    code: Option<Value>,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| now + chrono::Duration::seconds(self.expires_in.unwrap_or(3600)));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

impl BackendHttp {
    pub fn from_config(config: &AppConfig) -> Result<Self, RemoteError> {
        let (Some(base_url), Some(anon_key)) = (&config.backend_url, &config.anon_key) else {
            return Err(RemoteError::NotConfigured);
        };
        Self::new(base_url, anon_key, config.rpc_timeout)
    }

    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(anon_key)
            .map_err(|_| RemoteError::InvalidConfig {
                message: "anon key is not a valid header value".into(),
            })?;
        headers.insert("apikey", key);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let token = bearer.unwrap_or(&self.anon_key);
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, format!("Bearer {token}"))
    }

    async fn send(builder: RequestBuilder) -> Result<Value, RemoteError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(error_from_body(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    #[instrument(skip(self, password))]
    pub async fn password_grant(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let body = json!({ "email": email, "password": password });
        let value = Self::send(
            self.request(Method::POST, "/auth/v1/token?grant_type=password", None)
                .json(&body),
        )
        .await?;
        let token: TokenResponse = serde_json::from_value(value)?;
        Ok(token.into_session(Utc::now()))
    }

    #[instrument(skip_all)]
    pub async fn refresh_grant(&self, refresh_token: &str) -> Result<Session, RemoteError> {
        let body = json!({ "refresh_token": refresh_token });
        let value = Self::send(
            self.request(Method::POST, "/auth/v1/token?grant_type=refresh_token", None)
                .json(&body),
        )
        .await?;
        let token: TokenResponse = serde_json::from_value(value)?;
        Ok(token.into_session(Utc::now()))
    }

    #[instrument(skip_all)]
    pub async fn logout(&self, access_token: &str) -> Result<(), RemoteError> {
        Self::send(self.request(Method::POST, "/auth/v1/logout", Some(access_token))).await?;
        Ok(())
    }
}

#[async_trait]
impl RpcTransport for BackendHttp {
    #[instrument(skip(self, bearer, params))]
    async fn rpc(&self, bearer: &str, function: &str, params: Value) -> Result<Value, RemoteError> {
        debug!("rpc call");
        Self::send(
            self.request(Method::POST, &format!("/rest/v1/rpc/{function}"), Some(bearer))
                .json(&params),
        )
        .await
    }

    #[instrument(skip(self, bearer), fields(table = %query.table))]
    async fn select(&self, bearer: &str, query: &TableQuery) -> Result<Value, RemoteError> {
        Self::send(
            self.request(Method::GET, &format!("/rest/v1/{}", query.table), Some(bearer))
                .query(&query.to_query_pairs()),
        )
        .await
    }

    #[instrument(skip(self, bearer, row))]
    async fn insert(&self, bearer: &str, table: &str, row: Value) -> Result<(), RemoteError> {
        Self::send(
            self.request(Method::POST, &format!("/rest/v1/{table}"), Some(bearer))
                .header(CONTENT_TYPE, "application/json")
                .header("Prefer", "return=minimal")
                .json(&row),
        )
        .await?;
        Ok(())
    }
}

fn error_from_body(status: StatusCode, text: &str) -> RemoteError {
    if status == StatusCode::UNAUTHORIZED {
        return RemoteError::Unauthorized;
    }
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
    let message = body
        .message
        .or(body.error_description)
        .or(body.msg)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    let code = body.code.map(|code| match code {
        Value::String(s) => s,
        other => other.to_string(),
    });
    RemoteError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}
