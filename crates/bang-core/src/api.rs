use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::{SessionStore, SESSION_HEADER};

/// REST surface exposed by the alerting server.
pub mod paths {
    pub const INCIDENTS: &str = "api/incident/*";
    pub const ESCALATIONS: &str = "api/escalation/config/*";
    pub const POLICIES: &str = "api/policy/config/*";
    pub const VERSIONS: &str = "api/config/version/*";
    pub const AUTH: &str = "api/auth/user";

    // Names are user input; `/`, `?` and `#` must stay inside the segment.
    pub fn incident(key: &str) -> String {
        format!("api/incident/{}", urlencoding::encode(key))
    }

    pub fn escalation(name: &str) -> String {
        format!("api/escalation/config/{}", urlencoding::encode(name))
    }

    pub fn policy(name: &str) -> String {
        format!("api/policy/config/{}", urlencoding::encode(name))
    }

    pub fn version(hash: &str) -> String {
        format!("api/config/version/{}", urlencoding::encode(hash))
    }
}

/// Verbs the rest of the crate needs from the server. Implementations attach
/// the session token themselves; callers only pass relative paths.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Returns `Value::Null` for an empty body.
    async fn get(&self, path: &str) -> Result<Value, ApiError>;
    async fn post(&self, path: &str, body: Option<&Value>) -> Result<(), ApiError>;
    async fn delete(&self, path: &str) -> Result<(), ApiError>;
    async fn authenticate(&self, username: &str, password: &str) -> Result<String, ApiError>;
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

pub struct HttpApiClient {
    http: Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl HttpApiClient {
    pub fn new(config: &ClientConfig, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // The token is read per request so a login or logout between two polls
    // applies to the very next call.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.url(path))
            .header("accept", "application/json");
        match self.session.current_token() {
            Some(token) => builder.header(SESSION_HEADER, token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let body = Self::send(self.request(Method::GET, path)).await?;
        debug!(path, bytes = body.len(), "GET");
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }

    async fn post(&self, path: &str, body: Option<&Value>) -> Result<(), ApiError> {
        let mut builder = self.request(Method::POST, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Self::send(builder).await?;
        debug!(path, "POST");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        Self::send(self.request(Method::DELETE, path)).await?;
        debug!(path, "DELETE");
        Ok(())
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let builder = self
            .http
            .get(self.url(paths::AUTH))
            .query(&[("user", username), ("pass", password)]);
        let body = Self::send(builder).await?;

        let parsed: AuthResponse =
            serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))?;
        if parsed.token.is_empty() {
            return Err(ApiError::Decode("empty session token".to_string()));
        }

        Ok(parsed.token)
    }
}
