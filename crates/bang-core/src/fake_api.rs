use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::{paths, ApiClient};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct FakeState {
    routes: HashMap<String, Value>,
    failing: HashSet<String>,
    users: HashMap<(String, String), String>,
    calls: Vec<Call>,
}

/// In-memory server. GETs answer from `routes`; deleting an incident removes
/// it from the `api/incident/*` route the way the real server would.
#[derive(Default)]
pub(crate) struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, path: &str, body: Value) {
        self.state.lock().unwrap().routes.insert(path.to_string(), body);
    }

    pub fn fail(&self, path: &str) {
        self.state.lock().unwrap().failing.insert(path.to_string());
    }

    pub fn heal(&self, path: &str) {
        self.state.lock().unwrap().failing.remove(path);
    }

    pub fn user(&self, username: &str, password: &str, token: &str) {
        self.state
            .lock()
            .unwrap()
            .users
            .insert((username.to_string(), password.to_string()), token.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    fn record(&self, method: &'static str, path: &str, body: Option<Value>) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            method,
            path: path.to_string(),
            body,
        });
        if state.failing.contains(path) {
            return Err(ApiError::Status {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.record("GET", path, None)?;
        let state = self.state.lock().unwrap();
        Ok(state.routes.get(path).cloned().unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Option<&Value>) -> Result<(), ApiError> {
        self.record("POST", path, body.cloned())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.record("DELETE", path, None)?;
        if let Some(key) = path.strip_prefix("api/incident/") {
            let key = urlencoding::decode(key).expect("utf-8 incident key");
            let mut state = self.state.lock().unwrap();
            if let Some(Value::Object(incidents)) = state.routes.get_mut(paths::INCIDENTS) {
                incidents.remove(key.as_ref());
            }
        }
        Ok(())
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<String, ApiError> {
        self.record("GET", paths::AUTH, None)?;
        let state = self.state.lock().unwrap();
        state
            .users
            .get(&(username.to_string(), password.to_string()))
            .cloned()
            .ok_or(ApiError::Unauthorized { status: 401 })
    }
}
