use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::api::{paths, ApiClient};
use crate::error::ApiError;
use crate::escalation::EscalationStep;
use crate::policy::PolicyConfig;

/// Read and delete side of the escalation and policy configuration.
pub struct ConfigCatalog<C: ApiClient + ?Sized> {
    client: Arc<C>,
}

impl<C: ApiClient + ?Sized> ConfigCatalog<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub async fn escalations(&self) -> Result<BTreeMap<String, Vec<EscalationStep>>, ApiError> {
        let body = self.client.get(paths::ESCALATIONS).await?;
        decode_map(body)
    }

    /// Candidate targets for a policy's crit/warn section.
    pub async fn escalation_names(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.escalations().await?.into_keys().collect())
    }

    pub async fn delete_escalation(&self, name: &str) -> Result<(), ApiError> {
        self.client.delete(&paths::escalation(name)).await?;
        info!(name, "escalation deleted");
        Ok(())
    }

    pub async fn policies(&self) -> Result<BTreeMap<String, PolicyConfig>, ApiError> {
        let body = self.client.get(paths::POLICIES).await?;
        decode_map(body)
    }

    pub async fn delete_policy(&self, name: &str) -> Result<(), ApiError> {
        self.client.delete(&paths::policy(name)).await?;
        info!(name, "policy deleted");
        Ok(())
    }
}

// Older servers answer an empty collection with the string "null".
fn decode_map<T: DeserializeOwned>(body: Value) -> Result<BTreeMap<String, T>, ApiError> {
    match body {
        Value::Null => Ok(BTreeMap::new()),
        Value::String(s) if s == "null" || s.is_empty() => Ok(BTreeMap::new()),
        other => serde_json::from_value(other).map_err(|err| ApiError::Decode(err.to_string())),
    }
}
