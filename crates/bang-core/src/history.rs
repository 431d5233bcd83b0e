use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::{paths, ApiClient};
use crate::error::ApiError;

const SNAPSHOT_DATE_FORMAT: &str = "%-I:%-M:%-S %B-%d- %Y";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub hash: String,
    #[serde(rename = "time_stamp")]
    pub timestamp: DateTime<Utc>,
}

impl ConfigSnapshot {
    pub fn display_date_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        self.timestamp
            .with_timezone(tz)
            .format(SNAPSHOT_DATE_FORMAT)
            .to_string()
    }

    pub fn display_date(&self) -> String {
        self.display_date_in(&Local)
    }
}

/// Operator yes/cancel dialog.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, title: &str, message: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertOutcome {
    Reverted,
    Cancelled,
}

pub struct VersionHistory<C: ApiClient + ?Sized> {
    client: Arc<C>,
    snapshots: Vec<ConfigSnapshot>,
    by_hash: HashMap<String, ConfigSnapshot>,
}

impl<C: ApiClient + ?Sized> VersionHistory<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            snapshots: Vec::new(),
            by_hash: HashMap::new(),
        }
    }

    /// Newest first.
    pub fn snapshots(&self) -> &[ConfigSnapshot] {
        &self.snapshots
    }

    pub fn snapshots_by_hash(&self) -> &HashMap<String, ConfigSnapshot> {
        &self.by_hash
    }

    pub fn snapshot(&self, hash: &str) -> Option<&ConfigSnapshot> {
        self.by_hash.get(hash)
    }

    /// On failure the previously fetched list is kept.
    pub async fn fetch_snapshots(&mut self) -> Result<usize, ApiError> {
        let body = self.client.get(paths::VERSIONS).await?;
        let fetched: Option<Vec<ConfigSnapshot>> =
            serde_json::from_value(body).map_err(|err| ApiError::Decode(err.to_string()))?;

        let mut snapshots = fetched.unwrap_or_default();
        snapshots.sort_by_key(|snap| snap.timestamp);
        snapshots.reverse();

        self.by_hash = snapshots
            .iter()
            .map(|snap| (snap.hash.clone(), snap.clone()))
            .collect();
        self.snapshots = snapshots;

        debug!(count = self.snapshots.len(), "config snapshots refreshed");
        Ok(self.snapshots.len())
    }

    /// Asks the operator first; nothing is sent unless they confirm.
    pub async fn request_revert<F: Confirm + ?Sized>(
        &mut self,
        hash: &str,
        confirm: &F,
    ) -> Result<RevertOutcome, ApiError> {
        let message = format!("Are you sure you want to revert to config version: {hash}");
        if !confirm.confirm("Revert Config", &message).await {
            debug!(hash, "revert cancelled");
            return Ok(RevertOutcome::Cancelled);
        }

        self.set_current(hash).await?;
        Ok(RevertOutcome::Reverted)
    }

    /// Points the server at `hash`, then reloads the list. No local state
    /// changes unless the server accepts.
    pub async fn set_current(&mut self, hash: &str) -> Result<(), ApiError> {
        self.client.post(&paths::version(hash), None).await?;
        info!(hash, "config version set as current");

        if let Err(err) = self.fetch_snapshots().await {
            warn!(%err, "snapshot refresh after revert failed");
        }
        Ok(())
    }
}
