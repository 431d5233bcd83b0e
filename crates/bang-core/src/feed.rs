use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use crate::api::{paths, ApiClient};
use crate::error::ApiError;
use crate::incident::{decode_incidents, IncidentEntry};

/// Keeps the active incident list live. Two states only: a schedule exists
/// (polling) or it does not (stopped).
///
/// Each tick spawns its fetch instead of awaiting it, so ticks stay on the
/// wall-clock cadence even when the server is slow. Overlapping fetches are
/// allowed and the last one to complete wins, which can briefly let an older
/// response replace a newer list.
pub struct IncidentFeed<C: ApiClient + ?Sized + 'static> {
    client: Arc<C>,
    interval: Duration,
    incidents: Arc<watch::Sender<Vec<IncidentEntry>>>,
    schedule: Option<JoinHandle<()>>,
}

impl<C: ApiClient + ?Sized + 'static> IncidentFeed<C> {
    pub fn new(client: Arc<C>, interval: Duration) -> Self {
        Self {
            client,
            interval,
            incidents: Arc::new(watch::Sender::new(Vec::new())),
            schedule: None,
        }
    }

    pub fn incidents(&self) -> Vec<IncidentEntry> {
        self.incidents.borrow().clone()
    }

    /// Fires whenever a fetch publishes a new list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<IncidentEntry>> {
        self.incidents.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.schedule.is_some()
    }

    /// Fetches once right away, then polls every interval. Calling it while
    /// already polling only performs the immediate fetch.
    pub async fn start(&mut self) {
        if let Err(err) = self.refresh().await {
            warn!(%err, "incident fetch failed; keeping previous list");
        }

        if self.schedule.is_some() {
            return;
        }

        let client = Arc::clone(&self.client);
        let incidents = Arc::clone(&self.incidents);
        let period = self.interval;

        self.schedule = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let client = Arc::clone(&client);
                let incidents = Arc::clone(&incidents);
                tokio::spawn(async move {
                    if let Err(err) = refresh_into(client.as_ref(), &incidents).await {
                        warn!(%err, "incident poll failed; keeping previous list");
                    }
                });
            }
        }));

        info!(interval_ms = period.as_millis() as u64, "incident polling started");
    }

    /// Cancels the schedule. Fetches already in flight still land.
    pub fn stop(&mut self) {
        if let Some(handle) = self.schedule.take() {
            handle.abort();
            info!("incident polling stopped");
        }
    }

    pub async fn refresh(&self) -> Result<usize, ApiError> {
        refresh_into(self.client.as_ref(), &self.incidents).await
    }

    /// Deletes the incident on the server, then re-fetches without waiting
    /// for the next tick.
    pub async fn resolve(&self, key: &str) -> Result<(), ApiError> {
        self.client.delete(&paths::incident(key)).await?;
        info!(key, "incident resolved");

        if let Err(err) = self.refresh().await {
            warn!(%err, "re-fetch after resolve failed");
        }
        Ok(())
    }
}

impl<C: ApiClient + ?Sized + 'static> Drop for IncidentFeed<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.schedule.take() {
            handle.abort();
        }
    }
}

async fn refresh_into<C: ApiClient + ?Sized>(
    client: &C,
    incidents: &watch::Sender<Vec<IncidentEntry>>,
) -> Result<usize, ApiError> {
    let body = client.get(paths::INCIDENTS).await?;
    let entries = decode_incidents(body)?;
    let count = entries.len();
    incidents.send_replace(entries);
    debug!(count, "incidents refreshed");
    Ok(count)
}
