use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

const DESCRIBE_TIME_FORMAT: &str = "%-I:%-M:%-S%p %B-%d-%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Status {
    Ok = 0,
    Warning = 1,
    Critical = 2,
}

impl Status {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Status::Ok => "green",
            Status::Warning => "#FFFD82",
            Status::Critical => "#FB5C5C",
        }
    }
}

impl TryFrom<i64> for Status {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Status::Ok),
            1 => Ok(Status::Warning),
            2 => Ok(Status::Critical),
            other => Err(format!("unknown status code {other}")),
        }
    }
}

impl From<Status> for i64 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(default)]
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_service: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub metric: f64,
    /// Unix seconds.
    pub time: i64,
    pub status: Status,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub policy: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub escalation: String,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub tags: BTreeMap<String, String>,
}

// The server writes an absent tag map as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Incident {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }

    /// `db.primary on web-1 is 93.12 at 10:13:20PM November-14-2023`
    pub fn describe_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        let sub = match self.sub_service.as_deref().filter(|s| !s.is_empty()) {
            Some(sub) => format!(".{sub}"),
            None => " ".to_string(),
        };
        let at = self
            .timestamp()
            .map(|ts| ts.with_timezone(tz).format(DESCRIBE_TIME_FORMAT).to_string())
            .unwrap_or_else(|| "unknown time".to_string());

        format!(
            "{}{} on {} is {:.2} at {}",
            self.service, sub, self.host, self.metric, at
        )
    }

    pub fn describe(&self) -> String {
        self.describe_in(&Local)
    }

    // Newer servers nest service/host under the event tags.
    fn backfill_from_tags(&mut self) {
        if self.service.is_empty() {
            if let Some(service) = self.tags.get("service") {
                self.service = service.clone();
            }
        }
        if self.host.is_empty() {
            if let Some(host) = self.tags.get("host") {
                self.host = host.clone();
            }
        }
        if self.sub_service.is_none() {
            self.sub_service = self.tags.get("sub_service").cloned();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentEntry {
    pub key: String,
    #[serde(rename = "value")]
    pub incident: Incident,
}

/// Decodes the `key -> incident` mapping served by `api/incident/*` and puts
/// it in display order. `null` is an empty set.
pub fn decode_incidents(body: Value) -> Result<Vec<IncidentEntry>, ApiError> {
    let raw: Option<BTreeMap<String, Incident>> =
        serde_json::from_value(body).map_err(|err| ApiError::Decode(err.to_string()))?;
    Ok(order_incidents(raw.unwrap_or_default()))
}

/// Status descending, then time descending. Keys break the remaining ties so
/// repeated polls of the same data render identically.
pub fn order_incidents(raw: BTreeMap<String, Incident>) -> Vec<IncidentEntry> {
    let mut entries: Vec<IncidentEntry> = raw
        .into_iter()
        .map(|(key, mut incident)| {
            incident.backfill_from_tags();
            IncidentEntry { key, incident }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.incident
            .status
            .cmp(&a.incident.status)
            .then(b.incident.time.cmp(&a.incident.time))
            .then_with(|| a.key.cmp(&b.key))
    });

    entries
}
