pub mod api;
pub mod catalog;
pub mod config;
pub mod draft;
pub mod error;
pub mod escalation;
pub mod feed;
pub mod history;
pub mod incident;
pub mod policy;
pub mod session;

#[cfg(test)]
mod fake_api;
#[cfg(test)]
mod api_tests;
#[cfg(test)]
mod history_tests;
#[cfg(test)]
mod incident_tests;

pub use api::{ApiClient, HttpApiClient};
pub use catalog::ConfigCatalog;
pub use config::ClientConfig;
pub use draft::{ConfigDraftBuilder, Draft};
pub use error::{ApiError, DraftError, SessionError, SubmitError};
pub use escalation::{EscalationDraft, EscalationStep, OptionField, StepType, Transform};
pub use feed::IncidentFeed;
pub use history::{ConfigSnapshot, Confirm, RevertOutcome, VersionHistory};
pub use incident::{Incident, IncidentEntry, Status};
pub use policy::{Chip, Condition, ConditionDraft, NotMatch, PolicyConfig, PolicyDraft};
pub use session::{Session, SessionStore, SESSION_HEADER};
