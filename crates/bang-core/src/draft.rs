use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::api::{paths, ApiClient};
use crate::error::{DraftError, SubmitError};
use crate::escalation::EscalationDraft;
use crate::policy::PolicyDraft;

#[derive(Debug, Clone)]
pub enum Draft {
    Escalation(EscalationDraft),
    Policy(PolicyDraft),
}

impl Draft {
    pub fn kind(&self) -> &'static str {
        match self {
            Draft::Escalation(_) => "escalation",
            Draft::Policy(_) => "policy",
        }
    }

    fn reset(&mut self) {
        *self = match self {
            Draft::Escalation(_) => Draft::Escalation(EscalationDraft::new()),
            Draft::Policy(_) => Draft::Policy(PolicyDraft::new()),
        };
    }

    /// Validates the draft and produces the request that would submit it.
    fn request(&self) -> Result<(String, String, Value), SubmitError> {
        match self {
            Draft::Escalation(draft) => {
                let (name, body) = draft.payload()?;
                Ok((paths::escalation(&name), name, body))
            }
            Draft::Policy(draft) => {
                let policy = draft.build_policy()?;
                let body = serde_json::to_value(&policy)?;
                Ok((paths::policy(&policy.name), policy.name, body))
            }
        }
    }
}

/// Accumulates operator edits for one configuration object and submits it in
/// a single request. The draft resets after a successful submit or a cancel
/// and is left untouched when the submit fails.
pub struct ConfigDraftBuilder<C: ApiClient + ?Sized> {
    client: Arc<C>,
    draft: Draft,
}

impl<C: ApiClient + ?Sized> ConfigDraftBuilder<C> {
    pub fn escalation(client: Arc<C>) -> Self {
        Self {
            client,
            draft: Draft::Escalation(EscalationDraft::new()),
        }
    }

    pub fn policy(client: Arc<C>) -> Self {
        Self {
            client,
            draft: Draft::Policy(PolicyDraft::new()),
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn escalation_mut(&mut self) -> Result<&mut EscalationDraft, DraftError> {
        match &mut self.draft {
            Draft::Escalation(draft) => Ok(draft),
            Draft::Policy(_) => Err(DraftError::WrongKind("escalation")),
        }
    }

    pub fn policy_mut(&mut self) -> Result<&mut PolicyDraft, DraftError> {
        match &mut self.draft {
            Draft::Policy(draft) => Ok(draft),
            Draft::Escalation(_) => Err(DraftError::WrongKind("policy")),
        }
    }

    /// Posts the draft under its name, replacing any object of the same name.
    /// Validation failures are returned before any request is made.
    pub async fn submit(&mut self) -> Result<String, SubmitError> {
        let (path, name, body) = self.draft.request()?;
        self.client.post(&path, Some(&body)).await?;

        info!(kind = self.draft.kind(), name = %name, "configuration submitted");
        self.draft.reset();
        Ok(name)
    }

    pub fn cancel(&mut self) {
        self.draft.reset();
    }
}
