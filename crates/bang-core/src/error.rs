use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("not authorized (status {status})")]
    Unauthorized { status: u16 },
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Bad credentials or a missing/expired token. The caller decides whether
    /// to send the operator back to the login screen.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub(crate) fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ApiError::Unauthorized { status },
            _ => ApiError::Status { status, body },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("a name is required")]
    MissingName,
    #[error("select a step type first")]
    MissingStepType,
    #[error("unknown step type {0}")]
    UnknownStepType(String),
    #[error("{step} steps have no option named {field}")]
    UnknownOption { step: String, field: String },
    #[error("chip key and value must both be set")]
    EmptyChip,
    #[error("draft is not a {0} draft")]
    WrongKind(&'static str),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] DraftError),
    #[error("failed to encode payload: {0}")]
    Encode(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<serde_json::Error> for SubmitError {
    fn from(err: serde_json::Error) -> Self {
        SubmitError::Encode(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("session storage: {0}")]
    Storage(String),
}
