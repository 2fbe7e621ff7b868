use thiserror::Error;

/// Why a workflow run ended in the Failed state.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Request failed with status: {status}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("Completion task failed: {0}")]
    Task(String),
}

impl CompletionError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse(_))
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Errors reported to whoever drives the control.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("A completion is already in progress")]
    Busy,

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("No Tokio runtime is available to run the completion")]
    NoRuntime,
}
