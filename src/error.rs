use thiserror::Error;

/// Crate-wide error type.
///
/// The variants are exactly the conditions the embedding UI has to tell
/// apart: forced logout, terminal load failures, rolled-back mutations, and
/// disabled capture controls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing, expired, or rejected session token. Callers of gated
    /// operations respond by forcing logout.
    #[error("not authorized, please log in again")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    /// The saved artifact carries no CV text or job description, so
    /// interview questions cannot be generated from it. Terminal for the
    /// coaching session; the user has to pick a different item.
    #[error("this saved item is missing the CV text or job description required here")]
    IncompleteSource,

    /// Non-success HTTP status other than 401/404.
    #[error("server error {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("speech recognition is not supported in this environment")]
    CaptureUnsupported,

    #[error("could not start speech recognition: {0}")]
    CaptureDenied(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Text fit for component state and screens. Transport errors collapse
    /// to one message instead of leaking reqwest's chain.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "Network error. Please check your connection and try again.".into(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
