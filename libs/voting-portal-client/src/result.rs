pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Broad category of an [`Error`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request never produced a usable response.
    Transport,

    /// The server answered with a status outside 2xx.
    HttpStatus,

    /// The server answered 2xx but rejected the operation (`success: false`).
    Rejected,

    /// A client-side requirement was not met, so no request was sent.
    PreconditionFailed,

    /// The server answered with a body we could not use.
    MalformedResponse,

    /// Reading or writing the token store failed.
    Storage,

    /// Another submission is already in flight.
    Busy,
}

/// Errors produced by the voting portal client. The `Display` output is the
/// message shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    HttpStatus {
        status_code: reqwest::StatusCode,
        message: String,
    },

    #[error("{0}")]
    Rejected(String),

    #[error("No authorization token found")]
    MissingToken,

    #[error("Session expired at {0}")]
    SessionExpired(time::OffsetDateTime),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    MalformedResponse(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("a login request is already in progress")]
    SubmitInProgress,
}

impl Error {
    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Rejected(_) => ErrorKind::Rejected,
            Self::MissingToken | Self::SessionExpired(_) | Self::Url(_) => {
                ErrorKind::PreconditionFailed
            }
            Self::Json(_) | Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::Storage(_) => ErrorKind::Storage,
            Self::SubmitInProgress => ErrorKind::Busy,
        }
    }

    /// The HTTP status code, if this error came from a non-2xx response.
    #[must_use]
    pub const fn status_code(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::HttpStatus { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
