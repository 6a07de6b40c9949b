use thiserror::Error;

/// Typed error hierarchy for the booking chat client.
///
/// Use at module boundaries (transport calls, engine operations, config validation).
/// Internal/leaf functions can continue using `anyhow::Result`; the `Internal` variant
/// allows seamless conversion via the `?` operator.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation already in progress: {0}")]
    Busy(&'static str),

    #[error("Conversation has been closed")]
    Closed,

    #[error("Transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
        retryable: bool,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded")]
    RateLimit { retry_after: Option<u64> },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for results using ChatError.
pub type ChatResult<T> = std::result::Result<T, ChatError>;

impl ChatError {
    /// Whether this error is transient and the operation could be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { retryable, .. } => *retryable,
            Self::RateLimit { .. } => true,
            Self::InvalidInput(_)
            | Self::Busy(_)
            | Self::Closed
            | Self::Auth(_)
            | Self::Decode(_)
            | Self::Config(_)
            | Self::Internal(_) => false,
        }
    }

    /// HTTP status attached to the error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::RateLimit { .. } => Some(429),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Self::Decode(e.to_string());
        }
        Self::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
            retryable: e.is_timeout() || e.is_connect(),
        }
    }
}
