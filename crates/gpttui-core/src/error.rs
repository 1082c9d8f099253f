use thiserror::Error;

#[derive(Error, Debug)]
pub enum GptError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store is closed")]
    StoreClosed,

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid session name '{0}': use letters, digits and '_' (max 64, not starting with a digit)")]
    InvalidSessionName(String),

    #[error("Session '{0}' has no messages")]
    EmptySession(String),

    #[error("Backend gave no usable reply after {attempts} attempt(s): {last_error}")]
    BackendExhausted { attempts: u32, last_error: String },

    #[error("Unexpected backend response: {0}")]
    BackendProtocol(String),

    #[error("Backend returned HTTP {status}: {message}")]
    BackendStatus { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("A turn is already in flight for this session")]
    TurnInProgress,

    #[error("Refusing to send an empty message")]
    EmptyInput,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GptError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::BackendProtocol(message.into())
    }

    /// True for errors that leave the store unusable for the rest of the process.
    pub fn is_store_fatal(&self) -> bool {
        matches!(self, Self::StoreClosed | Self::StoreUnavailable(_))
    }
}

impl From<rusqlite::Error> for GptError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GptError>;
