use thiserror::Error;

/// Failures of a single backend call.
///
/// Every variant is meant to be handled where the call was made and shown as
/// a message scoped to the view that issued it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The backend answered 401. The navigator has already been sent to the
    /// login page; callers render nothing.
    #[error("Authentication required")]
    AuthRequired,

    /// Non-success status with a structured `{"error": ...}` body, or a JSON
    /// body without one (the message is then `HTTP <status>`).
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// Non-success status whose body is not JSON.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Transport failure: DNS, refused connection, timeout.
    #[error("{0}")]
    Network(String),

    /// A success body that does not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Writing a downloaded body to its destination failed.
    #[error("Failed to write download: {0}")]
    Io(String),
}

impl ApiError {
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            Self::Network("Network error".to_string())
        } else {
            Self::Network(message)
        }
    }

    /// HTTP status carried by the error, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthRequired => Some(401),
            Self::Backend { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthRequired)
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
