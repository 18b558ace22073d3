//! Error taxonomy for KAKEN searches.

/// Boxed underlying cause carried by [`KakenError::Response`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced to callers of the client
#[derive(Debug, thiserror::Error)]
pub enum KakenError {
    /// Invalid search parameters, exhausted retries, or a non-success HTTP status
    #[error("Request error: {message}")]
    Request {
        message: String,
        status: Option<u16>,
    },

    /// HTTP 404
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The response body could not be parsed into the expected shape
    #[error("Response error: {message}")]
    Response {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// HTTP 401, for callers layering authentication on top
    #[error("Authentication error: {message}")]
    Auth { message: String, status: u16 },

    /// HTTP 429, for callers layering quota handling on top
    #[error("Rate limit exceeded: {message}")]
    RateLimit { message: String, status: u16 },
}

impl KakenError {
    /// Request error without an HTTP status
    pub fn request(message: impl Into<String>) -> Self {
        KakenError::Request {
            message: message.into(),
            status: None,
        }
    }

    /// Response error without an underlying cause
    pub fn response(message: impl Into<String>) -> Self {
        KakenError::Response {
            message: message.into(),
            source: None,
        }
    }

    /// Response error wrapping `cause`
    pub fn response_with(message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        KakenError::Response {
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    /// Map an HTTP status to its typed error.
    ///
    /// The client itself only distinguishes 404; this mapping is offered to
    /// callers that want 401/429 as distinct variants.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => KakenError::Auth { message, status },
            404 => KakenError::NotFound { message },
            429 => KakenError::RateLimit { message, status },
            _ => KakenError::Request {
                message,
                status: Some(status),
            },
        }
    }

    /// HTTP status associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            KakenError::Request { status, .. } => *status,
            KakenError::NotFound { .. } => Some(404),
            KakenError::Response { .. } => None,
            KakenError::Auth { status, .. } | KakenError::RateLimit { status, .. } => Some(*status),
        }
    }

    /// Whether this is a [`KakenError::Response`]
    pub fn is_response_error(&self) -> bool {
        matches!(self, KakenError::Response { .. })
    }
}

impl From<quick_xml::Error> for KakenError {
    fn from(err: quick_xml::Error) -> Self {
        KakenError::response_with(format!("XML: {}", err), err)
    }
}

impl From<serde_json::Error> for KakenError {
    fn from(err: serde_json::Error) -> Self {
        KakenError::response_with(format!("JSON: {}", err), err)
    }
}
