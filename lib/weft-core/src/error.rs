//! Error types for weft.

use bytes::Bytes;
use derive_more::{Display, Error, From};

/// Boxed error returned by external collaborators such as refresh actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============================================================================
// Error Decoder Trait
// ============================================================================

/// Trait for decoding HTTP error responses into typed errors.
///
/// The decoder receives the HTTP status code and response body of a response
/// whose status is not accepted, and can optionally return a decoded error.
///
/// # Example
///
/// ```ignore
/// use weft::ErrorDecoder;
///
/// #[derive(Debug, Deserialize, derive_more::Display, derive_more::Error)]
/// #[display("{code}: {message}")]
/// struct ApiError {
///     code: String,
///     message: String,
/// }
///
/// struct MyErrorDecoder;
///
/// impl ErrorDecoder for MyErrorDecoder {
///     type Error = ApiError;
///
///     fn decode(&self, status: u16, body: &bytes::Bytes) -> Option<Self::Error> {
///         serde_json::from_slice(body).ok()
///     }
/// }
/// ```
pub trait ErrorDecoder: Send + Sync + 'static {
    /// The decoded error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Decode an HTTP error response into a typed error.
    ///
    /// Returns `Some(error)` if the response should be surfaced as
    /// [`Error::Api`], or `None` to fall back to [`Error::Http`].
    fn decode(&self, status: u16, body: &Bytes) -> Option<Self::Error>;
}

/// Default error decoder that always returns `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorDecoder;

impl ErrorDecoder for DefaultErrorDecoder {
    type Error = std::convert::Infallible;

    fn decode(&self, _status: u16, _body: &Bytes) -> Option<Self::Error> {
        None
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for weft operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Unexpected HTTP status, with the offending body when available.
    #[display("HTTP error {status}: {message}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
        /// Response body, if available.
        #[error(not(source))]
        body: Option<Bytes>,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Terminal failure raised by an interceptor.
    #[display("interceptor {interceptor} failed: {message}")]
    #[from(skip)]
    Interceptor {
        /// Name of the interceptor that failed.
        interceptor: &'static str,
        /// Error message.
        message: String,
    },

    /// The credential refresh action failed.
    ///
    /// Always terminal, whatever the refresh action returned.
    #[display("credential refresh failed: {_0}")]
    #[from(skip)]
    CredentialRefresh(#[error(not(source))] BoxError),

    /// Retries were requested past the attempt budget and no cause was ever recorded.
    #[display("retries exhausted after {attempts} attempts")]
    #[from(skip)]
    RetriesExhausted {
        /// Number of attempts performed.
        attempts: u32,
    },

    /// Error response decoded by an [`ErrorDecoder`].
    #[display("API error {status}: {error}")]
    #[from(skip)]
    Api {
        /// HTTP status code.
        status: u16,
        /// Decoded error.
        #[error(not(source))]
        error: BoxError,
    },
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an HTTP error from status code and message.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: None,
        }
    }

    /// Create an HTTP error with body.
    #[must_use]
    pub fn http_with_body(status: u16, message: impl Into<String>, body: Bytes) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body: Some(body),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a terminal interceptor error.
    #[must_use]
    pub fn interceptor(interceptor: &'static str, message: impl Into<String>) -> Self {
        Self::Interceptor {
            interceptor,
            message: message.into(),
        }
    }

    /// Wrap a failure of a credential refresh action.
    #[must_use]
    pub fn credential_refresh(error: impl Into<BoxError>) -> Self {
        Self::CredentialRefresh(error.into())
    }

    /// Wrap a decoded API error.
    #[must_use]
    pub fn api(status: u16, error: impl Into<BoxError>) -> Self {
        Self::Api {
            status,
            error: error.into(),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the retry budget ran out without any recorded cause.
    #[must_use]
    pub const fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    /// Returns `true` if a credential refresh action failed.
    #[must_use]
    pub const fn is_credential_refresh(&self) -> bool {
        matches!(self, Self::CredentialRefresh(_))
    }

    /// Returns the HTTP status code for HTTP and API errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }

    /// Returns the response body if this is an HTTP error with a body.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// The error returned by the refresh action, for downcasting.
    #[must_use]
    pub fn refresh_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::CredentialRefresh(error) => Some(error.as_ref()),
            _ => None,
        }
    }

    /// The decoded API error, for downcasting.
    #[must_use]
    pub fn api_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Api { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}
