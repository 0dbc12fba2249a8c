//! Error types for rbot.
//!
//! Failures reported by a provider (HTTP status errors, transport failures,
//! a missing API key) share the [`Error::Provider`] variant and are told
//! apart by [`ProviderErrorKind`]. Everything else is local: configuration,
//! session files, the command line and the web form.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

type Source = Arc<dyn error::Error + Send + Sync>;

/// What went wrong while talking to a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The API key was missing or rejected.
    Authentication,
    /// The key lacks access to the model or endpoint.
    Permission,
    /// The model or endpoint does not exist.
    NotFound,
    /// Too many requests.
    RateLimit,
    /// The request did not finish in time.
    Timeout,
    /// The provider could not be reached.
    Connection,
    /// The provider failed internally.
    InternalServer,
    /// The provider is overloaded or a gateway failed.
    ServiceUnavailable,
    /// Any other status, with the provider's error type when it sent one.
    Other(Option<String>),
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::Authentication => f.write_str("Authentication error"),
            ProviderErrorKind::Permission => f.write_str("Permission error"),
            ProviderErrorKind::NotFound => f.write_str("Resource not found"),
            ProviderErrorKind::RateLimit => f.write_str("Rate limit exceeded"),
            ProviderErrorKind::Timeout => f.write_str("Timeout error"),
            ProviderErrorKind::Connection => f.write_str("Connection error"),
            ProviderErrorKind::InternalServer => f.write_str("Internal server error"),
            ProviderErrorKind::ServiceUnavailable => f.write_str("Service unavailable"),
            ProviderErrorKind::Other(Some(error_type)) => f.write_str(error_type),
            ProviderErrorKind::Other(None) => f.write_str("API error"),
        }
    }
}

/// The main error type for rbot.
#[derive(Clone, Debug)]
pub enum Error {
    /// A provider call failed.
    Provider {
        /// Failure class.
        kind: ProviderErrorKind,
        /// Human-readable error message.
        message: String,
        /// HTTP status, when the provider answered.
        status_code: Option<u16>,
        /// Request ID for support.
        request_id: Option<String>,
        /// Seconds to wait before retrying, when advertised.
        retry_after: Option<u64>,
        /// Underlying transport error.
        source: Option<Source>,
    },

    /// A request could not be interpreted, by a provider or by the web
    /// front-end.
    BadRequest {
        /// Human-readable error message.
        message: String,
        /// Offending parameter.
        param: Option<String>,
    },

    /// The HTTP client could not be built or could not read a response.
    HttpClient {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Source>,
    },

    /// JSON could not be read or written.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Source>,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// The engine catalog could not be read or is inconsistent.
    Config {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Source>,
    },

    /// A value failed validation, such as a session name escaping the
    /// sessions directory.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// The command line could not be interpreted.
    Usage {
        /// Human-readable error message.
        message: String,
    },

    /// A base URL could not be parsed.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },

    /// Anything else, such as a provider reply with no content.
    Unknown {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    fn provider(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Error::Provider {
            kind,
            message: message.into(),
            status_code: None,
            request_id: None,
            retry_after: None,
            source: None,
        }
    }

    /// A provider error for a status with no dedicated kind.
    pub fn api(
        status_code: u16,
        error_type: Option<String>,
        message: String,
        request_id: Option<String>,
    ) -> Self {
        Error::Provider {
            kind: ProviderErrorKind::Other(error_type),
            message,
            status_code: Some(status_code),
            request_id,
            retry_after: None,
            source: None,
        }
    }

    /// Missing or rejected credentials.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::provider(ProviderErrorKind::Authentication, message)
    }

    /// Insufficient permissions.
    pub fn permission(message: impl Into<String>) -> Self {
        Self::provider(ProviderErrorKind::Permission, message)
    }

    /// Unknown model or endpoint.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::provider(ProviderErrorKind::NotFound, message)
    }

    /// Rate limited, with the advertised retry delay.
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        let mut err = Self::provider(ProviderErrorKind::RateLimit, message);
        err.set_retry_after(retry_after);
        err
    }

    /// A request that could not be interpreted.
    pub fn bad_request(message: impl Into<String>, param: Option<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
            param,
        }
    }

    /// A timed-out request; `duration` is the client timeout in seconds.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        let message = match duration {
            Some(duration) => format!("{} ({duration} seconds)", message.into()),
            None => message.into(),
        };
        Self::provider(ProviderErrorKind::Timeout, message)
    }

    /// The provider could not be reached.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        let mut err = Self::provider(ProviderErrorKind::Connection, message);
        if let Error::Provider { source: slot, .. } = &mut err {
            *slot = source.map(Arc::from);
        }
        err
    }

    /// A 500 from the provider.
    pub fn internal_server(message: impl Into<String>, request_id: Option<String>) -> Self {
        let mut err = Self::provider(ProviderErrorKind::InternalServer, message);
        if let Error::Provider { request_id: slot, .. } = &mut err {
            *slot = request_id;
        }
        err
    }

    /// A 502-504 from the provider.
    pub fn service_unavailable(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        let mut err = Self::provider(ProviderErrorKind::ServiceUnavailable, message);
        err.set_retry_after(retry_after);
        err
    }

    /// JSON failure.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// I/O failure, with context in `message`.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// HTTP client failure.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Catalog failure.
    pub fn config(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Config {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Validation failure on `param`.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Command-line failure.
    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage {
            message: message.into(),
        }
    }

    /// URL failure.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Anything else.
    pub fn unknown(message: impl Into<String>) -> Self {
        Error::Unknown {
            message: message.into(),
        }
    }

    fn set_retry_after(&mut self, value: Option<u64>) {
        if let Error::Provider { retry_after, .. } = self {
            *retry_after = value;
        }
    }

    /// The provider failure class, if this is a provider error.
    pub fn provider_kind(&self) -> Option<&ProviderErrorKind> {
        match self {
            Error::Provider { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// True when the API key was missing or rejected.
    pub fn is_authentication(&self) -> bool {
        self.provider_kind() == Some(&ProviderErrorKind::Authentication)
    }

    /// True when the provider throttled the request (429).
    pub fn is_rate_limit(&self) -> bool {
        self.provider_kind() == Some(&ProviderErrorKind::RateLimit)
    }

    /// True when the request timed out before a response arrived.
    pub fn is_timeout(&self) -> bool {
        self.provider_kind() == Some(&ProviderErrorKind::Timeout)
    }

    /// True for 500 and 502-504 responses.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self.provider_kind(),
            Some(ProviderErrorKind::InternalServer | ProviderErrorKind::ServiceUnavailable)
        )
    }

    /// True for a 400 from a provider or a malformed request to the web server.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::BadRequest { .. })
    }

    /// True for filesystem and socket failures.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io { .. })
    }

    /// True for an unusable engine catalog or data directory.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config { .. })
    }

    /// True when an input was rejected before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// True for bad command-line arguments.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage { .. })
    }

    /// The provider's request ID, if it sent one.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Error::Provider { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// The HTTP status the provider answered with.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Provider { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Provider {
                kind,
                message,
                request_id,
                retry_after,
                ..
            } => {
                write!(f, "{kind}: {message}")?;
                if let Some(retry_after) = retry_after {
                    write!(f, " (retry after {retry_after} seconds)")?;
                }
                if let Some(request_id) = request_id {
                    write!(f, " (Request ID: {request_id})")?;
                }
                Ok(())
            }
            Error::BadRequest { message, param } | Error::Validation { message, param } => {
                let label = if self.is_bad_request() {
                    "Bad request"
                } else {
                    "Validation error"
                };
                match param {
                    Some(param) => write!(f, "{label}: {message} (parameter: {param})"),
                    None => write!(f, "{label}: {message}"),
                }
            }
            Error::HttpClient { message, .. } => write!(f, "HTTP client error: {message}"),
            Error::Serialization { message, .. } => write!(f, "Serialization error: {message}"),
            Error::Io { message, .. } => write!(f, "I/O error: {message}"),
            Error::Config { message, .. } => write!(f, "Configuration error: {message}"),
            Error::Usage { message } => f.write_str(message),
            Error::Url { message, .. } => write!(f, "URL error: {message}"),
            Error::Unknown { message } => write!(f, "Unknown error: {message}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Provider { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Serialization { source, .. }
            | Error::Config { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source.as_ref()),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::config(format!("YAML error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

/// A specialized Result type for rbot operations.
pub type Result<T> = std::result::Result<T, Error>;
