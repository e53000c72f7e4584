use std::fmt;

use thiserror::Error;

/// Classification tag carried by every generation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    RateLimited,
    Transient,
    Timeout,
    Authentication,
    Configuration,
    MalformedResponse,
    Api,
}

impl ServiceErrorKind {
    fn retryable_by_default(self) -> bool {
        matches!(
            self,
            ServiceErrorKind::RateLimited | ServiceErrorKind::Transient | ServiceErrorKind::Timeout
        )
    }
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceErrorKind::RateLimited => "Rate limited",
            ServiceErrorKind::Transient => "Transient",
            ServiceErrorKind::Timeout => "Timeout",
            ServiceErrorKind::Authentication => "Authentication",
            ServiceErrorKind::Configuration => "Configuration",
            ServiceErrorKind::MalformedResponse => "Malformed response",
            ServiceErrorKind::Api => "API",
        };
        f.write_str(label)
    }
}

/// A failed `synthesize` call, tagged so callers can decide between retrying,
/// skipping the record, or abandoning the whole run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub retryable: bool,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            retryable: kind.retryable_by_default(),
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::RateLimited, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Transient, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Timeout, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Authentication, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Configuration, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::MalformedResponse, message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Api, message)
    }

    /// The service cannot work at all; no other record will fare better.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self.kind,
            ServiceErrorKind::Authentication | ServiceErrorKind::Configuration
        )
    }
}

/// Raised once, when a generator is constructed without what it needs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Missing credential: set {0} to enable message generation")]
    MissingCredential(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl From<ConfigurationError> for ServiceError {
    fn from(error: ConfigurationError) -> Self {
        ServiceError::configuration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
