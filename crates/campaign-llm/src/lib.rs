//! Generation client for personalised campaign messages.
//!
//! The pipeline only sees [`MessageGenerator`]; [`GeminiGenerator`] is the
//! production implementation and [`TimeoutGenerator`] wraps any generator
//! with a per-call deadline.

pub mod error;
pub mod gemini;
pub mod generator;
pub mod prompt;
pub mod protocol;

pub use error::{ConfigurationError, Result, ServiceError, ServiceErrorKind};
pub use gemini::{
    GeminiGenerator, MarketingContent, MarketingRequest, CREDENTIAL_VAR, LEAD_STRATEGY_EMPTY,
    LEAD_STRATEGY_UNAVAILABLE,
};
pub use generator::{MessageGenerator, TimeoutGenerator, DEFAULT_REQUEST_TIMEOUT};
