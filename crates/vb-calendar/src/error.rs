//! Error types for vb-calendar

use thiserror::Error;

/// vb-calendar error type
#[derive(Error, Debug)]
pub enum CalendarError {
    /// Stay dates missing, malformed, or check-out not after check-in
    #[error("{0}")]
    InvalidRange(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unexpected status: {0}")]
    Status(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("iCalendar parsing error: {0}")]
    ParseError(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// Internal fault not attributable to a single calendar source
    #[error("Aggregation failed: {0}")]
    Aggregation(String),
}

impl CalendarError {
    /// Whether the caller sent bad input (as opposed to a server-side fault)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRange(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CalendarError>;
