//! Query failure types

use thiserror::Error;

/// Failure talking to one of the external data services
#[derive(Debug, Clone, Error)]
#[error("{operation} failed for {key}: {message}")]
pub struct QueryError {
    pub kind: QueryErrorKind,
    /// Which outbound call failed (e.g. `calendarByPin`)
    pub operation: &'static str,
    /// Key the call was made with
    pub key: String,
    pub message: String,
}

impl QueryError {
    pub fn new(
        kind: QueryErrorKind,
        operation: &'static str,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            operation,
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn network(operation: &'static str, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::Network, operation, key, message)
    }

    pub fn status(operation: &'static str, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::Status, operation, key, message)
    }

    pub fn parse(operation: &'static str, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::Parse, operation, key, message)
    }
}

/// Error classification
///
/// `Network` and `Status` are transport failures, `Parse` is an unexpected
/// response shape. All three look the same to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Connection failures, timeouts
    Network,
    /// Non-success HTTP status
    Status,
    /// Body did not match the expected shape
    Parse,
}

impl QueryErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Status => "status",
            Self::Parse => "parse",
        }
    }
}
