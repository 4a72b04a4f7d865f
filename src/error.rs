//! Error types for the Cinchy client.

use thiserror::Error;

use crate::transaction::TransactionState;

/// Result type alias for Cinchy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Cinchy client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Remote call failed.
    #[error("{message} (status {status:?} {status_text})")]
    Remote {
        message: String,
        status: Option<u16>,
        status_text: String,
        body: Option<String>,
        correlation: Option<String>,
    },

    /// Result schema could not be parsed.
    #[error("Failed to parse column schema for column at index {index}: {message}")]
    MalformedSchema { index: usize, message: String },

    /// Column not found.
    #[error("Column {name} could not be found in the result set")]
    ColumnNotFound { name: String },

    /// Column index out of range.
    #[error("Column index {index} is out of range (columns: {count})")]
    ColumnIndexOutOfRange { index: i64, count: usize },

    /// Column reference is neither a valid name nor an index.
    #[error("Invalid column reference: {reference:?}")]
    InvalidColumnReference { reference: String },

    /// Cursor is not positioned on a row.
    #[error("Cursor is out of the bounds of the result set (position: {position:?}, rows: {row_count})")]
    CursorOutOfBounds {
        position: Option<usize>,
        row_count: usize,
    },

    /// Row index out of range.
    #[error("Row index {index} is out of range (rows: {row_count})")]
    RowIndexOutOfRange { index: usize, row_count: usize },

    /// Row data is not an array of the expected width.
    #[error("Row data for index {index} is in an unexpected format: {message}")]
    MalformedRow { index: usize, message: String },

    /// Multi-value cell text is not well formed.
    #[error("Input text is not a valid multi-value string: {text:?}")]
    InvalidMultiValue { text: String },

    /// Keyed map conversion needs at least two columns.
    #[error("Result sets can only be converted to a keyed map with at least two columns (columns: {count})")]
    InsufficientColumns { count: usize },

    /// Key cell is missing from the row.
    #[error("Key value at row {row} is undefined")]
    UndefinedKey { row: usize },

    /// Same key seen twice.
    #[error("Duplicate key {key:?} found at row {row}")]
    DuplicateKey { key: String, row: usize },

    /// Invalid argument to a client call.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Transaction step issued from the wrong state.
    #[error("Cannot {operation} while transaction is {state:?}")]
    InvalidTransactionState {
        operation: &'static str,
        state: TransactionState,
    },

    /// Invalid client configuration.
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// No usable access token.
    #[error("Not authenticated: {message}")]
    NotAuthenticated { message: String },
}

impl Error {
    /// Create a remote call error without a response.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            status: None,
            status_text: String::new(),
            body: None,
            correlation: None,
        }
    }

    /// Create a malformed schema error.
    pub fn malformed_schema(index: usize, message: impl Into<String>) -> Self {
        Self::MalformedSchema {
            index,
            message: message.into(),
        }
    }

    /// Create a malformed row error.
    pub fn malformed_row(index: usize, message: impl Into<String>) -> Self {
        Self::MalformedRow {
            index,
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Prefix a remote error with the failed operation, keeping status and body.
    pub(crate) fn context(self, operation: impl Into<String>) -> Self {
        match self {
            Self::Remote {
                message,
                status,
                status_text,
                body,
                correlation,
            } => Self::Remote {
                message: format!("{}: {}", operation.into(), message),
                status,
                status_text,
                body,
                correlation,
            },
            Self::Http(e) => Self::Remote {
                message: format!("{}: {}", operation.into(), e),
                status: e.status().map(|s| s.as_u16()),
                status_text: e
                    .status()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or_default()
                    .to_string(),
                body: None,
                correlation: None,
            },
            other => other,
        }
    }

    /// Attach a caller-supplied correlation token to a remote error.
    ///
    /// Other error kinds are returned unchanged.
    pub fn with_correlation(self, token: Option<String>) -> Self {
        match self {
            Self::Remote {
                message,
                status,
                status_text,
                body,
                correlation,
            } => Self::Remote {
                message,
                status,
                status_text,
                body,
                correlation: token.or(correlation),
            },
            other => other,
        }
    }

    /// Correlation token of a remote error, if any.
    pub fn correlation(&self) -> Option<&str> {
        match self {
            Self::Remote { correlation, .. } => correlation.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of a remote error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => *status,
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_only_on_remote() {
        let err = Error::remote("Failed to open connection").with_correlation(Some("q1".into()));
        assert_eq!(err.correlation(), Some("q1"));

        let err = Error::invalid_argument("x").with_correlation(Some("q1".into()));
        assert_eq!(err.correlation(), None);
    }

    #[test]
    fn test_context_keeps_status() {
        let err = Error::Remote {
            message: "Bad Request".into(),
            status: Some(400),
            status_text: "Bad Request".into(),
            body: Some("{}".into()),
            correlation: None,
        }
        .context("Failed to begin transaction on connection c1");

        assert_eq!(err.status(), Some(400));
        assert!(err
            .to_string()
            .starts_with("Failed to begin transaction on connection c1: Bad Request"));
    }
}
