//! Error types for the shortdiary client.
//!
//! # Design
//! `MissingData` is raised locally before any request is built. `Authentication`
//! and `Server` come from non-2xx responses; the service treats a rejected login
//! as a special kind of server error, so `is_server_error` reports both.
//! A malformed date in a server record surfaces as `InvalidDate` rather than
//! being folded into `Server`, since the response itself was successful.

use thiserror::Error;

/// Errors returned by `Client` and `Entry` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// `save` was called on an entry without text, date or mood.
    #[error("entry is missing text, date or mood")]
    MissingData,

    /// The server answered 401 to the supplied credentials.
    #[error("authentication failed")]
    Authentication,

    /// Any other non-2xx response. Carries the server's `Error` message or the
    /// raw response body.
    #[error("server error: {0}")]
    Server(String),

    /// A post record carried a date that is not `YYYY-MM-DD`.
    #[error("invalid post date {value:?}: {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A 2xx body was not JSON or did not have the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The API root or an endpoint did not form a usable http(s) URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The request never produced an HTTP response.
    #[error("transport failed: {0}")]
    Transport(String),
}

impl ApiError {
    /// True for errors reported by the server, including `Authentication`.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ApiError::Authentication | ApiError::Server(_))
    }
}
