//! Error types of the REST store backend.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`RestDaoError`] failures.
pub type RestResult<T> = Result<T, RestDaoError>;

/// Failures that can occur while talking to the REST store.
#[derive(Debug, Error)]
pub enum RestDaoError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build REST store client")]
    ClientBuilder {
        /// Client builder failure.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or timed out at the transport level.
    #[error("failed to send REST store request to `{path}`")]
    RequestSend {
        /// Request path below the base URL.
        path: String,
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The store answered with a non-success status.
    #[error("unexpected REST store response status {status} for `{path}`")]
    RequestStatus {
        /// Request path below the base URL.
        path: String,
        /// Status returned.
        status: StatusCode,
    },
    /// Response payload could not be parsed into the expected rows.
    #[error("failed to decode REST store response for `{path}`")]
    DecodeResponse {
        /// Request path below the base URL.
        path: String,
        /// Decoder failure.
        #[source]
        source: reqwest::Error,
    },
}
