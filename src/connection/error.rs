//! Error types for the transports.

/// Transport and protocol faults.
///
/// None of these are fatal: callers log them, surface a notice and recover
/// by reconnecting or waiting for the next poll.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Endpoint could not be built from the configured base URL.
    #[error("invalid endpoint {endpoint}: {source}")]
    InvalidUrl {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    /// Request never produced a response.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response arrived with a non-success status.
    #[error("server answered {status}")]
    Status { status: u16 },

    /// Inbound payload was not the JSON we expect.
    #[error("malformed payload: {0}")]
    Protocol(#[from] serde_json::Error),

    /// Socket handshake or stream failure.
    #[error("socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Socket task has gone away.
    #[error("socket closed")]
    Closed,
}
