//! Error types for the ingress gateway.

use thiserror::Error;

/// Errors that can occur while talking to the upstream provider.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No API key was supplied.
    #[error("no api key")]
    NoApiKey,

    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A provider response did not parse as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider rejected the socket request.
    #[error("Error code:{code} message:{message}")]
    Upstream { code: i64, message: String },

    /// The provider answered with an unrecognised status.
    #[error("unknown response: {status}")]
    UnknownResponse { status: String },

    /// The negotiated session offered no subprotocol.
    #[error("no websocket protocol offered")]
    MissingProtocol,

    /// WebSocket transport error during connect.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The negotiated subprotocol is not a valid header value.
    #[error("invalid header value: {0}")]
    Header(#[from] tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue),

    /// Publishing to the internal bus failed.
    #[error("bus error: {0}")]
    Bus(#[from] eew_bus::BusError),
}

/// Errors while materialising the body of a `data` frame. These drop the
/// frame but keep the session alive.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed data frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base64 body: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("gzip decompression failed: {0}")]
    Gzip(#[from] std::io::Error),

    #[error("unknown encoding {0:?}")]
    UnknownEncoding(String),

    #[error("unsupported compression {0:?}")]
    UnsupportedCompression(String),
}
