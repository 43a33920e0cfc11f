//! Error types for the bus wrapper.

use thiserror::Error;

/// Errors that can occur on the internal bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// Underlying ZeroMQ socket error.
    #[error("socket error: {0}")]
    Socket(#[from] zeromq::ZmqError),
}
