//! Error types for the dispatcher.

use thiserror::Error;

type Source = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by a posting target.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The post call itself failed.
    #[error("post failed: {0}")]
    Post(#[source] Source),

    /// Session setup or refresh failed.
    #[error("session error: {0}")]
    Session(#[source] Source),
}

impl TargetError {
    pub fn post(err: impl Into<Source>) -> Self {
        Self::Post(err.into())
    }

    pub fn session(err: impl Into<Source>) -> Self {
        Self::Session(err.into())
    }
}

/// Errors that terminate a dispatcher.
///
/// A post failure is deliberately fatal: the process exits non-zero and a
/// supervisor restarts it with a clean session.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The posting target failed.
    #[error(transparent)]
    Target(#[from] TargetError),

    /// The bus subscription ended.
    #[error("bus subscription closed")]
    BusClosed,
}
