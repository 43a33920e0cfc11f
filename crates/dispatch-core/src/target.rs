//! The posting contract a social target implements.

use std::time::Duration;

use async_trait::async_trait;
use eew_core::Advisory;

use crate::error::TargetError;

/// Thread position of a follow-up post.
///
/// `root` is the handle of the first bulletin of the event and never moves;
/// `parent` is the handle of the most recent bulletin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRef<H> {
    pub root: H,
    pub parent: H,
}

/// A social broadcast target.
///
/// The dispatcher drives exactly one instance from its single consumer
/// loop, so implementations get `&mut self` and never race with themselves.
#[async_trait]
pub trait PostTarget: Send {
    /// Target-specific post identifier kept for threading.
    type Handle: Clone + Send + Sync + 'static;

    /// Whether this advisory should be posted at all. Suppressed advisories
    /// are still tracked for deduplication.
    fn should_post(&self, advisory: &Advisory) -> bool {
        let _ = advisory;
        true
    }

    /// Post the rendered message. `thread` is `None` for the first bulletin
    /// of an event.
    async fn post(
        &mut self,
        advisory: &Advisory,
        message: &str,
        thread: Option<&ThreadRef<Self::Handle>>,
    ) -> Result<Self::Handle, TargetError>;

    /// Interval for [`maintain`](Self::maintain) calls, if the target needs
    /// periodic upkeep such as a session refresh.
    fn maintenance_interval(&self) -> Option<Duration> {
        None
    }

    /// Periodic upkeep hook. An error is fatal for the dispatcher.
    async fn maintain(&mut self) -> Result<(), TargetError> {
        Ok(())
    }
}
