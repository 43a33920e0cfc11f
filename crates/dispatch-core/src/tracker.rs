//! Bounded-memory tracking of posted events.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::warn;

use crate::target::ThreadRef;

/// Tracking record for one seismic event.
#[derive(Debug, Clone)]
pub struct TrackedEvent<H> {
    /// Highest serial observed for this event.
    pub serial: i32,
    /// Rendered message of the latest bulletin.
    pub message: String,
    /// Handle of the most recent post, when one was made.
    pub last: Option<H>,
    /// Handle of the first post; replies anchor to it.
    pub root: Option<H>,
    /// When this record may be evicted.
    pub expires_at: DateTime<Utc>,
}

/// What to do with an incoming advisory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition<H> {
    /// The serial is not newer than what was already observed.
    Skip { previous: i32 },
    /// Post, threading under `thread` when present.
    Post { thread: Option<ThreadRef<H>> },
}

/// Concurrent map of tracked events, shared between the consumer loop and
/// the expiry sweeper.
#[derive(Clone)]
pub struct EventTracker<H> {
    events: Arc<DashMap<String, TrackedEvent<H>>>,
    ttl: Duration,
}

impl<H: Clone + Send + Sync + 'static> EventTracker<H> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            events: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Decide whether an advisory should be posted and how it threads.
    pub fn check(&self, event_id: &str, serial: i32) -> Disposition<H> {
        let Some(prev) = self.events.get(event_id) else {
            return Disposition::Post { thread: None };
        };
        if serial <= prev.serial {
            return Disposition::Skip {
                previous: prev.serial,
            };
        }
        let thread = match (prev.root.clone(), prev.last.clone()) {
            (Some(root), Some(parent)) => Some(ThreadRef { root, parent }),
            _ => {
                // A tracked-but-never-posted event has nothing to thread to.
                warn!(%event_id, "No root handle for tracked event");
                None
            }
        };
        Disposition::Post { thread }
    }

    /// Record a successful post. The root handle is pinned to the first
    /// post of the event.
    pub fn record_post(&self, event_id: &str, serial: i32, message: &str, handle: H) {
        let root = self
            .events
            .get(event_id)
            .and_then(|prev| prev.root.clone())
            .unwrap_or_else(|| handle.clone());
        self.events.insert(
            event_id.to_string(),
            TrackedEvent {
                serial,
                message: message.to_string(),
                last: Some(handle),
                root: Some(root),
                expires_at: Utc::now() + self.ttl,
            },
        );
    }

    /// Record an advisory that was deliberately not posted, keeping the
    /// serial for deduplication and any handles from earlier posts.
    pub fn record_suppressed(&self, event_id: &str, serial: i32, message: &str) {
        let (last, root) = match self.events.get(event_id) {
            Some(prev) => (prev.last.clone(), prev.root.clone()),
            None => (None, None),
        };
        self.events.insert(
            event_id.to_string(),
            TrackedEvent {
                serial,
                message: message.to_string(),
                last,
                root,
                expires_at: Utc::now() + self.ttl,
            },
        );
    }

    /// Drop entries whose expiry is in the past.
    pub fn sweep(&self, now: DateTime<Utc>) {
        self.events.retain(|_, event| event.expires_at >= now);
    }

    pub fn get(&self, event_id: &str) -> Option<TrackedEvent<H>> {
        self.events.get(event_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
