//! The consumer loop shared by every dispatcher binary.

use std::time::Duration;

use chrono::Utc;
use eew_bus::Subscriber;
use eew_core::{Advisory, EEW_TOPIC};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::DispatchError;
use crate::target::PostTarget;
use crate::tracker::{Disposition, EventTracker};

/// How long an event stays tracked after its last bulletin.
const TRACK_TTL: Duration = Duration::from_secs(60 * 60);

/// How often expired entries are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Drives one [`PostTarget`] from the bus.
pub struct Dispatcher<T: PostTarget> {
    target: T,
    tracker: EventTracker<T::Handle>,
}

impl<T: PostTarget> Dispatcher<T> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            tracker: EventTracker::new(TRACK_TTL),
        }
    }

    /// The tracking map, mainly for tests and diagnostics.
    pub fn tracker(&self) -> &EventTracker<T::Handle> {
        &self.tracker
    }

    /// The wrapped target.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Consume bus messages until cancellation or a fatal target error.
    pub async fn run(
        &mut self,
        mut subscriber: Subscriber,
        cancel: CancellationToken,
    ) -> Result<(), DispatchError> {
        let sweeper = tokio::spawn(sweep_loop(self.tracker.clone(), cancel.clone()));

        let mut maintenance = self.target.maintenance_interval().map(|period| {
            let mut timer = interval(period);
            // The first tick of a tokio interval fires immediately; upkeep
            // is only wanted after a full period.
            timer.reset();
            timer
        });

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Dispatcher cancelled");
                    break Ok(());
                }
                _ = tick(&mut maintenance) => {
                    if let Err(err) = self.target.maintain().await {
                        error!(error = %err, "Maintenance failed");
                        break Err(err.into());
                    }
                }
                msg = subscriber.recv() => match msg {
                    Some(msg) => {
                        if msg.topic != EEW_TOPIC {
                            continue;
                        }
                        if let Err(err) = self.process(&msg.payload).await {
                            break Err(err);
                        }
                    }
                    None => break Err(DispatchError::BusClosed),
                },
            }
        };

        cancel.cancel();
        let _ = sweeper.await;
        result
    }

    /// Handle one telegram payload.
    ///
    /// Parse failures are logged and swallowed; a failed post is returned
    /// and terminates the dispatcher.
    pub async fn process(&mut self, payload: &[u8]) -> Result<(), DispatchError> {
        let advisory = match Advisory::from_xml(payload) {
            Ok(advisory) => advisory,
            Err(err) => {
                warn!(error = %err, "Failed to parse telegram, skipping");
                return Ok(());
            }
        };
        let message = advisory.to_string();

        let thread = match self.tracker.check(&advisory.event_id, advisory.serial) {
            Disposition::Skip { previous } => {
                info!(
                    event_id = %advisory.event_id,
                    serial = advisory.serial,
                    previous,
                    "Skip old serial"
                );
                return Ok(());
            }
            Disposition::Post { thread } => thread,
        };

        if !self.target.should_post(&advisory) {
            self.tracker
                .record_suppressed(&advisory.event_id, advisory.serial, &message);
            return Ok(());
        }

        let handle = self
            .target
            .post(&advisory, &message, thread.as_ref())
            .await?;
        info!(
            event_id = %advisory.event_id,
            serial = advisory.serial,
            "Posted advisory"
        );
        self.tracker
            .record_post(&advisory.event_id, advisory.serial, &message, handle);
        Ok(())
    }
}

async fn tick(maintenance: &mut Option<tokio::time::Interval>) {
    match maintenance {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn sweep_loop<H: Clone + Send + Sync + 'static>(
    tracker: EventTracker<H>,
    cancel: CancellationToken,
) {
    let mut timer = interval(SWEEP_INTERVAL);
    timer.tick().await;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = timer.tick() => {
                tracker.sweep(Utc::now());
            }
        }
    }
}
