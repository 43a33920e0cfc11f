//! Per-relay publish workers.
//!
//! Each relay gets one worker owning a bounded queue. The broadcast path
//! only ever does a non-blocking send, so a relay that stopped draining its
//! queue loses events instead of stalling the dispatcher.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use nostr_sdk::prelude::*;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Events queued per relay before sends start getting dropped.
const QUEUE_CAPACITY: usize = 10;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(64);

/// Handle for enqueueing events towards one relay.
pub struct RelayHandle {
    url: String,
    sender: mpsc::Sender<Event>,
    dropped: Arc<AtomicU64>,
}

impl RelayHandle {
    /// The relay URL this handle feeds.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// How many events have been dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Enqueue without blocking. Returns false when the event was dropped.
    pub fn try_publish(&self, event: &Event) -> bool {
        match self.sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(relay = %self.url, dropped, "Relay queue full, dropping event");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(relay = %self.url, "Relay worker is gone, dropping event");
                false
            }
        }
    }
}

/// Offer the event to every relay; returns how many queues accepted it.
pub fn broadcast(relays: &[RelayHandle], event: &Event) -> usize {
    relays
        .iter()
        .filter(|handle| handle.try_publish(event))
        .count()
}

/// Spawn the worker task for one relay.
pub fn spawn_worker(url: String, cancel: CancellationToken) -> RelayHandle {
    let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
    tokio::spawn(worker_loop(url.clone(), receiver, cancel));
    RelayHandle {
        url,
        sender,
        dropped: Arc::new(AtomicU64::new(0)),
    }
}

async fn worker_loop(url: String, mut receiver: mpsc::Receiver<Event>, cancel: CancellationToken) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        if cancel.is_cancelled() {
            return;
        }
        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                info!(relay = %url, "Connected to relay");
                backoff = INITIAL_BACKOFF;
                match pump(&url, ws, &mut receiver, &cancel).await {
                    PumpEnd::Closed => return,
                    PumpEnd::Reconnect => {}
                }
            }
            Err(err) => {
                warn!(relay = %url, error = %err, delay = ?backoff, "Failed to connect, backing off");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

enum PumpEnd {
    /// Queue or process is shutting down.
    Closed,
    /// Socket trouble; connect again.
    Reconnect,
}

async fn pump(
    url: &str,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    receiver: &mut mpsc::Receiver<Event>,
    cancel: &CancellationToken,
) -> PumpEnd {
    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.close().await;
                return PumpEnd::Closed;
            }
            event = receiver.recv() => match event {
                None => {
                    let _ = write.close().await;
                    return PumpEnd::Closed;
                }
                Some(event) => {
                    let frame = json!(["EVENT", event]).to_string();
                    if let Err(err) = write.send(Message::Text(frame)).await {
                        error!(relay = %url, error = %err, "Failed to publish event, reconnecting");
                        return PumpEnd::Reconnect;
                    }
                    debug!(relay = %url, event_id = %event.id, "Event sent");
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => log_relay_reply(url, &text),
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    error!(relay = %url, error = %err, "Relay connection error, reconnecting");
                    return PumpEnd::Reconnect;
                }
                None => {
                    warn!(relay = %url, "Relay closed the connection, reconnecting");
                    return PumpEnd::Reconnect;
                }
            },
        }
    }
}

/// Surface the relay's verdict on published events.
fn log_relay_reply(url: &str, text: &str) {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        debug!(relay = %url, reply = %text, "Unparseable relay reply");
        return;
    };
    match value.get(0).and_then(Value::as_str) {
        Some("OK") => {
            let event_id = value.get(1).and_then(Value::as_str).unwrap_or_default();
            let accepted = value.get(2).and_then(Value::as_bool).unwrap_or_default();
            let message = value.get(3).and_then(Value::as_str).unwrap_or_default();
            if accepted {
                info!(relay = %url, %event_id, "Event accepted by relay");
            } else {
                warn!(relay = %url, %event_id, %message, "Event rejected by relay");
            }
        }
        Some("NOTICE") => {
            let message = value.get(1).and_then(Value::as_str).unwrap_or_default();
            warn!(relay = %url, %message, "Relay notice");
        }
        _ => debug!(relay = %url, reply = %text, "Relay reply"),
    }
}

#[cfg(test)]
mod tests {
    use nostr_sdk::prelude::*;

    use super::*;

    fn signed_event(content: &str) -> Event {
        let keys = Keys::generate();
        EventBuilder::new(Kind::TextNote, content)
            .sign_with_keys(&keys)
            .unwrap()
    }

    fn handle(url: &str) -> (RelayHandle, mpsc::Receiver<Event>) {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        (
            RelayHandle {
                url: url.to_string(),
                sender,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            receiver,
        )
    }

    #[tokio::test]
    async fn stalled_relay_drops_instead_of_blocking() {
        let (stalled, _stalled_rx) = handle("wss://stalled.example");
        let (healthy, mut healthy_rx) = handle("wss://healthy.example");

        // Drain the healthy queue as it fills.
        let drained = tokio::spawn(async move {
            let mut events = Vec::new();
            while let Some(event) = healthy_rx.recv().await {
                events.push(event);
            }
            events
        });

        let relays = [stalled, healthy];
        let event = signed_event("test");
        for _ in 0..(QUEUE_CAPACITY + 1) {
            broadcast(&relays, &event);
            // Give the drain task a chance to keep the healthy queue empty.
            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // The stalled relay accepted a full queue and dropped the overflow.
        assert_eq!(relays[0].dropped(), 1);

        drop(relays);
        let events = drained.await.unwrap();
        assert_eq!(events.len(), QUEUE_CAPACITY + 1);
    }

    #[tokio::test]
    async fn closed_worker_counts_as_drop_free_failure() {
        let (handle, receiver) = handle("wss://gone.example");
        drop(receiver);
        let event = signed_event("test");
        assert!(!handle.try_publish(&event));
        assert_eq!(handle.dropped(), 0);
    }
}
