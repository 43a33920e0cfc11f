//! Relay discovery via the account's NIP-65 relay list.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use nostr_sdk::prelude::*;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Relays used when the account has not published a relay list.
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.nostr.wirednet.jp",
    "wss://relay-jp.nostr.wirednet.jp",
    "wss://nostr.h3z.jp",
    "wss://nostr-relay.nokotaro.com",
    "wss://nostr.holybea.com",
    "wss://relay.nostr.or.jp",
    "wss://relay.snort.social",
    "wss://eden.nostr.land",
    "wss://atlas.nostr.land",
    "wss://relay.damus.io",
];

/// Overall time limit for the discovery query.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Only relay lists published in the last 30 days are considered.
const DISCOVERY_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Error)]
enum DiscoveryError {
    #[error("no default relay reachable")]
    NoRelay,

    #[error("no relay list event found")]
    NoAdvert,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// A relay list event, reduced to the parts discovery needs.
#[derive(Debug, Clone, Deserialize)]
struct AdvertEvent {
    id: String,
    tags: Vec<Vec<String>>,
}

/// Find the relays the account writes to, falling back to the default list
/// when discovery fails or yields nothing.
pub async fn discover_relays(public_key: &PublicKey) -> Vec<String> {
    let found = tokio::time::timeout(DISCOVERY_TIMEOUT, fetch_relay_list(public_key)).await;
    match found {
        Ok(Ok(relays)) if !relays.is_empty() => relays,
        Ok(Ok(_)) => {
            warn!("Relay list is empty, using defaults");
            default_relays()
        }
        Ok(Err(err)) => {
            warn!(error = %err, "Relay discovery failed, using defaults");
            default_relays()
        }
        Err(_) => {
            warn!("Relay discovery timed out, using defaults");
            default_relays()
        }
    }
}

fn default_relays() -> Vec<String> {
    DEFAULT_RELAYS.iter().map(|url| url.to_string()).collect()
}

async fn fetch_relay_list(public_key: &PublicKey) -> Result<Vec<String>, DiscoveryError> {
    let mut socket = None;
    for url in DEFAULT_RELAYS {
        match connect_async(*url).await {
            Ok((ws, _)) => {
                debug!(relay = %url, "Connected for discovery");
                socket = Some(ws);
                break;
            }
            Err(err) => {
                warn!(relay = %url, error = %err, "Failed to connect, trying next");
            }
        }
    }
    let Some(ws) = socket else {
        return Err(DiscoveryError::NoRelay);
    };
    let (mut write, mut read) = ws.split();

    // NIP-65 relay lists, plus the older kind-2 recommendations.
    let since = Timestamp::now().as_u64().saturating_sub(DISCOVERY_WINDOW_SECS);
    let filter = json!({
        "kinds": [2, 10002],
        "authors": [public_key.to_hex()],
        "since": since,
        "limit": 10,
    });
    let request = json!(["REQ", "relay-list", filter]).to_string();
    write.send(Message::Text(request)).await?;

    // Stored events arrive oldest first; keep the last one before EOSE.
    let mut latest: Option<AdvertEvent> = None;
    while let Some(frame) = read.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            _ => continue,
        };
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        match value.get(0).and_then(Value::as_str) {
            Some("EVENT") => {
                if let Some(event) = value
                    .get(2)
                    .and_then(|v| serde_json::from_value::<AdvertEvent>(v.clone()).ok())
                {
                    debug!(event_id = %event.id, "Got relay list candidate");
                    latest = Some(event);
                }
            }
            Some("EOSE") => break,
            _ => {}
        }
    }
    let _ = write.close().await;

    let event = latest.ok_or(DiscoveryError::NoAdvert)?;
    Ok(writable_relays(&event.tags))
}

/// Collect `r` tags, excluding relays the account only reads from.
pub fn writable_relays(tags: &[Vec<String>]) -> Vec<String> {
    tags.iter()
        .filter(|tag| tag.first().map(String::as_str) == Some("r"))
        .filter(|tag| {
            if tag.len() > 2 && tag[2] == "read" {
                debug!(relay = %tag[1], "Skipping read-only relay");
                return false;
            }
            true
        })
        .filter_map(|tag| tag.get(1).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn keeps_write_and_unmarked_relays() {
        let tags = vec![
            tag(&["r", "wss://write.example", "write"]),
            tag(&["r", "wss://both.example"]),
            tag(&["r", "wss://read.example", "read"]),
            tag(&["p", "not-a-relay"]),
        ];
        assert_eq!(
            writable_relays(&tags),
            vec![
                "wss://write.example".to_string(),
                "wss://both.example".to_string()
            ]
        );
    }

    #[test]
    fn empty_tag_list_yields_no_relays() {
        assert!(writable_relays(&[]).is_empty());
    }
}
