//! PostTarget implementation for Nostr.

use async_trait::async_trait;
use dispatch_core::{PostTarget, TargetError, ThreadRef};
use eew_core::Advisory;
use nostr_sdk::prelude::*;
use tracing::info;

use crate::worker::{broadcast, RelayHandle};

/// NIP-10 marker tags for a follow-up note.
///
/// The root marker always points at the first note of the event; a reply
/// marker is added when the previous note is not the root itself. The `p`
/// tag references our own key since the whole thread is self-authored.
pub fn thread_tags(
    public_key: &PublicKey,
    thread: Option<&ThreadRef<String>>,
) -> Result<Vec<Tag>, nostr_sdk::nostr::event::tag::Error> {
    let mut tags = Vec::new();
    if let Some(thread) = thread {
        tags.push(Tag::parse(["e", thread.root.as_str(), "", "root"])?);
        if thread.parent != thread.root {
            tags.push(Tag::parse(["e", thread.parent.as_str(), "", "reply"])?);
        }
        tags.push(Tag::parse(["p", public_key.to_hex().as_str()])?);
    }
    Ok(tags)
}

pub struct NostrTarget {
    keys: Keys,
    relays: Vec<RelayHandle>,
}

impl NostrTarget {
    pub fn new(keys: Keys, relays: Vec<RelayHandle>) -> Self {
        Self { keys, relays }
    }
}

#[async_trait]
impl PostTarget for NostrTarget {
    type Handle = String;

    async fn post(
        &mut self,
        _advisory: &Advisory,
        message: &str,
        thread: Option<&ThreadRef<String>>,
    ) -> Result<String, TargetError> {
        let tags =
            thread_tags(&self.keys.public_key(), thread).map_err(TargetError::post)?;
        let event = EventBuilder::new(Kind::TextNote, message)
            .tags(tags)
            .sign_with_keys(&self.keys)
            .map_err(TargetError::post)?;

        // Delivery is best-effort per relay; a full queue is not fatal.
        let queued = broadcast(&self.relays, &event);
        info!(
            event_id = %event.id,
            queued,
            relays = self.relays.len(),
            "Broadcast event to relay workers"
        );
        Ok(event.id.to_hex())
    }
}
