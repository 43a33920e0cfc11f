//! Nostr dispatcher: signs advisories as kind-1 notes and fans them out to
//! a set of relays, each served by its own worker with a bounded queue so
//! one stalled relay never delays the others.

mod keys;
mod relays;
mod target;
mod worker;

pub use keys::load_keys;
pub use relays::{discover_relays, writable_relays, DEFAULT_RELAYS};
pub use target::{thread_tags, NostrTarget};
pub use worker::{broadcast, spawn_worker, RelayHandle};
