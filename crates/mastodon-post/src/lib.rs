//! Mastodon dispatcher: posts advisories as statuses, threading follow-ups
//! as replies. The first report of an event is public, later reports are
//! unlisted so timelines are not flooded.

mod client;
mod target;

pub use client::{MastodonClient, MastodonError, NewStatus, Visibility};
pub use target::MastodonTarget;
