//! Bluesky dispatcher: posts advisories as `app.bsky.feed.post` records on
//! an AT Protocol PDS, threading follow-ups under the first bulletin.

mod auth;
mod record;
mod target;
mod xrpc;

pub use auth::AuthInfo;
pub use record::{extract_link_entities, Entity, FeedPost, ReplyRef, StrongRef, TextSlice};
pub use target::BlueskyTarget;
pub use xrpc::{XrpcClient, XrpcError};
