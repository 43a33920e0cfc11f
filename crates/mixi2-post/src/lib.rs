//! mixi2 dispatcher.
//!
//! mixi2 resurfaces a post on every reply, so a reply chain of revisions
//! would keep bumping the same quake to the top of timelines. This target
//! therefore posts only the final report of each event and never threads.

mod client;
mod target;

pub use client::{Mixi2Client, Mixi2Error};
pub use target::Mixi2Target;
