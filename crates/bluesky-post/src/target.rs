//! PostTarget implementation for the PDS.

use std::time::Duration;

use async_trait::async_trait;
use dispatch_core::{PostTarget, TargetError, ThreadRef};
use eew_core::Advisory;

use crate::record::{FeedPost, ReplyRef, StrongRef};
use crate::xrpc::XrpcClient;

/// Access tokens expire after 120 minutes upstream; refreshing every 60
/// keeps a comfortable margin.
const SESSION_REFRESH_PERIOD: Duration = Duration::from_secs(60 * 60);

pub struct BlueskyTarget {
    client: XrpcClient,
}

impl BlueskyTarget {
    pub fn new(client: XrpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PostTarget for BlueskyTarget {
    type Handle = StrongRef;

    async fn post(
        &mut self,
        _advisory: &Advisory,
        message: &str,
        thread: Option<&ThreadRef<StrongRef>>,
    ) -> Result<StrongRef, TargetError> {
        let reply = thread.map(|t| ReplyRef {
            root: t.root.clone(),
            parent: t.parent.clone(),
        });
        let record = FeedPost::new(message, reply);
        self.client
            .create_record(record)
            .await
            .map_err(TargetError::post)
    }

    fn maintenance_interval(&self) -> Option<Duration> {
        Some(SESSION_REFRESH_PERIOD)
    }

    async fn maintain(&mut self) -> Result<(), TargetError> {
        self.client
            .refresh_session()
            .await
            .map_err(TargetError::session)?;
        self.client
            .get_session()
            .await
            .map_err(TargetError::session)
    }
}
