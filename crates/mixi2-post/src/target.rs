//! PostTarget implementation for mixi2.

use async_trait::async_trait;
use dispatch_core::{PostTarget, TargetError, ThreadRef};
use eew_core::Advisory;

use crate::client::Mixi2Client;

pub struct Mixi2Target {
    client: Mixi2Client,
}

impl Mixi2Target {
    pub fn new(client: Mixi2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PostTarget for Mixi2Target {
    type Handle = String;

    /// Only the final report goes out; earlier bulletins are tracked for
    /// deduplication but never posted.
    fn should_post(&self, advisory: &Advisory) -> bool {
        advisory.is_last
    }

    async fn post(
        &mut self,
        _advisory: &Advisory,
        message: &str,
        _thread: Option<&ThreadRef<String>>,
    ) -> Result<String, TargetError> {
        self.client
            .create_post(message)
            .await
            .map_err(TargetError::post)
    }
}
