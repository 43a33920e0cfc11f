//! PostTarget implementation for Mastodon.

use async_trait::async_trait;
use dispatch_core::{PostTarget, TargetError, ThreadRef};
use eew_core::Advisory;

use crate::client::{MastodonClient, NewStatus, Visibility};

pub struct MastodonTarget {
    client: MastodonClient,
}

impl MastodonTarget {
    pub fn new(client: MastodonClient) -> Self {
        Self { client }
    }

    /// First report of an event goes to public timelines; follow-ups stay
    /// unlisted but remain readable through the thread.
    fn visibility(thread: Option<&ThreadRef<String>>) -> Visibility {
        if thread.is_none() {
            Visibility::Public
        } else {
            Visibility::Unlisted
        }
    }
}

#[async_trait]
impl PostTarget for MastodonTarget {
    type Handle = String;

    async fn post(
        &mut self,
        _advisory: &Advisory,
        message: &str,
        thread: Option<&ThreadRef<String>>,
    ) -> Result<String, TargetError> {
        let status = NewStatus {
            status: message.to_string(),
            language: "ja",
            visibility: Self::visibility(thread),
            in_reply_to_id: thread.map(|t| t.parent.clone()),
        };
        let posted = self
            .client
            .post_status(status)
            .await
            .map_err(TargetError::post)?;
        Ok(posted.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_report_is_public_and_replies_are_unlisted() {
        assert_eq!(MastodonTarget::visibility(None), Visibility::Public);
        let thread = ThreadRef {
            root: "1".to_string(),
            parent: "2".to_string(),
        };
        assert_eq!(
            MastodonTarget::visibility(Some(&thread)),
            Visibility::Unlisted
        );
    }
}
