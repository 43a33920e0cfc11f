//! Dispatcher behaviour against an in-memory target.

use async_trait::async_trait;
use dispatch_core::{Dispatcher, PostTarget, TargetError, ThreadRef};
use eew_core::Advisory;

fn telegram(event_id: &str, serial: i32, last: bool) -> Vec<u8> {
    let next_advisory = if last {
        "<NextAdvisory>この情報をもって、緊急地震速報：最終報とします。</NextAdvisory>"
    } else {
        "<NextAdvisory/>"
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Report xmlns="http://xml.kishou.go.jp/jmaxml1/">
  <Head><EventID>{event_id}</EventID><Serial>{serial}</Serial></Head>
  <Body>
    <Earthquake><OriginTime>2024-01-01T09:00:00+09:00</OriginTime></Earthquake>
    {next_advisory}
  </Body>
</Report>"#
    )
    .into_bytes()
}

#[derive(Debug, Clone)]
struct RecordedPost {
    message: String,
    thread: Option<ThreadRef<String>>,
}

#[derive(Default)]
struct FakeTarget {
    posts: Vec<RecordedPost>,
    final_only: bool,
    fail: bool,
}

#[async_trait]
impl PostTarget for FakeTarget {
    type Handle = String;

    fn should_post(&self, advisory: &Advisory) -> bool {
        !self.final_only || advisory.is_last
    }

    async fn post(
        &mut self,
        _advisory: &Advisory,
        message: &str,
        thread: Option<&ThreadRef<String>>,
    ) -> Result<String, TargetError> {
        if self.fail {
            return Err(TargetError::post("post rejected"));
        }
        self.posts.push(RecordedPost {
            message: message.to_string(),
            thread: thread.cloned(),
        });
        Ok(format!("h{}", self.posts.len()))
    }
}

#[tokio::test]
async fn increasing_serials_are_posted_in_a_thread() {
    let mut dispatcher = Dispatcher::new(FakeTarget::default());
    dispatcher.process(&telegram("X", 1, false)).await.unwrap();
    dispatcher.process(&telegram("X", 2, false)).await.unwrap();
    dispatcher.process(&telegram("X", 3, false)).await.unwrap();

    let posts = &dispatcher.target().posts;
    assert_eq!(posts.len(), 3);
    assert_eq!(posts[0].thread, None);
    // Every follow-up anchors to the first post.
    assert_eq!(
        posts[1].thread,
        Some(ThreadRef { root: "h1".to_string(), parent: "h1".to_string() })
    );
    assert_eq!(
        posts[2].thread,
        Some(ThreadRef { root: "h1".to_string(), parent: "h2".to_string() })
    );

    let entry = dispatcher.tracker().get("X").unwrap();
    assert_eq!(entry.serial, 3);
    assert_eq!(entry.root.as_deref(), Some("h1"));
    assert_eq!(entry.last.as_deref(), Some("h3"));
}

#[tokio::test]
async fn stale_serials_are_skipped() {
    let mut dispatcher = Dispatcher::new(FakeTarget::default());
    dispatcher.process(&telegram("X", 2, false)).await.unwrap();
    dispatcher.process(&telegram("X", 1, false)).await.unwrap();
    dispatcher.process(&telegram("X", 2, false)).await.unwrap();

    assert_eq!(dispatcher.target().posts.len(), 1);
    assert_eq!(dispatcher.tracker().get("X").unwrap().serial, 2);
}

#[tokio::test]
async fn distinct_events_do_not_thread_together() {
    let mut dispatcher = Dispatcher::new(FakeTarget::default());
    dispatcher.process(&telegram("X", 1, false)).await.unwrap();
    dispatcher.process(&telegram("Y", 1, false)).await.unwrap();

    let posts = &dispatcher.target().posts;
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].thread, None);
}

#[tokio::test]
async fn final_only_target_posts_exactly_once() {
    let mut dispatcher = Dispatcher::new(FakeTarget {
        final_only: true,
        ..FakeTarget::default()
    });
    dispatcher.process(&telegram("X", 1, false)).await.unwrap();
    dispatcher.process(&telegram("X", 2, false)).await.unwrap();
    dispatcher.process(&telegram("X", 3, true)).await.unwrap();
    // A duplicate of the final report is deduplicated, not re-posted.
    dispatcher.process(&telegram("X", 3, true)).await.unwrap();

    let posts = &dispatcher.target().posts;
    assert_eq!(posts.len(), 1);
    assert!(posts[0].message.contains("*最終報*"));
    // Suppressed bulletins still advanced the tracked serial.
    assert_eq!(dispatcher.tracker().get("X").unwrap().serial, 3);
}

#[tokio::test]
async fn suppressed_bulletins_dedupe_before_the_final_report() {
    let mut dispatcher = Dispatcher::new(FakeTarget {
        final_only: true,
        ..FakeTarget::default()
    });
    dispatcher.process(&telegram("X", 2, false)).await.unwrap();
    // A stale duplicate of a suppressed bulletin.
    dispatcher.process(&telegram("X", 2, false)).await.unwrap();
    dispatcher.process(&telegram("X", 1, false)).await.unwrap();
    assert!(dispatcher.target().posts.is_empty());
}

#[tokio::test]
async fn unparseable_payload_is_skipped() {
    let mut dispatcher = Dispatcher::new(FakeTarget::default());
    dispatcher.process(b"not xml at all <<<").await.unwrap();
    assert!(dispatcher.target().posts.is_empty());
    assert!(dispatcher.tracker().is_empty());
}

#[tokio::test]
async fn post_failure_is_fatal() {
    let mut dispatcher = Dispatcher::new(FakeTarget {
        fail: true,
        ..FakeTarget::default()
    });
    let result = dispatcher.process(&telegram("X", 1, false)).await;
    assert!(result.is_err());
    // Nothing was recorded for the failed post.
    assert!(dispatcher.tracker().is_empty());
}
