use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use {
    grabbot_cache::{ArtifactRef, CacheKey, DedupCache},
    grabbot_classify::{MatcherRegistry, first_url},
    grabbot_common::{MediaKind, Trigger},
    grabbot_fetch::{FetchCounter, MediaFetcher},
};

use crate::{
    request::{Command, DownloadRequest, InboundMessage},
    sink::MediaSink,
};

/// Why a message was silently dropped. Never surfaced to the requester;
/// indistinguishable, from their side, from "no link present".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NoUrl,
    NotFetchable,
    NotEligible,
}

/// Terminal state of one request, for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rejected(RejectReason),
    /// Cache hit: stored artifact re-delivered, no fetch invoked.
    Redelivered,
    Delivered,
    Failed,
}

/// The coordinator. Owns the only shared mutable state in the system: the
/// dedup cache and the fetch counter. Neither is exposed for direct
/// external mutation.
pub struct Pipeline {
    registry: MatcherRegistry,
    cache: RwLock<DedupCache>,
    /// Guard is held for the whole fetch, so fetches are serialized and the
    /// counter-derived filename can never collide with an in-flight one.
    counter: tokio::sync::Mutex<FetchCounter>,
    fetcher: Arc<dyn MediaFetcher>,
}

impl Pipeline {
    #[must_use]
    pub fn new(registry: MatcherRegistry, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self {
            registry,
            cache: RwLock::new(DedupCache::new()),
            counter: tokio::sync::Mutex::new(FetchCounter::new()),
            fetcher,
        }
    }

    /// Drive one inbound message through the full state machine.
    pub async fn handle(&self, sink: &dyn MediaSink, msg: InboundMessage) -> Outcome {
        let Some(request) = self.admit(&msg) else {
            return Outcome::Rejected(self.reject_reason(&msg));
        };

        let key = CacheKey::new(request.url(), request.kind());

        // Cache hit: skip the orchestrator entirely and reuse the artifact.
        let hit = {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            cache.lookup(&key).map(|entry| entry.artifact.clone())
        };
        if let Some(artifact) = hit {
            info!(url = request.url(), kind = %request.kind(), "dedup cache hit");
            if let Err(e) = sink.redeliver(&artifact, request.origin()).await {
                warn!(url = request.url(), error = %e, "re-delivery failed");
            }
            return Outcome::Redelivered;
        }

        sink.notify_fetching(request.origin(), request.kind()).await;

        let fetched = {
            let mut counter = self.counter.lock().await;
            self.fetcher
                .fetch(request.url(), request.kind(), &mut counter)
                .await
        };

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                // Uniform failure path: no cache mutation, counter untouched.
                warn!(url = request.url(), kind = %request.kind(), error = %e, "fetch failed");
                sink.report_failure(request.origin()).await;
                return Outcome::Failed;
            },
        };

        let artifact = match sink
            .deliver(request.origin(), &fetched.path, request.kind())
            .await
        {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(url = request.url(), error = %e, "delivery failed");
                sink.report_failure(request.origin()).await;
                return Outcome::Failed;
            },
        };

        // Insert before acknowledging the delivery as done.
        self.record(key, artifact);
        info!(url = request.url(), kind = %request.kind(), "delivered");
        Outcome::Delivered
    }

    /// Current dedup cache population, for diagnostics.
    #[must_use]
    pub fn cache_size(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Current fetch counter value, for diagnostics and tests.
    pub async fn counter_value(&self) -> u64 {
        self.counter.lock().await.peek()
    }

    /// Classification + eligibility gate. `None` means silent rejection.
    fn admit(&self, msg: &InboundMessage) -> Option<DownloadRequest> {
        let url = self.effective_url(msg)?;
        let classification = self.registry.classify(&url);
        debug!(url, ?classification, "classified");
        if !classification.fetchable {
            return None;
        }

        let explicit = msg.command.is_some();
        if !explicit && !classification.auto_eligible && !msg.origin.direct {
            return None;
        }

        // Audio wins when either the caller asked for it or the URL
        // guarantees audio content.
        let kind = if msg.command == Some(Command::Audio) || classification.audio_only {
            MediaKind::Audio
        } else {
            MediaKind::Video
        };
        let trigger = if explicit {
            Trigger::ExplicitCommand
        } else {
            Trigger::AutoMessage
        };

        Some(DownloadRequest::new(
            url,
            kind,
            trigger,
            msg.origin.clone(),
        ))
    }

    /// First URL in the message, falling back to the replied-to message for
    /// explicit commands.
    fn effective_url(&self, msg: &InboundMessage) -> Option<String> {
        match first_url(&msg.text) {
            Some(url) => Some(url),
            None if msg.command.is_some() => msg.reply_text.as_deref().and_then(first_url),
            None => None,
        }
    }

    /// Recompute why `admit` declined, for the outcome report.
    fn reject_reason(&self, msg: &InboundMessage) -> RejectReason {
        match self.effective_url(msg) {
            None => RejectReason::NoUrl,
            Some(url) if !self.registry.classify(&url).fetchable => RejectReason::NotFetchable,
            Some(_) => RejectReason::NotEligible,
        }
    }

    fn record(&self, key: CacheKey, artifact: ArtifactRef) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(key, artifact);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::{Path, PathBuf},
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use async_trait::async_trait;

    use grabbot_fetch::{FetchError, Fetched};

    use {super::*, crate::request::Origin};

    /// In-memory fetcher honoring the counter contract: advance on success
    /// only, output named from the pre-advance value.
    struct MockFetcher {
        calls: AtomicUsize,
        fail: bool,
        title: Option<&'static str>,
    }

    impl MockFetcher {
        fn succeeding() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                title: Some("A Title"),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
                title: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MediaFetcher for MockFetcher {
        async fn fetch(
            &self,
            _url: &str,
            kind: MediaKind,
            counter: &mut FetchCounter,
        ) -> grabbot_fetch::Result<Fetched> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::extraction("mock failure"));
            }
            let path = PathBuf::from(format!("{}.{}", counter.peek(), kind.extension()));
            counter.advance();
            Ok(Fetched {
                path,
                title: self.title.map(String::from),
            })
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    enum SinkEvent {
        Fetching(MediaKind),
        Delivered { path: PathBuf, kind: MediaKind },
        Redelivered { artifact_chat: String, to_chat: String },
        Failure { chat: String },
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<SinkEvent>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<SinkEvent> {
            self.events.lock().unwrap_or_else(|e| e.into_inner()).drain(..).collect()
        }

        fn push(&self, event: SinkEvent) {
            self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
        }
    }

    #[async_trait]
    impl MediaSink for RecordingSink {
        async fn notify_fetching(&self, _origin: &Origin, kind: MediaKind) {
            self.push(SinkEvent::Fetching(kind));
        }

        async fn deliver(
            &self,
            origin: &Origin,
            file: &Path,
            kind: MediaKind,
        ) -> anyhow::Result<ArtifactRef> {
            self.push(SinkEvent::Delivered {
                path: file.to_path_buf(),
                kind,
            });
            Ok(ArtifactRef {
                chat_id: origin.chat_id.clone(),
                message_id: "m1".into(),
            })
        }

        async fn redeliver(&self, artifact: &ArtifactRef, origin: &Origin) -> anyhow::Result<()> {
            self.push(SinkEvent::Redelivered {
                artifact_chat: artifact.chat_id.clone(),
                to_chat: origin.chat_id.clone(),
            });
            Ok(())
        }

        async fn report_failure(&self, origin: &Origin) {
            self.push(SinkEvent::Failure {
                chat: origin.chat_id.clone(),
            });
        }
    }

    fn group_origin(chat: &str) -> Origin {
        Origin {
            chat_id: chat.into(),
            message_id: "1".into(),
            requester: Some("alice".into()),
            direct: false,
        }
    }

    fn dm_origin(chat: &str) -> Origin {
        Origin {
            direct: true,
            ..group_origin(chat)
        }
    }

    fn plain(text: &str, origin: Origin) -> InboundMessage {
        InboundMessage {
            text: text.into(),
            reply_text: None,
            origin,
            command: None,
        }
    }

    fn command(cmd: Command, text: &str, origin: Origin) -> InboundMessage {
        InboundMessage {
            text: text.into(),
            reply_text: None,
            origin,
            command: Some(cmd),
        }
    }

    fn pipeline(fetcher: MockFetcher) -> (Pipeline, Arc<MockFetcher>) {
        let fetcher = Arc::new(fetcher);
        (
            Pipeline::new(MatcherRegistry::builtin(), Arc::clone(&fetcher) as Arc<dyn MediaFetcher>),
            fetcher,
        )
    }

    #[tokio::test]
    async fn auto_eligible_link_downloads_as_video() {
        let (pipeline, fetcher) = pipeline(MockFetcher::succeeding());
        let sink = RecordingSink::default();

        let outcome = pipeline
            .handle(
                &sink,
                plain("https://vm.tiktok.com/ZMabc/", group_origin("42")),
            )
            .await;

        assert_eq!(outcome, Outcome::Delivered);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(pipeline.counter_value().await, 1);
        assert_eq!(pipeline.cache_size(), 1);
        assert_eq!(sink.events(), vec![
            SinkEvent::Fetching(MediaKind::Video),
            SinkEvent::Delivered {
                path: PathBuf::from("0.mp4"),
                kind: MediaKind::Video,
            },
        ]);
    }

    #[tokio::test]
    async fn repeat_from_another_chat_reuses_cached_artifact() {
        let (pipeline, fetcher) = pipeline(MockFetcher::succeeding());
        let sink = RecordingSink::default();
        let url = "https://vm.tiktok.com/ZMabc/";

        pipeline.handle(&sink, plain(url, group_origin("42"))).await;
        sink.events();

        let outcome = pipeline.handle(&sink, plain(url, group_origin("43"))).await;

        assert_eq!(outcome, Outcome::Redelivered);
        assert_eq!(fetcher.calls(), 1, "no second fetch");
        assert_eq!(sink.events(), vec![SinkEvent::Redelivered {
            artifact_chat: "42".into(),
            to_chat: "43".into(),
        }]);
    }

    #[tokio::test]
    async fn audio_guaranteed_url_forces_audio_mode() {
        let (pipeline, _) = pipeline(MockFetcher::succeeding());
        let sink = RecordingSink::default();

        let outcome = pipeline
            .handle(
                &sink,
                plain("https://music.youtube.com/watch?v=XYZ", dm_origin("42")),
            )
            .await;

        assert_eq!(outcome, Outcome::Delivered);
        assert_eq!(sink.events(), vec![
            SinkEvent::Fetching(MediaKind::Audio),
            SinkEvent::Delivered {
                path: PathBuf::from("0.mp3"),
                kind: MediaKind::Audio,
            },
        ]);
    }

    #[tokio::test]
    async fn audio_command_overrides_video_default() {
        let (pipeline, _) = pipeline(MockFetcher::succeeding());
        let sink = RecordingSink::default();

        pipeline
            .handle(
                &sink,
                command(Command::Audio, "https://youtu.be/abc", group_origin("42")),
            )
            .await;

        assert_eq!(sink.events().first(), Some(&SinkEvent::Fetching(MediaKind::Audio)));
    }

    #[tokio::test]
    async fn generic_page_is_silently_dropped() {
        let (pipeline, fetcher) = pipeline(MockFetcher::succeeding());
        let sink = RecordingSink::default();

        let outcome = pipeline
            .handle(
                &sink,
                plain("https://example.com/some-page", group_origin("42")),
            )
            .await;

        assert_eq!(outcome, Outcome::Rejected(RejectReason::NotFetchable));
        assert_eq!(fetcher.calls(), 0);
        assert!(sink.events().is_empty(), "no user-visible reaction");
    }

    #[tokio::test]
    async fn message_without_url_is_ignored() {
        let (pipeline, _) = pipeline(MockFetcher::succeeding());
        let sink = RecordingSink::default();

        let outcome = pipeline
            .handle(&sink, plain("hello there", group_origin("42")))
            .await;

        assert_eq!(outcome, Outcome::Rejected(RejectReason::NoUrl));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn non_auto_site_needs_command_in_groups() {
        let (pipeline, fetcher) = pipeline(MockFetcher::succeeding());
        let sink = RecordingSink::default();
        let url = "https://soundcloud.com/artist/track";

        let outcome = pipeline.handle(&sink, plain(url, group_origin("42"))).await;
        assert_eq!(outcome, Outcome::Rejected(RejectReason::NotEligible));
        assert_eq!(fetcher.calls(), 0);

        let outcome = pipeline
            .handle(&sink, command(Command::Download, url, group_origin("42")))
            .await;
        assert_eq!(outcome, Outcome::Delivered);
    }

    #[tokio::test]
    async fn direct_chats_are_privileged() {
        let (pipeline, _) = pipeline(MockFetcher::succeeding());
        let sink = RecordingSink::default();

        let outcome = pipeline
            .handle(
                &sink,
                plain("https://soundcloud.com/artist/track", dm_origin("42")),
            )
            .await;

        assert_eq!(outcome, Outcome::Delivered);
    }

    #[tokio::test]
    async fn command_falls_back_to_replied_message() {
        let (pipeline, _) = pipeline(MockFetcher::succeeding());
        let sink = RecordingSink::default();

        let msg = InboundMessage {
            text: "/download".into(),
            reply_text: Some("check https://youtu.be/abc out".into()),
            origin: group_origin("42"),
            command: Some(Command::Download),
        };

        assert_eq!(pipeline.handle(&sink, msg).await, Outcome::Delivered);
    }

    #[tokio::test]
    async fn fetch_failure_reports_once_and_mutates_nothing() {
        let (pipeline, fetcher) = pipeline(MockFetcher::failing());
        let sink = RecordingSink::default();
        let url = "https://vm.tiktok.com/ZMabc/";

        let outcome = pipeline.handle(&sink, plain(url, group_origin("42"))).await;

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(pipeline.counter_value().await, 0);
        assert_eq!(pipeline.cache_size(), 0);
        assert_eq!(sink.events(), vec![
            SinkEvent::Fetching(MediaKind::Video),
            SinkEvent::Failure { chat: "42".into() },
        ]);

        // A failed URL is not cached: the next attempt fetches again.
        pipeline.handle(&sink, plain(url, group_origin("42"))).await;
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn counter_equals_number_of_successes() {
        let (pipeline, _) = pipeline(MockFetcher::succeeding());
        let sink = RecordingSink::default();

        for i in 0..3 {
            pipeline
                .handle(
                    &sink,
                    plain(&format!("https://youtu.be/clip{i}"), group_origin("42")),
                )
                .await;
        }

        assert_eq!(pipeline.counter_value().await, 3);
        assert_eq!(pipeline.cache_size(), 3);
    }

    #[tokio::test]
    async fn same_url_different_kinds_are_cached_separately() {
        let (pipeline, fetcher) = pipeline(MockFetcher::succeeding());
        let sink = RecordingSink::default();
        let url = "https://youtu.be/abc";

        pipeline
            .handle(&sink, command(Command::Download, url, group_origin("42")))
            .await;
        pipeline
            .handle(&sink, command(Command::Audio, url, group_origin("42")))
            .await;

        assert_eq!(fetcher.calls(), 2, "audio and video are distinct keys");
        assert_eq!(pipeline.cache_size(), 2);
    }
}
