//! Facade tying the cache, executor and follow-up scheduler together.

use std::{sync::Arc, time::Duration};

use {
    courier_common::{DeliveryRequest, Markup, RecipientId},
    courier_config::EngineConfig,
    tracing::info,
};

use crate::{
    Result,
    cache::IdentifierCache,
    deliver::{DeliveryExecutor, Outcome},
    followup::{FollowupScheduler, FollowupTask},
    retry::RetryPolicy,
    timer::{Timer, TokioTimer},
    transport::Transport,
};

pub struct Engine {
    cache: Arc<IdentifierCache>,
    executor: Arc<DeliveryExecutor>,
    followups: FollowupScheduler,
}

impl Engine {
    pub fn new(
        config: &EngineConfig,
        cache: Arc<IdentifierCache>,
        transport: Arc<dyn Transport>,
        timer: Arc<dyn Timer>,
    ) -> Self {
        let executor = Arc::new(DeliveryExecutor::new(
            transport,
            Arc::clone(&cache),
            RetryPolicy::from_config(&config.retry),
        ));
        let followups = FollowupScheduler::new(
            Arc::clone(&executor),
            timer,
            Duration::from_secs(config.followup.backup_margin_secs),
        );
        Self {
            cache,
            executor,
            followups,
        }
    }

    /// Build an engine on the tokio timer, opening the configured cache file
    /// (or an in-memory cache when none is set).
    pub async fn open(config: &EngineConfig, transport: Arc<dyn Transport>) -> Self {
        let cache = match config.cache_path {
            Some(ref path) => IdentifierCache::open(path).await,
            None => {
                info!("no cache_path configured, file ids kept in memory only");
                IdentifierCache::ephemeral()
            },
        };
        Self::new(config, Arc::new(cache), transport, Arc::new(TokioTimer))
    }

    pub fn cache(&self) -> &Arc<IdentifierCache> {
        &self.cache
    }

    pub async fn send_asset(&self, request: &DeliveryRequest) -> Outcome {
        self.executor.deliver(request).await
    }

    /// Deliver requests one after another, each awaited before the next
    /// starts. A failed step does not stop the rest.
    pub async fn send_sequence(&self, requests: &[DeliveryRequest]) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.executor.deliver(request).await);
        }
        outcomes
    }

    pub async fn send_text(
        &self,
        to: RecipientId,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<()> {
        self.executor.deliver_text(to, text, markup).await
    }

    /// Returns `false` when a follow-up is already pending for the recipient.
    pub fn schedule_followup(&self, task: FollowupTask) -> bool {
        self.followups.schedule(task)
    }

    pub fn cancel_followup(&self, recipient: RecipientId) -> bool {
        self.followups.cancel(recipient)
    }

    pub fn followup_pending(&self, recipient: RecipientId) -> bool {
        self.followups.is_pending(recipient)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            resolve::Tier,
            test_support::{CallKind, FakeTransport},
            transport::{MediaSource, TransportError},
        },
        courier_common::{Asset, AssetKind, Button, FollowupPayload},
        tempfile::TempDir,
        tokio::time::sleep,
    };

    fn engine(config: &EngineConfig, transport: &Arc<FakeTransport>) -> Engine {
        Engine::new(
            config,
            Arc::new(IdentifierCache::ephemeral()),
            Arc::clone(transport) as Arc<dyn Transport>,
            Arc::new(TokioTimer),
        )
    }

    #[tokio::test]
    async fn sequence_is_sent_in_order_and_continues_past_failures() {
        let tmp = TempDir::new().unwrap();
        let voice = tmp.path().join("voice.ogg");
        std::fs::write(&voice, b"OggS").unwrap();

        let transport = Arc::new(FakeTransport::new());
        // The image has no caption, so a permanent failure leaves it Failed.
        transport
            .push_media(Ok(Some("CQAC-voice".into())))
            .push_media(Err(TransportError::permanent("wrong file type")));
        let engine = engine(&EngineConfig::default(), &transport);

        let to = RecipientId(42);
        let requests = [
            DeliveryRequest::new(to, Asset::new("audio", AssetKind::Audio).with_local_path(&voice)),
            DeliveryRequest::new(
                to,
                Asset::new("img1", AssetKind::Image).with_override_id("AgAC-override"),
            ),
            DeliveryRequest::new(to, Asset::new("audio", AssetKind::Audio).with_local_path(&voice)),
        ];
        let outcomes = engine.send_sequence(&requests).await;

        assert_eq!(outcomes[0], Outcome::Sent { tier: Tier::LocalBytes });
        assert!(matches!(outcomes[1], Outcome::Failed { .. }));
        assert_eq!(outcomes[2], Outcome::Sent { tier: Tier::CachedId });

        let sources = transport.media_sources();
        assert!(matches!(sources[0], MediaSource::Bytes { .. }));
        assert_eq!(sources[1], MediaSource::FileId("AgAC-override".into()));
        assert_eq!(sources[2], MediaSource::FileId("CQAC-voice".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn followup_uses_configured_backup_margin() {
        let transport = Arc::new(FakeTransport::new());
        // Both text attempts time out; the backup timer must not retry it.
        transport
            .push_text(Err(TransportError::TimedOut))
            .push_text(Err(TransportError::TimedOut));
        let mut config = EngineConfig::default();
        config.followup.backup_margin_secs = 2;
        let engine = engine(&config, &transport);

        let to = RecipientId(7);
        let payload = FollowupPayload::new("Still there?")
            .with_markup(Markup::single(Button::callback("Open", "open_box")));
        assert!(engine.schedule_followup(FollowupTask {
            recipient: to,
            fire_after: Duration::from_secs(1),
            payload,
        }));
        assert!(engine.followup_pending(to));

        sleep(Duration::from_secs(30)).await;
        assert!(!engine.followup_pending(to));
        // one firing, two attempts under the retry policy
        assert_eq!(transport.texts_to(to).len(), 2);
        assert!(
            transport
                .calls()
                .iter()
                .all(|c| matches!(c.kind, CallKind::Text { has_markup: true, .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_through_facade() {
        let transport = Arc::new(FakeTransport::new());
        let engine = engine(&EngineConfig::default(), &transport);
        let to = RecipientId(3);

        engine.schedule_followup(FollowupTask {
            recipient: to,
            fire_after: Duration::from_secs(10),
            payload: FollowupPayload::new("ping"),
        });
        assert!(engine.cancel_followup(to));

        sleep(Duration::from_secs(60)).await;
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn open_without_cache_path_is_ephemeral() {
        let transport = Arc::new(FakeTransport::new());
        let engine = Engine::open(&EngineConfig::default(), transport).await;
        assert!(engine.cache().path().is_none());
    }

    #[tokio::test]
    async fn open_with_cache_path_loads_existing_ids() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file_ids.json");
        std::fs::write(&path, r#"{"img1": "AgAC-1"}"#).unwrap();

        let config = EngineConfig {
            cache_path: Some(path.clone()),
            ..EngineConfig::default()
        };
        let transport = Arc::new(FakeTransport::new());
        let engine = Engine::open(&config, transport).await;
        assert_eq!(engine.cache().path(), Some(path.as_path()));
        assert_eq!(engine.cache().get("img1").as_deref(), Some("AgAC-1"));
    }
}
