//! Single-send driver: resolve, attempt, retry, fall back.

use std::sync::Arc;

use {
    courier_common::{DeliveryRequest, Markup, RecipientId},
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    cache::IdentifierCache,
    resolve::{Candidate, Resolver, Tier},
    retry::{Classify, RetryPolicy},
    transport::{MediaSource, Transport},
};

/// Upper bound on re-resolutions within one delivery. Each pass either
/// returns or drops a cache entry.
const MAX_RESOLUTIONS: usize = 4;

/// Terminal result of a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Media went out through the given tier.
    Sent { tier: Tier },
    /// Media could not be sent; the caption went out as plain text instead.
    SentAsTextFallback,
    Failed { reason: String },
}

impl Outcome {
    /// True when the recipient received something.
    pub fn is_delivered(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

pub struct DeliveryExecutor {
    transport: Arc<dyn Transport>,
    resolver: Resolver,
    cache: Arc<IdentifierCache>,
    retry: RetryPolicy,
}

impl DeliveryExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<IdentifierCache>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            resolver: Resolver::new(Arc::clone(&cache)),
            cache,
            retry,
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Deliver one asset. Never fails: every error ends up in the outcome.
    pub async fn deliver(&self, request: &DeliveryRequest) -> Outcome {
        let to = request.recipient;
        let key = request.asset.key();

        let failure = match self.send_media(request).await {
            Ok(tier) => {
                info!(recipient = %to, asset = key, %tier, "asset delivered");
                return Outcome::Sent { tier };
            },
            Err(e) => e,
        };

        let Some(caption) = request.caption.as_deref() else {
            warn!(
                recipient = %to,
                asset = key,
                error = %failure,
                "asset delivery failed, no caption to fall back to"
            );
            return Outcome::Failed {
                reason: failure.to_string(),
            };
        };

        warn!(
            recipient = %to,
            asset = key,
            error = %failure,
            "asset delivery failed, falling back to text"
        );
        match self.deliver_text(to, caption, request.markup.as_ref()).await {
            Ok(()) => {
                info!(recipient = %to, asset = key, "asset caption sent as text");
                Outcome::SentAsTextFallback
            },
            Err(e) => {
                warn!(recipient = %to, asset = key, error = %e, "text fallback failed");
                Outcome::Failed {
                    reason: format!("{failure}; text fallback: {e}"),
                }
            },
        }
    }

    /// Send a text-only message under the same retry policy as media.
    pub async fn deliver_text(
        &self,
        to: RecipientId,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<()> {
        let transport = self.transport.as_ref();
        self.retry
            .run("send text", || transport.send_text(to, text, markup))
            .await
            .map_err(Error::from)
    }

    async fn send_media(&self, request: &DeliveryRequest) -> Result<Tier> {
        let asset = &request.asset;

        for _ in 0..MAX_RESOLUTIONS {
            let candidate = self
                .resolver
                .resolve(asset)?
                .into_iter()
                .next()
                .ok_or_else(|| Error::resource_not_found(asset.key()))?;
            let tier = candidate.tier();
            debug!(recipient = %request.recipient, asset = asset.key(), %tier, "attempting candidate");

            match self.attempt(request, &candidate).await {
                Ok(issued) => {
                    if tier.issues_identifier()
                        && let Some(id) = issued
                    {
                        self.cache.put(asset.key(), &id).await;
                    }
                    return Ok(tier);
                },
                Err(e) if tier == Tier::CachedId && e.is_permanent() => {
                    warn!(
                        asset = asset.key(),
                        error = %e,
                        "cached identifier rejected, invalidating"
                    );
                    self.cache.invalidate(asset.key()).await;
                },
                Err(e) => return Err(e),
            }
        }

        Err(Error::message(format!(
            "gave up re-resolving asset \"{}\"",
            asset.key()
        )))
    }

    async fn attempt(
        &self,
        request: &DeliveryRequest,
        candidate: &Candidate,
    ) -> Result<Option<String>> {
        let transport = self.transport.as_ref();
        let to = request.recipient;
        let kind = request.asset.kind();
        let caption = request.caption.as_deref();
        let markup = request.markup.as_ref();

        self.retry
            .run("send media", || async move {
                let source = acquire(candidate).await?;
                let issued = transport
                    .send_media(to, kind, source, caption, markup)
                    .await?;
                Ok::<_, Error>(issued)
            })
            .await
    }
}

/// Materialize a candidate. Local files are read afresh on every call since
/// an upload body cannot be replayed.
async fn acquire(candidate: &Candidate) -> Result<MediaSource> {
    Ok(match candidate {
        Candidate::OverrideId(id) | Candidate::CachedId(id) => MediaSource::FileId(id.clone()),
        Candidate::RemoteUrl(url) => MediaSource::Url(url.clone()),
        Candidate::LocalBytes(path) => {
            let data = tokio::fs::read(path)
                .await
                .map_err(|e| Error::read_asset(path, e))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload.bin".to_string());
            MediaSource::Bytes { file_name, data }
        },
    })
}
