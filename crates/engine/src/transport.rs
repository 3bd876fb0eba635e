//! The send capability the engine drives.

use std::{fmt, time::Duration};

use {
    async_trait::async_trait,
    courier_common::{AssetKind, Markup, RecipientId},
    url::Url,
};

use crate::retry::{Classify, RetryClass};

/// A concrete, ready-to-send representation of an asset.
#[derive(Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Identifier previously issued by the provider.
    FileId(String),
    /// Public URL the provider fetches itself.
    Url(Url),
    /// Raw bytes to upload. Built fresh for every attempt.
    Bytes { file_name: String, data: Vec<u8> },
}

impl fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileId(id) => f.debug_tuple("FileId").field(id).finish(),
            Self::Url(url) => f.debug_tuple("Url").field(&url.as_str()).finish(),
            Self::Bytes { file_name, data } => f
                .debug_struct("Bytes")
                .field("file_name", file_name)
                .field("len", &data.len())
                .finish(),
        }
    }
}

/// Transport failure, pre-classified by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("request timed out")]
    TimedOut,

    #[error("{message}")]
    Permanent { message: String },
}

impl TransportError {
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }
}

impl Classify for TransportError {
    fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { retry_after } => RetryClass::RateLimited(*retry_after),
            Self::TimedOut => RetryClass::TimedOut,
            Self::Permanent { .. } => RetryClass::Permanent,
        }
    }
}

/// Outbound message sender. Implementations bound every call with their own
/// connect/read timeouts and report an overrun as [`TransportError::TimedOut`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a photo or audio message. Returns the identifier the provider
    /// issued for the uploaded media, when it reports one.
    async fn send_media(
        &self,
        to: RecipientId,
        kind: AssetKind,
        source: MediaSource,
        caption: Option<&str>,
        markup: Option<&Markup>,
    ) -> Result<Option<String>, TransportError>;

    /// Send a plain text message.
    async fn send_text(
        &self,
        to: RecipientId,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<(), TransportError>;
}
