//! Core data types shared by the engine, the transport adapters and config.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use {
    serde::{Deserialize, Serialize},
    url::Url,
};

/// Addressable destination of a message (a Telegram chat id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(pub i64);

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecipientId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Media category of an asset; decides which send method the transport uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Audio,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Image => "image",
            Self::Audio => "audio",
        })
    }
}

/// A logical media item with several possible transmission sources.
///
/// Assets are static configuration: they are built once at startup and only
/// exposed through read-only accessors afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    key: String,
    kind: AssetKind,
    local_path: Option<PathBuf>,
    remote_url: Option<Url>,
    override_id: Option<String>,
}

impl Asset {
    #[must_use]
    pub fn new(key: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            key: key.into(),
            kind,
            local_path: None,
            remote_url: None,
            override_id: None,
        }
    }

    #[must_use]
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_remote_url(mut self, url: Url) -> Self {
        self.remote_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_override_id(mut self, id: impl Into<String>) -> Self {
        self.override_id = Some(id.into());
        self
    }

    /// Stable cache key, e.g. `"img1"` or `"audio"`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    pub fn remote_url(&self) -> Option<&Url> {
        self.remote_url.as_ref()
    }

    /// Operator-supplied provider identifier that bypasses every other source.
    pub fn override_id(&self) -> Option<&str> {
        self.override_id.as_deref()
    }

    /// True when at least one source is configured.
    pub fn has_source(&self) -> bool {
        self.local_path.is_some() || self.remote_url.is_some() || self.override_id.is_some()
    }
}

/// What pressing a button does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    /// Sends the opaque data string back to the bot.
    Callback(String),
    /// Opens a link.
    Url(Url),
}

/// A single inline button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    #[serde(flatten)]
    pub action: ButtonAction,
}

impl Button {
    #[must_use]
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }

    #[must_use]
    pub fn url(label: impl Into<String>, url: Url) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url),
        }
    }
}

/// Inline button layout, one inner `Vec` per row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Markup {
    pub rows: Vec<Vec<Button>>,
}

impl Markup {
    /// One button on a single row.
    #[must_use]
    pub fn single(button: Button) -> Self {
        Self {
            rows: vec![vec![button]],
        }
    }

    /// One button per row, in order.
    #[must_use]
    pub fn column(buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}

/// One "send this asset to this recipient" call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub recipient: RecipientId,
    pub asset: Asset,
    pub caption: Option<String>,
    pub markup: Option<Markup>,
}

impl DeliveryRequest {
    #[must_use]
    pub fn new(recipient: RecipientId, asset: Asset) -> Self {
        Self {
            recipient,
            asset,
            caption: None,
            markup: None,
        }
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    #[must_use]
    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = Some(markup);
        self
    }
}

/// Text prompt sent by a follow-up, with an optional button layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowupPayload {
    pub text: String,
    pub markup: Option<Markup>,
}

impl FollowupPayload {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: None,
        }
    }

    #[must_use]
    pub fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = Some(markup);
        self
    }
}
