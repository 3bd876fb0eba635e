//! Config schema: Telegram account, engine tuning, asset catalog and the
//! conversation script.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    courier_common::{Asset, AssetKind, Button},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    url::Url,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub telegram: TelegramConfig,
    pub engine: EngineConfig,
    /// Media catalog keyed by the stable cache key.
    pub assets: BTreeMap<String, AssetConfig>,
    pub script: ScriptConfig,
}

impl CourierConfig {
    /// Build the immutable asset catalog.
    pub fn asset_catalog(&self) -> BTreeMap<String, Asset> {
        self.assets
            .iter()
            .map(|(key, cfg)| (key.clone(), cfg.to_asset(key)))
            .collect()
    }

    /// Rebase relative asset and cache paths onto `base`, normally the
    /// directory holding the config file.
    pub fn rebase_paths(&mut self, base: &Path) {
        for asset in self.assets.values_mut() {
            if let Some(path) = asset.local_path.as_mut()
                && path.is_relative()
            {
                *path = base.join(&*path);
            }
        }
        if let Some(path) = self.engine.cache_path.as_mut()
            && path.is_relative()
        {
            *path = base.join(&*path);
        }
    }
}

/// Configuration for the Telegram bot account.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub token: Secret<String>,

    /// TCP connect timeout for Bot API calls.
    pub connect_timeout_secs: u64,

    /// Whole-request timeout. Must exceed `poll_timeout_secs` so long polling
    /// is not cut short by the HTTP client.
    pub request_timeout_secs: u64,

    /// Long-polling timeout passed to `getUpdates`.
    pub poll_timeout_secs: u32,

    /// Formatting applied to captions, messages and the reveal text.
    /// Plain text when unset.
    pub parse_mode: Option<TextFormat>,
}

/// Telegram text formatting modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    Markdown,
    MarkdownV2,
    Html,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("parse_mode", &self.parse_mode)
            .finish()
    }
}

impl TelegramConfig {
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            connect_timeout_secs: 10,
            request_timeout_secs: 45,
            poll_timeout_secs: 30,
            parse_mode: None,
        }
    }
}

/// Delivery engine tuning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// JSON file holding issued file identifiers. `None` keeps the cache in
    /// memory only.
    pub cache_path: Option<PathBuf>,
    pub retry: RetryConfig,
    pub followup: FollowupConfig,
}

/// Retry policy for transient transport failures.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per candidate, including the first one.
    pub max_attempts: u32,
    /// Fixed wait after a timed-out request.
    pub timeout_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            timeout_backoff_ms: 1_000,
        }
    }
}

/// Follow-up scheduler tuning.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FollowupConfig {
    /// Extra delay before the backup timer fires.
    pub backup_margin_secs: u64,
}

impl Default for FollowupConfig {
    fn default() -> Self {
        Self {
            backup_margin_secs: 5,
        }
    }
}

/// One media asset.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AssetConfig {
    pub kind: AssetKind,
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    #[serde(default)]
    pub remote_url: Option<Url>,
    /// Provider identifier that short-circuits every other source.
    #[serde(default)]
    pub override_id: Option<String>,
}

impl AssetConfig {
    pub fn to_asset(&self, key: &str) -> Asset {
        let mut asset = Asset::new(key, self.kind);
        if let Some(ref path) = self.local_path {
            asset = asset.with_local_path(path.clone());
        }
        if let Some(ref url) = self.remote_url {
            asset = asset.with_remote_url(url.clone());
        }
        if let Some(ref id) = self.override_id {
            asset = asset.with_override_id(id.clone());
        }
        asset
    }
}

/// The scripted conversation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Assets sent on `/start`, in order.
    pub start_steps: Vec<StepConfig>,
    /// What pressing the callback button reveals.
    pub reveal: Option<RevealConfig>,
    /// Delayed prompt armed after the start sequence.
    pub followup: Option<FollowupScriptConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    /// Key into `assets`.
    pub asset: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub button: Option<Button>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevealConfig {
    /// Callback data that triggers the reveal.
    pub callback: String,
    pub text: String,
    #[serde(default)]
    pub links: Vec<Button>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowupScriptConfig {
    pub delay_secs: u64,
    pub text: String,
    #[serde(default)]
    pub button: Option<Button>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = CourierConfig::default();
        assert!(!cfg.telegram.has_token());
        assert_eq!(cfg.telegram.request_timeout_secs, 45);
        assert_eq!(cfg.engine.retry.max_attempts, 2);
        assert_eq!(cfg.engine.followup.backup_margin_secs, 5);
        assert!(cfg.engine.cache_path.is_none());
        assert!(cfg.telegram.parse_mode.is_none());
    }

    #[test]
    fn parse_mode_names() {
        let cfg: CourierConfig = toml::from_str(
            r#"
            [telegram]
            parse_mode = "markdown_v2"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.telegram.parse_mode, Some(TextFormat::MarkdownV2));

        let cfg: TelegramConfig = toml::from_str(r#"parse_mode = "html""#).unwrap();
        assert_eq!(cfg.parse_mode, Some(TextFormat::Html));

        assert!(toml::from_str::<TelegramConfig>(r#"parse_mode = "bbcode""#).is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = TelegramConfig {
            token: Secret::new("123:ABC".into()),
            ..Default::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("123:ABC"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn asset_catalog_carries_every_source() {
        let cfg: CourierConfig = toml::from_str(
            r#"
            [assets.img1]
            kind = "image"
            local_path = "gift.jpg"
            remote_url = "https://cdn.example.com/gift.jpg"
            override_id = "AgACAgEAAx"
            "#,
        )
        .unwrap();
        let catalog = cfg.asset_catalog();
        let asset = &catalog["img1"];
        assert_eq!(asset.key(), "img1");
        assert_eq!(asset.kind(), AssetKind::Image);
        assert_eq!(asset.local_path(), Some(Path::new("gift.jpg")));
        assert_eq!(asset.override_id(), Some("AgACAgEAAx"));
        assert!(asset.remote_url().is_some());
    }

    #[test]
    fn rebase_keeps_absolute_paths() {
        let mut cfg: CourierConfig = toml::from_str(
            r#"
            [engine]
            cache_path = "file_ids.json"
            [assets.rel]
            kind = "audio"
            local_path = "voice.ogg"
            [assets.abs]
            kind = "image"
            local_path = "/srv/gift.jpg"
            "#,
        )
        .unwrap();
        cfg.rebase_paths(Path::new("/etc/courier"));
        assert_eq!(
            cfg.assets["rel"].local_path.as_deref(),
            Some(Path::new("/etc/courier/voice.ogg"))
        );
        assert_eq!(
            cfg.assets["abs"].local_path.as_deref(),
            Some(Path::new("/srv/gift.jpg"))
        );
        assert_eq!(
            cfg.engine.cache_path.as_deref(),
            Some(Path::new("/etc/courier/file_ids.json"))
        );
    }
}
