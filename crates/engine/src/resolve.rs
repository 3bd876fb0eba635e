//! Tiered source resolution for assets.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use {courier_common::Asset, url::Url};

use crate::{Error, Result, cache::IdentifierCache};

/// Candidate source category, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    OverrideId,
    CachedId,
    RemoteUrl,
    LocalBytes,
}

impl Tier {
    /// Tiers whose success may hand back a fresh provider identifier.
    pub fn issues_identifier(self) -> bool {
        matches!(self, Self::RemoteUrl | Self::LocalBytes)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OverrideId => "override_id",
            Self::CachedId => "cached_id",
            Self::RemoteUrl => "remote_url",
            Self::LocalBytes => "local_bytes",
        })
    }
}

/// A transmission source that has not been tried yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    OverrideId(String),
    CachedId(String),
    RemoteUrl(Url),
    LocalBytes(PathBuf),
}

impl Candidate {
    pub fn tier(&self) -> Tier {
        match self {
            Self::OverrideId(_) => Tier::OverrideId,
            Self::CachedId(_) => Tier::CachedId,
            Self::RemoteUrl(_) => Tier::RemoteUrl,
            Self::LocalBytes(_) => Tier::LocalBytes,
        }
    }
}

/// Turns an asset into its ordered candidate list. Does no network I/O; the
/// only filesystem access is a metadata check for the local-bytes tier.
#[derive(Clone)]
pub struct Resolver {
    cache: Arc<IdentifierCache>,
}

impl Resolver {
    pub fn new(cache: Arc<IdentifierCache>) -> Self {
        Self { cache }
    }

    pub fn resolve(&self, asset: &Asset) -> Result<Vec<Candidate>> {
        // An override is exclusive: nothing else is consulted.
        if let Some(id) = asset.override_id() {
            return Ok(vec![Candidate::OverrideId(id.to_string())]);
        }

        let mut candidates = Vec::with_capacity(3);
        if let Some(id) = self.cache.get(asset.key()) {
            candidates.push(Candidate::CachedId(id));
        }
        if let Some(url) = asset.remote_url() {
            candidates.push(Candidate::RemoteUrl(url.clone()));
        }
        if let Some(path) = asset.local_path()
            && has_bytes(path)
        {
            candidates.push(Candidate::LocalBytes(path.to_path_buf()));
        }

        if candidates.is_empty() {
            return Err(Error::resource_not_found(asset.key()));
        }
        Ok(candidates)
    }
}

fn has_bytes(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, courier_common::AssetKind, tempfile::TempDir};

    fn url() -> Url {
        "https://cdn.example.com/gift.jpg".parse().unwrap()
    }

    fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn full_priority_order() {
        let tmp = TempDir::new().unwrap();
        let local = write_file(&tmp, "gift.jpg", b"jpeg");
        let cache = Arc::new(IdentifierCache::ephemeral());
        cache.put("img1", "AgAC-cached").await;

        let asset = Asset::new("img1", AssetKind::Image)
            .with_remote_url(url())
            .with_local_path(&local);
        let tiers: Vec<_> = Resolver::new(cache)
            .resolve(&asset)
            .unwrap()
            .iter()
            .map(Candidate::tier)
            .collect();
        assert_eq!(tiers, vec![Tier::CachedId, Tier::RemoteUrl, Tier::LocalBytes]);
    }

    #[tokio::test]
    async fn override_short_circuits_everything() {
        let tmp = TempDir::new().unwrap();
        let local = write_file(&tmp, "gift.jpg", b"jpeg");
        let cache = Arc::new(IdentifierCache::ephemeral());
        cache.put("img1", "AgAC-cached").await;

        let asset = Asset::new("img1", AssetKind::Image)
            .with_override_id("AgAC-override")
            .with_remote_url(url())
            .with_local_path(&local);
        let candidates = Resolver::new(cache).resolve(&asset).unwrap();
        assert_eq!(
            candidates,
            vec![Candidate::OverrideId("AgAC-override".into())]
        );
    }

    #[test]
    fn local_only() {
        let tmp = TempDir::new().unwrap();
        let local = write_file(&tmp, "voice.ogg", b"OggS");
        let asset = Asset::new("audio", AssetKind::Audio).with_local_path(&local);

        let candidates = Resolver::new(Arc::new(IdentifierCache::ephemeral()))
            .resolve(&asset)
            .unwrap();
        assert_eq!(candidates, vec![Candidate::LocalBytes(local)]);
    }

    #[test]
    fn empty_or_missing_file_is_not_a_candidate() {
        let tmp = TempDir::new().unwrap();
        let empty = write_file(&tmp, "empty.jpg", b"");
        let resolver = Resolver::new(Arc::new(IdentifierCache::ephemeral()));

        for path in [empty, tmp.path().join("missing.jpg"), tmp.path().to_path_buf()] {
            let asset = Asset::new("img1", AssetKind::Image).with_local_path(path);
            let err = resolver.resolve(&asset).unwrap_err();
            assert!(matches!(err, Error::ResourceNotFound { ref key } if key == "img1"));
        }
    }
}
