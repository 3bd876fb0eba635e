//! Durable asset-key → provider file id cache.
//!
//! The whole map lives in memory; every mutation is written through to a
//! single JSON object file (`{"img1": "AgAC..."}`) with a temp-file + rename.
//! Reads never touch disk.

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use {
    tokio::{fs, sync::Mutex},
    tracing::{debug, info, warn},
};

use crate::Result;

pub struct IdentifierCache {
    path: Option<PathBuf>,
    entries: RwLock<HashMap<String, String>>,
    /// Serializes write-through so the file always reflects the last
    /// in-memory mutation.
    write_gate: Mutex<()>,
}

impl IdentifierCache {
    /// A cache with no backing file.
    pub fn ephemeral() -> Self {
        Self {
            path: None,
            entries: RwLock::new(HashMap::new()),
            write_gate: Mutex::new(()),
        }
    }

    /// Load the cache from `path`. A missing or unreadable file yields an
    /// empty cache; this never fails.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load(&path).await {
            Ok(entries) => {
                info!(path = %path.display(), count = entries.len(), "identifier cache loaded");
                entries
            },
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "identifier cache unreadable, starting empty"
                );
                HashMap::new()
            },
        };
        Self {
            path: Some(path),
            entries: RwLock::new(entries),
            write_gate: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Sorted copy of every entry.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Record `id` for `key`, replacing any previous value.
    pub async fn put(&self, key: &str, id: &str) {
        let _gate = self.write_gate.lock().await;
        let snapshot = {
            let mut entries = self.write();
            if entries.get(key).is_some_and(|existing| existing == id) {
                return;
            }
            entries.insert(key.to_string(), id.to_string());
            sorted(&entries)
        };
        debug!(key, "identifier cached");
        self.write_through(&snapshot).await;
    }

    /// Drop the entry for `key`. Returns whether one existed.
    pub async fn invalidate(&self, key: &str) -> bool {
        let _gate = self.write_gate.lock().await;
        let snapshot = {
            let mut entries = self.write();
            if entries.remove(key).is_none() {
                return false;
            }
            sorted(&entries)
        };
        info!(key, "cached identifier invalidated");
        self.write_through(&snapshot).await;
        true
    }

    /// Drop every entry. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        let _gate = self.write_gate.lock().await;
        let removed = {
            let mut entries = self.write();
            let n = entries.len();
            entries.clear();
            n
        };
        self.write_through(&BTreeMap::new()).await;
        removed
    }

    /// Persistence failures are logged and swallowed; the in-memory view
    /// keeps serving for the rest of the process lifetime.
    async fn write_through(&self, snapshot: &BTreeMap<String, String>) {
        let Some(ref path) = self.path else {
            return;
        };
        if let Err(e) = atomic_write(path, snapshot).await {
            warn!(
                path = %path.display(),
                error = %e,
                "failed to persist identifier cache, continuing in memory"
            );
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn sorted(entries: &HashMap<String, String>) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

async fn load(path: &Path) -> Result<HashMap<String, String>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(HashMap::new());
    }
    let data = fs::read_to_string(path).await?;
    if data.trim().is_empty() {
        return Ok(HashMap::new());
    }
    Ok(serde_json::from_str(&data)?)
}

/// Write to a sibling temp file, then rename over the target.
async fn atomic_write(path: &Path, entries: &BTreeMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(entries)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
