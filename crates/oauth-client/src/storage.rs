//! Token persistence
//!
//! The token store owns the current `TokenSet`. Three interchangeable
//! backends are selected by `StorageKind`: in-process memory (the default),
//! a durable JSON file under a caller-chosen directory, and a file under
//! the OS temp directory that lives only as long as the OS keeps it.
//!
//! Persistence is fail-soft by contract: a corrupt, unreadable, or absent
//! backing file reads as "no token stored", and write failures are logged
//! and swallowed. Storage faults never propagate to the flow. All writes
//! use atomic temp-file + rename with 0600 permissions since the file
//! contains bearer tokens.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// The stored token set.
///
/// `expires_at` is an absolute unix-millisecond instant computed at receipt
/// time as `now + expires_in * 1000`. The server's lifetime is always taken
/// as a delta from the moment of receipt, never as a pre-computed wall-clock
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Expiration as a unix timestamp in milliseconds.
    pub expires_at: u64,
}

impl TokenSet {
    /// Whether the access token is still valid at `now` (strictly before
    /// expiry).
    pub fn is_current(&self, now: u64) -> bool {
        now < self.expires_at
    }

    /// Whether the token is within `buffer_millis` of expiry (or past it)
    /// at `now`, i.e. due for a proactive refresh.
    pub fn is_stale(&self, buffer_millis: u64, now: u64) -> bool {
        now >= self.expires_at.saturating_sub(buffer_millis)
    }
}

/// Persistence backend selector.
#[derive(Debug, Clone, Default)]
pub enum StorageKind {
    /// In-process memory; lost when the process exits. The default and
    /// the safest.
    #[default]
    Memory,
    /// JSON files under the given directory; survive restarts.
    File(PathBuf),
    /// JSON files under the OS temp directory, namespaced by client id;
    /// survive restarts only until the OS clears its temp storage.
    Session,
}

impl StorageKind {
    /// Directory backing persistent variants, `None` for memory.
    fn dir(&self, namespace: &str) -> Option<PathBuf> {
        match self {
            StorageKind::Memory => None,
            StorageKind::File(dir) => Some(dir.clone()),
            StorageKind::Session => Some(std::env::temp_dir().join(format!("oauth-{namespace}"))),
        }
    }
}

/// Capability surface of a token store.
///
/// Updates are wholesale: `set` overwrites the previous value, there is no
/// merge, so each operation is atomic from the caller's perspective.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Option<TokenSet>;
    async fn set(&self, tokens: &TokenSet);
    async fn clear(&self);
}

/// Build a token store for the given backend, namespaced by client id so
/// two clients sharing a directory do not clobber each other.
pub fn create_store(kind: &StorageKind, namespace: &str) -> std::sync::Arc<dyn TokenStore> {
    match kind.dir(namespace) {
        None => std::sync::Arc::new(MemoryStore::default()),
        Some(dir) => std::sync::Arc::new(FileStore::new(dir.join(format!("{namespace}-tokens.json")))),
    }
}

/// Volatile in-process store.
#[derive(Default)]
pub struct MemoryStore {
    tokens: Mutex<Option<TokenSet>>,
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get(&self) -> Option<TokenSet> {
        self.tokens.lock().await.clone()
    }

    async fn set(&self, tokens: &TokenSet) {
        *self.tokens.lock().await = Some(tokens.clone());
    }

    async fn clear(&self) {
        *self.tokens.lock().await = None;
    }
}

/// File-backed store holding one JSON document.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl TokenStore for FileStore {
    async fn get(&self) -> Option<TokenSet> {
        read_json(&self.path).await
    }

    async fn set(&self, tokens: &TokenSet) {
        write_json(&self.path, tokens).await;
    }

    async fn clear(&self) {
        remove_quiet(&self.path).await;
    }
}

/// Read a JSON document, degrading any failure to `None`.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "stored JSON is corrupt, treating as absent");
            None
        }
    }
}

/// Write a JSON document atomically (temp file + rename, 0600). Failures
/// are logged and swallowed.
pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) {
    if let Err(e) = try_write_json(path, value).await {
        warn!(path = %path.display(), error = %e, "failed to persist, continuing without storage");
    }
}

async fn try_write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let dir = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "storage path has no parent")
    })?;
    tokio::fs::create_dir_all(dir).await?;

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("slot");
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));
    tokio::fs::write(&tmp_path, json.as_bytes()).await?;

    // 0600: the file holds bearer tokens (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms).await?;
    }

    tokio::fs::rename(&tmp_path, path).await?;
    debug!(path = %path.display(), "persisted");
    Ok(())
}

/// Remove a file, ignoring "already gone" and logging anything else.
pub(crate) async fn remove_quiet(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove stored file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tokens(expires_at: u64) -> TokenSet {
        TokenSet {
            access_token: "at_test".into(),
            refresh_token: Some("rt_test".into()),
            expires_at,
        }
    }

    #[test]
    fn expiry_checks_use_strict_comparison() {
        let tokens = test_tokens(10_000);
        assert!(tokens.is_current(9_999));
        assert!(!tokens.is_current(10_000));

        // 3 seconds of buffer: stale from 7_000 onwards
        assert!(!tokens.is_stale(3_000, 6_999));
        assert!(tokens.is_stale(3_000, 7_000));
        assert!(tokens.is_stale(3_000, 20_000));
    }

    #[test]
    fn stale_check_saturates_near_epoch() {
        let tokens = test_tokens(1_000);
        assert!(tokens.is_stale(5_000, 0), "buffer larger than expiry");
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryStore::default();
        assert!(store.get().await.is_none());

        let tokens = test_tokens(10_000);
        store.set(&tokens).await;
        assert_eq!(store.get().await, Some(tokens));

        store.clear().await;
        assert!(store.get().await.is_none());
        // clear is idempotent
        store.clear().await;
    }

    #[tokio::test]
    async fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let store = FileStore::new(path.clone());

        let tokens = test_tokens(10_000);
        store.set(&tokens).await;

        // A second store on the same path sees the persisted value
        let store2 = FileStore::new(path.clone());
        assert_eq!(store2.get().await, Some(tokens));

        store2.clear().await;
        assert!(store.get().await.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        tokio::fs::write(&path, b"not json {{{").await.unwrap();

        let store = FileStore::new(path);
        assert!(store.get().await.is_none());
    }

    #[tokio::test]
    async fn missing_parent_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/tokens.json");
        let store = FileStore::new(path);

        store.set(&test_tokens(10_000)).await;
        assert!(store.get().await.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn token_file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let store = FileStore::new(path.clone());
        store.set(&test_tokens(10_000)).await;

        let mode = tokio::fs::metadata(&path)
            .await
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600, "token file must be 0600, got {mode:o}");
    }

    #[tokio::test]
    async fn create_store_namespaces_file_backends() {
        let dir = tempfile::tempdir().unwrap();
        let kind = StorageKind::File(dir.path().to_path_buf());

        let a = create_store(&kind, "client-a");
        let b = create_store(&kind, "client-b");
        a.set(&test_tokens(10_000)).await;

        assert!(a.get().await.is_some());
        assert!(b.get().await.is_none(), "namespaces must not collide");
    }

    #[tokio::test]
    async fn memory_kind_is_volatile_per_store() {
        let a = create_store(&StorageKind::Memory, "client-a");
        a.set(&test_tokens(10_000)).await;

        let b = create_store(&StorageKind::Memory, "client-a");
        assert!(b.get().await.is_none(), "memory stores share nothing");
    }
}
