//! Pending-authorization state ledger
//!
//! Short-lived, single-use storage for the anti-CSRF state and PKCE
//! verifier of the one in-flight authorization attempt. Single slot: a new
//! `store` overwrites any previous pending attempt, and `take` returns the
//! value while clearing the slot in the same logical step, so a replayed
//! callback observes "absent".
//!
//! Shares the persistence substrate (and fail-soft contract) of the token
//! store, under a separate slot. Known limitation: two client instances
//! sharing a persistent backend race on this slot and the last `store`
//! wins — at most one authorization attempt per storage namespace is
//! supported.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::storage::{self, StorageKind};

/// Everything needed to validate and complete one authorization attempt.
/// Created immediately before the user is redirected away; consumed exactly
/// once by the callback handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuth {
    /// Anti-CSRF state token round-tripped through the redirect.
    pub state: String,
    /// PKCE code verifier, sent during token exchange.
    pub code_verifier: String,
    /// PKCE code challenge, included in the authorization URL.
    pub code_challenge: String,
    /// Redirect URI in effect when the attempt was created.
    pub redirect_uri: String,
}

/// Single-slot, read-once storage for the in-flight authorization attempt.
#[async_trait]
pub trait StateLedger: Send + Sync {
    /// Record a pending attempt, overwriting any previous one.
    async fn store(&self, pending: PendingAuth);
    /// Return the pending attempt and clear the slot in one logical step.
    async fn take(&self) -> Option<PendingAuth>;
    /// Drop any lingering pending attempt.
    async fn clear(&self);
}

/// Build a state ledger on the same backend family as the token store.
pub fn create_ledger(kind: &StorageKind, namespace: &str) -> std::sync::Arc<dyn StateLedger> {
    match kind {
        StorageKind::Memory => std::sync::Arc::new(MemoryLedger::default()),
        StorageKind::File(dir) => std::sync::Arc::new(FileLedger::new(
            dir.join(format!("{namespace}-pending-auth.json")),
        )),
        StorageKind::Session => std::sync::Arc::new(FileLedger::new(
            std::env::temp_dir()
                .join(format!("oauth-{namespace}"))
                .join(format!("{namespace}-pending-auth.json")),
        )),
    }
}

#[derive(Default)]
struct MemoryLedger {
    slot: Mutex<Option<PendingAuth>>,
}

#[async_trait]
impl StateLedger for MemoryLedger {
    async fn store(&self, pending: PendingAuth) {
        *self.slot.lock().await = Some(pending);
    }

    async fn take(&self) -> Option<PendingAuth> {
        self.slot.lock().await.take()
    }

    async fn clear(&self) {
        *self.slot.lock().await = None;
    }
}

struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl StateLedger for FileLedger {
    async fn store(&self, pending: PendingAuth) {
        storage::write_json(&self.path, &pending).await;
    }

    async fn take(&self) -> Option<PendingAuth> {
        let pending = storage::read_json(&self.path).await;
        storage::remove_quiet(&self.path).await;
        pending
    }

    async fn clear(&self) {
        storage::remove_quiet(&self.path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(state: &str) -> PendingAuth {
        PendingAuth {
            state: state.into(),
            code_verifier: "verifier".into(),
            code_challenge: "challenge".into(),
            redirect_uri: "https://app.example.com/callback".into(),
        }
    }

    #[tokio::test]
    async fn take_clears_the_slot() {
        let ledger = MemoryLedger::default();
        ledger.store(pending("s1")).await;

        assert_eq!(ledger.take().await, Some(pending("s1")));
        assert!(ledger.take().await.is_none(), "second take must be empty");
    }

    #[tokio::test]
    async fn store_overwrites_previous_attempt() {
        let ledger = MemoryLedger::default();
        ledger.store(pending("s1")).await;
        ledger.store(pending("s2")).await;

        assert_eq!(ledger.take().await, Some(pending("s2")));
    }

    #[tokio::test]
    async fn file_ledger_is_read_once() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("pending.json"));
        ledger.store(pending("s1")).await;

        assert_eq!(ledger.take().await, Some(pending("s1")));
        assert!(ledger.take().await.is_none());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("pending.json"));
        ledger.clear().await;
        ledger.store(pending("s1")).await;
        ledger.clear().await;
        ledger.clear().await;
        assert!(ledger.take().await.is_none());
    }

    #[tokio::test]
    async fn ledger_and_store_slots_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let kind = StorageKind::File(dir.path().to_path_buf());

        let ledger = create_ledger(&kind, "client-a");
        let store = crate::storage::create_store(&kind, "client-a");

        ledger.store(pending("s1")).await;
        assert!(store.get().await.is_none(), "pending auth is not a token set");
        assert!(ledger.take().await.is_some());
    }
}
