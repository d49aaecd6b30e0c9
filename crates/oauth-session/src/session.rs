//! Observable session facade over the OAuth client
//!
//! Surfaces the client's state as `tokio::sync::watch` channels so a UI
//! layer can bind to authenticated / loading / user / error without
//! polling. Every operation follows the same shape: mark loading, clear
//! the previous error, run the client operation, record its outcome, and
//! recompute the authenticated flag from the token store.

use tokio::sync::watch;
use tracing::debug;

use oauth_client::{Error, OAuthClient, Result};

/// Session state holder for one OAuth client.
pub struct Session {
    client: OAuthClient,
    authenticated: watch::Sender<bool>,
    loading: watch::Sender<bool>,
    user: watch::Sender<Option<serde_json::Value>>,
    error: watch::Sender<Option<String>>,
}

impl Session {
    /// Wrap a client, seeding the authenticated flag from any persisted
    /// token set.
    pub async fn new(client: OAuthClient) -> Self {
        let authenticated = watch::Sender::new(client.is_authenticated().await);
        Self {
            client,
            authenticated,
            loading: watch::Sender::new(false),
            user: watch::Sender::new(None),
            error: watch::Sender::new(None),
        }
    }

    /// The wrapped client, for operations the facade does not mediate.
    pub fn client(&self) -> &OAuthClient {
        &self.client
    }

    // Current values

    pub fn is_authenticated(&self) -> bool {
        *self.authenticated.borrow()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn user(&self) -> Option<serde_json::Value> {
        self.user.borrow().clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    // Watchers for UI binding

    pub fn watch_authenticated(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }

    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn watch_user(&self) -> watch::Receiver<Option<serde_json::Value>> {
        self.user.subscribe()
    }

    pub fn watch_error(&self) -> watch::Receiver<Option<String>> {
        self.error.subscribe()
    }

    /// Start a login attempt. Returns the authorization URL; the caller is
    /// responsible for sending the user there.
    pub async fn login(&self) -> Result<String> {
        self.begin();
        let result = self.client.authorization_url().await;
        self.finish(result.as_ref().err()).await;
        result
    }

    /// Complete the flow from the callback URL the user returned on.
    pub async fn handle_callback(&self, callback_url: &str) -> Result<()> {
        self.begin();
        let result = self.client.handle_callback(callback_url).await;
        self.finish(result.as_ref().err()).await;
        debug!(ok = result.is_ok(), "callback handled");
        result.map(|_| ())
    }

    /// Local logout: clear tokens, cancel the refresh timer, drop pending
    /// state. Never fails.
    pub async fn logout(&self) {
        self.begin();
        self.client.logout().await;
        self.user.send_replace(None);
        self.finish(None).await;
    }

    /// Best-effort server-side revocation plus local logout.
    pub async fn revoke_tokens(&self) -> Result<()> {
        self.begin();
        let result = self.client.revoke_tokens().await;
        self.user.send_replace(None);
        self.finish(result.as_ref().err()).await;
        result
    }

    /// Refresh the access token, then refresh the cached user profile.
    pub async fn refresh(&self) -> Result<()> {
        self.begin();
        let result = self.client.refresh_access_token().await.map(|_| ());
        self.finish(result.as_ref().err()).await;
        if result.is_ok() {
            // Profile may have changed server-side; failure here surfaces
            // through the error channel without failing the refresh.
            let _ = self.fetch_user_info().await;
        }
        result
    }

    /// Fetch the user profile and publish it on the `user` channel.
    pub async fn fetch_user_info(&self) -> Result<serde_json::Value> {
        self.begin();
        let result = self.client.user_info().await;
        if let Ok(profile) = &result {
            self.user.send_replace(Some(profile.clone()));
        }
        self.finish(result.as_ref().err()).await;
        result
    }

    /// A valid access token, refreshed first if stale. No loading churn:
    /// this is called on the request path, not from user gestures.
    pub async fn access_token(&self) -> Result<String> {
        self.client.access_token().await
    }

    fn begin(&self) {
        self.loading.send_replace(true);
        self.error.send_replace(None);
    }

    async fn finish(&self, error: Option<&Error>) {
        if let Some(e) = error {
            self.error.send_replace(Some(e.to_string()));
        }
        self.authenticated
            .send_replace(self.client.is_authenticated().await);
        self.loading.send_replace(false);
    }
}
