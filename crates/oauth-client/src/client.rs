//! OAuth client orchestrator
//!
//! Composes the PKCE generator, token store, and state ledger into the
//! authorization-code flow state machine: build the authorization URL,
//! validate and complete the callback, exchange and refresh tokens, and
//! keep a valid access token available via the proactive refresh timer.
//!
//! The client is cheaply cloneable (`Arc` inner) so the refresh timer can
//! hold its own handle. The token store is the single source of truth for
//! token data: operations re-read it rather than caching a copy across
//! suspension points.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::pkce;
use crate::refresh;
use crate::state::{self, PendingAuth, StateLedger};
use crate::storage::{self, TokenSet, TokenStore, now_millis};
use crate::token::{self, TokenResponse};

/// The OAuth client. One instance per storage namespace; an application's
/// composition root constructs and owns it (no process-wide singleton).
#[derive(Clone)]
pub struct OAuthClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    ledger: Arc<dyn StateLedger>,
    /// At most one armed refresh timer per client instance.
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl OAuthClient {
    /// Build a client with backends selected by `config.storage`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let store = storage::create_store(&config.storage, &config.client_id);
        let ledger = state::create_ledger(&config.storage, &config.client_id);
        Self::with_backends(config, store, ledger)
    }

    /// Build a client over caller-supplied storage backends.
    pub fn with_backends(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        ledger: Arc<dyn StateLedger>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                http: reqwest::Client::new(),
                store,
                ledger,
                refresh_task: Mutex::new(None),
            }),
        })
    }

    /// Begin an authorization attempt: generate state and PKCE material,
    /// record the pending attempt, and return the URL to redirect the user
    /// to. No network call happens here — the caller performs the redirect.
    pub async fn authorization_url(&self) -> Result<String> {
        let config = &self.inner.config;
        let state = pkce::generate_state();
        let code_verifier = pkce::generate_code_verifier(pkce::DEFAULT_VERIFIER_LENGTH)?;
        let code_challenge = pkce::generate_code_challenge(&code_verifier);

        self.inner
            .ledger
            .store(PendingAuth {
                state: state.clone(),
                code_verifier,
                code_challenge: code_challenge.clone(),
                redirect_uri: config.redirect_uri.clone(),
            })
            .await;

        let scope = config.scopes.join(" ");
        let url = Url::parse_with_params(
            &config.authorize_url(),
            &[
                ("client_id", config.client_id.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state.as_str()),
                ("code_challenge", code_challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| Error::Config(format!("invalid authorize URL: {e}")))?;

        debug!("authorization attempt started");
        Ok(url.into())
    }

    /// Validate the callback and exchange the authorization code for tokens.
    ///
    /// The pending attempt is consumed whatever the outcome, so a replayed
    /// callback always fails state validation. A state mismatch is the
    /// anti-CSRF check and rejects unconditionally.
    pub async fn handle_callback(&self, callback_url: &str) -> Result<TokenSet> {
        let url = Url::parse(callback_url)
            .map_err(|e| Error::InvalidParameter(format!("invalid callback URL: {e}")))?;

        let mut code = None;
        let mut state = None;
        let mut auth_error = None;
        let mut auth_error_description = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => auth_error = Some(value.into_owned()),
                "error_description" => auth_error_description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error_code) = auth_error {
            let description = auth_error_description.unwrap_or_else(|| error_code.clone());
            warn!(code = %error_code, "authorization server returned an error");
            return Err(Error::AuthorizationDenied {
                code: error_code,
                description,
            });
        }
        let code = code.ok_or(Error::MissingCode)?;
        let state = state.ok_or(Error::MissingState)?;

        // Read-and-clear: from here on, this attempt cannot be replayed.
        let pending = self
            .inner
            .ledger
            .take()
            .await
            .ok_or_else(|| Error::InvalidState("no pending authorization to match against".into()))?;

        if pending.state != state {
            // Anti-CSRF check. Security-relevant: the callback does not
            // belong to the attempt this client issued.
            error!(
                expected = %pending.state,
                received = %state,
                "state mismatch in OAuth callback, rejecting"
            );
            return Err(Error::InvalidState("state mismatch".into()));
        }

        self.exchange_code_for_token(&code, &pending.code_verifier)
            .await
    }

    /// Exchange an authorization code for tokens and store the result.
    pub async fn exchange_code_for_token(&self, code: &str, verifier: &str) -> Result<TokenSet> {
        let config = &self.inner.config;
        let response = token::exchange_code(
            &self.inner.http,
            &config.token_url(),
            code,
            verifier,
            &config.redirect_uri,
            &config.client_id,
            config.client_secret.expose(),
        )
        .await?;
        info!("authorization code exchanged");
        Ok(self.store_tokens(response).await)
    }

    /// Refresh the access token using the stored refresh token.
    ///
    /// On failure the previous token set is left untouched; whether a
    /// failed refresh should log the user out is the caller's decision.
    pub async fn refresh_access_token(&self) -> Result<TokenSet> {
        let refresh_token = self
            .inner
            .store
            .get()
            .await
            .and_then(|t| t.refresh_token)
            .ok_or(Error::NoRefreshToken)?;

        let config = &self.inner.config;
        let response = token::refresh(
            &self.inner.http,
            &config.token_url(),
            &refresh_token,
            &config.client_id,
            config.client_secret.expose(),
        )
        .await?;
        info!("access token refreshed");
        Ok(self.store_tokens(response).await)
    }

    /// Return a valid access token, refreshing first when the stored one is
    /// within the refresh buffer of expiry.
    ///
    /// At most one refresh per call: if the refreshed token is itself
    /// already stale, the refresh returned stale data and that propagates
    /// as an error instead of looping.
    pub async fn access_token(&self) -> Result<String> {
        let tokens = self.inner.store.get().await.ok_or(Error::NotAuthenticated)?;
        let buffer = self.inner.config.refresh_buffer_millis();
        if !tokens.is_stale(buffer, now_millis()) {
            return Ok(tokens.access_token);
        }

        debug!("access token stale, refreshing before use");
        let refreshed = self.refresh_access_token().await?;
        if refreshed.is_stale(buffer, now_millis()) {
            return Err(Error::TokenExchangeFailed {
                status: None,
                code: "stale_token".into(),
                message: "refresh returned an already-stale token".into(),
            });
        }
        Ok(refreshed.access_token)
    }

    /// Pure predicate: a token set is stored and unexpired. Triggers no
    /// refresh and no network I/O.
    pub async fn is_authenticated(&self) -> bool {
        match self.inner.store.get().await {
            Some(tokens) => tokens.is_current(now_millis()),
            None => false,
        }
    }

    /// Snapshot of the stored token set, if any.
    pub async fn tokens(&self) -> Option<TokenSet> {
        self.inner.store.get().await
    }

    /// Fetch the user's profile from the userinfo endpoint.
    pub async fn user_info(&self) -> Result<serde_json::Value> {
        let tokens = self.inner.store.get().await.ok_or(Error::NotAuthenticated)?;
        let response = self
            .inner
            .http
            .get(self.inner.config.userinfo_url())
            .bearer_auth(&tokens.access_token)
            .send()
            .await
            .map_err(|e| Error::Http(format!("userinfo request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UserInfoFailed {
                status: status.as_u16(),
            });
        }
        response
            .json()
            .await
            .map_err(|e| Error::Http(format!("invalid userinfo response: {e}")))
    }

    /// Best-effort server-side revocation followed by an unconditional
    /// local logout. A no-op when not authenticated.
    pub async fn revoke_tokens(&self) -> Result<()> {
        let Some(tokens) = self.inner.store.get().await else {
            return Ok(());
        };

        let result = self
            .inner
            .http
            .post(self.inner.config.revoke_url())
            .bearer_auth(&tokens.access_token)
            .json(&serde_json::json!({ "client_id": self.inner.config.client_id }))
            .send()
            .await;
        match result {
            Ok(response) if !response.status().is_success() => {
                warn!(status = response.status().as_u16(), "revoke endpoint returned an error");
            }
            Err(e) => warn!(error = %e, "revoke request failed"),
            Ok(_) => debug!("tokens revoked server-side"),
        }

        // Local state is cleared regardless of the revoke outcome.
        self.logout().await;
        Ok(())
    }

    /// Clear stored tokens, cancel any armed refresh timer, and drop any
    /// lingering pending authorization. Idempotent, always succeeds.
    pub async fn logout(&self) {
        self.inner.store.clear().await;
        if let Some(handle) = self.inner.refresh_task.lock().await.take() {
            handle.abort();
        }
        self.inner.ledger.clear().await;
        info!("logged out");
    }

    /// Store a token response and arm the refresh timer when applicable.
    async fn store_tokens(&self, response: TokenResponse) -> TokenSet {
        // expires_in is server-supplied; saturate instead of trusting it
        // to stay within u64 millisecond range
        let tokens = TokenSet {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: now_millis().saturating_add(response.expires_in.saturating_mul(1000)),
        };
        self.inner.store.set(&tokens).await;

        if self.inner.config.auto_refresh && tokens.refresh_token.is_some() {
            self.arm_refresh_timer(&tokens).await;
        }
        tokens
    }

    /// (Re-)arm the proactive refresh timer. Cancels any previous timer; a
    /// token already within the buffer of expiry arms nothing and the next
    /// `access_token` call refreshes reactively instead.
    async fn arm_refresh_timer(&self, tokens: &TokenSet) {
        let fire_in = tokens
            .expires_at
            .saturating_sub(now_millis())
            .saturating_sub(self.inner.config.refresh_buffer_millis());

        let mut slot = self.inner.refresh_task.lock().await;
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        if fire_in == 0 {
            debug!("expiry imminent, not arming refresh timer");
            return;
        }
        *slot = Some(refresh::spawn_refresh_task(
            self.clone(),
            Duration::from_millis(fire_in),
        ));
    }
}
