//! Client configuration
//!
//! The orchestrator consumes a fully-resolved configuration object; how it
//! is produced (TOML file, env vars, hardcoded test values) is the caller's
//! concern. Construction-time validation rejects configurations the flow
//! cannot work with.

use common::Secret;

use crate::error::{Error, Result};
use crate::storage::StorageKind;

/// Default scopes requested when the caller does not override them.
pub const DEFAULT_SCOPES: [&str; 2] = ["profile", "email"];

/// Default proactive-refresh margin before token expiry, in seconds.
pub const DEFAULT_REFRESH_BUFFER_SECS: u64 = 300;

/// Immutable OAuth client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// OAuth client identifier.
    pub client_id: String,
    /// OAuth client secret, redacted in logs.
    pub client_secret: Secret<String>,
    /// Redirect URI registered with the authorization server.
    pub redirect_uri: String,
    /// Base URL of the authorization server (hosts `/oauth/authorize`).
    pub base_url: String,
    /// Optional separate API base URL for token/userinfo/revoke endpoints.
    /// Falls back to `base_url` when absent.
    pub api_base_url: Option<String>,
    /// Requested scopes; non-empty, order-preserving.
    pub scopes: Vec<String>,
    /// Token/state persistence backend.
    pub storage: StorageKind,
    /// Arm a proactive refresh timer when a refresh token is stored.
    pub auto_refresh: bool,
    /// Seconds before expiry at which a token counts as stale.
    pub refresh_buffer_secs: u64,
}

impl ClientConfig {
    /// Build a configuration with the default scopes, memory storage,
    /// auto-refresh enabled, and a 300-second refresh buffer. Override
    /// fields directly for anything else.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret.into()),
            redirect_uri: redirect_uri.into(),
            base_url: base_url.into(),
            api_base_url: None,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            storage: StorageKind::Memory,
            auto_refresh: true,
            refresh_buffer_secs: DEFAULT_REFRESH_BUFFER_SECS,
        }
    }

    /// Validate invariants the flow depends on.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::Config("client_id must not be empty".into()));
        }
        if self.scopes.is_empty() {
            return Err(Error::Config("scopes must not be empty".into()));
        }
        for base in std::iter::once(&self.base_url).chain(self.api_base_url.iter()) {
            if !base.starts_with("http://") && !base.starts_with("https://") {
                return Err(Error::Config(format!(
                    "base URL must start with http:// or https://, got: {base}"
                )));
            }
        }
        Ok(())
    }

    /// Base URL for the token, userinfo, and revoke endpoints.
    pub fn api_base(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(&self.base_url)
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/oauth/authorize", self.base_url)
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.api_base())
    }

    pub fn userinfo_url(&self) -> String {
        format!("{}/oauth/userinfo", self.api_base())
    }

    pub fn revoke_url(&self) -> String {
        format!("{}/oauth/revoke", self.api_base())
    }

    /// Refresh buffer in milliseconds, matching token expiry arithmetic.
    /// Saturates so an absurd caller-supplied buffer cannot overflow.
    pub fn refresh_buffer_millis(&self) -> u64 {
        self.refresh_buffer_secs.saturating_mul(1000)
    }
}
