//! Client-side OAuth 2.0 Authorization Code flow with PKCE
//!
//! Implements the token lifecycle for applications that authenticate a
//! user against a remote authorization server without trusting the
//! environment with a long-lived secret: PKCE generation, the
//! authorization-redirect / callback-exchange protocol with an anti-CSRF
//! state check, pluggable token persistence, and a self-scheduling refresh
//! timer that keeps a valid access token available.
//!
//! Flow:
//! 1. `OAuthClient::authorization_url()` generates state + PKCE material,
//!    records the pending attempt, and returns the redirect URL
//! 2. The authorization server redirects back; `handle_callback()`
//!    validates `state` against the stored attempt (read-once) and
//!    exchanges the code using the stored verifier
//! 3. Tokens are persisted via the configured `TokenStore`; a refresh
//!    timer is armed when a refresh token is present
//! 4. `access_token()` returns a fresh token, refreshing reactively when
//!    the stored one is within the refresh buffer of expiry
//! 5. `logout()` / `revoke_tokens()` tear everything down

pub mod client;
pub mod config;
pub mod error;
pub mod pkce;
mod refresh;
pub mod state;
pub mod storage;
pub mod token;

pub use client::OAuthClient;
pub use config::{ClientConfig, DEFAULT_REFRESH_BUFFER_SECS, DEFAULT_SCOPES};
pub use error::{Error, Result};
pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state};
pub use state::{PendingAuth, StateLedger};
pub use storage::{StorageKind, TokenSet, TokenStore};
pub use token::TokenResponse;
