//! Token endpoint interactions
//!
//! Both grant types POST a form-encoded body to the token endpoint:
//! `authorization_code` completes the initial PKCE flow, `refresh_token`
//! renews an access token. Non-2xx responses carry a JSON `{error, message}`
//! body; parsing is tolerant, falling back to generic values when the body
//! is missing or malformed.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Successful response from the token endpoint for both grant types.
///
/// `expires_in` is a lifetime in seconds relative to the response; the
/// caller converts it to an absolute unix-millisecond expiry at receipt.
/// `refresh_token` is optional — some servers omit it on refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires (delta, not absolute).
    pub expires_in: u64,
}

/// Error body shape of a failed token request. Both fields are optional so
/// a malformed or empty body still maps to a typed error.
#[derive(Debug, Default, Deserialize)]
struct TokenErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Exchange an authorization code for tokens.
///
/// Second step of the PKCE flow: the callback delivered `code`, and the
/// stored `code_verifier` proves this client initiated the attempt.
#[allow(clippy::too_many_arguments)]
pub async fn exchange_code(
    client: &reqwest::Client,
    token_url: &str,
    code: &str,
    verifier: &str,
    redirect_uri: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<TokenResponse> {
    post_token(
        client,
        token_url,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code_verifier", verifier),
        ],
    )
    .await
}

/// Refresh an access token using a refresh token.
pub async fn refresh(
    client: &reqwest::Client,
    token_url: &str,
    refresh_token: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<TokenResponse> {
    post_token(
        client,
        token_url,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ],
    )
    .await
}

async fn post_token(
    client: &reqwest::Client,
    token_url: &str,
    params: &[(&str, &str)],
) -> Result<TokenResponse> {
    let response = client
        .post(token_url)
        .form(params)
        .send()
        .await
        .map_err(|e| Error::Http(format!("token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body: TokenErrorBody = response.json().await.unwrap_or_default();
        return Err(Error::TokenExchangeFailed {
            status: Some(status.as_u16()),
            code: body.error.unwrap_or_else(|| "token_error".into()),
            message: body.message.unwrap_or_else(|| "Token request failed".into()),
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchangeFailed {
            status: Some(status.as_u16()),
            code: "invalid_response".into(),
            message: format!("invalid token response: {e}"),
        })
}
