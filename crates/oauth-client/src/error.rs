//! Error taxonomy for the OAuth client
//!
//! Every variant carries a stable machine-readable code (`Error::code`) so
//! callers can branch without matching on display strings. HTTP-originated
//! failures additionally expose the response status via `Error::status`.

/// Errors from OAuth client operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied parameter violated a protocol bound
    /// (e.g. a PKCE verifier length outside 43..=128).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The authorization server returned `error` in the callback.
    #[error("authorization denied ({code}): {description}")]
    AuthorizationDenied { code: String, description: String },

    /// No `code` parameter in the callback URL.
    #[error("no authorization code found in callback")]
    MissingCode,

    /// No `state` parameter in the callback URL.
    #[error("no state parameter found in callback")]
    MissingState,

    /// Anti-CSRF state validation failed: either no authorization attempt
    /// is pending, or the callback state does not match the stored one.
    /// Never recovered silently.
    #[error("invalid state parameter: {0}")]
    InvalidState(String),

    /// A refresh was requested but the stored token set has no refresh token.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// An operation requiring a stored token set found none.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The userinfo endpoint returned a non-2xx status.
    #[error("failed to fetch user info (status {status})")]
    UserInfoFailed { status: u16 },

    /// The token endpoint rejected an exchange or refresh. `status` is
    /// `None` when the failure did not originate from an HTTP response.
    #[error("token request failed ({code}): {message}")]
    TokenExchangeFailed {
        status: Option<u16>,
        code: String,
        message: String,
    },

    /// Client construction rejected the supplied configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure before an HTTP status was available.
    #[error("HTTP request failed: {0}")]
    Http(String),
}

impl Error {
    /// Stable machine-readable code for this error.
    ///
    /// For `AuthorizationDenied` and `TokenExchangeFailed` this is the
    /// server-supplied error code when one was present.
    pub fn code(&self) -> &str {
        match self {
            Error::InvalidParameter(_) => "invalid_parameter",
            Error::AuthorizationDenied { code, .. } => code,
            Error::MissingCode => "missing_code",
            Error::MissingState => "missing_state",
            Error::InvalidState(_) => "invalid_state",
            Error::NoRefreshToken => "no_refresh_token",
            Error::NotAuthenticated => "not_authenticated",
            Error::UserInfoFailed { .. } => "userinfo_failed",
            Error::TokenExchangeFailed { code, .. } => code,
            Error::Config(_) => "config_error",
            Error::Http(_) => "http_error",
        }
    }

    /// HTTP status for errors that originated from an HTTP response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::UserInfoFailed { status } => Some(*status),
            Error::TokenExchangeFailed { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result alias for OAuth client operations.
pub type Result<T> = std::result::Result<T, Error>;
