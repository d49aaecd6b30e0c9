//! Route gating on authentication state
//!
//! Two screens exist: an unauthenticated landing page and an authenticated
//! dashboard. The router consults the session's authenticated flag and
//! resolves every path to one of them; `/callback` always lands on the
//! landing page once callback handling has completed, which then forwards
//! an authenticated user to the dashboard on the next resolution.

/// The two user-facing screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    Dashboard,
}

/// Resolve a request path against the current authentication state.
pub fn resolve(path: &str, authenticated: bool) -> Route {
    match path {
        "/callback" => Route::Landing,
        "/dashboard" if !authenticated => Route::Landing,
        "/dashboard" => Route::Dashboard,
        _ if authenticated => Route::Dashboard,
        _ => Route::Landing,
    }
}
