//! Collaborator-facing surface for the OAuth client
//!
//! Thin glue between the core token lifecycle and an application shell:
//! an observable `Session` (authenticated / loading / user / error as
//! watch channels), route gating on authentication state, and TOML + env
//! configuration loading that produces the fully-resolved `ClientConfig`
//! the core consumes.

pub mod config;
pub mod routes;
pub mod session;

pub use config::load;
pub use routes::{Route, resolve};
pub use session::Session;
