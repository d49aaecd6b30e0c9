//! Shared types for the OAuth client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
