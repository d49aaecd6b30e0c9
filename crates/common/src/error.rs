//! Shared error type for configuration loading

use thiserror::Error;

/// Errors from configuration loading and local I/O.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using the shared Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = Error::Config("scopes must not be empty".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: scopes must not be empty"
        );

        let io = Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        assert!(io.to_string().starts_with("I/O error:"), "got: {io}");
    }

    #[test]
    fn debug_names_the_variant() {
        let err = Error::Config("bad storage kind".into());
        let debug = format!("{err:?}");
        assert!(debug.contains("Config"), "got: {debug}");
    }
}
