//! Configuration loading
//!
//! Resolves a `ClientConfig` from a TOML file plus environment. The client
//! secret never lives in the TOML: it comes from the OAUTH_CLIENT_SECRET
//! env var or, failing that, a `client_secret_file` path named in the
//! config.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use common::{Error, Result};
use oauth_client::{ClientConfig, StorageKind};

#[derive(Debug, Deserialize)]
struct FileConfig {
    client_id: String,
    redirect_uri: String,
    base_url: String,
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    scopes: Option<Vec<String>>,
    /// "memory" (default), "file", or "session"
    #[serde(default)]
    storage: Option<String>,
    /// Required when storage = "file"
    #[serde(default)]
    storage_dir: Option<PathBuf>,
    #[serde(default)]
    auto_refresh: Option<bool>,
    #[serde(default)]
    refresh_buffer_secs: Option<u64>,
    /// Path to a file containing the client secret (alternative to the
    /// OAUTH_CLIENT_SECRET env var)
    #[serde(default)]
    client_secret_file: Option<PathBuf>,
}

/// Load and validate a client configuration.
///
/// Secret resolution order:
/// 1. OAUTH_CLIENT_SECRET env var
/// 2. `client_secret_file` path from the config
pub fn load(path: &Path) -> Result<ClientConfig> {
    let contents = std::fs::read_to_string(path)?;
    let file: FileConfig = toml::from_str(&contents)?;

    let secret = resolve_secret(&file)?;

    let storage = match file.storage.as_deref().unwrap_or("memory") {
        "memory" => StorageKind::Memory,
        "session" => StorageKind::Session,
        "file" => {
            let dir = file.storage_dir.ok_or_else(|| {
                Error::Config("storage = \"file\" requires storage_dir".into())
            })?;
            StorageKind::File(dir)
        }
        other => {
            return Err(Error::Config(format!(
                "unknown storage kind: {other} (expected memory, file, or session)"
            )));
        }
    };

    let mut config = ClientConfig::new(file.client_id, secret, file.redirect_uri, file.base_url);
    config.api_base_url = file.api_base_url;
    config.storage = storage;
    if let Some(scopes) = file.scopes {
        config.scopes = scopes;
    }
    if let Some(auto_refresh) = file.auto_refresh {
        config.auto_refresh = auto_refresh;
    }
    if let Some(buffer) = file.refresh_buffer_secs {
        config.refresh_buffer_secs = buffer;
    }

    config
        .validate()
        .map_err(|e| Error::Config(e.to_string()))?;
    Ok(config)
}

fn resolve_secret(file: &FileConfig) -> Result<String> {
    if let Ok(secret) = std::env::var("OAUTH_CLIENT_SECRET")
        && !secret.is_empty()
    {
        return Ok(secret);
    }
    if let Some(ref secret_file) = file.client_secret_file {
        let secret = std::fs::read_to_string(secret_file).map_err(|e| {
            Error::Config(format!(
                "failed to read client_secret_file {}: {e}",
                secret_file.display()
            ))
        })?;
        let secret = secret.trim().to_owned();
        if !secret.is_empty() {
            return Ok(secret);
        }
    }
    Err(Error::Config(
        "client secret not provided (set OAUTH_CLIENT_SECRET or client_secret_file)".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that mutate environment variables, preventing data
    /// races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
client_id = "client-1"
redirect_uri = "https://app.example.com/callback"
base_url = "https://auth.example.com"
api_base_url = "https://api.example.com"
scopes = ["profile", "email", "offline_access"]
refresh_buffer_secs = 120
"#
    }

    #[test]
    fn loads_with_secret_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oauth.toml");
        std::fs::write(&path, valid_toml()).unwrap();

        unsafe { set_env("OAUTH_CLIENT_SECRET", "cs_from_env") };
        let config = load(&path).unwrap();
        unsafe { remove_env("OAUTH_CLIENT_SECRET") };

        assert_eq!(config.client_id, "client-1");
        assert_eq!(config.client_secret.expose(), "cs_from_env");
        assert_eq!(config.api_base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.scopes.len(), 3);
        assert_eq!(config.refresh_buffer_secs, 120);
        assert!(config.auto_refresh, "defaults apply when omitted");
        assert!(matches!(config.storage, StorageKind::Memory));
    }

    #[test]
    fn loads_secret_from_file_when_env_unset() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("secret");
        std::fs::write(&secret_path, "cs_from_file\n").unwrap();

        let toml = format!(
            "{}client_secret_file = {:?}\n",
            valid_toml(),
            secret_path.to_str().unwrap()
        );
        let path = dir.path().join("oauth.toml");
        std::fs::write(&path, toml).unwrap();

        unsafe { remove_env("OAUTH_CLIENT_SECRET") };
        let config = load(&path).unwrap();
        assert_eq!(config.client_secret.expose(), "cs_from_file");
    }

    #[test]
    fn env_secret_wins_over_secret_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("secret");
        std::fs::write(&secret_path, "cs_from_file\n").unwrap();

        let toml = format!(
            "{}client_secret_file = {:?}\n",
            valid_toml(),
            secret_path.to_str().unwrap()
        );
        let path = dir.path().join("oauth.toml");
        std::fs::write(&path, toml).unwrap();

        unsafe { set_env("OAUTH_CLIENT_SECRET", "cs_from_env") };
        let config = load(&path).unwrap();
        unsafe { remove_env("OAUTH_CLIENT_SECRET") };

        assert_eq!(config.client_secret.expose(), "cs_from_env");
    }

    #[test]
    fn missing_secret_is_a_config_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oauth.toml");
        std::fs::write(&path, valid_toml()).unwrap();

        unsafe { remove_env("OAUTH_CLIENT_SECRET") };
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("client secret"), "got: {err}");
    }

    #[test]
    fn file_storage_requires_a_directory() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oauth.toml");
        std::fs::write(&path, format!("{}storage = \"file\"\n", valid_toml())).unwrap();

        unsafe { set_env("OAUTH_CLIENT_SECRET", "cs") };
        let err = load(&path).unwrap_err();
        unsafe { remove_env("OAUTH_CLIENT_SECRET") };
        assert!(err.to_string().contains("storage_dir"), "got: {err}");
    }

    #[test]
    fn unknown_storage_kind_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oauth.toml");
        std::fs::write(&path, format!("{}storage = \"cloud\"\n", valid_toml())).unwrap();

        unsafe { set_env("OAUTH_CLIENT_SECRET", "cs") };
        let err = load(&path).unwrap_err();
        unsafe { remove_env("OAUTH_CLIENT_SECRET") };
        assert!(err.to_string().contains("unknown storage kind"), "got: {err}");
    }

    #[test]
    fn invalid_toml_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oauth.toml");
        std::fs::write(&path, "not valid {{{{ toml").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn missing_file_is_rejected() {
        assert!(load(Path::new("/nonexistent/oauth.toml")).is_err());
    }
}
