//! Session configuration
//!
//! Every value can be overridden from the environment; otherwise a platform
//! default is used.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const ENV_API_URL: &str = "CHATAUTH_API_URL";
pub const ENV_TOKEN_PATH: &str = "CHATAUTH_TOKEN_PATH";
pub const ENV_TIMEOUT_SECS: &str = "CHATAUTH_TIMEOUT_SECS";
pub const ENV_LOGOUT_ON_401: &str = "CHATAUTH_LOGOUT_ON_401";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Endpoint paths, relative to the API base URL
pub mod endpoints {
    pub const TOKEN: &str = "/api/token";
    pub const REGISTER: &str = "/api/register";
    pub const CURRENT_USER: &str = "/api/users/me";
}

/// Where a setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Env,
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Env => write!(f, "env"),
            ConfigSource::Default => write!(f, "default"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub api_url: String,
    pub token_path: PathBuf,
    /// `None` waits for the server indefinitely
    pub timeout: Option<Duration>,
    /// Demote the session when `/api/users/me` answers 401
    pub logout_on_unauthorized: bool,
}

impl SessionConfig {
    /// Load from `CHATAUTH_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let api_url = match std::env::var(ENV_API_URL) {
            Ok(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => DEFAULT_API_URL.to_string(),
        };

        let timeout = match std::env::var(ENV_TIMEOUT_SECS) {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_timeout(&raw)?),
            _ => None,
        };

        let logout_on_unauthorized = match std::env::var(ENV_LOGOUT_ON_401) {
            Ok(raw) => parse_flag(&raw)?,
            Err(_) => false,
        };

        Ok(Self {
            api_url,
            token_path: get_token_path()?,
            timeout,
            logout_on_unauthorized,
        })
    }

    pub fn source_of(var: &str) -> ConfigSource {
        if std::env::var(var).is_ok() {
            ConfigSource::Env
        } else {
            ConfigSource::Default
        }
    }
}

/// Get the token store path (env override, then platform data dir)
pub fn get_token_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(ENV_TOKEN_PATH) {
        if !path.trim().is_empty() {
            let expanded = shellexpand::full(path.trim())
                .map_err(|e| Error::config(format!("{}: {}", ENV_TOKEN_PATH, e)))?;
            return Ok(PathBuf::from(expanded.as_ref()));
        }
    }

    let dirs = directories::ProjectDirs::from("com", "chatauth", "ChatAuth")
        .ok_or_else(|| Error::config("Could not determine project directories"))?;

    Ok(dirs.data_dir().join("storage.json"))
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS)))?;
    if secs == 0 {
        return Err(Error::config(format!("{} must be greater than zero", ENV_TIMEOUT_SECS)));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config(format!(
            "{} must be true or false, got '{}'",
            ENV_LOGOUT_ON_401, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [ENV_API_URL, ENV_TOKEN_PATH, ENV_TIMEOUT_SECS, ENV_LOGOUT_ON_401] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = SessionConfig::from_env().unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.token_path.to_string_lossy().contains("storage.json"));
        assert!(config.timeout.is_none());
        assert!(!config.logout_on_unauthorized);
        assert_eq!(SessionConfig::source_of(ENV_API_URL), ConfigSource::Default);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var(ENV_API_URL, "https://chat.example.com");
        std::env::set_var(ENV_TOKEN_PATH, "/tmp/chatauth-test/storage.json");
        std::env::set_var(ENV_TIMEOUT_SECS, "15");
        std::env::set_var(ENV_LOGOUT_ON_401, "yes");

        let config = SessionConfig::from_env().unwrap();
        assert_eq!(config.api_url, "https://chat.example.com");
        assert_eq!(config.token_path, PathBuf::from("/tmp/chatauth-test/storage.json"));
        assert_eq!(config.timeout, Some(Duration::from_secs(15)));
        assert!(config.logout_on_unauthorized);
        assert_eq!(SessionConfig::source_of(ENV_API_URL), ConfigSource::Env);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_timeout() {
        clear_env();
        std::env::set_var(ENV_TIMEOUT_SECS, "soon");
        assert!(matches!(SessionConfig::from_env(), Err(Error::Config(_))));
        std::env::set_var(ENV_TIMEOUT_SECS, "0");
        assert!(matches!(SessionConfig::from_env(), Err(Error::Config(_))));
        clear_env();
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag("1").unwrap());
        assert!(!parse_flag("off").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
