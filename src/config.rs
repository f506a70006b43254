//! Configuration management for the Gmail send MCP server
//!
//! Handles paths, environment variables, OAuth scopes, and send limits.

use std::path::PathBuf;

use crate::error::{ConfigError, GmailSendError, Result};
use crate::ratelimit::SendLimits;

/// Default send caps applied when the environment does not override them
pub const DEFAULT_MAX_SENDS_PER_HOUR: u32 = 10;
pub const DEFAULT_MAX_SENDS_PER_DAY: u32 = 50;

/// Configuration for the Gmail send MCP server
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for storing configuration files
    pub config_dir: PathBuf,

    /// Path to OAuth keys file (client credentials)
    pub oauth_path: PathBuf,

    /// Path to stored credentials (access/refresh tokens)
    pub credentials_path: PathBuf,

    /// OAuth callback URL
    pub oauth_callback_url: String,

    /// OAuth callback port
    pub oauth_callback_port: u16,

    /// Gmail API scopes
    pub scopes: Vec<String>,

    /// Hard caps on outgoing sends, immutable for the process lifetime
    pub send_limits: SendLimits,
}

impl Config {
    /// Create a new configuration with default paths
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;

        let oauth_path = std::env::var("GMAIL_OAUTH_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir.join("gcp-oauth.keys.json"));

        let credentials_path = std::env::var("GMAIL_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir.join("credentials.json"));

        let oauth_callback_port = std::env::var("GMAIL_OAUTH_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let oauth_callback_url = format!("http://localhost:{}/oauth2callback", oauth_callback_port);

        let send_limits = Self::load_send_limits()?;

        Ok(Self {
            config_dir,
            oauth_path,
            credentials_path,
            oauth_callback_url,
            oauth_callback_port,
            scopes: vec![
                "https://www.googleapis.com/auth/gmail.send".to_string(),
                "https://www.googleapis.com/auth/gmail.readonly".to_string(),
            ],
            send_limits,
        })
    }

    /// Load the send limits from the environment, rejecting non-positive or
    /// unparseable values. The rate limiter trusts these numbers, so bad
    /// input must be caught here, before a limiter is constructed.
    fn load_send_limits() -> Result<SendLimits> {
        let max_per_hour =
            Self::parse_limit("GMAIL_MAX_SENDS_PER_HOUR", DEFAULT_MAX_SENDS_PER_HOUR)?;
        let max_per_day = Self::parse_limit("GMAIL_MAX_SENDS_PER_DAY", DEFAULT_MAX_SENDS_PER_DAY)?;

        Ok(SendLimits {
            max_per_hour,
            max_per_day,
        })
    }

    fn parse_limit(var: &str, default: u32) -> Result<u32> {
        match std::env::var(var) {
            Err(_) => Ok(default),
            Ok(raw) => match raw.parse::<u32>() {
                Ok(v) if v > 0 => Ok(v),
                _ => Err(GmailSendError::Config(ConfigError::InvalidConfig {
                    message: format!("{} must be a positive integer, got '{}'", var, raw),
                })),
            },
        }
    }

    /// Get the configuration directory, creating it if necessary
    fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| {
                GmailSendError::Config(ConfigError::DirNotFound {
                    path: "~".to_string(),
                })
            })?
            .join(".gmail-send-mcp");

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|_| {
                GmailSendError::Config(ConfigError::DirCreationFailed {
                    path: config_dir.display().to_string(),
                })
            })?;
        }

        Ok(config_dir)
    }

    /// Check if OAuth keys file exists
    pub fn oauth_keys_exist(&self) -> bool {
        self.oauth_path.exists()
    }

    /// Check if credentials (tokens) exist
    pub fn credentials_exist(&self) -> bool {
        self.credentials_path.exists()
    }

    /// Try to find OAuth keys in current directory and copy to config dir
    pub fn find_and_copy_oauth_keys(&self) -> Result<bool> {
        let local_oauth = std::env::current_dir()
            .map_err(GmailSendError::Io)?
            .join("gcp-oauth.keys.json");

        if local_oauth.exists() && !self.oauth_keys_exist() {
            std::fs::copy(&local_oauth, &self.oauth_path).map_err(GmailSendError::Io)?;
            return Ok(true);
        }

        Ok(false)
    }
}

/// Gmail API constants
pub mod gmail {
    /// Base URL for Gmail API
    pub const API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

    /// User ID for the authenticated user
    pub const USER_ID: &str = "me";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = Config::new();
        assert!(config.is_ok());
    }

    #[test]
    fn test_default_scopes() {
        let config = Config::new().unwrap();
        assert_eq!(config.scopes.len(), 2);
        assert!(config.scopes[0].contains("gmail.send"));
    }

    #[test]
    fn test_default_send_limits() {
        // Env overrides are not set in the test environment
        let limits = Config::load_send_limits().unwrap();
        assert_eq!(limits.max_per_hour, DEFAULT_MAX_SENDS_PER_HOUR);
        assert_eq!(limits.max_per_day, DEFAULT_MAX_SENDS_PER_DAY);
    }

    #[test]
    fn test_parse_limit_rejects_zero() {
        std::env::set_var("GMAIL_TEST_LIMIT_ZERO", "0");
        let result = Config::parse_limit("GMAIL_TEST_LIMIT_ZERO", 10);
        std::env::remove_var("GMAIL_TEST_LIMIT_ZERO");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_limit_rejects_garbage() {
        std::env::set_var("GMAIL_TEST_LIMIT_BAD", "lots");
        let result = Config::parse_limit("GMAIL_TEST_LIMIT_BAD", 10);
        std::env::remove_var("GMAIL_TEST_LIMIT_BAD");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_limit_accepts_override() {
        std::env::set_var("GMAIL_TEST_LIMIT_OK", "25");
        let result = Config::parse_limit("GMAIL_TEST_LIMIT_OK", 10).unwrap();
        std::env::remove_var("GMAIL_TEST_LIMIT_OK");
        assert_eq!(result, 25);
    }
}
