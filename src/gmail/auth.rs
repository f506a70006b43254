//! OAuth authentication for the Gmail API
//!
//! Delegated-credential plumbing: loads client keys, runs the interactive
//! browser flow against a local callback server, and keeps the access token
//! fresh for the client.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::{AuthError, GmailSendError, Result};

/// OAuth client credentials
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthKeys {
    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Auth URI
    pub auth_uri: String,

    /// Token URI
    pub token_uri: String,
}

/// OAuth keys file format (can be "installed" or "web")
#[derive(Debug, Deserialize)]
struct OAuthKeysFile {
    #[serde(alias = "web")]
    installed: Option<OAuthKeys>,
}

/// Stored credentials (tokens)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// Access token
    pub access_token: String,

    /// Refresh token
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiry timestamp (Unix seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    /// Scopes
    #[serde(default)]
    pub scope: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Token response from the OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: String,
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// OAuth authenticator
pub struct Authenticator {
    /// Configuration
    config: Config,

    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth client credentials
    keys: OAuthKeys,

    /// Current credentials (tokens)
    credentials: Arc<RwLock<Option<StoredCredentials>>>,
}

impl Authenticator {
    /// Create a new authenticator
    pub async fn new(config: Config) -> Result<Self> {
        // Pick up keys dropped in the working directory, if any
        config.find_and_copy_oauth_keys()?;

        let keys = Self::load_oauth_keys(&config.oauth_path)?;

        let auth = Self {
            config,
            http_client: reqwest::Client::new(),
            keys,
            credentials: Arc::new(RwLock::new(None)),
        };

        if auth.config.credentials_exist() {
            if let Ok(creds) = auth.load_credentials().await {
                *auth.credentials.write().await = Some(creds);
            }
        }

        Ok(auth)
    }

    /// Load OAuth keys from file
    fn load_oauth_keys(path: &Path) -> Result<OAuthKeys> {
        if !path.exists() {
            return Err(GmailSendError::Auth(AuthError::KeysFileNotFound {
                path: path.display().to_string(),
            }));
        }

        let content = std::fs::read_to_string(path)?;
        let keys_file: OAuthKeysFile = serde_json::from_str(&content)?;

        keys_file
            .installed
            .ok_or(GmailSendError::Auth(AuthError::InvalidKeysFormat))
    }

    async fn load_credentials(&self) -> Result<StoredCredentials> {
        let content = tokio::fs::read_to_string(&self.config.credentials_path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save_credentials(&self, credentials: &StoredCredentials) -> Result<()> {
        let content = serde_json::to_string_pretty(credentials)?;
        tokio::fs::write(&self.config.credentials_path, content).await?;
        Ok(())
    }

    /// Check if we have stored credentials
    pub async fn is_authenticated(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    /// Get a valid access token, refreshing when expiry is near.
    ///
    /// The read guard must be released before refreshing: refresh_token
    /// takes the write lock.
    pub async fn get_access_token(&self) -> Result<String> {
        let current = {
            let creds = self.credentials.read().await;
            creds.as_ref().map(|c| {
                // Refresh when within 5 minutes of expiry
                let expiring = c.expiry_date.is_some_and(|e| e - unix_now() < 300);
                (c.access_token.clone(), expiring)
            })
        };

        match current {
            Some((_, true)) => self.refresh_token().await,
            Some((token, false)) => Ok(token),
            None => Err(GmailSendError::Auth(AuthError::CredentialsNotFound {
                path: self.config.credentials_path.display().to_string(),
            })),
        }
    }

    /// Refresh the access token using the stored refresh token
    async fn refresh_token(&self) -> Result<String> {
        let refresh_token = self
            .credentials
            .read()
            .await
            .as_ref()
            .and_then(|c| c.refresh_token.clone())
            .ok_or_else(|| {
                GmailSendError::Auth(AuthError::TokenRefreshFailed {
                    message: "No refresh token available".to_string(),
                })
            })?;

        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GmailSendError::Auth(AuthError::TokenRefreshFailed {
                message: text,
            }));
        }

        let token_response: TokenResponse = response.json().await?;
        let now = unix_now();

        let new_credentials = StoredCredentials {
            access_token: token_response.access_token.clone(),
            refresh_token: token_response.refresh_token.or(Some(refresh_token)),
            token_type: token_response.token_type,
            expiry_date: token_response.expires_in.map(|e| now + e),
            scope: token_response.scope,
        };

        self.save_credentials(&new_credentials).await?;
        *self.credentials.write().await = Some(new_credentials.clone());

        tracing::debug!("Refreshed Gmail access token");
        Ok(new_credentials.access_token)
    }

    /// Generate the authorization URL for the interactive flow
    pub fn generate_auth_url(&self) -> String {
        let scopes = self.config.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.keys.auth_uri,
            urlencoding::encode(&self.keys.client_id),
            urlencoding::encode(&self.config.oauth_callback_url),
            urlencoding::encode(&scopes)
        )
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<StoredCredentials> {
        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.oauth_callback_url.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GmailSendError::Auth(AuthError::TokenExchangeFailed {
                message: text,
            }));
        }

        let token_response: TokenResponse = response.json().await?;
        let now = unix_now();

        let credentials = StoredCredentials {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            token_type: token_response.token_type,
            expiry_date: token_response.expires_in.map(|e| now + e),
            scope: token_response.scope,
        };

        self.save_credentials(&credentials).await?;
        *self.credentials.write().await = Some(credentials.clone());

        Ok(credentials)
    }

    /// Run the interactive authentication flow with a local HTTP server
    pub async fn authenticate_interactive(&self) -> Result<()> {
        use axum::{extract::Query, response::Html, routing::get, Router};
        use std::collections::HashMap;
        use tokio::sync::oneshot;

        let auth_url = self.generate_auth_url();
        eprintln!("\nPlease visit this URL to authenticate:");
        eprintln!("{}\n", auth_url);

        if let Err(e) = open::that(&auth_url) {
            eprintln!("Could not open browser automatically: {}", e);
            eprintln!("Please open the URL manually.");
        }

        let (tx, rx) = oneshot::channel::<String>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let tx_clone = tx.clone();
        let callback_handler = move |Query(params): Query<HashMap<String, String>>| async move {
            if let Some(code) = params.get("code") {
                if let Some(tx) = tx_clone.lock().unwrap().take() {
                    let _ = tx.send(code.clone());
                }
                Html("<html><body><h1>Authentication successful!</h1><p>You can close this window.</p></body></html>")
            } else {
                Html("<html><body><h1>Authentication failed</h1><p>No authorization code received.</p></body></html>")
            }
        };

        let app = Router::new().route("/oauth2callback", get(callback_handler));

        let addr = std::net::SocketAddr::from(([127, 0, 0, 1], self.config.oauth_callback_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        eprintln!(
            "Waiting for authentication callback on port {}...",
            self.config.oauth_callback_port
        );

        let server = axum::serve(listener, app);

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    return Err(GmailSendError::Auth(AuthError::CallbackError {
                        message: e.to_string(),
                    }));
                }
            }
            code = rx => {
                match code {
                    Ok(code) => {
                        eprintln!("Received authorization code, exchanging for tokens...");
                        self.exchange_code(&code).await?;
                    }
                    Err(_) => {
                        return Err(GmailSendError::Auth(AuthError::NoAuthCode));
                    }
                }
            }
        }

        Ok(())
    }
}
