//! Gmail API client
//!
//! High-level client for the handful of Gmail operations this server needs:
//! sending, drafting, fetching a message's delivery state, and reading the
//! account profile.

use std::sync::Arc;

use crate::config::gmail::{API_BASE_URL, USER_ID};
use crate::error::{GmailApiError, GmailSendError, Result};
use crate::gmail::auth::Authenticator;
use crate::gmail::types::{CreateDraftRequest, Draft, Message, Profile, SendMessageRequest};
use crate::gmail::utils::{create_email_message, encode_raw_message, find_header, EmailParams};

/// Gmail API client
pub struct GmailClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth authenticator
    authenticator: Arc<Authenticator>,
}

impl GmailClient {
    /// Create a new Gmail client
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            authenticator,
        }
    }

    async fn access_token(&self) -> Result<String> {
        self.authenticator.get_access_token().await
    }

    fn messages_url() -> String {
        format!("{}/users/{}/messages", API_BASE_URL, USER_ID)
    }

    /// Send an email
    pub async fn send_email(&self, params: EmailParams) -> Result<Message> {
        let token = self.access_token().await?;

        let raw_message = create_email_message(&params)?;
        let request = SendMessageRequest {
            raw: encode_raw_message(&raw_message),
            thread_id: params.thread_id,
        };

        let url = format!("{}/send", Self::messages_url());
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::request_failed("send email", response).await)
        }
    }

    /// Create a draft without sending it
    pub async fn create_draft(&self, params: EmailParams) -> Result<Draft> {
        let token = self.access_token().await?;

        let raw_message = create_email_message(&params)?;
        let request = CreateDraftRequest {
            message: SendMessageRequest {
                raw: encode_raw_message(&raw_message),
                thread_id: params.thread_id,
            },
        };

        let url = format!("{}/users/{}/drafts", API_BASE_URL, USER_ID);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::request_failed("create draft", response).await)
        }
    }

    /// Fetch a message's metadata (labels, headers, date) by ID
    pub async fn get_message(&self, message_id: &str) -> Result<Message> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/{}?format=metadata&metadataHeaders=Subject&metadataHeaders=To&metadataHeaders=Date",
            Self::messages_url(),
            message_id
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else if response.status().as_u16() == 404 {
            Err(GmailSendError::Gmail(GmailApiError::MessageNotFound {
                message_id: message_id.to_string(),
            }))
        } else {
            Err(Self::request_failed("get message", response).await)
        }
    }

    /// Summarize the delivery state of a sent message
    pub async fn send_status(&self, message_id: &str) -> Result<SendStatusResult> {
        let message = self.get_message(message_id).await?;

        let payload = message.payload.as_ref();
        let subject = payload
            .and_then(|p| find_header(p, "subject"))
            .unwrap_or("")
            .to_string();
        let to = payload
            .and_then(|p| find_header(p, "to"))
            .unwrap_or("")
            .to_string();
        let date = payload
            .and_then(|p| find_header(p, "date"))
            .unwrap_or("")
            .to_string();

        Ok(SendStatusResult {
            id: message.id,
            thread_id: message.thread_id.unwrap_or_default(),
            label_ids: message.label_ids,
            subject,
            to,
            date,
        })
    }

    /// Fetch the authenticated account's profile. Cheapest way to prove the
    /// OAuth credentials and API connection work end to end.
    pub async fn get_profile(&self) -> Result<Profile> {
        let token = self.access_token().await?;
        let url = format!("{}/users/{}/profile", API_BASE_URL, USER_ID);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::request_failed("get profile", response).await)
        }
    }

    async fn request_failed(operation: &str, response: reqwest::Response) -> GmailSendError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        GmailSendError::Gmail(GmailApiError::RequestFailed {
            message: format!("Failed to {} ({}): {}", operation, status, text),
        })
    }
}

/// Delivery state of a sent message
#[derive(Debug, Clone)]
pub struct SendStatusResult {
    pub id: String,
    pub thread_id: String,
    pub label_ids: Vec<String>,
    pub subject: String,
    pub to: String,
    pub date: String,
}
