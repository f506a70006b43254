//! Gmail API type definitions
//!
//! These types mirror the Gmail API responses and are used for
//! serialization/deserialization.

use serde::{Deserialize, Serialize};

/// A Gmail message part (MIME part)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    /// MIME type of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Headers for this part
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,

    /// Nested parts (for multipart messages)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

/// Header in a message part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Header name
    pub name: String,

    /// Header value
    pub value: String,
}

/// A Gmail message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message ID
    pub id: String,

    /// Thread ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Label IDs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,

    /// Snippet (preview text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    /// Message payload (MIME structure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,

    /// Internal date (epoch millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_date: Option<String>,
}

/// Gmail draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    /// Draft ID
    pub id: String,

    /// The message
    pub message: Message,
}

/// Request to send or create a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Raw RFC822 message (base64url encoded)
    pub raw: String,

    /// Thread ID (for replies)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Request to create a draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDraftRequest {
    /// The message
    pub message: SendMessageRequest,
}

/// The authenticated user's mailbox profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// The account's email address
    pub email_address: String,

    /// Total number of messages in the mailbox
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages_total: Option<i64>,

    /// Total number of threads in the mailbox
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads_total: Option<i64>,

    /// The mailbox's current history ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_deserialize() {
        let json = r#"{"id":"123","threadId":"456","labelIds":["SENT"]}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, "123");
        assert_eq!(msg.thread_id, Some("456".to_string()));
        assert_eq!(msg.label_ids, vec!["SENT".to_string()]);
    }

    #[test]
    fn test_profile_deserialize() {
        let json = r#"{"emailAddress":"user@example.com","messagesTotal":42,"historyId":"99"}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.email_address, "user@example.com");
        assert_eq!(profile.messages_total, Some(42));
    }

    #[test]
    fn test_send_request_serialize() {
        let request = SendMessageRequest {
            raw: "ZW5jb2RlZA".to_string(),
            thread_id: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"raw\""));
        assert!(!json.contains("threadId"));
    }
}
