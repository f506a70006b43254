//! MCP Tool definitions and handlers
//!
//! Defines the send-focused tool surface and wires every send through the
//! rate limiter. The limiter lives behind a mutex that is held across each
//! check-send-record sequence, so concurrent tool calls cannot both claim
//! the last remaining slot.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::gmail::client::GmailClient;
use crate::gmail::utils::{EmailParams, MimeType};
use crate::mcp::types::{CallToolResult, Tool};
use crate::ratelimit::{RateLimiter, UsageSnapshot};

/// Tool handler
pub struct ToolHandler {
    gmail_client: Arc<GmailClient>,
    limiter: Arc<Mutex<RateLimiter>>,
}

/// Arguments shared by the single-send, draft, and bulk tools
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmailArgs {
    to: Vec<String>,
    subject: String,
    body: String,
    html_body: Option<String>,
    mime_type: Option<String>,
    cc: Option<Vec<String>>,
    bcc: Option<Vec<String>>,
    thread_id: Option<String>,
    in_reply_to: Option<String>,
}

impl EmailArgs {
    fn into_params(self) -> EmailParams {
        let mime_type = match self.mime_type.as_deref() {
            Some("text/html") => Some(MimeType::TextHtml),
            Some("multipart/alternative") => Some(MimeType::MultipartAlternative),
            _ => None,
        };

        EmailParams {
            to: self.to,
            subject: self.subject,
            body: self.body,
            html_body: self.html_body,
            mime_type,
            cc: self.cc,
            bcc: self.bcc,
            thread_id: self.thread_id,
            in_reply_to: self.in_reply_to,
        }
    }
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(gmail_client: Arc<GmailClient>, limiter: Arc<Mutex<RateLimiter>>) -> Self {
        Self {
            gmail_client,
            limiter,
        }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def("send_email", "Sends a new email (rate limited)", send_email_schema()),
            tool_def("draft_email", "Composes a new email draft without sending it", send_email_schema()),
            tool_def("bulk_send_emails", "Sends multiple emails, trimmed to current rate-limit capacity and paced with a short delay between sends", bulk_send_schema()),
            tool_def("check_send_status", "Checks the delivery state of a previously sent email", check_send_status_schema()),
            tool_def("verify_connection", "Verifies the Gmail connection and OAuth credentials", empty_schema()),
            tool_def("get_send_stats", "Reports current hourly/daily send usage and remaining capacity", empty_schema()),
        ]
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        match name {
            "send_email" => self.handle_send_email(args).await,
            "draft_email" => self.handle_draft_email(args).await,
            "bulk_send_emails" => self.handle_bulk_send(args).await,
            "check_send_status" => self.handle_check_send_status(args).await,
            "verify_connection" => self.handle_verify_connection().await,
            "get_send_stats" => self.handle_get_send_stats().await,
            _ => CallToolResult::error(format!("Unknown tool: {}", name)),
        }
    }

    // ==================== Tool Handlers ====================

    async fn handle_send_email(&self, args: Value) -> CallToolResult {
        let args: EmailArgs = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return CallToolResult::error(format!("Invalid arguments: {}", e)),
        };

        // Critical section: admission, send, and record happen under one
        // lock so no other send can slip in between.
        let mut limiter = self.limiter.lock().await;

        let admission = limiter.check_admission();
        if !admission.allowed {
            return CallToolResult::error(denial_text(&admission.reason, &limiter.status()));
        }

        match self.gmail_client.send_email(args.into_params()).await {
            Ok(message) => {
                limiter.record_success();
                let status = limiter.status();
                CallToolResult::text(format!(
                    "Email sent successfully with ID: {}\n{}",
                    message.id,
                    remaining_text(&status)
                ))
            }
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    async fn handle_draft_email(&self, args: Value) -> CallToolResult {
        let args: EmailArgs = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return CallToolResult::error(format!("Invalid arguments: {}", e)),
        };

        // Drafts are not sends: no admission check, no capacity consumed
        match self.gmail_client.create_draft(args.into_params()).await {
            Ok(draft) => CallToolResult::text(format!(
                "Email draft created successfully with ID: {}",
                draft.id
            )),
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    async fn handle_bulk_send(&self, args: Value) -> CallToolResult {
        #[derive(Deserialize)]
        struct Args {
            messages: Vec<EmailArgs>,
        }

        let args: Args = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return CallToolResult::error(format!("Invalid arguments: {}", e)),
        };

        let requested = args.messages.len();
        if requested == 0 {
            return CallToolResult::error("No messages provided");
        }

        // Trim the batch to current capacity up front instead of failing
        // partway through.
        let admissible = {
            let mut limiter = self.limiter.lock().await;
            let admissible = limiter.max_admissible_batch(requested);
            if admissible == 0 {
                let admission = limiter.check_admission();
                return CallToolResult::error(denial_text(&admission.reason, &limiter.status()));
            }
            admissible
        };

        let mut sent = Vec::new();
        let mut failures = Vec::new();

        for (index, message) in args.messages.into_iter().take(admissible).enumerate() {
            // Pace consecutive sends; a hint, not part of admission control
            if index > 0 {
                let delay = self.limiter.lock().await.suggested_inter_send_delay();
                tokio::time::sleep(delay).await;
            }

            let mut limiter = self.limiter.lock().await;

            // Re-check per message: the windows keep sliding while we sleep
            let admission = limiter.check_admission();
            if !admission.allowed {
                failures.push((index, admission.reason.unwrap_or_default()));
                continue;
            }

            match self.gmail_client.send_email(message.into_params()).await {
                Ok(m) => {
                    limiter.record_success();
                    sent.push(m.id);
                }
                Err(e) => failures.push((index, e.to_string())),
            }
        }

        let mut text = format!(
            "Bulk send complete.\nSent: {} of {} requested\n",
            sent.len(),
            requested
        );
        if admissible < requested {
            text.push_str(&format!(
                "Skipped {} message(s): rate-limit capacity allows only {} right now\n",
                requested - admissible,
                admissible
            ));
        }
        for id in &sent {
            text.push_str(&format!("- Sent with ID: {}\n", id));
        }
        if !failures.is_empty() {
            text.push_str("Failures:\n");
            for (index, err) in &failures {
                text.push_str(&format!("- Message {}: {}\n", index + 1, err));
            }
        }
        text.push_str(&remaining_text(&self.limiter.lock().await.status()));

        CallToolResult::text(text)
    }

    async fn handle_check_send_status(&self, args: Value) -> CallToolResult {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Args {
            message_id: String,
        }

        let args: Args = match serde_json::from_value(args) {
            Ok(a) => a,
            Err(e) => return CallToolResult::error(format!("Invalid arguments: {}", e)),
        };

        match self.gmail_client.send_status(&args.message_id).await {
            Ok(status) => {
                let delivered = status.label_ids.iter().any(|l| l == "SENT");
                CallToolResult::text(format!(
                    "Message ID: {}\nThread ID: {}\nSubject: {}\nTo: {}\nDate: {}\nLabels: {}\nState: {}",
                    status.id,
                    status.thread_id,
                    status.subject,
                    status.to,
                    status.date,
                    status.label_ids.join(", "),
                    if delivered { "sent" } else { "not marked as sent" }
                ))
            }
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    async fn handle_verify_connection(&self) -> CallToolResult {
        match self.gmail_client.get_profile().await {
            Ok(profile) => {
                let status = self.limiter.lock().await.status();
                CallToolResult::text(format!(
                    "Connection verified.\nAuthenticated as: {}\nMessages in mailbox: {}\nSend limits: {}/hour, {}/day",
                    profile.email_address,
                    profile
                        .messages_total
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    status.hourly_limit,
                    status.daily_limit
                ))
            }
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    async fn handle_get_send_stats(&self) -> CallToolResult {
        let status = self.limiter.lock().await.status();
        CallToolResult::text(format!(
            "Send usage:\nHourly: {}/{} used, {} remaining\nDaily: {}/{} used, {} remaining",
            status.hourly_count,
            status.hourly_limit,
            status.hourly_remaining,
            status.daily_count,
            status.daily_limit,
            status.daily_remaining
        ))
    }
}

fn denial_text(reason: &Option<String>, status: &UsageSnapshot) -> String {
    format!(
        "{}\n{}",
        reason.as_deref().unwrap_or("Rate limit reached"),
        remaining_text(status)
    )
}

fn remaining_text(status: &UsageSnapshot) -> String {
    format!(
        "Remaining capacity: {} this hour, {} today",
        status.hourly_remaining, status.daily_remaining
    )
}

// ==================== Schema Definitions ====================

fn tool_def(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}

fn email_message_properties() -> Value {
    json!({
        "to": {
            "type": "array",
            "items": {"type": "string"},
            "description": "List of recipient email addresses"
        },
        "subject": {
            "type": "string",
            "description": "Email subject"
        },
        "body": {
            "type": "string",
            "description": "Email body content"
        },
        "htmlBody": {
            "type": "string",
            "description": "HTML version of the email body"
        },
        "mimeType": {
            "type": "string",
            "enum": ["text/plain", "text/html", "multipart/alternative"],
            "description": "Email content type"
        },
        "cc": {
            "type": "array",
            "items": {"type": "string"},
            "description": "List of CC recipients"
        },
        "bcc": {
            "type": "array",
            "items": {"type": "string"},
            "description": "List of BCC recipients"
        },
        "threadId": {
            "type": "string",
            "description": "Thread ID to reply to"
        },
        "inReplyTo": {
            "type": "string",
            "description": "Message ID being replied to"
        }
    })
}

fn send_email_schema() -> Value {
    json!({
        "type": "object",
        "properties": email_message_properties(),
        "required": ["to", "subject", "body"]
    })
}

fn bulk_send_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "messages": {
                "type": "array",
                "description": "Messages to send, in order. The batch is trimmed to what current rate-limit capacity allows.",
                "items": {
                    "type": "object",
                    "properties": email_message_properties(),
                    "required": ["to", "subject", "body"]
                }
            }
        },
        "required": ["messages"]
    })
}

fn check_send_status_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "messageId": {
                "type": "string",
                "description": "ID of the sent message to check"
            }
        },
        "required": ["messageId"]
    })
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}
