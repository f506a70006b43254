//! Email construction utilities
//!
//! RFC822 message assembly, address validation, and the base64url encoding
//! the Gmail API expects.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::error::{GmailSendError, Result, ValidationError};
use crate::gmail::types::MessagePart;

/// Validate an email address
pub fn validate_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let (local, domain) = (parts[0], parts[1]);

    !local.is_empty()
        && !domain.is_empty()
        && !local.contains(' ')
        && !domain.contains(' ')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Encode text for a MIME header (RFC 2047), base64 variant
pub fn encode_mime_header(text: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && c != '\r' && c != '\n') {
        return text.to_string();
    }

    format!(
        "=?UTF-8?B?{}?=",
        base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
    )
}

/// Encode a raw email message for the Gmail API (base64url, no padding)
pub fn encode_raw_message(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Find a header value by name (case-insensitive)
pub fn find_header<'a>(part: &'a MessagePart, name: &str) -> Option<&'a str> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Email content types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeType {
    TextPlain,
    TextHtml,
    MultipartAlternative,
}

/// Parameters for composing an email message
#[derive(Debug, Clone)]
pub struct EmailParams {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub html_body: Option<String>,
    pub mime_type: Option<MimeType>,
    pub cc: Option<Vec<String>>,
    pub bcc: Option<Vec<String>>,
    pub thread_id: Option<String>,
    pub in_reply_to: Option<String>,
}

/// Build the RFC822 text of an email message
pub fn create_email_message(params: &EmailParams) -> Result<String> {
    for email in params
        .to
        .iter()
        .chain(params.cc.iter().flatten())
        .chain(params.bcc.iter().flatten())
    {
        if !validate_email(email) {
            return Err(GmailSendError::Validation(ValidationError::InvalidEmail {
                email: email.clone(),
            }));
        }
    }

    let mime_type = params.mime_type.unwrap_or(MimeType::TextPlain);
    let use_alternative = params.html_body.is_some() && mime_type != MimeType::TextPlain;

    let mut lines = Vec::new();

    lines.push("From: me".to_string());
    lines.push(format!("To: {}", params.to.join(", ")));

    if let Some(ref cc) = params.cc {
        if !cc.is_empty() {
            lines.push(format!("Cc: {}", cc.join(", ")));
        }
    }

    if let Some(ref bcc) = params.bcc {
        if !bcc.is_empty() {
            lines.push(format!("Bcc: {}", bcc.join(", ")));
        }
    }

    lines.push(format!("Subject: {}", encode_mime_header(&params.subject)));

    if let Some(ref in_reply_to) = params.in_reply_to {
        lines.push(format!("In-Reply-To: {}", in_reply_to));
        lines.push(format!("References: {}", in_reply_to));
    }

    lines.push("MIME-Version: 1.0".to_string());

    if use_alternative {
        let boundary = format!("----=_NextPart_{}", generate_boundary());
        lines.push(format!(
            "Content-Type: multipart/alternative; boundary=\"{}\"",
            boundary
        ));
        lines.push(String::new());

        lines.push(format!("--{}", boundary));
        push_text_part(&mut lines, "text/plain", &params.body);

        lines.push(format!("--{}", boundary));
        push_text_part(
            &mut lines,
            "text/html",
            params.html_body.as_deref().unwrap_or(&params.body),
        );

        lines.push(format!("--{}--", boundary));
    } else if mime_type == MimeType::TextHtml {
        push_text_part(
            &mut lines,
            "text/html",
            params.html_body.as_deref().unwrap_or(&params.body),
        );
    } else {
        push_text_part(&mut lines, "text/plain", &params.body);
    }

    Ok(lines.join("\r\n"))
}

fn push_text_part(lines: &mut Vec<String>, content_type: &str, body: &str) {
    lines.push(format!("Content-Type: {}; charset=UTF-8", content_type));
    lines.push("Content-Transfer-Encoding: 7bit".to_string());
    lines.push(String::new());
    lines.push(body.to_string());
    lines.push(String::new());
}

/// Generate a boundary string for multipart messages
fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{:x}", timestamp)
}
