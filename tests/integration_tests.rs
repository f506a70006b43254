//! Integration tests for the Gmail Send MCP Server
//!
//! These tests cover the MCP protocol shapes, tool argument schemas, the
//! rate limiter's behavior through its public API, and email construction.
//! No real Gmail API calls are made.

use serde_json::{json, Value};

/// Helper to create a JSON-RPC request
fn make_request(id: i64, method: &str, params: Option<Value>) -> Value {
    let mut request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if let Some(p) = params {
        request["params"] = p;
    }
    request
}

/// Helper to parse JSON-RPC response
fn parse_response(json_str: &str) -> Value {
    serde_json::from_str(json_str).expect("Failed to parse JSON response")
}

mod mcp_protocol_tests {
    use super::*;

    #[test]
    fn test_initialize_request_format() {
        let request = make_request(1, "initialize", Some(json!({
            "protocolVersion": "2024-11-05",
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            },
            "capabilities": {}
        })));

        assert_eq!(request["method"], "initialize");
        assert_eq!(request["id"], 1);
        assert!(request["params"]["protocolVersion"].is_string());
    }

    #[test]
    fn test_list_tools_request_format() {
        let request = make_request(2, "tools/list", None);
        assert_eq!(request["method"], "tools/list");
        assert_eq!(request["id"], 2);
    }

    #[test]
    fn test_call_tool_request_format() {
        let request = make_request(3, "tools/call", Some(json!({
            "name": "send_email",
            "arguments": {
                "to": ["recipient@example.com"],
                "subject": "Hello",
                "body": "World"
            }
        })));

        assert_eq!(request["method"], "tools/call");
        assert_eq!(request["params"]["name"], "send_email");
        assert_eq!(request["params"]["arguments"]["subject"], "Hello");
    }

    #[test]
    fn test_jsonrpc_response_structure() {
        let response_json = r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#;
        let response = parse_response(response_json);

        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["id"], 1);
        assert!(response["result"].is_object());
        assert!(response["error"].is_null());
    }

    #[test]
    fn test_jsonrpc_error_response_structure() {
        let response_json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found: unknown"}}"#;
        let response = parse_response(response_json);

        assert_eq!(response["jsonrpc"], "2.0");
        assert!(response["result"].is_null());
        assert_eq!(response["error"]["code"], -32601);
    }
}

mod tool_schema_tests {
    use super::*;

    #[test]
    fn test_send_email_schema() {
        let args = json!({
            "to": ["recipient@example.com"],
            "subject": "Test Subject",
            "body": "Test body content",
            "cc": ["cc@example.com"],
            "bcc": ["bcc@example.com"],
            "mimeType": "text/plain"
        });

        assert!(args["to"].is_array());
        assert!(args["subject"].is_string());
        assert!(args["body"].is_string());
        assert!(args["cc"].is_array());
        assert!(args["mimeType"].is_string());
    }

    #[test]
    fn test_bulk_send_schema() {
        let args = json!({
            "messages": [
                {"to": ["a@example.com"], "subject": "One", "body": "First"},
                {"to": ["b@example.com"], "subject": "Two", "body": "Second"}
            ]
        });

        assert!(args["messages"].is_array());
        assert_eq!(args["messages"].as_array().unwrap().len(), 2);
        assert_eq!(args["messages"][0]["subject"], "One");
    }

    #[test]
    fn test_check_send_status_schema() {
        let args = json!({
            "messageId": "msg123"
        });

        assert!(args["messageId"].is_string());
    }

    #[test]
    fn test_reply_arguments() {
        let args = json!({
            "to": ["recipient@example.com"],
            "subject": "Re: Original",
            "body": "Reply body",
            "threadId": "thread123",
            "inReplyTo": "<original@example.com>"
        });

        assert!(args["threadId"].is_string());
        assert!(args["inReplyTo"].is_string());
    }
}

mod rate_limiter_tests {
    use gmail_send_mcp::ratelimit::{RateLimiter, SendLimits};

    fn limiter(max_per_hour: u32, max_per_day: u32) -> RateLimiter {
        RateLimiter::new(SendLimits {
            max_per_hour,
            max_per_day,
        })
    }

    #[test]
    fn test_admission_allowed_when_fresh() {
        let mut rl = limiter(2, 5);
        let admission = rl.check_admission();

        assert!(admission.allowed);
        assert!(admission.reason.is_none());
        assert_eq!(admission.hourly_remaining, 2);
        assert_eq!(admission.daily_remaining, 5);
    }

    #[test]
    fn test_monotonic_exhaustion() {
        let mut rl = limiter(3, 10);
        for _ in 0..3 {
            assert!(rl.check_admission().allowed);
            rl.record_success();
        }

        let admission = rl.check_admission();
        assert!(!admission.allowed);
        assert!(admission.reason.unwrap().contains("Hourly limit reached"));
    }

    #[test]
    fn test_window_independence() {
        let mut rl = limiter(5, 50);
        for _ in 0..5 {
            rl.record_success();
        }

        let admission = rl.check_admission();
        assert!(!admission.allowed);
        assert_eq!(admission.daily_remaining, 45);
    }

    #[test]
    fn test_hourly_precedence_over_daily() {
        let mut rl = limiter(1, 1);
        rl.record_success();

        let reason = rl.check_admission().reason.unwrap();
        assert!(reason.contains("Hourly"));
        assert!(!reason.contains("Daily"));
    }

    #[test]
    fn test_batch_truncation() {
        let mut rl = limiter(3, 10);
        assert_eq!(rl.max_admissible_batch(7), 3);

        for _ in 0..3 {
            rl.record_success();
        }
        assert_eq!(rl.max_admissible_batch(7), 0);
    }

    #[test]
    fn test_reads_do_not_consume_capacity() {
        let mut rl = limiter(2, 5);
        for _ in 0..20 {
            rl.check_admission();
            rl.status();
        }

        let status = rl.status();
        assert_eq!(status.hourly_count, 0);
        assert_eq!(status.daily_count, 0);
    }

    #[test]
    fn test_status_reports_both_windows() {
        let mut rl = limiter(2, 5);
        rl.record_success();

        let status = rl.status();
        assert_eq!(status.hourly_count, 1);
        assert_eq!(status.hourly_limit, 2);
        assert_eq!(status.hourly_remaining, 1);
        assert_eq!(status.daily_count, 1);
        assert_eq!(status.daily_limit, 5);
        assert_eq!(status.daily_remaining, 4);
    }

    #[test]
    fn test_suggested_delay_in_range() {
        let rl = limiter(2, 5);
        let delay = rl.suggested_inter_send_delay();
        assert!(delay.as_secs() >= 3);
        assert!(delay.as_secs() <= 8);
    }
}

mod email_utils_tests {
    use gmail_send_mcp::gmail::utils::*;

    #[test]
    fn test_validate_email_addresses() {
        assert!(validate_email("user@example.com"));
        assert!(validate_email("user.name@example.co.uk"));
        assert!(validate_email("user+tag@example.com"));

        assert!(!validate_email("invalid"));
        assert!(!validate_email("@example.com"));
        assert!(!validate_email("user@"));
        assert!(!validate_email("user@.com"));
    }

    #[test]
    fn test_encode_mime_header() {
        assert_eq!(encode_mime_header("Hello World"), "Hello World");

        let encoded = encode_mime_header("Héllo Wörld 你好");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn test_create_simple_email() {
        let params = EmailParams {
            to: vec!["test@example.com".to_string()],
            subject: "Test Subject".to_string(),
            body: "Test body".to_string(),
            html_body: None,
            mime_type: None,
            cc: None,
            bcc: None,
            thread_id: None,
            in_reply_to: None,
        };

        let result = create_email_message(&params).unwrap();
        assert!(result.contains("To: test@example.com"));
        assert!(result.contains("Subject: Test Subject"));
        assert!(result.contains("Content-Type: text/plain"));
    }

    #[test]
    fn test_create_html_email() {
        let params = EmailParams {
            to: vec!["test@example.com".to_string()],
            subject: "HTML Email".to_string(),
            body: "Plain text version".to_string(),
            html_body: Some("<h1>HTML Version</h1>".to_string()),
            mime_type: Some(MimeType::MultipartAlternative),
            cc: None,
            bcc: None,
            thread_id: None,
            in_reply_to: None,
        };

        let result = create_email_message(&params).unwrap();
        assert!(result.contains("multipart/alternative"));
        assert!(result.contains("Plain text version"));
        assert!(result.contains("<h1>HTML Version</h1>"));
    }

    #[test]
    fn test_create_email_with_cc_bcc() {
        let params = EmailParams {
            to: vec!["to@example.com".to_string()],
            subject: "Test".to_string(),
            body: "Body".to_string(),
            html_body: None,
            mime_type: None,
            cc: Some(vec!["cc@example.com".to_string()]),
            bcc: Some(vec!["bcc@example.com".to_string()]),
            thread_id: None,
            in_reply_to: None,
        };

        let result = create_email_message(&params).unwrap();
        assert!(result.contains("Cc: cc@example.com"));
        assert!(result.contains("Bcc: bcc@example.com"));
    }

    #[test]
    fn test_email_validation_rejects_invalid() {
        let params = EmailParams {
            to: vec!["invalid-email".to_string()],
            subject: "Test".to_string(),
            body: "Body".to_string(),
            html_body: None,
            mime_type: None,
            cc: None,
            bcc: None,
            thread_id: None,
            in_reply_to: None,
        };

        assert!(create_email_message(&params).is_err());
    }
}

mod types_serialization_tests {
    use gmail_send_mcp::gmail::types::*;

    #[test]
    fn test_message_serialization() {
        let message = Message {
            id: "msg123".to_string(),
            thread_id: Some("thread456".to_string()),
            label_ids: vec!["SENT".to_string()],
            snippet: Some("Email preview...".to_string()),
            payload: None,
            internal_date: None,
        };

        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("msg123"));
        assert!(json.contains("thread456"));
        assert!(json.contains("SENT"));
    }

    #[test]
    fn test_profile_deserialization() {
        let json = r#"{
            "emailAddress": "me@example.com",
            "messagesTotal": 1200,
            "threadsTotal": 800,
            "historyId": "12345"
        }"#;

        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.email_address, "me@example.com");
        assert_eq!(profile.messages_total, Some(1200));
    }

    #[test]
    fn test_draft_deserialization() {
        let json = r#"{"id":"draft1","message":{"id":"msg1","threadId":"t1"}}"#;
        let draft: Draft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.id, "draft1");
        assert_eq!(draft.message.id, "msg1");
    }
}

mod mcp_types_tests {
    use gmail_send_mcp::mcp::types::*;

    #[test]
    fn test_tool_result_text() {
        let result = CallToolResult::text("Success message");
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);
    }

    #[test]
    fn test_tool_result_error() {
        let result = CallToolResult::error("Something went wrong");
        assert!(result.is_error);

        let ToolResultContent::Text { text } = &result.content[0];
        assert!(text.contains("Error:"));
        assert!(text.contains("Something went wrong"));
    }

    #[test]
    fn test_request_id_variants() {
        let id_num = RequestId::Number(42);
        let id_str = RequestId::String("req-123".to_string());

        assert_eq!(serde_json::to_string(&id_num).unwrap(), "42");
        assert_eq!(serde_json::to_string(&id_str).unwrap(), "\"req-123\"");
    }

    #[test]
    fn test_jsonrpc_response_success() {
        let response = JsonRpcResponse::success(
            RequestId::Number(1),
            serde_json::json!({"status": "ok"})
        );

        assert!(response.result.is_some());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_jsonrpc_response_error() {
        let response = JsonRpcResponse::error(
            RequestId::Number(1),
            JsonRpcError::method_not_found("unknown_method")
        );

        assert!(response.result.is_none());
        assert_eq!(response.error.as_ref().unwrap().code, -32601);
    }
}
