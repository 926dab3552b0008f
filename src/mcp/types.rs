//! JSON-RPC 2.0 envelopes and the MCP payloads this server exchanges.

use crate::shared::logging::LogLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Any line read from the host, before it is classified.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    Notification {
        method: String,
        params: Value,
    },
    Response {
        id: Value,
        outcome: Result<Value, JsonRpcError>,
    },
}

impl IncomingMessage {
    pub fn parse(line: &str) -> Result<Self, JsonRpcError> {
        let value: Value = serde_json::from_str(line)
            .map_err(|err| JsonRpcError::new(PARSE_ERROR, err.to_string()))?;
        let raw: RawMessage = serde_json::from_value(value)
            .map_err(|err| JsonRpcError::new(INVALID_REQUEST, err.to_string()))?;

        match (raw.method, raw.id) {
            (Some(method), Some(id)) => Ok(Self::Request {
                id,
                method,
                params: raw.params,
            }),
            (Some(method), None) => Ok(Self::Notification {
                method,
                params: raw.params,
            }),
            (None, Some(id)) => {
                let outcome = match raw.error {
                    Some(error) => Err(error),
                    None => Ok(raw.result.unwrap_or(Value::Null)),
                };
                Ok(Self::Response { id, outcome })
            }
            (None, None) => Err(JsonRpcError::new(
                INVALID_REQUEST,
                "message has neither `method` nor `id`",
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: Value,
    pub method: &'a str,
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcNotification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: Value,
}

/// Tool definition returned by tools/list
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(rename = "outputSchema")]
    pub output_schema: Value,
}

/// Parameters for tools/call
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResultContent {
    #[serde(rename = "type")]
    pub content_type: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub content: Vec<ToolResultContent>,
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn structured(text: impl Into<String>, structured: Value) -> Self {
        Self {
            content: vec![ToolResultContent {
                content_type: "text",
                text: text.into(),
            }],
            structured_content: Some(structured),
            is_error: false,
        }
    }
}

/// Maps an MCP (syslog-style) level onto the four levels this crate logs at.
pub fn parse_mcp_log_level(raw: &str) -> Option<LogLevel> {
    match raw {
        "debug" => Some(LogLevel::Debug),
        "info" | "notice" => Some(LogLevel::Info),
        "warning" => Some(LogLevel::Warn),
        "error" | "critical" | "alert" | "emergency" => Some(LogLevel::Error),
        _ => None,
    }
}

pub fn mcp_log_level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warning",
        LogLevel::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_requests_notifications_and_responses() {
        let request = IncomingMessage::parse(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
            .expect("request");
        assert!(matches!(request, IncomingMessage::Request { ref method, .. } if method == "ping"));

        let notification =
            IncomingMessage::parse(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .expect("notification");
        assert!(matches!(notification, IncomingMessage::Notification { .. }));

        let response = IncomingMessage::parse(r#"{"jsonrpc":"2.0","id":7,"result":{"ok":true}}"#)
            .expect("response");
        assert_eq!(
            response,
            IncomingMessage::Response {
                id: json!(7),
                outcome: Ok(json!({ "ok": true })),
            }
        );

        let failure = IncomingMessage::parse(
            r#"{"jsonrpc":"2.0","id":8,"error":{"code":-1,"message":"user rejected"}}"#,
        )
        .expect("error response");
        let IncomingMessage::Response { outcome, .. } = failure else {
            panic!("expected response");
        };
        assert_eq!(outcome.expect_err("error").message, "user rejected");
    }

    #[test]
    fn malformed_lines_map_to_json_rpc_codes() {
        assert_eq!(
            IncomingMessage::parse("{not json").expect_err("parse").code,
            PARSE_ERROR
        );
        assert_eq!(
            IncomingMessage::parse(r#"{"jsonrpc":"2.0"}"#)
                .expect_err("invalid")
                .code,
            INVALID_REQUEST
        );
        assert_eq!(
            IncomingMessage::parse(r#"{"method":5,"id":1}"#)
                .expect_err("invalid")
                .code,
            INVALID_REQUEST
        );
    }

    #[test]
    fn tool_result_omits_is_error_when_false() {
        let value = serde_json::to_value(ToolResult::structured("{}", json!({}))).expect("json");
        assert!(value.get("isError").is_none());
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["structuredContent"], json!({}));
    }

    #[test]
    fn mcp_levels_map_both_ways() {
        assert_eq!(parse_mcp_log_level("notice"), Some(LogLevel::Info));
        assert_eq!(parse_mcp_log_level("critical"), Some(LogLevel::Error));
        assert_eq!(parse_mcp_log_level("verbose"), None);
        assert_eq!(mcp_log_level_name(LogLevel::Warn), "warning");
    }
}
