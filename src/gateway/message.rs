//! WebSocket 事件协议
//!
//! 双向均为 JSON 文本帧：`{"event": <名称>, "data": {...}}`。
//! 核心层返回的结果不带时间戳，发出前在这里补上 sessionId 与 ISO-8601 timestamp。

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::DialogueError;
use crate::dialogue::Response;
use crate::session::Preferences;
use crate::tools::ToolOutcome;

/// 客户端 → 服务端事件
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    SendMessage {
        message: String,
        #[serde(default)]
        session_id: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    ExecuteTool {
        tool_name: String,
        input: String,
        #[serde(default)]
        session_id: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    UpdatePreferences {
        preferences: Map<String, Value>,
        #[serde(default)]
        session_id: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    ConfirmStep {
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        step_result: Option<Value>,
    },
}

impl ClientEvent {
    /// 客户端显式给出的会话 id
    pub fn session_id(&self) -> Option<&str> {
        match self {
            ClientEvent::SendMessage { session_id, .. }
            | ClientEvent::ExecuteTool { session_id, .. }
            | ClientEvent::UpdatePreferences { session_id, .. }
            | ClientEvent::ConfirmStep { session_id, .. } => session_id.as_deref(),
        }
    }

    /// 处理该事件失败时上报的错误类型
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            ClientEvent::SendMessage { .. } => ErrorKind::MessageProcessing,
            ClientEvent::ExecuteTool { .. } => ErrorKind::ToolExecution,
            ClientEvent::UpdatePreferences { .. } => ErrorKind::PreferencesUpdate,
            ClientEvent::ConfirmStep { .. } => ErrorKind::StepConfirmation,
        }
    }
}

/// error 事件的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MessageProcessing,
    ToolExecution,
    PreferencesUpdate,
    StepConfirmation,
    ParseError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MessageProcessing => "message_processing",
            ErrorKind::ToolExecution => "tool_execution",
            ErrorKind::PreferencesUpdate => "preferences_update",
            ErrorKind::StepConfirmation => "step_confirmation",
            ErrorKind::ParseError => "parse_error",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::MessageProcessing => "Failed to process message",
            ErrorKind::ToolExecution => "Tool execution failed",
            ErrorKind::PreferencesUpdate => "Failed to update preferences",
            ErrorKind::StepConfirmation => "Failed to process step confirmation",
            ErrorKind::ParseError => "Invalid event",
        }
    }
}

/// 服务端 → 客户端事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerEvent {
    pub event: String,
    pub data: Value,
}

impl ServerEvent {
    /// 载荷展开为对象后补上 sessionId（已知时）与 timestamp
    pub fn new(event: &str, payload: Value, session_id: Option<&str>) -> Self {
        let mut data = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        if let Some(sid) = session_id {
            data.insert("sessionId".to_string(), Value::String(sid.to_string()));
        }
        data.insert("timestamp".to_string(), Value::String(timestamp()));
        Self {
            event: event.to_string(),
            data: Value::Object(data),
        }
    }

    pub fn ai_response(response: &Response, session_id: &str) -> Self {
        let payload = serde_json::to_value(response).unwrap_or(Value::Null);
        Self::new("ai_response", payload, Some(session_id))
    }

    pub fn tool_result(outcome: &ToolOutcome, tool_name: &str, session_id: &str) -> Self {
        let mut payload = outcome.to_value();
        if let Value::Object(map) = &mut payload {
            map.insert("toolName".to_string(), Value::String(tool_name.to_string()));
        }
        Self::new("tool_result", payload, Some(session_id))
    }

    pub fn preferences_updated(preferences: &Preferences, session_id: &str) -> Self {
        let payload = serde_json::json!({ "preferences": preferences });
        Self::new("preferences_updated", payload, Some(session_id))
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>, session_id: Option<&str>) -> Self {
        let payload = serde_json::json!({ "type": kind.as_str(), "message": message.into() });
        Self::new("error", payload, session_id)
    }

    pub fn tool_error(err: &DialogueError, session_id: &str) -> Self {
        Self::error(
            ErrorKind::ToolExecution,
            format!("Tool execution failed: {}", err),
            Some(session_id),
        )
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// 当前 UTC 时间，ISO-8601（毫秒精度）
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_events() {
        let ev: ClientEvent = serde_json::from_str(
            r#"{"event":"execute_tool","data":{"toolName":"calculator","input":"2+2","sessionId":"s1"}}"#,
        )
        .unwrap();
        assert_eq!(
            ev,
            ClientEvent::ExecuteTool {
                tool_name: "calculator".to_string(),
                input: "2+2".to_string(),
                session_id: Some("s1".to_string()),
            }
        );

        let ev: ClientEvent =
            serde_json::from_str(r#"{"event":"confirm_step","data":{"sessionId":"s1"}}"#).unwrap();
        assert_eq!(
            ev,
            ClientEvent::ConfirmStep {
                session_id: Some("s1".to_string()),
                step_result: None,
            }
        );

        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"dance","data":{}}"#).is_err());
    }

    #[test]
    fn test_server_event_is_stamped() {
        let ev = ServerEvent::tool_result(
            &ToolOutcome::Success(json!({ "result": 4 })),
            "calculator",
            "s1",
        );
        assert_eq!(ev.event, "tool_result");
        assert_eq!(ev.data["success"], true);
        assert_eq!(ev.data["toolName"], "calculator");
        assert_eq!(ev.data["sessionId"], "s1");
        let ts = ev.data["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn test_error_event() {
        let ev = ServerEvent::error(ErrorKind::ParseError, "bad json", None);
        assert_eq!(ev.data["type"], "parse_error");
        assert_eq!(ev.data["message"], "bad json");
        assert!(ev.data.get("sessionId").is_none());
    }
}
