//! Wire envelope types shared by both transport legs.
//!
//! Every frame is a JSON object. Request frames carry `command` + `params`
//! and an opaque correlation `id`; control and response frames carry a
//! `type` discriminator instead. The driver leg and the agent leg speak the
//! same envelope shape with independent id namespaces.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version announced in the `connected` notification.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Opaque correlation token. Drivers may use strings or numbers; `Null`
/// marks fire-and-forget notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Num(i64),
    Str(String),
    #[default]
    Null,
}

impl RequestId {
    pub fn is_null(&self) -> bool {
        matches!(self, RequestId::Null)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::Str(s.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Num(n)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Num(n) => write!(f, "{}", n),
            RequestId::Str(s) => write!(f, "{}", s),
            RequestId::Null => write!(f, "null"),
        }
    }
}

/// Any frame arriving on a channel, deserialized leniently: a request
/// (`command` present), a control notification (`type` present), or
/// something malformed that the dispatcher will answer with an error.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    #[serde(default)]
    pub id: RequestId,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub params: Value,
}

/// Frames we emit. `result` and `error` are mutually exclusive by
/// construction; `error` is always a string, never a structured object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundFrame {
    Connected { version: String },
    Response { id: RequestId, result: Value },
    Error { id: RequestId, error: String },
}

impl OutboundFrame {
    pub fn connected() -> Self {
        OutboundFrame::Connected {
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn response(id: RequestId, result: Value) -> Self {
        OutboundFrame::Response { id, result }
    }

    pub fn error(id: RequestId, error: impl Into<String>) -> Self {
        OutboundFrame::Error {
            id,
            error: error.into(),
        }
    }

    pub fn to_json(&self) -> String {
        // Serialization of these shapes cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A request enveloped for the agent leg: same shape as driver requests,
/// with the bridge-assigned correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub id: RequestId,
    pub command: String,
    #[serde(default)]
    pub params: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_round_trip() {
        let s: RequestId = serde_json::from_str("\"demo-1\"").unwrap();
        assert_eq!(s, RequestId::Str("demo-1".into()));
        let n: RequestId = serde_json::from_str("42").unwrap();
        assert_eq!(n, RequestId::Num(42));
        let null: RequestId = serde_json::from_str("null").unwrap();
        assert!(null.is_null());
        assert_eq!(serde_json::to_value(&null).unwrap(), Value::Null);
    }

    #[test]
    fn test_inbound_request_frame() {
        let frame: InboundFrame =
            serde_json::from_str(r#"{"id":"x","command":"tabs.list","params":{}}"#).unwrap();
        assert_eq!(frame.id, RequestId::from("x"));
        assert_eq!(frame.command.as_deref(), Some("tabs.list"));
        assert!(frame.kind.is_none());
    }

    #[test]
    fn test_inbound_control_frame() {
        let frame: InboundFrame = serde_json::from_str(r#"{"type":"ack"}"#).unwrap();
        assert_eq!(frame.kind.as_deref(), Some("ack"));
        assert!(frame.id.is_null());
        assert!(frame.command.is_none());
    }

    #[test]
    fn test_response_wire_shape() {
        let frame = OutboundFrame::response(RequestId::from("x"), json!({"success": true}));
        let v: Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(v["type"], "response");
        assert_eq!(v["id"], "x");
        assert_eq!(v["result"]["success"], true);
    }

    #[test]
    fn test_error_wire_shape_null_id() {
        let frame = OutboundFrame::error(RequestId::Null, "Command not specified");
        let v: Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(v["type"], "error");
        assert!(v["id"].is_null());
        assert_eq!(v["error"], "Command not specified");
    }

    #[test]
    fn test_connected_notification() {
        let v: Value = serde_json::from_str(&OutboundFrame::connected().to_json()).unwrap();
        assert_eq!(v["type"], "connected");
        assert_eq!(v["version"], PROTOCOL_VERSION);
    }

    #[test]
    fn test_null_result_passes_through() {
        let frame = OutboundFrame::response(RequestId::Num(7), Value::Null);
        let v: Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(v["id"], 7);
        assert!(v.get("result").is_some());
        assert!(v["result"].is_null());
    }
}
