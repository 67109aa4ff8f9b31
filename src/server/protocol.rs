//! Wire envelope for the controller connection
//!
//! Messages travel as JSON objects with a `MsgType` tag. Inbound types:
//! `heartbeat`, `authenticate`, `authentication` (result), `execute`.
//! Outbound types: `heartbeat` (pong reply), `authenticate` (credential
//! payload), `execute-success`, `execute-failure`.

use serde::{Deserialize, Serialize};

/// The common message envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocketMessage {
    #[serde(rename = "MsgType", default)]
    pub msg_type: String,
    #[serde(rename = "Action", default, skip_serializing_if = "String::is_empty")]
    pub action: String,
    #[serde(rename = "ActionId", default, skip_serializing_if = "String::is_empty")]
    pub action_id: String,
    #[serde(rename = "Message", default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl SocketMessage {
    /// Heartbeat reply.
    pub fn pong() -> Self {
        Self {
            msg_type: "heartbeat".to_string(),
            message: "pong".to_string(),
            ..Self::default()
        }
    }

    pub fn execute_success(action: &str, action_id: &str, message: &str) -> Self {
        Self::status("execute-success", action, action_id, message)
    }

    pub fn execute_failure(action: &str, action_id: &str, message: &str) -> Self {
        Self::status("execute-failure", action, action_id, message)
    }

    fn status(msg_type: &str, action: &str, action_id: &str, message: &str) -> Self {
        Self {
            msg_type: msg_type.to_string(),
            action: action.to_string(),
            action_id: action_id.to_string(),
            message: message.to_string(),
        }
    }

    /// Serialize for transmission.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("socket message serializes")
    }

    /// Parse an inbound payload.
    pub fn decode(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}

/// Credential payload answering an `authenticate` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthMessage {
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    pub id: String,
    pub key: String,
}

impl AuthMessage {
    pub fn new(id: &str, key: &str) -> Self {
        Self {
            msg_type: "authenticate".to_string(),
            id: id.to_string(),
            key: key.to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("auth message serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_round_trip() {
        let msg = SocketMessage::execute_failure("deploy", "42", "no such action: deploy");
        let decoded = SocketMessage::decode(&msg.encode()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_wire_field_names() {
        let encoded = String::from_utf8(SocketMessage::pong().encode()).unwrap();
        assert!(encoded.contains("\"MsgType\":\"heartbeat\""));
        assert!(encoded.contains("\"Message\":\"pong\""));
        // empty fields stay off the wire
        assert!(!encoded.contains("ActionId"));
    }

    #[test]
    fn test_decode_tolerates_missing_fields() {
        let msg = SocketMessage::decode(br#"{"MsgType":"heartbeat"}"#).unwrap();
        assert_eq!(msg.msg_type, "heartbeat");
        assert_eq!(msg.message, "");
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(SocketMessage::decode(b"not json at all").is_err());
    }

    #[test]
    fn test_auth_message_carries_identity() {
        let encoded = String::from_utf8(AuthMessage::new("node-1", "secret").encode()).unwrap();
        assert!(encoded.contains("\"id\":\"node-1\""));
        assert!(encoded.contains("\"key\":\"secret\""));
        assert!(encoded.contains("\"MsgType\":\"authenticate\""));
    }
}
