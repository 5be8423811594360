//! Wire Protocol Types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single unit on the wire: `{"type": ..., "payload": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Create a new envelope
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_field_names() {
        let envelope = Envelope::new("chat:typing", json!({ "user": "ana" }));
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["type"], "chat:typing");
        assert_eq!(value["payload"]["user"], "ana");
        assert!(value.get("event_type").is_none());
    }

    #[test]
    fn test_missing_payload_defaults_to_null() {
        let envelope: Envelope = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(envelope.event_type, "ping");
        assert_eq!(envelope.payload, Value::Null);
    }
}
