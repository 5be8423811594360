//! Frame Codec
//!
//! Turns envelopes into transport frames and back.

use bytes::Bytes;
use serde::Serialize;

use super::types::Envelope;
use crate::hub::HubError;

/// Serialize `{type, payload}` into a frame ready for the transport
pub fn encode_frame<P: Serialize + ?Sized>(event_type: &str, payload: &P) -> Result<Bytes, HubError> {
    let payload = serde_json::to_value(payload)
        .map_err(|e| HubError::Serialization(e.to_string()))?;
    let envelope = Envelope::new(event_type, payload);

    serde_json::to_vec(&envelope)
        .map(Bytes::from)
        .map_err(|e| HubError::Serialization(e.to_string()))
}

/// Parse an inbound frame into an envelope
pub fn decode_frame(frame: &[u8]) -> Result<Envelope, HubError> {
    let envelope: Envelope = serde_json::from_slice(frame)
        .map_err(|e| HubError::MalformedFrame(e.to_string()))?;

    if envelope.event_type.is_empty() {
        return Err(HubError::MalformedFrame("empty event type".to_string()));
    }

    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_frame_shape() {
        let frame = encode_frame("cart:update", &json!({ "isbn": "978-0131103627", "qty": 2 })).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&frame).unwrap();

        assert_eq!(value, json!({
            "type": "cart:update",
            "payload": { "isbn": "978-0131103627", "qty": 2 }
        }));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_frame(b"not json").unwrap_err();
        assert!(matches!(err, HubError::MalformedFrame(_)));
    }

    #[test]
    fn test_decode_rejects_missing_type() {
        let err = decode_frame(br#"{"payload": 1}"#).unwrap_err();
        assert!(matches!(err, HubError::MalformedFrame(_)));

        let err = decode_frame(br#"{"type": "", "payload": 1}"#).unwrap_err();
        assert!(matches!(err, HubError::MalformedFrame(_)));
    }
}
