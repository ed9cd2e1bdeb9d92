use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// One logical sensor reading as it travels through the mesh and pipeline.
///
/// The wire encoding is a JSON object with keys `d_id`, `m_id`, `ttl` and
/// `values`; additional keys are ignored on decode. An envelope is created
/// exactly once by an originating node and treated as immutable data by
/// every hop after that; forwarding produces a new copy via
/// [`Envelope::forwarded`].
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Identity of the originating node, set once at origination.
    pub device_id: String,
    /// Unique identity of one logical reading, never reused.
    pub message_id: String,
    /// Remaining hop budget, strictly non-increasing along the path.
    pub ttl: u32,
    /// Measured quantities; each key becomes one time-series field.
    pub values: BTreeMap<String, f64>,
}

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("invalid encoding: {0}")]
    Encoding(String),

    #[error("invalid schema: {0}")]
    Schema(String),
}

impl Envelope {
    /// Build a fresh envelope at origination with a random UUID message id.
    pub fn new(device_id: String, values: BTreeMap<String, f64>, ttl: u32) -> Self {
        Self {
            device_id,
            message_id: Uuid::new_v4().to_string(),
            ttl,
            values,
        }
    }

    /// A copy of this envelope with the hop budget decremented by exactly 1.
    ///
    /// Callers must not forward an envelope whose `ttl` is already 0.
    pub fn forwarded(&self) -> Self {
        debug_assert!(self.ttl > 0);
        Self {
            ttl: self.ttl - 1,
            ..self.clone()
        }
    }

    /// Decode wire bytes into an envelope.
    ///
    /// Decoding is two-phase so callers can distinguish transport-level
    /// garbage from well-formed JSON that violates the schema:
    /// [`EnvelopeError::Encoding`] for the former, [`EnvelopeError::Schema`]
    /// for the latter.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Encoding(e.to_string()))?;

        let object = value
            .as_object()
            .ok_or_else(|| EnvelopeError::Schema("payload is not a JSON object".to_string()))?;

        let device_id = object
            .get("d_id")
            .and_then(Value::as_str)
            .ok_or_else(|| EnvelopeError::Schema("missing or non-string d_id".to_string()))?
            .to_string();

        let message_id = object
            .get("m_id")
            .and_then(Value::as_str)
            .ok_or_else(|| EnvelopeError::Schema("missing or non-string m_id".to_string()))?
            .to_string();

        // as_u64 rejects floats, negatives and non-numbers in one step
        let ttl = object
            .get("ttl")
            .and_then(Value::as_u64)
            .ok_or_else(|| EnvelopeError::Schema("missing or non-integer ttl".to_string()))?;
        let ttl = u32::try_from(ttl)
            .map_err(|_| EnvelopeError::Schema(format!("ttl {} out of range", ttl)))?;

        let raw_values = object
            .get("values")
            .and_then(Value::as_object)
            .ok_or_else(|| EnvelopeError::Schema("missing or non-object values".to_string()))?;

        if raw_values.is_empty() {
            return Err(EnvelopeError::Schema("values is empty".to_string()));
        }

        let mut values = BTreeMap::new();
        for (field, value) in raw_values {
            let number = value.as_f64().ok_or_else(|| {
                EnvelopeError::Schema(format!("non-numeric value for field {}", field))
            })?;
            values.insert(field.clone(), number);
        }

        Ok(Self {
            device_id,
            message_id,
            ttl,
            values,
        })
    }

    /// Encode this envelope to its wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let body = serde_json::json!({
            "d_id": self.device_id,
            "m_id": self.message_id,
            "ttl": self.ttl,
            "values": self.values,
        });
        // Serializing a json! literal cannot fail
        serde_json::to_vec(&body).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_well_formed_envelope() {
        let bytes =
            br#"{"d_id":"node-a","m_id":"m1","ttl":10,"values":{"temperature":21.5,"humidity":40}}"#;

        let envelope = Envelope::decode(bytes).unwrap();

        assert_eq!(envelope.device_id, "node-a");
        assert_eq!(envelope.message_id, "m1");
        assert_eq!(envelope.ttl, 10);
        assert_eq!(envelope.values.get("temperature"), Some(&21.5));
        assert_eq!(envelope.values.get("humidity"), Some(&40.0));
    }

    #[test]
    fn test_decode_ignores_additional_keys() {
        let bytes =
            br#"{"d_id":"node-a","m_id":"m1","ttl":3,"values":{"temperature":1.0},"rssi":-92}"#;

        let envelope = Envelope::decode(bytes).unwrap();

        assert_eq!(envelope.ttl, 3);
        assert!(!envelope.values.contains_key("rssi"));
    }

    #[test]
    fn test_decode_rejects_non_json_as_encoding_error() {
        let result = Envelope::decode(b"\x00\x01not json");

        assert!(matches!(result, Err(EnvelopeError::Encoding(_))));
    }

    #[test]
    fn test_decode_rejects_missing_fields_as_schema_error() {
        let cases = [
            r#"{"m_id":"m1","ttl":10,"values":{"t":1.0}}"#,
            r#"{"d_id":"a","ttl":10,"values":{"t":1.0}}"#,
            r#"{"d_id":"a","m_id":"m1","values":{"t":1.0}}"#,
            r#"{"d_id":"a","m_id":"m1","ttl":10}"#,
        ];

        for case in cases {
            let result = Envelope::decode(case.as_bytes());
            assert!(
                matches!(result, Err(EnvelopeError::Schema(_))),
                "expected schema error for {}",
                case
            );
        }
    }

    #[test]
    fn test_decode_rejects_bad_ttl() {
        let cases = [
            r#"{"d_id":"a","m_id":"m1","ttl":-1,"values":{"t":1.0}}"#,
            r#"{"d_id":"a","m_id":"m1","ttl":1.5,"values":{"t":1.0}}"#,
            r#"{"d_id":"a","m_id":"m1","ttl":"10","values":{"t":1.0}}"#,
        ];

        for case in cases {
            let result = Envelope::decode(case.as_bytes());
            assert!(
                matches!(result, Err(EnvelopeError::Schema(_))),
                "expected schema error for {}",
                case
            );
        }
    }

    #[test]
    fn test_decode_rejects_empty_or_non_numeric_values() {
        let empty = r#"{"d_id":"a","m_id":"m1","ttl":10,"values":{}}"#;
        assert!(matches!(
            Envelope::decode(empty.as_bytes()),
            Err(EnvelopeError::Schema(_))
        ));

        let non_numeric = r#"{"d_id":"a","m_id":"m1","ttl":10,"values":{"t":"warm"}}"#;
        assert!(matches!(
            Envelope::decode(non_numeric.as_bytes()),
            Err(EnvelopeError::Schema(_))
        ));
    }

    #[test]
    fn test_encode_round_trips_through_decode() {
        let mut values = BTreeMap::new();
        values.insert("temperature".to_string(), 21.5);
        let original = Envelope::new("node-a".to_string(), values, 10);

        let decoded = Envelope::decode(&original.encode()).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_new_generates_unique_message_ids() {
        let mut values = BTreeMap::new();
        values.insert("t".to_string(), 1.0);

        let first = Envelope::new("node-a".to_string(), values.clone(), 10);
        let second = Envelope::new("node-a".to_string(), values, 10);

        assert_ne!(first.message_id, second.message_id);
    }

    #[test]
    fn test_forwarded_decrements_ttl_by_one() {
        let mut values = BTreeMap::new();
        values.insert("t".to_string(), 1.0);
        let envelope = Envelope::new("node-a".to_string(), values, 5);

        let copy = envelope.forwarded();

        assert_eq!(copy.ttl, 4);
        assert_eq!(copy.message_id, envelope.message_id);
        assert_eq!(copy.values, envelope.values);
    }
}
