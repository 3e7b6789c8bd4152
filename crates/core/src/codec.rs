//! Base64 helpers for binary artifacts carried inside JSON records.

use base64::Engine as _;

use crate::error::CoreError;

/// Encode bytes with the standard alphabet.
pub fn encode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode a standard-alphabet base64 string.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, CoreError> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| CoreError::Validation(format!("invalid base64 payload: {e}")))
}

/// `#[serde(with = "crate::codec::base64_bytes")]` for `Vec<u8>` fields.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_base64(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        super::decode_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_value() {
        assert_eq!(encode_base64(b"hello"), "aGVsbG8=");
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_base64("not base64!!").is_err());
    }

    #[derive(Debug, serde::Deserialize)]
    struct Blob {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    }

    #[test]
    fn serde_adapter_decodes_and_reports_bad_input() {
        let blob: Blob = serde_json::from_str(r#"{"data":"aGVsbG8="}"#).unwrap();
        assert_eq!(blob.data, b"hello");

        let err = serde_json::from_str::<Blob>(r#"{"data":"%%%"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid base64 payload"));
    }
}
