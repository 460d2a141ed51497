//! Base64 codec for YAML editor buffers
//!
//! Document contents always cross the wire as base64 of UTF-8 text.

use crate::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode editor text for the `yaml` envelope field.
pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode a `yaml` envelope field back into editor text.
pub fn decode(payload: &str) -> Result<String> {
    let bytes = STANDARD.decode(payload.trim())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_ascii_and_unicode() {
        for text in [
            "a: 1",
            "",
            "kind: Secret\nmetadata:\n  name: äöü-ß\n",
            "名前: クラスタ 🚀",
        ] {
            assert_eq!(decode(&encode(text)).unwrap(), text);
        }
    }

    #[test]
    fn test_known_encoding() {
        assert_eq!(encode("a: 1"), "YTogMQ==");
    }

    #[test]
    fn test_invalid_payload_is_an_error() {
        assert!(decode("not base64!").is_err());
        // valid base64, invalid UTF-8
        assert!(decode("/w==").is_err());
    }
}
