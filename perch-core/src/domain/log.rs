//! Log domain types

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// A single line of a step's log stream
///
/// The payload arrives base64 encoded so arbitrary bytes survive the JSON
/// transport; call [`LogEntry::decode`] before displaying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub step_id: i64,
    pub line: i64,
    #[serde(default)]
    pub time: i64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub data: String,
    #[serde(default, rename = "type")]
    pub entry_type: i32,
}

impl LogEntry {
    /// Decode the payload into display text
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected; only a
    /// malformed base64 payload is an error.
    pub fn decode(&self) -> Result<String, base64::DecodeError> {
        let bytes = STANDARD.decode(self.data.as_bytes())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Whether the entry carries no payload at all
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(line: i64, data: &str) -> LogEntry {
        LogEntry {
            id: 0,
            step_id: 3,
            line,
            time: 0,
            data: data.to_string(),
            entry_type: 0,
        }
    }

    #[test]
    fn test_decode_valid_payload() {
        let encoded = STANDARD.encode("cargo test --all");
        assert_eq!(entry(1, &encoded).decode().unwrap(), "cargo test --all");
    }

    #[test]
    fn test_decode_invalid_payload() {
        assert!(entry(1, "%%% not base64 %%%").decode().is_err());
    }

    #[test]
    fn test_decode_non_utf8_is_lossy() {
        let encoded = STANDARD.encode([0x66, 0x6f, 0xff, 0x6f]);
        assert_eq!(entry(1, &encoded).decode().unwrap(), "fo\u{fffd}o");
    }

    #[test]
    fn test_deserialize_backend_shape() {
        let json = serde_json::json!({
            "id": 10,
            "step_id": 3,
            "line": 0,
            "time": 12,
            "data": "aGVsbG8=",
            "type": 0
        });
        let entry: LogEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry.decode().unwrap(), "hello");
    }

    #[test]
    fn test_null_payload_is_empty() {
        let entries: Vec<LogEntry> = serde_json::from_value(serde_json::json!([
            { "line": 0, "data": "aGVsbG8=" },
            { "line": 1, "data": null, "type": 2 },
            { "line": 2 }
        ]))
        .unwrap();

        assert_eq!(entries.len(), 3);
        assert!(!entries[0].is_empty());
        assert!(entries[1].is_empty());
        assert_eq!(entries[1].entry_type, 2);
        assert!(entries[2].is_empty());
    }
}
