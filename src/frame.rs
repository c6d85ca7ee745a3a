//! Wire contract for the device link: newline-terminated JSON text frames.

use serde::Serialize;
use serde_json::Value;

/// Outbound command record.
///
/// The device dispatches on the numeric `T` field of each JSON frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Command {
    #[serde(rename = "T")]
    pub opcode: u32,
}

impl Command {
    /// Serialize to one compact newline-terminated frame.
    pub fn encode_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line.into_bytes())
    }
}

/// Decode raw port bytes as text. Invalid sequences are replaced, never fatal.
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

/// Split decoded text into candidate frames: newline-delimited, trimmed,
/// with empty lines skipped.
pub fn split_frames(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(str::trim).filter(|line| !line.is_empty())
}

/// Parse one candidate frame as a JSON value.
pub fn parse_frame(line: &str) -> serde_json::Result<Value> {
    serde_json::from_str(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_exact_wire_bytes() {
        let frame = Command { opcode: 1001 }.encode_line().expect("serialize");
        assert_eq!(frame, b"{\"T\":1001}\n");
    }

    #[test]
    fn splits_and_trims_candidate_frames() {
        let lines: Vec<_> = split_frames("\r\n{\"ok\": true}\n\n  {bad  \n").collect();
        assert_eq!(lines, vec!["{\"ok\": true}", "{bad"]);
    }

    #[test]
    fn malformed_frame_does_not_stop_later_frames() {
        let decoded = "{bad\n{\"ok\": true}\n";
        let results: Vec<_> = split_frames(decoded).map(parse_frame).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        let value = results[1].as_ref().expect("second frame is valid JSON");
        assert_eq!(value["ok"], Value::Bool(true));
    }

    #[test]
    fn lossy_decode_never_fails() {
        let decoded = decode_lossy(b"\xff\xfe{\"ok\":true}\n");
        assert!(decoded.contains("{\"ok\":true}"));
    }

    #[test]
    fn lossy_decode_of_clean_input_is_verbatim() {
        assert_eq!(decode_lossy(b"{\"T\":1001}\n"), "{\"T\":1001}\n");
    }
}
