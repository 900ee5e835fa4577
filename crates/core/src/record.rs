//! ripgrep `--json` output records.
//!
//! Every line of output is one message tagged by `type` (`begin`, `match`,
//! `context`, `end`, `summary`). Only `match` messages are kept.

use base64::Engine;
use serde::Deserialize;

/// ripgrep's encoding for paths and line text: UTF-8 as `text`, anything else
/// base64-encoded as `bytes`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ArbitraryData {
    Text { text: String },
    Bytes { bytes: String },
}

impl ArbitraryData {
    pub fn to_string_lossy(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Bytes { bytes } => base64::engine::general_purpose::STANDARD
                .decode(bytes)
                .map(|raw| String::from_utf8_lossy(&raw).into_owned())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubMatch {
    #[serde(rename = "match")]
    pub matched: ArbitraryData,
    pub start: usize,
    pub end: usize,
}

/// Payload of a `match` message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawMatchRecord {
    pub path: ArbitraryData,
    pub lines: ArbitraryData,
    pub line_number: u64,
    #[serde(default)]
    pub absolute_offset: Option<u64>,
    #[serde(default)]
    pub submatches: Vec<SubMatch>,
}

/// Parses one output line. `None` for anything that is not a well-formed
/// match message.
pub fn parse_line(line: &str) -> Option<RawMatchRecord> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    if value.get("type").and_then(|t| t.as_str()) != Some("match") {
        return None;
    }
    let data = value.get("data")?.clone();
    match serde_json::from_value(data) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::debug!(error = %e, "skipping malformed match record");
            None
        }
    }
}

/// Scans captured stdout in emission order, keeping at most `max` matches.
pub fn parse_output(output: &str, max: usize) -> Vec<RawMatchRecord> {
    let mut records = Vec::new();
    if max == 0 {
        return records;
    }
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(record) = parse_line(line) {
            records.push(record);
            if records.len() >= max {
                break;
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATCH_A: &str = r#"{"type":"match","data":{"path":{"text":"./src/a.rs"},"lines":{"text":"fn needle() {}\n"},"line_number":3,"absolute_offset":40,"submatches":[{"match":{"text":"needle"},"start":3,"end":9}]}}"#;
    const MATCH_B: &str = r#"{"type":"match","data":{"path":{"text":"./src/b.rs"},"lines":{"text":"let NEEDLE = 1;\n"},"line_number":7,"absolute_offset":90,"submatches":[{"match":{"text":"NEEDLE"},"start":4,"end":10}]}}"#;
    const CONTEXT: &str = r#"{"type":"context","data":{"path":{"text":"./src/a.rs"},"lines":{"text":"\n"},"line_number":2,"absolute_offset":39,"submatches":[]}}"#;
    const BEGIN: &str = r#"{"type":"begin","data":{"path":{"text":"./src/a.rs"}}}"#;
    const SUMMARY: &str = r#"{"type":"summary","data":{"elapsed_total":{"secs":0,"nanos":1,"human":"0s"},"stats":{}}}"#;

    #[test]
    fn parses_match_line() {
        let record = parse_line(MATCH_A).unwrap();
        assert_eq!(record.path.to_string_lossy(), "./src/a.rs");
        assert_eq!(record.line_number, 3);
        assert_eq!(record.absolute_offset, Some(40));
        assert_eq!(record.submatches.len(), 1);
        assert_eq!(record.submatches[0].start, 3);
        assert_eq!(record.submatches[0].matched.to_string_lossy(), "needle");
    }

    #[test]
    fn non_match_messages_are_skipped() {
        assert!(parse_line(BEGIN).is_none());
        assert!(parse_line(CONTEXT).is_none());
        assert!(parse_line(SUMMARY).is_none());
    }

    #[test]
    fn malformed_lines_are_skipped_and_order_kept() {
        let output = [
            BEGIN,
            "{not json",
            MATCH_A,
            CONTEXT,
            "garbage",
            r#"{"type":"match","data":{"path":{"text":"x"}}}"#,
            MATCH_B,
            SUMMARY,
        ]
        .join("\n");

        let records = parse_output(&output, 100);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line_number, 3);
        assert_eq!(records[1].line_number, 7);
        assert_eq!(records[1].path.to_string_lossy(), "./src/b.rs");
    }

    #[test]
    fn stops_at_max() {
        let output = [MATCH_A, MATCH_B, MATCH_A, MATCH_B].join("\n");
        assert_eq!(parse_output(&output, 3).len(), 3);
        assert_eq!(parse_output(&output, 1).len(), 1);
        assert!(parse_output(&output, 0).is_empty());
    }

    #[test]
    fn empty_output() {
        assert!(parse_output("", 10).is_empty());
        assert!(parse_output("\n\n", 10).is_empty());
    }

    #[test]
    fn bytes_are_decoded() {
        // "caf\xe9" is not valid UTF-8, so rg falls back to base64.
        let line = r#"{"type":"match","data":{"path":{"bytes":"Y2Fm6S50eHQ="},"lines":{"text":"x\n"},"line_number":1,"submatches":[]}}"#;
        let record = parse_line(line).unwrap();
        assert_eq!(record.path.to_string_lossy(), "caf\u{FFFD}.txt");
        assert!(record.absolute_offset.is_none());
    }
}
