use serde::{Deserialize, Serialize};

use crate::record::RawMatchRecord;

/// Flat, display-ready view of a single matching line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedMatch {
    pub file: String,
    pub line: u64,
    /// Byte offset of the first submatch within the line.
    pub column: usize,
    pub match_text: String,
    pub line_text: String,
}

impl From<&RawMatchRecord> for FormattedMatch {
    fn from(record: &RawMatchRecord) -> Self {
        let first = record.submatches.first();
        Self {
            file: record.path.to_string_lossy(),
            line: record.line_number,
            column: first.map(|m| m.start).unwrap_or(0),
            match_text: first
                .map(|m| m.matched.to_string_lossy())
                .unwrap_or_default(),
            line_text: record.lines.to_string_lossy(),
        }
    }
}

pub fn format_matches(records: &[RawMatchRecord]) -> Vec<FormattedMatch> {
    records.iter().map(FormattedMatch::from).collect()
}

impl FormattedMatch {
    /// Directory part of `file`, empty when the file sits at the root.
    pub fn dir(&self) -> &str {
        self.file.rsplit_once('/').map(|(d, _)| d).unwrap_or("")
    }

    pub fn file_name(&self) -> &str {
        self.file.rsplit_once('/').map(|(_, n)| n).unwrap_or(&self.file)
    }
}
