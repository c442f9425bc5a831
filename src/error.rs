//! Per-line and per-batch conditions reported by the record assembler.
//!
//! None of these abort a conversion: the offending line (or batch) is
//! dropped and the condition is handed back to the caller.

use thiserror::Error;

/// Why a single line-MARC line was not turned into a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    /// The line does not start with the `*` field marker.
    #[error("unrecognized line (no '*' marker): {line:?}")]
    UnrecognizedLine { line: String },

    /// The line has the marker but is too short for the fixed-offset
    /// part of the field it claims to be.
    #[error("malformed line ({found} characters, need at least {needed} for {part}): {line:?}")]
    MalformedLine {
        line: String,
        part: &'static str,
        needed: usize,
        found: usize,
    },
}

/// A line that was dropped from a batch, with its 0-based position in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub index: usize,
    pub error: LineError,
}

/// A batch with no usable line. No record is produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record batch has no usable lines ({} skipped)", skipped.len())]
pub struct EmptyBatch {
    pub skipped: Vec<SkippedLine>,
}
