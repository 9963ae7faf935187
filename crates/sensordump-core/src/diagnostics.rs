//! Side channel for anomalies found during a conversion.
//!
//! Every recoverable problem (dropped tail, skipped frame, unreadable
//! file, failed write) becomes one [`Diagnostic`]. The collector also
//! forwards each entry to the `log` facade so interactive runs see it as it
//! happens, while callers and tests read the structured list from the
//! report.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::decode::DecodeIssue;

pub const ID_LENGTH_MISMATCH: &str = "SD-LENGTH-MISMATCH";
pub const ID_PARTIAL_STRIDE: &str = "SD-PARTIAL-STRIDE";
pub const ID_MISSING_FIELD: &str = "SD-MISSING-FIELD";
pub const ID_INVALID_FIELD: &str = "SD-INVALID-FIELD";
pub const ID_NOT_A_MAP: &str = "SD-NOT-A-MAP";
pub const ID_SOURCE_ERROR: &str = "SD-SOURCE-ERROR";
pub const ID_DECODE_ERROR: &str = "SD-DECODE-ERROR";
pub const ID_WRITE_FAILED: &str = "SD-WRITE-FAILED";
pub const ID_EMPTY_FRAME: &str = "SD-EMPTY-FRAME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
        }
    }
}

/// Single anomaly record.
///
/// # Examples
/// ```
/// use sensordump_core::{Diagnostic, Severity};
///
/// let diagnostic = Diagnostic {
///     id: "SD-MISSING-FIELD".to_string(),
///     severity: Severity::Warning,
///     frame: Some(3),
///     message: "missing field 'points'".to_string(),
/// };
/// assert_eq!(diagnostic.frame, Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable identifier (e.g., `SD-LENGTH-MISMATCH`).
    pub id: String,
    pub severity: Severity,
    /// Zero-based frame index, when the anomaly belongs to one frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<usize>,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        let at = diagnostic
            .frame
            .map(|index| format!("frame {index}: "))
            .unwrap_or_default();
        match diagnostic.severity {
            Severity::Warning => warn!("{at}{} ({})", diagnostic.message, diagnostic.id),
            Severity::Info => debug!("{at}{} ({})", diagnostic.message, diagnostic.id),
        }
        self.entries.push(diagnostic);
    }

    pub fn warn(&mut self, frame: Option<usize>, id: &str, message: impl Into<String>) {
        self.push(Diagnostic {
            id: id.to_string(),
            severity: Severity::Warning,
            frame,
            message: message.into(),
        });
    }

    pub fn info(&mut self, frame: Option<usize>, id: &str, message: impl Into<String>) {
        self.push(Diagnostic {
            id: id.to_string(),
            severity: Severity::Info,
            frame,
            message: message.into(),
        });
    }

    pub fn record_issue(&mut self, frame: Option<usize>, issue: &DecodeIssue) {
        match issue {
            DecodeIssue::LengthMismatch {
                len,
                arity,
                dropped,
                policy,
            } => self.warn(
                frame,
                ID_LENGTH_MISMATCH,
                format!(
                    "{len} values are not divisible by {arity}; {dropped} value(s) dropped ({})",
                    policy.as_str()
                ),
            ),
            DecodeIssue::PartialStride {
                len,
                stride,
                dropped_bytes,
            } => self.info(
                frame,
                ID_PARTIAL_STRIDE,
                format!(
                    "{len} bytes are not a multiple of point step {stride}; trailing {dropped_bytes} byte(s) ignored"
                ),
            ),
        }
    }

    pub fn record_issues(&mut self, frame: Option<usize>, issues: &[DecodeIssue]) {
        for issue in issues {
            self.record_issue(frame, issue);
        }
    }

    pub fn has_warnings(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.severity == Severity::Warning)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::LengthPolicy;

    #[test]
    fn length_mismatch_is_a_warning_with_drop_count() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record_issue(
            None,
            &DecodeIssue::LengthMismatch {
                len: 5,
                arity: 3,
                dropped: 2,
                policy: LengthPolicy::Truncate,
            },
        );
        assert!(diagnostics.has_warnings());
        let entry = &diagnostics.as_slice()[0];
        assert_eq!(entry.id, ID_LENGTH_MISMATCH);
        assert!(entry.message.contains("2 value(s) dropped"));
    }

    #[test]
    fn partial_stride_is_informational() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record_issue(
            Some(1),
            &DecodeIssue::PartialStride {
                len: 16,
                stride: 12,
                dropped_bytes: 4,
            },
        );
        assert!(!diagnostics.has_warnings());
        assert_eq!(diagnostics.as_slice()[0].frame, Some(1));
    }

    #[test]
    fn frame_is_omitted_from_json_when_absent() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(None, ID_SOURCE_ERROR, "unreadable");
        let value = serde_json::to_value(diagnostics.into_vec()).expect("json");
        assert!(value[0].get("frame").is_none());
        assert_eq!(value[0]["severity"], "warning");
    }
}
