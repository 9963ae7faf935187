//! sensordump core library for offline sensor-log conversion.
//!
//! This crate implements the conversion pipelines used by the CLI: frame
//! sources feed the record decoder (layout/reader/parser), decoded records
//! become point clouds or height maps, and sinks write them out as PLY, PCD,
//! text, PNG or array archives. Every run returns a [`Report`] that lists the
//! outputs written and the diagnostics raised on the way.
//!
//! Invariants:
//! - A malformed frame never aborts a run; it becomes a [`Diagnostic`].
//! - Decoding is byte-oriented and side-effect free; all I/O lives in
//!   `source` and `sink`.
//! - Frames are processed in stream order and reports list them in that order.
//!
//! # Examples
//! ```no_run
//! use sensordump_core::{ConversionConfig, convert_lidar_log};
//!
//! let report = convert_lidar_log(&ConversionConfig::new("scan.msgpack", "frames"))?;
//! println!("frames converted: {}", report.frames.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

mod cloud;
mod config;
mod convert;
pub mod decode;
mod diagnostics;
mod frame;
mod heightmap;
pub mod sink;
pub mod source;

pub use cloud::{CloudStats, PointCloud, Range};
pub use config::{ConversionConfig, ConversionOptions, OutputFormat};
pub use convert::{
    ConvertError, convert_height_maps, convert_lidar_log, convert_text_dump, merge_json_frames,
    overlay_ply_renders,
};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use frame::{Frame, FrameError};
pub use heightmap::{HeightMap, HeightMapMetadata, INVALID_HEIGHT, jet};

/// Diagnostic identifiers carried in [`Diagnostic::id`].
pub mod ids {
    pub use crate::diagnostics::{
        ID_DECODE_ERROR, ID_EMPTY_FRAME, ID_INVALID_FIELD, ID_LENGTH_MISMATCH, ID_MISSING_FIELD,
        ID_NOT_A_MAP, ID_PARTIAL_STRIDE, ID_SOURCE_ERROR, ID_WRITE_FAILED,
    };
}

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no frame carried a stamp.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Outcome of one conversion run.
///
/// # Examples
/// ```
/// use sensordump_core::make_stub_report;
///
/// let report = make_stub_report("text", "dump.txt", Some(42));
/// assert_eq!(report.report_version, sensordump_core::REPORT_VERSION);
/// assert!(report.outputs.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// RFC3339 time of the last frame stamp, or [`DEFAULT_GENERATED_AT`].
    pub generated_at: String,
    /// Conversion name (`text`, `lidar`, `heightmap`, `merge`, `overlay`).
    pub conversion: String,
    pub input: InputInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_summary: Option<FramesSummary>,
    /// Per-frame results in stream order.
    pub frames: Vec<FrameSummary>,
    /// Written files, in write order.
    pub outputs: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|entry| entry.severity == Severity::Warning)
    }
}

/// Tool metadata embedded in reports.
///
/// # Examples
/// ```
/// use sensordump_core::ToolInfo;
///
/// let tool = ToolInfo {
///     name: "sensordump".to_string(),
///     version: "0.1.0".to_string(),
/// };
/// assert_eq!(tool.name, "sensordump");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the conversion.
    pub path: String,
    /// Input size in bytes; absent for directory inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
}

/// Frame counters for a run (timestamps may be absent).
///
/// # Examples
/// ```
/// use sensordump_core::FramesSummary;
///
/// let summary = FramesSummary {
///     frames_total: 3,
///     frames_converted: 2,
///     frames_skipped: 1,
///     records_total: 2048,
///     time_start: None,
///     time_end: None,
/// };
/// assert_eq!(summary.frames_total, summary.frames_converted + summary.frames_skipped);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramesSummary {
    pub frames_total: u64,
    pub frames_converted: u64,
    pub frames_skipped: u64,
    /// Records (points or cells) that reached at least one output.
    pub records_total: u64,
    /// RFC3339 time of the earliest frame stamp (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// RFC3339 time of the latest frame stamp (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameStatus {
    Converted,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Zero-based position in the input stream.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stamp: Option<f64>,
    pub records: u64,
    pub status: FrameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CloudStats>,
    /// Frame fields other than the payload (lidar frames only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Build a stub report with base fields filled and nothing converted.
pub fn make_stub_report(conversion: &str, input_path: &str, input_bytes: Option<u64>) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "sensordump".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        conversion: conversion.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        frames_summary: None,
        frames: vec![],
        outputs: vec![],
        diagnostics: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_report_serializes_without_optional_sections() {
        let report = make_stub_report("merge", "frames/", None);
        let value = serde_json::to_value(&report).expect("json");
        assert_eq!(value["conversion"], "merge");
        assert!(value.get("frames_summary").is_none());
        assert!(value["input"].get("bytes").is_none());
        assert_eq!(value["generated_at"], DEFAULT_GENERATED_AT);
    }

    #[test]
    fn report_round_trips_through_json() {
        let mut report = make_stub_report("lidar", "scan.msgpack", Some(10));
        report.frames.push(FrameSummary {
            index: 0,
            stamp: Some(1.5),
            records: 0,
            status: FrameStatus::Skipped,
            stats: None,
            metadata: None,
        });
        let text = serde_json::to_string(&report).expect("json");
        let back: Report = serde_json::from_str(&text).expect("parse");
        assert_eq!(back.frames[0].status, FrameStatus::Skipped);
        assert_eq!(back.input.bytes, Some(10));
        assert!(!back.has_warnings());
    }
}
