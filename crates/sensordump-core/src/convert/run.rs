use std::path::Path;

use log::{debug, info};
use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use super::ConvertError;
use crate::cloud::CloudStats;
use crate::diagnostics::{
    Diagnostics, ID_NOT_A_MAP, ID_SOURCE_ERROR, ID_WRITE_FAILED,
};
use crate::frame::FrameError;
use crate::sink::SinkError;
use crate::source::SourceError;
use crate::{
    DEFAULT_GENERATED_AT, FrameStatus, FrameSummary, FramesSummary, Report, make_stub_report,
};

/// Bookkeeping shared by all pipelines while a run is in progress.
pub(super) struct RunState {
    conversion: &'static str,
    pub(super) diagnostics: Diagnostics,
    frames: Vec<FrameSummary>,
    outputs: Vec<String>,
    frames_converted: u64,
    frames_skipped: u64,
    records_total: u64,
    first_ts: Option<f64>,
    last_ts: Option<f64>,
}

impl RunState {
    pub(super) fn new(conversion: &'static str) -> Self {
        Self {
            conversion,
            diagnostics: Diagnostics::new(),
            frames: Vec::new(),
            outputs: Vec::new(),
            frames_converted: 0,
            frames_skipped: 0,
            records_total: 0,
            first_ts: None,
            last_ts: None,
        }
    }

    pub(super) fn converted(
        &mut self,
        index: usize,
        stamp: Option<f64>,
        records: usize,
        stats: Option<CloudStats>,
    ) {
        debug!("frame {index}: {records} record(s)");
        update_ts_bounds(&mut self.first_ts, &mut self.last_ts, stamp);
        self.frames_converted += 1;
        self.records_total += records as u64;
        self.frames.push(FrameSummary {
            index,
            stamp,
            records: records as u64,
            status: FrameStatus::Converted,
            stats,
            metadata: None,
        });
    }

    /// Attach frame metadata to the most recently recorded frame.
    pub(super) fn frame_metadata(&mut self, metadata: Map<String, Value>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.metadata = (!metadata.is_empty()).then_some(metadata);
        }
    }

    pub(super) fn skipped(&mut self, index: usize, stamp: Option<f64>) {
        debug!("frame {index}: skipped");
        update_ts_bounds(&mut self.first_ts, &mut self.last_ts, stamp);
        self.frames_skipped += 1;
        self.frames.push(FrameSummary {
            index,
            stamp,
            records: 0,
            status: FrameStatus::Skipped,
            stats: None,
            metadata: None,
        });
    }

    pub(super) fn output(&mut self, path: &Path) {
        info!("wrote {}", path.display());
        self.outputs.push(path.display().to_string());
    }

    pub(super) fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Record a source failure; frames the source had started count as skipped.
    pub(super) fn source_error(&mut self, err: &SourceError) {
        let id = match err {
            SourceError::NotAMap { .. } => ID_NOT_A_MAP,
            _ => ID_SOURCE_ERROR,
        };
        let frame = err.frame_index();
        self.diagnostics.warn(frame, id, err.to_string());
        if let Some(index) = frame {
            self.skipped(index, None);
        }
    }

    pub(super) fn frame_error(&mut self, index: usize, stamp: Option<f64>, err: &FrameError) {
        self.diagnostics
            .warn(Some(index), err.diagnostic_id(), err.to_string());
        self.skipped(index, stamp);
    }

    pub(super) fn write_failed(&mut self, frame: Option<usize>, path: &Path, err: &SinkError) {
        self.diagnostics.warn(
            frame,
            ID_WRITE_FAILED,
            format!("failed to write {}: {err}", path.display()),
        );
    }

    pub(super) fn finish(self, input: &Path) -> Result<Report, ConvertError> {
        let meta = input.metadata()?;
        let bytes = meta.is_file().then(|| meta.len());
        let mut report = make_stub_report(self.conversion, &input.display().to_string(), bytes);
        report.frames_summary = Some(FramesSummary {
            frames_total: self.frames_converted + self.frames_skipped,
            frames_converted: self.frames_converted,
            frames_skipped: self.frames_skipped,
            records_total: self.records_total,
            time_start: ts_to_rfc3339(self.first_ts),
            time_end: ts_to_rfc3339(self.last_ts),
        });
        report.generated_at = report
            .frames_summary
            .as_ref()
            .and_then(|summary| summary.time_end.clone().or(summary.time_start.clone()))
            .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());
        report.frames = self.frames;
        report.outputs = self.outputs;
        report.diagnostics = self.diagnostics.into_vec();
        Ok(report)
    }
}

fn update_ts_bounds(first: &mut Option<f64>, last: &mut Option<f64>, ts: Option<f64>) {
    let Some(ts) = ts.filter(|ts| ts.is_finite()) else {
        return;
    };
    if first.is_none_or(|existing| ts < existing) {
        *first = Some(ts);
    }
    if last.is_none_or(|existing| ts > existing) {
        *last = Some(ts);
    }
}

fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn ts_bounds_ignore_missing_and_non_finite() {
        let (mut first, mut last) = (None, None);
        update_ts_bounds(&mut first, &mut last, Some(5.0));
        update_ts_bounds(&mut first, &mut last, None);
        update_ts_bounds(&mut first, &mut last, Some(f64::NAN));
        update_ts_bounds(&mut first, &mut last, Some(2.0));
        assert_eq!((first, last), (Some(2.0), Some(5.0)));
    }

    #[test]
    fn rfc3339_formats_unix_seconds() {
        assert_eq!(
            ts_to_rfc3339(Some(1.5)).as_deref(),
            Some("1970-01-01T00:00:01.5Z")
        );
        assert_eq!(ts_to_rfc3339(None), None);
    }

    #[test]
    fn finish_counts_converted_and_skipped() {
        let input = NamedTempFile::new().expect("tempfile");
        let mut state = RunState::new("lidar");
        state.converted(0, Some(10.0), 3, None);
        state.source_error(&SourceError::NotAMap { index: 1 });
        state.frame_error(
            2,
            Some(12.0),
            &FrameError::MissingField {
                field: "points".to_string(),
            },
        );

        let report = state.finish(input.path()).unwrap();
        let summary = report.frames_summary.unwrap();
        assert_eq!(summary.frames_total, 3);
        assert_eq!(summary.frames_skipped, 2);
        assert_eq!(summary.records_total, 3);
        assert_eq!(report.generated_at, "1970-01-01T00:00:12Z");
        assert_eq!(report.diagnostics.len(), 2);
        assert_eq!(report.diagnostics[0].id, ID_NOT_A_MAP);
        assert_eq!(report.input.bytes, Some(0));
    }
}
