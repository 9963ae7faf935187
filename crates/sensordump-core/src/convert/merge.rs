use log::info;

use super::run::RunState;
use super::{ConvertError, ensure_parent, output_for, require_dir};
use crate::Report;
use crate::cloud::PointCloud;
use crate::config::{ConversionConfig, OutputFormat};
use crate::decode::layout::DEFAULT_POINT_STEP;
use crate::decode::{Xyz, decode_strided};
use crate::diagnostics::ID_DECODE_ERROR;
use crate::frame::{FIELD_DATA, FIELD_POINT_STEP, Frame, FrameError};
use crate::sink::raster::render_top_down;
use crate::sink::{CloudFormat, SinkError, write_cloud_file};
use crate::source::{FrameSource, JsonDirSource};

const CONVERSION: &str = "merge";

/// Merge a directory of per-frame JSON files into one point cloud.
///
/// Each file carries a packed byte buffer in `data` and its record stride in
/// `point_step` (12 when absent). Records are read as xyz and appended in
/// file-name order. With `options.preview`, a top-down PNG is written next
/// to the cloud file.
pub fn merge_json_frames(config: &ConversionConfig) -> Result<Report, ConvertError> {
    require_dir(&config.input)?;
    let targets = config
        .formats_or(&[OutputFormat::Ply])
        .into_iter()
        .map(|format| {
            format.cloud_format().ok_or(ConvertError::UnsupportedFormat {
                conversion: CONVERSION,
                format,
            })
        })
        .collect::<Result<Vec<CloudFormat>, _>>()?;
    ensure_parent(&config.output)?;

    let mut state = RunState::new(CONVERSION);
    let mut merged = PointCloud::default();
    let mut source = JsonDirSource::open(&config.input)?;
    info!("{}: {} frame file(s)", config.input.display(), source.remaining());
    loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(err) => {
                state.source_error(&err);
                continue;
            }
        };
        if let Some(records) = decode_frame(&frame, &mut state) {
            state.converted(frame.index(), frame.stamp().ok(), records.len(), None);
            merged.extend(PointCloud::from_xyz(records));
        }
    }

    let single = targets.len() == 1;
    for format in &targets {
        let path = output_for(&config.output, format.extension(), single);
        write_cloud_file(format.writer().as_ref(), &merged, &path)?;
        state.output(&path);
    }
    if config.options.preview {
        let path = config.output.with_extension("png");
        render_top_down(&merged, config.options.canvas)
            .save(&path)
            .map_err(SinkError::from)?;
        state.output(&path);
    }
    state.finish(&config.input)
}

fn decode_frame(frame: &Frame, state: &mut RunState) -> Option<Vec<Xyz>> {
    let index = frame.index();
    let stamp = frame.stamp().ok();
    let (stride, payload) = match packed_payload(frame) {
        Ok(parts) => parts,
        Err(err) => {
            state.frame_error(index, stamp, &err);
            return None;
        }
    };
    match decode_strided::<3>(&payload, stride) {
        Ok(decoded) => {
            state.diagnostics.record_issues(Some(index), &decoded.issues);
            Some(decoded.records)
        }
        Err(err) => {
            state
                .diagnostics
                .warn(Some(index), ID_DECODE_ERROR, err.to_string());
            state.skipped(index, stamp);
            None
        }
    }
}

fn packed_payload(frame: &Frame) -> Result<(usize, Vec<u8>), FrameError> {
    let stride = if frame.contains(FIELD_POINT_STEP) {
        frame.point_step()?
    } else {
        DEFAULT_POINT_STEP
    };
    Ok((stride, frame.byte_payload(FIELD_DATA)?))
}
