use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use super::run::RunState;
use super::{ConvertError, require_file};
use crate::Report;
use crate::cloud::PointCloud;
use crate::config::{ConversionConfig, OutputFormat};
use crate::decode::{LengthPolicy, reshape_scalars};
use crate::frame::{FIELD_POINTS, Frame};
use crate::sink::raster::render_top_down;
use crate::sink::snapshot::{snapshot_name, write_frame_snapshot};
use crate::sink::{CloudFormat, SinkError, write_cloud_file};
use crate::source::{FrameSource, MsgpackFileSource};

const CONVERSION: &str = "lidar";
const SNAPSHOT_DIR: &str = "snapshots";

enum Target {
    Cloud(CloudFormat),
    Render,
}

/// Convert a MessagePack lidar log into one point-cloud file per frame.
///
/// Each frame's `points` field is a flat `x, y, z, intensity` sequence.
/// Frames whose length is not a multiple of 4 are skipped by default. Files
/// are named `frame_NNNN.<ext>` after the zero-based frame index and written
/// into `config.output`; with snapshots enabled every frame is first copied
/// to `snapshots/frame_NNNN.json`, numbered from 1. Fields other than
/// `points` are kept as the frame's metadata in the report.
pub fn convert_lidar_log(config: &ConversionConfig) -> Result<Report, ConvertError> {
    require_file(&config.input)?;
    let targets = config
        .formats_or(&[OutputFormat::Pcd, OutputFormat::Ply])
        .into_iter()
        .map(|format| match (format, format.cloud_format()) {
            (_, Some(cloud)) => Ok(Target::Cloud(cloud)),
            (OutputFormat::Png, None) => Ok(Target::Render),
            (format, None) => Err(ConvertError::UnsupportedFormat {
                conversion: CONVERSION,
                format,
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let policy = config.length_policy_or(LengthPolicy::SkipFrame);

    fs::create_dir_all(&config.output)?;
    let snapshot_dir = config.output.join(SNAPSHOT_DIR);
    if config.options.snapshots {
        fs::create_dir_all(&snapshot_dir)?;
    }

    let mut state = RunState::new(CONVERSION);
    let mut source = MsgpackFileSource::open(&config.input)?;
    loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(err) => {
                state.source_error(&err);
                continue;
            }
        };
        if config.options.snapshots {
            let number = frame.index() + 1;
            match write_frame_snapshot(&frame, &snapshot_dir, number) {
                Ok(path) => state.output(&path),
                Err(err) => {
                    let path = snapshot_dir.join(snapshot_name(number));
                    state.write_failed(Some(frame.index()), &path, &err);
                }
            }
        }
        convert_frame(&frame, policy, &targets, config, &mut state);
    }

    info!(
        "{}: {} output file(s)",
        config.input.display(),
        state.output_count()
    );
    state.finish(&config.input)
}

fn convert_frame(
    frame: &Frame,
    policy: LengthPolicy,
    targets: &[Target],
    config: &ConversionConfig,
    state: &mut RunState,
) {
    let index = frame.index();
    let stamp = frame.stamp().ok();
    let values = match frame.scalar_payload(FIELD_POINTS) {
        Ok(values) => values,
        Err(err) => {
            state.frame_error(index, stamp, &err);
            return;
        }
    };
    let decoded = reshape_scalars::<4>(&values, policy);
    state.diagnostics.record_issues(Some(index), &decoded.issues);
    if decoded.is_empty() && !values.is_empty() {
        state.skipped(index, stamp);
        return;
    }

    let cloud = PointCloud::from_xyzi(&decoded.records);
    for target in targets {
        write_target(frame, &cloud, target, config, state);
    }
    state.converted(index, stamp, cloud.len(), cloud.stats());
    state.frame_metadata(frame.metadata_without(FIELD_POINTS));
}

fn write_target(
    frame: &Frame,
    cloud: &PointCloud,
    target: &Target,
    config: &ConversionConfig,
    state: &mut RunState,
) {
    let index = frame.index();
    let path = match target {
        Target::Cloud(format) => frame_path(&config.output, index, format.extension()),
        Target::Render => frame_path(&config.output, index, "png"),
    };
    let written = match target {
        Target::Cloud(format) => write_cloud_file(format.writer().as_ref(), cloud, &path),
        Target::Render => render_top_down(cloud, config.options.canvas)
            .save(&path)
            .map_err(SinkError::from),
    };
    match written {
        Ok(()) => state.output(&path),
        Err(err) => state.write_failed(Some(index), &path, &err),
    }
}

fn frame_path(dir: &Path, index: usize, extension: &str) -> PathBuf {
    dir.join(format!("frame_{index:04}.{extension}"))
}
