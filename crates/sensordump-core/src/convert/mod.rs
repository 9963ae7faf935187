//! Conversion pipelines.
//!
//! Each pipeline is one pass: open the source, walk its frames in order,
//! write outputs, and return a [`Report`](crate::Report). Only a missing input,
//! an unusable format request or a failure to create the output location
//! aborts a run; everything that goes wrong with a single frame is recorded
//! as a diagnostic and the loop moves on.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::OutputFormat;
use crate::sink::SinkError;
use crate::source::SourceError;

mod heightmap;
mod lidar;
mod merge;
mod overlay;
mod run;
mod text;

pub use heightmap::convert_height_maps;
pub use lidar::convert_lidar_log;
pub use merge::merge_json_frames;
pub use overlay::overlay_ply_renders;
pub use text::convert_text_dump;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input not found: {0}")]
    MissingInput(PathBuf),
    #[error("{conversion} conversion cannot write {} output", .format.as_str())]
    UnsupportedFormat {
        conversion: &'static str,
        format: OutputFormat,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

fn require_file(path: &Path) -> Result<(), ConvertError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConvertError::MissingInput(path.to_path_buf()))
    }
}

fn require_dir(path: &Path) -> Result<(), ConvertError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ConvertError::MissingInput(path.to_path_buf()))
    }
}

/// Create the parent directory of an output file, if it has one.
fn ensure_parent(path: &Path) -> Result<(), ConvertError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Path for `format` next to `output`: `output` itself when it is the only
/// requested format, otherwise `output` with the format's extension.
fn output_for(output: &Path, extension: &str, single: bool) -> PathBuf {
    if single {
        output.to_path_buf()
    } else {
        output.with_extension(extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_format_keeps_the_given_path() {
        let out = Path::new("out/cloud.data");
        assert_eq!(output_for(out, "ply", true), PathBuf::from("out/cloud.data"));
        assert_eq!(output_for(out, "pcd", false), PathBuf::from("out/cloud.pcd"));
    }

    #[test]
    fn unsupported_format_message_names_both_sides() {
        let err = ConvertError::UnsupportedFormat {
            conversion: "text",
            format: OutputFormat::Npz,
        };
        assert_eq!(err.to_string(), "text conversion cannot write npz output");
    }
}
