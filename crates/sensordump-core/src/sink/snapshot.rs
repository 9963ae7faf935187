//! JSON copies of frames and per-frame metadata.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::SinkError;
use crate::frame::Frame;

/// Snapshot file name for a 1-based frame number.
pub fn snapshot_name(number: usize) -> String {
    format!("frame_{number:04}.json")
}

/// Write the whole frame mapping, payload included, as pretty JSON.
///
/// `number` is the 1-based position used in the file name.
pub fn write_frame_snapshot(frame: &Frame, dir: &Path, number: usize) -> Result<PathBuf, SinkError> {
    let path = dir.join(snapshot_name(number));
    write_json(&frame.to_value(), &path)?;
    Ok(path)
}

pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), SinkError> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
