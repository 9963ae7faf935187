//! Output sinks.
//!
//! Each output format sits behind a small capability trait so conversions
//! only depend on "write this cloud" or "write this series":
//! - [`PointCloudWriter`]: PLY (ASCII), PCD (binary), XYZ/PTS text, with
//!   [`read_ply`] for PLY input in any encoding;
//! - [`ArrayArchiveWriter`]: `.npz`, and `.h5` with the `hdf5` feature;
//! - `raster`: PNG height maps, top-down cloud renders and overlays;
//! - `snapshot`: JSON copies of frames and metadata.
//!
//! Writers never inspect frames; they receive already-decoded data and
//! accept empty inputs, producing a valid file with no records.

mod archive;
mod pcd;
mod ply;
pub mod raster;
pub mod snapshot;
mod text;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cloud::PointCloud;

#[cfg(feature = "hdf5")]
pub use archive::Hdf5Archive;
pub use archive::{ArrayArchiveWriter, HeightMapSeries, NpzArchive};
pub use pcd::{PcdBinaryWriter, XyzPoint, XyziPoint};
pub use ply::{PlyAsciiWriter, read_ply, read_ply_file};
pub use text::XyzTextWriter;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("array shape error: {0}")]
    Array(#[from] ndarray::ShapeError),
    #[error("npz error: {0}")]
    Npz(#[from] ndarray_npy::WriteNpzError),
    #[error("hdf5 error: {0}")]
    Hdf5(String),
    #[error("pcd error: {0}")]
    Pcd(String),
    #[error("invalid PLY vertex {vertex}: {message}")]
    Ply { vertex: usize, message: String },
    #[error("height maps differ in shape: expected {expected:?}, got {actual:?} at frame {index}")]
    Shape {
        index: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

/// Point-cloud interchange formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudFormat {
    Ply,
    Pcd,
    Xyz,
    Pts,
}

impl CloudFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CloudFormat::Ply => "ply",
            CloudFormat::Pcd => "pcd",
            CloudFormat::Xyz => "xyz",
            CloudFormat::Pts => "pts",
        }
    }

    pub fn writer(self) -> Box<dyn PointCloudWriter> {
        match self {
            CloudFormat::Ply => Box::new(PlyAsciiWriter),
            CloudFormat::Pcd => Box::new(PcdBinaryWriter),
            CloudFormat::Xyz | CloudFormat::Pts => Box::new(XyzTextWriter),
        }
    }
}

/// Serializes a [`PointCloud`] in one interchange format.
pub trait PointCloudWriter {
    fn write_cloud(&self, cloud: &PointCloud, out: &mut dyn Write) -> Result<(), SinkError>;
}

/// Write `cloud` to `path` through a buffered file.
pub fn write_cloud_file(
    writer: &dyn PointCloudWriter,
    cloud: &PointCloud,
    path: &Path,
) -> Result<(), SinkError> {
    let mut out = BufWriter::new(File::create(path)?);
    writer.write_cloud(cloud, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Grey level (0..=255) per point derived from normalized intensity.
pub(crate) fn intensity_grey(cloud: &PointCloud) -> Option<Vec<u8>> {
    cloud.normalized_intensity().map(|values| {
        values
            .into_iter()
            .map(|value| (value * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect()
    })
}
