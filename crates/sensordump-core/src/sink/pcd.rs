use std::io::{Cursor, Write};

use pcd_rs::{DataKind, PcdDeserialize, PcdSerialize, WriterInit};

use super::{PointCloudWriter, SinkError};
use crate::cloud::PointCloud;

#[derive(Debug, Clone, Copy, PartialEq, PcdSerialize, PcdDeserialize)]
pub struct XyzPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, PcdSerialize, PcdDeserialize)]
pub struct XyziPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

/// PCD v0.7 with `DATA binary`: packed little-endian `f32` fields per point.
pub struct PcdBinaryWriter;

impl PointCloudWriter for PcdBinaryWriter {
    fn write_cloud(&self, cloud: &PointCloud, out: &mut dyn Write) -> Result<(), SinkError> {
        // The pcd writer seeks back to patch the header, so it gets a buffer.
        let bytes = match cloud.intensity.as_deref() {
            Some(intensity) => encode(cloud.points.iter().enumerate().map(
                |(index, &[x, y, z])| XyziPoint {
                    x,
                    y,
                    z,
                    intensity: intensity.get(index).copied().unwrap_or(0.0),
                },
            ))?,
            None => encode(cloud.points.iter().map(|&[x, y, z]| XyzPoint { x, y, z }))?,
        };
        out.write_all(&bytes)?;
        Ok(())
    }
}

fn encode<T: PcdSerialize>(
    records: impl ExactSizeIterator<Item = T>,
) -> Result<Vec<u8>, SinkError> {
    let mut buffer = Cursor::new(Vec::new());
    let mut writer = WriterInit {
        width: records.len() as u64,
        height: 1,
        viewpoint: Default::default(),
        data_kind: DataKind::Binary,
        schema: None,
    }
    .build_from_writer::<T, _>(&mut buffer)
    .map_err(pcd_err)?;
    for record in records {
        writer.push(&record).map_err(pcd_err)?;
    }
    writer.finish().map_err(pcd_err)?;
    Ok(buffer.into_inner())
}

fn pcd_err(err: impl std::fmt::Display) -> SinkError {
    SinkError::Pcd(err.to_string())
}
