use std::io::Write;

use super::{PointCloudWriter, SinkError};
use crate::cloud::PointCloud;

/// Whitespace-separated text, one point per line, six decimals per column.
///
/// Intensity, when present, is written as a fourth column.
/// `.xyz` and `.pts` share this layout.
pub struct XyzTextWriter;

impl PointCloudWriter for XyzTextWriter {
    fn write_cloud(&self, cloud: &PointCloud, out: &mut dyn Write) -> Result<(), SinkError> {
        let intensity = cloud.intensity.as_deref();
        for (index, [x, y, z]) in cloud.points.iter().enumerate() {
            write!(out, "{x:.6} {y:.6} {z:.6}")?;
            if let Some(intensity) = intensity {
                write!(out, " {:.6}", intensity.get(index).copied().unwrap_or(0.0))?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_six_decimals_with_intensity() {
        let cloud = PointCloud::from_xyzi(&[[1.0, -0.5, 2.25, 7.0]]);
        let mut out = Vec::new();
        XyzTextWriter.write_cloud(&cloud, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1.000000 -0.500000 2.250000 7.000000\n"
        );
    }

    #[test]
    fn empty_cloud_writes_nothing() {
        let mut out = Vec::new();
        XyzTextWriter
            .write_cloud(&PointCloud::default(), &mut out)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn missing_intensity_is_written_as_zero() {
        let mut cloud = PointCloud::from_xyzi(&[[0.0; 4], [1.0; 4]]);
        cloud.intensity = Some(vec![2.0]);
        let mut out = Vec::new();
        XyzTextWriter.write_cloud(&cloud, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1), Some("1.000000 1.000000 1.000000 0.000000"));
    }
}
