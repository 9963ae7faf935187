use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use super::{PointCloudWriter, SinkError, intensity_grey};
use crate::cloud::PointCloud;

/// ASCII PLY with `x y z` float properties.
///
/// Clouds carrying intensity also get `red green blue` grey levels.
pub struct PlyAsciiWriter;

impl PointCloudWriter for PlyAsciiWriter {
    fn write_cloud(&self, cloud: &PointCloud, out: &mut dyn Write) -> Result<(), SinkError> {
        let grey = intensity_grey(cloud);
        writeln!(out, "ply")?;
        writeln!(out, "format ascii 1.0")?;
        writeln!(out, "element vertex {}", cloud.len())?;
        writeln!(out, "property float x")?;
        writeln!(out, "property float y")?;
        writeln!(out, "property float z")?;
        if grey.is_some() {
            writeln!(out, "property uchar red")?;
            writeln!(out, "property uchar green")?;
            writeln!(out, "property uchar blue")?;
        }
        writeln!(out, "end_header")?;

        for (index, [x, y, z]) in cloud.points.iter().enumerate() {
            match grey.as_ref() {
                Some(grey) => {
                    let g = grey.get(index).copied().unwrap_or(0);
                    writeln!(out, "{x:?} {y:?} {z:?} {g} {g} {g}")?;
                }
                None => writeln!(out, "{x:?} {y:?} {z:?}")?,
            }
        }
        Ok(())
    }
}

pub fn read_ply_file(path: &Path) -> Result<PointCloud, SinkError> {
    read_ply(&mut BufReader::new(File::open(path)?))
}

/// Read the vertex positions of a PLY stream.
///
/// ASCII and both binary encodings are accepted. Only the `vertex` element
/// is decoded; its `x`, `y`, `z` properties may have any scalar type and
/// appear in any order. A file without a `vertex` element is an empty cloud.
pub fn read_ply<R: Read>(reader: &mut R) -> Result<PointCloud, SinkError> {
    let ply = Parser::<DefaultElement>::new().read_ply(reader)?;
    let Some(vertices) = ply.payload.get("vertex") else {
        return Ok(PointCloud::default());
    };
    let points = vertices
        .iter()
        .enumerate()
        .map(|(index, vertex)| {
            let axis = |name: &str| {
                vertex
                    .get(name)
                    .and_then(scalar)
                    .ok_or_else(|| SinkError::Ply {
                        vertex: index,
                        message: format!("missing or non-scalar property '{name}'"),
                    })
            };
            Ok([axis("x")?, axis("y")?, axis("z")?])
        })
        .collect::<Result<Vec<_>, SinkError>>()?;
    Ok(PointCloud::from_xyz(points))
}

fn scalar(property: &Property) -> Option<f32> {
    match *property {
        Property::Char(v) => Some(f32::from(v)),
        Property::UChar(v) => Some(f32::from(v)),
        Property::Short(v) => Some(f32::from(v)),
        Property::UShort(v) => Some(f32::from(v)),
        Property::Int(v) => Some(v as f32),
        Property::UInt(v) => Some(v as f32),
        Property::Float(v) => Some(v),
        Property::Double(v) => Some(v as f32),
        _ => None,
    }
}
