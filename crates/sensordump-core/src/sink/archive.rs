use std::fs::File;
use std::path::Path;

use ndarray::{Array1, Array2, Array3, arr0};
use ndarray_npy::NpzWriter;

use super::SinkError;
use crate::heightmap::HeightMap;

pub const DATASET_HEIGHT_MAPS: &str = "height_maps";
pub const DATASET_TIMESTAMPS: &str = "timestamps";
pub const DATASET_ORIGINS: &str = "origins";
pub const ATTR_RESOLUTION: &str = "resolution";

/// All height maps of a run stacked into arrays.
///
/// Frames without an origin contribute a row of NaN. The resolution is taken
/// from the first frame and is absent for an empty series.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightMapSeries {
    pub height_maps: Array3<f64>,
    pub timestamps: Array1<f64>,
    pub origins: Array2<f64>,
    pub resolution: Option<f64>,
}

impl HeightMapSeries {
    pub fn from_maps(maps: &[HeightMap]) -> Result<Self, SinkError> {
        let shape = maps
            .first()
            .map(|map| (map.height(), map.width()))
            .unwrap_or((0, 0));

        let mut cells = Vec::with_capacity(maps.len() * shape.0 * shape.1);
        let mut origins = Vec::with_capacity(maps.len() * 3);
        for map in maps {
            let actual = (map.height(), map.width());
            if actual != shape {
                return Err(SinkError::Shape {
                    index: map.index,
                    expected: shape,
                    actual,
                });
            }
            cells.extend(map.cells.iter().copied());
            origins.extend(map.origin.unwrap_or([f64::NAN; 3]));
        }

        let height_maps = Array3::from_shape_vec((maps.len(), shape.0, shape.1), cells)?;
        let origins = Array2::from_shape_vec((maps.len(), 3), origins)?;
        Ok(Self {
            height_maps,
            timestamps: maps.iter().map(|map| map.stamp).collect(),
            origins,
            resolution: maps.first().and_then(|map| map.resolution),
        })
    }
}

/// Writes a [`HeightMapSeries`] as a multi-array file.
pub trait ArrayArchiveWriter {
    fn extension(&self) -> &'static str;

    fn write_series(&self, series: &HeightMapSeries, path: &Path) -> Result<(), SinkError>;
}

/// Compressed NumPy archive (`.npz`).
pub struct NpzArchive;

impl ArrayArchiveWriter for NpzArchive {
    fn extension(&self) -> &'static str {
        "npz"
    }

    fn write_series(&self, series: &HeightMapSeries, path: &Path) -> Result<(), SinkError> {
        let mut npz = NpzWriter::new_compressed(File::create(path)?);
        npz.add_array(DATASET_HEIGHT_MAPS, &series.height_maps)?;
        npz.add_array(DATASET_TIMESTAMPS, &series.timestamps)?;
        npz.add_array(DATASET_ORIGINS, &series.origins)?;
        if let Some(resolution) = series.resolution {
            npz.add_array(ATTR_RESOLUTION, &arr0(resolution))?;
        }
        npz.finish()?;
        Ok(())
    }
}

/// HDF5 file with deflate-compressed datasets and a `resolution` attribute.
#[cfg(feature = "hdf5")]
pub struct Hdf5Archive;

#[cfg(feature = "hdf5")]
impl ArrayArchiveWriter for Hdf5Archive {
    fn extension(&self) -> &'static str {
        "h5"
    }

    fn write_series(&self, series: &HeightMapSeries, path: &Path) -> Result<(), SinkError> {
        let file = hdf5::File::create(path).map_err(hdf5_err)?;
        let height_maps = &series.height_maps;
        write_dataset(&file, DATASET_HEIGHT_MAPS, height_maps.shape(), height_maps.iter())?;
        let timestamps = &series.timestamps;
        write_dataset(&file, DATASET_TIMESTAMPS, timestamps.shape(), timestamps.iter())?;
        write_dataset(&file, DATASET_ORIGINS, series.origins.shape(), series.origins.iter())?;
        if let Some(resolution) = series.resolution {
            file.new_attr::<f64>()
                .shape(())
                .create(ATTR_RESOLUTION)
                .and_then(|attr| attr.write_scalar(&resolution))
                .map_err(hdf5_err)?;
        }
        Ok(())
    }
}

// hdf5 links its own ndarray release, so arrays cross over as flat slices.
#[cfg(feature = "hdf5")]
fn write_dataset<'a>(
    file: &hdf5::File,
    name: &str,
    shape: &[usize],
    values: impl Iterator<Item = &'a f64>,
) -> Result<(), SinkError> {
    let values: Vec<f64> = values.copied().collect();
    let builder = file.new_dataset::<f64>().shape(shape.to_vec());
    // Chunked (compressed) layouts cannot have zero-sized dimensions.
    let builder = if values.is_empty() {
        builder
    } else {
        builder.deflate(4)
    };
    let dataset = builder.create(name).map_err(hdf5_err)?;
    if !values.is_empty() {
        dataset.write_raw(values.as_slice()).map_err(hdf5_err)?;
    }
    Ok(())
}

#[cfg(feature = "hdf5")]
fn hdf5_err(err: hdf5::Error) -> SinkError {
    SinkError::Hdf5(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    fn map(index: usize, cells: Array2<f64>, origin: Option<[f64; 3]>) -> HeightMap {
        HeightMap {
            index,
            stamp: index as f64 * 0.1,
            resolution: Some(0.05),
            origin,
            cells,
        }
    }

    #[test]
    fn series_stacks_frames() {
        let maps = vec![
            map(0, array![[1.0, 2.0]], Some([0.0, 1.0, 2.0])),
            map(1, array![[3.0, 4.0]], None),
        ];
        let series = HeightMapSeries::from_maps(&maps).unwrap();
        assert_eq!(series.height_maps.dim(), (2, 1, 2));
        assert_eq!(series.height_maps[[1, 0, 1]], 4.0);
        assert_eq!(series.origins[[0, 2]], 2.0);
        assert!(series.origins[[1, 0]].is_nan());
        assert_eq!(series.resolution, Some(0.05));
    }

    #[test]
    fn series_rejects_mixed_shapes() {
        let maps = vec![map(0, array![[1.0, 2.0]], None), map(4, array![[1.0], [2.0]], None)];
        let err = HeightMapSeries::from_maps(&maps).unwrap_err();
        assert!(matches!(err, SinkError::Shape { index: 4, .. }));
    }

    #[test]
    fn empty_series_writes_valid_archive() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("empty.npz");
        let series = HeightMapSeries::from_maps(&[]).unwrap();
        assert!(series.timestamps.is_empty());
        NpzArchive.write_series(&series, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        // zip local file header magic
        assert_eq!(&bytes[..4], b"PK\x03\x04");
    }
}
