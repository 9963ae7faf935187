use std::fs;
use std::path::Path;

use super::run::RunState;
use super::{ConvertError, require_file};
use crate::Report;
use crate::config::{ConversionConfig, OutputFormat};
use crate::diagnostics::ID_INVALID_FIELD;
use crate::heightmap::HeightMap;
#[cfg(feature = "hdf5")]
use crate::sink::Hdf5Archive;
use crate::sink::raster::write_height_map_images;
use crate::sink::snapshot::write_json;
use crate::sink::{ArrayArchiveWriter, HeightMapSeries, NpzArchive};
use crate::source::{FrameSource, MsgpackFileSource};

const CONVERSION: &str = "heightmap";
const ARCHIVE_STEM: &str = "height_maps";

/// Convert a MessagePack stream of height-map frames.
///
/// `png` writes `height_map_NNN_gray.png`, `height_map_NNN_color.png` and
/// `height_map_NNN_meta.json` per frame; `npz` and `hdf5` stack every frame
/// into one `height_maps.<ext>` archive. Frames whose grid shape differs
/// from the first archived frame are left out of the archive with a warning.
pub fn convert_height_maps(config: &ConversionConfig) -> Result<Report, ConvertError> {
    require_file(&config.input)?;
    let formats = config.formats_or(&[OutputFormat::Png]);
    let mut images = false;
    let mut archives: Vec<Box<dyn ArrayArchiveWriter>> = Vec::new();
    for format in formats {
        match format {
            OutputFormat::Png => images = true,
            OutputFormat::Npz => archives.push(Box::new(NpzArchive)),
            #[cfg(feature = "hdf5")]
            OutputFormat::Hdf5 => archives.push(Box::new(Hdf5Archive)),
            format => {
                return Err(ConvertError::UnsupportedFormat {
                    conversion: CONVERSION,
                    format,
                });
            }
        }
    }
    fs::create_dir_all(&config.output)?;

    let mut state = RunState::new(CONVERSION);
    let mut collected: Vec<HeightMap> = Vec::new();
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
        let map = match HeightMap::from_frame(&frame) {
            Ok(map) => map,
            Err(err) => {
                state.frame_error(frame.index(), frame.stamp().ok(), &err);
                continue;
            }
        };
        if images {
            write_images(&map, &config.output, &mut state);
        }
        state.converted(map.index, Some(map.stamp), map.cells.len(), None);
        if !archives.is_empty() {
            collect(&mut collected, map, &mut state);
        }
    }

    if !archives.is_empty() {
        let series = HeightMapSeries::from_maps(&collected)?;
        for archive in &archives {
            let path = config
                .output
                .join(format!("{ARCHIVE_STEM}.{}", archive.extension()));
            archive.write_series(&series, &path)?;
            state.output(&path);
        }
    }
    state.finish(&config.input)
}

fn write_images(map: &HeightMap, dir: &Path, state: &mut RunState) {
    match write_height_map_images(map, dir) {
        Ok((grey, color)) => {
            state.output(&grey);
            state.output(&color);
        }
        Err(err) => state.write_failed(Some(map.index), dir, &err),
    }
    let meta_path = dir.join(format!("height_map_{:03}_meta.json", map.index));
    match write_json(&map.metadata(), &meta_path) {
        Ok(()) => state.output(&meta_path),
        Err(err) => state.write_failed(Some(map.index), &meta_path, &err),
    }
}

fn collect(collected: &mut Vec<HeightMap>, map: HeightMap, state: &mut RunState) {
    if let Some(first) = collected.first() {
        let expected = (first.height(), first.width());
        let actual = (map.height(), map.width());
        if actual != expected {
            state.diagnostics.warn(
                Some(map.index),
                ID_INVALID_FIELD,
                format!(
                    "grid {}x{} differs from {}x{}; left out of the archive",
                    actual.0, actual.1, expected.0, expected.1
                ),
            );
            return;
        }
    }
    collected.push(map);
}
