use std::path::Path;

use image::RgbaImage;
use log::info;

use super::run::RunState;
use super::{ConvertError, ensure_parent, require_dir};
use crate::Report;
use crate::cloud::{CloudStats, PointCloud};
use crate::config::{ConversionConfig, OutputFormat};
use crate::diagnostics::ID_SOURCE_ERROR;
use crate::sink::raster::{overlay, render_top_down_within};
use crate::sink::{SinkError, read_ply_file};
use crate::source::list_files;

const CONVERSION: &str = "overlay";

/// Render every PLY file of a directory and composite the renders.
///
/// Files are taken in name order and all renders share one view covering
/// every cloud, so they line up in the overlay. Each render is saved as
/// `<stem>.png` next to `config.output`, which receives the composite.
/// Unreadable files are reported and left out.
pub fn overlay_ply_renders(config: &ConversionConfig) -> Result<Report, ConvertError> {
    require_dir(&config.input)?;
    if let Some(format) = config
        .formats
        .iter()
        .copied()
        .find(|format| *format != OutputFormat::Png)
    {
        return Err(ConvertError::UnsupportedFormat {
            conversion: CONVERSION,
            format,
        });
    }
    ensure_parent(&config.output)?;
    let render_dir = config
        .output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut state = RunState::new(CONVERSION);
    let paths = list_files(&config.input, "ply")?;
    info!("{}: {} PLY file(s)", config.input.display(), paths.len());

    let clouds: Vec<_> = paths.iter().map(|path| read_ply_file(path)).collect();
    let view = shared_view(clouds.iter().filter_map(|cloud| cloud.as_ref().ok()));
    let mut layers = Vec::with_capacity(clouds.len());
    for (index, (path, cloud)) in paths.iter().zip(&clouds).enumerate() {
        let cloud = match cloud {
            Ok(cloud) => cloud,
            Err(err) => {
                state.diagnostics.warn(
                    Some(index),
                    ID_SOURCE_ERROR,
                    format!("{}: {err}", path.display()),
                );
                state.skipped(index, None);
                continue;
            }
        };
        let render = match &view {
            Some(view) => render_top_down_within(cloud, config.options.canvas, view),
            None => RgbaImage::new(config.options.canvas.width, config.options.canvas.height),
        };
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("cloud_{index:04}"));
        let render_path = render_dir.join(format!("{stem}.png"));
        match render.save(&render_path) {
            Ok(()) => state.output(&render_path),
            Err(err) => state.write_failed(Some(index), &render_path, &SinkError::from(err)),
        }
        state.converted(index, None, cloud.len(), cloud.stats());
        layers.push(render);
    }

    let composite = overlay(&layers).unwrap_or_else(|| {
        RgbaImage::new(config.options.canvas.width, config.options.canvas.height)
    });
    composite.save(&config.output).map_err(SinkError::from)?;
    state.output(&config.output);
    state.finish(&config.input)
}

fn shared_view<'a>(clouds: impl Iterator<Item = &'a PointCloud>) -> Option<CloudStats> {
    clouds
        .filter_map(PointCloud::stats)
        .reduce(|mut view, stats| {
            view.extend(&stats);
            view
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{PlyAsciiWriter, write_cloud_file};
    use std::fs;
    use tempfile::TempDir;

    fn write_ply(dir: &Path, name: &str, points: Vec<[f32; 3]>) {
        write_cloud_file(&PlyAsciiWriter, &PointCloud::from_xyz(points), &dir.join(name)).unwrap();
    }

    #[test]
    fn renders_each_cloud_and_composites() {
        let temp = TempDir::new().expect("tempdir");
        let clouds = temp.path().join("clouds");
        fs::create_dir(&clouds).unwrap();
        write_ply(&clouds, "a.ply", vec![[0.0, 0.0, 0.0]]);
        write_ply(&clouds, "b.ply", vec![[10.0, 10.0, 1.0]]);
        fs::write(clouds.join("c.ply"), "not a ply").unwrap();

        let output = temp.path().join("renders/overlay.png");
        let mut config = ConversionConfig::new(&clouds, &output);
        config.options.canvas.width = 101;
        config.options.canvas.height = 101;

        let report = overlay_ply_renders(&config).unwrap();
        assert!(temp.path().join("renders/a.png").is_file());
        assert!(temp.path().join("renders/b.png").is_file());
        assert_eq!(report.frames_summary.as_ref().unwrap().frames_skipped, 1);
        assert_eq!(report.diagnostics[0].frame, Some(2));

        let composite = image::open(&output).unwrap().to_rgba8();
        assert_eq!(composite.get_pixel(5, 95).0[3], 255);
        assert_eq!(composite.get_pixel(95, 5).0[3], 255);
    }

    #[test]
    fn empty_directory_writes_transparent_composite() {
        let temp = TempDir::new().expect("tempdir");
        let clouds = temp.path().join("clouds");
        fs::create_dir(&clouds).unwrap();
        let output = temp.path().join("overlay.png");
        let mut config = ConversionConfig::new(&clouds, &output);
        config.options.canvas.width = 8;
        config.options.canvas.height = 8;

        overlay_ply_renders(&config).unwrap();
        let composite = image::open(&output).unwrap().to_rgba8();
        assert!(composite.pixels().all(|p| p.0[3] == 0));
    }
}
