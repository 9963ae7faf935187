//! PNG rendering for height maps and point clouds.
//!
//! Array indices `[row, col]` map to image pixels `(col, row)`. Cloud renders
//! are orthographic top-down views on a transparent canvas so several renders
//! can be alpha-composited into one overlay.

use std::path::{Path, PathBuf};

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage, Rgba, RgbaImage, imageops};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{SinkError, intensity_grey};
use crate::cloud::{CloudStats, PointCloud};
use crate::heightmap::{HeightMap, jet};

/// Canvas size for cloud renders, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
        }
    }
}

const MARGIN_FRACTION: f64 = 0.05;

pub fn grey_image(normalized: &Array2<u8>) -> GrayImage {
    let (rows, cols) = normalized.dim();
    ImageBuffer::from_fn(cols as u32, rows as u32, |x, y| {
        Luma([normalized[[y as usize, x as usize]]])
    })
}

pub fn jet_image(normalized: &Array2<u8>) -> RgbImage {
    let (rows, cols) = normalized.dim();
    ImageBuffer::from_fn(cols as u32, rows as u32, |x, y| {
        Rgb(jet(normalized[[y as usize, x as usize]]))
    })
}

/// Write `height_map_NNN_gray.png` and `height_map_NNN_color.png` into `dir`.
pub fn write_height_map_images(
    map: &HeightMap,
    dir: &Path,
) -> Result<(PathBuf, PathBuf), SinkError> {
    let normalized = map.normalized();
    let grey_path = dir.join(format!("height_map_{:03}_gray.png", map.index));
    let color_path = dir.join(format!("height_map_{:03}_color.png", map.index));
    grey_image(&normalized).save(&grey_path)?;
    jet_image(&normalized).save(&color_path)?;
    Ok((grey_path, color_path))
}

/// Top-down (x right, y up) render of `cloud`.
///
/// Points are coloured by intensity grey level when available, otherwise by
/// height through the JET map. Non-finite points are skipped. An empty
/// cloud renders as a fully transparent canvas.
pub fn render_top_down(cloud: &PointCloud, canvas: Canvas) -> RgbaImage {
    match cloud.stats() {
        Some(stats) => render_top_down_within(cloud, canvas, &stats),
        None => RgbaImage::new(canvas.width, canvas.height),
    }
}

/// Like [`render_top_down`], but framed by `view` instead of the cloud's own
/// bounds, so renders of different clouds line up when overlaid.
pub fn render_top_down_within(cloud: &PointCloud, canvas: Canvas, view: &CloudStats) -> RgbaImage {
    let mut image = RgbaImage::new(canvas.width, canvas.height);
    if cloud.is_empty() || canvas.width == 0 || canvas.height == 0 {
        return image;
    }

    let usable_w = f64::from(canvas.width - 1) * (1.0 - 2.0 * MARGIN_FRACTION);
    let usable_h = f64::from(canvas.height - 1) * (1.0 - 2.0 * MARGIN_FRACTION);
    let dx = f64::from(view.x.span());
    let dy = f64::from(view.y.span());
    let scale = match (dx > 0.0, dy > 0.0) {
        (true, true) => (usable_w / dx).min(usable_h / dy),
        (true, false) => usable_w / dx,
        (false, true) => usable_h / dy,
        (false, false) => 1.0,
    };
    let offset_x = (f64::from(canvas.width - 1) - dx * scale) / 2.0;
    let offset_y = (f64::from(canvas.height - 1) - dy * scale) / 2.0;

    let grey = intensity_grey(cloud);
    let dz = f64::from(view.z.span());
    for (index, [x, y, z]) in cloud.points.iter().enumerate() {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            continue;
        }
        let px = (f64::from(*x) - f64::from(view.x.min)) * scale + offset_x;
        let py = (f64::from(*y) - f64::from(view.y.min)) * scale + offset_y;
        let col = px.round();
        let row = (f64::from(canvas.height - 1) - py).round();
        if col < 0.0 || row < 0.0 || col >= f64::from(canvas.width) || row >= f64::from(canvas.height) {
            continue;
        }
        let (col, row) = (col as u32, row as u32);
        let [r, g, b] = match grey.as_ref() {
            Some(grey) => [grey.get(index).copied().unwrap_or(0); 3],
            None => {
                let level = if dz > 0.0 {
                    ((f64::from(*z) - f64::from(view.z.min)) / dz * 255.0) as u8
                } else {
                    0
                };
                jet(level)
            }
        };
        image.put_pixel(col, row, Rgba([r, g, b, 255]));
    }
    image
}

/// Alpha-composite `layers` in order, the first being the bottom layer.
pub fn overlay(layers: &[RgbaImage]) -> Option<RgbaImage> {
    let (first, rest) = layers.split_first()?;
    let mut base = first.clone();
    for layer in rest {
        imageops::overlay(&mut base, layer, 0, 0);
    }
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn grey_image_maps_rows_to_y() {
        let normalized = array![[0u8, 10, 20], [30, 40, 50]];
        let image = grey_image(&normalized);
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [50]);
    }

    #[test]
    fn jet_image_uses_colour_map() {
        let image = jet_image(&array![[0u8, 255]]);
        assert_eq!(image.get_pixel(0, 0).0, jet(0));
        assert_eq!(image.get_pixel(1, 0).0, jet(255));
    }

    #[test]
    fn empty_cloud_renders_transparent() {
        let image = render_top_down(&PointCloud::default(), Canvas { width: 4, height: 4 });
        assert!(image.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn corners_land_inside_margins() {
        let cloud = PointCloud::from_xyz(vec![[0.0, 0.0, 0.0], [10.0, 10.0, 1.0]]);
        let canvas = Canvas {
            width: 101,
            height: 101,
        };
        let image = render_top_down(&cloud, canvas);
        // (0, 0) is bottom-left, (10, 10) is top-right
        assert_eq!(image.get_pixel(5, 95).0[3], 255);
        assert_eq!(image.get_pixel(95, 5).0[3], 255);
        assert_eq!(image.get_pixel(95, 95).0[3], 0);
    }

    #[test]
    fn shared_view_aligns_separate_clouds() {
        let left = PointCloud::from_xyz(vec![[0.0, 0.0, 0.0]]);
        let right = PointCloud::from_xyz(vec![[10.0, 10.0, 0.0]]);
        let mut view = left.stats().unwrap();
        view.extend(&right.stats().unwrap());
        let canvas = Canvas {
            width: 101,
            height: 101,
        };
        let image = render_top_down_within(&right, canvas, &view);
        assert_eq!(image.get_pixel(95, 5).0[3], 255);
        assert_eq!(image.get_pixel(5, 95).0[3], 0);
    }

    #[test]
    fn overlay_keeps_pixels_from_both_layers() {
        let mut bottom = RgbaImage::new(2, 1);
        bottom.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let mut top = RgbaImage::new(2, 1);
        top.put_pixel(1, 0, Rgba([0, 0, 255, 255]));

        let merged = overlay(&[bottom, top]).unwrap();
        assert_eq!(merged.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(merged.get_pixel(1, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn overlay_of_nothing_is_none() {
        assert!(overlay(&[]).is_none());
    }
}
