//! Height-map frames.
//!
//! A height-map frame carries `height * width` cells in row-major order in
//! its `data` field. Cells at or above [`INVALID_HEIGHT`] mark unknown
//! terrain and are treated as zero when rendering.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::frame::{FIELD_DATA, FIELD_HEIGHT, FIELD_WIDTH, Frame, FrameError};

/// Sentinel threshold for unknown cells.
pub const INVALID_HEIGHT: f64 = 1e9;

#[derive(Debug, Clone, PartialEq)]
pub struct HeightMap {
    pub index: usize,
    pub stamp: f64,
    pub resolution: Option<f64>,
    pub origin: Option<[f64; 3]>,
    pub cells: Array2<f64>,
}

/// Per-frame metadata written next to rendered height maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightMapMetadata {
    pub stamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<[f64; 3]>,
}

impl HeightMap {
    /// Reshape the frame's `data` into a `height x width` grid.
    ///
    /// # Examples
    /// ```
    /// use sensordump_core::{Frame, HeightMap};
    /// use serde_json::json;
    ///
    /// let frame = Frame::from_value(0, json!({
    ///     "stamp": 1.0, "height": 2, "width": 2, "data": [0.0, 1.0, 2.0, 3.0]
    /// }))?;
    /// let map = HeightMap::from_frame(&frame)?;
    /// assert_eq!(map.cells[[1, 0]], 2.0);
    /// # Ok::<(), sensordump_core::FrameError>(())
    /// ```
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        let height = frame.dimension(FIELD_HEIGHT)?;
        let width = frame.dimension(FIELD_WIDTH)?;
        let values = frame.scalar_payload(FIELD_DATA)?;
        let len = values.len();
        let cells = Array2::from_shape_vec((height, width), values).map_err(|_| {
            FrameError::Shape {
                len,
                height,
                width,
            }
        })?;
        Ok(Self {
            index: frame.index(),
            stamp: frame.stamp()?,
            resolution: frame.resolution()?,
            origin: frame.origin()?,
            cells,
        })
    }

    pub fn height(&self) -> usize {
        self.cells.nrows()
    }

    pub fn width(&self) -> usize {
        self.cells.ncols()
    }

    pub fn metadata(&self) -> HeightMapMetadata {
        HeightMapMetadata {
            stamp: self.stamp,
            resolution: self.resolution,
            origin: self.origin,
        }
    }

    /// Min-max scale to `0..=255` after zeroing invalid cells.
    ///
    /// A constant map scales to all zeros. Values are truncated, not rounded.
    pub fn normalized(&self) -> Array2<u8> {
        let masked = self.cells.mapv(|value| {
            if value >= INVALID_HEIGHT || !value.is_finite() {
                0.0
            } else {
                value
            }
        });
        let (min, max) = masked
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let span = max - min;
        masked.mapv(|value| {
            if span > 0.0 {
                ((value - min) * 255.0 / span).clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
    }
}

/// JET colour map: dark blue at 0 through green to dark red at 255.
pub fn jet(value: u8) -> [u8; 3] {
    let v = f64::from(value) / 255.0;
    let channel = |center: f64| ((1.5 - (4.0 * v - center).abs()).clamp(0.0, 1.0) * 255.0) as u8;
    [channel(3.0), channel(2.0), channel(1.0)]
}
