//! Point clouds built from decoded records, and their summary statistics.

use serde::{Deserialize, Serialize};

use crate::decode::{Xyz, Xyzi};

/// xyz points with optional per-point intensity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Xyz>,
    pub intensity: Option<Vec<f32>>,
}

impl PointCloud {
    pub fn from_xyz(points: Vec<Xyz>) -> Self {
        Self {
            points,
            intensity: None,
        }
    }

    pub fn from_xyzi(records: &[Xyzi]) -> Self {
        let points = records.iter().map(|r| [r[0], r[1], r[2]]).collect();
        let intensity = records.iter().map(|r| r[3]).collect();
        Self {
            points,
            intensity: Some(intensity),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn extend(&mut self, other: PointCloud) {
        self.points.extend(other.points);
        match (&mut self.intensity, other.intensity) {
            (Some(mine), Some(theirs)) => mine.extend(theirs),
            (mine, _) => *mine = None,
        }
    }

    /// Intensities scaled to `0.0..=1.0` by min-max; constant input maps to 0.
    pub fn normalized_intensity(&self) -> Option<Vec<f32>> {
        let intensity = self.intensity.as_ref()?;
        let (min, max) = finite_range(intensity.iter().copied())?;
        let span = max - min;
        Some(
            intensity
                .iter()
                .map(|value| {
                    if span > 0.0 && value.is_finite() {
                        (value - min) / span
                    } else {
                        0.0
                    }
                })
                .collect(),
        )
    }

    pub fn stats(&self) -> Option<CloudStats> {
        CloudStats::from_cloud(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    pub fn union(self, other: Range) -> Range {
        Range {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Per-axis bounds and planar density of a cloud.
///
/// Non-finite coordinates are ignored for the bounds.
///
/// # Examples
/// ```
/// use sensordump_core::PointCloud;
///
/// let cloud = PointCloud::from_xyz(vec![[0.0, 0.0, 1.0], [2.0, 1.0, 3.0]]);
/// let stats = cloud.stats().unwrap();
/// assert_eq!(stats.points, 2);
/// assert_eq!(stats.density, Some(1.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudStats {
    pub points: u64,
    pub x: Range,
    pub y: Range,
    pub z: Range,
    /// Points per unit of xy bounding-box area; absent when the area is zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Range>,
}

impl CloudStats {
    pub fn from_cloud(cloud: &PointCloud) -> Option<Self> {
        let axis = |index: usize| {
            finite_range(cloud.points.iter().map(|p| p[index])).map(|(min, max)| Range { min, max })
        };
        let (x, y, z) = (axis(0)?, axis(1)?, axis(2)?);
        let area = f64::from(x.span()) * f64::from(y.span());
        let density = (area > 0.0).then(|| cloud.len() as f64 / area);
        let intensity = cloud
            .intensity
            .as_ref()
            .and_then(|values| finite_range(values.iter().copied()))
            .map(|(min, max)| Range { min, max });
        Some(Self {
            points: cloud.len() as u64,
            x,
            y,
            z,
            density,
            intensity,
        })
    }
}

impl CloudStats {
    /// Grow the bounds to cover `other` as well. Density is recomputed from
    /// the combined count and area.
    pub fn extend(&mut self, other: &CloudStats) {
        self.points += other.points;
        self.x = self.x.union(other.x);
        self.y = self.y.union(other.y);
        self.z = self.z.union(other.z);
        self.intensity = match (self.intensity, other.intensity) {
            (Some(mine), Some(theirs)) => Some(mine.union(theirs)),
            (mine, theirs) => mine.or(theirs),
        };
        let area = f64::from(self.x.span()) * f64::from(self.y.span());
        self.density = (area > 0.0).then(|| self.points as f64 / area);
    }
}

fn finite_range(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    values
        .filter(|value| value.is_finite())
        .fold(None, |acc, value| match acc {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
}
