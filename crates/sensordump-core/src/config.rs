//! Conversion configuration.
//!
//! Every conversion receives one [`ConversionConfig`]; nothing is read from
//! process-wide state. An empty `formats` list means "use the conversion's
//! defaults".

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::decode::LengthPolicy;
use crate::sink::CloudFormat;
use crate::sink::raster::Canvas;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Ply,
    Pcd,
    Xyz,
    Pts,
    Png,
    Npz,
    Hdf5,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Ply,
        OutputFormat::Pcd,
        OutputFormat::Xyz,
        OutputFormat::Pts,
        OutputFormat::Png,
        OutputFormat::Npz,
        OutputFormat::Hdf5,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Ply => "ply",
            OutputFormat::Pcd => "pcd",
            OutputFormat::Xyz => "xyz",
            OutputFormat::Pts => "pts",
            OutputFormat::Png => "png",
            OutputFormat::Npz => "npz",
            OutputFormat::Hdf5 => "hdf5",
        }
    }

    /// The point-cloud format this output maps to, if it is one.
    pub fn cloud_format(self) -> Option<CloudFormat> {
        match self {
            OutputFormat::Ply => Some(CloudFormat::Ply),
            OutputFormat::Pcd => Some(CloudFormat::Pcd),
            OutputFormat::Xyz => Some(CloudFormat::Xyz),
            OutputFormat::Pts => Some(CloudFormat::Pts),
            OutputFormat::Png | OutputFormat::Npz | OutputFormat::Hdf5 => None,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.to_ascii_lowercase();
        let lower = if lower == "h5" { "hdf5".to_string() } else { lower };
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == lower)
            .ok_or_else(|| {
                let known: Vec<_> = OutputFormat::ALL.iter().map(|f| f.as_str()).collect();
                format!("unknown format '{value}' (expected one of: {})", known.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Overrides the conversion's default length policy.
    pub length_policy: Option<LengthPolicy>,
    /// Write a JSON snapshot of each frame before decoding (lidar logs).
    pub snapshots: bool,
    /// Render a top-down PNG next to a merged cloud.
    pub preview: bool,
    pub canvas: Canvas,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            length_policy: None,
            snapshots: false,
            preview: false,
            canvas: Canvas::default(),
        }
    }
}

/// Input, output location and options of one conversion run.
///
/// `output` is a file for single-file conversions (text dump, merge,
/// overlay) and a directory for per-frame conversions (lidar, height maps).
///
/// # Examples
/// ```
/// use sensordump_core::{ConversionConfig, OutputFormat};
///
/// let config = ConversionConfig::new("scan.msgpack", "out").with_formats([OutputFormat::Ply]);
/// assert_eq!(config.formats, vec![OutputFormat::Ply]);
/// assert!(!config.options.snapshots);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub formats: Vec<OutputFormat>,
    pub options: ConversionOptions,
}

impl ConversionConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            formats: Vec::new(),
            options: ConversionOptions::default(),
        }
    }

    pub fn with_formats(mut self, formats: impl IntoIterator<Item = OutputFormat>) -> Self {
        self.formats = formats.into_iter().collect();
        self
    }

    /// Requested formats, or `defaults` when none were requested. Duplicates
    /// are dropped, first occurrence wins.
    pub fn formats_or(&self, defaults: &[OutputFormat]) -> Vec<OutputFormat> {
        let requested = if self.formats.is_empty() {
            defaults
        } else {
            &self.formats
        };
        let mut formats = Vec::with_capacity(requested.len());
        for format in requested {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }
        formats
    }

    pub fn length_policy_or(&self, default: LengthPolicy) -> LengthPolicy {
        self.options.length_policy.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!("PLY".parse::<OutputFormat>(), Ok(OutputFormat::Ply));
        assert_eq!("h5".parse::<OutputFormat>(), Ok(OutputFormat::Hdf5));
        let err = "obj".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("expected one of"));
    }

    #[test]
    fn defaults_apply_only_without_request() {
        let config = ConversionConfig::new("in", "out");
        assert_eq!(
            config.formats_or(&[OutputFormat::Pcd, OutputFormat::Ply]),
            vec![OutputFormat::Pcd, OutputFormat::Ply]
        );
        let config = config.with_formats([OutputFormat::Xyz, OutputFormat::Xyz]);
        assert_eq!(config.formats_or(&[OutputFormat::Ply]), vec![OutputFormat::Xyz]);
    }

    #[test]
    fn length_policy_override() {
        let mut config = ConversionConfig::new("in", "out");
        assert_eq!(
            config.length_policy_or(LengthPolicy::SkipFrame),
            LengthPolicy::SkipFrame
        );
        config.options.length_policy = Some(LengthPolicy::Truncate);
        assert_eq!(
            config.length_policy_or(LengthPolicy::SkipFrame),
            LengthPolicy::Truncate
        );
    }
}
