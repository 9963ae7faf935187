//! Decoded frame model.
//!
//! A frame is an ordered mapping of named fields, kept as JSON values so the
//! same type serves MessagePack streams, per-frame JSON files and snapshots.
//! Typed accessors validate one field at a time and report the field name on
//! failure; nothing is validated eagerly.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::diagnostics::{ID_INVALID_FIELD, ID_MISSING_FIELD, ID_NOT_A_MAP};

pub const FIELD_STAMP: &str = "stamp";
pub const FIELD_RESOLUTION: &str = "resolution";
pub const FIELD_ORIGIN: &str = "origin";
pub const FIELD_DATA: &str = "data";
pub const FIELD_POINTS: &str = "points";
pub const FIELD_HEIGHT: &str = "height";
pub const FIELD_WIDTH: &str = "width";
pub const FIELD_POINT_STEP: &str = "point_step";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame is not a mapping")]
    NotAMap,
    #[error("missing field '{field}'")]
    MissingField { field: String },
    #[error("invalid field '{field}': expected {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
    #[error("shape mismatch: {len} values cannot fill {height}x{width}")]
    Shape {
        len: usize,
        height: usize,
        width: usize,
    },
}

impl FrameError {
    pub fn diagnostic_id(&self) -> &'static str {
        match self {
            FrameError::NotAMap => ID_NOT_A_MAP,
            FrameError::MissingField { .. } => ID_MISSING_FIELD,
            FrameError::InvalidField { .. } | FrameError::Shape { .. } => ID_INVALID_FIELD,
        }
    }

    fn invalid(field: &str, expected: &'static str) -> Self {
        FrameError::InvalidField {
            field: field.to_string(),
            expected,
        }
    }
}

/// One unit of decoded sensor data.
///
/// # Examples
/// ```
/// use sensordump_core::Frame;
/// use serde_json::json;
///
/// let frame = Frame::from_value(0, json!({"stamp": 1.5, "points": [1.0, 2.0, 3.0, 0.5]}))?;
/// assert_eq!(frame.stamp()?, 1.5);
/// assert_eq!(frame.scalar_payload("points")?.len(), 4);
/// # Ok::<(), sensordump_core::FrameError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: usize,
    fields: Map<String, Value>,
}

impl Frame {
    pub fn new(index: usize, fields: Map<String, Value>) -> Self {
        Self { index, fields }
    }

    pub fn from_value(index: usize, value: Value) -> Result<Self, FrameError> {
        match value {
            Value::Object(fields) => Ok(Self::new(index, fields)),
            _ => Err(FrameError::NotAMap),
        }
    }

    /// Zero-based position of the frame in its stream.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Result<&Value, FrameError> {
        self.fields.get(field).ok_or_else(|| FrameError::MissingField {
            field: field.to_string(),
        })
    }

    pub fn number(&self, field: &str) -> Result<f64, FrameError> {
        self.get(field)?
            .as_f64()
            .ok_or_else(|| FrameError::invalid(field, "a number"))
    }

    /// Absent and `null` fields both read as `None`.
    pub fn optional_number(&self, field: &str) -> Result<Option<f64>, FrameError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| FrameError::invalid(field, "a number")),
        }
    }

    pub fn dimension(&self, field: &str) -> Result<usize, FrameError> {
        self.get(field)?
            .as_u64()
            .and_then(|value| usize::try_from(value).ok())
            .ok_or_else(|| FrameError::invalid(field, "a non-negative integer"))
    }

    pub fn stamp(&self) -> Result<f64, FrameError> {
        self.number(FIELD_STAMP)
    }

    pub fn resolution(&self) -> Result<Option<f64>, FrameError> {
        self.optional_number(FIELD_RESOLUTION)
    }

    pub fn origin(&self) -> Result<Option<[f64; 3]>, FrameError> {
        let values = match self.fields.get(FIELD_ORIGIN) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(values)) => values,
            Some(_) => return Err(FrameError::invalid(FIELD_ORIGIN, "3 numbers")),
        };
        if values.len() != 3 {
            return Err(FrameError::invalid(FIELD_ORIGIN, "3 numbers"));
        }
        let mut origin = [0f64; 3];
        for (dst, src) in origin.iter_mut().zip(values) {
            *dst = src
                .as_f64()
                .ok_or_else(|| FrameError::invalid(FIELD_ORIGIN, "3 numbers"))?;
        }
        Ok(Some(origin))
    }

    pub fn point_step(&self) -> Result<usize, FrameError> {
        self.dimension(FIELD_POINT_STEP)
    }

    /// Read a byte buffer stored as an array of integers in `0..=255`.
    pub fn byte_payload(&self, field: &str) -> Result<Vec<u8>, FrameError> {
        let values = self
            .get(field)?
            .as_array()
            .ok_or_else(|| FrameError::invalid(field, "a byte array"))?;
        values
            .iter()
            .map(|value| {
                value
                    .as_u64()
                    .and_then(|byte| u8::try_from(byte).ok())
                    .ok_or_else(|| FrameError::invalid(field, "a byte array"))
            })
            .collect()
    }

    /// Read a flat list of numbers. `null` entries (NaN on the wire) read as NaN.
    pub fn scalar_payload(&self, field: &str) -> Result<Vec<f64>, FrameError> {
        let values = self
            .get(field)?
            .as_array()
            .ok_or_else(|| FrameError::invalid(field, "a list of numbers"))?;
        values
            .iter()
            .map(|value| match value {
                Value::Null => Ok(f64::NAN),
                other => other
                    .as_f64()
                    .ok_or_else(|| FrameError::invalid(field, "a list of numbers")),
            })
            .collect()
    }

    /// Every field except `excluded`, in original order.
    pub fn metadata_without(&self, excluded: &str) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|(key, _)| key.as_str() != excluded)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}
