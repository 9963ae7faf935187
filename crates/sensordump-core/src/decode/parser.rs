use serde::{Deserialize, Serialize};

use super::error::DecodeError;
use super::layout;
use super::reader::RecordReader;

/// Spatial record: x, y, z.
pub type Xyz = [f32; layout::XYZ_ARITY];
/// Spatial record with intensity: x, y, z, intensity.
pub type Xyzi = [f32; layout::XYZI_ARITY];

/// What to do with a flat payload whose length is not a multiple of the arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LengthPolicy {
    /// Drop the trailing values and keep every complete record.
    Truncate,
    /// Return no records for the frame.
    SkipFrame,
}

impl LengthPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            LengthPolicy::Truncate => "truncate",
            LengthPolicy::SkipFrame => "skip-frame",
        }
    }
}

/// Recoverable anomaly observed while decoding one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeIssue {
    /// Flat payload length is not a multiple of the arity.
    /// `dropped` counts the values that ended up in no record.
    LengthMismatch {
        len: usize,
        arity: usize,
        dropped: usize,
        policy: LengthPolicy,
    },
    /// Byte payload ends with an incomplete stride window.
    PartialStride {
        len: usize,
        stride: usize,
        dropped_bytes: usize,
    },
}

/// Records decoded from one payload plus the anomalies seen on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<const K: usize> {
    pub records: Vec<[f32; K]>,
    pub issues: Vec<DecodeIssue>,
}

impl<const K: usize> Decoded<K> {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Decode `K` little-endian `f32` fields every `stride` bytes.
///
/// A record is emitted for every stride window that lies fully inside the
/// payload and covers the `K` fields. A trailing partial window yields no
/// record and is reported as [`DecodeIssue::PartialStride`].
///
/// # Examples
/// ```
/// use sensordump_core::decode::decode_strided;
///
/// let mut payload = Vec::new();
/// for value in [1.0f32, 2.0, 3.0] {
///     payload.extend_from_slice(&value.to_le_bytes());
/// }
/// payload.extend_from_slice(&[0u8; 4]);
///
/// let decoded = decode_strided::<3>(&payload, 12)?;
/// assert_eq!(decoded.records, vec![[1.0, 2.0, 3.0]]);
/// assert_eq!(decoded.issues.len(), 1);
/// # Ok::<(), sensordump_core::decode::DecodeError>(())
/// ```
///
/// # Errors
/// Returns [`DecodeError::ZeroStride`] when `stride` is zero.
pub fn decode_strided<const K: usize>(
    payload: &[u8],
    stride: usize,
) -> Result<Decoded<K>, DecodeError> {
    if stride == 0 {
        return Err(DecodeError::ZeroStride);
    }

    let reader = RecordReader::new(payload);
    let window = stride.max(layout::record_span(K));
    let mut records = Vec::with_capacity(reader.len() / stride);
    let mut offset = 0usize;
    while offset
        .checked_add(window)
        .is_some_and(|end| end <= reader.len())
    {
        records.push(reader.read_record::<K>(offset)?);
        offset += stride;
    }

    let mut issues = Vec::new();
    let dropped_bytes = reader.len() % stride;
    if dropped_bytes != 0 {
        issues.push(DecodeIssue::PartialStride {
            len: reader.len(),
            stride,
            dropped_bytes,
        });
    }

    Ok(Decoded { records, issues })
}

/// Chunk a flat list of numbers into records of `K` values, in order.
///
/// # Examples
/// ```
/// use sensordump_core::decode::{LengthPolicy, reshape_scalars};
///
/// let decoded = reshape_scalars::<3>(&[1.0, 2.0, 3.0, 4.0, 5.0], LengthPolicy::Truncate);
/// assert_eq!(decoded.records, vec![[1.0, 2.0, 3.0]]);
///
/// let skipped = reshape_scalars::<4>(&[1.0, 2.0, 3.0, 4.0, 5.0], LengthPolicy::SkipFrame);
/// assert!(skipped.records.is_empty());
/// ```
pub fn reshape_scalars<const K: usize>(values: &[f64], policy: LengthPolicy) -> Decoded<K> {
    const { assert!(K > 0, "record arity must be non-zero") };

    let mut issues = Vec::new();
    let remainder = values.len() % K;
    if remainder != 0 {
        let dropped = match policy {
            LengthPolicy::Truncate => remainder,
            LengthPolicy::SkipFrame => values.len(),
        };
        issues.push(DecodeIssue::LengthMismatch {
            len: values.len(),
            arity: K,
            dropped,
            policy,
        });
        if policy == LengthPolicy::SkipFrame {
            return Decoded {
                records: Vec::new(),
                issues,
            };
        }
    }

    let records = values
        .chunks_exact(K)
        .map(|chunk| {
            let mut record = [0f32; K];
            for (dst, src) in record.iter_mut().zip(chunk) {
                *dst = *src as f32;
            }
            record
        })
        .collect();

    Decoded { records, issues }
}
