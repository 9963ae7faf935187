use thiserror::Error;

/// Errors returned by the record decoder.
///
/// Malformed payload lengths are not errors; see `DecodeIssue`.
///
/// # Examples
/// ```
/// use sensordump_core::decode::DecodeError;
///
/// let err = DecodeError::ZeroStride;
/// assert!(err.to_string().contains("point step"));
/// ```
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("point step must be greater than zero")]
    ZeroStride,
}
