//! Frame record decoding.
//!
//! Turns one frame payload into an ordered sequence of fixed-arity `f32`
//! records. Two input modes exist:
//! - stride mode: a byte buffer holding little-endian `f32` fields, one
//!   record every `point_step` bytes;
//! - arity mode: a flat list of numbers chunked into records of `K` values.
//!
//! Decoding never fails on malformed lengths. Dropped tails and skipped
//! frames are reported as [`DecodeIssue`] values returned next to the
//! records. Byte offsets live in `layout`, bounds-checked reads in `reader`.

pub mod error;
pub mod layout;
pub mod parser;
mod reader;

pub use error::DecodeError;
pub use parser::{DecodeIssue, Decoded, LengthPolicy, Xyz, Xyzi, decode_strided, reshape_scalars};
