//! Frame sources.
//!
//! Sources own all input I/O and hand out one [`Frame`] at a time. A source
//! reports a per-frame problem as an error and stays usable, so callers can
//! record the failure and keep iterating; once a source cannot advance any
//! more it returns `Ok(None)`.

mod json_dir;
mod msgpack;
mod text;

pub(crate) use json_dir::list_files;
pub use json_dir::JsonDirSource;
pub use msgpack::{MsgpackFileSource, MsgpackSource, msgpack_to_json};
pub use text::{parse_text_dump, read_text_dump};

use std::path::PathBuf;

use thiserror::Error;

use crate::frame::Frame;

pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("MessagePack decode error at frame {index}: {message}")]
    Msgpack { index: usize, message: String },
    #[error("frame {index} is not a mapping")]
    NotAMap { index: usize },
    #[error("failed to read frame file {path}: {message}")]
    FrameFile {
        index: usize,
        path: PathBuf,
        message: String,
    },
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("invalid path pattern: {0}")]
    Pattern(String),
}

impl SourceError {
    /// Frame index the error belongs to, when known.
    pub fn frame_index(&self) -> Option<usize> {
        match self {
            SourceError::Msgpack { index, .. }
            | SourceError::NotAMap { index }
            | SourceError::FrameFile { index, .. } => Some(*index),
            _ => None,
        }
    }
}
