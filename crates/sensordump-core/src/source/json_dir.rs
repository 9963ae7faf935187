use std::fs;
use std::path::{Path, PathBuf};

use glob::{Pattern, glob};

use super::{FrameSource, SourceError};
use crate::frame::Frame;

/// Directory of per-frame JSON files, read in file-name order.
pub struct JsonDirSource {
    paths: std::vec::IntoIter<PathBuf>,
    next_index: usize,
}

impl JsonDirSource {
    pub fn open(dir: &Path) -> Result<Self, SourceError> {
        if !dir.is_dir() {
            return Err(SourceError::NotADirectory(dir.to_path_buf()));
        }
        let paths = list_files(dir, "json")?;
        Ok(Self::from_paths(paths))
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            paths: paths.into_iter(),
            next_index: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for JsonDirSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(path) = self.paths.next() else {
            return Ok(None);
        };
        let index = self.next_index;
        self.next_index += 1;

        let text = fs::read_to_string(&path).map_err(|err| SourceError::FrameFile {
            index,
            path: path.clone(),
            message: err.to_string(),
        })?;
        let value = serde_json::from_str(&text).map_err(|err| SourceError::FrameFile {
            index,
            path: path.clone(),
            message: err.to_string(),
        })?;
        Frame::from_value(index, value)
            .map(Some)
            .map_err(|_| SourceError::NotAMap { index })
    }
}

/// Regular files in `dir` with the given extension, sorted by path.
pub(crate) fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, SourceError> {
    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(&dir.to_string_lossy()),
        extension
    );
    let entries = glob(&pattern).map_err(|err| SourceError::Pattern(err.msg.to_string()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| SourceError::Io(err.into()))?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
