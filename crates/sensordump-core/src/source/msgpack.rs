use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rmpv::Value as MsgValue;
use serde_json::{Map, Number, Value};

use super::{FrameSource, SourceError};
use crate::frame::Frame;

/// Stream of consecutive MessagePack values, one frame per top-level value.
pub struct MsgpackSource<R> {
    reader: R,
    next_index: usize,
    finished: bool,
}

pub type MsgpackFileSource = MsgpackSource<BufReader<File>>;

impl MsgpackSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(64 * 1024, file)))
    }
}

impl<R: BufRead> MsgpackSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            next_index: 0,
            finished: false,
        }
    }

    fn at_eof(&mut self) -> Result<bool, SourceError> {
        Ok(self.reader.fill_buf()?.is_empty())
    }
}

impl<R: BufRead> FrameSource for MsgpackSource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.finished {
            return Ok(None);
        }
        match self.at_eof() {
            Ok(false) => {}
            Ok(true) => {
                self.finished = true;
                return Ok(None);
            }
            Err(err) => {
                self.finished = true;
                return Err(err);
            }
        }

        let index = self.next_index;
        self.next_index += 1;
        // The stream has no framing, so a decode error leaves no point to resume from.
        let value = rmpv::decode::read_value(&mut self.reader).map_err(|err| {
            self.finished = true;
            SourceError::Msgpack {
                index,
                message: err.to_string(),
            }
        })?;

        Frame::from_value(index, msgpack_to_json(value))
            .map(Some)
            .map_err(|_| SourceError::NotAMap { index })
    }
}

/// Convert a MessagePack value into the JSON model used by [`Frame`].
///
/// Binary blobs become arrays of byte values, non-string map keys are
/// rendered as JSON text, non-finite floats become `null`, and extension
/// values become `{"ext": type, "data": [bytes]}`.
pub fn msgpack_to_json(value: MsgValue) -> Value {
    match value {
        MsgValue::Nil => Value::Null,
        MsgValue::Boolean(flag) => Value::Bool(flag),
        MsgValue::Integer(int) => int
            .as_u64()
            .map(Value::from)
            .or_else(|| int.as_i64().map(Value::from))
            .unwrap_or(Value::Null),
        MsgValue::F32(float) => float_to_json(f64::from(float)),
        MsgValue::F64(float) => float_to_json(float),
        MsgValue::String(text) => match text.into_str() {
            Some(text) => Value::String(text),
            None => Value::Null,
        },
        MsgValue::Binary(bytes) => bytes_to_json(bytes),
        MsgValue::Array(items) => Value::Array(items.into_iter().map(msgpack_to_json).collect()),
        MsgValue::Map(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key_to_string(key), msgpack_to_json(value)))
                .collect::<Map<String, Value>>(),
        ),
        MsgValue::Ext(kind, data) => {
            let mut ext = Map::new();
            ext.insert("ext".to_string(), Value::from(kind));
            ext.insert("data".to_string(), bytes_to_json(data));
            Value::Object(ext)
        }
    }
}

fn float_to_json(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn bytes_to_json(bytes: Vec<u8>) -> Value {
    Value::Array(bytes.into_iter().map(Value::from).collect())
}

fn key_to_string(key: MsgValue) -> String {
    match key {
        MsgValue::String(text) => match text.into_str() {
            Some(text) => text,
            None => String::from("<invalid utf-8>"),
        },
        other => msgpack_to_json(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(values: &[MsgValue]) -> Vec<u8> {
        let mut buf = Vec::new();
        for value in values {
            rmpv::encode::write_value(&mut buf, value).unwrap();
        }
        buf
    }

    fn map(entries: Vec<(&str, MsgValue)>) -> MsgValue {
        MsgValue::Map(
            entries
                .into_iter()
                .map(|(key, value)| (MsgValue::from(key), value))
                .collect(),
        )
    }

    #[test]
    fn reads_consecutive_frames() {
        let bytes = encode(&[
            map(vec![("stamp", MsgValue::from(1.0))]),
            map(vec![("stamp", MsgValue::from(2.0))]),
        ]);
        let mut source = MsgpackSource::new(Cursor::new(bytes));

        let first = source.next_frame().unwrap().unwrap();
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(first.index(), 0);
        assert_eq!(second.stamp().unwrap(), 2.0);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn binary_becomes_byte_array() {
        let bytes = encode(&[map(vec![
            ("point_step", MsgValue::from(12)),
            ("data", MsgValue::Binary(vec![1, 2, 3])),
        ])]);
        let mut source = MsgpackSource::new(Cursor::new(bytes));
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.byte_payload("data").unwrap(), vec![1, 2, 3]);
        assert_eq!(frame.point_step().unwrap(), 12);
    }

    #[test]
    fn non_map_value_is_reported_and_skipped() {
        let bytes = encode(&[
            MsgValue::from(42),
            map(vec![("stamp", MsgValue::from(3.0))]),
        ]);
        let mut source = MsgpackSource::new(Cursor::new(bytes));
        let err = source.next_frame().unwrap_err();
        assert!(matches!(err, SourceError::NotAMap { index: 0 }));
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.index(), 1);
    }

    #[test]
    fn truncated_stream_ends_after_error() {
        let mut bytes = encode(&[map(vec![("stamp", MsgValue::from(1.0))])]);
        let full = encode(&[map(vec![("points", MsgValue::Array(vec![MsgValue::from(1.0); 8]))])]);
        bytes.extend_from_slice(&full[..full.len() - 3]);

        let mut source = MsgpackSource::new(Cursor::new(bytes));
        assert!(source.next_frame().unwrap().is_some());
        let err = source.next_frame().unwrap_err();
        assert_eq!(err.frame_index(), Some(1));
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn empty_stream_has_no_frames() {
        let mut source = MsgpackSource::new(Cursor::new(Vec::new()));
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn nan_becomes_null() {
        assert_eq!(msgpack_to_json(MsgValue::F32(f32::NAN)), Value::Null);
    }
}
