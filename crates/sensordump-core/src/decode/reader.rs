use super::error::DecodeError;
use super::layout;

pub struct RecordReader<'a> {
    payload: &'a [u8],
}

impl<'a> RecordReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn require_len(&self, needed: usize) -> Result<(), DecodeError> {
        if self.payload.len() < needed {
            return Err(DecodeError::TooShort {
                needed,
                actual: self.payload.len(),
            });
        }
        Ok(())
    }

    pub fn read_slice(&self, range: std::ops::Range<usize>) -> Result<&'a [u8], DecodeError> {
        self.payload.get(range.clone()).ok_or(DecodeError::TooShort {
            needed: range.end,
            actual: self.payload.len(),
        })
    }

    pub fn read_f32_le(&self, range: std::ops::Range<usize>) -> Result<f32, DecodeError> {
        let bytes = self.read_slice(range)?;
        let bytes: [u8; layout::FIELD_WIDTH] =
            bytes.try_into().map_err(|_| DecodeError::TooShort {
                needed: layout::FIELD_WIDTH,
                actual: bytes.len(),
            })?;
        Ok(f32::from_le_bytes(bytes))
    }

    /// Read `K` consecutive fields starting at `offset`.
    pub fn read_record<const K: usize>(&self, offset: usize) -> Result<[f32; K], DecodeError> {
        self.require_len(offset + layout::record_span(K))?;
        let mut record = [0f32; K];
        for (index, value) in record.iter_mut().enumerate() {
            *value = self.read_f32_le(layout::field_range(offset, index))?;
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::RecordReader;
    use crate::decode::error::DecodeError;

    #[test]
    fn read_f32_le_decodes_field() {
        let bytes = 1.5f32.to_le_bytes();
        let reader = RecordReader::new(&bytes);
        assert_eq!(reader.read_f32_le(0..4).unwrap(), 1.5);
    }

    #[test]
    fn read_record_at_offset() {
        let mut bytes = vec![0xffu8; 4];
        for value in [1.0f32, -2.0, 3.25] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let reader = RecordReader::new(&bytes);
        let record = reader.read_record::<3>(4).unwrap();
        assert_eq!(record, [1.0, -2.0, 3.25]);
    }

    #[test]
    fn read_record_too_short() {
        let bytes = [0u8; 11];
        let reader = RecordReader::new(&bytes);
        let err = reader.read_record::<3>(0).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TooShort {
                needed: 12,
                actual: 11
            }
        );
    }
}
