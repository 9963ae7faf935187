/// Width in bytes of one packed `f32` field.
pub const FIELD_WIDTH: usize = 4;

pub const XYZ_ARITY: usize = 3;
pub const XYZI_ARITY: usize = 4;

/// Point step used by xyz-only clouds (3 packed `f32`).
pub const DEFAULT_POINT_STEP: usize = XYZ_ARITY * FIELD_WIDTH;

/// Bytes covered by the fields of one record of `arity` values.
pub const fn record_span(arity: usize) -> usize {
    arity * FIELD_WIDTH
}

/// Byte range of field `index` in the record starting at `offset`.
pub fn field_range(offset: usize, index: usize) -> std::ops::Range<usize> {
    let start = offset + index * FIELD_WIDTH;
    start..start + FIELD_WIDTH
}
