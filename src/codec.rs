//! The typed-value wire format: a one-byte descriptor (primitive kind in
//! the low nibble, element count in the high nibble, spilling to a nested
//! typed int when the count reaches 15) followed by a little-endian
//! payload. Decoding is built with `nom` the way the rest of the parser is;
//! encoding is a handful of `Vec<u8>`-pushing helpers since there is no
//! streaming concern on the write side.

use std::convert::TryFrom;
use std::fmt::Write as _;

use nom::multi::many_m_n;
use nom::number::streaming::{le_f32, le_i16, le_i32, le_i8, le_u16, le_u32, le_u8};
use nom::IResult;

use crate::error::{CodecError, Result};
use crate::types::{
    is_missing_float32, missing_float32, TypeDescriptor, TypeKind, MISSING_INT16, MISSING_INT32,
    MISSING_INT8,
};

fn descriptor_byte(kind: TypeKind, count_nibble: u8) -> u8 {
    let kind_byte: u8 = kind.into();
    kind_byte | (count_nibble << 4)
}

/// Writes a type descriptor, spilling the true count into a nested typed
/// int when `count >= 15` (count == 15 is the spill marker itself, so a
/// vector of literal length 15 spills too).
pub fn encode_size(out: &mut Vec<u8>, count: usize, kind: TypeKind) {
    if count < 15 {
        out.push(descriptor_byte(kind, count as u8));
    } else {
        out.push(descriptor_byte(kind, 15));
        encode_count_int(out, count);
    }
}

/// The nested typed int used by the count==15 spill: always a single
/// element, width chosen narrowly for the count itself.
fn encode_count_int(out: &mut Vec<u8>, count: usize) {
    if count <= i8::MAX as usize {
        out.push(descriptor_byte(TypeKind::Int8, 1));
        out.push(count as u8);
    } else if count <= i16::MAX as usize {
        out.push(descriptor_byte(TypeKind::Int16, 1));
        out.extend_from_slice(&(count as i16).to_le_bytes());
    } else {
        out.push(descriptor_byte(TypeKind::Int32, 1));
        out.extend_from_slice(&(count as i32).to_le_bytes());
    }
}

/// Encodes an integer vector at the narrowest width that fits every
/// non-missing value, reserving that width's sentinel for "missing".
/// `window <= 0` means "use the vector's own length" as the declared
/// element count; a positive `window` greater than `values.len()` pads
/// the tail with missing sentinels (the fixed per-sample stride case).
pub fn encode_int_vector(out: &mut Vec<u8>, values: &[Option<i64>], window: isize) {
    let declared = if window > 0 {
        window as usize
    } else {
        values.len()
    };
    if declared == 0 {
        encode_size(out, 0, TypeKind::Missing);
        return;
    }
    let (min, max) = values.iter().flatten().fold((i64::MAX, i64::MIN), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });
    let kind = if values.iter().all(Option::is_none) {
        TypeKind::Int8
    } else if min as i128 > MISSING_INT8 as i128 && max <= i8::MAX as i64 {
        TypeKind::Int8
    } else if min as i128 > MISSING_INT16 as i128 && max <= i16::MAX as i64 {
        TypeKind::Int16
    } else {
        TypeKind::Int32
    };
    encode_size(out, declared, kind);
    for i in 0..declared {
        let v = values.get(i).copied().flatten();
        match kind {
            TypeKind::Int8 => out.push(v.map(|v| v as i8).unwrap_or(MISSING_INT8) as u8),
            TypeKind::Int16 => out
                .extend_from_slice(&v.map(|v| v as i16).unwrap_or(MISSING_INT16).to_le_bytes()),
            TypeKind::Int32 => out
                .extend_from_slice(&v.map(|v| v as i32).unwrap_or(MISSING_INT32).to_le_bytes()),
            _ => unreachable!("int vectors only ever pick an integer width"),
        }
    }
}

/// Float vectors are always encoded as FLOAT32.
pub fn encode_float_vector(out: &mut Vec<u8>, values: &[Option<f32>]) {
    encode_size(out, values.len(), TypeKind::Float32);
    for v in values {
        out.extend_from_slice(&v.unwrap_or_else(missing_float32).to_le_bytes());
    }
}

/// CHAR vector: raw bytes, no NUL termination, no value-level sentinel
/// (sentinel `0x00` is reserved for tail padding only).
pub fn encode_char(out: &mut Vec<u8>, text: &[u8]) {
    encode_size(out, text.len(), TypeKind::Char);
    out.extend_from_slice(text);
}

pub fn encode_int_scalar(out: &mut Vec<u8>, value: i64) {
    encode_int_vector(out, &[Some(value)], -1);
}

/// A FORMAT column's integer payload: the descriptor declares only the
/// per-sample stride (`per_sample`), while `values` holds all
/// `per_sample * n_sample` slots flattened — the decoder recovers the
/// sample boundary by dividing the payload length by the declared count.
pub fn encode_format_int_column(out: &mut Vec<u8>, values: &[Option<i64>], per_sample: usize) {
    if per_sample == 0 {
        encode_size(out, 0, TypeKind::Missing);
        return;
    }
    let (min, max) = values.iter().flatten().fold((i64::MAX, i64::MIN), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });
    let kind = if values.iter().all(Option::is_none) {
        TypeKind::Int8
    } else if min as i128 > MISSING_INT8 as i128 && max <= i8::MAX as i64 {
        TypeKind::Int8
    } else if min as i128 > MISSING_INT16 as i128 && max <= i16::MAX as i64 {
        TypeKind::Int16
    } else {
        TypeKind::Int32
    };
    encode_size(out, per_sample, kind);
    for v in values {
        match kind {
            TypeKind::Int8 => out.push(v.map(|v| v as i8).unwrap_or(MISSING_INT8) as u8),
            TypeKind::Int16 => out
                .extend_from_slice(&v.map(|v| v as i16).unwrap_or(MISSING_INT16).to_le_bytes()),
            TypeKind::Int32 => out
                .extend_from_slice(&v.map(|v| v as i32).unwrap_or(MISSING_INT32).to_le_bytes()),
            _ => unreachable!("int vectors only ever pick an integer width"),
        }
    }
}

/// Mirrors [`encode_format_int_column`] for FLOAT FORMAT columns: always
/// FLOAT32, descriptor declares the per-sample stride only.
pub fn encode_format_float_column(out: &mut Vec<u8>, values: &[Option<f32>], per_sample: usize) {
    if per_sample == 0 {
        encode_size(out, 0, TypeKind::Missing);
        return;
    }
    encode_size(out, per_sample, TypeKind::Float32);
    for v in values {
        out.extend_from_slice(&v.unwrap_or_else(missing_float32).to_le_bytes());
    }
}

fn read_count_int(kind: TypeKind, input: &[u8]) -> IResult<&[u8], usize> {
    match kind {
        TypeKind::Int8 => nom::combinator::map(le_u8, |v| v as usize)(input),
        TypeKind::Int16 => nom::combinator::map(le_u16, |v| v as usize)(input),
        TypeKind::Int32 => nom::combinator::map(le_u32, |v| v as usize)(input),
        _ => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Alt,
        ))),
    }
}

/// Decodes one type descriptor, resolving the count==15 spill.
pub fn type_descriptor(input: &[u8]) -> IResult<&[u8], TypeDescriptor> {
    let (input, byte) = le_u8(input)?;
    let kind_bits = byte & 0b1111;
    let kind = TypeKind::try_from(kind_bits).map_err(|_| {
        nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Alt))
    })?;
    let nibble = (byte >> 4) & 0b1111;
    let (input, num_elements) = if nibble == 15 {
        let (input, TypeDescriptor { kind: int_kind, .. }) = type_descriptor(input)?;
        read_count_int(int_kind, input)?
    } else {
        (input, nibble as usize)
    };
    Ok((
        input,
        TypeDescriptor {
            kind,
            num_elements,
        },
    ))
}

pub fn decode_size(buf: &[u8]) -> Result<(TypeDescriptor, &[u8])> {
    type_descriptor(buf)
        .map(|(rest, td)| (td, rest))
        .map_err(|_| CodecError::BadDescriptor)
}

/// Decodes a single typed integer (descriptor must declare exactly one
/// element); used for the INFO/FORMAT key-id prefix ahead of each value.
pub fn typed_int(input: &[u8]) -> IResult<&[u8], i64> {
    let (input, TypeDescriptor { kind, num_elements }) = type_descriptor(input)?;
    debug_assert_eq!(num_elements, 1);
    match kind {
        TypeKind::Int8 => nom::combinator::map(le_i8, i64::from)(input),
        TypeKind::Int16 => nom::combinator::map(le_i16, i64::from)(input),
        TypeKind::Int32 => nom::combinator::map(le_i32, i64::from)(input),
        _ => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Alt,
        ))),
    }
}

pub fn typed_string(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let (input, TypeDescriptor { kind, num_elements }) = type_descriptor(input)?;
    debug_assert_eq!(kind, TypeKind::Char);
    let (input, bytes) = nom::bytes::streaming::take(num_elements)(input)?;
    Ok((input, bytes.to_vec()))
}

/// A FILTER-style integer vector: `Missing` descriptor decodes as empty.
pub fn typed_ints(input: &[u8]) -> IResult<&[u8], Vec<i64>> {
    let (input, TypeDescriptor { kind, num_elements }) = type_descriptor(input)?;
    match kind {
        TypeKind::Missing => Ok((input, vec![])),
        TypeKind::Int8 => many_m_n(num_elements, num_elements, nom::combinator::map(le_i8, i64::from))(input),
        TypeKind::Int16 => {
            many_m_n(num_elements, num_elements, nom::combinator::map(le_i16, i64::from))(input)
        }
        TypeKind::Int32 => {
            many_m_n(num_elements, num_elements, nom::combinator::map(le_i32, i64::from))(input)
        }
        other => {
            log::debug!("unsupported integer-vector type {:?}", other);
            Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Alt,
            )))
        }
    }
}

pub fn typed_floats(input: &[u8]) -> IResult<&[u8], Vec<f32>> {
    let (input, TypeDescriptor { kind, num_elements }) = type_descriptor(input)?;
    debug_assert_eq!(kind, TypeKind::Float32);
    many_m_n(num_elements, num_elements, le_f32)(input)
}

/// Skips over one typed value of any kind, returning the byte offset just
/// past it; used to walk past fields whose exact shape isn't needed.
pub fn skip_typed_value(input: &[u8]) -> IResult<&[u8], ()> {
    let (input, TypeDescriptor { kind, num_elements }) = type_descriptor(input)?;
    let width = kind.size();
    let (input, _) = nom::bytes::streaming::take(width * num_elements)(input)?;
    Ok((input, ()))
}

/// Renders a decoded typed value as VCF-TEXT: comma-separated, stopping
/// early at the type's missing sentinel (so padding introduced to provide
/// a fixed per-sample stride never shows up in text); a fully-missing
/// vector renders as `.`.
pub fn format_vector(descriptor: TypeDescriptor, payload: &[u8]) -> String {
    let TypeDescriptor { kind, num_elements } = descriptor;
    let mut out = String::new();
    match kind {
        TypeKind::Missing => return ".".to_string(),
        TypeKind::Char => {
            let text = &payload[..num_elements.min(payload.len())];
            let end = text
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(text.len());
            return String::from_utf8_lossy(&text[..end]).into_owned();
        }
        TypeKind::Int8 | TypeKind::Int16 | TypeKind::Int32 => {
            let width = kind.size();
            let mut wrote_any = false;
            for i in 0..num_elements {
                let slot = &payload[i * width..(i + 1) * width];
                let (missing, value) = match kind {
                    TypeKind::Int8 => (slot[0] as i8 == MISSING_INT8, slot[0] as i8 as i64),
                    TypeKind::Int16 => {
                        let v = i16::from_le_bytes([slot[0], slot[1]]);
                        (v == MISSING_INT16, v as i64)
                    }
                    TypeKind::Int32 => {
                        let v = i32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]);
                        (v == MISSING_INT32, v as i64)
                    }
                    _ => unreachable!(),
                };
                if missing {
                    break;
                }
                if wrote_any {
                    out.push(',');
                }
                let _ = write!(out, "{}", value);
                wrote_any = true;
            }
            if !wrote_any {
                return ".".to_string();
            }
        }
        TypeKind::Float32 => {
            let mut wrote_any = false;
            for i in 0..num_elements {
                let slot = &payload[i * 4..(i + 1) * 4];
                let v = f32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]);
                if is_missing_float32(v) {
                    break;
                }
                if wrote_any {
                    out.push(',');
                }
                let _ = write!(out, "{}", format_float(v));
                wrote_any = true;
            }
            if !wrote_any {
                return ".".to_string();
            }
        }
    }
    out
}

/// `%g`-style rendering: shortest representation that round-trips, no
/// trailing zeroes, integral floats print without a fractional part.
pub fn format_float(v: f32) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let s = format!("{}", v);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_width_selection() {
        let mut out = Vec::new();
        encode_int_vector(&mut out, &[Some(1), Some(2), Some(127)], -1);
        assert_eq!(out[0] & 0b1111, 1); // Int8
        assert_eq!(out.len(), 1 + 3);

        let mut out = Vec::new();
        encode_int_vector(&mut out, &[Some(1), Some(2), Some(128)], -1);
        assert_eq!(out[0] & 0b1111, 2); // Int16
        assert_eq!(out.len(), 1 + 6);
    }

    #[test]
    fn missing_forces_narrowest_reserved_sentinel() {
        let mut out = Vec::new();
        encode_int_vector(&mut out, &[None, Some(5)], -1);
        assert_eq!(out[0] & 0b1111, 1); // Int8
        assert_eq!(out[1] as i8, MISSING_INT8);
        assert_eq!(out[2] as i8, 5);
    }

    #[test]
    fn literal_length_fifteen_still_spills() {
        let values: Vec<Option<i64>> = (0..15).map(Some).collect();
        let mut out = Vec::new();
        encode_int_vector(&mut out, &values, -1);
        let nibble = (out[0] >> 4) & 0b1111;
        assert_eq!(nibble, 15, "a vector of literal length 15 must spill");
    }

    #[test]
    fn empty_vector_encodes_as_missing_descriptor() {
        let mut out = Vec::new();
        encode_int_vector(&mut out, &[], -1);
        assert_eq!(out, vec![descriptor_byte(TypeKind::Missing, 0)]);
    }

    #[test]
    fn format_vector_stops_at_missing() {
        let mut out = Vec::new();
        encode_int_vector(&mut out, &[Some(1), Some(2)], 4);
        let (descriptor, payload) = decode_size(&out).unwrap();
        assert_eq!(format_vector(descriptor, payload), "1,2");
    }

    #[test]
    fn format_vector_all_missing_renders_dot() {
        let mut out = Vec::new();
        encode_int_vector(&mut out, &[None, None], -1);
        let (descriptor, payload) = decode_size(&out).unwrap();
        assert_eq!(format_vector(descriptor, payload), ".");
    }

    #[test]
    fn char_vector_roundtrip() {
        let mut out = Vec::new();
        encode_char(&mut out, b"ACGT");
        let (rest, text) = typed_string(&out).unwrap();
        assert!(rest.is_empty());
        assert_eq!(text, b"ACGT");
    }

    #[test]
    fn scalar_int_roundtrip() {
        let mut out = Vec::new();
        encode_int_scalar(&mut out, 42);
        let (rest, v) = typed_int(&out).unwrap();
        assert!(rest.is_empty());
        assert_eq!(v, 42);
    }
}
