//! The in-memory `Record`: the 24-byte fixed header plus the two typed-value
//! streams (`shared`, `individual`) described in §3/§4 of the codec's
//! design. Decoding either stream is centralized here in
//! [`decode_shared`]/[`decode_individual`] so the emitter and the
//! convenience accessors below don't duplicate the walk.

use crate::codec;
use crate::dict::Site;
use crate::header::Header;
use crate::types::{is_missing_float32, TypeDescriptor};

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub rid: i32,
    pub pos: i32,
    pub rlen: i32,
    pub qual: f32,
    pub n_allele: u16,
    pub n_info: u16,
    pub n_fmt: u8,
    pub n_sample: u32,
    pub shared: Vec<u8>,
    pub individual: Vec<u8>,
}

impl Record {
    pub fn qual_is_missing(&self) -> bool {
        is_missing_float32(self.qual)
    }
}

/// The shared stream, decoded down to borrowed slices: ID, REF+ALT
/// alleles, the FILTER int vector, and one `(key_id, descriptor, payload)`
/// triple per INFO entry.
pub struct DecodedShared<'a> {
    pub id: Vec<u8>,
    pub alleles: Vec<Vec<u8>>,
    pub filter_ids: Vec<i64>,
    pub info: Vec<(i64, TypeDescriptor, &'a [u8])>,
}

pub fn decode_shared(record: &Record) -> crate::error::Result<DecodedShared<'_>> {
    let buf = record.shared.as_slice();
    let (buf, id) =
        codec::typed_string(buf).map_err(|_| crate::error::CodecError::BadDescriptor)?;
    let mut buf = buf;
    let mut alleles = Vec::with_capacity(record.n_allele as usize);
    for _ in 0..record.n_allele {
        let (rest, allele) =
            codec::typed_string(buf).map_err(|_| crate::error::CodecError::BadDescriptor)?;
        alleles.push(allele);
        buf = rest;
    }
    let (buf, filter_ids) =
        codec::typed_ints(buf).map_err(|_| crate::error::CodecError::BadDescriptor)?;
    let mut buf = buf;
    let mut info = Vec::with_capacity(record.n_info as usize);
    for _ in 0..record.n_info {
        let (rest, key_id) =
            codec::typed_int(buf).map_err(|_| crate::error::CodecError::BadDescriptor)?;
        let (rest, descriptor) =
            codec::type_descriptor(rest).map_err(|_| crate::error::CodecError::BadDescriptor)?;
        let width = descriptor.kind.size() * descriptor.num_elements;
        let payload = &rest[..width];
        info.push((key_id, descriptor, payload));
        buf = &rest[width..];
    }
    Ok(DecodedShared {
        id,
        alleles,
        filter_ids,
        info,
    })
}

/// One FORMAT column decoded out of `individual`: the declaring key's id,
/// the per-sample descriptor, and the full `n_sample`-wide payload.
///
/// The descriptor's `num_elements` means two different things depending on
/// `kind`: for CHAR it is already the *full* byte count (`stride *
/// n_sample`, matching how `encode_char` always works); for every numeric
/// kind it is only the *per-sample* stride, and the actual payload is
/// `n_sample` times that — see [`Self::per_sample_elements`].
pub struct FormatColumn<'a> {
    pub id: i64,
    pub descriptor: TypeDescriptor,
    pub payload: &'a [u8],
}

impl<'a> FormatColumn<'a> {
    pub fn per_sample_elements(&self, n_sample: u32) -> usize {
        match self.descriptor.kind {
            crate::types::TypeKind::Char => {
                if n_sample == 0 {
                    0
                } else {
                    self.descriptor.num_elements / n_sample as usize
                }
            }
            _ => self.descriptor.num_elements,
        }
    }
}

pub fn decode_individual(record: &Record) -> crate::error::Result<Vec<FormatColumn<'_>>> {
    let mut buf = record.individual.as_slice();
    let mut columns = Vec::with_capacity(record.n_fmt as usize);
    for _ in 0..record.n_fmt {
        let (rest, id) =
            codec::typed_int(buf).map_err(|_| crate::error::CodecError::BadDescriptor)?;
        let (rest, descriptor) =
            codec::type_descriptor(rest).map_err(|_| crate::error::CodecError::BadDescriptor)?;
        let width = match descriptor.kind {
            crate::types::TypeKind::Char => descriptor.kind.size() * descriptor.num_elements,
            _ => descriptor.kind.size() * descriptor.num_elements * record.n_sample as usize,
        };
        let payload = &rest[..width];
        columns.push(FormatColumn {
            id,
            descriptor,
            payload,
        });
        buf = &rest[width..];
    }
    Ok(columns)
}

impl Record {
    pub fn chrom<'h>(&self, header: &'h Header) -> Option<&'h str> {
        header.dict.contig_name(self.rid as u32)
    }

    pub fn ref_allele(&self) -> crate::error::Result<Vec<u8>> {
        Ok(decode_shared(self)?.alleles[0].clone())
    }

    pub fn alt_alleles(&self) -> crate::error::Result<Vec<Vec<u8>>> {
        Ok(decode_shared(self)?.alleles[1..].to_vec())
    }

    pub fn qual(&self) -> Option<f32> {
        if self.qual_is_missing() {
            None
        } else {
            Some(self.qual)
        }
    }

    pub fn filters<'h>(&self, header: &'h Header) -> crate::error::Result<Vec<&'h str>> {
        let decoded = decode_shared(self)?;
        Ok(decoded
            .filter_ids
            .iter()
            .filter_map(|&id| header.dict.id_name(id as u32))
            .collect())
    }

    pub fn info(&self, header: &Header, tag: &str) -> crate::error::Result<Option<String>> {
        let Some((key_id, _)) = header.dict.get_id(tag) else {
            return Ok(None);
        };
        let decoded = decode_shared(self)?;
        for (id, descriptor, payload) in decoded.info {
            if id == key_id as i64 {
                return Ok(Some(codec::format_vector(descriptor, payload)));
            }
        }
        Ok(None)
    }

    pub fn format(&self, header: &Header, tag: &str) -> crate::error::Result<Option<Vec<String>>> {
        let Some((key_id, meta)) = header.dict.get_id(tag) else {
            return Ok(None);
        };
        if meta.declaration(Site::Format).is_none() {
            return Ok(None);
        }
        let columns = decode_individual(self)?;
        for column in columns {
            if column.id == key_id as i64 {
                let per_sample = column.per_sample_elements(self.n_sample);
                let stride = column.descriptor.kind.size() * per_sample;
                let per_sample_descriptor = TypeDescriptor {
                    kind: column.descriptor.kind,
                    num_elements: per_sample,
                };
                let values = (0..self.n_sample as usize)
                    .map(|i| {
                        codec::format_vector(
                            per_sample_descriptor,
                            &column.payload[i * stride..(i + 1) * stride],
                        )
                    })
                    .collect();
                return Ok(Some(values));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_char, encode_int_vector};

    fn build_shared(id: &[u8], alleles: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_char(&mut out, id);
        for a in alleles {
            encode_char(&mut out, a);
        }
        encode_int_vector(&mut out, &[], -1);
        out
    }

    #[test]
    fn decode_shared_splits_id_and_alleles() {
        let shared = build_shared(b"", &[b"A", b"C"]);
        let record = Record {
            rid: 0,
            pos: 0,
            rlen: 1,
            qual: crate::types::missing_float32(),
            n_allele: 2,
            n_info: 0,
            n_fmt: 0,
            n_sample: 0,
            shared,
            individual: vec![],
        };
        let decoded = decode_shared(&record).unwrap();
        assert!(decoded.id.is_empty());
        assert_eq!(decoded.alleles, vec![b"A".to_vec(), b"C".to_vec()]);
        assert!(decoded.filter_ids.is_empty());
    }
}
