//! The record emitter: VCF-TEXT rendering (walking `shared`/`individual`
//! back into tab-delimited text) and the VCF-BIN wire format (length-
//! prefixing the two streams verbatim behind a fixed 24-byte record
//! header).

use std::convert::TryInto;
use std::fmt::Write as _;
use std::io::{self, Read, Write};

use crate::codec;
use crate::error::CodecError;
use crate::header::Header;
use crate::record::{self, Record};
use crate::types::{TypeDescriptor, TypeKind, MISSING_INT16, MISSING_INT32, MISSING_INT8};

pub const MAGIC: &[u8; 4] = b"BCF\x02";

/// Renders one record as a single VCF-TEXT line (no trailing newline).
pub fn emit_text(record: &Record, header: &Header) -> crate::error::Result<String> {
    let mut out = String::new();
    let chrom = record.chrom(header).unwrap_or(".");
    let _ = write!(out, "{}\t{}\t", chrom, record.pos + 1);

    let decoded = record::decode_shared(record)?;
    if decoded.id.is_empty() {
        out.push_str(".\t");
    } else {
        out.push_str(&String::from_utf8_lossy(&decoded.id));
        out.push('\t');
    }

    match decoded.alleles.len() {
        0 => out.push_str(".\t.\t"),
        1 => {
            out.push_str(&String::from_utf8_lossy(&decoded.alleles[0]));
            out.push_str("\t.\t");
        }
        _ => {
            out.push_str(&String::from_utf8_lossy(&decoded.alleles[0]));
            out.push('\t');
            let alts: Vec<String> = decoded.alleles[1..]
                .iter()
                .map(|a| String::from_utf8_lossy(a).into_owned())
                .collect();
            out.push_str(&alts.join(","));
            out.push('\t');
        }
    }

    if record.qual_is_missing() {
        out.push_str(".\t");
    } else {
        out.push_str(&codec::format_float(record.qual));
        out.push('\t');
    }

    if decoded.filter_ids.is_empty() {
        out.push_str(".\t");
    } else {
        let names: Vec<&str> = decoded
            .filter_ids
            .iter()
            .filter_map(|&id| header.dict.id_name(id as u32))
            .collect();
        out.push_str(&names.join(";"));
        out.push('\t');
    }

    if decoded.info.is_empty() {
        out.push('.');
    } else {
        let parts: Vec<String> = decoded
            .info
            .iter()
            .map(|(id, descriptor, payload)| {
                let name = header.dict.id_name(*id as u32).unwrap_or("?");
                if descriptor.kind == TypeKind::Missing {
                    name.to_string()
                } else {
                    format!("{name}={}", codec::format_vector(*descriptor, payload))
                }
            })
            .collect();
        out.push_str(&parts.join(";"));
    }

    if record.n_fmt > 0 {
        let columns = record::decode_individual(record)?;
        let names: Vec<&str> = columns
            .iter()
            .map(|c| header.dict.id_name(c.id as u32).unwrap_or("?"))
            .collect();
        let _ = write!(out, "\t{}", names.join(":"));
        for i in 0..record.n_sample as usize {
            out.push('\t');
            let mut parts = Vec::with_capacity(columns.len());
            for column in &columns {
                let is_gt = header.dict.id_name(column.id as u32) == Some("GT");
                let per_sample = column.per_sample_elements(record.n_sample);
                let stride = column.descriptor.kind.size() * per_sample;
                let slice = &column.payload[i * stride..(i + 1) * stride];
                let per_sample_descriptor = TypeDescriptor {
                    kind: column.descriptor.kind,
                    num_elements: per_sample,
                };
                let rendered = if is_gt {
                    format_genotype(per_sample_descriptor, slice)
                } else {
                    codec::format_vector(per_sample_descriptor, slice)
                };
                parts.push(rendered);
            }
            out.push_str(&parts.join(":"));
        }
    }

    Ok(out)
}

/// Renders a GT slot by dispatching on the descriptor's declared integer
/// width rather than assuming INT8, so ploidy/allele counts the encoder
/// widened to INT16/INT32 still render correctly.
fn format_genotype(descriptor: TypeDescriptor, payload: &[u8]) -> String {
    let width = descriptor.kind.size();
    let mut out = String::new();
    let mut wrote_any = false;
    for i in 0..descriptor.num_elements {
        let slot = &payload[i * width..(i + 1) * width];
        let (raw, missing): (i64, bool) = match descriptor.kind {
            TypeKind::Int8 => {
                let v = slot[0] as i8;
                (v as i64, v == MISSING_INT8)
            }
            TypeKind::Int16 => {
                let v = i16::from_le_bytes([slot[0], slot[1]]);
                (v as i64, v == MISSING_INT16)
            }
            TypeKind::Int32 => {
                let v = i32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]);
                (v as i64, v == MISSING_INT32)
            }
            _ => unreachable!("GT columns are always encoded as an integer width"),
        };
        if missing {
            break;
        }
        if wrote_any {
            out.push(if raw & 1 == 1 { '|' } else { '/' });
        }
        let allele = (raw >> 1) - 1;
        if allele < 0 {
            out.push('.');
        } else {
            let _ = write!(out, "{allele}");
        }
        wrote_any = true;
    }
    if wrote_any {
        out
    } else {
        ".".to_string()
    }
}

/// Writes the VCF-BIN file prologue: magic, `l_text`, header text verbatim.
pub fn write_header<W: Write>(out: &mut W, header: &Header) -> crate::error::Result<()> {
    out.write_all(MAGIC).map_err(CodecError::Write)?;
    out.write_all(&header.l_text().to_le_bytes())
        .map_err(CodecError::Write)?;
    out.write_all(&header.text).map_err(CodecError::Write)?;
    Ok(())
}

/// Writes one record: `l_shared`/`l_indiv`, the 24-byte fixed header, then
/// the two streams verbatim.
pub fn write_record<W: Write>(out: &mut W, record: &Record) -> crate::error::Result<()> {
    out.write_all(&(record.shared.len() as u32).to_le_bytes())
        .map_err(CodecError::Write)?;
    out.write_all(&(record.individual.len() as u32).to_le_bytes())
        .map_err(CodecError::Write)?;
    out.write_all(&record.rid.to_le_bytes())
        .map_err(CodecError::Write)?;
    out.write_all(&record.pos.to_le_bytes())
        .map_err(CodecError::Write)?;
    out.write_all(&record.rlen.to_le_bytes())
        .map_err(CodecError::Write)?;
    out.write_all(&record.qual.to_le_bytes())
        .map_err(CodecError::Write)?;
    out.write_all(&record.n_info.to_le_bytes())
        .map_err(CodecError::Write)?;
    out.write_all(&record.n_allele.to_le_bytes())
        .map_err(CodecError::Write)?;
    let packed = (record.n_sample & 0x00FF_FFFF) | ((record.n_fmt as u32) << 24);
    out.write_all(&packed.to_le_bytes())
        .map_err(CodecError::Write)?;
    out.write_all(&record.shared).map_err(CodecError::Write)?;
    out.write_all(&record.individual)
        .map_err(CodecError::Write)?;
    Ok(())
}

fn read_exact_truncated<R: Read>(input: &mut R, buf: &mut [u8]) -> crate::error::Result<()> {
    match input.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(CodecError::TruncatedRecord {
            expected: buf.len(),
            got: 0,
        }),
        Err(e) => Err(CodecError::Read(e)),
    }
}

/// Reads the VCF-BIN prologue and returns the parsed `Header`.
pub fn read_header<R: Read>(input: &mut R) -> crate::error::Result<Header> {
    let mut magic = [0u8; 4];
    read_exact_truncated(input, &mut magic)?;
    if &magic != MAGIC {
        return Err(CodecError::BadMagic(magic.to_vec()));
    }
    let mut len_buf = [0u8; 4];
    read_exact_truncated(input, &mut len_buf)?;
    let l_text = u32::from_le_bytes(len_buf);
    let mut text = vec![0u8; l_text as usize];
    read_exact_truncated(input, &mut text)?;
    Header::parse(&text)
}

/// Reads one record, or `None` at a clean end-of-stream (no bytes of the
/// next length prefix available at all).
pub fn read_record<R: Read>(input: &mut R) -> crate::error::Result<Option<Record>> {
    let mut len_buf = [0u8; 8];
    match input.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(CodecError::Read(e)),
    }
    let l_shared = u32::from_le_bytes(len_buf[0..4].try_into().unwrap());
    let l_indiv = u32::from_le_bytes(len_buf[4..8].try_into().unwrap());

    let mut fixed = [0u8; 24];
    read_exact_truncated(input, &mut fixed)?;
    let rid = i32::from_le_bytes(fixed[0..4].try_into().unwrap());
    let pos = i32::from_le_bytes(fixed[4..8].try_into().unwrap());
    let rlen = i32::from_le_bytes(fixed[8..12].try_into().unwrap());
    let qual = f32::from_le_bytes(fixed[12..16].try_into().unwrap());
    let n_info = u16::from_le_bytes(fixed[16..18].try_into().unwrap());
    let n_allele = u16::from_le_bytes(fixed[18..20].try_into().unwrap());
    let packed = u32::from_le_bytes(fixed[20..24].try_into().unwrap());
    let n_sample = packed & 0x00FF_FFFF;
    let n_fmt = (packed >> 24) as u8;

    let mut shared = vec![0u8; l_shared as usize];
    read_exact_truncated(input, &mut shared)?;
    let mut individual = vec![0u8; l_indiv as usize];
    read_exact_truncated(input, &mut individual)?;

    Ok(Some(Record {
        rid,
        pos,
        rlen,
        qual,
        n_allele,
        n_info,
        n_fmt,
        n_sample,
        shared,
        individual,
    }))
}
