//! The record-line parser: turns one tab-delimited VCF-TEXT data line into a
//! [`Record`], driven entirely by a synced [`Header`]. Unknown CHROM and
//! over-long REF are record-level skips (`Ok(None)`); unknown FILTER/INFO
//! names and an undeclared FORMAT column are field-level warn-and-drops.

use crate::codec;
use crate::dict::{Site, ValueType};
use crate::error::CodecError;
use crate::header::Header;
use crate::record::Record;
use crate::types::{missing_float32, TypeKind, MISSING_CHAR};

pub fn parse_record(line: &str, header: &Header) -> crate::error::Result<Option<Record>> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 8 {
        log::warn!("skipping malformed record line (fewer than 8 columns): {line:?}");
        return Ok(None);
    }

    let chrom = fields[0];
    let Some((rid, _)) = header.dict.get_contig(chrom) else {
        log::warn!("skipping record with unknown CHROM {chrom:?}");
        return Ok(None);
    };

    let pos: i64 = fields[1]
        .parse()
        .map_err(|_| CodecError::InvalidInt(fields[1].to_string()))?;
    let pos = (pos - 1) as i32;

    let id = fields[2];
    let id_bytes: &[u8] = if id == "." { b"" } else { id.as_bytes() };

    let reference = fields[3];
    if reference.len() > 32767 {
        log::warn!("skipping record with REF longer than 32767 bytes");
        return Ok(None);
    }
    let mut n_allele: u16 = 1;
    let mut rlen = reference.len() as i32;

    let alt_field = fields[4];
    let alt_alleles: Vec<&str> = if alt_field == "." {
        vec![]
    } else {
        alt_field.split(',').collect()
    };
    n_allele += alt_alleles.len() as u16;

    let qual_field = fields[5];
    let qual = if qual_field == "." {
        missing_float32()
    } else {
        qual_field
            .parse::<f32>()
            .map_err(|_| CodecError::InvalidFloat(qual_field.to_string()))?
    };

    let mut shared = Vec::new();
    codec::encode_char(&mut shared, id_bytes);
    codec::encode_char(&mut shared, reference.as_bytes());
    for allele in &alt_alleles {
        codec::encode_char(&mut shared, allele.as_bytes());
    }

    let filter_ids = parse_filter(fields[6], header);
    codec::encode_int_vector(&mut shared, &filter_ids, -1);

    let (n_info, end_override) = parse_info(fields[7], header, pos, &mut shared);
    if let Some(end_rlen) = end_override {
        rlen = end_rlen;
    }

    let (n_fmt, n_sample, individual) = if fields.len() > 9 {
        parse_format_and_samples(fields[8], &fields[9..], header)
    } else {
        (0u8, 0u32, Vec::new())
    };

    Ok(Some(Record {
        rid: rid as i32,
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

fn parse_int_token(tok: &str) -> Option<i64> {
    if tok == "." {
        return None;
    }
    match tok.parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::debug!("unparseable integer token {tok:?}, treating as missing");
            None
        }
    }
}

fn parse_float_token(tok: &str) -> Option<f32> {
    if tok == "." {
        return None;
    }
    match tok.parse::<f32>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::debug!("unparseable float token {tok:?}, treating as missing");
            None
        }
    }
}

/// `.` -> empty vector; else split on `;` (trailing `;` tolerated), look up
/// each name, warn-and-drop the unknown ones.
fn parse_filter(field: &str, header: &Header) -> Vec<Option<i64>> {
    if field == "." {
        return vec![];
    }
    field
        .trim_end_matches(';')
        .split(';')
        .filter_map(|name| match header.dict.get_id(name) {
            Some((id, _)) => Some(Some(id as i64)),
            None => {
                log::warn!("skipping unknown FILTER name {name:?}");
                None
            }
        })
        .collect()
}

/// `.` -> no entries. Else split on `;`; each `key` or `key=value` is looked
/// up at the INFO site, unknown keys dropped with a warning. Returns the
/// accepted-entry count and, if an `END` key overrode it, the new `rlen`.
fn parse_info(
    field: &str,
    header: &Header,
    pos: i32,
    shared: &mut Vec<u8>,
) -> (u16, Option<i32>) {
    if field == "." {
        return (0, None);
    }
    let mut n_info = 0u16;
    let mut end_override = None;
    for entry in field.trim_end_matches(';').split(';') {
        if entry.is_empty() {
            continue;
        }
        let (key, value) = match entry.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (entry, None),
        };
        let Some((id, meta)) = header.dict.get_id(key) else {
            log::warn!("skipping unknown INFO key {key:?}");
            continue;
        };
        let Some(decl) = meta.declaration(Site::Info) else {
            log::warn!("skipping INFO key {key:?}: not declared at the INFO site");
            continue;
        };

        codec::encode_int_scalar(shared, id as i64);
        match value {
            None => codec::encode_size(shared, 0, TypeKind::Missing),
            Some(raw) => match decl.value_type {
                ValueType::Flag | ValueType::String => codec::encode_char(shared, raw.as_bytes()),
                ValueType::Int => {
                    let values: Vec<Option<i64>> = raw.split(',').map(parse_int_token).collect();
                    if key == "END" {
                        if let Some(Some(end)) = values.first() {
                            end_override = Some(*end as i32 - pos);
                        }
                    }
                    codec::encode_int_vector(shared, &values, -1);
                }
                ValueType::Float => {
                    let values: Vec<Option<f32>> =
                        raw.split(',').map(parse_float_token).collect();
                    codec::encode_float_vector(shared, &values);
                }
            },
        }
        n_info += 1;
    }
    (n_info, end_override)
}

struct FormatColumnDecl {
    id: u32,
    value_type: ValueType,
    is_gt: bool,
}

/// Splits the FORMAT key list, resolves each against the FORMAT site, then
/// runs the sizing/allocation/fill three-pass algorithm over the sample
/// columns. If any FORMAT key is undeclared, the whole per-sample block is
/// dropped (`n_fmt = 0`) per the field-level warn-and-drop policy.
fn parse_format_and_samples(
    format_field: &str,
    sample_fields: &[&str],
    header: &Header,
) -> (u8, u32, Vec<u8>) {
    let n_sample = sample_fields.len() as u32;
    let keys: Vec<&str> = format_field.split(':').collect();

    let mut columns = Vec::with_capacity(keys.len());
    for key in &keys {
        let Some((id, meta)) = header.dict.get_id(key) else {
            log::warn!("FORMAT field {key:?} undeclared, dropping per-sample block");
            return (0, n_sample, Vec::new());
        };
        let Some(decl) = meta.declaration(Site::Format) else {
            log::warn!(
                "FORMAT field {key:?}: not declared at the FORMAT site, dropping per-sample block"
            );
            return (0, n_sample, Vec::new());
        };
        if decl.value_type == ValueType::Flag {
            panic!("FLAG type is not permitted in a per-sample FORMAT field: {key:?}");
        }
        columns.push(FormatColumnDecl {
            id,
            value_type: decl.value_type,
            is_gt: *key == "GT",
        });
    }

    if columns.is_empty() {
        return (0, n_sample, Vec::new());
    }

    let per_sample_cells: Vec<Vec<&str>> = sample_fields
        .iter()
        .map(|sample| sample.split(':').collect())
        .collect();

    // Sizing pass.
    let mut max_l = vec![0usize; columns.len()];
    let mut max_m = vec![1usize; columns.len()];
    let mut max_g = vec![1usize; columns.len()];
    for cells in &per_sample_cells {
        for (j, column) in columns.iter().enumerate() {
            let cell = cells.get(j).copied().unwrap_or(".");
            max_l[j] = max_l[j].max(cell.len());
            if column.is_gt {
                let ploidy = if cell == "." {
                    1
                } else {
                    cell.chars().filter(|&c| c == '|' || c == '/').count() + 1
                };
                max_g[j] = max_g[j].max(ploidy);
            } else {
                let count = if cell == "." { 1 } else { cell.split(',').count() };
                max_m[j] = max_m[j].max(count);
            }
        }
    }

    // Allocation + fill pass, column by column.
    let mut individual = Vec::new();
    for (j, column) in columns.iter().enumerate() {
        codec::encode_int_scalar(&mut individual, column.id as i64);
        if column.is_gt {
            let stride = max_g[j];
            let mut values = Vec::with_capacity(stride * per_sample_cells.len());
            for cells in &per_sample_cells {
                let cell = cells.get(j).copied().unwrap_or(".");
                values.extend(encode_gt_cell(cell, stride));
            }
            codec::encode_format_int_column(&mut individual, &values, stride);
            continue;
        }
        match column.value_type {
            ValueType::String => {
                let stride = max_l[j];
                let mut bytes = Vec::with_capacity(stride * per_sample_cells.len());
                for cells in &per_sample_cells {
                    let cell = cells.get(j).copied().unwrap_or(".");
                    let cell = if cell == "." { "" } else { cell };
                    let raw = cell.as_bytes();
                    let take = raw.len().min(stride);
                    bytes.extend_from_slice(&raw[..take]);
                    bytes.resize(bytes.len() + (stride - take), MISSING_CHAR);
                }
                codec::encode_char(&mut individual, &bytes);
            }
            ValueType::Int => {
                let stride = max_m[j];
                let mut values = Vec::with_capacity(stride * per_sample_cells.len());
                for cells in &per_sample_cells {
                    let cell = cells.get(j).copied().unwrap_or(".");
                    let mut parsed: Vec<Option<i64>> = if cell == "." {
                        vec![]
                    } else {
                        cell.split(',').map(parse_int_token).collect()
                    };
                    parsed.resize(stride, None);
                    values.extend(parsed);
                }
                codec::encode_format_int_column(&mut individual, &values, stride);
            }
            ValueType::Float => {
                let stride = max_m[j];
                let mut values = Vec::with_capacity(stride * per_sample_cells.len());
                for cells in &per_sample_cells {
                    let cell = cells.get(j).copied().unwrap_or(".");
                    let mut parsed: Vec<Option<f32>> = if cell == "." {
                        vec![]
                    } else {
                        cell.split(',').map(parse_float_token).collect()
                    };
                    parsed.resize(stride, None);
                    values.extend(parsed);
                }
                codec::encode_format_float_column(&mut individual, &values, stride);
            }
            ValueType::Flag => unreachable!("rejected above"),
        }
    }

    (columns.len() as u8, n_sample, individual)
}

/// One GT cell, split on `|`/`/`: each token becomes `(allele+1) << 1 |
/// phased_bit`, where `phased_bit` reflects the separator immediately
/// preceding that token (the first token has none, so it is unphased). `.`
/// encodes as allele `-1`, collapsing to exactly `phased_bit` once shifted.
fn encode_gt_cell(cell: &str, stride: usize) -> Vec<Option<i64>> {
    let mut values = Vec::with_capacity(stride);
    let mut phased = false;
    let mut token = String::new();
    for c in cell.chars() {
        if c == '|' || c == '/' {
            values.push(Some(gt_encode_token(&token, phased)));
            token.clear();
            phased = c == '|';
        } else {
            token.push(c);
        }
    }
    values.push(Some(gt_encode_token(&token, phased)));
    values.resize(stride, None);
    values
}

fn gt_encode_token(token: &str, phased: bool) -> i64 {
    let allele: i64 = if token == "." {
        -1
    } else {
        token.parse::<i64>().unwrap_or(-1)
    };
    let phase_bit = if phased { 1 } else { 0 };
    ((allele + 1) << 1) | phase_bit
}
