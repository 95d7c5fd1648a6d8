//! The header parser: tokenizes `##` meta-information lines and the single
//! `#CHROM` column header, populates a [`Dictionary`], and retains the raw
//! header bytes verbatim for VCF-BIN emission.

use std::collections::HashMap;

use nom::branch::alt;
use nom::bytes::complete::{escaped, is_not, tag, take_while};
use nom::character::complete::{char, digit1};
use nom::combinator::{map, opt};
use nom::multi::separated_list0;
use nom::sequence::{delimited, separated_pair};
use nom::IResult;

use crate::dict::{Cardinality, Declaration, Dictionary, Site, ValueType};

pub struct Header {
    pub dict: Dictionary,
    /// Meta lines + column header, `\n`-joined, NUL-terminated.
    pub text: Vec<u8>,
}

impl Header {
    pub fn l_text(&self) -> u32 {
        self.text.len() as u32
    }

    pub fn parse(raw: &[u8]) -> crate::error::Result<Header> {
        Self::parse_with_reference(raw, None::<std::iter::Empty<(String, u32)>>)
    }

    pub fn parse_with_reference<I>(
        raw: &[u8],
        reference: Option<I>,
    ) -> crate::error::Result<Header>
    where
        I: IntoIterator<Item = (String, u32)>,
    {
        let text = std::str::from_utf8(raw).map_err(crate::error::CodecError::InvalidUtf8)?;
        let mut lines = text.split('\n');
        let mut meta_lines: Vec<String> = Vec::new();
        let mut column_header: Option<String> = None;

        let mut dict = Dictionary::new();
        for line in &mut lines {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix("##") {
                meta_lines.push(line.to_string());
                apply_meta_line(rest, &mut dict);
            } else if let Some(rest) = line.strip_prefix('#') {
                if rest.starts_with("CHROM") {
                    column_header = Some(line.to_string());
                    break;
                }
                log::warn!("skipping malformed header line: {line:?}");
            } else {
                log::warn!("skipping malformed header line: {line:?}");
            }
        }

        let column_header = column_header.ok_or(crate::error::CodecError::MissingColumnHeader)?;

        if let Some(reference) = reference {
            for (name, length) in reference {
                if name.trim().is_empty() {
                    log::warn!("skipping malformed reference entry");
                    continue;
                }
                if dict.get_contig(&name).is_none() {
                    meta_lines.push(format!("##contig=<ID={name},length={length}>"));
                    dict.put_contig(&name, length);
                }
            }
        }

        dict.insert_pass_if_missing();

        let fields: Vec<&str> = column_header.split('\t').collect();
        for &sample in fields.iter().skip(9) {
            dict.put_sample(sample);
        }

        dict.sync();

        let mut text_buf = meta_lines.join("\n");
        if !text_buf.is_empty() {
            text_buf.push('\n');
        }
        text_buf.push_str(&column_header);
        let mut text = text_buf.into_bytes();
        text.push(0);

        Ok(Header { dict, text })
    }
}

/// Parses one `##KEY=...` line (the `##` already stripped). Unknown keys
/// are ignored entirely: not an error, simply no dictionary update.
fn apply_meta_line(rest: &str, dict: &mut Dictionary) {
    let Some((key, value)) = rest.split_once('=') else {
        log::warn!("skipping malformed header line: ##{rest:?}");
        return;
    };
    match key {
        "INFO" => apply_bracketed(value, dict, Site::Info),
        "FILTER" => apply_bracketed(value, dict, Site::Filter),
        "FORMAT" => apply_bracketed(value, dict, Site::Format),
        "contig" => apply_contig(value, dict),
        _ => { /* unknown meta prefix: tolerated, no dictionary effect */ }
    }
}

fn apply_bracketed(value: &str, dict: &mut Dictionary, site: Site) {
    let Some(fields) = bracketed_fields(value) else {
        log::warn!("skipping malformed {site:?} declaration: {value:?}");
        return;
    };
    let Some(id) = fields.get("ID").copied() else {
        log::warn!("skipping {site:?} declaration missing ID: {value:?}");
        return;
    };

    let mut value_type = match fields.get("Type").copied() {
        Some("Integer") => ValueType::Int,
        Some("Float") => ValueType::Float,
        Some("String") => ValueType::String,
        Some("Flag") => ValueType::Flag,
        _ => ValueType::String,
    };

    let (cardinality, mut count) = match fields.get("Number").copied() {
        Some("A") => (Cardinality::PerAlt, None),
        Some("G") => (Cardinality::PerGenotype, None),
        Some(n) if n.chars().all(|c| c.is_ascii_digit()) && !n.is_empty() => {
            (Cardinality::Fixed, n.parse::<u32>().ok())
        }
        _ => (Cardinality::Variable, None),
    };

    // FILTER declarations always normalize to FLAG/count-0, per the
    // header-entry normalization step; this runs before the nonzero-count
    // warning below so a stray `Number=` on a FILTER line is silently
    // normalized rather than warned about as a user mistake.
    if matches!(site, Site::Filter) {
        value_type = ValueType::Flag;
        count = Some(0);
    }
    if value_type == ValueType::Flag && count.unwrap_or(0) != 0 {
        log::warn!("FLAG field {id:?} declared with a nonzero count, forcing 0");
    }

    let declaration = Declaration::new(site, value_type, cardinality, count);
    dict.put_id(id, declaration);
}

fn apply_contig(value: &str, dict: &mut Dictionary) {
    let Some(fields) = bracketed_fields(value) else {
        log::warn!("skipping malformed contig declaration: {value:?}");
        return;
    };
    let Some(id) = fields.get("ID").copied() else {
        log::warn!("skipping contig declaration missing ID: {value:?}");
        return;
    };
    let length = fields
        .get("length")
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);
    dict.put_contig(id, length);
}

/// Parses the `<KEY=VALUE,KEY="quoted, value",...>` field list after the
/// `=` in a `##INFO=`/`##FILTER=`/`##FORMAT=`/`##contig=` line.
fn bracketed_fields(value: &str) -> Option<HashMap<&str, &str>> {
    let (_, fields) = delimited(char('<'), keys_and_values, char('>'))(value).ok()?;
    Some(fields.into_iter().collect())
}

fn delimited_string(input: &str) -> IResult<&str, &str> {
    delimited(
        tag("\""),
        escaped(is_not("\\\""), '\\', alt((tag("\\"), tag("\"")))),
        tag("\""),
    )(input)
}

fn bare_value(input: &str) -> IResult<&str, &str> {
    take_while(|c| c != ',' && c != '>')(input)
}

fn key_value(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(is_not("<,=\n"), tag("="), alt((delimited_string, bare_value)))(input)
}

fn keys_and_values(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    separated_list0(tag(","), key_value)(input)
}

/// Used only by the header parser's optional `Number` detection to tell
/// apart a bare digit count from `A`/`G`/`.`.
#[allow(dead_code)]
fn digit_count(input: &str) -> IResult<&str, &str> {
    let (rest, (digits, _)) = nom::sequence::pair(digit1, opt(char(',')))(input)?;
    Ok((rest, digits))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "##contig=<ID=1,length=100>\n##FILTER=<ID=LowQual,Description=\"x\">\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1";

    #[test]
    fn parses_contig_and_inserts_pass() {
        let header = Header::parse(MINIMAL.as_bytes()).unwrap();
        let (contig_id, meta) = header.dict.get_contig("1").unwrap();
        assert_eq!(contig_id, 0);
        assert_eq!(meta.length, 100);
        assert!(header.dict.get_id("PASS").is_some());
        assert_eq!(header.dict.get_sample("S1"), Some(0));
    }

    #[test]
    fn pass_present_before_samples_means_sample_ids_start_after_declared_ids() {
        let header = Header::parse(MINIMAL.as_bytes()).unwrap();
        // LowQual, then PASS; sample S1 is independent of the ID dictionary.
        assert_eq!(header.dict.get_id("LowQual").unwrap().0, 0);
        assert_eq!(header.dict.get_id("PASS").unwrap().0, 1);
    }

    #[test]
    fn text_buffer_is_nul_terminated() {
        let header = Header::parse(MINIMAL.as_bytes()).unwrap();
        assert_eq!(*header.text.last().unwrap(), 0);
        assert_eq!(header.l_text() as usize, header.text.len());
    }

    #[test]
    fn reference_synthesizes_missing_contigs_only() {
        let raw = "##contig=<ID=1,length=100>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";
        let reference = vec![("1".to_string(), 999), ("2".to_string(), 200)];
        let header = Header::parse_with_reference(raw.as_bytes(), Some(reference)).unwrap();
        assert_eq!(header.dict.get_contig("1").unwrap().1.length, 100);
        assert_eq!(header.dict.get_contig("2").unwrap().1.length, 200);
    }

    #[test]
    fn unknown_meta_prefix_is_tolerated() {
        let raw = "##source=MyTool\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";
        let header = Header::parse(raw.as_bytes()).unwrap();
        assert_eq!(header.dict.n_ids(), 1); // only the implicit PASS
    }

    #[test]
    fn quoted_description_with_commas_is_handled() {
        let raw = "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Read, depth\">\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";
        let header = Header::parse(raw.as_bytes()).unwrap();
        let (_, meta) = header.dict.get_id("DP").unwrap();
        let decl = meta.declaration(Site::Info).unwrap();
        assert_eq!(decl.value_type, ValueType::Int);
        assert_eq!(decl.count, Some(1));
    }

    #[test]
    fn filter_with_stray_number_normalizes_without_treating_it_as_flag_misuse() {
        let raw = "##FILTER=<ID=q10,Number=1,Description=\"x\">\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";
        let header = Header::parse(raw.as_bytes()).unwrap();
        let (_, meta) = header.dict.get_id("q10").unwrap();
        let decl = meta.declaration(Site::Filter).unwrap();
        assert_eq!(decl.value_type, ValueType::Flag);
        assert_eq!(decl.count, Some(0));
    }

    #[test]
    fn missing_column_header_is_an_error() {
        let raw = "##contig=<ID=1,length=100>\n";
        assert!(Header::parse(raw.as_bytes()).is_err());
    }
}
