//! The reference-index side loader: reads a `.fai`-style `name\tlength\t...`
//! file and hands the Header Parser an iterator of `(name, length)` pairs
//! to synthesize `##contig` lines from. Malformed lines are tolerated by
//! skipping, matching the header parser's own tolerance policy.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One `(name, length)` entry read from a reference index file.
pub fn read_reference_index<P: AsRef<Path>>(
    path: P,
) -> crate::error::Result<Vec<(String, u32)>> {
    let file = File::open(path).map_err(crate::error::CodecError::Open)?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(crate::error::CodecError::Read)?;
        match parse_line(&line) {
            Some(entry) => entries.push(entry),
            None => log::warn!("skipping malformed reference index line: {line:?}"),
        }
    }
    Ok(entries)
}

fn parse_line(line: &str) -> Option<(String, u32)> {
    let mut fields = line.split('\t');
    let name = fields.next()?.trim();
    if name.is_empty() {
        return None;
    }
    let length: u32 = fields.next()?.trim().parse().ok()?;
    Some((name.to_string(), length))
}
