//! The high-level VCF-TEXT reader/writer: line-oriented, transparently
//! gzip-decompressing on read (via `niffler`, mirroring the teacher's
//! `reader.rs`), producing `Record`s through [`crate::parser`].

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::emitter;
use crate::error::CodecError;
use crate::header::Header;
use crate::logging::Verbosity;
use crate::parser;
use crate::record::Record;
use crate::refidx;

/// Threaded through [`TextReader::new`]/[`TextReader::from_path`] instead
/// of a hidden global verbosity, per the ambient-stack configuration
/// design.
#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    pub verbosity: Verbosity,
    pub reference_index: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct WriterConfig {
    pub verbosity: Verbosity,
}

pub struct TextReader<R: BufRead> {
    header: Header,
    inner: R,
    line: String,
}

impl TextReader<Box<dyn BufRead>> {
    pub fn from_path<P: AsRef<Path>>(path: P, config: ReaderConfig) -> anyhow::Result<Self> {
        let (reader, _format) = niffler::from_path(path)?;
        Self::new(BufReader::new(reader), config)
    }
}

impl<R: BufRead> TextReader<R> {
    pub fn new(mut inner: R, config: ReaderConfig) -> anyhow::Result<Self> {
        crate::logging::init(config.verbosity);

        let mut header_lines = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            let n = inner.read_line(&mut line).map_err(CodecError::Read)?;
            if n == 0 {
                return Err(CodecError::MissingColumnHeader.into());
            }
            let trimmed = line.trim_end_matches(['\n', '\r']).to_string();
            let is_column_header = trimmed.starts_with("#CHROM");
            header_lines.push(trimmed);
            if is_column_header {
                break;
            }
        }
        let mut header_text = header_lines.join("\n");
        header_text.push('\n');

        let reference = match &config.reference_index {
            Some(path) => Some(refidx::read_reference_index(path)?),
            None => None,
        };
        let header = Header::parse_with_reference(header_text.as_bytes(), reference)?;

        Ok(TextReader {
            header,
            inner,
            line: String::new(),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }
}

impl<R: BufRead> Iterator for TextReader<R> {
    type Item = anyhow::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.inner.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(CodecError::Read(e).into())),
            }
            let trimmed = self.line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }
            match parser::parse_record(trimmed, &self.header) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

pub struct TextWriter<W: Write> {
    inner: W,
}

impl<W: Write> TextWriter<W> {
    pub fn new(inner: W, config: WriterConfig) -> Self {
        crate::logging::init(config.verbosity);
        TextWriter { inner }
    }

    pub fn write_header(&mut self, header: &Header) -> crate::error::Result<()> {
        let text = header.text.strip_suffix(&[0]).unwrap_or(&header.text);
        self.inner.write_all(text).map_err(CodecError::Write)?;
        self.inner.write_all(b"\n").map_err(CodecError::Write)
    }

    pub fn write_record(&mut self, record: &Record, header: &Header) -> crate::error::Result<()> {
        let line = emitter::emit_text(record, header)?;
        self.inner
            .write_all(line.as_bytes())
            .map_err(CodecError::Write)?;
        self.inner.write_all(b"\n").map_err(CodecError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VCF: &str = "##contig=<ID=1,length=1000>\n##INFO=<ID=DP,Number=1,Type=Integer>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n1\t100\trs1\tA\tG\t50\tPASS\tDP=5\n2\t1\t.\tA\tT\t.\t.\t.\n";

    #[test]
    fn reads_header_and_skips_unknown_chrom() {
        let reader = TextReader::new(VCF.as_bytes(), ReaderConfig::default()).unwrap();
        let records: Vec<_> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pos, 99);
    }

    #[test]
    fn writer_round_trips_a_line() {
        let reader = TextReader::new(VCF.as_bytes(), ReaderConfig::default()).unwrap();
        let header = reader.header().text.clone();
        let records: Vec<_> = reader.map(|r| r.unwrap()).collect();

        let mut out = Vec::new();
        let header = Header::parse(&header).unwrap();
        let mut writer = TextWriter::new(&mut out, WriterConfig::default());
        writer.write_record(&records[0], &header).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1\t100\trs1\tA\tG\t50\tPASS\tDP=5\n"
        );
    }
}
