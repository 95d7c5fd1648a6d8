//! The high-level VCF-BIN reader/writer: generalizes the teacher's
//! `reader.rs` iterator pattern to both directions, built directly on
//! [`crate::emitter`]'s prologue/record codec.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::emitter;
use crate::error::CodecError;
use crate::header::Header;
use crate::logging::Verbosity;
use crate::record::Record;

#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    pub verbosity: Verbosity,
}

#[derive(Debug, Clone, Default)]
pub struct WriterConfig {
    pub verbosity: Verbosity,
}

pub struct BinReader<R: Read> {
    header: Header,
    inner: R,
}

impl BinReader<Box<dyn Read>> {
    pub fn from_path<P: AsRef<Path>>(path: P, config: ReaderConfig) -> anyhow::Result<Self> {
        let (reader, _format) = niffler::from_path(path)?;
        Self::new(reader, config)
    }
}

impl<R: Read> BinReader<R> {
    pub fn new(mut inner: R, config: ReaderConfig) -> anyhow::Result<Self> {
        crate::logging::init(config.verbosity);
        let header = emitter::read_header(&mut inner)?;
        Ok(BinReader { header, inner })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }
}

impl<R: Read> Iterator for BinReader<R> {
    type Item = anyhow::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match emitter::read_record(&mut self.inner) {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

pub struct BinWriter<W: Write> {
    inner: W,
}

impl BinWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(
        path: P,
        header: &Header,
        config: WriterConfig,
    ) -> anyhow::Result<Self> {
        let file = File::create(path).map_err(CodecError::Open)?;
        Self::new(BufWriter::new(file), header, config)
    }
}

impl<W: Write> BinWriter<W> {
    pub fn new(mut inner: W, header: &Header, config: WriterConfig) -> anyhow::Result<Self> {
        crate::logging::init(config.verbosity);
        emitter::write_header(&mut inner, header)?;
        Ok(BinWriter { inner })
    }

    pub fn write_record(&mut self, record: &Record) -> crate::error::Result<()> {
        emitter::write_record(&mut self.inner, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_record;

    #[test]
    fn write_then_read_round_trips() {
        let raw = "##contig=<ID=1,length=1000>\n##INFO=<ID=DP,Number=1,Type=Integer>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";
        let header = Header::parse(raw.as_bytes()).unwrap();
        let record = parse_record("1\t100\trs1\tA\tG\t50\tPASS\tDP=5", &header)
            .unwrap()
            .unwrap();

        let mut buf = Vec::new();
        {
            let mut writer = BinWriter::new(&mut buf, &header, WriterConfig::default()).unwrap();
            writer.write_record(&record).unwrap();
        }

        let mut reader = BinReader::new(buf.as_slice(), ReaderConfig::default()).unwrap();
        assert_eq!(reader.header().dict.n_contigs(), 1);
        let read_back: Vec<_> = reader.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(read_back, vec![record]);
    }
}
