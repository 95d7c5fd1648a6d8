pub mod bin_io;
pub mod codec;
pub mod dict;
pub mod emitter;
pub mod error;
pub mod header;
pub mod logging;
pub mod parser;
pub mod record;
pub mod refidx;
pub mod text;
pub mod types;

pub use error::{CodecError, Result};
pub use header::Header;
pub use record::Record;

#[cfg(test)]
mod tests {
    use crate::bin_io::{BinReader, BinWriter, ReaderConfig, WriterConfig};
    use crate::header::Header;
    use crate::parser::parse_record;
    use crate::text::{ReaderConfig as TextReaderConfig, TextReader};

    const VCF: &str = "##contig=<ID=1,length=1000>\n\
##INFO=<ID=DP,Number=1,Type=Integer>\n\
##FORMAT=<ID=GT,Number=1,Type=String>\n\
##FORMAT=<ID=DP,Number=1,Type=Integer>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
1\t100\trs1\tA\tG\t50\tPASS\tDP=5\tGT:DP\t0/1:10\n";

    #[test]
    fn text_to_bin_to_text_round_trip() {
        let reader = TextReader::new(VCF.as_bytes(), TextReaderConfig::default()).unwrap();
        let header_text = reader.header().text.clone();
        let header = Header::parse(&header_text).unwrap();
        let records: Vec<_> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);

        let mut bin = Vec::new();
        {
            let mut writer = BinWriter::new(&mut bin, &header, WriterConfig::default()).unwrap();
            for record in &records {
                writer.write_record(record).unwrap();
            }
        }

        let mut bin_reader = BinReader::new(bin.as_slice(), ReaderConfig::default()).unwrap();
        let decoded: Vec<_> = bin_reader.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(decoded, records);

        let text_line = crate::emitter::emit_text(&decoded[0], bin_reader.header()).unwrap();
        assert_eq!(text_line, "1\t100\trs1\tA\tG\t50\tPASS\tDP=5\tGT:DP\t0/1:10");
    }

    #[test]
    fn header_only_input_has_no_records() {
        let raw = "##contig=<ID=1,length=1000>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
        let mut reader = TextReader::new(raw.as_bytes(), TextReaderConfig::default()).unwrap();
        assert!(reader.next().is_none());
    }

    #[test]
    fn standalone_parse_record_matches_reader_output() {
        let header = Header::parse(
            "##contig=<ID=1,length=1000>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO"
                .as_bytes(),
        )
        .unwrap();
        let record = parse_record("1\t1\t.\tA\tT\t.\t.\t.", &header)
            .unwrap()
            .unwrap();
        assert_eq!(record.pos, 0);
    }
}
