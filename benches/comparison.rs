use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vcf_codec::bin_io::{BinReader, ReaderConfig};
use vcf_codec::emitter;
use vcf_codec::header::Header;
use vcf_codec::parser::parse_record;

const HEADER: &str = "##contig=<ID=1,length=249250621>\n\
##INFO=<ID=DP,Number=1,Type=Integer>\n\
##INFO=<ID=AF,Number=A,Type=Float>\n\
##FORMAT=<ID=GT,Number=1,Type=String>\n\
##FORMAT=<ID=DP,Number=1,Type=Integer>\n\
##FORMAT=<ID=GQ,Number=1,Type=Integer>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tHG001\tINTEGRATION\tHG003\n";

const LINE: &str =
    "1\t10000\trs123\tA\tG,T\t99\tPASS\tDP=55;AF=0.5,0.1\tGT:DP:GQ\t0/1:20:60\t1|1:25:70\t0/0:18:55";

fn header() -> Header {
    Header::parse(HEADER.as_bytes()).unwrap()
}

fn benchmark_parse(c: &mut Criterion) {
    let header = header();
    let mut group = c.benchmark_group("parse_record");
    group.bench_with_input(BenchmarkId::new("text", "multi-sample"), LINE, |b, line| {
        b.iter(|| parse_record(black_box(line), black_box(&header)).unwrap())
    });
}

fn benchmark_emit(c: &mut Criterion) {
    let header = header();
    let record = parse_record(LINE, &header).unwrap().unwrap();
    let mut group = c.benchmark_group("emit_text");
    group.bench_with_input(
        BenchmarkId::new("text", "multi-sample"),
        &record,
        |b, record| b.iter(|| emitter::emit_text(black_box(record), black_box(&header)).unwrap()),
    );
}

fn benchmark_bin_round_trip(c: &mut Criterion) {
    let header = header();
    let record = parse_record(LINE, &header).unwrap().unwrap();
    let mut group = c.benchmark_group("bin_round_trip");
    group.bench_with_input(
        BenchmarkId::new("encode_decode", "multi-sample"),
        &record,
        |b, record| {
            b.iter(|| {
                let mut buf = Vec::new();
                emitter::write_header(&mut buf, black_box(&header)).unwrap();
                emitter::write_record(&mut buf, black_box(record)).unwrap();
                let mut reader = BinReader::new(buf.as_slice(), ReaderConfig::default()).unwrap();
                reader.next().unwrap().unwrap()
            })
        },
    );
}

criterion_group!(benches, benchmark_parse, benchmark_emit, benchmark_bin_round_trip);
criterion_main!(benches);
