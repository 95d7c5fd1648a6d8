use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use vcf_codec::bin_io::{BinReader, BinWriter, ReaderConfig as BinReaderConfig, WriterConfig as BinWriterConfig};
use vcf_codec::logging::Verbosity;
use vcf_codec::text::{ReaderConfig as TextReaderConfig, TextReader, TextWriter, WriterConfig as TextWriterConfig};

#[derive(Parser)]
#[command(name = "vcf-codec", about = "convert between VCF-TEXT and VCF-BIN")]
struct Cli {
    /// 1=error, 2=warning, 3=message, 4=progress, 5+=debug
    #[arg(short, long, default_value_t = 2)]
    verbosity: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// VCF-BIN -> VCF-TEXT, written to stdout
    View {
        input: PathBuf,
    },
    /// VCF-TEXT -> VCF-BIN
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// optional `.fai`-style reference index used to synthesize missing contigs
        #[arg(long)]
        reference_index: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = Verbosity(cli.verbosity);

    match cli.command {
        Command::View { input } => view(input, verbosity),
        Command::Convert {
            input,
            output,
            reference_index,
        } => convert(input, output, reference_index, verbosity),
    }
}

fn view(input: PathBuf, verbosity: Verbosity) -> Result<()> {
    let mut reader = BinReader::from_path(input, BinReaderConfig { verbosity })?;
    let stdout = std::io::stdout();
    let mut writer = TextWriter::new(stdout.lock(), TextWriterConfig { verbosity });
    writer.write_header(reader.header())?;
    while let Some(record) = reader.next() {
        let record = record?;
        writer.write_record(&record, reader.header())?;
    }
    Ok(())
}

fn convert(
    input: PathBuf,
    output: PathBuf,
    reference_index: Option<PathBuf>,
    verbosity: Verbosity,
) -> Result<()> {
    let mut reader = TextReader::from_path(
        input,
        TextReaderConfig {
            verbosity,
            reference_index,
        },
    )?;
    let header = reader.header().text.clone();
    let header = vcf_codec::Header::parse(&header)?;

    let mut writer = BinWriter::create(output, &header, BinWriterConfig { verbosity })?;
    for record in reader.by_ref() {
        writer.write_record(&record?)?;
    }
    Ok(())
}
