use std::fs::File;
use std::io::{ self, BufRead, BufReader, BufWriter, Write };
use std::path::{ Path, PathBuf };
use std::time::Instant;
use anyhow::{ Result, Context };
use clap::Parser;
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

use linemarc::{ convert, ConvertOptions };

/// Convert line-MARC records to MARCXML
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file (line-MARC), `-` for stdin
    #[arg(short, long)]
    input: PathBuf,

    /// Output file (MARCXML), `-` for stdout
    #[arg(short, long)]
    output: PathBuf,

    /// Limit number of records to process
    #[arg(short = 'n', long)]
    max_records: Option<usize>,

    /// Read every record back after serializing it and stop on mismatch
    #[arg(long)]
    verify: bool,

    /// Do not print the running record count
    #[arg(short, long)]
    quiet: bool,
}

fn is_std(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if is_std(path) {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).context(format!("Input file {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn create_output(path: &Path) -> Result<Box<dyn Write>> {
    if is_std(path) {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }
    let file = File::create(path).context(format!("Output file {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn run(args: Args) -> Result<()> {
    let input = open_input(&args.input)?;
    let output = create_output(&args.output)?;
    let options = ConvertOptions { max_records: args.max_records, verify: args.verify };

    tracing::info!(input = %args.input.display(), output = %args.output.display(), "converting");

    let start = Instant::now();
    let summary = convert(input, output, &options, |s| {
        if !args.quiet {
            eprint!("{} records processed\r", s.records);
        }
    })?;
    let elapsed = start.elapsed();

    eprintln!("Done, processed {} MARC records in {:?}", summary.records, elapsed);
    if summary.skipped_lines > 0 || summary.empty_batches > 0 {
        eprintln!(
            "Skipped {} unparsable lines and {} records without usable lines",
            summary.skipped_lines, summary.empty_batches
        );
    }
    tracing::info!(?summary, "finished");
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linemarc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(1);
    }
}
