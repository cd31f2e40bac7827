use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use wiidisc::{driver, ExtractConfig, Session};

/// Extract and verify the contents of a Wii optical disc image.
#[derive(Debug, Parser)]
#[clap(about = "extract and verify a Wii disc image")]
struct Args {
    /// Path to the disc image (or, with --just-a-partition, a raw
    /// already-decrypted partition dump).
    filename: PathBuf,

    /// Directory to extract into. Defaults to the current directory.
    #[clap(long, default_value = ".")]
    out_dir: PathBuf,

    /// Treat `filename` as a single pre-decrypted partition image: skip the
    /// disc/partition-table walk and all decryption/verification.
    #[clap(long)]
    just_a_partition: bool,

    /// Additionally dump each partition's full decrypted logical stream to
    /// `###dat###`.
    #[clap(long)]
    dump_partition_data: bool,

    /// Disable automatic Yaz0 decompression of small files.
    #[clap(long)]
    no_yaz0: bool,

    /// Disable RARC magic sniffing.
    #[clap(long)]
    no_rarc: bool,

    /// Files larger than this many bytes are always streamed as-is, no
    /// magic sniffing.
    #[clap(long, default_value_t = 0x1000000)]
    max_size_to_auto_analyse: u64,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config = ExtractConfig {
        just_a_partition: args.just_a_partition,
        dump_partition_data: args.dump_partition_data,
        uncompress_yaz0: !args.no_yaz0,
        unpack_rarc: !args.no_rarc,
        max_size_to_auto_analyse: args.max_size_to_auto_analyse,
    };

    let file = match File::open(&args.filename) {
        Ok(f) => f,
        Err(e) => {
            log::error!("cannot open {}: {e}", args.filename.display());
            return ExitCode::FAILURE;
        }
    };
    let mut reader = BufReader::new(file);

    let mut session = Session::new(config);
    if let Err(e) = driver::run(&mut reader, &args.out_dir, &mut session) {
        log::error!("{e}");
        return ExitCode::FAILURE;
    }

    session.errors().report();
    ExitCode::SUCCESS
}
