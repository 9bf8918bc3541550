use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, Level};

use press_codecs::Compression;
use press_core::{CompressionConfig, Decompressor, Mode};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "press",
    about = "Seekable block-compressed containers: compress, inspect, and randomly read them",
    version
)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

/// How an artifact is laid out. Nothing of this is stored in the file, so
/// reading needs the same values that were used for writing.
#[derive(Args, Clone)]
struct LayoutArgs {
    /// Named mode + block size combination
    #[arg(short, long, value_enum, default_value_t = Preset::GzipDefault)]
    preset: Preset,
    /// Backend mode, overriding the preset's (block size follows the mode's preset)
    #[arg(short, long, value_parser = parse_mode)]
    mode: Option<Mode>,
    /// Raw bytes per block, overriding the preset's
    #[arg(short, long)]
    block_size: Option<u32>,
    /// Worker threads for compression and read fan-out
    #[arg(short, long, default_value_t = press_core::config::DEFAULT_WORKER_COUNT)]
    workers: usize,
    /// Store (or expect) an xxh3 checksum per block in the index
    #[arg(long)]
    checksums: bool,
    /// Path to the external backend binary (default: looked up in PATH)
    #[arg(long)]
    backend: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into a seekable container
    Compress {
        /// Source file ("-" reads stdin)
        input: PathBuf,
        /// Destination file (default: input plus the mode's extension)
        output: Option<PathBuf>,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Decompress a whole container back to raw bytes
    Decompress {
        /// Source container
        input: PathBuf,
        /// Destination file ("-" writes to stdout)
        output: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Sample the start of a file and report whether it is worth compressing
    Info {
        file: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
        /// Bytes to sample
        #[arg(long, default_value_t = press_core::config::DEFAULT_HEURISTIC_BYTES)]
        sample: u64,
        /// Compressed/raw ratio above which the data counts as incompressible
        #[arg(long, default_value_t = press_core::config::DEFAULT_MAX_COMPRESSION_RATIO)]
        max_ratio: f64,
    },
    /// Print index statistics of a container
    Inspect {
        file: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
        /// Print per-block details
        #[arg(long)]
        blocks: bool,
    },
    /// Read a byte range of the decompressed data
    ///
    /// Only the blocks that overlap the range are read and decoded.
    Cat {
        file: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
        /// Decompressed offset to start at
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Bytes to read (default: up to the end)
        #[arg(short, long)]
        length: Option<u64>,
        /// Write raw bytes to a file instead of printing a hex dump
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Mode and block size pairs tuned per backend.
#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    GzipStore,
    GzipMin,
    GzipDefault,
    GzipMax,
    XzMin,
    XzDefault,
    Lz4,
    Snappy,
    Zstd,
}

impl Preset {
    fn mode(self) -> Mode {
        match self {
            Preset::GzipStore => Mode::GzipStore,
            Preset::GzipMin => Mode::GzipMin,
            Preset::GzipDefault => Mode::GzipDefault,
            Preset::GzipMax => Mode::GzipMax,
            Preset::XzMin => Mode::XzMin,
            Preset::XzDefault => Mode::Xz,
            Preset::Lz4 => Mode::Lz4,
            Preset::Snappy => Mode::Snappy,
            Preset::Zstd => Mode::Zstd,
        }
    }

    fn block_size(self) -> u32 {
        match self {
            Preset::GzipStore | Preset::GzipMin | Preset::GzipDefault | Preset::GzipMax => 131_070,
            Preset::Lz4 | Preset::Snappy => 262_140,
            Preset::Zstd => 262_144,
            Preset::XzMin => 524_288,
            Preset::XzDefault => 1_048_576,
        }
    }

    fn for_mode(mode: Mode) -> Preset {
        match mode {
            Mode::GzipStore => Preset::GzipStore,
            Mode::GzipMin => Preset::GzipMin,
            Mode::GzipDefault => Preset::GzipDefault,
            Mode::GzipMax => Preset::GzipMax,
            Mode::XzMin => Preset::XzMin,
            Mode::Xz => Preset::XzDefault,
            Mode::Lz4 => Preset::Lz4,
            Mode::Snappy => Preset::Snappy,
            Mode::Zstd => Preset::Zstd,
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse().map_err(|e: press_core::Error| e.to_string())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

impl LayoutArgs {
    fn config(&self) -> CompressionConfig {
        let preset = self.mode.map(Preset::for_mode).unwrap_or(self.preset);
        let mut config = CompressionConfig::new(preset.mode(), self.block_size.unwrap_or(preset.block_size()))
            .with_worker_count(self.workers)
            .with_checksums(self.checksums);
        if let Some(path) = &self.backend {
            config = config.with_backend_path(path);
        }
        config
    }

    fn compression(&self) -> anyhow::Result<Compression> {
        let config = self.config();
        debug!(mode = %config.mode, block_size = config.block_size, workers = config.worker_count, "configuration");
        Compression::new(config).context("invalid configuration")
    }
}

fn open_container(file: &Path, press: &Compression) -> anyhow::Result<Decompressor<File>> {
    let f = File::open(file).with_context(|| format!("opening {:?}", file))?;
    let total = f.metadata().with_context(|| format!("reading metadata of {:?}", file))?.len();
    let (reader, _) = press
        .decompress_file(f, total)
        .with_context(|| format!("loading index of {:?}", file))?;
    Ok(reader)
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn throughput(bytes: u64, secs: f64) -> String {
    if secs <= 0.0 {
        return "n/a".into();
    }
    format!("{}/s", human_bytes((bytes as f64 / secs) as u64))
}

fn hex_dump(offset: u64, data: &[u8]) {
    for (i, chunk) in data.chunks(16).enumerate() {
        print!("  {:08x}  ", offset + (i * 16) as u64);
        for b in chunk {
            print!("{:02x} ", b);
        }
        for _ in chunk.len()..16 {
            print!("   ");
        }
        print!("  |");
        for b in chunk {
            if b.is_ascii_graphic() || *b == b' ' {
                print!("{}", *b as char);
            } else {
                print!(".");
            }
        }
        println!("|");
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_compress(input: PathBuf, output: Option<PathBuf>, layout: LayoutArgs) -> anyhow::Result<()> {
    let press = layout.compression()?;
    let is_stdin = input.to_str() == Some("-");

    let output = match output {
        Some(path) => path,
        None if is_stdin => anyhow::bail!("an output path is required when reading stdin"),
        None => {
            let mut name = input.clone().into_os_string();
            name.push(press.file_extension());
            PathBuf::from(name)
        }
    };
    let dst = File::create(&output).with_context(|| format!("creating output file {:?}", output))?;

    let t0 = Instant::now();
    let result = if is_stdin {
        press.compress_file(io::stdin().lock(), dst)
    } else {
        let src = File::open(&input).with_context(|| format!("opening input file {:?}", input))?;
        press.compress_file(src, dst)
    };
    let summary = result.with_context(|| format!("compressing into {:?}", output))?;
    let elapsed = t0.elapsed().as_secs_f64();

    let config = press.config();
    eprintln!("  mode        : {}", config.mode);
    eprintln!("  block size  : {}", human_bytes(config.block_size as u64));
    eprintln!("  blocks      : {}", summary.blocks);
    eprintln!("  raw size    : {}", human_bytes(summary.raw_bytes));
    eprintln!("  compressed  : {}", human_bytes(summary.compressed_bytes));
    eprintln!("  file size   : {}", human_bytes(summary.artifact_bytes));
    if summary.artifact_bytes > 0 {
        eprintln!("  ratio       : {:.2}x", summary.raw_bytes as f64 / summary.artifact_bytes as f64);
    }
    eprintln!("  throughput  : {}", throughput(summary.raw_bytes, elapsed));
    eprintln!("  elapsed     : {:.3}s", elapsed);
    eprintln!("  written to  : {:?}", output);
    Ok(())
}

fn run_decompress(input: PathBuf, output: PathBuf, layout: LayoutArgs) -> anyhow::Result<()> {
    let press = layout.compression()?;
    let mut reader = open_container(&input, &press)?;

    let mut dst: Box<dyn Write> = if output.to_str() == Some("-") {
        Box::new(io::stdout().lock())
    } else {
        Box::new(File::create(&output).with_context(|| format!("creating output file {:?}", output))?)
    };

    let t0 = Instant::now();
    let total_raw = {
        let mut dst = BufWriter::new(&mut dst);
        let copied = io::copy(&mut reader, &mut dst).with_context(|| format!("decompressing {:?}", input))?;
        dst.flush()?;
        copied
    };
    let elapsed = t0.elapsed().as_secs_f64();

    eprintln!("  blocks      : {}", reader.block_count());
    eprintln!("  raw size    : {}", human_bytes(total_raw));
    eprintln!("  throughput  : {}", throughput(total_raw, elapsed));
    eprintln!("  elapsed     : {:.3}s", elapsed);
    Ok(())
}

fn run_info(file: PathBuf, layout: LayoutArgs, sample: u64, max_ratio: f64) -> anyhow::Result<()> {
    let config = layout
        .config()
        .with_heuristic_bytes(sample)
        .with_max_compression_ratio(max_ratio);
    let press = Compression::new(config).context("invalid configuration")?;

    let f = File::open(&file).with_context(|| format!("opening {:?}", file))?;
    let size = f.metadata()?.len();
    if size < sample {
        anyhow::bail!(
            "{:?} is {} but the heuristic samples {}; pass a smaller --sample",
            file,
            human_bytes(size),
            human_bytes(sample)
        );
    }
    let info = press
        .compression_info(f)
        .with_context(|| format!("sampling {:?}", file))?;

    println!("=== {:?} ===", file);
    println!();
    println!("  mode           : {}", press.config().mode);
    println!("  sampled        : {}", human_bytes(sample));
    println!("  ratio          : {:.3} (threshold {:.3})", info.ratio, max_ratio);
    println!("  compressible   : {}", if info.compressible { "yes" } else { "no" });
    println!("  extension      : {}", info.extension);
    Ok(())
}

fn run_inspect(file: PathBuf, layout: LayoutArgs, show_blocks: bool) -> anyhow::Result<()> {
    let press = layout.compression()?;
    let reader = open_container(&file, &press)?;
    let file_size = std::fs::metadata(&file)?.len();
    let index = reader.index();

    println!("=== {:?} ===", file);
    println!();
    println!("  codec          : {}", reader.codec_name());
    println!("  block size     : {}", human_bytes(reader.block_size() as u64));
    println!("  block count    : {}", reader.block_count());
    println!("  last block     : {}", human_bytes(index.last_block_raw_size as u64));
    println!("  raw size       : {}", human_bytes(reader.decompressed_size()));
    println!("  compressed     : {}", human_bytes(reader.compressed_size()));
    println!("  index + trailer: {}", human_bytes(file_size - reader.compressed_size()));
    println!("  file on disk   : {}", human_bytes(file_size));
    println!("  ratio          : {:.2}x", reader.ratio());
    println!("  checksums      : {}", if index.is_checksummed() { "xxh3-64" } else { "none" });

    if show_blocks {
        println!();
        println!("  {:>8}  {:>14}  {:>12}  {:>16}", "block", "file offset", "compressed", "checksum");
        println!("  {}", "-".repeat(56));
        for ordinal in 0..reader.block_count() {
            let Some((start, end)) = reader.block_span(ordinal) else { break };
            let checksum = index
                .checksums
                .as_ref()
                .and_then(|sums| sums.get(ordinal as usize))
                .map(|sum| format!("{:016x}", sum))
                .unwrap_or_else(|| "-".into());
            println!(
                "  {:>8}  {:>14}  {:>12}  {:>16}",
                ordinal,
                start,
                human_bytes(end - start),
                checksum
            );
        }
    }
    Ok(())
}

fn run_cat(
    file: PathBuf,
    layout: LayoutArgs,
    offset: u64,
    length: Option<u64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let press = layout.compression()?;
    let mut reader = open_container(&file, &press)?;
    let size = reader.decompressed_size();
    if offset > size {
        anyhow::bail!("offset {} is past the end of the data ({} bytes)", offset, size);
    }
    let want = length.unwrap_or(size - offset).min(size - offset);

    let t0 = Instant::now();
    reader.seek(SeekFrom::Start(offset))?;
    let mut raw = Vec::with_capacity(want as usize);
    (&mut reader)
        .take(want)
        .read_to_end(&mut raw)
        .with_context(|| format!("reading {} bytes at offset {}", want, offset))?;
    let elapsed = t0.elapsed();

    eprintln!(
        "  read {} at offset {} in {:.3}ms (blocks cached: {:?})",
        human_bytes(raw.len() as u64),
        offset,
        elapsed.as_secs_f64() * 1000.0,
        reader.cached_blocks()
    );

    match output {
        Some(path) => {
            std::fs::write(&path, &raw).with_context(|| format!("writing {:?}", path))?;
            eprintln!("  written to {:?}", path);
        }
        None => {
            let preview = &raw[..raw.len().min(256)];
            println!("--- {} bytes at offset {}, first {} shown ---", raw.len(), offset, preview.len());
            hex_dump(offset, preview);
            if raw.len() > 256 {
                println!("  ... ({} bytes remaining not shown)", raw.len() - 256);
            }
        }
    }
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    match cli.command {
        Commands::Compress { input, output, layout } => run_compress(input, output, layout),
        Commands::Decompress { input, output, layout } => run_decompress(input, output, layout),
        Commands::Info {
            file,
            layout,
            sample,
            max_ratio,
        } => run_info(file, layout, sample, max_ratio),
        Commands::Inspect { file, layout, blocks } => run_inspect(file, layout, blocks),
        Commands::Cat {
            file,
            layout,
            offset,
            length,
            output,
        } => run_cat(file, layout, offset, length, output),
    }
}
