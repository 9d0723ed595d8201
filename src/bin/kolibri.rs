//! Kolibri CLI binary.
//!
//! Self-framed two-stage compressor.
//!
//! # Commands
//!
//! - `compress` - Compress a file or stdin into a Kolibri frame
//! - `decompress` - Restore the original bytes from a frame
//! - `inspect` - Print frame metadata without decompressing
//! - `analyze` - Show the pattern candidates found in the input
//! - `stats` - Print the codec capability descriptor

use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kolibri::{config::LoggingConfig, is_kolibri_frame, Config, KolibriCodec, VERSION};

#[derive(Parser)]
#[command(name = "kolibri")]
#[command(version = VERSION)]
#[command(about = "Kolibri - pattern substitution + DEFLATE compressor", long_about = None)]
struct Cli {
    /// Config file (default: <config_dir>/kolibri/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress bytes into a Kolibri frame
    Compress {
        /// Input file path (default: stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// DEFLATE level (0-9)
        #[arg(short, long)]
        level: Option<u32>,

        /// Show compression statistics
        #[arg(short, long)]
        stats: bool,
    },

    /// Decompress a Kolibri frame
    Decompress {
        /// Input file path (default: stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print frame metadata
    Inspect {
        /// Input file path (default: stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show pattern candidates for the input
    Analyze {
        /// Input file path (default: stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Number of candidates to print
        #[arg(short, long, default_value = "16")]
        top: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print codec capabilities
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging, cli.verbose);

    let mut codec = KolibriCodec::from_config(&config.codec)?;

    match cli.command {
        Commands::Compress {
            file,
            output,
            level,
            stats,
        } => {
            if let Some(level) = level {
                anyhow::ensure!(level <= 9, "Level must be 0-9, got {level}");
                codec = codec.with_level(level);
            }
            cmd_compress(&codec, file, output, stats)
        },

        Commands::Decompress { file, output } => cmd_decompress(&codec, file, output),

        Commands::Inspect { file } => cmd_inspect(&codec, file),

        Commands::Analyze { file, top, json } => cmd_analyze(&codec, file, top, json),

        Commands::Stats { json } => cmd_stats(&codec, json),
    }
}

fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn cmd_compress(
    codec: &KolibriCodec,
    file: Option<PathBuf>,
    output: Option<PathBuf>,
    stats: bool,
) -> anyhow::Result<()> {
    let content = read_input(file)?;
    let result = codec.compress(&content)?;

    write_output(output, &result.data)?;

    if stats {
        eprintln!();
        eprintln!("Compression Statistics:");
        eprintln!("  Original:     {} bytes", result.original_size);
        eprintln!("  Compressed:   {} bytes", result.compressed_size);
        eprintln!("  Patterns:     {}", result.pattern_count);
        eprintln!("  Ratio:        {:.2}%", result.ratio_percent);

        let savings = result.original_size as i64 - result.compressed_size as i64;
        eprintln!("  Saved:        {savings} bytes");
    }

    Ok(())
}

fn cmd_decompress(
    codec: &KolibriCodec,
    file: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let content = read_input(file)?;

    if !is_kolibri_frame(&content) {
        eprintln!("Warning: Input does not appear to be a Kolibri frame");
    }

    let decompressed = codec.decompress(&content)?;
    write_output(output, &decompressed)?;

    Ok(())
}

fn cmd_inspect(codec: &KolibriCodec, file: Option<PathBuf>) -> anyhow::Result<()> {
    let content = read_input(file)?;
    let metadata = codec.inspect(&content)?;

    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

fn cmd_analyze(
    codec: &KolibriCodec,
    file: Option<PathBuf>,
    top: usize,
    json: bool,
) -> anyhow::Result<()> {
    let content = read_input(file)?;
    let candidates = codec.analyze(&content);

    if json {
        let shown: Vec<_> = candidates.iter().take(top).collect();
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    println!("Input:       {} bytes", content.len());
    println!("Candidates:  {}", candidates.len());
    println!();
    println!("{:>4}  {:>6}  {:>11}  {:>7}  Key", "Id", "Length", "Occurrences", "Savings");
    for (id, candidate) in candidates.iter().take(top).enumerate() {
        println!(
            "{:>4}  {:>6}  {:>11}  {:>7}  {}",
            id,
            candidate.length(),
            candidate.occurrences,
            candidate.estimated_savings(),
            candidate.key()
        );
    }

    Ok(())
}

fn cmd_stats(codec: &KolibriCodec, json: bool) -> anyhow::Result<()> {
    let stats = codec.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Algorithm:          {}", stats.algorithm);
        println!("Format version:     {}", stats.version);
        println!("Block size:         {}", stats.block_size);
        println!("Compression level:  {}", stats.compression_level);
    }
    Ok(())
}

fn read_input(file: Option<PathBuf>) -> anyhow::Result<Vec<u8>> {
    if let Some(path) = file {
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
    } else {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

fn write_output(output: Option<PathBuf>, content: &[u8]) -> anyhow::Result<()> {
    if let Some(path) = output {
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    } else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(content)?;
        stdout.flush()?;
    }
    Ok(())
}
