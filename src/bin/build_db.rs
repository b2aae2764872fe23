use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use log::LevelFilter;

use annoforge::builder::{BuildOptions, Builder, DEFAULT_SEED};
use annoforge::cli;
use annoforge::config::BuildConfig;
use annoforge::formats::random::RandomParams;
use annoforge::formats::{self, Format};
use annoforge::source::FileSource;

#[derive(Parser)]
#[command(name = "build_db", about = "Build a gene annotation model from an annotation file")]
struct Cli {
    /// Path to a JSON build configuration (overrides the other build flags)
    #[arg(short = 'c', long = "config", conflicts_with_all = ["format", "genome", "input"])]
    config: Option<PathBuf>,

    /// Input format: gff2, gff3, gtf22, knownGene, refSeq, genesFile, genbank, embl or random
    #[arg(short = 'f', long = "format")]
    format: Option<Format>,

    /// Genome name
    #[arg(short = 'g', long = "genome")]
    genome: Option<String>,

    /// Annotation file (a `.gz` sibling is tried when missing)
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Reference FASTA candidates, tried in order
    #[arg(long = "fasta")]
    fasta: Vec<PathBuf>,

    /// Do not attach exon sequences
    #[arg(long = "no-sequences")]
    no_sequences: bool,

    /// Seed for the random generator and random sequences
    #[arg(long = "seed", default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Log progress at info level
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Log per-entity detail at debug level
    #[arg(long = "debug")]
    debug: bool,
}

fn init_logging(args: &Cli) {
    let level = if args.debug {
        LevelFilter::Debug
    } else if args.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    pretty_env_logger::formatted_builder()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Build settings from the config file or, without one, from the flags.
fn resolve_config(args: &Cli) -> Result<BuildConfig> {
    if let Some(path) = &args.config {
        return BuildConfig::from_file(path);
    }
    let Some(format) = args.format else {
        bail!("either --config or --format is required");
    };
    let Some(genome) = args.genome.clone() else {
        bail!("--genome is required without --config");
    };
    if format.needs_input() && args.input.is_none() {
        bail!("--input is required for the {format} format");
    }
    Ok(BuildConfig {
        genome,
        format,
        input: args.input.clone(),
        fasta_candidates: args.fasta.clone(),
        read_sequences: !args.no_sequences,
        random_sequences: false,
        frame_correction: None,
        frame_correction_min_non_zero: 0.0,
        seed: args.seed,
        random: RandomParams::default(),
        input_offset: None,
    })
}

fn main() -> Result<()> {
    let start = Instant::now();
    let cli_args = Cli::parse();
    init_logging(&cli_args);

    cli::banner("Build Database");

    // ── Configuration ────────────────────────────────────
    cli::section("Configuration");

    let config = resolve_config(&cli_args)?;
    if let Some(path) = &cli_args.config {
        cli::kv("Config", &path.display().to_string());
    }
    cli::kv("Genome", &config.genome);
    cli::kv("Format", &config.format.to_string());
    if let Some(input) = &config.input {
        cli::kv("Input", &input.display().to_string());
    }
    let options: BuildOptions = config.options();
    if !options.read_sequences {
        cli::kv("Sequences", &"skipped".dimmed().to_string());
    }
    for fasta in &options.fasta_candidates {
        cli::kv("FASTA", &fasta.display().to_string());
    }

    eprintln!();

    // ── Build ────────────────────────────────────────────
    cli::section("Build");

    let reader = formats::reader_for(config.format, config.random, config.seed);
    let mut builder = Builder::new(reader, options);
    if let Some(input) = config.input.as_ref().filter(|_| config.format.needs_input()) {
        let source = FileSource::open(input)
            .with_context(|| format!("failed to open annotation input: {}", input.display()))?;
        builder = builder.with_source(source);
    }
    let report = builder
        .build()
        .with_context(|| format!("failed to build genome '{}'", config.genome))?;

    cli::success(&format!(
        "{} genes, {} transcripts",
        report.genome.genes.len(),
        report.genome.transcript_count()
    ));
    eprintln!();

    cli::print_summary(&report, start);
    Ok(())
}
