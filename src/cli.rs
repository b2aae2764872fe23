//! Shared CLI output helpers for annoforge binaries.

use std::time::Instant;

use colored::Colorize;

use crate::builder::BuildReport;
use crate::feature_type::EntityKind;
use crate::progress;

pub fn banner(subtitle: &str) {
    eprintln!();
    eprintln!("{} {}", "annoforge".bold().cyan(), subtitle.dimmed());
    eprintln!();
}

pub fn section(title: &str) {
    let bar = "─".repeat(50);
    eprintln!("{} {}", title.bold().blue(), bar.dimmed());
}

pub fn kv(key: &str, value: &str) {
    eprintln!("  {:<20} {}", key.dimmed(), value);
}

pub fn success(msg: &str) {
    eprintln!("  {} {}", "✓".green().bold(), msg);
}

pub fn warning(msg: &str) {
    eprintln!("  {} {}", "⚠".yellow(), msg.yellow());
}

/// Aggregate counts of a finished build, then the elapsed time.
pub fn print_summary(report: &BuildReport, start: Instant) {
    let genome = &report.genome;
    let stats = &report.stats;

    section("Model");
    kv("Chromosomes", &genome.chromosomes().len().to_string());
    kv("Genes", &genome.genes.len().to_string());
    kv("Transcripts", &genome.transcript_count().to_string());
    kv("Exons", &genome.exon_count().to_string());
    eprintln!();

    section("Parsed");
    for kind in EntityKind::ALL {
        let count = stats.parsed(kind);
        if count > 0 {
            kv(&kind.to_string(), &count.to_string());
        }
    }
    kv("Sequences added", &stats.sequences_added.to_string());
    kv("Sequences ignored", &stats.sequences_ignored.to_string());
    kv("Exons inferred", &stats.exons_inferred.to_string());
    kv("Exons collapsed", &stats.exons_collapsed.to_string());
    kv("UTRs inferred", &stats.utrs_inferred.to_string());
    kv("Frames corrected", &stats.exons_frame_corrected.to_string());
    eprintln!();

    if stats.total_warnings() > 0 {
        section("Warnings");
        for (kind, count) in &stats.warnings {
            warning(&format!("{kind}: {count}"));
        }
        eprintln!();
    }

    eprintln!(
        "{}  {}",
        "Time".dimmed(),
        progress::format_elapsed(start.elapsed()).bold(),
    );
    eprintln!();
}
