//! Sequence loader: binds chromosome sequences to exons.

use std::path::PathBuf;

use log::{debug, info, warn};
use rand::Rng;

use crate::coordinates::Span;
use crate::error::Error;
use crate::fasta::FastaReader;
use crate::model::Genome;
use crate::model::chromosome::name_key;
use crate::source::{self, FileSource};
use crate::stats::{BuildStats, WarningKind};

const BASES: [u8; 4] = *b"ACGT";

/// Reverse-complements a sequence in place. Anything that is not ACGT becomes N.
pub fn reverse_complement(seq: &mut [u8]) {
    seq.reverse();
    for base in seq.iter_mut() {
        *base = match *base {
            b'A' | b'a' => b'T',
            b'T' | b't' => b'A',
            b'C' | b'c' => b'G',
            b'G' | b'g' => b'C',
            _ => b'N',
        };
    }
}

/// Attaches `full_sequence` to every exon on `chromosome`.
///
/// Sets the chromosome length to the sequence length. Exons outside
/// `[0, len)` are skipped, warned about and counted as ignored.
pub fn attach(genome: &mut Genome, chromosome: &str, full_sequence: &[u8], stats: &mut BuildStats) {
    let name = genome.ensure_chromosome(chromosome);
    let len = full_sequence.len() as i64;
    if let Some(chr) = genome.chromosome_mut(&name) {
        chr.length = len;
    }

    let key = name_key(&name);
    let (mut added, mut ignored) = (0usize, 0usize);
    for gene in genome.genes.iter_mut().filter(|g| name_key(&g.chromosome) == key) {
        for tr in &mut gene.transcripts {
            for exon in &mut tr.exons {
                if exon.start < 0 || exon.end >= len || exon.start > exon.end {
                    warn!(
                        "exon '{}' [{}, {}] of transcript '{}' is outside chromosome '{name}' (length {len})",
                        exon.id, exon.start, exon.end, tr.id
                    );
                    stats.warn(WarningKind::ExonOutOfRange);
                    ignored += 1;
                    continue;
                }
                let mut seq = full_sequence[exon.start as usize..=exon.end as usize].to_vec();
                seq.make_ascii_uppercase();
                if exon.strand.is_reverse() {
                    reverse_complement(&mut seq);
                }
                if seq.len() as i64 != exon.size() {
                    warn!(
                        "exon '{}' sequence length {} does not match its size {}",
                        exon.id,
                        seq.len(),
                        exon.size()
                    );
                    stats.warn(WarningKind::SequenceLengthMismatch);
                }
                exon.sequence = Some(seq);
                added += 1;
            }
        }
    }
    debug!("chromosome '{name}': {added} exon sequences added, {ignored} ignored");
    stats.sequences_added += added;
    stats.sequences_ignored += ignored;
}

/// Attaches every record of the first readable FASTA candidate, one chromosome at a time.
pub fn load_fasta(
    genome: &mut Genome,
    candidates: &[PathBuf],
    stats: &mut BuildStats,
) -> Result<usize, Error> {
    let path = source::resolve(candidates)
        .map_err(|e| Error::MissingInput(format!("reference sequence: {e}")))?;
    info!("reading reference sequences from '{}'", path.display());
    let fasta = FileSource::open(&path)?;
    let mut records = 0;
    for record in FastaReader::from_reader(fasta.reader()?) {
        let (name, sequence) = record?;
        attach(genome, &name, &sequence, stats);
        records += 1;
    }
    Ok(records)
}

/// Fills every exon with random bases of the right length.
pub fn random_sequences<R: Rng>(genome: &mut Genome, rng: &mut R) {
    for tr in genome.transcripts_mut() {
        for exon in &mut tr.exons {
            let len = exon.size().max(0) as usize;
            let seq = (0..len).map(|_| BASES[rng.gen_range(0..4)]).collect();
            exon.sequence = Some(seq);
        }
    }
}

/// Warns when fewer than half of the protein-coding exons received a sequence.
pub fn check_coverage(genome: &Genome, stats: &mut BuildStats) {
    let (mut total, mut with_seq) = (0usize, 0usize);
    for tr in genome.transcripts().filter(|t| t.is_protein_coding()) {
        total += tr.exons.len();
        with_seq += tr.exons.iter().filter(|e| e.has_sequence()).count();
    }
    if total > 0 && with_seq * 2 < total {
        warn!(
            "only {with_seq} of {total} protein-coding exons have a sequence; check chromosome names in the reference"
        );
        stats.warn(WarningKind::LowSequenceCoverage);
    }
}
