//! Seeded synthetic genome: one gene with random transcripts on `chr1`.

use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use crate::biotype::PROTEIN_CODING_BIOTYPE;
use crate::builder::{BuildSession, FormatReader, Pass};
use crate::error::Error;
use crate::feature_type::EntityKind;
use crate::model::{Exon, Gene, Transcript, Utr, UtrKind};
use crate::source::LineSource;
use crate::strand::Strand;

const CHROMOSOME: &str = "chr1";
const GENE_ID: &str = "gene1";
const MIN_GENE_SIZE: i64 = 100;
const BASES: [u8; 4] = *b"ACGT";

/// Shape of the generated gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RandomParams {
    pub max_gene_len: i64,
    pub max_transcripts: i64,
    pub max_exons: i64,
    pub add_utrs: bool,
}

impl Default for RandomParams {
    fn default() -> Self {
        Self {
            max_gene_len: 1000,
            max_transcripts: 5,
            max_exons: 10,
            add_utrs: false,
        }
    }
}

/// Uniform in `[0, n)`, or 0 when the range is empty.
fn below<R: Rng>(rng: &mut R, n: i64) -> i64 {
    if n <= 0 { 0 } else { rng.gen_range(0..n) }
}

#[derive(Debug)]
pub struct RandomReader {
    params: RandomParams,
    rng: ChaCha8Rng,
}

impl RandomReader {
    #[must_use]
    pub fn new(params: RandomParams, seed: u64) -> Self {
        Self {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn transcript(&mut self, gene: &Gene, n: usize) -> Transcript {
        let id = format!("transcript_{n}");
        let mut tr =
            Transcript::new(&id, &gene.chromosome, gene.start, gene.end, gene.strand);
        tr.protein_coding = Some(true);
        tr.biotype = Some(PROTEIN_CODING_BIOTYPE.to_string());

        let gene_len = gene.end - gene.start + 1;
        // at least two bases per slice keeps exons apart
        let exon_count = below(&mut self.rng, self.params.max_exons).clamp(1, gene_len / 2);
        let slice = gene_len / exon_count;
        for e in 0..exon_count {
            let start = gene.start + slice * e + below(&mut self.rng, slice / 2);
            let end = start + below(&mut self.rng, slice / 2);
            let exon = Exon::new(&format!("exon_{n}_{e}"), start, end, gene.strand)
                .with_rank(e as u32 + 1);
            tr.exons.push(exon);
        }
        if self.params.add_utrs {
            self.add_utrs(&mut tr);
        }
        tr
    }

    /// Covers a random prefix (UTR5) and suffix (UTR3) of the spliced transcript.
    fn add_utrs(&mut self, tr: &mut Transcript) {
        let mut size: i64 = tr.exons.iter().map(|e| e.end - e.start + 1).sum();
        if size < 4 {
            return;
        }
        let order = tr.sorted_exon_indices();
        let utr5 = below(&mut self.rng, size / 4);
        size -= utr5;
        let five = utr_run(tr, UtrKind::Five, utr5, order.iter().copied());
        let utr3 = below(&mut self.rng, size / 4);
        let three = utr_run(tr, UtrKind::Three, utr3, order.iter().rev().copied());
        tr.utrs.extend(five);
        tr.utrs.extend(three);
    }
}

/// UTR pieces covering `len` bases, walking exons in `order`.
fn utr_run(
    tr: &Transcript,
    kind: UtrKind,
    mut len: i64,
    order: impl Iterator<Item = usize>,
) -> Vec<Utr> {
    let mut utrs = Vec::new();
    for idx in order {
        if len <= 0 {
            break;
        }
        let ex = &tr.exons[idx];
        let size = ex.end - ex.start + 1;
        if size < len {
            utrs.push(Utr::new(kind, ex.start, ex.end, ex.strand, &ex.id));
            len -= size;
            continue;
        }
        // the piece sits at the exon's 5' side for UTR5 and its 3' side for UTR3
        let at_low_end = (kind == UtrKind::Five) != tr.strand.is_reverse();
        let (start, end) = if at_low_end {
            (ex.start, ex.start + len - 1)
        } else {
            (ex.end - len + 1, ex.end)
        };
        utrs.push(Utr::new(kind, start, end, ex.strand, &ex.id));
        len = 0;
    }
    utrs
}

impl FormatReader for RandomReader {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn input_offset(&self) -> i64 {
        0
    }

    fn passes(&self) -> Vec<Pass> {
        Vec::new()
    }

    fn parse_line(
        &mut self,
        _session: &mut BuildSession,
        _line: &str,
        _kind: EntityKind,
    ) -> Result<bool, Error> {
        Ok(false)
    }

    fn populate(
        &mut self,
        session: &mut BuildSession,
        _source: Option<&dyn LineSource>,
    ) -> Result<(), Error> {
        let max_len = self.params.max_gene_len.max(1);
        let start = below(&mut self.rng, max_len);
        let end = start + MIN_GENE_SIZE.max(below(&mut self.rng, max_len));
        let strand = if self.rng.gen_bool(0.5) {
            Strand::Forward
        } else {
            Strand::Reverse
        };

        let chr_len = (2 * max_len).max(end + 1);
        let sequence: Vec<u8> = (0..chr_len)
            .map(|_| BASES[self.rng.gen_range(0..4)])
            .collect();
        let gene = Gene::new(GENE_ID, GENE_ID, CHROMOSOME, start, end, strand)
            .with_biotype(Some(PROTEIN_CODING_BIOTYPE));
        let gene_idx = session.registry.add_gene(gene)?;
        session.stats.count_parsed(EntityKind::Gene);

        let gene = session.registry.gene(gene_idx).clone();
        let count = below(&mut self.rng, self.params.max_transcripts).max(1);
        for n in 0..count as usize {
            let tr = self.transcript(&gene, n);
            session.registry.add_transcript(gene_idx, tr)?;
            session.stats.count_parsed(EntityKind::Transcript);
        }
        let chromosome = gene.chromosome;
        session.add_sequence(&chromosome, sequence);
        info!("random gene '{GENE_ID}' [{start}, {end}], {count} transcripts on '{chromosome}'");
        Ok(())
    }
}
