//! UCSC table dumps: `knownGene` and `refGene` (RefSeq).
//!
//! Both are 0-based half-open, so every end column is decremented by one.
//! Genes are clustered by a shared name (protein id for KnownGene, `name2`
//! for RefSeq): a row joins an existing gene of that name when their
//! intervals overlap on the same chromosome, otherwise a new gene
//! `name`, `name.2`, ... is created.

use std::collections::HashMap;

use log::debug;

use crate::biotype::{self, PROTEIN_CODING_BIOTYPE, PSEUDOGENE_BIOTYPE};
use crate::builder::{BuildSession, FormatReader, Pass};
use crate::coordinates::parse_int_safe;
use crate::error::Error;
use crate::feature_type::EntityKind;
use crate::frame::Frame;
use crate::model::chromosome::name_key;
use crate::model::{Cds, Exon, Gene, Transcript};
use crate::strand::Strand;

/// `name` through `exonEnds`, the columns every row must carry.
const ROW_COLUMNS: usize = 10;
const KNOWN_GENE_MIN_FIELDS: usize = ROW_COLUMNS;
const REFSEQ_MIN_FIELDS: usize = 16;
const CDS_STAT_COMPLETE: &str = "cmpl";

const PASSES: [Pass; 1] = [Pass::Read(EntityKind::Transcript)];

/// The columns both tables share, already normalized.
#[derive(Debug, Clone, PartialEq)]
struct UcscRow {
    id: String,
    chromosome: String,
    strand: Strand,
    tx_start: i64,
    tx_end: i64,
    cds_start: i64,
    cds_end: i64,
    exons: Vec<(i64, i64)>,
    frames: Vec<Frame>,
}

impl UcscRow {
    /// Parses the columns starting at `first` (`name, chrom, strand, txStart, ...`).
    fn parse(
        session: &BuildSession,
        fields: &[&str],
        first: usize,
        frames: Option<&str>,
    ) -> Result<Self, Error> {
        let Some(f) = fields.get(first..).filter(|f| f.len() >= ROW_COLUMNS) else {
            return Err(short_row(fields.len(), first + ROW_COLUMNS));
        };
        let exon_count = usize::try_from(parse_int_safe(f[7])).unwrap_or_default();
        let starts: Vec<&str> = f[8].split(',').collect();
        let ends: Vec<&str> = f[9].split(',').collect();
        if starts.len() < exon_count || ends.len() < exon_count {
            return Err(Error::Parse(format!(
                "transcript '{}' declares {exon_count} exons but lists {} starts and {} ends",
                f[0],
                starts.len(),
                ends.len()
            )));
        }
        let exons = (0..exon_count)
            .map(|i| (session.position(starts[i]), session.position(ends[i]) - 1))
            .collect();
        let frames = frames
            .map(|s| {
                s.split(',')
                    .take(exon_count)
                    .map(|v| Frame::from_ucsc(parse_int_safe(v)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id: f[0].trim().to_string(),
            chromosome: f[1].trim().to_string(),
            strand: Strand::from_gff(f[2]),
            tx_start: session.position(f[3]),
            tx_end: session.position(f[4]) - 1,
            cds_start: session.position(f[5]),
            cds_end: session.position(f[6]) - 1,
            exons,
            frames,
        })
    }
}

fn short_row(found: usize, expected: usize) -> Error {
    Error::Parse(format!("row has {found} columns, expected at least {expected}"))
}

/// Gene clustering shared by both tables.
#[derive(Debug, Default)]
struct GeneClusters {
    by_name: HashMap<String, Vec<usize>>,
}

impl GeneClusters {
    fn find_or_create(
        &mut self,
        session: &mut BuildSession,
        name: &str,
        row: &UcscRow,
        biotype: Option<&str>,
    ) -> Result<usize, Error> {
        let genes = self.by_name.entry(name.to_string()).or_default();
        let key = name_key(&row.chromosome);
        for &idx in genes.iter() {
            let gene = session.registry.gene_mut(idx);
            let overlaps = gene.start <= row.tx_end && row.tx_start <= gene.end;
            if name_key(&gene.chromosome) == key && overlaps {
                gene.expand(row.tx_start, row.tx_end);
                return Ok(idx);
            }
        }
        let id = match genes.len() {
            0 => name.to_string(),
            n => format!("{name}.{}", n + 1),
        };
        let gene = Gene::new(&id, name, &row.chromosome, row.tx_start, row.tx_end, row.strand)
            .with_biotype(biotype);
        let idx = session.registry.add_gene(gene)?;
        genes.push(idx);
        Ok(idx)
    }
}

/// Adds the transcript of `row` with one exon per block and the CDS slice of each block.
fn add_transcript(
    session: &mut BuildSession,
    gene_idx: usize,
    row: &UcscRow,
    protein_coding: bool,
) -> Result<(), Error> {
    let tr_id = session.registry.unique_transcript_id(&row.id);
    if tr_id != row.id {
        debug!("transcript '{}' repeated, stored as '{tr_id}'", row.id);
    }
    let mut tr = Transcript::new(&tr_id, &row.chromosome, row.tx_start, row.tx_end, row.strand);
    tr.protein_coding = Some(protein_coding);
    let r = session.registry.add_transcript(gene_idx, tr)?;

    for (i, &(start, end)) in row.exons.iter().enumerate() {
        let frame = row.frames.get(i).copied().unwrap_or_default();
        let exon_id = format!("{tr_id}.ex.{}", i + 1);
        session
            .registry
            .add_exon(r, Exon::new(&exon_id, start, end, row.strand).with_frame(frame));
        if start <= row.cds_end && end >= row.cds_start {
            let cds = Cds::new(
                &exon_id,
                start.max(row.cds_start),
                end.min(row.cds_end),
                row.strand,
                frame,
            );
            session.registry.add_cds(r, cds);
        }
    }
    Ok(())
}

/// UCSC `knownGene` table: `name, chrom, strand, txStart, txEnd, cdsStart, cdsEnd,
/// exonCount, exonStarts, exonEnds, proteinID, alignID`.
#[derive(Debug, Default)]
pub struct KnownGeneReader {
    genes: GeneClusters,
}

impl KnownGeneReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormatReader for KnownGeneReader {
    fn name(&self) -> &'static str {
        "KnownGene"
    }

    fn input_offset(&self) -> i64 {
        0
    }

    fn passes(&self) -> Vec<Pass> {
        PASSES.to_vec()
    }

    fn frame_correction(&self) -> bool {
        true
    }

    fn parse_line(
        &mut self,
        session: &mut BuildSession,
        line: &str,
        _kind: EntityKind,
    ) -> Result<bool, Error> {
        if line.trim().is_empty() || line.starts_with('#') {
            return Ok(false);
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < KNOWN_GENE_MIN_FIELDS {
            return Err(short_row(fields.len(), KNOWN_GENE_MIN_FIELDS));
        }
        let row = UcscRow::parse(session, &fields, 0, None)?;
        let protein_id = fields.get(10).map(|s| s.trim()).unwrap_or_default();
        let coding = !protein_id.is_empty();
        // non-coding rows have no protein id; they cluster under their own name
        let cluster = if coding { protein_id } else { row.id.as_str() };
        let bio_type = if coding { PROTEIN_CODING_BIOTYPE } else { PSEUDOGENE_BIOTYPE };

        let gene_idx = self.genes.find_or_create(session, cluster, &row, Some(bio_type))?;
        add_transcript(session, gene_idx, &row, coding)?;
        Ok(true)
    }
}

/// UCSC `refGene` table (with the leading `bin` column).
#[derive(Debug, Default)]
pub struct RefSeqReader {
    genes: GeneClusters,
    lines_seen: usize,
}

impl RefSeqReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormatReader for RefSeqReader {
    fn name(&self) -> &'static str {
        "RefSeq"
    }

    fn input_offset(&self) -> i64 {
        0
    }

    fn passes(&self) -> Vec<Pass> {
        PASSES.to_vec()
    }

    fn frame_correction(&self) -> bool {
        true
    }

    fn parse_line(
        &mut self,
        session: &mut BuildSession,
        line: &str,
        _kind: EntityKind,
    ) -> Result<bool, Error> {
        self.lines_seen += 1;
        if self.lines_seen == 1 || line.trim().is_empty() || line.starts_with('#') {
            return Ok(false);
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < REFSEQ_MIN_FIELDS {
            return Err(short_row(fields.len(), REFSEQ_MIN_FIELDS));
        }
        let row = UcscRow::parse(session, &fields, 1, Some(fields[15]))?;
        let gene_name = fields[12].trim();
        let bio_type = biotype::from_refseq_accession(&row.id);
        let complete = fields[13..=14]
            .iter()
            .all(|stat| stat.trim() == CDS_STAT_COMPLETE);
        let coding = bio_type.is_some_and(biotype::is_protein_coding) && complete;

        let gene_idx = self.genes.find_or_create(session, gene_name, &row, bio_type)?;
        add_transcript(session, gene_idx, &row, coding)?;
        Ok(true)
    }
}
