//! GTF 2.2 reader: flat `gene_id`/`transcript_id` attributes in `key "value";` form.

use log::debug;

use crate::biotype::PLACEHOLDER;
use crate::builder::{BuildSession, FormatReader, GFF_PASSES, Pass};
use crate::error::Error;
use crate::feature_type::{EntityKind, FeatureType};
use crate::model::{Cds, Gene, GenericMarker, Transcript, UtrKind};
use crate::registry::{GENE_ID_PREFIX, TranscriptRef};
use crate::stats::WarningKind;

use super::gff::{self, GffRecord, ParsedLine};

#[derive(Debug, Default)]
pub struct GtfReader;

impl GtfReader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FormatReader for GtfReader {
    fn name(&self) -> &'static str {
        "GTF22"
    }

    fn passes(&self) -> Vec<Pass> {
        GFF_PASSES.to_vec()
    }

    fn frame_correction(&self) -> bool {
        true
    }

    fn parse_line(
        &mut self,
        session: &mut BuildSession,
        line: &str,
        kind: EntityKind,
    ) -> Result<bool, Error> {
        let ParsedLine::Record(record) = gff::parse_line(line, session.offset()) else {
            return Ok(false);
        };
        if record.kind() != Some(kind) {
            return Ok(false);
        }
        let ids = Ids::of(&record);
        if ids.gene.is_empty() && ids.transcript.is_empty() {
            session.warn(
                WarningKind::MissingAttribute,
                &format!("{} line without gene_id and transcript_id skipped", record.type_name),
            );
            return Ok(false);
        }

        match kind {
            EntityKind::Gene => add_gene(session, &record, &ids),
            EntityKind::Transcript => add_transcript(session, &record, &ids),
            EntityKind::Exon => add_exon_or_cds(session, &record, &ids),
            EntityKind::Utr5 | EntityKind::Utr3 => add_utr(session, &record, &ids),
            EntityKind::IntergenicConserved => {
                session.registry.add_generic(GenericMarker {
                    id: record.synthesized_id(),
                    kind: kind.to_string(),
                    chromosome: record.chromosome.clone(),
                    start: record.start,
                    end: record.end,
                    strand: record.strand,
                });
                Ok(true)
            }
        }
    }
}

/// Gene and transcript ids of one line (either may be empty, not both).
struct Ids {
    gene: String,
    transcript: String,
}

impl Ids {
    fn of(record: &GffRecord) -> Self {
        let get = |key| record.attr(key).map(str::trim).unwrap_or_default().to_string();
        let transcript = get("transcript_id");
        let mut gene = get("gene_id");
        if gene.is_empty() && !transcript.is_empty() {
            gene = format!("{GENE_ID_PREFIX}{transcript}");
        }
        Self { gene, transcript }
    }
}

/// GTF falls back to the source column (old Ensembl dumps put the bio-type there).
fn gene_biotype(record: &GffRecord) -> String {
    ["gene_biotype", "gene_type", "biotype"]
        .iter()
        .find_map(|k| record.attr(k))
        .or(Some(record.source.as_str()).filter(|s| !s.is_empty()))
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

fn transcript_biotype(record: &GffRecord) -> String {
    ["transcript_biotype", "transcript_type", "biotype"]
        .iter()
        .find_map(|k| record.attr(k))
        .or(Some(record.source.as_str()).filter(|s| !s.is_empty()))
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

fn find_or_create_gene(
    session: &mut BuildSession,
    record: &GffRecord,
    ids: &Ids,
) -> Result<usize, Error> {
    let name = record.attr("gene_name").unwrap_or(&ids.gene).to_string();
    let found = session.registry.find_or_create_gene(
        &ids.gene,
        &name,
        &record.chromosome,
        record.start,
        record.end,
        record.strand,
        Some(&gene_biotype(record)),
    )?;
    if found.is_placeholder() {
        debug!("gene '{}' synthesized from a {} line", ids.gene, record.type_name);
        session.stats.warn(WarningKind::PlaceholderGene);
    }
    found.or_mismatch_error(&ids.transcript)
}

fn add_gene(session: &mut BuildSession, record: &GffRecord, ids: &Ids) -> Result<bool, Error> {
    if ids.gene.is_empty() {
        return Ok(false);
    }
    let name = record.attr("gene_name").unwrap_or(&ids.gene).to_string();
    let gene = Gene::new(
        &ids.gene,
        &name,
        &record.chromosome,
        record.start,
        record.end,
        record.strand,
    )
    .with_biotype(Some(&gene_biotype(record)));
    session.registry.add_gene(gene)?;
    Ok(true)
}

fn new_transcript(record: &GffRecord, id: &str) -> Transcript {
    let biotype = transcript_biotype(record);
    let mut tr = Transcript::new(id, &record.chromosome, record.start, record.end, record.strand);
    tr.protein_coding = gff::coding_flag(Some(&biotype), record);
    tr.biotype = Some(biotype);
    tr
}

fn add_transcript(
    session: &mut BuildSession,
    record: &GffRecord,
    ids: &Ids,
) -> Result<bool, Error> {
    if ids.transcript.is_empty() {
        return Ok(false);
    }
    let gene_idx = find_or_create_gene(session, record, ids)?;
    session
        .registry
        .add_transcript(gene_idx, new_transcript(record, &ids.transcript))?;
    Ok(true)
}

/// The line's transcript, created (with its gene) on first reference.
fn transcript_of(
    session: &mut BuildSession,
    record: &GffRecord,
    ids: &Ids,
) -> Result<Option<TranscriptRef>, Error> {
    if ids.transcript.is_empty() {
        // gene-level line: make sure the gene exists, nothing else to attach
        find_or_create_gene(session, record, ids)?;
        return Ok(None);
    }
    if let Some(r) = session.registry.find_transcript(&ids.transcript) {
        gff::check_chromosome(session, r, record, &record.synthesized_id())?;
        return Ok(Some(r));
    }
    let gene_idx = find_or_create_gene(session, record, ids)?;
    let r = session
        .registry
        .add_transcript(gene_idx, new_transcript(record, &ids.transcript))?;
    debug!("transcript '{}' synthesized from a {} line", ids.transcript, record.type_name);
    session.stats.warn(WarningKind::PlaceholderTranscript);
    Ok(Some(r))
}

fn add_exon_or_cds(
    session: &mut BuildSession,
    record: &GffRecord,
    ids: &Ids,
) -> Result<bool, Error> {
    let feature = match record.feature {
        Some(
            f @ (FeatureType::Exon
            | FeatureType::PseudogenicExon
            | FeatureType::Cds
            | FeatureType::StopCodon),
        ) => f,
        _ => return Ok(false),
    };
    let Some(r) = transcript_of(session, record, ids)? else {
        return Ok(false);
    };

    let id = record.synthesized_id();
    if feature.is_coding_segment() {
        // stop codons are not part of the GTF CDS, so they become their own segment
        let cds = Cds::new(&id, record.start, record.end, record.strand, record.frame);
        session.registry.add_cds(r, cds);
    } else {
        let exon_id = record.attr("exon_id").map_or(id, str::to_string);
        gff::add_exon(session, r, record.exon(&exon_id));
    }
    Ok(true)
}

fn add_utr(session: &mut BuildSession, record: &GffRecord, ids: &Ids) -> Result<bool, Error> {
    let Some(r) = transcript_of(session, record, ids)? else {
        return Ok(false);
    };
    let kind = match record.feature {
        Some(FeatureType::FivePrimeUtr) => Some(UtrKind::Five),
        Some(FeatureType::ThreePrimeUtr) => Some(UtrKind::Three),
        _ => gff::classify_utr(session, r, record.start, record.end),
    };
    let Some(kind) = kind else {
        debug!(
            "UTR [{}, {}] of '{}' cannot be placed relative to a CDS; skipped",
            record.start, record.end, ids.transcript
        );
        return Ok(false);
    };
    let exon_id = format!("Exon_{}_{}_{}", record.chromosome, record.start + 1, record.end + 1);
    gff::attach_utr(session, r, kind, record, &exon_id);
    Ok(true)
}
