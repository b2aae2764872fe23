//! GFF3 reader: explicit `ID`/`Parent` hierarchy.

use log::debug;

use crate::biotype;
use crate::builder::{BuildSession, FormatReader, GFF_PASSES, Pass};
use crate::error::Error;
use crate::feature_type::{EntityKind, FeatureType};
use crate::model::{Cds, Gene, GenericMarker, Transcript, UtrKind};
use crate::registry::{FindOrCreate, GENE_ID_PREFIX, TRANSCRIPT_ID_PREFIX, TranscriptRef};
use crate::stats::WarningKind;

use super::gff::{self, GffRecord, ParsedLine};

#[derive(Debug, Default)]
pub struct Gff3Reader;

impl Gff3Reader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FormatReader for Gff3Reader {
    fn name(&self) -> &'static str {
        "GFF3"
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
        match kind {
            EntityKind::Gene => add_gene(session, &record),
            EntityKind::Transcript => add_transcript(session, &record),
            EntityKind::Exon => add_exon_or_cds(session, &record),
            EntityKind::Utr5 => add_utr(session, &record, UtrKind::Five),
            EntityKind::Utr3 => add_utr(session, &record, UtrKind::Three),
            EntityKind::IntergenicConserved => {
                add_generic(session, &record);
                Ok(true)
            }
        }
    }
}

fn add_gene(session: &mut BuildSession, record: &GffRecord) -> Result<bool, Error> {
    let id = record.id();
    let biotype = record.gene_biotype();
    let gene = Gene::new(
        &id,
        &record.name(),
        &record.chromosome,
        record.start,
        record.end,
        record.strand,
    )
    .with_biotype(Some(&biotype));
    session.registry.add_gene(gene)?;
    Ok(true)
}

fn add_transcript(session: &mut BuildSession, record: &GffRecord) -> Result<bool, Error> {
    let id = record.id();
    let gene_id = record
        .parents()
        .into_iter()
        .next()
        .unwrap_or_else(|| format!("{GENE_ID_PREFIX}{id}"));

    let found = session.registry.find_or_create_gene(
        &gene_id,
        &gene_id,
        &record.chromosome,
        record.start,
        record.end,
        record.strand,
        Some(biotype::PLACEHOLDER),
    )?;
    if found.is_placeholder() {
        session.warn(
            WarningKind::PlaceholderGene,
            &format!("cannot find gene '{gene_id}'; created it for transcript '{id}'"),
        );
    }
    let gene_idx = found.or_mismatch_error(&id)?;

    let biotype = record.transcript_biotype();
    let mut tr = Transcript::new(&id, &record.chromosome, record.start, record.end, record.strand);
    tr.protein_coding = gff::coding_flag(biotype.as_deref(), record);
    tr.biotype = biotype;
    session.registry.add_transcript(gene_idx, tr)?;
    Ok(true)
}

/// Finds the transcript a child line belongs to, synthesizing parents when needed.
fn resolve_parent(
    session: &mut BuildSession,
    record: &GffRecord,
    parent: &str,
    child_id: &str,
) -> Result<TranscriptRef, Error> {
    if !parent.is_empty() {
        if let Some(r) = session.registry.find_transcript(parent) {
            gff::check_chromosome(session, r, record, child_id)?;
            return Ok(r);
        }

        // Parent is a gene: hang the child on a transcript derived from it
        if let Some(g) = session.registry.find_gene(parent) {
            let tr_id = format!("{TRANSCRIPT_ID_PREFIX}{}", session.registry.gene(g).id);
            if let Some(r) = session.registry.find_transcript(&tr_id) {
                gff::check_chromosome(session, r, record, child_id)?;
                return Ok(r);
            }
            let mut tr = Transcript::new(
                &tr_id,
                &record.chromosome,
                record.start,
                record.end,
                record.strand,
            );
            tr.protein_coding = gff::coding_flag(None, record);
            let r = session.registry.add_transcript(g, tr)?;
            session.warn(
                WarningKind::PlaceholderTranscript,
                &format!("cannot find transcript '{parent}'; created '{tr_id}' for '{child_id}'"),
            );
            return Ok(r);
        }
    }

    let base = if parent.is_empty() { child_id } else { parent };
    let tr_id = if parent.is_empty() {
        format!("{TRANSCRIPT_ID_PREFIX}{child_id}")
    } else {
        parent.to_string()
    };
    let gene_id = format!("{GENE_ID_PREFIX}{base}");
    let found = session.registry.find_or_create_transcript(
        &tr_id,
        &gene_id,
        &record.chromosome,
        record.start,
        record.end,
        record.strand,
        None,
    )?;
    if let FindOrCreate::CreatedPlaceholder(r) = found {
        session.registry.transcript_mut(r).protein_coding = gff::coding_flag(None, record);
        session.warn(
            WarningKind::PlaceholderTranscript,
            &format!("cannot find transcript '{base}'; created transcript '{tr_id}' and gene '{gene_id}' for '{child_id}'"),
        );
    }
    found.or_mismatch_error(child_id)
}

fn add_exon_or_cds(session: &mut BuildSession, record: &GffRecord) -> Result<bool, Error> {
    let Some(feature) = record.feature else {
        return Ok(false);
    };
    if feature == FeatureType::IntronCns {
        return Ok(false);
    }

    let id = record.id();
    let mut parents = record.parents();
    if parents.is_empty() {
        parents.push(String::new());
    }
    for parent in &parents {
        let r = resolve_parent(session, record, parent, &id)?;
        match feature {
            FeatureType::Cds => session.registry.add_cds(r, cds(record, &id)),
            FeatureType::StartCodon | FeatureType::StopCodon => {
                gff::add_exon(session, r, record.exon(&id));
                session
                    .registry
                    .add_cds(r, cds(record, &format!("{}_{id}", record.type_name)));
            }
            _ => {
                gff::add_exon(session, r, record.exon(&id));
            }
        }
    }
    Ok(true)
}

fn cds(record: &GffRecord, id: &str) -> Cds {
    Cds::new(id, record.start, record.end, record.strand, record.frame)
}

fn add_utr(session: &mut BuildSession, record: &GffRecord, kind: UtrKind) -> Result<bool, Error> {
    let id = record.id();
    let parents = record.parents();
    let mut added = false;
    for parent in &parents {
        let Some(r) = session.registry.find_transcript(parent) else {
            session.warn(
                WarningKind::MissingParent,
                &format!("cannot find transcript '{parent}' for UTR '{id}'"),
            );
            continue;
        };
        gff::check_chromosome(session, r, record, &id)?;
        gff::attach_utr(session, r, kind, record, &id);
        added = true;
    }
    if parents.is_empty() {
        debug!("UTR '{id}' has no Parent; skipped");
    }
    Ok(added)
}

fn add_generic(session: &mut BuildSession, record: &GffRecord) {
    session.registry.add_generic(GenericMarker {
        id: record.id(),
        kind: EntityKind::IntergenicConserved.to_string(),
        chromosome: record.chromosome.clone(),
        start: record.start,
        end: record.end,
        strand: record.strand,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildOptions, BuildReport, Builder};
    use crate::source::TextSource;
    use crate::strand::Strand;

    fn build(text: &str) -> Result<BuildReport, Error> {
        Builder::new(Box::new(Gff3Reader::new()), BuildOptions::new("test").without_sequences())
            .with_source(TextSource::new("test.gff3", text))
            .build()
    }

    #[test]
    fn exon_before_transcript() {
        let text = "\
##gff-version 3
1\tsrc\texon\t101\t200\t.\t+\t.\tID=e1;Parent=T1
1\tsrc\tCDS\t151\t200\t.\t+\t0\tID=c1;Parent=T1
1\tsrc\tmRNA\t101\t300\t.\t+\t.\tID=T1;Parent=G1
1\tsrc\tgene\t101\t300\t.\t+\t.\tID=G1;Name=ABC
";
        let report = build(text).unwrap();
        let gene = report.genome.gene("G1").unwrap();
        assert_eq!(gene.name, "ABC");
        let tr = &gene.transcripts[0];
        assert_eq!(tr.id, "T1");
        assert_eq!(tr.exons.len(), 1);
        assert_eq!((tr.exons[0].start, tr.exons[0].end), (100, 199));
        assert!(tr.is_protein_coding());
        assert_eq!(report.stats.warnings(WarningKind::PlaceholderGene), 0);
    }

    #[test]
    fn shared_exon_and_placeholders() {
        let text = "\
1\tsrc\tmRNA\t1\t100\t.\t-\t.\tID=T1;Parent=G1
1\tsrc\tmRNA\t1\t100\t.\t-\t.\tID=T2;Parent=G1
1\tsrc\texon\t1\t100\t.\t-\t.\tID=e1;Parent=T1,T2
1\tsrc\texon\t201\t300\t.\t-\t.\tID=e2;Parent=G9
";
        let report = build(text).unwrap();
        assert_eq!(report.stats.warnings(WarningKind::PlaceholderGene), 1);
        assert_eq!(report.stats.warnings(WarningKind::PlaceholderTranscript), 1);
        let g1 = report.genome.gene("G1").unwrap();
        assert_eq!(g1.biotype.as_deref(), Some("mRNA"));
        assert!(g1.transcripts.iter().all(|t| t.exons[0].id == "e1"));
        let orphan = report.genome.transcript("G9").unwrap();
        assert_eq!(orphan.strand, Strand::Reverse);
        assert!(report.genome.gene("Gene_G9").is_some());
    }

    #[test]
    fn escaped_comma_in_transcript_id() {
        let text = "\
1\tsrc\tgene\t1\t300\t.\t+\t.\tID=G1
1\tsrc\tmRNA\t1\t300\t.\t+\t.\tID=T%2C1;Parent=G1
1\tsrc\texon\t1\t100\t.\t+\t.\tID=e1;Parent=T%2C1
";
        let report = build(text).unwrap();
        let tr = report.genome.transcript("T,1").unwrap();
        assert_eq!(tr.exons.len(), 1);
        assert_eq!(report.stats.warnings(WarningKind::PlaceholderTranscript), 0);
        assert!(report.genome.transcript("T").is_none());
    }

    #[test]
    fn parent_gene_gets_derived_transcript() {
        let text = "\
1\tsrc\tgene\t1\t300\t.\t+\t.\tID=G1
1\tsrc\texon\t1\t100\t.\t+\t.\tID=e1;Parent=G1
1\tsrc\texon\t201\t300\t.\t+\t.\tID=e2;Parent=G1
";
        let report = build(text).unwrap();
        let gene = report.genome.gene("G1").unwrap();
        assert_eq!(gene.transcripts.len(), 1);
        assert_eq!(gene.transcripts[0].id, "Transcript_G1");
        assert_eq!(gene.transcripts[0].exons.len(), 2);
    }

    #[test]
    fn codons_add_exon_and_cds() {
        let text = "\
1\tsrc\tmRNA\t1\t300\t.\t+\t.\tID=T1
1\tsrc\texon\t1\t100\t.\t+\t.\tID=e1;Parent=T1
1\tsrc\tstop_codon\t201\t203\t.\t+\t0\tID=s1;Parent=T1
";
        let report = build(text).unwrap();
        let tr = report.genome.transcript("T1").unwrap();
        assert!(tr.exon("s1").is_some());
        assert!(tr.cds.iter().any(|c| c.id == "stop_codon_s1"));
    }

    #[test]
    fn utr_attaches_to_containing_exon() {
        let text = "\
1\tsrc\tmRNA\t1\t300\t.\t+\t.\tID=T1
1\tsrc\texon\t1\t100\t.\t+\t.\tID=e1;Parent=T1
1\tsrc\tCDS\t51\t100\t.\t+\t0\tID=c1;Parent=T1
1\tsrc\tfive_prime_UTR\t1\t50\t.\t+\t.\tID=u1;Parent=T1
1\tsrc\tthree_prime_UTR\t251\t300\t.\t+\t.\tID=u2;Parent=T1
";
        let report = build(text).unwrap();
        let tr = report.genome.transcript("T1").unwrap();
        let five: Vec<_> = tr.utrs_of(UtrKind::Five).collect();
        assert_eq!(five.len(), 1);
        assert_eq!(five[0].exon_id, "e1");
        let three: Vec<_> = tr.utrs_of(UtrKind::Three).collect();
        assert_eq!(three[0].exon_id, "u2");
        assert!(tr.exon("u2").is_some());
        assert_eq!(report.stats.warnings(WarningKind::MissingParent), 1);
    }

    #[test]
    fn duplicate_gene_is_fatal() {
        let text = "\
1\tsrc\tgene\t1\t300\t.\t+\t.\tID=G1
1\tsrc\tgene\t1\t300\t.\t+\t.\tID=G1
";
        let err = build(text).unwrap_err();
        assert!(err.to_string().contains("test.gff3:2"));
        assert!(matches!(err.root(), Error::DuplicateId { kind: "gene", .. }));
    }

    #[test]
    fn child_on_other_chromosome_is_fatal() {
        let text = "\
1\tsrc\tmRNA\t1\t300\t.\t+\t.\tID=T1
2\tsrc\texon\t1\t100\t.\t+\t.\tID=e1;Parent=T1
";
        let err = build(text).unwrap_err();
        assert!(matches!(err.root(), Error::ChromosomeMismatch { .. }));
    }

    #[test]
    fn intergenic_conserved_marker() {
        let text = "chr3\tsrc\tinter_CNS\t11\t20\t.\t+\t.\tID=cns1\n";
        let report = build(text).unwrap();
        assert_eq!(report.genome.markers.len(), 1);
        assert_eq!(report.genome.markers[0].chromosome, "3");
        assert_eq!(report.stats.parsed(EntityKind::IntergenicConserved), 1);
    }
}
