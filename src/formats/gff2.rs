//! GFF2 reader. The hierarchy is implied by flat `gene_id`/`transcript_id` attributes.

use log::debug;

use crate::builder::{BuildSession, FormatReader, Pass};
use crate::error::Error;
use crate::feature_type::{EntityKind, FeatureType};
use crate::model::{Cds, Gene, Transcript};
use crate::registry::{GENE_ID_PREFIX, TranscriptRef};
use crate::stats::WarningKind;

use super::gff::{self, GffRecord, ParsedLine};

const PASSES: [Pass; 3] = [
    Pass::Read(EntityKind::Gene),
    Pass::Read(EntityKind::Transcript),
    Pass::Read(EntityKind::Exon),
];

#[derive(Debug, Default)]
pub struct Gff2Reader;

impl Gff2Reader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FormatReader for Gff2Reader {
    fn name(&self) -> &'static str {
        "GFF2"
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
        kind: EntityKind,
    ) -> Result<bool, Error> {
        let ParsedLine::Record(record) = gff::parse_line(line, session.offset()) else {
            return Ok(false);
        };
        if record.kind() != Some(kind) {
            return Ok(false);
        }
        match kind {
            EntityKind::Gene => {
                let id = record.attr("gene_id").map_or_else(|| record.id(), str::to_string);
                let gene = Gene::new(
                    &id,
                    &record.name(),
                    &record.chromosome,
                    record.start,
                    record.end,
                    record.strand,
                )
                .with_biotype(Some(&record.gene_biotype()));
                session.registry.add_gene(gene)?;
                Ok(true)
            }
            EntityKind::Transcript => {
                let id = record
                    .attr("transcript_id")
                    .map_or_else(|| record.id(), str::to_string);
                let gene_idx = gene_of(session, &record, &id)?;
                session.registry.add_transcript(gene_idx, new_transcript(&record, &id))?;
                Ok(true)
            }
            EntityKind::Exon => add_exon_or_cds(session, &record),
            _ => Ok(false),
        }
    }
}

fn new_transcript(record: &GffRecord, id: &str) -> Transcript {
    let biotype = record.transcript_biotype();
    let mut tr = Transcript::new(id, &record.chromosome, record.start, record.end, record.strand);
    tr.protein_coding = gff::coding_flag(biotype.as_deref(), record);
    tr.biotype = biotype;
    tr
}

/// Gene named by `gene_id` (or derived from the transcript id), synthesized on first reference.
fn gene_of(
    session: &mut BuildSession,
    record: &GffRecord,
    transcript_id: &str,
) -> Result<usize, Error> {
    let gene_id = record
        .attr("gene_id")
        .map_or_else(|| format!("{GENE_ID_PREFIX}{transcript_id}"), str::to_string);
    let name = record.attr("gene_name").unwrap_or(&gene_id).to_string();
    let found = session.registry.find_or_create_gene(
        &gene_id,
        &name,
        &record.chromosome,
        record.start,
        record.end,
        record.strand,
        Some(&record.gene_biotype()),
    )?;
    if found.is_placeholder() {
        debug!("gene '{gene_id}' synthesized for transcript '{transcript_id}'");
        session.stats.warn(WarningKind::PlaceholderGene);
    }
    found.or_mismatch_error(transcript_id)
}

fn transcript_of(
    session: &mut BuildSession,
    record: &GffRecord,
    transcript_id: &str,
) -> Result<TranscriptRef, Error> {
    if let Some(r) = session.registry.find_transcript(transcript_id) {
        gff::check_chromosome(session, r, record, &record.synthesized_id())?;
        return Ok(r);
    }
    let gene_idx = gene_of(session, record, transcript_id)?;
    let r = session
        .registry
        .add_transcript(gene_idx, new_transcript(record, transcript_id))?;
    session.warn(
        WarningKind::PlaceholderTranscript,
        &format!("transcript '{transcript_id}' not declared; created from a {} line", record.type_name),
    );
    Ok(r)
}

fn add_exon_or_cds(session: &mut BuildSession, record: &GffRecord) -> Result<bool, Error> {
    let Some(feature) = record.feature.filter(|f| *f != FeatureType::IntronCns) else {
        return Ok(false);
    };
    let Some(transcript_id) = record.attr("transcript_id").filter(|t| !t.is_empty()) else {
        session.warn(
            WarningKind::MissingAttribute,
            &format!("{} line without transcript_id skipped", record.type_name),
        );
        return Ok(false);
    };
    let transcript_id = transcript_id.to_string();
    let r = transcript_of(session, record, &transcript_id)?;

    if feature.is_coding_segment() {
        let id = record.synthesized_id();
        session
            .registry
            .add_cds(r, Cds::new(&id, record.start, record.end, record.strand, record.frame));
    } else {
        let id = record.attr("exon_id").map_or_else(|| record.id(), str::to_string);
        gff::add_exon(session, r, record.exon(&id));
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildOptions, BuildReport, Builder};
    use crate::source::TextSource;

    fn build(text: &str) -> BuildReport {
        Builder::new(Box::new(Gff2Reader::new()), BuildOptions::new("test").without_sequences())
            .with_source(TextSource::new("test.gff2", text))
            .build()
            .unwrap()
    }

    #[test]
    fn gene_synthesized_from_transcript_line() {
        let text = "\
##gff-version 2
7\tsrc\tmRNA\t1\t500\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; gene_name \"ABC\"
7\tsrc\texon\t1\t200\t.\t+\t.\ttranscript_id \"T1\"; exon_id \"T1.e1\"
7\tsrc\texon\t301\t500\t.\t+\t.\ttranscript_id \"T1\"; exon_id \"T1.e2\"
7\tsrc\tCDS\t101\t200\t.\t+\t0\ttranscript_id \"T1\"
";
        let report = build(text);
        let gene = report.genome.gene("G1").unwrap();
        assert_eq!(gene.name, "ABC");
        assert_eq!(gene.transcripts.len(), 1);
        assert_eq!(report.stats.warnings(WarningKind::PlaceholderGene), 1);
        let tr = &gene.transcripts[0];
        let ranks: Vec<_> = tr.exons.iter().map(|e| (e.id.as_str(), e.rank)).collect();
        assert_eq!(ranks, vec![("T1.e1", 1), ("T1.e2", 2)]);
        assert_eq!(tr.cds.len(), 1);
    }

    #[test]
    fn exon_without_transcript_line() {
        let text = "7\tsrc\texon\t1\t200\t.\t-\t.\tgene_id \"G1\"; transcript_id \"T1\"\n";
        let report = build(text);
        assert!(report.genome.gene("G1").is_some());
        assert_eq!(report.genome.transcript("T1").unwrap().exons.len(), 1);
        assert_eq!(report.stats.warnings(WarningKind::PlaceholderTranscript), 1);
    }

    #[test]
    fn exon_without_transcript_id_is_skipped() {
        let text = "7\tsrc\texon\t1\t200\t.\t-\t.\tgene_id \"G1\"\n";
        let report = build(text);
        assert!(report.genome.genes.is_empty());
        assert_eq!(report.stats.warnings(WarningKind::MissingAttribute), 1);
    }

    #[test]
    fn utr_lines_are_not_read() {
        let text = "\
7\tsrc\texon\t1\t200\t.\t+\t.\ttranscript_id \"T1\"
7\tsrc\tfive_prime_UTR\t1\t50\t.\t+\t.\ttranscript_id \"T1\"
";
        let report = build(text);
        assert_eq!(report.stats.parsed(EntityKind::Utr5), 0);
    }
}
