//! Biomart "genes file": one row per exon with its gene and transcript repeated.
//!
//! Columns: `external_gene_id, ensembl_gene_id, chromosome_name, start_position,
//! end_position, strand, gene_biotype, ensembl_transcript_id, transcript_start,
//! transcript_end, ensembl_exon_id, exon_chrom_start, exon_chrom_end, rank,
//! 5_utr_start, 5_utr_end, 3_utr_start, 3_utr_end`.

use crate::biotype;
use crate::builder::{BuildSession, FormatReader, Pass};
use crate::coordinates::parse_int_safe;
use crate::error::Error;
use crate::feature_type::EntityKind;
use crate::model::{Exon, Gene, Transcript, Utr, UtrKind};
use crate::registry::TranscriptRef;
use crate::stats::WarningKind;
use crate::strand::Strand;

const MIN_FIELDS: usize = 14;
const UTR5_COLUMNS: (usize, usize) = (14, 15);
const UTR3_COLUMNS: (usize, usize) = (16, 17);

const PASSES: [Pass; 1] = [Pass::Read(EntityKind::Exon)];

#[derive(Debug, Default)]
pub struct GenesFileReader;

impl GenesFileReader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn is_header(fields: &[&str]) -> bool {
    fields[0].starts_with('#')
        || fields[0].eq_ignore_ascii_case("external_gene_id")
        || fields[0].eq_ignore_ascii_case("Ensembl Gene ID")
}

impl FormatReader for GenesFileReader {
    fn name(&self) -> &'static str {
        "GenesFile"
    }

    fn passes(&self) -> Vec<Pass> {
        PASSES.to_vec()
    }

    fn parse_line(
        &mut self,
        session: &mut BuildSession,
        line: &str,
        _kind: EntityKind,
    ) -> Result<bool, Error> {
        if line.trim().is_empty() {
            return Ok(false);
        }
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if is_header(&fields) {
            return Ok(false);
        }
        if fields.len() < MIN_FIELDS {
            session.warn(
                WarningKind::MalformedLine,
                &format!("genes file row has {} columns, expected at least {MIN_FIELDS}", fields.len()),
            );
            return Ok(false);
        }

        let r = transcript_of(session, &fields)?;
        let strand = session.registry.transcript(r).strand;
        let exon_id = fields[10];
        if session.registry.transcript(r).exon(exon_id).is_none() {
            let rank = u32::try_from(parse_int_safe(fields[13])).unwrap_or_default();
            let exon = Exon::new(
                exon_id,
                session.position(fields[11]),
                session.position(fields[12]),
                strand,
            )
            .with_rank(rank);
            session.registry.add_exon(r, exon);
        }

        let utr_columns = [(UtrKind::Five, UTR5_COLUMNS), (UtrKind::Three, UTR3_COLUMNS)];
        for (kind, (start_col, end_col)) in utr_columns {
            let (Some(start), Some(end)) = (fields.get(start_col), fields.get(end_col)) else {
                continue;
            };
            if start.is_empty() || end.is_empty() {
                continue;
            }
            let (start, end) = (session.position(start), session.position(end));
            let utr = Utr::new(kind, start, end, strand, exon_id);
            session.registry.add_utr(r, utr);
        }
        Ok(true)
    }
}

/// The row's transcript, creating its gene and the transcript on first sight.
fn transcript_of(session: &mut BuildSession, fields: &[&str]) -> Result<TranscriptRef, Error> {
    let transcript_id = fields[7];
    if let Some(r) = session.registry.find_transcript(transcript_id) {
        return Ok(r);
    }

    let gene_id = fields[1];
    let gene_idx = match session.registry.find_gene(gene_id) {
        Some(idx) => idx,
        None => {
            let bio_type = Some(fields[6]).filter(|b| !b.is_empty());
            let gene = Gene::new(
                gene_id,
                fields[0],
                fields[2],
                session.position(fields[3]),
                session.position(fields[4]),
                Strand::from_numeric(fields[5]),
            )
            .with_biotype(bio_type);
            session.registry.add_gene(gene)?
        }
    };

    let gene = session.registry.gene(gene_idx);
    let mut tr = Transcript::new(
        transcript_id,
        &gene.chromosome,
        session.position(fields[8]),
        session.position(fields[9]),
        gene.strand,
    );
    tr.biotype = gene.biotype.clone();
    tr.protein_coding = gene.biotype.as_deref().map(biotype::is_protein_coding);
    session.registry.add_transcript(gene_idx, tr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildOptions, Builder};
    use crate::source::TextSource;

    const GENES: &str = "\
external_gene_id\tensembl_gene_id\tchromosome_name\tstart_position\tend_position\tstrand\tgene_biotype\tensembl_transcript_id\ttranscript_start\ttranscript_end\tensembl_exon_id\texon_chrom_start\texon_chrom_end\trank\t5_utr_start\t5_utr_end\t3_utr_start\t3_utr_end
ABC\tENSG1\t4\t101\t600\t-1\tprotein_coding\tENST1\t101\t600\tENSE1\t401\t600\t1\t551\t600\t\t
ABC\tENSG1\t4\t101\t600\t-1\tprotein_coding\tENST1\t101\t600\tENSE2\t101\t300\t2\t\t\t101\t150
ABC\tENSG1\t4\t101\t600\t-1\tprotein_coding\tENST2\t401\t600\tENSE1\t401\t600\t1
";

    #[test]
    fn rows_build_gene_transcripts_and_utrs() {
        let report = Builder::new(Box::new(GenesFileReader::new()), BuildOptions::new("test").without_sequences())
            .with_source(TextSource::new("genes.txt", GENES))
            .build()
            .unwrap();
        let gene = report.genome.gene("ENSG1").unwrap();
        assert_eq!(gene.name, "ABC");
        assert_eq!(gene.transcripts.len(), 2);
        assert_eq!(report.stats.parsed(EntityKind::Exon), 3);

        let tr = report.genome.transcript("ENST1").unwrap();
        assert!(tr.strand.is_reverse());
        assert!(tr.is_protein_coding());
        let five: Vec<_> = tr.utrs_of(UtrKind::Five).collect();
        assert_eq!((five[0].start, five[0].end, five[0].exon_id.as_str()), (550, 599, "ENSE1"));
        let three: Vec<_> = tr.utrs_of(UtrKind::Three).collect();
        assert_eq!((three[0].start, three[0].end), (100, 149));
        let ranks: Vec<_> = tr.exons.iter().map(|e| (e.id.as_str(), e.rank)).collect();
        assert!(ranks.contains(&("ENSE1", 1)));
        assert!(ranks.contains(&("ENSE2", 2)));
    }

    #[test]
    fn short_row_warns() {
        let report = Builder::new(Box::new(GenesFileReader::new()), BuildOptions::new("test").without_sequences())
            .with_source(TextSource::new("genes.txt", "ABC\tENSG1\t4\n"))
            .build()
            .unwrap();
        assert_eq!(report.stats.warnings(WarningKind::MalformedLine), 1);
        assert!(report.genome.genes.is_empty());
    }
}
