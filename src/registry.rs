//! Entity registry: id indices over the genome under construction.
//!
//! The registry owns the in-progress [`Genome`] and four id maps (genes,
//! transcripts, generic markers and any marker by id). Insertion is the only
//! way entities enter the model during parsing, which keeps id uniqueness and
//! parent/child chromosome agreement checked in one place.

use std::collections::HashMap;

use crate::error::Error;
use crate::model::chromosome::name_key;
use crate::model::{Cds, Exon, ExonInsert, Gene, GenericMarker, Genome, Transcript, Utr};
use crate::strand::Strand;

/// Prefix used to synthesize gene ids for formats that rename them inconsistently.
pub const GENE_ID_PREFIX: &str = "Gene_";
/// Prefix used to synthesize transcript ids.
pub const TRANSCRIPT_ID_PREFIX: &str = "Transcript_";

/// Position of a transcript inside the genome: gene index and transcript index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranscriptRef {
    pub gene: usize,
    pub transcript: usize,
}

/// Any registered marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRef {
    Gene(usize),
    Transcript(TranscriptRef),
    Generic(usize),
}

/// Outcome of a find-or-create lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindOrCreate<T> {
    Found(T),
    CreatedPlaceholder(T),
    /// The id exists but lives on another chromosome.
    Mismatch {
        id: String,
        expected: String,
        found: String,
    },
}

impl<T: Copy> FindOrCreate<T> {
    /// The resolved entity, if the lookup did not hit a chromosome mismatch.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        match self {
            Self::Found(v) | Self::CreatedPlaceholder(v) => Some(*v),
            Self::Mismatch { .. } => None,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::CreatedPlaceholder(_))
    }

    /// Converts a mismatch into the fatal error, naming `child`.
    pub fn or_mismatch_error(self, child: &str) -> Result<T, Error> {
        match self {
            Self::Found(v) | Self::CreatedPlaceholder(v) => Ok(v),
            Self::Mismatch {
                id,
                expected,
                found,
            } => Err(Error::ChromosomeMismatch {
                child: child.to_string(),
                child_chromosome: expected,
                parent: id,
                parent_chromosome: found,
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    genome: Genome,
    genes_by_id: HashMap<String, usize>,
    transcripts_by_id: HashMap<String, TranscriptRef>,
    generic_by_id: HashMap<String, usize>,
    markers_by_id: HashMap<String, MarkerRef>,
}

impl Registry {
    #[must_use]
    pub fn new(genome_name: &str) -> Self {
        Self {
            genome: Genome::new(genome_name),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn genome_mut(&mut self) -> &mut Genome {
        &mut self.genome
    }

    #[must_use]
    pub fn into_genome(self) -> Genome {
        self.genome
    }

    /// Looks a gene up by id, falling back to `Gene_<id>`.
    #[must_use]
    pub fn find_gene(&self, id: &str) -> Option<usize> {
        self.genes_by_id
            .get(id)
            .or_else(|| self.genes_by_id.get(&format!("{GENE_ID_PREFIX}{id}")))
            .copied()
    }

    /// Looks a transcript up by id, falling back to `Transcript_<id>`.
    #[must_use]
    pub fn find_transcript(&self, id: &str) -> Option<TranscriptRef> {
        self.transcripts_by_id
            .get(id)
            .or_else(|| {
                self.transcripts_by_id
                    .get(&format!("{TRANSCRIPT_ID_PREFIX}{id}"))
            })
            .copied()
    }

    #[must_use]
    pub fn find_generic(&self, id: &str) -> Option<usize> {
        self.generic_by_id.get(id).copied()
    }

    #[must_use]
    pub fn find_marker(&self, id: &str) -> Option<MarkerRef> {
        self.markers_by_id.get(id).copied()
    }

    #[must_use]
    pub fn gene(&self, idx: usize) -> &Gene {
        &self.genome.genes[idx]
    }

    pub fn gene_mut(&mut self, idx: usize) -> &mut Gene {
        &mut self.genome.genes[idx]
    }

    #[must_use]
    pub fn transcript(&self, r: TranscriptRef) -> &Transcript {
        &self.genome.genes[r.gene].transcripts[r.transcript]
    }

    pub fn transcript_mut(&mut self, r: TranscriptRef) -> &mut Transcript {
        &mut self.genome.genes[r.gene].transcripts[r.transcript]
    }

    /// Registers a gene. A second gene with the same id is fatal and leaves the registry unchanged.
    pub fn add_gene(&mut self, mut gene: Gene) -> Result<usize, Error> {
        if self.genes_by_id.contains_key(&gene.id) {
            return Err(Error::DuplicateId {
                kind: "gene",
                id: gene.id,
            });
        }
        gene.chromosome = self.genome.ensure_chromosome(&gene.chromosome);
        let idx = self.genome.genes.len();
        self.genes_by_id.insert(gene.id.clone(), idx);
        self.markers_by_id.insert(gene.id.clone(), MarkerRef::Gene(idx));
        self.genome.genes.push(gene);
        Ok(idx)
    }

    /// Registers a transcript under a gene.
    ///
    /// Fails without side effects on a duplicate id or if the transcript and
    /// gene are on different chromosomes.
    pub fn add_transcript(
        &mut self,
        gene_idx: usize,
        mut transcript: Transcript,
    ) -> Result<TranscriptRef, Error> {
        if self.transcripts_by_id.contains_key(&transcript.id) {
            return Err(Error::DuplicateId {
                kind: "transcript",
                id: transcript.id,
            });
        }
        let gene = &self.genome.genes[gene_idx];
        if name_key(&transcript.chromosome) != name_key(&gene.chromosome) {
            return Err(Error::ChromosomeMismatch {
                child: transcript.id,
                child_chromosome: transcript.chromosome,
                parent: gene.id.clone(),
                parent_chromosome: gene.chromosome.clone(),
            });
        }
        transcript.chromosome = gene.chromosome.clone();
        let r = TranscriptRef {
            gene: gene_idx,
            transcript: gene.transcripts.len(),
        };
        self.transcripts_by_id.insert(transcript.id.clone(), r);
        self.markers_by_id
            .insert(transcript.id.clone(), MarkerRef::Transcript(r));
        self.genome.genes[gene_idx].transcripts.push(transcript);
        Ok(r)
    }

    pub fn add_exon(&mut self, r: TranscriptRef, exon: Exon) -> ExonInsert {
        self.transcript_mut(r).add_exon(exon)
    }

    pub fn add_cds(&mut self, r: TranscriptRef, cds: Cds) {
        self.transcript_mut(r).add_cds(cds);
    }

    pub fn add_utr(&mut self, r: TranscriptRef, utr: Utr) {
        self.transcript_mut(r).add_utr(utr);
    }

    /// Registers a generic marker. A repeated id keeps the first marker.
    pub fn add_generic(&mut self, mut marker: GenericMarker) -> usize {
        if let Some(&idx) = self.generic_by_id.get(&marker.id) {
            return idx;
        }
        marker.chromosome = self.genome.ensure_chromosome(&marker.chromosome);
        let idx = self.genome.markers.len();
        self.generic_by_id.insert(marker.id.clone(), idx);
        self.markers_by_id
            .entry(marker.id.clone())
            .or_insert(MarkerRef::Generic(idx));
        self.genome.markers.push(marker);
        idx
    }

    /// Finds a gene by id or creates a placeholder on `chromosome`.
    #[allow(clippy::too_many_arguments)]
    pub fn find_or_create_gene(
        &mut self,
        id: &str,
        name: &str,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Strand,
        biotype: Option<&str>,
    ) -> Result<FindOrCreate<usize>, Error> {
        if let Some(idx) = self.find_gene(id) {
            let gene = &self.genome.genes[idx];
            if name_key(&gene.chromosome) != name_key(chromosome) {
                return Ok(FindOrCreate::Mismatch {
                    id: gene.id.clone(),
                    expected: chromosome.to_string(),
                    found: gene.chromosome.clone(),
                });
            }
            return Ok(FindOrCreate::Found(idx));
        }
        let gene = Gene::new(id, name, chromosome, start, end, strand).with_biotype(biotype);
        Ok(FindOrCreate::CreatedPlaceholder(self.add_gene(gene)?))
    }

    /// Finds a transcript by id or creates a placeholder (and its gene `gene_id` if needed).
    #[allow(clippy::too_many_arguments)]
    pub fn find_or_create_transcript(
        &mut self,
        id: &str,
        gene_id: &str,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Strand,
        biotype: Option<&str>,
    ) -> Result<FindOrCreate<TranscriptRef>, Error> {
        if let Some(r) = self.find_transcript(id) {
            let tr = self.transcript(r);
            if name_key(&tr.chromosome) != name_key(chromosome) {
                return Ok(FindOrCreate::Mismatch {
                    id: tr.id.clone(),
                    expected: chromosome.to_string(),
                    found: tr.chromosome.clone(),
                });
            }
            return Ok(FindOrCreate::Found(r));
        }
        let gene_idx = match self.find_or_create_gene(
            gene_id, gene_id, chromosome, start, end, strand, biotype,
        )? {
            FindOrCreate::Found(g) | FindOrCreate::CreatedPlaceholder(g) => g,
            FindOrCreate::Mismatch {
                id: gid,
                expected,
                found,
            } => {
                return Ok(FindOrCreate::Mismatch {
                    id: gid,
                    expected,
                    found,
                });
            }
        };
        let mut tr = Transcript::new(id, chromosome, start, end, strand);
        tr.biotype = biotype.map(str::to_string);
        Ok(FindOrCreate::CreatedPlaceholder(
            self.add_transcript(gene_idx, tr)?,
        ))
    }

    /// Returns `id`, or `id.2`, `id.3`, ... whichever is not yet taken.
    #[must_use]
    pub fn unique_transcript_id(&self, id: &str) -> String {
        if !self.transcripts_by_id.contains_key(id) {
            return id.to_string();
        }
        (2..)
            .map(|i| format!("{id}.{i}"))
            .find(|candidate| !self.transcripts_by_id.contains_key(candidate))
            .unwrap_or_else(|| id.to_string())
    }

    #[must_use]
    pub fn gene_count(&self) -> usize {
        self.genes_by_id.len()
    }

    #[must_use]
    pub fn transcript_count(&self) -> usize {
        self.transcripts_by_id.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_gene(id: &str, chr: &str) -> Gene {
        Gene::new(id, id, chr, 100, 200, Strand::Forward)
    }

    fn make_transcript(id: &str, chr: &str) -> Transcript {
        Transcript::new(id, chr, 100, 200, Strand::Forward)
    }

    #[test]
    fn duplicate_gene_is_fatal_and_atomic() {
        let mut reg = Registry::new("test");
        reg.add_gene(make_gene("G1", "chr1")).unwrap();
        let err = reg.add_gene(make_gene("G1", "chr2")).unwrap_err();
        assert!(matches!(err, Error::DuplicateId { kind: "gene", .. }));
        assert_eq!(reg.gene_count(), 1);
        assert_eq!(reg.genome().genes.len(), 1);
        assert_eq!(reg.genome().chromosomes().len(), 1);
    }

    #[test]
    fn duplicate_transcript_is_fatal_and_atomic() {
        let mut reg = Registry::new("test");
        let g = reg.add_gene(make_gene("G1", "1")).unwrap();
        reg.add_transcript(g, make_transcript("T1", "1")).unwrap();
        let err = reg.add_transcript(g, make_transcript("T1", "1")).unwrap_err();
        assert!(matches!(err, Error::DuplicateId { kind: "transcript", .. }));
        assert_eq!(reg.gene(g).transcripts.len(), 1);
        assert_eq!(reg.transcript_count(), 1);
    }

    #[test]
    fn transcript_on_other_chromosome_is_fatal() {
        let mut reg = Registry::new("test");
        let g = reg.add_gene(make_gene("G1", "1")).unwrap();
        let err = reg.add_transcript(g, make_transcript("T1", "2")).unwrap_err();
        assert!(matches!(err, Error::ChromosomeMismatch { .. }));
        assert!(reg.find_transcript("T1").is_none());
    }

    #[test]
    fn chromosome_names_are_normalized() {
        let mut reg = Registry::new("test");
        let g = reg.add_gene(make_gene("G1", "chr1")).unwrap();
        let r = reg.add_transcript(g, make_transcript("T1", "1")).unwrap();
        assert_eq!(reg.transcript(r).chromosome, "1");
    }

    #[test]
    fn prefixed_fallback_lookup() {
        let mut reg = Registry::new("test");
        let g = reg.add_gene(make_gene("Gene_ABC", "1")).unwrap();
        reg.add_transcript(g, make_transcript("Transcript_XYZ", "1"))
            .unwrap();
        assert_eq!(reg.find_gene("ABC"), Some(g));
        assert!(reg.find_transcript("XYZ").is_some());
        assert!(reg.find_gene("missing").is_none());
        assert_eq!(reg.find_marker("Gene_ABC"), Some(MarkerRef::Gene(g)));
    }

    #[test]
    fn find_or_create_transcript_branches() {
        let mut reg = Registry::new("test");
        let created = reg
            .find_or_create_transcript("T1", "G1", "1", 10, 20, Strand::Forward, None)
            .unwrap();
        assert!(created.is_placeholder());
        assert!(reg.find_gene("G1").is_some());

        let found = reg
            .find_or_create_transcript("T1", "G1", "1", 10, 20, Strand::Forward, None)
            .unwrap();
        assert!(matches!(found, FindOrCreate::Found(_)));

        let mismatch = reg
            .find_or_create_transcript("T1", "G1", "2", 10, 20, Strand::Forward, None)
            .unwrap();
        assert!(matches!(mismatch, FindOrCreate::Mismatch { .. }));
        assert!(mismatch.or_mismatch_error("exon1").is_err());
    }

    #[test]
    fn unique_transcript_ids() {
        let mut reg = Registry::new("test");
        let g = reg.add_gene(make_gene("G1", "1")).unwrap();
        assert_eq!(reg.unique_transcript_id("uc001"), "uc001");
        reg.add_transcript(g, make_transcript("uc001", "1")).unwrap();
        assert_eq!(reg.unique_transcript_id("uc001"), "uc001.2");
        reg.add_transcript(g, make_transcript("uc001.2", "1"))
            .unwrap();
        assert_eq!(reg.unique_transcript_id("uc001"), "uc001.3");
    }

    #[test]
    fn generic_markers_keep_first() {
        let mut reg = Registry::new("test");
        let marker = GenericMarker {
            id: "cns1".to_string(),
            kind: "intergenic_conserved".to_string(),
            chromosome: "chr3".to_string(),
            start: 5,
            end: 9,
            strand: Strand::Forward,
        };
        let a = reg.add_generic(marker.clone());
        let b = reg.add_generic(GenericMarker { start: 50, ..marker });
        assert_eq!(a, b);
        assert_eq!(reg.genome().markers.len(), 1);
        assert_eq!(reg.genome().markers[0].chromosome, "3");
        assert_eq!(reg.find_generic("cns1"), Some(0));
    }
}
