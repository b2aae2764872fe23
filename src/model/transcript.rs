//! Transcript and its child-feature bookkeeping.

use crate::coordinates::Span;
use crate::strand::Strand;

use super::exon::{Cds, Exon, Utr, UtrKind};

/// Outcome of proposing an exon to a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExonInsert {
    /// Inserted under its own id.
    Added,
    /// An exon with the same id already covers the proposal; nothing changed.
    Contained,
    /// Same id, different shape: inserted under a synthesized id.
    Renamed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub id: String,
    pub chromosome: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub biotype: Option<String>,
    /// Tri-state while parsing: unknown, coding, non-coding.
    pub protein_coding: Option<bool>,
    pub exons: Vec<Exon>,
    pub cds: Vec<Cds>,
    pub utrs: Vec<Utr>,
}

impl Transcript {
    #[must_use]
    pub fn new(id: &str, chromosome: &str, start: i64, end: i64, strand: Strand) -> Self {
        Self {
            id: id.to_string(),
            chromosome: chromosome.to_string(),
            start,
            end,
            strand,
            biotype: None,
            protein_coding: None,
            exons: Vec::new(),
            cds: Vec::new(),
            utrs: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_protein_coding(&self) -> bool {
        self.protein_coding == Some(true)
    }

    #[must_use]
    pub fn has_cds(&self) -> bool {
        !self.cds.is_empty()
    }

    #[must_use]
    pub fn exon(&self, id: &str) -> Option<&Exon> {
        self.exons.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn exon_index(&self, id: &str) -> Option<usize> {
        self.exons.iter().position(|e| e.id == id)
    }

    /// Adds an exon, tolerating repeated ids the way annotation dumps produce them.
    pub fn add_exon(&mut self, exon: Exon) -> ExonInsert {
        match self.exon(&exon.id) {
            None => {
                self.exons.push(exon);
                ExonInsert::Added
            }
            Some(existing) if existing.includes(&exon) => ExonInsert::Contained,
            Some(_) => {
                let mut renamed = exon;
                let mut n = self.exons.len();
                let mut id = format!("{}_{n}", renamed.id);
                while self.exon(&id).is_some() {
                    n += 1;
                    id = format!("{}_{n}", renamed.id);
                }
                renamed.id = id.clone();
                self.exons.push(renamed);
                ExonInsert::Renamed(id)
            }
        }
    }

    pub fn add_cds(&mut self, cds: Cds) {
        self.cds.push(cds);
    }

    pub fn add_utr(&mut self, utr: Utr) {
        self.utrs.push(utr);
    }

    /// Exon indices in transcription order.
    #[must_use]
    pub fn sorted_exon_indices(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.exons.len()).collect();
        if self.strand.is_reverse() {
            idx.sort_by(|&a, &b| {
                let (ea, eb) = (&self.exons[a], &self.exons[b]);
                eb.end.cmp(&ea.end).then(eb.start.cmp(&ea.start))
            });
        } else {
            idx.sort_by(|&a, &b| {
                let (ea, eb) = (&self.exons[a], &self.exons[b]);
                ea.start.cmp(&eb.start).then(ea.end.cmp(&eb.end))
            });
        }
        idx
    }

    /// Genomic envelope `(min start, max end)` of all CDS segments.
    #[must_use]
    pub fn cds_envelope(&self) -> Option<(i64, i64)> {
        let start = self.cds.iter().map(|c| c.start).min()?;
        let end = self.cds.iter().map(|c| c.end).max()?;
        Some((start, end))
    }

    /// First coding base in transcription direction.
    #[must_use]
    pub fn cds_start(&self) -> Option<i64> {
        let (min, max) = self.cds_envelope()?;
        Some(if self.strand.is_reverse() { max } else { min })
    }

    #[must_use]
    pub fn cds_length(&self) -> i64 {
        self.cds.iter().map(Span::size).sum()
    }

    #[must_use]
    pub fn exon_length(&self) -> i64 {
        self.exons.iter().map(Span::size).sum()
    }

    /// The exon containing the CDS start.
    #[must_use]
    pub fn first_coding_exon(&self) -> Option<usize> {
        let cds_start = self.cds_start()?;
        self.sorted_exon_indices()
            .into_iter()
            .find(|&i| self.exons[i].contains_pos(cds_start))
    }

    /// A CDS segment lying inside the given exon.
    #[must_use]
    pub fn find_cds_in_exon(&self, exon_index: usize) -> Option<usize> {
        let exon = self.exons.get(exon_index)?;
        self.cds.iter().position(|c| exon.includes(c))
    }

    /// The exon that holds `span`, preferring full containment over overlap.
    #[must_use]
    pub fn query_exon<S: Span>(&self, span: &S) -> Option<usize> {
        self.exons
            .iter()
            .position(|e| e.includes(span))
            .or_else(|| self.exons.iter().position(|e| e.intersects(span)))
    }

    pub fn utrs_of(&self, kind: UtrKind) -> impl Iterator<Item = &Utr> {
        self.utrs.iter().filter(move |u| u.kind == kind)
    }
}

impl Span for Transcript {
    fn start(&self) -> i64 {
        self.start
    }

    fn end(&self) -> i64 {
        self.end
    }
}
