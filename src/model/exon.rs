//! Transcript child features: exons, coding segments and UTRs.

use log::warn;

use crate::coordinates::Span;
use crate::frame::Frame;
use crate::strand::Strand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exon {
    pub id: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    /// 1-based position in transcription order; 0 until ranked.
    pub rank: u32,
    pub frame: Frame,
    /// Upper-case bases in transcription orientation.
    pub sequence: Option<Vec<u8>>,
}

impl Exon {
    #[must_use]
    pub fn new(id: &str, start: i64, end: i64, strand: Strand) -> Self {
        Self {
            id: id.to_string(),
            start,
            end,
            strand,
            rank: 0,
            frame: Frame::Unknown,
            sequence: None,
        }
    }

    #[must_use]
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    #[must_use]
    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = rank;
        self
    }

    #[must_use]
    pub fn has_sequence(&self) -> bool {
        self.sequence.is_some()
    }

    /// Trims `bases` from the transcription start so the frame moves back by the same amount.
    ///
    /// Returns false (and leaves the exon alone) if the exon is too short.
    pub fn frame_correction(&mut self, bases: i64) -> bool {
        if bases <= 0 {
            return true;
        }
        if self.size() <= bases {
            warn!(
                "exon '{}' too short (size {}) to correct frame",
                self.id,
                self.size()
            );
            return false;
        }
        if self.strand.is_reverse() {
            self.end -= bases;
        } else {
            self.start += bases;
        }
        self.frame = self.frame.shifted(bases);
        if let Some(seq) = self.sequence.as_mut() {
            let n = (bases as usize).min(seq.len());
            seq.drain(..n);
        }
        true
    }
}

impl Span for Exon {
    fn start(&self) -> i64 {
        self.start
    }

    fn end(&self) -> i64 {
        self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cds {
    pub id: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub frame: Frame,
}

impl Cds {
    #[must_use]
    pub fn new(id: &str, start: i64, end: i64, strand: Strand, frame: Frame) -> Self {
        Self {
            id: id.to_string(),
            start,
            end,
            strand,
            frame,
        }
    }

    pub fn frame_correction(&mut self, bases: i64) -> bool {
        if bases <= 0 {
            return true;
        }
        if self.size() <= bases {
            return false;
        }
        if self.strand.is_reverse() {
            self.end -= bases;
        } else {
            self.start += bases;
        }
        self.frame = self.frame.shifted(bases);
        true
    }
}

impl Span for Cds {
    fn start(&self) -> i64 {
        self.start
    }

    fn end(&self) -> i64 {
        self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UtrKind {
    Five,
    Three,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utr {
    pub kind: UtrKind,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    /// Id of the exon this UTR lies in.
    pub exon_id: String,
}

impl Utr {
    #[must_use]
    pub fn new(kind: UtrKind, start: i64, end: i64, strand: Strand, exon_id: &str) -> Self {
        Self {
            kind,
            start,
            end,
            strand,
            exon_id: exon_id.to_string(),
        }
    }
}

impl Span for Utr {
    fn start(&self) -> i64 {
        self.start
    }

    fn end(&self) -> i64 {
        self.end
    }
}
