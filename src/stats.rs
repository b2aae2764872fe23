//! Aggregate build counters so silent data loss stays observable.

use std::collections::BTreeMap;
use std::fmt;

use crate::feature_type::EntityKind;

/// Recoverable conditions that are logged and counted instead of aborting the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WarningKind {
    PlaceholderGene,
    PlaceholderTranscript,
    MissingParent,
    ChromosomeMismatch,
    MissingAttribute,
    ExonOutOfRange,
    SequenceLengthMismatch,
    AllFramesZero,
    FrameCorrectionFailed,
    ChromosomeSizeMismatch,
    LowSequenceCoverage,
    MalformedLine,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PlaceholderGene => "placeholder gene",
            Self::PlaceholderTranscript => "placeholder transcript",
            Self::MissingParent => "missing parent",
            Self::ChromosomeMismatch => "chromosome mismatch",
            Self::MissingAttribute => "missing attribute",
            Self::ExonOutOfRange => "exon out of range",
            Self::SequenceLengthMismatch => "sequence length mismatch",
            Self::AllFramesZero => "all frames zero",
            Self::FrameCorrectionFailed => "frame correction failed",
            Self::ChromosomeSizeMismatch => "chromosome size mismatch",
            Self::LowSequenceCoverage => "low sequence coverage",
            Self::MalformedLine => "malformed line",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Entities produced by the parsing passes, per kind.
    pub parsed: BTreeMap<EntityKind, usize>,
    pub sequences_added: usize,
    pub sequences_ignored: usize,
    pub exons_inferred: usize,
    pub exons_removed: usize,
    pub exons_collapsed: usize,
    pub utrs_inferred: usize,
    pub exons_frame_corrected: usize,
    pub chromosomes_removed: usize,
    pub transcripts_marked_coding: usize,
    pub warnings: BTreeMap<WarningKind, usize>,
}

impl BuildStats {
    pub fn count_parsed(&mut self, kind: EntityKind) {
        *self.parsed.entry(kind).or_default() += 1;
    }

    #[must_use]
    pub fn parsed(&self, kind: EntityKind) -> usize {
        self.parsed.get(&kind).copied().unwrap_or(0)
    }

    pub fn warn(&mut self, kind: WarningKind) {
        *self.warnings.entry(kind).or_default() += 1;
    }

    #[must_use]
    pub fn warnings(&self, kind: WarningKind) -> usize {
        self.warnings.get(&kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_warnings(&self) -> usize {
        self.warnings.values().sum()
    }
}
