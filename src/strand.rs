//! Strand orientation for genomic features.

use std::fmt;

/// Strand orientation of a genomic feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    /// Parse from GFF/GTF column 7 or a UCSC strand column. "-" is reverse; everything else is forward.
    #[must_use]
    pub fn from_gff(s: &str) -> Self {
        if s.trim() == "-" {
            Self::Reverse
        } else {
            Self::Forward
        }
    }

    /// Parse a Biomart style strand ("1" / "-1").
    #[must_use]
    pub fn from_numeric(s: &str) -> Self {
        if s.trim().starts_with('-') {
            Self::Reverse
        } else {
            Self::Forward
        }
    }

    #[must_use]
    pub fn from_complement(complement: bool) -> Self {
        if complement {
            Self::Reverse
        } else {
            Self::Forward
        }
    }

    #[must_use]
    pub fn is_reverse(self) -> bool {
        self == Self::Reverse
    }

    /// Majority vote between two counts. Ties go to forward.
    #[must_use]
    pub fn majority(forward: usize, reverse: usize) -> Self {
        if reverse > forward {
            Self::Reverse
        } else {
            Self::Forward
        }
    }

    /// Majority strand over an iterator of strands.
    pub fn majority_of<I: IntoIterator<Item = Strand>>(strands: I) -> Self {
        let (forward, reverse) = strands
            .into_iter()
            .fold((0, 0), |(f, r), s| if s.is_reverse() { (f, r + 1) } else { (f + 1, r) });
        Self::majority(forward, reverse)
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "+"),
            Self::Reverse => write!(f, "-"),
        }
    }
}
