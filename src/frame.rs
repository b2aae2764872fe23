//! Reading frame (GFF phase) of coding segments.

use std::fmt;

/// Number of bases to skip before the first complete codon of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Frame {
    Zero,
    One,
    Two,
    #[default]
    Unknown,
}

impl Frame {
    /// Parse GFF/GTF column 8. `.` and anything unparseable is unknown.
    #[must_use]
    pub fn from_gff(s: &str) -> Self {
        match s.trim() {
            "0" => Self::Zero,
            "1" => Self::One,
            "2" => Self::Two,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn from_value(value: i64) -> Self {
        match value {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Two,
            _ => Self::Unknown,
        }
    }

    /// Converts a UCSC `exonFrames` value into a GFF phase. `-1` stays unknown.
    #[must_use]
    pub fn from_ucsc(value: i64) -> Self {
        if value < 0 {
            return Self::Unknown;
        }
        Self::from_value((3 - value % 3) % 3)
    }

    /// Phase implied by `length` coding bases preceding a segment.
    #[must_use]
    pub fn from_length(length: usize) -> Self {
        Self::from_value(((3 - length % 3) % 3) as i64)
    }

    #[must_use]
    pub fn value(self) -> Option<u8> {
        match self {
            Self::Zero => Some(0),
            Self::One => Some(1),
            Self::Two => Some(2),
            Self::Unknown => None,
        }
    }

    #[must_use]
    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    #[must_use]
    pub fn is_nonzero(self) -> bool {
        matches!(self, Self::One | Self::Two)
    }

    /// Frame after trimming `bases` from the segment's transcription start.
    #[must_use]
    pub fn shifted(self, bases: i64) -> Self {
        match self.value() {
            Some(v) => Self::from_value((i64::from(v) - bases).rem_euclid(3)),
            None => Self::Unknown,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) => write!(f, "{v}"),
            None => write!(f, "."),
        }
    }
}
