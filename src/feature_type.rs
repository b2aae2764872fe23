//! Feature types recognized in the GFF/GTF type column and the entity kinds they map to.

use std::fmt;

use crate::error::Error;

/// Kind of model entity a parsing pass asks a reader to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Gene,
    Transcript,
    Exon,
    Utr5,
    Utr3,
    IntergenicConserved,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        Self::Gene,
        Self::Transcript,
        Self::Exon,
        Self::Utr5,
        Self::Utr3,
        Self::IntergenicConserved,
    ];
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Gene => "gene",
            Self::Transcript => "transcript",
            Self::Exon => "exon",
            Self::Utr5 => "UTR5",
            Self::Utr3 => "UTR3",
            Self::IntergenicConserved => "intergenic_conserved",
        };
        write!(f, "{s}")
    }
}

/// Recognized values of GFF column 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureType {
    Gene,
    Pseudogene,
    MRna,
    TRna,
    SnoRna,
    RRna,
    NcRna,
    MiRna,
    SnRna,
    PseudogenicTranscript,
    Transcript,
    Exon,
    PseudogenicExon,
    Cds,
    StartCodon,
    StopCodon,
    IntronCns,
    FivePrimeUtr,
    ThreePrimeUtr,
    Utr,
    InterCns,
}

impl FeatureType {
    /// The entity kind whose pass consumes this feature type.
    #[must_use]
    pub fn kind(self) -> EntityKind {
        match self {
            Self::Gene => EntityKind::Gene,
            Self::Pseudogene
            | Self::MRna
            | Self::TRna
            | Self::SnoRna
            | Self::RRna
            | Self::NcRna
            | Self::MiRna
            | Self::SnRna
            | Self::PseudogenicTranscript
            | Self::Transcript => EntityKind::Transcript,
            Self::Exon
            | Self::PseudogenicExon
            | Self::Cds
            | Self::StartCodon
            | Self::StopCodon
            | Self::IntronCns => EntityKind::Exon,
            Self::FivePrimeUtr => EntityKind::Utr5,
            Self::ThreePrimeUtr | Self::Utr => EntityKind::Utr3,
            Self::InterCns => EntityKind::IntergenicConserved,
        }
    }

    /// Types that produce CDS entities in addition to (or instead of) exons.
    #[must_use]
    pub fn is_coding_segment(self) -> bool {
        matches!(self, Self::Cds | Self::StartCodon | Self::StopCodon)
    }

    #[must_use]
    pub fn is_codon(self) -> bool {
        matches!(self, Self::StartCodon | Self::StopCodon)
    }
}

impl std::str::FromStr for FeatureType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gene" => Ok(Self::Gene),
            "pseudogene" => Ok(Self::Pseudogene),
            "mrna" => Ok(Self::MRna),
            "trna" => Ok(Self::TRna),
            "snorna" => Ok(Self::SnoRna),
            "rrna" => Ok(Self::RRna),
            "ncrna" => Ok(Self::NcRna),
            "mirna" => Ok(Self::MiRna),
            "snrna" => Ok(Self::SnRna),
            "pseudogenic_transcript" => Ok(Self::PseudogenicTranscript),
            "transcript" => Ok(Self::Transcript),
            "exon" => Ok(Self::Exon),
            "pseudogenic_exon" => Ok(Self::PseudogenicExon),
            "cds" => Ok(Self::Cds),
            "start_codon" => Ok(Self::StartCodon),
            "stop_codon" => Ok(Self::StopCodon),
            "intron_cns" => Ok(Self::IntronCns),
            "five_prime_utr" | "5'-utr" | "5utr" | "utr5" => Ok(Self::FivePrimeUtr),
            "three_prime_utr" | "3'-utr" | "3utr" | "utr3" => Ok(Self::ThreePrimeUtr),
            "utr" => Ok(Self::Utr),
            "inter_cns" => Ok(Self::InterCns),
            _ => Err(Error::Parse(format!("unrecognized feature type: '{s}'"))),
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Gene => "gene",
            Self::Pseudogene => "pseudogene",
            Self::MRna => "mRNA",
            Self::TRna => "tRNA",
            Self::SnoRna => "snoRNA",
            Self::RRna => "rRNA",
            Self::NcRna => "ncRNA",
            Self::MiRna => "miRNA",
            Self::SnRna => "snRNA",
            Self::PseudogenicTranscript => "pseudogenic_transcript",
            Self::Transcript => "transcript",
            Self::Exon => "exon",
            Self::PseudogenicExon => "pseudogenic_exon",
            Self::Cds => "CDS",
            Self::StartCodon => "start_codon",
            Self::StopCodon => "stop_codon",
            Self::IntronCns => "intron_CNS",
            Self::FivePrimeUtr => "five_prime_UTR",
            Self::ThreePrimeUtr => "three_prime_UTR",
            Self::Utr => "UTR",
            Self::InterCns => "inter_CNS",
        };
        write!(f, "{s}")
    }
}
