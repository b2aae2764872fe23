//! Format readers and the closed set of supported input formats.

pub mod feature_table;
pub mod genes_file;
pub mod gff;
pub mod gff2;
pub mod gff3;
pub mod gtf;
pub mod random;
pub mod ucsc;

use std::fmt;

use serde::Deserialize;

use crate::builder::FormatReader;
use crate::error::Error;

use self::random::RandomParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Format {
    Gff2,
    Gff3,
    Gtf22,
    KnownGene,
    RefSeq,
    GenesFile,
    GenBank,
    Embl,
    Random,
}

impl Format {
    pub const ALL: [Format; 9] = [
        Self::Gff2,
        Self::Gff3,
        Self::Gtf22,
        Self::KnownGene,
        Self::RefSeq,
        Self::GenesFile,
        Self::GenBank,
        Self::Embl,
        Self::Random,
    ];

    /// Whether the format reads an annotation file at all.
    #[must_use]
    pub fn needs_input(self) -> bool {
        self != Self::Random
    }
}

impl std::str::FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gff2" => Ok(Self::Gff2),
            "gff3" | "gff" => Ok(Self::Gff3),
            "gtf22" | "gtf" => Ok(Self::Gtf22),
            "knowngene" => Ok(Self::KnownGene),
            "refseq" => Ok(Self::RefSeq),
            "genesfile" => Ok(Self::GenesFile),
            "genbank" => Ok(Self::GenBank),
            "embl" => Ok(Self::Embl),
            "random" => Ok(Self::Random),
            _ => Err(Error::Parse(format!("unrecognized input format: {s}"))),
        }
    }
}

impl TryFrom<String> for Format {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Gff2 => "gff2",
            Self::Gff3 => "gff3",
            Self::Gtf22 => "gtf22",
            Self::KnownGene => "knownGene",
            Self::RefSeq => "refSeq",
            Self::GenesFile => "genesFile",
            Self::GenBank => "genbank",
            Self::Embl => "embl",
            Self::Random => "random",
        };
        write!(f, "{s}")
    }
}

/// A fresh reader for `format`. `params` and `seed` only matter for [`Format::Random`].
#[must_use]
pub fn reader_for(format: Format, params: RandomParams, seed: u64) -> Box<dyn FormatReader> {
    match format {
        Format::Gff2 => Box::new(gff2::Gff2Reader::new()),
        Format::Gff3 => Box::new(gff3::Gff3Reader::new()),
        Format::Gtf22 => Box::new(gtf::GtfReader::new()),
        Format::KnownGene => Box::new(ucsc::KnownGeneReader::new()),
        Format::RefSeq => Box::new(ucsc::RefSeqReader::new()),
        Format::GenesFile => Box::new(genes_file::GenesFileReader::new()),
        Format::GenBank => Box::new(feature_table::FeatureTableReader::genbank()),
        Format::Embl => Box::new(feature_table::FeatureTableReader::embl()),
        Format::Random => Box::new(random::RandomReader::new(params, seed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for format in Format::ALL {
            assert_eq!(format.to_string().parse::<Format>().unwrap(), format);
        }
        assert_eq!("GTF".parse::<Format>().unwrap(), Format::Gtf22);
        assert!("bed".parse::<Format>().is_err());
    }

    #[test]
    fn readers_match_formats() {
        let names: Vec<_> = Format::ALL
            .iter()
            .map(|f| reader_for(*f, RandomParams::default(), 1).name())
            .collect();
        assert_eq!(
            names,
            vec!["GFF2", "GFF3", "GTF22", "KnownGene", "RefSeq", "GenesFile", "GenBank", "EMBL", "Random"]
        );
    }
}
