//! annoforge: builds a canonical gene annotation model from GFF, GTF, UCSC,
//! Biomart and GenBank/EMBL inputs.

pub mod error;

pub mod biotype;
pub mod builder;
pub mod cli;
pub mod config;
pub mod coordinates;
pub mod fasta;
pub mod feature_type;
pub mod fixup;
pub mod formats;
pub mod frame;
pub mod model;
pub mod progress;
pub mod registry;
pub mod sequence;
pub mod source;
pub mod stats;
pub mod strand;
