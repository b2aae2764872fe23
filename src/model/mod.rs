//! The canonical annotation model: genome, chromosomes, genes, transcripts and their parts.

pub mod chromosome;
pub mod exon;
pub mod gene;
pub mod genome;
pub mod marker;
pub mod transcript;

pub use chromosome::Chromosome;
pub use exon::{Cds, Exon, Utr, UtrKind};
pub use gene::Gene;
pub use genome::Genome;
pub use marker::GenericMarker;
pub use transcript::{ExonInsert, Transcript};
