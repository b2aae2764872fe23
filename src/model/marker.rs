//! Free-standing intervals that sit outside the gene hierarchy.

use crate::coordinates::Span;
use crate::strand::Strand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericMarker {
    pub id: String,
    /// Free-form type label, e.g. "intergenic_conserved".
    pub kind: String,
    pub chromosome: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
}

impl Span for GenericMarker {
    fn start(&self) -> i64 {
        self.start
    }

    fn end(&self) -> i64 {
        self.end
    }
}
