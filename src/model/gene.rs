//! Gene: a named locus owning one or more transcripts.

use crate::coordinates::Span;
use crate::strand::Strand;

use super::transcript::Transcript;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gene {
    pub id: String,
    pub name: String,
    pub chromosome: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub biotype: Option<String>,
    pub transcripts: Vec<Transcript>,
}

impl Gene {
    #[must_use]
    pub fn new(
        id: &str,
        name: &str,
        chromosome: &str,
        start: i64,
        end: i64,
        strand: Strand,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            chromosome: chromosome.to_string(),
            start,
            end,
            strand,
            biotype: None,
            transcripts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_biotype(mut self, biotype: Option<&str>) -> Self {
        self.biotype = biotype.map(str::to_string);
        self
    }

    /// Widens the gene to cover `[start, end]`.
    pub fn expand(&mut self, start: i64, end: i64) {
        self.start = self.start.min(start);
        self.end = self.end.max(end);
    }
}

impl Span for Gene {
    fn start(&self) -> i64 {
        self.start
    }

    fn end(&self) -> i64 {
        self.end
    }
}
