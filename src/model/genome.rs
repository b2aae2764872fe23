//! Genome: the root of the annotation model.

use std::collections::HashMap;

use super::chromosome::{Chromosome, name_key};
use super::gene::Gene;
use super::marker::GenericMarker;
use super::transcript::Transcript;

#[derive(Debug, Clone, Default)]
pub struct Genome {
    pub name: String,
    chromosomes: Vec<Chromosome>,
    /// Case-insensitive name key -> index in `chromosomes`.
    chromosome_index: HashMap<String, usize>,
    pub genes: Vec<Gene>,
    pub markers: Vec<GenericMarker>,
}

impl Genome {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    #[must_use]
    pub fn chromosome(&self, name: &str) -> Option<&Chromosome> {
        let &idx = self.chromosome_index.get(&name_key(name))?;
        self.chromosomes.get(idx)
    }

    pub fn chromosome_mut(&mut self, name: &str) -> Option<&mut Chromosome> {
        let &idx = self.chromosome_index.get(&name_key(name))?;
        self.chromosomes.get_mut(idx)
    }

    /// Returns the normalized name of the chromosome, creating it if needed.
    pub fn ensure_chromosome(&mut self, name: &str) -> String {
        let key = name_key(name);
        if let Some(&idx) = self.chromosome_index.get(&key) {
            return self.chromosomes[idx].name.clone();
        }
        let chromosome = Chromosome::new(name);
        let normalized = chromosome.name.clone();
        self.chromosome_index.insert(key, self.chromosomes.len());
        self.chromosomes.push(chromosome);
        normalized
    }

    /// Removes every chromosome matching `pred` along with any gene placed on it.
    pub fn remove_chromosomes<F>(&mut self, mut pred: F) -> Vec<String>
    where
        F: FnMut(&Chromosome) -> bool,
    {
        let mut removed = Vec::new();
        self.chromosomes.retain(|c| {
            if pred(c) {
                removed.push(c.name.clone());
                false
            } else {
                true
            }
        });
        if removed.is_empty() {
            return removed;
        }
        self.chromosome_index = self
            .chromosomes
            .iter()
            .enumerate()
            .map(|(i, c)| (name_key(&c.name), i))
            .collect();
        let index = &self.chromosome_index;
        self.genes.retain(|g| index.contains_key(&name_key(&g.chromosome)));
        self.markers.retain(|m| index.contains_key(&name_key(&m.chromosome)));
        removed
    }

    pub fn transcripts(&self) -> impl Iterator<Item = &Transcript> {
        self.genes.iter().flat_map(|g| g.transcripts.iter())
    }

    pub fn transcripts_mut(&mut self) -> impl Iterator<Item = &mut Transcript> {
        self.genes.iter_mut().flat_map(|g| g.transcripts.iter_mut())
    }

    #[must_use]
    pub fn gene(&self, id: &str) -> Option<&Gene> {
        self.genes.iter().find(|g| g.id == id)
    }

    #[must_use]
    pub fn transcript(&self, id: &str) -> Option<&Transcript> {
        self.transcripts().find(|t| t.id == id)
    }

    #[must_use]
    pub fn transcript_count(&self) -> usize {
        self.genes.iter().map(|g| g.transcripts.len()).sum()
    }

    #[must_use]
    pub fn exon_count(&self) -> usize {
        self.transcripts().map(|t| t.exons.len()).sum()
    }
}
