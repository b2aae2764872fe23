//! Generic multi-pass builder shared by every format reader.
//!
//! A [`FormatReader`] turns lines into entities; the [`Builder`] owns the
//! session, drives the reader's passes over a re-readable [`LineSource`],
//! attaches sequences and runs the fixup pipeline in a fixed order.

use std::path::PathBuf;

use log::{info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::coordinates;
use crate::error::Error;
use crate::fasta::FastaReader;
use crate::feature_type::EntityKind;
use crate::fixup::{self, FixupOptions};
use crate::model::Genome;
use crate::progress::ProgressCounter;
use crate::registry::Registry;
use crate::sequence;
use crate::source::LineSource;
use crate::stats::{BuildStats, WarningKind};

/// Line that switches a GFF stream into embedded FASTA mode.
pub const FASTA_DELIMITER: &str = "##FASTA";

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 20_100_629;

/// One step of a reader's population phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Re-read the whole input asking for one entity kind.
    Read(EntityKind),
    /// Infer exons from CDS so later UTR passes can find their exons.
    ExonsFromCds,
}

/// Passes used by the GFF-family readers, in order.
pub const GFF_PASSES: [Pass; 7] = [
    Pass::Read(EntityKind::Gene),
    Pass::Read(EntityKind::Transcript),
    Pass::Read(EntityKind::Exon),
    Pass::ExonsFromCds,
    Pass::Read(EntityKind::Utr5),
    Pass::Read(EntityKind::Utr3),
    Pass::Read(EntityKind::IntergenicConserved),
];

/// Already-validated build settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub genome: String,
    pub read_sequences: bool,
    /// When sequences are not read, fill exons with random bases instead.
    pub random_sequences: bool,
    pub fasta_candidates: Vec<PathBuf>,
    /// Overrides the reader's own frame-correction default.
    pub frame_correction: Option<bool>,
    pub min_nonzero_frames: f64,
    pub seed: u64,
    /// Overrides the reader's native input offset.
    pub input_offset: Option<i64>,
}

impl BuildOptions {
    #[must_use]
    pub fn new(genome: &str) -> Self {
        Self {
            genome: genome.to_string(),
            read_sequences: true,
            random_sequences: false,
            fasta_candidates: Vec::new(),
            frame_correction: None,
            min_nonzero_frames: 0.0,
            seed: DEFAULT_SEED,
            input_offset: None,
        }
    }

    /// Skips sequence loading entirely.
    #[must_use]
    pub fn without_sequences(mut self) -> Self {
        self.read_sequences = false;
        self
    }
}

/// Mutable state threaded through one build.
#[derive(Debug)]
pub struct BuildSession {
    pub registry: Registry,
    pub stats: BuildStats,
    offset: i64,
    /// Sequences found inside the annotation input itself.
    embedded: Option<Vec<(String, Vec<u8>)>>,
    progress: ProgressCounter,
}

impl BuildSession {
    #[must_use]
    pub fn new(genome_name: &str, input_offset: i64) -> Self {
        Self {
            registry: Registry::new(genome_name),
            stats: BuildStats::default(),
            offset: input_offset,
            embedded: None,
            progress: ProgressCounter::new("parsing"),
        }
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Normalizes a raw position with this session's input offset.
    #[must_use]
    pub fn position(&self, raw: &str) -> i64 {
        coordinates::normalize(raw, self.offset)
    }

    #[must_use]
    pub fn genome(&self) -> &Genome {
        self.registry.genome()
    }

    pub fn genome_mut(&mut self) -> &mut Genome {
        self.registry.genome_mut()
    }

    /// Logs a recoverable problem and counts it.
    pub fn warn(&mut self, kind: WarningKind, message: &str) {
        warn!("{message}");
        self.stats.warn(kind);
    }

    /// Stores a sequence carried by the input (embedded FASTA, feature-table ORIGIN, ...).
    pub fn add_sequence(&mut self, name: &str, sequence: Vec<u8>) {
        self.embedded
            .get_or_insert_with(Vec::new)
            .push((name.to_string(), sequence));
    }

    #[must_use]
    pub fn has_embedded_sequences(&self) -> bool {
        self.embedded.is_some()
    }
}

/// A format-specific reader plugged into the generic builder.
pub trait FormatReader {
    /// Name used in logs and fatal error messages.
    fn name(&self) -> &'static str;

    /// Subtracted from every raw position (1 for 1-based formats).
    fn input_offset(&self) -> i64 {
        1
    }

    /// Passes over the input, in order.
    fn passes(&self) -> Vec<Pass>;

    /// Whether this format's frames are trustworthy enough to correct exons.
    fn frame_correction(&self) -> bool {
        false
    }

    /// Parses one line; returns true if it produced an entity of `kind`.
    fn parse_line(
        &mut self,
        session: &mut BuildSession,
        line: &str,
        kind: EntityKind,
    ) -> Result<bool, Error>;

    /// Populates the session. The default re-reads `source` once per pass.
    fn populate(
        &mut self,
        session: &mut BuildSession,
        source: Option<&dyn LineSource>,
    ) -> Result<(), Error> {
        run_passes(self, session, source)
    }
}

/// Drives `reader` through its passes over `source`.
pub fn run_passes<R: FormatReader + ?Sized>(
    reader: &mut R,
    session: &mut BuildSession,
    source: Option<&dyn LineSource>,
) -> Result<(), Error> {
    let source = source
        .ok_or_else(|| Error::MissingInput(format!("{} reader needs an input file", reader.name())))?;
    for pass in reader.passes() {
        match pass {
            Pass::Read(kind) => read_pass(reader, session, source, kind)?,
            Pass::ExonsFromCds => {
                let inferred = fixup::exons_from_cds(session.genome_mut());
                session.stats.exons_inferred += inferred;
            }
        }
    }
    Ok(())
}

fn read_pass<R: FormatReader + ?Sized>(
    reader: &mut R,
    session: &mut BuildSession,
    source: &dyn LineSource,
    kind: EntityKind,
) -> Result<(), Error> {
    session.progress.reset(&format!("{} {kind} pass", reader.name()));
    let mut lines = source.lines()?;
    let mut line_num = 0;
    while let Some(line) = lines.next() {
        let line = line?;
        line_num += 1;
        if line.trim_end() == FASTA_DELIMITER {
            if !session.has_embedded_sequences() {
                for record in FastaReader::new(lines.by_ref()) {
                    let (name, sequence) = record?;
                    session.add_sequence(&name, sequence);
                }
            }
            break;
        }
        match reader.parse_line(session, &line, kind) {
            Ok(true) => {
                session.stats.count_parsed(kind);
                session.progress.tick();
            }
            Ok(false) => {}
            Err(e) => return Err(e.at_line(reader.name(), source.name(), line_num, &line)),
        }
    }
    info!(
        "{}: {} {kind} entries from '{}'",
        reader.name(),
        session.progress.count(),
        source.name()
    );
    Ok(())
}

/// A finished model plus the counters collected while building it.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub genome: Genome,
    pub stats: BuildStats,
}

pub struct Builder {
    reader: Box<dyn FormatReader>,
    options: BuildOptions,
    source: Option<Box<dyn LineSource>>,
}

impl Builder {
    #[must_use]
    pub fn new(reader: Box<dyn FormatReader>, options: BuildOptions) -> Self {
        Self {
            reader,
            options,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source<S: LineSource + 'static>(mut self, source: S) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn build(mut self) -> Result<BuildReport, Error> {
        let offset = self
            .options
            .input_offset
            .unwrap_or_else(|| self.reader.input_offset());
        info!(
            "building genome '{}' with the {} reader (input offset {offset})",
            self.options.genome,
            self.reader.name()
        );
        let mut session = BuildSession::new(&self.options.genome, offset);
        self.reader.populate(&mut session, self.source.as_deref())?;

        let BuildSession {
            registry,
            mut stats,
            embedded,
            ..
        } = session;
        let mut genome = registry.into_genome();
        info!(
            "parsed {} genes, {} transcripts, {} exons",
            genome.genes.len(),
            genome.transcript_count(),
            genome.exon_count()
        );

        fixup::before_sequences(&mut genome, &mut stats);
        self.load_sequences(&mut genome, embedded, &mut stats)?;

        let fixup_options = FixupOptions {
            frame_correction: self
                .options
                .frame_correction
                .unwrap_or_else(|| self.reader.frame_correction()),
            min_nonzero_frames: self.options.min_nonzero_frames,
            sequences_requested: self.options.read_sequences,
        };
        fixup::finish_up(&mut genome, &mut stats, &fixup_options);
        Ok(BuildReport { genome, stats })
    }

    fn load_sequences(
        &self,
        genome: &mut Genome,
        embedded: Option<Vec<(String, Vec<u8>)>>,
        stats: &mut BuildStats,
    ) -> Result<(), Error> {
        if !self.options.read_sequences {
            if self.options.random_sequences {
                info!("filling exons with random sequences (seed {})", self.options.seed);
                let mut rng = ChaCha8Rng::seed_from_u64(self.options.seed);
                sequence::random_sequences(genome, &mut rng);
            }
            return Ok(());
        }

        if let Some(records) = embedded {
            info!("attaching {} sequences carried by the input", records.len());
            for (name, seq) in records {
                sequence::attach(genome, &name, &seq, stats);
            }
            return Ok(());
        }
        if self.options.fasta_candidates.is_empty() {
            return Err(Error::MissingInput(
                "reference sequence: no FASTA candidates configured".to_string(),
            ));
        }
        let records = sequence::load_fasta(genome, &self.options.fasta_candidates, stats)?;
        info!(
            "{records} reference sequences read, {} exon sequences attached, {} ignored",
            stats.sequences_added, stats.sequences_ignored
        );
        Ok(())
    }
}
