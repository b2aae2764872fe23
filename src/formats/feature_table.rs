//! GenBank and EMBL feature tables.
//!
//! Records are scanned line by line during a single pass, then their
//! `source`, `gene`, `mRNA` and `CDS` features are turned into the model.
//! The record's own sequence (GenBank `ORIGIN`, EMBL `SQ`) is handed to the
//! builder as an embedded sequence.

use log::debug;

use crate::builder::{self, BuildSession, FormatReader, Pass};
use crate::coordinates::parse_int_safe;
use crate::error::Error;
use crate::feature_type::EntityKind;
use crate::frame::Frame;
use crate::model::{Cds, Exon, Gene, Transcript};
use crate::registry::TranscriptRef;
use crate::source::LineSource;
use crate::strand::Strand;

/// Width of the line prefix before a feature key (`     ` or `FT   `).
const KEY_PREFIX_LEN: usize = 5;
/// Width of the feature key column after the prefix.
const FEATURE_KEY_LEN: usize = 16;

const PASSES: [Pass; 1] = [Pass::Read(EntityKind::Transcript)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    GenBank,
    Embl,
}

/// A parsed feature location: one or more closed intervals, raw (not offset-corrected).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub parts: Vec<(i64, i64)>,
    pub complement: bool,
}

impl Location {
    #[must_use]
    pub fn start(&self) -> i64 {
        self.parts.iter().map(|p| p.0).min().unwrap_or_default()
    }

    #[must_use]
    pub fn end(&self) -> i64 {
        self.parts.iter().map(|p| p.1).max().unwrap_or_default()
    }
}

/// Parses `complement(join(<1..100,200..>300))` and friends.
pub fn parse_location(text: &str) -> Result<Location, Error> {
    let complement = text.contains("complement");
    let cleaned: String = text
        .replace("complement", "")
        .replace("join", "")
        .replace("order", "")
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '(' | ')') && !c.is_whitespace())
        .collect();

    let mut parts = Vec::new();
    for part in cleaned.split(',').filter(|p| !p.is_empty()) {
        if part.contains(':') {
            debug!("remote location part '{part}' ignored");
            continue;
        }
        let (start, end) = match part.split_once("..") {
            Some((s, e)) => (parse_int_safe(s), parse_int_safe(e)),
            None => {
                let pos = parse_int_safe(part);
                (pos, pos)
            }
        };
        parts.push((start.min(end), start.max(end)));
    }
    if parts.is_empty() {
        return Err(Error::Parse(format!("cannot parse feature location '{text}'")));
    }
    Ok(Location { parts, complement })
}

/// One feature block with its qualifiers, as written.
#[derive(Debug, Clone, Default, PartialEq)]
struct Feature {
    key: String,
    location: String,
    qualifiers: Vec<(String, String)>,
    line_num: usize,
    line: String,
}

impl Feature {
    fn get(&self, key: &str) -> Option<&str> {
        self.qualifiers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn is(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }

    fn gene_id(&self) -> Option<&str> {
        self.get("locus_tag").or_else(|| self.get("db_xref"))
    }

    fn gene_name(&self) -> Option<&str> {
        self.get("gene")
            .or_else(|| self.get("gene_synonym"))
            .or_else(|| self.gene_id())
    }

    fn transcript_id(&self) -> String {
        ["transcript_id", "locus_tag", "protein_id", "db_xref"]
            .iter()
            .find_map(|k| self.get(k))
            .map(str::to_string)
            .or_else(|| {
                self.get("product")
                    .map(|p| p.split_whitespace().collect::<Vec<_>>().join("_"))
            })
            .unwrap_or_else(|| format!("tr_line_{}", self.line_num))
    }

    /// Splits raw qualifier text (`/key="value"`, `/key=value`, `/flag`).
    fn push_qualifier(&mut self, raw: &str) {
        let raw = raw.trim_start_matches('/');
        let (key, value) = raw.split_once('=').unwrap_or((raw, ""));
        let value = value.trim();
        let value = value.strip_prefix('"').unwrap_or(value);
        let value = value.strip_suffix('"').unwrap_or(value);
        let key = key.trim().to_ascii_lowercase();
        let value = if key == "translation" {
            value.split_whitespace().collect()
        } else {
            value.to_string()
        };
        self.qualifiers.push((key, value));
    }
}

/// Everything collected from one `LOCUS`/`ID` ... `//` record.
#[derive(Debug, Default)]
struct Record {
    locus: Option<String>,
    version: Option<String>,
    features: Vec<Feature>,
    sequence: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Features,
    Sequence,
}

/// Line-level state machine for both dialects.
#[derive(Debug)]
struct Scanner {
    dialect: Dialect,
    line_num: usize,
    section: Section,
    record: Record,
    /// Feature being accumulated and its pending (possibly multi-line) qualifier.
    feature: Option<Feature>,
    qualifier: Option<String>,
    done: Vec<Record>,
}

impl Scanner {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            line_num: 0,
            section: Section::Header,
            record: Record::default(),
            feature: None,
            qualifier: None,
            done: Vec::new(),
        }
    }

    fn feed(&mut self, line: &str) {
        self.line_num += 1;
        match self.dialect {
            Dialect::GenBank => self.feed_genbank(line),
            Dialect::Embl => self.feed_embl(line),
        }
    }

    fn feed_genbank(&mut self, line: &str) {
        if line.starts_with("//") {
            self.end_record();
            return;
        }
        let first_token = || line.split_whitespace().nth(1).map(str::to_string);
        if line.starts_with("LOCUS") {
            self.record.locus = first_token();
        } else if line.starts_with("VERSION") {
            self.record.version = first_token();
        } else if line.starts_with("FEATURES") {
            self.section = Section::Features;
        } else if line.starts_with("ORIGIN") {
            self.end_feature();
            self.section = Section::Sequence;
        } else if self.section == Section::Sequence {
            self.push_sequence(line);
        } else if self.section == Section::Features && line.starts_with(' ') {
            self.feature_line(line);
        } else if !line.starts_with(' ') {
            self.end_feature();
            self.section = Section::Header;
        }
    }

    fn feed_embl(&mut self, line: &str) {
        if line.starts_with("//") {
            self.end_record();
            return;
        }
        let key = line.get(..2).unwrap_or(line).trim();
        match key {
            "ID" => {
                let value = line.get(KEY_PREFIX_LEN..).unwrap_or_default();
                self.record.locus = value
                    .split(|c: char| c == ';' || c.is_whitespace())
                    .find(|s| !s.is_empty())
                    .map(str::to_string);
            }
            "FT" => {
                self.section = Section::Features;
                self.feature_line(line);
            }
            "SQ" => {
                self.end_feature();
                self.section = Section::Sequence;
            }
            "" if self.section == Section::Sequence => self.push_sequence(line),
            _ => {
                self.end_feature();
                self.section = Section::Header;
            }
        }
    }

    fn push_sequence(&mut self, line: &str) {
        self.record
            .sequence
            .extend(line.bytes().filter(u8::is_ascii_alphabetic));
    }

    fn feature_line(&mut self, line: &str) {
        let body = line.get(KEY_PREFIX_LEN..).unwrap_or_default();
        let key = body.get(..FEATURE_KEY_LEN.min(body.len())).unwrap_or(body).trim();
        if !key.is_empty() {
            self.end_feature();
            let location = body.get(FEATURE_KEY_LEN..).unwrap_or_default().trim();
            self.feature = Some(Feature {
                key: key.to_string(),
                location: location.to_string(),
                line_num: self.line_num,
                line: line.to_string(),
                ..Feature::default()
            });
            return;
        }

        let text = body.trim();
        let Some(feature) = self.feature.as_mut() else {
            return;
        };
        if text.starts_with('/') {
            if let Some(raw) = self.qualifier.take() {
                feature.push_qualifier(&raw);
            }
            self.qualifier = Some(text.to_string());
        } else if let Some(raw) = self.qualifier.as_mut() {
            raw.push(' ');
            raw.push_str(text);
        } else {
            feature.location.push_str(text);
        }
    }

    fn end_feature(&mut self) {
        if let Some(mut feature) = self.feature.take() {
            if let Some(raw) = self.qualifier.take() {
                feature.push_qualifier(&raw);
            }
            self.record.features.push(feature);
        }
    }

    fn end_record(&mut self) {
        self.end_feature();
        self.section = Section::Header;
        self.done.push(std::mem::take(&mut self.record));
    }

    /// Finished records, plus a trailing record that lacks its `//`.
    fn finish(&mut self) -> Vec<Record> {
        self.end_feature();
        if self.record.locus.is_some() || !self.record.features.is_empty() {
            self.end_record();
        }
        std::mem::take(&mut self.done)
    }
}

/// Reader for GenBank (`LOCUS`, `FEATURES`, `ORIGIN`) and EMBL (`ID`, `FT`, `SQ`) files.
#[derive(Debug)]
pub struct FeatureTableReader {
    scanner: Scanner,
}

impl FeatureTableReader {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            scanner: Scanner::new(dialect),
        }
    }

    #[must_use]
    pub fn genbank() -> Self {
        Self::new(Dialect::GenBank)
    }

    #[must_use]
    pub fn embl() -> Self {
        Self::new(Dialect::Embl)
    }
}

impl FormatReader for FeatureTableReader {
    fn name(&self) -> &'static str {
        match self.scanner.dialect {
            Dialect::GenBank => "GenBank",
            Dialect::Embl => "EMBL",
        }
    }

    fn passes(&self) -> Vec<Pass> {
        PASSES.to_vec()
    }

    /// Only scans; entities are created once a record is complete.
    fn parse_line(
        &mut self,
        _session: &mut BuildSession,
        line: &str,
        _kind: EntityKind,
    ) -> Result<bool, Error> {
        self.scanner.feed(line);
        Ok(false)
    }

    fn populate(
        &mut self,
        session: &mut BuildSession,
        source: Option<&dyn LineSource>,
    ) -> Result<(), Error> {
        builder::run_passes(self, session, source)?;
        let file = source.map(|s| s.name()).unwrap_or_default().to_string();
        let reader = self.name();
        for record in self.scanner.finish() {
            RecordBuilder::new(session, &record).build(reader, &file)?;
        }
        Ok(())
    }
}

/// Turns one record into genes, transcripts, exons and CDS.
struct RecordBuilder<'a> {
    session: &'a mut BuildSession,
    record: &'a Record,
    chromosome: String,
    gene_latest: Option<usize>,
    tr_latest: Vec<TranscriptRef>,
}

impl<'a> RecordBuilder<'a> {
    fn new(session: &'a mut BuildSession, record: &'a Record) -> Self {
        Self {
            session,
            record,
            chromosome: String::new(),
            gene_latest: None,
            tr_latest: Vec::new(),
        }
    }

    fn build(mut self, reader: &'static str, file: &str) -> Result<(), Error> {
        let record = self.record;
        let source = record.features.iter().find(|f| f.is("source"));
        self.chromosome = self.chromosome_name(source);
        let length = match source {
            Some(f) => {
                let loc = parse_location(&f.location)
                    .map_err(|e| e.at_line(reader, file, f.line_num, &f.line))?;
                loc.end() - loc.start() + 1
            }
            None => record.sequence.len() as i64,
        };
        let genome = self.session.genome_mut();
        let name = genome.ensure_chromosome(&self.chromosome);
        if let Some(chr) = genome.chromosome_mut(&name) {
            chr.length = chr.length.max(length);
        }
        debug!("feature table record '{name}' of length {length}");

        for feature in &record.features {
            self.add_feature(feature)
                .map_err(|e| e.at_line(reader, file, feature.line_num, &feature.line))?;
        }
        if !record.sequence.is_empty() {
            self.session.add_sequence(&name, record.sequence.clone());
        }
        Ok(())
    }

    /// VERSION, else the source's `/chromosome`, else the locus name, else the genome name.
    fn chromosome_name(&self, source: Option<&Feature>) -> String {
        self.record
            .version
            .clone()
            .filter(|v| !v.is_empty())
            .or_else(|| source.and_then(|f| f.get("chromosome")).map(str::to_string))
            .or_else(|| self.record.locus.clone())
            .unwrap_or_else(|| self.session.genome().name.clone())
    }

    fn add_feature(&mut self, feature: &Feature) -> Result<(), Error> {
        if feature.is("gene") {
            let loc = parse_location(&feature.location)?;
            self.gene_latest = Some(self.find_or_create_gene(feature, &loc)?);
            self.tr_latest.clear();
            return Ok(());
        }
        let r = if feature.is("mRNA") {
            self.add_mrna(feature)?
        } else if feature.is("CDS") {
            self.add_cds(feature)?
        } else {
            return Ok(());
        };

        if self.gene_latest != Some(r.gene) || self.tr_latest.is_empty() {
            self.tr_latest = vec![r];
        } else {
            self.tr_latest.push(r);
        }
        self.gene_latest = Some(r.gene);
        Ok(())
    }

    fn span(&self, loc: &Location) -> (i64, i64) {
        let offset = self.session.offset();
        (loc.start() - offset, loc.end() - offset)
    }

    fn find_or_create_gene(&mut self, feature: &Feature, loc: &Location) -> Result<usize, Error> {
        let (start, end) = self.span(loc);
        let fallback = format!("Gene_{start}_{end}");
        let id = feature.gene_id().unwrap_or(&fallback);
        if let Some(idx) = self.session.registry.find_gene(id) {
            return Ok(idx);
        }
        let name = feature.gene_name().unwrap_or(&fallback);
        let strand = Strand::from_complement(loc.complement);
        let gene = Gene::new(id, name, &self.chromosome, start, end, strand);
        self.session.stats.count_parsed(EntityKind::Gene);
        self.session.registry.add_gene(gene)
    }

    fn add_transcript(
        &mut self,
        gene_idx: usize,
        id: &str,
        start: i64,
        end: i64,
        strand: Strand,
    ) -> Result<TranscriptRef, Error> {
        let tr = Transcript::new(id, &self.chromosome, start, end, strand);
        let r = self.session.registry.add_transcript(gene_idx, tr)?;
        self.session.stats.count_parsed(EntityKind::Transcript);
        Ok(r)
    }

    fn add_mrna(&mut self, feature: &Feature) -> Result<TranscriptRef, Error> {
        let loc = parse_location(&feature.location)?;
        let (start, end) = self.span(&loc);
        let gene_idx = match self.gene_latest {
            Some(g) if {
                let gene = self.session.registry.gene(g);
                gene.start <= end && start <= gene.end
            } => g,
            _ => self.find_or_create_gene(feature, &loc)?,
        };

        let id = self.session.registry.unique_transcript_id(&feature.transcript_id());
        let strand = Strand::from_complement(loc.complement);
        let r = self.add_transcript(gene_idx, &id, start, end, strand)?;
        if loc.parts.len() > 1 {
            let offset = self.session.offset();
            for (n, &(s, e)) in loc.parts.iter().enumerate() {
                let exon = Exon::new(&format!("{id}_{}", n + 1), s - offset, e - offset, strand)
                    .with_rank(n as u32 + 1);
                self.session.registry.add_exon(r, exon);
                self.session.stats.count_parsed(EntityKind::Exon);
            }
        }
        Ok(r)
    }

    fn add_cds(&mut self, feature: &Feature) -> Result<TranscriptRef, Error> {
        let loc = parse_location(&feature.location)?;
        let r = self.find_or_create_transcript(feature, &loc)?;
        let offset = self.session.offset();
        let strand = Strand::from_complement(loc.complement);
        let tr = self.session.registry.transcript_mut(r);
        if feature.get("translation").is_some() {
            tr.protein_coding = Some(true);
        }
        let id = format!("CDS_{}", tr.id);
        for &(s, e) in &loc.parts {
            tr.add_cds(Cds::new(&id, s - offset, e - offset, strand, Frame::Unknown));
        }
        Ok(r)
    }

    /// The CDS's gene is the latest gene when the CDS lies inside it and names it.
    fn cds_matches_gene(&self, feature: &Feature, loc: &Location, gene_idx: Option<usize>) -> bool {
        let Some(gene) = gene_idx.map(|g| self.session.registry.gene(g)) else {
            return false;
        };
        let (start, end) = self.span(loc);
        start >= gene.start && end <= gene.end && feature.gene_name() == Some(gene.name.as_str())
    }

    /// CDS parts must line up with the transcript's exons: the first part ends
    /// where its exon ends, middle parts match exactly and the last part starts
    /// where its exon starts.
    fn cds_matches_transcript(&self, loc: &Location, r: TranscriptRef) -> bool {
        let tr = self.session.registry.transcript(r);
        let (start, end) = self.span(loc);
        if start < tr.start || end > tr.end {
            return false;
        }
        if loc.parts.len() < 2 || tr.exons.is_empty() {
            return true;
        }

        let offset = self.session.offset();
        let mut parts: Vec<(i64, i64)> = loc
            .parts
            .iter()
            .map(|&(s, e)| (s - offset, e - offset))
            .collect();
        parts.sort_unstable();
        let mut exons: Vec<(i64, i64)> = tr.exons.iter().map(|e| (e.start, e.end)).collect();
        exons.sort_unstable();
        if parts.len() > exons.len() {
            return false;
        }

        let Some(first) = exons.iter().position(|&(_, e)| parts[0].0 <= e) else {
            return false;
        };
        let last = parts.len() - 1;
        parts.iter().enumerate().all(|(i, &(ps, pe))| {
            let Some(&(es, ee)) = exons.get(first + i) else {
                return false;
            };
            match i {
                0 => es <= ps && ee == pe,
                i if i == last => es == ps && ee >= pe,
                _ => es == ps && ee == pe,
            }
        })
    }

    fn find_or_create_transcript(
        &mut self,
        feature: &Feature,
        loc: &Location,
    ) -> Result<TranscriptRef, Error> {
        if self.cds_matches_gene(feature, loc, self.gene_latest) {
            let free = self.tr_latest.iter().copied().find(|&r| {
                !self.session.registry.transcript(r).has_cds()
                    && self.cds_matches_transcript(loc, r)
            });
            if let Some(r) = free {
                return Ok(r);
            }
        }

        let id = feature.transcript_id();
        match self.session.registry.find_transcript(&id) {
            Some(r) if !self.session.registry.transcript(r).has_cds() => Ok(r),
            Some(r) => {
                // the id already carries CDS data: start a sibling transcript
                let tr = self.session.registry.transcript(r);
                let (start, end, strand) = (tr.start, tr.end, tr.strand);
                let new_id = self.session.registry.unique_transcript_id(&id);
                self.add_transcript(r.gene, &new_id, start, end, strand)
            }
            None => {
                let gene_idx = match self.gene_latest {
                    Some(g) if self.cds_matches_gene(feature, loc, Some(g)) => g,
                    _ => self.find_or_create_gene(feature, loc)?,
                };
                let (start, end) = self.span(loc);
                let strand = Strand::from_complement(loc.complement);
                self.add_transcript(gene_idx, &id, start, end, strand)
            }
        }
    }
}
