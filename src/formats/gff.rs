//! Column and attribute parsing shared by the GFF2, GFF3 and GTF readers.

use log::debug;

use crate::biotype;
use crate::builder::BuildSession;
use crate::coordinates;
use crate::error::Error;
use crate::feature_type::{EntityKind, FeatureType};
use crate::frame::Frame;
use crate::model::chromosome::name_key;
use crate::model::{Exon, ExonInsert, Utr, UtrKind};
use crate::registry::TranscriptRef;
use crate::stats::WarningKind;
use crate::strand::Strand;

/// Result of splitting one GFF-family line.
#[derive(Debug)]
pub enum ParsedLine {
    Record(Box<GffRecord>),
    Comment,
    /// Fewer than 9 columns; skipped like a header.
    TooShort,
}

/// One tab-separated GFF/GTF feature line.
#[derive(Debug, Clone, PartialEq)]
pub struct GffRecord {
    pub chromosome: String,
    /// Column 2, empty when `.`.
    pub source: String,
    /// Column 3 as written.
    pub type_name: String,
    pub feature: Option<FeatureType>,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub frame: Frame,
    /// Lower-cased keys; the first occurrence of a key wins.
    attributes: Vec<(String, String)>,
}

/// Splits a line into a [`GffRecord`], normalizing positions with `input_offset`.
#[must_use]
pub fn parse_line(line: &str, input_offset: i64) -> ParsedLine {
    if line.starts_with('#') || line.trim().is_empty() {
        return ParsedLine::Comment;
    }
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() < 9 {
        return ParsedLine::TooShort;
    }

    let source = match columns[1].trim() {
        "." => String::new(),
        s => s.to_string(),
    };
    let type_name = columns[2].trim().to_string();
    ParsedLine::Record(Box::new(GffRecord {
        chromosome: columns[0].trim().to_string(),
        source,
        feature: type_name.parse().ok(),
        type_name,
        start: coordinates::normalize(columns[3], input_offset),
        end: coordinates::normalize(columns[4], input_offset),
        strand: Strand::from_gff(columns[6]),
        frame: Frame::from_gff(columns[7]),
        attributes: parse_attributes(columns[8]),
    }))
}

const PARENT_KEY: &str = "parent";

/// Parses column 9 in either `key=value;` (GFF3) or `key "value";` (GFF2/GTF) form.
pub fn parse_attributes(attrs_str: &str) -> Vec<(String, String)> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    for pair in attrs_str.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let eq_pos = pair.find('=');
        let ws_pos = pair.find(char::is_whitespace);
        let (key, value) = match (eq_pos, ws_pos) {
            (Some(eq), ws) if ws.is_none_or(|ws| eq < ws) => (&pair[..eq], &pair[eq + 1..]),
            (_, Some(ws)) => (&pair[..ws], &pair[ws + 1..]),
            _ => continue,
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().trim_matches('"').trim();
        // list values stay encoded so an escaped comma survives the split
        let value = if key == PARENT_KEY {
            value.to_string()
        } else {
            url_decode(value)
        };
        if key.is_empty() || value.is_empty() || attrs.iter().any(|(k, _)| *k == key) {
            continue;
        }
        attrs.push((key, value));
    }
    attrs
}

/// Decodes the escapes GFF3 reserves for its own separators.
fn url_decode(value: &str) -> String {
    if !value.contains('%') {
        return value.to_string();
    }
    value
        .replace("%3B", ";")
        .replace("%3D", "=")
        .replace("%2C", ",")
        .replace("%09", "\t")
        .replace("%20", " ")
        .replace("%25", "%")
}

impl GffRecord {
    /// Case-insensitive attribute lookup.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn kind(&self) -> Option<EntityKind> {
        self.feature.map(FeatureType::kind)
    }

    /// `<type>_<chromosome>_<start+1>_<end+1>`.
    #[must_use]
    pub fn synthesized_id(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.type_name,
            self.chromosome,
            self.start + 1,
            self.end + 1
        )
    }

    /// Feature id: `ID`, then the kind-specific id key, then `db_xref`, then `Name`.
    #[must_use]
    pub fn id(&self) -> String {
        let kind_key = match self.kind() {
            Some(EntityKind::Gene) => Some("gene_id"),
            Some(EntityKind::Transcript) => Some("transcript_id"),
            Some(EntityKind::Exon) => Some("exon_id"),
            _ => None,
        };
        self.attr("ID")
            .or_else(|| kind_key.and_then(|k| self.attr(k)))
            .or_else(|| self.attr("db_xref"))
            .or_else(|| self.attr("Name"))
            .map_or_else(|| self.synthesized_id(), str::to_string)
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.attr("Name")
            .or_else(|| self.attr("gene_name"))
            .map_or_else(|| self.id(), str::to_string)
    }

    /// Comma-separated `Parent` ids.
    #[must_use]
    pub fn parents(&self) -> Vec<String> {
        self.attr(PARENT_KEY)
            .map(|p| {
                p.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(url_decode)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn known_source(&self) -> Option<&str> {
        Some(self.source.as_str()).filter(|s| biotype::is_known(s))
    }

    /// Gene bio-type from attributes, else a known source, else the type column.
    #[must_use]
    pub fn gene_biotype(&self) -> String {
        ["gene_biotype", "gene_type", "biotype"]
            .iter()
            .find_map(|k| self.attr(k))
            .or_else(|| self.known_source())
            .unwrap_or(self.type_name.as_str())
            .to_string()
    }

    /// Transcript bio-type from attributes, else a known source.
    #[must_use]
    pub fn transcript_biotype(&self) -> Option<String> {
        ["transcript_biotype", "transcript_type", "biotype"]
            .iter()
            .find_map(|k| self.attr(k))
            .or_else(|| self.known_source())
            .map(str::to_string)
    }

    /// True if the source column names a protein-coding annotation track.
    #[must_use]
    pub fn is_protein_coding_source(&self) -> bool {
        biotype::is_protein_coding(&self.source)
    }

    #[must_use]
    pub fn exon(&self, id: &str) -> Exon {
        Exon::new(id, self.start, self.end, self.strand).with_frame(self.frame)
    }
}

/// Coding flag implied by a bio-type or source: `Some(true)` only when positive.
#[must_use]
pub fn coding_flag(bio_type: Option<&str>, record: &GffRecord) -> Option<bool> {
    if bio_type.is_some_and(biotype::is_protein_coding) || record.is_protein_coding_source() {
        Some(true)
    } else {
        None
    }
}

/// Fails when a child line sits on another chromosome than its transcript.
pub fn check_chromosome(
    session: &BuildSession,
    r: TranscriptRef,
    record: &GffRecord,
    child_id: &str,
) -> Result<(), Error> {
    let tr = session.registry.transcript(r);
    if name_key(&tr.chromosome) != name_key(&record.chromosome) {
        return Err(Error::ChromosomeMismatch {
            child: child_id.to_string(),
            child_chromosome: record.chromosome.clone(),
            parent: tr.id.clone(),
            parent_chromosome: tr.chromosome.clone(),
        });
    }
    Ok(())
}

/// Adds an exon and returns the id it was stored under.
pub fn add_exon(session: &mut BuildSession, r: TranscriptRef, exon: Exon) -> String {
    let id = exon.id.clone();
    match session.registry.add_exon(r, exon) {
        ExonInsert::Renamed(new_id) => {
            debug!("exon '{id}' repeated with another shape, stored as '{new_id}'");
            new_id
        }
        ExonInsert::Added | ExonInsert::Contained => id,
    }
}

/// Attaches a UTR to the exon holding it, creating that exon if none does.
pub fn attach_utr(
    session: &mut BuildSession,
    r: TranscriptRef,
    kind: UtrKind,
    record: &GffRecord,
    new_exon_id: &str,
) {
    let span = (record.start, record.end);
    let existing = {
        let tr = session.registry.transcript(r);
        tr.query_exon(&span).map(|i| tr.exons[i].id.clone())
    };
    let exon_id = match existing {
        Some(id) => id,
        None => {
            let tr_id = session.registry.transcript(r).id.clone();
            session.warn(
                WarningKind::MissingParent,
                &format!(
                    "no exon holds UTR [{}, {}] of transcript '{tr_id}'; creating exon '{new_exon_id}'",
                    record.start, record.end
                ),
            );
            add_exon(session, r, record.exon(new_exon_id))
        }
    };
    session
        .registry
        .add_utr(r, Utr::new(kind, record.start, record.end, record.strand, &exon_id));
}

/// Classifies a generic UTR by its position relative to the CDS envelope.
#[must_use]
pub fn classify_utr(
    session: &BuildSession,
    r: TranscriptRef,
    start: i64,
    end: i64,
) -> Option<UtrKind> {
    let tr = session.registry.transcript(r);
    let (cds_min, cds_max) = tr.cds_envelope()?;
    let (before, after) = (end < cds_min, start > cds_max);
    match (tr.strand.is_reverse(), before, after) {
        (false, true, _) | (true, _, true) => Some(UtrKind::Five),
        (false, _, true) | (true, true, _) => Some(UtrKind::Three),
        _ => None,
    }
}
