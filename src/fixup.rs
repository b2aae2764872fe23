//! Corrective passes that turn raw parsed entities into a consistent model.
//!
//! [`before_sequences`] runs right after parsing; [`finish_up`] runs after
//! sequences are attached. Every step skips and logs problems instead of
//! aborting the build, and every step is a no-op on an already-fixed model.

use log::{debug, info, warn};

use crate::coordinates::{self, Span};
use crate::frame::Frame;
use crate::model::chromosome::name_key;
use crate::model::{Cds, Exon, Genome, Transcript, Utr, UtrKind};
use crate::sequence;
use crate::stats::{BuildStats, WarningKind};
use crate::strand::Strand;

/// Minimum number of known frames before an all-zero genome is suspicious.
pub const MIN_TOTAL_FRAME_COUNT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixupOptions {
    pub frame_correction: bool,
    /// A transcript is frame-corrected only if its share of non-zero known
    /// frames is strictly greater than this.
    pub min_nonzero_frames: f64,
    /// Run the sequence coverage check at the end.
    pub sequences_requested: bool,
}

impl Default for FixupOptions {
    fn default() -> Self {
        Self {
            frame_correction: false,
            min_nonzero_frames: 0.0,
            sequences_requested: false,
        }
    }
}

/// Clean-up applied after parsing and before sequences are attached.
pub fn before_sequences(genome: &mut Genome, stats: &mut BuildStats) {
    let inferred = exons_from_cds(genome);
    let removed = delete_redundant(genome);
    let collapsed = collapse_zero_gap(genome);
    stats.exons_inferred += inferred;
    stats.exons_removed += removed;
    stats.exons_collapsed += collapsed;
    info!("before sequences: {inferred} exons inferred from CDS, {removed} redundant exons removed, {collapsed} exons collapsed");
}

/// Final adjustments, in a fixed order.
pub fn finish_up(genome: &mut Genome, stats: &mut BuildStats, options: &FixupOptions) {
    adjust_transcripts(genome);
    adjust_genes(genome);
    adjust_chromosomes(genome, stats);
    rank_exons(genome);
    stats.utrs_inferred += utr_from_cds(genome);
    if options.frame_correction {
        stats.exons_frame_corrected += frame_correction(genome, options.min_nonzero_frames, stats);
    }
    stats.chromosomes_removed += remove_empty_chromosomes(genome);
    stats.transcripts_marked_coding += coding_from_cds(genome);
    if options.sequences_requested {
        sequence::check_coverage(genome, stats);
    }
}

/// Creates exons from CDS segments for transcripts whose CDS outgrow their exons.
pub fn exons_from_cds(genome: &mut Genome) -> usize {
    let mut count = 0;
    for tr in genome.transcripts_mut() {
        if tr.cds_length() <= tr.exon_length() {
            continue;
        }
        tr.strand = Strand::majority_of(tr.cds.iter().map(|c| c.strand));

        let mut cds: Vec<&Cds> = tr.cds.iter().collect();
        if tr.strand.is_reverse() {
            cds.sort_by(|a, b| b.end.cmp(&a.end));
        } else {
            cds.sort_by(|a, b| a.start.cmp(&b.start));
        }
        let new_exons: Vec<Exon> = cds
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let id = format!("Exon_{}_{}_{}", tr.chromosome, c.start, c.end);
                Exon::new(&id, c.start, c.end, tr.strand)
                    .with_rank(i as u32 + 1)
                    .with_frame(c.frame)
            })
            .collect();

        for exon in new_exons {
            if tr.exon(&exon.id).is_none() {
                debug!("transcript '{}': exon '{}' inferred from CDS", tr.id, exon.id);
                tr.exons.push(exon);
                count += 1;
            }
        }
    }
    count
}

/// Index of the container that absorbs each redundant element, if any.
///
/// An element is redundant when another element includes it; of two identical
/// elements only the later one is redundant.
fn redundant<S: Span>(items: &[S]) -> Vec<Option<usize>> {
    (0..items.len())
        .map(|i| {
            (0..items.len())
                .filter(|&j| j != i && items[j].includes(&items[i]))
                .filter(|&j| items[j].size() > items[i].size() || j < i)
                .max_by(|&a, &b| items[a].size().cmp(&items[b].size()).then(b.cmp(&a)))
        })
        .collect()
}

/// Removes exons, CDS and UTRs that lie entirely inside a sibling of the same kind.
pub fn delete_redundant(genome: &mut Genome) -> usize {
    let mut removed = 0;
    for tr in genome.transcripts_mut() {
        let containers = redundant(&tr.exons);
        if containers.iter().any(Option::is_some) {
            for (i, container) in containers.iter().enumerate() {
                if let Some(j) = container {
                    let (old, new) = (tr.exons[i].id.clone(), tr.exons[*j].id.clone());
                    debug!("transcript '{}': exon '{old}' is contained in '{new}'", tr.id);
                    reassign_utrs(&mut tr.utrs, &old, &new);
                }
            }
            removed += retain_marked(&mut tr.exons, &containers);
        }

        let containers = redundant(&tr.cds);
        retain_marked(&mut tr.cds, &containers);

        let containers = redundant(&tr.utrs);
        retain_marked(&mut tr.utrs, &containers);
    }
    removed
}

fn retain_marked<T>(items: &mut Vec<T>, containers: &[Option<usize>]) -> usize {
    let before = items.len();
    let mut idx = 0;
    items.retain(|_| {
        let keep = containers[idx].is_none();
        idx += 1;
        keep
    });
    before - items.len()
}

fn reassign_utrs(utrs: &mut [Utr], old_exon: &str, new_exon: &str) {
    for utr in utrs.iter_mut().filter(|u| u.exon_id == old_exon) {
        utr.exon_id = new_exon.to_string();
    }
}

/// Merges elements separated by a zero-length (or negative) gap.
///
/// Returns the merged list and, for each input element, the index of the
/// merged element that absorbed it.
fn collapse<T, F>(items: &[T], mut merge: F) -> (Vec<T>, Vec<usize>)
where
    T: Span + Clone,
    F: FnMut(&mut T, &T),
{
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        items[a]
            .start()
            .cmp(&items[b].start())
            .then(items[a].end().cmp(&items[b].end()))
    });

    let mut merged: Vec<T> = Vec::with_capacity(items.len());
    let mut target = vec![0; items.len()];
    for i in order {
        let item = &items[i];
        let touches = merged
            .last()
            .is_some_and(|last| item.start() - last.end() - 1 <= 0);
        match merged.last_mut() {
            Some(last) if touches => merge(last, item),
            _ => merged.push(item.clone()),
        }
        target[i] = merged.len() - 1;
    }
    (merged, target)
}

/// Merges exons that touch or overlap. CDS segments are left as declared.
pub fn collapse_zero_gap(genome: &mut Genome) -> usize {
    let mut collapsed = 0;
    for tr in genome.transcripts_mut() {
        if tr.exons.len() > 1 {
            let (merged, target) = collapse(&tr.exons, merge_exon);
            if merged.len() < tr.exons.len() {
                for (i, &t) in target.iter().enumerate() {
                    let (old, new) = (&tr.exons[i].id, &merged[t].id);
                    if old != new {
                        debug!("transcript '{}': exon '{old}' collapsed into '{new}'", tr.id);
                        reassign_utrs(&mut tr.utrs, old, new);
                    }
                }
                collapsed += tr.exons.len() - merged.len();
                tr.exons = merged;
            }
        }
    }
    collapsed
}

fn merge_exon(into: &mut Exon, other: &Exon) {
    into.end = into.end.max(other.end);
    if into.strand.is_reverse() {
        into.frame = other.frame;
    }
}

/// Recomputes each transcript's span (and strand) from its children.
pub fn adjust_transcripts(genome: &mut Genome) {
    for tr in genome.transcripts_mut() {
        let spans = tr
            .exons
            .iter()
            .map(|e| (e.start, e.end))
            .chain(tr.cds.iter().map(|c| (c.start, c.end)))
            .chain(tr.utrs.iter().map(|u| (u.start, u.end)));
        if let Some((start, end)) = envelope(spans) {
            tr.start = start;
            tr.end = end;
        }
        if !tr.exons.is_empty() {
            tr.strand = Strand::majority_of(tr.exons.iter().map(|e| e.strand));
        }
    }
}

/// Recomputes each gene's span from its transcripts.
pub fn adjust_genes(genome: &mut Genome) {
    for gene in &mut genome.genes {
        if let Some((start, end)) = envelope(gene.transcripts.iter().map(|t| (t.start, t.end))) {
            gene.start = start;
            gene.end = end;
        }
    }
}

fn envelope<I: Iterator<Item = (i64, i64)>>(spans: I) -> Option<(i64, i64)> {
    spans.fold(None, |acc, (s, e)| match acc {
        None => Some((s, e)),
        Some((a, b)) => Some((a.min(s), b.max(e))),
    })
}

/// Grows chromosomes so every gene (and generic marker) fits.
pub fn adjust_chromosomes(genome: &mut Genome, stats: &mut BuildStats) {
    let mut max_end: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
    let ends = genome
        .genes
        .iter()
        .map(|g| (&g.chromosome, g.end))
        .chain(genome.markers.iter().map(|m| (&m.chromosome, m.end)));
    for (chr, end) in ends {
        let entry = max_end.entry(name_key(chr)).or_insert(end);
        *entry = (*entry).max(end);
    }

    let names: Vec<String> = genome.chromosomes().iter().map(|c| c.name.clone()).collect();
    for name in names {
        let Some(&end) = max_end.get(&name_key(&name)) else {
            continue;
        };
        let Some(chr) = genome.chromosome_mut(&name) else {
            continue;
        };
        let needed = end + 1;
        if chr.is_empty() {
            chr.length = needed;
        } else if chr.length < needed {
            warn!(
                "chromosome '{name}' declares length {} but holds features up to {end}; growing it",
                chr.length
            );
            stats.warn(WarningKind::ChromosomeSizeMismatch);
            chr.length = needed;
        }
    }
}

/// Assigns exon ranks 1..N in transcription order.
pub fn rank_exons(genome: &mut Genome) {
    for tr in genome.transcripts_mut() {
        for (rank, idx) in tr.sorted_exon_indices().into_iter().enumerate() {
            tr.exons[idx].rank = rank as u32 + 1;
        }
    }
}

/// Infers UTRs from the exon parts not covered by CDS or declared UTRs.
pub fn utr_from_cds(genome: &mut Genome) -> usize {
    let mut count = 0;
    for tr in genome.transcripts_mut() {
        let Some((cds_min, cds_max)) = tr.cds_envelope() else {
            continue;
        };
        let covered: Vec<(i64, i64)> = tr
            .cds
            .iter()
            .map(|c| (c.start, c.end))
            .chain(tr.utrs.iter().map(|u| (u.start, u.end)))
            .collect();

        let mut inferred = Vec::new();
        for exon in &tr.exons {
            for (start, end) in coordinates::subtract((exon.start, exon.end), &covered) {
                let before = end < cds_min;
                let after = start > cds_max;
                let kind = match (tr.strand.is_reverse(), before, after) {
                    (false, true, _) | (true, _, true) => UtrKind::Five,
                    (false, _, true) | (true, true, _) => UtrKind::Three,
                    _ => continue,
                };
                inferred.push(Utr::new(kind, start, end, tr.strand, &exon.id));
            }
        }
        if !inferred.is_empty() {
            debug!("transcript '{}': {} UTRs inferred from CDS", tr.id, inferred.len());
            count += inferred.len();
            tr.utrs.extend(inferred);
        }
    }
    count
}

/// Copies CDS frames onto exons that share their transcription start and have none.
pub fn frame_from_cds(tr: &mut Transcript) {
    let reverse = tr.strand.is_reverse();
    for exon in tr.exons.iter_mut().filter(|e| !e.frame.is_known()) {
        let matching = tr.cds.iter().find(|c| {
            if reverse {
                c.end == exon.end
            } else {
                c.start == exon.start
            }
        });
        if let Some(cds) = matching {
            exon.frame = cds.frame;
        }
    }
}

/// Counts `(known, non-zero)` frames over a transcript's exons and CDS.
fn frame_counts(tr: &Transcript) -> (usize, usize) {
    tr.exons
        .iter()
        .map(|e| e.frame)
        .chain(tr.cds.iter().map(|c| c.frame))
        .filter(|f| f.is_known())
        .fold((0, 0), |(k, n), f| (k + 1, n + usize::from(f.is_nonzero())))
}

/// Adjusts exon boundaries so declared frames agree with the coding sequence.
///
/// Returns the number of exons changed.
pub fn frame_correction(
    genome: &mut Genome,
    min_nonzero_frames: f64,
    stats: &mut BuildStats,
) -> usize {
    let (mut total_known, mut total_nonzero) = (0, 0);
    let mut corrected = 0;
    for tr in genome.transcripts_mut() {
        frame_from_cds(tr);
        let (known, nonzero) = frame_counts(tr);
        total_known += known;
        total_nonzero += nonzero;
        if known == 0 || (nonzero as f64 / known as f64) <= min_nonzero_frames {
            continue;
        }
        corrected += usize::from(correct_first_coding_exon(tr));
        corrected += correct_following_exons(tr, stats);
    }

    if total_known >= MIN_TOTAL_FRAME_COUNT && total_nonzero == 0 {
        warn!("all {total_known} exon/CDS frames are zero; frame information is probably missing from the input");
        stats.warn(WarningKind::AllFramesZero);
    }
    if corrected > 0 {
        info!("frame correction changed {corrected} exons");
    }
    corrected
}

/// A first coding exon with a non-zero frame gets a synthetic UTR5 absorbing the offset.
fn correct_first_coding_exon(tr: &mut Transcript) -> bool {
    let Some(idx) = tr.first_coding_exon() else {
        return false;
    };
    let Some(frame) = tr.exons[idx].frame.value().filter(|&f| f > 0) else {
        return false;
    };
    let frame = i64::from(frame);
    let exon = &tr.exons[idx];
    let (start, end) = if tr.strand.is_reverse() {
        (exon.end - (frame - 1), exon.end)
    } else {
        (exon.start, exon.start + (frame - 1))
    };
    let utr = Utr::new(UtrKind::Five, start, end, tr.strand, &exon.id);
    debug!(
        "transcript '{}': first coding exon '{}' has frame {frame}, adding UTR5 [{start}, {end}]",
        tr.id, exon.id
    );

    if let Some(c) = tr.find_cds_in_exon(idx) {
        let bases = tr.cds[c].frame.value().map_or(0, i64::from);
        tr.cds[c].frame_correction(bases);
    }
    tr.exons[idx].frame = Frame::Zero;
    tr.utrs.push(utr);
    true
}

/// Trims later coding exons until their frame matches the accumulated coding length.
fn correct_following_exons(tr: &mut Transcript, stats: &mut BuildStats) -> usize {
    if tr.exons.iter().any(|e| !e.has_sequence()) {
        return 0;
    }
    let utr5 = {
        let spans = tr.utrs_of(UtrKind::Five).map(|u| (u.start, u.end));
        spans.fold(None, |acc: Option<(i64, i64)>, (s, e)| match acc {
            None => Some((s, e)),
            Some((a, b)) => Some((a.min(s), b.max(e))),
        })
    };

    let mut coding_len = 0usize;
    let mut corrected = 0;
    for idx in tr.sorted_exon_indices() {
        let seq_len = tr.exons[idx].sequence.as_ref().map_or(0, Vec::len);
        let mut overlap = 0i64;
        let mut contribution = seq_len;
        let mut in_utr = false;
        if let Some(utr) = utr5 {
            if utr.includes(&tr.exons[idx]) {
                in_utr = true;
                contribution = 0;
            } else {
                overlap = utr.intersect_size(&tr.exons[idx]);
                contribution = seq_len.saturating_sub(overlap as usize);
            }
        }

        let exon_frame = tr.exons[idx].frame;
        if in_utr && exon_frame.is_known() {
            tr.exons[idx].frame = Frame::Unknown;
        } else if exon_frame.is_known() {
            let expected = Frame::from_length(coding_len);
            if expected != exon_frame {
                if overlap > 0 {
                    warn!(
                        "transcript '{}': exon '{}' overlaps the 5' UTR and has frame {exon_frame}, expected {expected}; left unchanged",
                        tr.id, tr.exons[idx].id
                    );
                    stats.warn(WarningKind::FrameCorrectionFailed);
                } else {
                    let cds = tr.find_cds_in_exon(idx);
                    let mut ok = true;
                    while ok && tr.exons[idx].frame != expected {
                        ok = tr.exons[idx].frame_correction(1);
                        if let Some(c) = cds {
                            tr.cds[c].frame_correction(1);
                        }
                    }
                    if ok {
                        corrected += 1;
                    } else {
                        stats.warn(WarningKind::FrameCorrectionFailed);
                    }
                    contribution = tr.exons[idx].sequence.as_ref().map_or(0, Vec::len);
                }
            }
        }
        coding_len += contribution;
    }
    corrected
}

/// Drops chromosomes that never received real content.
pub fn remove_empty_chromosomes(genome: &mut Genome) -> usize {
    let removed = genome.remove_chromosomes(|c| c.is_empty());
    for name in &removed {
        debug!("removing empty chromosome '{name}'");
    }
    removed.len()
}

/// Marks transcripts with CDS but no explicit coding information as protein-coding.
pub fn coding_from_cds(genome: &mut Genome) -> usize {
    let mut count = 0;
    for tr in genome.transcripts_mut() {
        if tr.has_cds() && tr.protein_coding.is_none() && tr.biotype.is_none() {
            tr.protein_coding = Some(true);
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Gene;

    fn make_genome(strand: Strand) -> Genome {
        let mut genome = Genome::new("test");
        let chr = genome.ensure_chromosome("1");
        let mut gene = Gene::new("G1", "G1", &chr, 0, 0, strand);
        gene.transcripts.push(Transcript::new("T1", &chr, 0, 0, strand));
        genome.genes.push(gene);
        genome
    }

    fn tr(genome: &mut Genome) -> &mut Transcript {
        &mut genome.genes[0].transcripts[0]
    }

    fn exon(id: &str, start: i64, end: i64, strand: Strand) -> Exon {
        Exon::new(id, start, end, strand)
    }

    #[test]
    fn zero_gap_exons_collapse() {
        let mut genome = make_genome(Strand::Forward);
        tr(&mut genome).exons = vec![
            exon("e1", 100, 199, Strand::Forward),
            exon("e2", 200, 250, Strand::Forward),
        ];
        let mut stats = BuildStats::default();
        before_sequences(&mut genome, &mut stats);
        let t = tr(&mut genome);
        assert_eq!(t.exons.len(), 1);
        assert_eq!((t.exons[0].start, t.exons[0].end), (100, 250));
        assert_eq!(stats.exons_collapsed, 1);
    }

    #[test]
    fn separated_exons_stay() {
        let mut genome = make_genome(Strand::Forward);
        tr(&mut genome).exons = vec![
            exon("e1", 100, 199, Strand::Forward),
            exon("e2", 201, 250, Strand::Forward),
        ];
        assert_eq!(collapse_zero_gap(&mut genome), 0);
        assert_eq!(tr(&mut genome).exons.len(), 2);
    }

    #[test]
    fn collapse_reassigns_utr_parent() {
        let mut genome = make_genome(Strand::Forward);
        let t = tr(&mut genome);
        t.exons = vec![
            exon("e1", 100, 199, Strand::Forward),
            exon("e2", 200, 250, Strand::Forward),
        ];
        t.utrs = vec![Utr::new(UtrKind::Three, 240, 250, Strand::Forward, "e2")];
        collapse_zero_gap(&mut genome);
        assert_eq!(tr(&mut genome).utrs[0].exon_id, "e1");
    }

    #[test]
    fn minus_strand_collapse_takes_later_frame() {
        let mut genome = make_genome(Strand::Reverse);
        tr(&mut genome).exons = vec![
            exon("e1", 100, 199, Strand::Reverse).with_frame(Frame::One),
            exon("e2", 200, 250, Strand::Reverse).with_frame(Frame::Two),
        ];
        tr(&mut genome).cds = vec![
            Cds::new("c", 150, 199, Strand::Reverse, Frame::One),
            Cds::new("c", 200, 220, Strand::Reverse, Frame::Two),
        ];
        collapse_zero_gap(&mut genome);
        let t = tr(&mut genome);
        assert_eq!(t.exons.len(), 1);
        assert_eq!(t.exons[0].frame, Frame::Two);
        assert_eq!(t.cds.len(), 2);
    }

    #[test]
    fn redundant_exons_removed() {
        let mut genome = make_genome(Strand::Forward);
        let t = tr(&mut genome);
        t.exons = vec![
            exon("big", 100, 300, Strand::Forward),
            exon("inner", 150, 200, Strand::Forward),
            exon("dup", 100, 300, Strand::Forward),
        ];
        t.utrs = vec![Utr::new(UtrKind::Five, 150, 160, Strand::Forward, "inner")];
        assert_eq!(delete_redundant(&mut genome), 2);
        let t = tr(&mut genome);
        assert_eq!(t.exons.len(), 1);
        assert_eq!(t.exons[0].id, "big");
        assert_eq!(t.utrs[0].exon_id, "big");
    }

    #[test]
    fn exons_inferred_from_cds_minus_strand() {
        let mut genome = make_genome(Strand::Forward);
        tr(&mut genome).cds = vec![
            Cds::new("c1", 100, 150, Strand::Reverse, Frame::Zero),
            Cds::new("c2", 300, 350, Strand::Reverse, Frame::Two),
        ];
        assert_eq!(exons_from_cds(&mut genome), 2);
        let t = tr(&mut genome);
        assert_eq!(t.strand, Strand::Reverse);
        assert_eq!(t.exons[0].id, "Exon_1_300_350");
        assert_eq!(t.exons[0].rank, 1);
        assert_eq!(t.exons[0].frame, Frame::Two);
        assert_eq!(t.exons[1].id, "Exon_1_100_150");
        assert_eq!(t.exons[1].rank, 2);
        assert_eq!(exons_from_cds(&mut genome), 0);
    }

    #[test]
    fn ranks_follow_strand() {
        let mut genome = make_genome(Strand::Reverse);
        tr(&mut genome).exons = vec![
            exon("a", 100, 150, Strand::Reverse),
            exon("b", 300, 350, Strand::Reverse),
            exon("c", 200, 250, Strand::Reverse),
        ];
        rank_exons(&mut genome);
        let ranks: Vec<u32> = tr(&mut genome).exons.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![3, 1, 2]);
    }

    #[test]
    fn utrs_inferred_forward() {
        let mut genome = make_genome(Strand::Forward);
        let t = tr(&mut genome);
        t.exons = vec![
            exon("e1", 100, 199, Strand::Forward),
            exon("e2", 300, 399, Strand::Forward),
        ];
        t.cds = vec![
            Cds::new("c", 150, 199, Strand::Forward, Frame::Zero),
            Cds::new("c", 300, 349, Strand::Forward, Frame::Two),
        ];
        assert_eq!(utr_from_cds(&mut genome), 2);
        let t = tr(&mut genome);
        let utr5: Vec<&Utr> = t.utrs_of(UtrKind::Five).collect();
        let utr3: Vec<&Utr> = t.utrs_of(UtrKind::Three).collect();
        assert_eq!((utr5[0].start, utr5[0].end, utr5[0].exon_id.as_str()), (100, 149, "e1"));
        assert_eq!((utr3[0].start, utr3[0].end, utr3[0].exon_id.as_str()), (350, 399, "e2"));
        assert_eq!(utr_from_cds(&mut genome), 0);
    }

    #[test]
    fn utrs_inferred_reverse() {
        let mut genome = make_genome(Strand::Reverse);
        let t = tr(&mut genome);
        t.exons = vec![exon("e1", 100, 399, Strand::Reverse)];
        t.cds = vec![Cds::new("c", 200, 299, Strand::Reverse, Frame::Zero)];
        utr_from_cds(&mut genome);
        let t = tr(&mut genome);
        let utr5: Vec<&Utr> = t.utrs_of(UtrKind::Five).collect();
        assert_eq!((utr5[0].start, utr5[0].end), (300, 399));
        let utr3: Vec<&Utr> = t.utrs_of(UtrKind::Three).collect();
        assert_eq!((utr3[0].start, utr3[0].end), (100, 199));
    }

    #[test]
    fn adjust_sets_exact_envelopes() {
        let mut genome = make_genome(Strand::Forward);
        let t = tr(&mut genome);
        t.start = 50;
        t.end = 1000;
        t.exons = vec![exon("e1", 100, 199, Strand::Forward), exon("e2", 300, 399, Strand::Forward)];
        adjust_transcripts(&mut genome);
        adjust_genes(&mut genome);
        let gene = &genome.genes[0];
        assert_eq!((gene.transcripts[0].start, gene.transcripts[0].end), (100, 399));
        assert_eq!((gene.start, gene.end), (100, 399));
    }

    #[test]
    fn chromosome_grows_to_fit() {
        let mut genome = make_genome(Strand::Forward);
        genome.genes[0].end = 499;
        let mut stats = BuildStats::default();
        adjust_chromosomes(&mut genome, &mut stats);
        assert_eq!(genome.chromosome("1").map(|c| c.length), Some(500));

        genome.genes[0].end = 999;
        adjust_chromosomes(&mut genome, &mut stats);
        assert_eq!(genome.chromosome("1").map(|c| c.length), Some(1000));
        assert_eq!(stats.warnings(WarningKind::ChromosomeSizeMismatch), 1);
    }

    #[test]
    fn empty_chromosomes_removed() {
        let mut genome = make_genome(Strand::Forward);
        genome.ensure_chromosome("2");
        if let Some(chr) = genome.chromosome_mut("1") {
            chr.length = 100;
        }
        assert_eq!(remove_empty_chromosomes(&mut genome), 1);
        assert!(genome.chromosome("2").is_none());
        assert_eq!(genome.genes.len(), 1);
    }

    #[test]
    fn coding_inferred_only_without_explicit_info() {
        let mut genome = make_genome(Strand::Forward);
        let chr = genome.genes[0].chromosome.clone();
        let mut t2 = Transcript::new("T2", &chr, 0, 10, Strand::Forward);
        t2.biotype = Some("processed_transcript".to_string());
        t2.cds.push(Cds::new("c", 0, 10, Strand::Forward, Frame::Zero));
        genome.genes[0].transcripts.push(t2);
        tr(&mut genome).cds.push(Cds::new("c", 0, 10, Strand::Forward, Frame::Zero));

        assert_eq!(coding_from_cds(&mut genome), 1);
        assert!(genome.genes[0].transcripts[0].is_protein_coding());
        assert!(!genome.genes[0].transcripts[1].is_protein_coding());
    }

    #[test]
    fn first_coding_exon_gets_utr5() {
        let mut genome = make_genome(Strand::Forward);
        let t = tr(&mut genome);
        t.exons = vec![
            exon("e1", 100, 199, Strand::Forward).with_frame(Frame::Two),
            exon("e2", 300, 399, Strand::Forward),
        ];
        t.cds = vec![Cds::new("c1", 100, 199, Strand::Forward, Frame::Two)];
        let mut stats = BuildStats::default();
        assert_eq!(frame_correction(&mut genome, 0.0, &mut stats), 1);
        let t = tr(&mut genome);
        assert_eq!(t.exons[0].frame, Frame::Zero);
        let utr5: Vec<&Utr> = t.utrs_of(UtrKind::Five).collect();
        assert_eq!((utr5[0].start, utr5[0].end), (100, 101));
        assert_eq!(t.cds[0].start, 102);
        assert_eq!(frame_correction(&mut genome, 0.0, &mut stats), 0);
    }

    #[test]
    fn following_exon_trimmed_to_frame() {
        let mut genome = make_genome(Strand::Forward);
        let t = tr(&mut genome);
        // 10 coding bases in e1 => next exon should start at phase 2
        let mut e1 = exon("e1", 100, 109, Strand::Forward).with_frame(Frame::Zero);
        e1.sequence = Some(vec![b'A'; 10]);
        let mut e2 = exon("e2", 200, 219, Strand::Forward).with_frame(Frame::One);
        e2.sequence = Some(vec![b'C'; 20]);
        t.exons = vec![e1, e2];
        t.cds = vec![
            Cds::new("c1", 100, 109, Strand::Forward, Frame::Zero),
            Cds::new("c2", 200, 219, Strand::Forward, Frame::One),
        ];
        let mut stats = BuildStats::default();
        assert_eq!(frame_correction(&mut genome, 0.0, &mut stats), 1);
        let t = tr(&mut genome);
        assert_eq!(t.exons[1].frame, Frame::Two);
        assert_eq!(t.exons[1].start, 202);
        assert_eq!(t.exons[1].sequence.as_ref().map(Vec::len), Some(18));
    }

    #[test]
    fn all_zero_frames_warn_without_changes() {
        let mut genome = make_genome(Strand::Forward);
        let t = tr(&mut genome);
        for i in 0..5 {
            let s = i * 100;
            t.exons.push(exon(&format!("e{i}"), s, s + 50, Strand::Forward).with_frame(Frame::Zero));
            t.cds.push(Cds::new("c", s, s + 50, Strand::Forward, Frame::Zero));
        }
        let mut stats = BuildStats::default();
        assert_eq!(frame_correction(&mut genome, 0.0, &mut stats), 0);
        assert_eq!(stats.warnings(WarningKind::AllFramesZero), 1);
    }

    #[test]
    fn pipeline_is_idempotent() {
        let mut genome = make_genome(Strand::Reverse);
        let t = tr(&mut genome);
        t.exons = vec![
            exon("e1", 100, 199, Strand::Reverse),
            exon("e2", 200, 250, Strand::Reverse),
            exon("e3", 400, 499, Strand::Reverse),
        ];
        t.cds = vec![
            Cds::new("c", 150, 250, Strand::Reverse, Frame::Zero),
            Cds::new("c", 400, 450, Strand::Reverse, Frame::Zero),
        ];
        genome.genes[0].end = 600;
        let mut stats = BuildStats::default();
        let options = FixupOptions::default();
        before_sequences(&mut genome, &mut stats);
        finish_up(&mut genome, &mut stats, &options);
        let once = genome.clone();
        before_sequences(&mut genome, &mut stats);
        finish_up(&mut genome, &mut stats, &options);
        assert_eq!(genome.genes, once.genes);
        assert_eq!(genome.chromosomes(), once.chromosomes());
    }
}
