use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

use annoforge::builder::{BuildOptions, BuildReport, Builder};
use annoforge::error::Error;
use annoforge::fixup::{self, FixupOptions};
use annoforge::formats::gff3::Gff3Reader;
use annoforge::formats::gtf::GtfReader;
use annoforge::formats::random::{RandomParams, RandomReader};
use annoforge::formats::ucsc::KnownGeneReader;
use annoforge::model::Genome;
use annoforge::source::{FileSource, TextSource};
use annoforge::stats::BuildStats;
use annoforge::strand::Strand;

fn build_gff3(text: &str, options: BuildOptions) -> Result<BuildReport, Error> {
    Builder::new(Box::new(Gff3Reader::new()), options)
        .with_source(TextSource::new("test.gff3", text))
        .build()
}

fn no_sequences() -> BuildOptions {
    BuildOptions::new("test").without_sequences()
}

fn exon_spans(genome: &Genome, transcript: &str) -> Vec<(i64, i64)> {
    let tr = genome.transcript(transcript).unwrap();
    let mut spans: Vec<_> = tr.exons.iter().map(|e| (e.start, e.end)).collect();
    spans.sort_unstable();
    spans
}

#[test]
fn forward_parent_reference() {
    let text = "\
##gff-version 3
1\tsrc\texon\t101\t200\t.\t+\t.\tID=e1;Parent=T1
1\tsrc\tCDS\t121\t200\t.\t+\t0\tID=c1;Parent=T1
1\tsrc\texon\t1001\t1100\t.\t-\t.\tID=e2;Parent=T2
1\tsrc\tgene\t1\t2000\t.\t+\t.\tID=G1
1\tsrc\tmRNA\t101\t200\t.\t+\t.\tID=T1;Parent=G1
1\tsrc\tmRNA\t1001\t1100\t.\t-\t.\tID=T2;Parent=G1
";
    let report = build_gff3(text, no_sequences()).unwrap();
    let t1 = report.genome.transcript("T1").unwrap();
    assert_eq!(t1.exons.len(), 1);
    assert_eq!(t1.exons[0].id, "e1");
    assert!(t1.is_protein_coding());

    let t2 = report.genome.transcript("T2").unwrap();
    assert_eq!(t2.exons[0].id, "e2");
    assert!(!t2.is_protein_coding());
}

#[test]
fn zero_length_intron_collapses() {
    let text = "\
1\tsrc\tmRNA\t101\t251\t.\t+\t.\tID=T1
1\tsrc\texon\t101\t200\t.\t+\t.\tID=e1;Parent=T1
1\tsrc\texon\t201\t251\t.\t+\t.\tID=e2;Parent=T1
";
    let report = build_gff3(text, no_sequences()).unwrap();
    assert_eq!(exon_spans(&report.genome, "T1"), vec![(100, 250)]);
    assert_eq!(report.stats.exons_collapsed, 1);
}

#[test]
fn known_gene_slicing() {
    let text = "uc1\tchr1\t+\t10\t80\t20\t70\t2\t10,50,\t30,80,\tP1\tuc1\n";
    let report = Builder::new(Box::new(KnownGeneReader::new()), no_sequences())
        .with_source(TextSource::new("kg.txt", text))
        .build()
        .unwrap();
    assert_eq!(exon_spans(&report.genome, "uc1"), vec![(10, 29), (50, 79)]);
    let tr = report.genome.transcript("uc1").unwrap();
    let mut cds: Vec<_> = tr.cds.iter().map(|c| (c.start, c.end)).collect();
    cds.sort_unstable();
    assert_eq!(cds, vec![(20, 29), (50, 69)]);
}

fn write_fasta(dir: &TempDir, name: &str, text: &str, gzip: bool) -> PathBuf {
    let path = dir.path().join(name);
    let file = File::create(&path).unwrap();
    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap();
    } else {
        let mut file = file;
        file.write_all(text.as_bytes()).unwrap();
    }
    path
}

const MINUS_EXON: &str = "1\tsrc\tmRNA\t3\t6\t.\t-\t.\tID=T1\n1\tsrc\texon\t3\t6\t.\t-\t.\tID=e1;Parent=T1\n";

#[test]
fn minus_strand_sequence_is_reverse_complemented() {
    let dir = TempDir::new().unwrap();
    let fasta = write_fasta(&dir, "ref.fa", ">1 test chromosome\nAAAACC\nTT\n", false);
    let mut options = BuildOptions::new("test");
    options.fasta_candidates = vec![fasta];

    let report = build_gff3(MINUS_EXON, options).unwrap();
    let tr = report.genome.transcript("T1").unwrap();
    assert_eq!(tr.strand, Strand::Reverse);
    assert_eq!(tr.exons[0].sequence.as_deref(), Some(&b"GGTT"[..]));
    assert_eq!(report.stats.sequences_added, 1);
    assert_eq!(report.genome.chromosome("1").unwrap().length, 8);
}

#[test]
fn gzip_fasta_candidate_fallback() {
    let dir = TempDir::new().unwrap();
    write_fasta(&dir, "ref.fa.gz", ">1\nAAAACCTT\n", true);
    let mut options = BuildOptions::new("test");
    options.fasta_candidates = vec![dir.path().join("missing.fa"), dir.path().join("ref.fa")];

    let report = build_gff3(MINUS_EXON, options).unwrap();
    let tr = report.genome.transcript("T1").unwrap();
    assert_eq!(tr.exons[0].sequence.as_deref(), Some(&b"GGTT"[..]));
}

#[test]
fn missing_fasta_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut options = BuildOptions::new("test");
    options.fasta_candidates = vec![dir.path().join("nope.fa")];
    let err = build_gff3(MINUS_EXON, options).unwrap_err();
    assert!(matches!(err, Error::MissingInput(_)));
    assert!(err.to_string().contains("nope.fa.gz"));
}

#[test]
fn gtf_stop_codon_extends_cds() {
    let text = "\
1\tsrc\texon\t401\t600\t.\t+\t.\tgene_id \"G2\"; transcript_id \"T2\"; exon_id \"E1\";
1\tsrc\tCDS\t451\t500\t.\t+\t0\tgene_id \"G2\"; transcript_id \"T2\";
1\tsrc\tstop_codon\t501\t503\t.\t+\t0\tgene_id \"G2\"; transcript_id \"T2\";
";
    let report = Builder::new(Box::new(GtfReader::new()), no_sequences())
        .with_source(TextSource::new("test.gtf", text))
        .build()
        .unwrap();
    let tr = report.genome.transcript("T2").unwrap();
    assert!(tr.cds.iter().any(|c| (c.start, c.end) == (500, 502)));
    assert_eq!(exon_spans(&report.genome, "T2"), vec![(400, 599)]);
}

#[test]
fn fatal_error_names_reader_file_and_line() {
    let text = "\
1\tsrc\tgene\t1\t300\t.\t+\t.\tID=G1
1\tsrc\tmRNA\t1\t300\t.\t+\t.\tID=T1;Parent=G1
1\tsrc\tmRNA\t1\t300\t.\t+\t.\tID=T1;Parent=G1
";
    let err = build_gff3(text, no_sequences()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("GFF3"));
    assert!(message.contains("test.gff3:3"));
    assert!(message.contains("ID=T1;Parent=G1"));
    assert!(matches!(err.root(), Error::DuplicateId { kind: "transcript", .. }));
}

#[test]
fn gz_annotation_input() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("genes.gff3.gz");
    let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    encoder.write_all(MINUS_EXON.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let source = FileSource::open(&dir.path().join("genes.gff3")).unwrap();
    let report = Builder::new(Box::new(Gff3Reader::new()), no_sequences())
        .with_source(source)
        .build()
        .unwrap();
    assert!(report.genome.transcript("T1").is_some());
}

fn random_genome(seed: u64) -> BuildReport {
    let params = RandomParams {
        max_gene_len: 5_000,
        max_transcripts: 8,
        max_exons: 12,
        add_utrs: true,
    };
    Builder::new(Box::new(RandomReader::new(params, seed)), BuildOptions::new("rand"))
        .build()
        .unwrap()
}

#[test]
fn genes_contain_their_transcripts() {
    for seed in 0..5 {
        let report = random_genome(seed);
        for gene in &report.genome.genes {
            let start = gene.transcripts.iter().map(|t| t.start).min().unwrap();
            let end = gene.transcripts.iter().map(|t| t.end).max().unwrap();
            assert_eq!((gene.start, gene.end), (start, end));
            for tr in &gene.transcripts {
                let first = tr.exons.iter().map(|e| e.start).min().unwrap();
                let last = tr.exons.iter().map(|e| e.end).max().unwrap();
                assert_eq!((tr.start, tr.end), (first, last));

                let mut ranks: Vec<_> = tr.exons.iter().map(|e| e.rank).collect();
                ranks.sort_unstable();
                assert_eq!(ranks, (1..=tr.exons.len() as u32).collect::<Vec<_>>());
                for utr in &tr.utrs {
                    let exon = tr.exon(&utr.exon_id).unwrap();
                    assert!(exon.start <= utr.start && utr.end <= exon.end);
                }
            }
        }
    }
}

#[test]
fn fixups_are_idempotent() {
    let mut report = random_genome(3);
    let before = report.genome.genes.clone();
    let mut stats = BuildStats::default();
    fixup::before_sequences(&mut report.genome, &mut stats);
    fixup::finish_up(&mut report.genome, &mut stats, &FixupOptions::default());
    assert_eq!(report.genome.genes, before);
    assert_eq!(stats.exons_collapsed, 0);
    assert_eq!(stats.utrs_inferred, 0);
}

const CODING_LOCI: &str = "\
##gff-version 3
1\tsrc\tgene\t1\t500\t.\t+\t.\tID=G1;biotype=protein_coding
1\tsrc\tmRNA\t1\t500\t.\t+\t.\tID=T1;Parent=G1
1\tsrc\texon\t1\t100\t.\t+\t.\tID=T1.e1;Parent=T1
1\tsrc\texon\t21\t60\t.\t+\t.\tID=T1.e1b;Parent=T1
1\tsrc\texon\t201\t300\t.\t+\t.\tID=T1.e2;Parent=T1
1\tsrc\texon\t401\t500\t.\t+\t.\tID=T1.e3;Parent=T1
1\tsrc\tfive_prime_UTR\t1\t50\t.\t+\t.\tID=T1.u5;Parent=T1
1\tsrc\tCDS\t51\t100\t.\t+\t2\tID=T1.c1;Parent=T1
1\tsrc\tCDS\t201\t300\t.\t+\t1\tID=T1.c2;Parent=T1
1\tsrc\tCDS\t401\t450\t.\t+\t0\tID=T1.c3;Parent=T1
1\tsrc\tthree_prime_UTR\t451\t500\t.\t+\t.\tID=T1.u3;Parent=T1
1\tsrc\tgene\t1001\t1200\t.\t-\t.\tID=G2;biotype=protein_coding
1\tsrc\tmRNA\t1001\t1200\t.\t-\t.\tID=T2;Parent=G2
1\tsrc\texon\t1101\t1200\t.\t-\t.\tID=T2.e1;Parent=T2
1\tsrc\tCDS\t1101\t1200\t.\t-\t1\tID=T2.c1;Parent=T2
1\tsrc\tCDS\t1001\t1050\t.\t-\t2\tID=T2.c2;Parent=T2
";

#[test]
fn fixups_are_idempotent_on_coding_loci() {
    let mut options = no_sequences();
    options.random_sequences = true;
    options.frame_correction = Some(true);
    let mut report = build_gff3(CODING_LOCI, options).unwrap();
    assert!(report.stats.exons_inferred > 0);
    assert!(report.stats.exons_removed > 0);
    assert_eq!(exon_spans(&report.genome, "T2").len(), 2);
    assert_eq!(exon_spans(&report.genome, "T1").len(), 3);
    let t1 = report.genome.transcript("T1").unwrap();
    assert!(t1.is_protein_coding());
    assert!(!t1.utrs.is_empty());

    let once = report.genome.genes.clone();
    let options = FixupOptions {
        frame_correction: true,
        min_nonzero_frames: 0.0,
        sequences_requested: false,
    };
    for _ in 0..2 {
        let mut stats = BuildStats::default();
        fixup::before_sequences(&mut report.genome, &mut stats);
        fixup::finish_up(&mut report.genome, &mut stats, &options);
        assert_eq!(report.genome.genes, once);
        assert_eq!(stats.exons_inferred, 0);
        assert_eq!(stats.exons_removed, 0);
        assert_eq!(stats.exons_collapsed, 0);
        assert_eq!(stats.utrs_inferred, 0);
        assert_eq!(stats.exons_frame_corrected, 0);
    }
}
