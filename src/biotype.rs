//! Bio-type strings and the coding-status rules derived from them.

/// Sources and bio-types that denote protein-coding genes.
const PROTEIN_CODING: [&str; 9] = [
    "protein_coding",
    "IG_C_gene",
    "IG_D_gene",
    "IG_J_gene",
    "IG_V_gene",
    "TR_C_gene",
    "TR_D_gene",
    "TR_J_gene",
    "TR_V_gene",
];

/// Bio-type assigned to placeholder genes and transcripts when the input declares none.
pub const PLACEHOLDER: &str = "mRNA";

pub const PROTEIN_CODING_BIOTYPE: &str = "protein_coding";
pub const PSEUDOGENE_BIOTYPE: &str = "pseudogene";

/// Returns true if a bio-type (or GTF source column) denotes a protein-coding feature.
#[must_use]
pub fn is_protein_coding(biotype: &str) -> bool {
    PROTEIN_CODING.contains(&biotype)
}

/// Returns true if the string is one of the bio-types this crate knows how to classify.
#[must_use]
pub fn is_known(biotype: &str) -> bool {
    is_protein_coding(biotype)
        || matches!(
            biotype,
            "pseudogene"
                | "processed_pseudogene"
                | "unprocessed_pseudogene"
                | "lincRNA"
                | "lncRNA"
                | "miRNA"
                | "misc_RNA"
                | "rRNA"
                | "snRNA"
                | "snoRNA"
                | "retained_intron"
                | "processed_transcript"
                | "nonsense_mediated_decay"
                | "antisense"
                | "sense_intronic"
                | "Mt_rRNA"
                | "Mt_tRNA"
        )
}

/// Bio-type implied by a RefSeq accession prefix (NM_, NR_, ...).
#[must_use]
pub fn from_refseq_accession(id: &str) -> Option<&'static str> {
    let prefix = id.get(..2)?;
    match prefix {
        "NM" | "NP" | "XM" | "XP" | "YP" | "ZP" => Some(PROTEIN_CODING_BIOTYPE),
        "AC" | "AP" | "NC" | "NG" | "NR" | "NT" | "NW" | "NZ" | "XR" | "NS" => {
            Some(PSEUDOGENE_BIOTYPE)
        }
        _ => None,
    }
}
