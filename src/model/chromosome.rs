//! Chromosome representation and name normalization.

/// Prefixes stripped from chromosome names, longest first.
const NAME_PREFIXES: [&str; 3] = ["chromosome", "chromo", "chr"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chromosome {
    /// Normalized name (see [`simple_name`]).
    pub name: String,
    /// Length in bases. Values <= 1 mean no content was ever attached.
    pub length: i64,
}

impl Chromosome {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: simple_name(name),
            length: 0,
        }
    }

    /// True until a sequence or a gene gives the chromosome a real size.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length <= 1
    }
}

/// Strips a leading "chr"/"chromo"/"chromosome" (any case) plus a trailing separator.
#[must_use]
pub fn simple_name(name: &str) -> String {
    let name = name.trim();
    for prefix in NAME_PREFIXES {
        let Some(head) = name.get(..prefix.len()) else {
            continue;
        };
        if name.len() > prefix.len() && head.eq_ignore_ascii_case(prefix) {
            let rest = &name[prefix.len()..];
            let rest = rest.trim_start_matches([':', '_', '-']);
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }
    name.to_string()
}

/// Lookup key for case-insensitive chromosome matching.
#[must_use]
pub fn name_key(name: &str) -> String {
    simple_name(name).to_ascii_lowercase()
}
