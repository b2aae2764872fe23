//! Streaming FASTA reader.

use std::io::{BufRead, Lines};

use crate::error::Error;

/// Yields `(name, sequence)` records one at a time so only one chromosome is resident.
///
/// Bases are uppercased. The name comes from [`sequence_name`].
pub struct FastaReader<I> {
    lines: I,
    pending_header: Option<String>,
}

impl<R: BufRead> FastaReader<Lines<R>> {
    pub fn from_reader(reader: R) -> Self {
        Self::new(reader.lines())
    }
}

impl<I> FastaReader<I>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    pub fn new(lines: I) -> Self {
        Self {
            lines,
            pending_header: None,
        }
    }

    fn next_record(&mut self) -> Result<Option<(String, Vec<u8>)>, Error> {
        // Find the header, skipping anything before the first '>'
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => loop {
                match self.lines.next() {
                    Some(line) => {
                        let line = line?;
                        if line.starts_with('>') {
                            break line;
                        }
                    }
                    None => return Ok(None),
                }
            },
        };

        let name = sequence_name(&header)?;
        let mut sequence = Vec::new();
        for line in self.lines.by_ref() {
            let line = line?;
            if line.starts_with('>') {
                self.pending_header = Some(line);
                break;
            }
            let start = sequence.len();
            sequence.extend_from_slice(line.trim().as_bytes());
            sequence[start..].make_ascii_uppercase();
        }
        Ok(Some((name, sequence)))
    }
}

impl<I> Iterator for FastaReader<I>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    type Item = Result<(String, Vec<u8>), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Reads every record from a buffered reader.
pub fn parse_fasta<R: BufRead>(reader: R) -> Result<Vec<(String, Vec<u8>)>, Error> {
    FastaReader::from_reader(reader).collect()
}

/// Extracts the sequence name from a FASTA header line.
///
/// Tries, in order:
/// 1. a `transcript:<id>` token anywhere in the header
/// 2. `>ref|<accession>|`
/// 3. the first whitespace-delimited token
pub fn sequence_name(header: &str) -> Result<String, Error> {
    let header = header.trim_start_matches('>').trim();

    if let Some(id) = header
        .split_whitespace()
        .find_map(|token| token.strip_prefix("transcript:"))
        .filter(|id| !id.is_empty())
    {
        return Ok(id.to_string());
    }

    if let Some(rest) = header.strip_prefix("ref|") {
        let acc = rest.split('|').next().unwrap_or("").trim();
        if !acc.is_empty() {
            return Ok(acc.to_string());
        }
    }

    let first_token = header.split_whitespace().next().unwrap_or("");
    if first_token.is_empty() {
        return Err(Error::Parse(format!("empty FASTA header: >{header}")));
    }
    Ok(first_token.to_string())
}
