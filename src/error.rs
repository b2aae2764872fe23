//! Error types for the annoforge library.

use thiserror::Error;

/// Errors that can occur while building an annotation model.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A parse error occurred while reading input data.
    #[error("{0}")]
    Parse(String),

    /// A validation constraint was violated.
    #[error("{0}")]
    Validation(String),

    /// A file format error was detected.
    #[error("{0}")]
    Format(String),

    /// A gene or transcript id was registered twice in one build session.
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    /// A child feature resolved to a parent living on another chromosome.
    #[error(
        "chromosome mismatch: '{child}' is on '{child_chromosome}' but its parent '{parent}' is on '{parent_chromosome}'"
    )]
    ChromosomeMismatch {
        child: String,
        child_chromosome: String,
        parent: String,
        parent_chromosome: String,
    },

    /// None of the candidate input files exist.
    #[error("cannot find input file, tried: {0}")]
    MissingInput(String),

    /// A fatal error raised while a format reader processed one input line.
    #[error("{reader} reader failed at {file}:{line_num}: {source}\n\toffending line: '{line}'")]
    Line {
        reader: &'static str,
        file: String,
        line_num: usize,
        line: String,
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps an error with the reader, file and line that produced it.
    #[must_use]
    pub fn at_line(self, reader: &'static str, file: &str, line_num: usize, line: &str) -> Self {
        match self {
            // already carries its own position
            Self::Line { .. } => self,
            other => Self::Line {
                reader,
                file: file.to_string(),
                line_num,
                line: line.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, unwrapping any line context.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Line { source, .. } => source.root(),
            other => other,
        }
    }
}
