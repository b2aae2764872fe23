//! Re-readable line sources for multi-pass readers.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::error::Error;

pub type Lines<'a> = Box<dyn Iterator<Item = std::io::Result<String>> + 'a>;

/// Input that can be scanned from the beginning any number of times.
pub trait LineSource {
    /// Name reported in error messages (usually the file path).
    fn name(&self) -> &str;

    /// A fresh iterator over the lines, starting at the first one.
    fn lines(&self) -> Result<Lines<'_>, Error>;
}

/// A file on disk, optionally gzip-compressed.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
    gzip: bool,
}

impl FileSource {
    /// Opens `path`, falling back to `path.gz` when the plain file is missing.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let path = resolve(&[path.to_path_buf()])?;
        let gzip = is_gzip(&path);
        Ok(Self {
            name: path.display().to_string(),
            path,
            gzip,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the file for one streaming read.
    pub fn reader(&self) -> Result<Box<dyn BufRead>, Error> {
        let file = File::open(&self.path)?;
        if self.gzip {
            Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
        } else {
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

impl LineSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn lines(&self) -> Result<Lines<'_>, Error> {
        Ok(Box::new(self.reader()?.lines()))
    }
}

/// In-memory text, used by tests and benchmarks.
#[derive(Debug, Clone)]
pub struct TextSource {
    name: String,
    text: String,
}

impl TextSource {
    #[must_use]
    pub fn new(name: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            text: text.to_string(),
        }
    }
}

impl LineSource for TextSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn lines(&self) -> Result<Lines<'_>, Error> {
        Ok(Box::new(Cursor::new(self.text.as_bytes()).lines()))
    }
}

/// Returns the first existing candidate, trying `<candidate>.gz` after each plain path.
pub fn resolve(candidates: &[PathBuf]) -> Result<PathBuf, Error> {
    let mut tried = Vec::with_capacity(candidates.len() * 2);
    for candidate in candidates {
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
        tried.push(candidate.display().to_string());
        if !is_gzip(candidate) {
            let mut gz = candidate.clone().into_os_string();
            gz.push(".gz");
            let gz = PathBuf::from(gz);
            if gz.is_file() {
                return Ok(gz);
            }
            tried.push(gz.display().to_string());
        }
    }
    Err(Error::MissingInput(tried.join(", ")))
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}
