//! The moduli database: a line oriented list of candidate groups.
//!
//! Each data line holds seven whitespace separated fields:
//!
//! ```text
//! timestamp type tests tries size generator modulus
//! 20240101000000 2 6 100 2047 2 FFFF...
//! ```
//!
//! `size` is the bit length minus one. Lines starting with `#` are comments.
//! [`ModuliReader`] turns a source into a lazy sequence of parsed records,
//! leaving the choice among them to [`select`].

pub mod select;

pub use select::{ModuliSelector, SelectedGroup, Selection, SelectionState};

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{ParseWarning, ParseWarningKind};
use crate::Error;

/// Where the server reads its moduli from by default.
pub const MODULI_FILE: &str = "/etc/ssh/moduli";

/// "Safe" prime; (p-1)/2 is also prime.
pub const SAFE_PRIME: u32 = 2;

/// Probabilistic Miller-Rabin primality tests.
pub const PRIM_TEST_REQUIRED: u32 = 0x04;

const FIELD_COUNT: usize = 7;

/// One parsed line of the moduli database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuliRecord {
    pub timestamp: String,
    pub record_type: u32,
    pub tests: u32,
    pub tries: u32,
    pub size_minus_one: u64,
    pub generator: String,
    pub modulus: String,
}

impl ModuliRecord {
    /// Parse one data line (not a comment).
    pub fn parse_line(line: &str) -> Result<ModuliRecord, ParseWarningKind> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != FIELD_COUNT {
            return Err(ParseWarningKind::FieldCount(fields.len()));
        }

        let number = |idx: usize, name: &'static str| {
            fields[idx]
                .parse::<u32>()
                .map_err(|_| ParseWarningKind::InvalidNumber(name))
        };

        let record_type = number(1, "type")?;
        let tests = number(2, "tests")?;
        let tries = number(3, "tries")?;
        let size_minus_one = fields[4]
            .parse::<u64>()
            .ok()
            .filter(|size| size.checked_add(1).is_some())
            .ok_or(ParseWarningKind::InvalidNumber("size"))?;

        let hex = |idx: usize, name: &'static str| {
            let s = fields[idx];
            if s.bytes().all(|b| b.is_ascii_hexdigit()) {
                Ok(s.to_string())
            } else {
                Err(ParseWarningKind::InvalidHex(name))
            }
        };

        Ok(ModuliRecord {
            timestamp: fields[0].to_string(),
            record_type,
            tests,
            tries,
            size_minus_one,
            generator: hex(5, "generator")?,
            modulus: hex(6, "modulus")?,
        })
    }

    /// Only tested safe primes are used.
    pub fn is_candidate(&self) -> bool {
        self.record_type == SAFE_PRIME && self.tests & PRIM_TEST_REQUIRED != 0
    }

    /// Bit length of the modulus.
    pub fn effective_size(&self) -> u64 {
        self.size_minus_one.saturating_add(1)
    }
}

/// Lazy sequence of records read from a moduli source.
///
/// Malformed lines come out as `Err(ParseWarning)` and the sequence carries
/// on with the next line. The sequence ends at end of input; a read error
/// also ends it, so an interrupted read behaves like a shorter file.
pub struct ModuliReader<R> {
    inner: R,
    line: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> ModuliReader<R> {
    pub fn new(inner: R) -> Self {
        ModuliReader {
            inner,
            line: 0,
            buf: Vec::new(),
            done: false,
        }
    }

    /// Number of lines consumed so far, comments included.
    pub fn lines_read(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for ModuliReader<R> {
    type Item = Result<ModuliRecord, ParseWarning>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.inner.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line += 1;

                    if self.buf.first() == Some(&b'#') {
                        continue;
                    }

                    let text = String::from_utf8_lossy(&self.buf);
                    if text.trim().is_empty() {
                        continue;
                    }

                    let line = self.line;
                    return Some(
                        ModuliRecord::parse_line(&text).map_err(|kind| ParseWarning { line, kind }),
                    );
                }
                Err(e) => {
                    warn!("Moduli read stopped at line {}: {}", self.line, e);
                    self.done = true;
                }
            }
        }
        None
    }
}

/// A moduli database the server can open for each selection.
#[derive(Debug, Clone)]
pub enum ModuliSource {
    /// A moduli file on disk.
    File(PathBuf),
    /// Database contents held in memory.
    Memory(Arc<str>),
}

impl ModuliSource {
    pub fn memory(contents: impl Into<Arc<str>>) -> Self {
        ModuliSource::Memory(contents.into())
    }

    /// Open the source for one pass.
    pub fn open(&self) -> Result<ModuliReader<Box<dyn BufRead + '_>>, Error> {
        let reader: Box<dyn BufRead + '_> = match self {
            ModuliSource::File(path) => {
                let file = File::open(path).map_err(|source| Error::SourceUnavailable {
                    path: path.clone(),
                    source,
                })?;
                Box::new(BufReader::new(file))
            }
            ModuliSource::Memory(contents) => Box::new(Cursor::new(contents.as_bytes())),
        };
        Ok(ModuliReader::new(reader))
    }
}

impl Default for ModuliSource {
    fn default() -> Self {
        ModuliSource::File(PathBuf::from(MODULI_FILE))
    }
}
