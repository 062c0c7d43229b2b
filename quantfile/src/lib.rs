//! Read protein-level quantification values exported for a single replicate
//!
//! # File format
//!
//! Files should be tab delimited, with 3 fields: protein name, spectral index
//! (SIn) and normalized spectral abundance factor (NSAF). Each protein appears
//! on it's own line in the file. A header line is optional, and lines
//! starting with `#` are ignored.
//!
//! ```text
//! $ cat control_1.tsv
//! protein	SIn	NSAF
//! sp|P02769|ALBU_BOVIN	0.00210	0.0421
//! sp|P00761|TRYP_PIG	0.00035	0.0133
//! ...
//! ```
//!
//! Protein names are reduced to their last `|`-separated field, so the
//! example above yields `ALBU_BOVIN` and `TRYP_PIG`. Entries that do not
//! carry a complete, non-negative pair of quantification values are
//! silently dropped - they were never quantified in this replicate.
//!
//! # Example
//!
//! ```rust,ignore
//! # use quantfile::QuantFile;
//! let rep = QuantFile::load("control_1.tsv")?;
//! let albumin = rep.get("ALBU_BOVIN");
//! ```

use memchr::{memchr_iter, Memchr};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, prelude::*};
use std::path::Path;
use std::str;

/// Generalized wrapper around [`Memchr`] iterator for splitting `&[u8]` slices
/// by a byte.
struct Pitchfork<'a> {
    pos: usize,
    haystack: &'a [u8],
    inner: Memchr<'a>,
}

impl<'a> Pitchfork<'a> {
    pub fn new(needle: u8, haystack: &'a [u8]) -> Self {
        Self {
            pos: 0,
            haystack,
            inner: memchr_iter(needle, haystack),
        }
    }
}

impl<'a> Iterator for Pitchfork<'a> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let end = match self.inner.next() {
            Some(e) => e,
            None => {
                if self.pos < self.haystack.len() {
                    self.haystack.len()
                } else {
                    return None;
                }
            }
        };
        let slice = &self.haystack[self.pos..end];
        self.pos = end + 1;
        Some(slice)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
/// Quantification values reported for one protein in one replicate
pub struct Quant {
    /// Normalized spectral index
    pub sin: f64,
    /// Normalized spectral abundance factor
    pub nsaf: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
/// Wraps a hashtable of protein name -> [`Quant`] for a single replicate
pub struct QuantFile {
    pub path: String,
    pub entries: HashMap<String, Quant>,
}

impl QuantFile {
    /// Load a tab-delimited replicate export
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<QuantFile> {
        let mut buffer = Vec::new();
        File::open(path.as_ref())?.read_to_end(&mut buffer)?;

        let mut file = QuantFile::parse(&buffer);
        file.path = path.as_ref().display().to_string();
        log::debug!("{}: {} quantified proteins", file.path, file.len());
        Ok(file)
    }

    /// Parse the contents of a replicate export. If a protein is listed
    /// more than once, the last entry wins.
    pub fn parse(buffer: &[u8]) -> QuantFile {
        let mut entries = HashMap::new();
        let mut dropped = 0;

        for line in Pitchfork::new(b'\n', buffer) {
            if line.is_empty() || line[0] == b'#' {
                continue;
            }
            match read_entry(line) {
                Some((name, quant)) => {
                    entries.insert(name, quant);
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            log::debug!("dropped {} lines without quantification data", dropped);
        }

        QuantFile {
            path: String::default(),
            entries,
        }
    }

    pub fn get<T: AsRef<str>>(&self, name: T) -> Option<&Quant> {
        self.entries.get(name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[inline]
fn read_entry(line: &[u8]) -> Option<(String, Quant)> {
    let mut fields = Pitchfork::new(b'\t', line);
    let name = str::from_utf8(fields.next()?).ok()?.trim();
    // `rsplit` always yields at least one item
    let name = name.rsplit('|').next()?;
    if name.is_empty() {
        return None;
    }

    let sin = read_value(fields.next()?)?;
    let nsaf = read_value(fields.next()?)?;
    Some((name.into(), Quant { sin, nsaf }))
}

#[inline]
fn read_value(field: &[u8]) -> Option<f64> {
    let x = str::from_utf8(field).ok()?.trim().parse::<f64>().ok()?;
    if x.is_finite() && x >= 0.0 {
        Some(x)
    } else {
        None
    }
}
