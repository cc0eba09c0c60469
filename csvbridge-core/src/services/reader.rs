//! CSV reader construction
//!
//! Every import reads from memory: either content handed in directly or
//! content fetched from [`StorageService`].

use std::io::Cursor;

use csv::{Reader, ReaderBuilder, Trim};

use crate::config::{Delimiter, ImportProfile};
use crate::domain::result::Result;
use crate::services::storage::{decode_content, StorageService};

/// Reader over in-memory CSV text
pub type CsvReader = Reader<Cursor<Vec<u8>>>;

/// Parsing options taken from an import profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: Delimiter,
    pub has_headers: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Comma,
            has_headers: true,
        }
    }
}

impl From<&ImportProfile> for CsvOptions {
    fn from(profile: &ImportProfile) -> Self {
        Self {
            delimiter: profile.delimiter,
            has_headers: profile.has_headers,
        }
    }
}

/// Get a CSV reader over a string
pub fn reader_from_content(content: &str, options: CsvOptions) -> CsvReader {
    build(content.as_bytes().to_vec(), options)
}

/// Get a CSV reader over raw bytes
///
/// Bytes go through the same decoding as stored uploads, so a BOM is
/// removed and `convert` controls what happens to non UTF-8 input.
pub fn reader_from_bytes(bytes: &[u8], convert: bool, options: CsvOptions) -> Result<CsvReader> {
    let content = decode_content(bytes, convert)?;
    Ok(build(content.into_bytes(), options))
}

/// Get a CSV reader filled with previously stored upload content
pub fn reader_from_storage(
    storage: &StorageService,
    name: &str,
    convert: bool,
    options: CsvOptions,
) -> Result<CsvReader> {
    let content = storage.get_content(name, convert)?;
    Ok(build(content.into_bytes(), options))
}

fn build(bytes: Vec<u8>, options: CsvOptions) -> CsvReader {
    ReaderBuilder::new()
        .delimiter(options.delimiter.as_byte())
        .has_headers(options.has_headers)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(Cursor::new(bytes))
}
