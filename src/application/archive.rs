//! In-memory packaging of HTML documents into single-entry zip archives.

use std::io::{Cursor, Write};

use thiserror::Error;
use zip::{
    CompressionMethod, DateTime, ZipWriter,
    result::{ZipError, ZipResult},
    write::SimpleFileOptions,
};

/// Name of the only entry stored in every archive.
pub const ARCHIVE_ENTRY_NAME: &str = "index.html";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("failed to write archive: {0}")]
    Write(#[from] ZipError),
}

/// A fully buffered zip archive holding a single `index.html` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    bytes: Vec<u8>,
}

impl Archive {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Builds deflate-compressed archives from HTML text.
///
/// Entry timestamps are pinned to the zip epoch (1980-01-01) so the same
/// document always produces the same bytes.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveBuilder {
    compression: CompressionMethod,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
        }
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Package `html` verbatim as the `index.html` entry of a new archive.
    pub fn build(&self, html: &str) -> Result<Archive, ArchiveError> {
        let bytes = self.write_entry(html.as_bytes())?;
        Ok(Archive { bytes })
    }

    fn write_entry(&self, content: &[u8]) -> ZipResult<Vec<u8>> {
        let options = SimpleFileOptions::default()
            .compression_method(self.compression)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(ARCHIVE_ENTRY_NAME, options)?;
        writer.write_all(content)?;
        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Decode raw document bytes, rejecting anything that is not UTF-8.
pub fn decode_html(bytes: Vec<u8>) -> Result<String, ArchiveError> {
    Ok(String::from_utf8(bytes)?)
}
