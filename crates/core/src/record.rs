use crate::error::FileReadFailure;
use crate::models::Record;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct BuiltRecord {
    pub record: Record,
    /// Set when the file could not be read and `record.content` holds the
    /// placeholder text instead.
    pub read_failure: Option<FileReadFailure>,
}

/// Turns file paths into records carrying a fixed tag.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    tag: String,
    limit_bytes: Option<u64>,
}

impl RecordBuilder {
    pub fn new(tag: impl Into<String>, limit_bytes: Option<u64>) -> Self {
        Self {
            tag: tag.into(),
            // zero means no cap
            limit_bytes: limit_bytes.filter(|limit| *limit > 0),
        }
    }

    pub fn build(&self, path: &Path) -> BuiltRecord {
        let (content, read_failure) = match self.read_text(path) {
            Ok(text) => (text, None),
            Err(failure) => {
                warn!(path = %path.display(), error = %failure.source, "unable to read file");
                (placeholder(&failure), Some(failure))
            }
        };

        BuiltRecord {
            record: Record {
                title: title_of(path),
                source_path: resolve(path).to_string_lossy().into_owned(),
                content,
                tag: self.tag.clone(),
                deleted_at: None,
            },
            read_failure,
        }
    }

    pub fn read_text(&self, path: &Path) -> Result<String, FileReadFailure> {
        let bytes = read_bytes(path, self.limit_bytes).map_err(|source| FileReadFailure {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(decode_lossy(&bytes))
    }
}

fn read_bytes(path: &Path, limit: Option<u64>) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut bytes = Vec::new();
    match limit {
        Some(limit) => file.take(limit).read_to_end(&mut bytes)?,
        None => (&file).read_to_end(&mut bytes)?,
    };
    Ok(bytes)
}

/// UTF-8 decode that drops invalid sequences instead of substituting U+FFFD.
/// A multi-byte character cut off by a byte cap is dropped as well.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

pub fn placeholder(failure: &FileReadFailure) -> String {
    format!("[error reading file: {}]", failure.source)
}

fn title_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn resolve(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
