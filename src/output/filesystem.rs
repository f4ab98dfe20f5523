//! Filesystem document sink
//!
//! Each document lands in `<output-dir>/<file name>.txt`. Writes go to a
//! `.txt.part` sibling first and are renamed into place, so a crashed or
//! cancelled harvest never leaves a truncated `.txt` behind.

use crate::output::traits::{DocumentSink, SinkError, SinkResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const EXTENSION: &str = "txt";
const PARTIAL_EXTENSION: &str = "txt.part";

/// Longest stem in bytes; leaves room for `.txt.part` under a 255-byte name limit
pub const MAX_STEM_BYTES: usize = 240;
const HASH_SUFFIX_CHARS: usize = 16;

/// Writes one UTF-8 text file per document
#[derive(Debug, Clone)]
pub struct FsSink {
    dir: PathBuf,
}

impl FsSink {
    /// Opens a sink rooted at `dir`, creating the directory if needed
    pub async fn create(dir: impl Into<PathBuf>) -> SinkResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| SinkError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path of the document for `identifier`
    pub fn path_for(&self, identifier: &str) -> SinkResult<PathBuf> {
        let name = document_file_name(identifier)?;
        Ok(self.dir.join(format!("{}.{}", name, EXTENSION)))
    }
}

/// Maps an identifier onto a file stem, one stem per identifier
///
/// `%`, path separators and NUL are percent-encoded, so distinct identifiers
/// never share a file. Stems longer than [`MAX_STEM_BYTES`] are cut on a char
/// boundary and suffixed with a SHA-256 prefix of the full identifier. Identifiers
/// that would name the directory itself or its parent are rejected.
pub fn document_file_name(identifier: &str) -> SinkResult<String> {
    if identifier.is_empty() || identifier == "." || identifier == ".." {
        return Err(SinkError::InvalidIdentifier(identifier.to_string()));
    }

    let mut name = String::with_capacity(identifier.len());
    for c in identifier.chars() {
        match c {
            '%' => name.push_str("%25"),
            '/' => name.push_str("%2F"),
            '\\' => name.push_str("%5C"),
            '\0' => name.push_str("%00"),
            c => name.push(c),
        }
    }

    if name.len() <= MAX_STEM_BYTES {
        return Ok(name);
    }

    let digest = hex::encode(Sha256::digest(identifier.as_bytes()));
    let keep = MAX_STEM_BYTES - HASH_SUFFIX_CHARS - 1;
    let mut cut = keep;
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    name.truncate(cut);
    name.push('~');
    name.push_str(&digest[..HASH_SUFFIX_CHARS]);
    Ok(name)
}

impl DocumentSink for FsSink {
    async fn write(&self, identifier: &str, text: &str) -> SinkResult<()> {
        let name = document_file_name(identifier)?;
        let partial = self.dir.join(format!("{}.{}", name, PARTIAL_EXTENSION));
        let target = self.dir.join(format!("{}.{}", name, EXTENSION));

        tokio::fs::write(&partial, text.as_bytes())
            .await
            .map_err(|source| SinkError::Io {
                path: partial.clone(),
                source,
            })?;

        if let Err(source) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(SinkError::Io {
                path: target,
                source,
            });
        }

        tracing::trace!(path = %target.display(), bytes = text.len(), "document written");
        Ok(())
    }

    async fn contains(&self, identifier: &str) -> bool {
        match self.path_for(identifier) {
            Ok(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}
