// src/build/source_file.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::hash;
use crate::types::{Encoding, FileContent};

/// A file under one of the watched source directories.
///
/// `id` is the forward-slash path relative to its source dir and is the key
/// everything else hangs off: graph nodes, meta records, and build outputs.
/// The content hash is computed eagerly at construction so change detection
/// never re-reads disk.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: String,
    pub path: PathBuf,
    pub content: FileContent,
    pub content_hash: String,
}

impl SourceFile {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, content: FileContent) -> Self {
        let content_hash = hash::hash_bytes(content.as_bytes());
        Self {
            id: id.into(),
            path: path.into(),
            content,
            content_hash,
        }
    }

    /// Reads `path` and builds a source file, decoding text for extensions
    /// known to be UTF-8 and keeping raw bytes otherwise.
    pub fn load(fs: &Arc<dyn FileSystem>, id: impl Into<String>, path: &Path) -> Result<Self> {
        let bytes = fs.read_file(path)?;
        let content = FileContent::from_bytes(bytes, Encoding::for_path(path));
        Ok(Self::new(id, path, content))
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.id).extension().and_then(|e| e.to_str())
    }
}
