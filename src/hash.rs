// src/hash.rs

//! Content hashing helpers.
//!
//! blake3 hex digests are used for source content hashes, build artifact
//! hashes, and meta record filenames.

use std::path::Path;
use std::sync::Arc;

use crate::errors::Result;
use crate::fs::FileSystem;

pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

pub fn hash_file(fs: &Arc<dyn FileSystem>, path: &Path) -> Result<String> {
    let bytes = fs.read_file(path)?;
    Ok(hash_bytes(&bytes))
}
