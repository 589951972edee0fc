// src/fs/mod.rs

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::watch::filter::PathFilter;

pub mod mock;

/// Minimal stat record for a path.
///
/// Deliberately carries no modification time: content hashes are the only
/// staleness signal the engine trusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    pub len: u64,
    pub is_dir: bool,
}

impl FileStats {
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }
}

/// Abstract filesystem interface.
///
/// The engine never calls OS APIs directly; everything goes through this
/// trait so tests can substitute [`mock::MockFileSystem`].
pub trait FileSystem: Send + Sync + Debug {
    fn stat(&self, path: &Path) -> Result<FileStats>;
    fn exists(&self, path: &Path) -> bool;
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Remove a file or directory tree. Removing a missing path is not an
    /// error (deletes race with watchers).
    fn remove(&self, path: &Path) -> Result<()>;
    fn move_file(&self, from: &Path, to: &Path) -> Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Return a list of entries in a directory. Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Delete everything inside `path`, creating it if missing.
    fn empty_dir(&self, path: &Path) -> Result<()>;
    fn ensure_dir(&self, path: &Path) -> Result<()>;

    /// Resolve symlinks and relative components. The default returns the path
    /// unchanged, which is what in-memory implementations want.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }

    /// Recursively collect files under `dir`.
    ///
    /// Directories are always traversed; `filter` applies to files only, and
    /// is matched against the path relative to `dir` with forward slashes.
    /// The sorted map gives callers a deterministic iteration order.
    fn find_files(
        &self,
        dir: &Path,
        filter: Option<&PathFilter>,
    ) -> Result<BTreeMap<PathBuf, FileStats>> {
        let mut found = BTreeMap::new();
        let mut stack = vec![dir.to_path_buf()];

        while let Some(current) = stack.pop() {
            for path in self.read_dir(&current)? {
                let stats = self.stat(&path)?;
                if stats.is_dir {
                    stack.push(path);
                    continue;
                }
                if let Some(filter) = filter {
                    let rel = match path.strip_prefix(dir) {
                        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                        Err(_) => continue,
                    };
                    if !filter.matches(&rel) {
                        continue;
                    }
                }
                found.insert(path, stats);
            }
        }

        Ok(found)
    }
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn stat(&self, path: &Path) -> Result<FileStats> {
        let meta = fs::metadata(path).with_context(|| format!("stat {:?}", path))?;
        Ok(FileStats {
            len: meta.len(),
            is_dir: meta.is_dir(),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file =
            fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents)
            .with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let result = match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err).with_context(|| format!("stat for remove {:?}", path)),
        };
        result.with_context(|| format!("removing {:?}", path))
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        fs::rename(from, to).with_context(|| format!("moving {:?} to {:?}", from, to))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        fs::copy(from, to).with_context(|| format!("copying {:?} to {:?}", from, to))?;
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }

    fn empty_dir(&self, path: &Path) -> Result<()> {
        if path.exists() {
            for entry in self.read_dir(path)? {
                self.remove(&entry)?;
            }
            Ok(())
        } else {
            self.ensure_dir(path)
        }
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("canonicalizing {:?}", path))
    }
}
