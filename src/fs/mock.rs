// src/fs/mock.rs

use super::{FileStats, FileSystem};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
}

/// In-memory [`FileSystem`] for tests.
///
/// Parent directories are created implicitly; paths are taken verbatim, so
/// tests should stick to one absolute-path style throughout.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("/"), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.files.lock().unwrap();
        files.insert(path.clone(), MockEntry::File(content.into()));

        if let Some(parent) = path.parent() {
            self.ensure_dir_entry(&mut files, parent);
            if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if !children.contains(&name.to_string()) {
                        children.push(name.to_string());
                    }
                }
            }
        }
    }

    /// Remove a single entry without touching children (test helper).
    pub fn delete_entry(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.files.lock().unwrap();
        files.remove(&path);
        if let Some(parent) = path.parent() {
            if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    children.retain(|c| c != name);
                }
            }
        }
    }

    fn ensure_dir_entry(&self, files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if !files.contains_key(path) {
            files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
            if let Some(parent) = path.parent() {
                if parent != path {
                    // Avoid infinite loop at root
                    self.ensure_dir_entry(files, parent);
                    if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                            if !children.contains(&name.to_string()) {
                                children.push(name.to_string());
                            }
                        }
                    }
                }
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn stat(&self, path: &Path) -> Result<FileStats> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::File(content)) => Ok(FileStats {
                len: content.len() as u64,
                is_dir: false,
            }),
            Some(MockEntry::Dir(_)) => Ok(FileStats {
                len: 0,
                is_dir: true,
            }),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let children: Vec<PathBuf> = {
            let files = self.files.lock().unwrap();
            match files.get(path) {
                Some(MockEntry::Dir(children)) => {
                    children.iter().map(|name| path.join(name)).collect()
                }
                Some(MockEntry::File(_)) => Vec::new(),
                None => return Ok(()), // removing a missing path is fine
            }
        };
        for child in children {
            self.remove(&child)?;
        }
        self.delete_entry(path);
        Ok(())
    }

    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        let content = self.read_file(from)?;
        self.delete_entry(from);
        self.add_file(to, content);
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let content = self.read_file(from)?;
        self.add_file(to, content);
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn empty_dir(&self, path: &Path) -> Result<()> {
        if self.exists(path) {
            for entry in self.read_dir(path)? {
                self.remove(&entry)?;
            }
            Ok(())
        } else {
            self.ensure_dir(path)
        }
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        self.ensure_dir_entry(&mut files, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trip() {
        let fs = MockFileSystem::new();
        fs.write_file(Path::new("/a/b/c.txt"), b"hello").unwrap();
        assert_eq!(fs.read_file(Path::new("/a/b/c.txt")).unwrap(), b"hello");
        assert!(fs.exists(Path::new("/a/b")));
    }

    #[test]
    fn remove_missing_is_ok() {
        let fs = MockFileSystem::new();
        assert!(fs.remove(Path::new("/no/such/file")).is_ok());
    }

    #[test]
    fn remove_dir_removes_children() {
        let fs = MockFileSystem::new();
        fs.add_file("/d/one.txt", "1");
        fs.add_file("/d/sub/two.txt", "2");
        fs.remove(Path::new("/d")).unwrap();
        assert!(!fs.exists(Path::new("/d/one.txt")));
        assert!(!fs.exists(Path::new("/d/sub/two.txt")));
        assert!(!fs.exists(Path::new("/d")));
    }

    #[test]
    fn empty_dir_keeps_the_dir_itself() {
        let fs = MockFileSystem::new();
        fs.add_file("/out/a.txt", "a");
        fs.empty_dir(Path::new("/out")).unwrap();
        assert!(fs.exists(Path::new("/out")));
        assert!(!fs.exists(Path::new("/out/a.txt")));
    }
}
