// src/build/build_file.rs

use crate::build::dependency::BuildDependency;
use crate::hash;
use crate::types::FileContent;

/// An artifact produced by one builder invocation.
///
/// `id` is the forward-slash path of the artifact inside its config subtree;
/// other files refer to it through [`BuildDependency::build_id`]. The hash is
/// memoized in an explicit `Option` since content never changes after
/// construction.
#[derive(Debug, Clone)]
pub struct BuildFile {
    pub id: String,
    pub content: FileContent,
    pub dependencies: Vec<BuildDependency>,
    hash: Option<String>,
}

impl BuildFile {
    pub fn new(id: impl Into<String>, content: FileContent) -> Self {
        Self {
            id: id.into(),
            content,
            dependencies: Vec::new(),
            hash: None,
        }
    }

    pub fn with_dependencies(
        id: impl Into<String>,
        content: FileContent,
        dependencies: Vec<BuildDependency>,
    ) -> Self {
        Self {
            id: id.into(),
            content,
            dependencies,
            hash: None,
        }
    }

    /// Content hash, computed on first use.
    pub fn hash(&mut self) -> &str {
        let content = &self.content;
        self.hash
            .get_or_insert_with(|| hash::hash_bytes(content.as_bytes()))
            .as_str()
    }
}
