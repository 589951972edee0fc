// src/build/dependency.rs

use serde::{Deserialize, Serialize};

/// An edge discovered while building one file.
///
/// `specifier` is the import exactly as written; `mapped_specifier` is the
/// specifier after source-map rewriting (identical when no map entry applied);
/// `build_id` is the output id the edge points at. External dependencies are
/// graph leaves the Filer records but never builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDependency {
    pub specifier: String,
    pub mapped_specifier: String,
    pub build_id: String,
    pub external: bool,
}

impl BuildDependency {
    /// A project-internal edge with no mapping applied.
    pub fn internal(owner_id: &str, specifier: impl Into<String>) -> Self {
        let specifier = specifier.into();
        let build_id = resolve_specifier(owner_id, &specifier);
        Self {
            mapped_specifier: specifier.clone(),
            specifier,
            build_id,
            external: false,
        }
    }

    /// A project-internal edge whose specifier was rewritten by a source map.
    pub fn mapped(owner_id: &str, specifier: impl Into<String>, mapped: impl Into<String>) -> Self {
        let mapped = mapped.into();
        let build_id = resolve_specifier(owner_id, &mapped);
        Self {
            specifier: specifier.into(),
            mapped_specifier: mapped,
            build_id,
            external: false,
        }
    }

    /// A dependency outside the project. Never built; kept as a graph leaf.
    pub fn external(specifier: impl Into<String>) -> Self {
        let specifier = specifier.into();
        Self {
            mapped_specifier: specifier.clone(),
            build_id: specifier.clone(),
            specifier,
            external: true,
        }
    }

    /// Compact form for the meta record. Fields matching their derivable
    /// defaults are omitted; [`SerializedBuildDependency::restore`] is the
    /// exact inverse.
    pub fn to_serialized(&self, owner_id: &str) -> SerializedBuildDependency {
        let mapped_specifier = (self.mapped_specifier != self.specifier)
            .then(|| self.mapped_specifier.clone());
        let default_build_id = resolve_specifier(owner_id, &self.mapped_specifier);
        let build_id = (self.build_id != default_build_id).then(|| self.build_id.clone());
        SerializedBuildDependency {
            specifier: self.specifier.clone(),
            mapped_specifier,
            build_id,
            external: self.external,
        }
    }
}

/// The on-disk shape of a [`BuildDependency`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedBuildDependency {
    pub specifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_specifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub external: bool,
}

impl SerializedBuildDependency {
    /// Restores the full dependency, recomputing omitted fields from
    /// `owner_id` the same way they were derived at serialization time.
    pub fn restore(&self, owner_id: &str) -> BuildDependency {
        let mapped_specifier = self
            .mapped_specifier
            .clone()
            .unwrap_or_else(|| self.specifier.clone());
        let build_id = self
            .build_id
            .clone()
            .unwrap_or_else(|| resolve_specifier(owner_id, &mapped_specifier));
        BuildDependency {
            specifier: self.specifier.clone(),
            mapped_specifier,
            build_id,
            external: self.external,
        }
    }
}

fn is_false(v: &bool) -> bool {
    !v
}

/// Resolves a specifier against the importing file's id.
///
/// Relative specifiers (`./`, `../`) resolve against the owner's directory;
/// root-relative ones (`/lib/x.ts`) against the project root. Anything else
/// (bare names, URLs) passes through untouched. Excess `..` segments are
/// clamped at the project root.
pub fn resolve_specifier(owner_id: &str, specifier: &str) -> String {
    let relative = specifier.starts_with("./") || specifier.starts_with("../");
    if !relative && !specifier.starts_with('/') {
        return specifier.to_string();
    }

    let mut stack: Vec<&str> = if relative {
        match owner_id.rsplit_once('/') {
            Some((dir, _)) => dir.split('/').collect(),
            None => Vec::new(),
        }
    } else {
        Vec::new()
    };

    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}
