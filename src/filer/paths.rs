// src/filer/paths.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::model::{FilerSettings, Target};
use crate::fs::FileSystem;

/// Where artifacts land: `<build_dir>/<target>/<config>/<build_id>`.
///
/// Cheap to clone, so build jobs carry their own copy instead of sharing the
/// Filer's memoizing resolver.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    build_dir: PathBuf,
    target: Target,
}

impl OutputLayout {
    pub fn new(build_dir: PathBuf, target: Target) -> Self {
        Self { build_dir, target }
    }

    pub fn config_root(&self, config: &str) -> PathBuf {
        self.build_dir.join(self.target.as_str()).join(config)
    }

    pub fn output_path(&self, config: &str, build_id: &str) -> PathBuf {
        let mut path = self.config_root(config);
        for segment in build_id.split('/') {
            path.push(segment);
        }
        path
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.build_dir.join("meta")
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }
}

/// Maps watched paths to source ids and source ids back to disk paths.
///
/// Owned by the Filer; the output-path memo lives here rather than in any
/// global cache so two Filers in one process never share state.
#[derive(Debug)]
pub struct PathResolver {
    fs: Arc<dyn FileSystem>,
    /// (as configured, canonicalized); watcher backends report either form.
    source_dirs: Vec<(PathBuf, PathBuf)>,
    layout: OutputLayout,
    output_memo: HashMap<(String, String), PathBuf>,
}

impl PathResolver {
    pub fn new(fs: Arc<dyn FileSystem>, settings: &FilerSettings) -> Self {
        let source_dirs = settings
            .source_dirs
            .iter()
            .map(|dir| {
                let canonical = fs.canonicalize(dir).unwrap_or_else(|_| dir.clone());
                (dir.clone(), canonical)
            })
            .collect();
        Self {
            fs,
            source_dirs,
            layout: OutputLayout::new(settings.build_dir.clone(), settings.target),
            output_memo: HashMap::new(),
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn source_dirs(&self) -> Vec<PathBuf> {
        self.source_dirs.iter().map(|(dir, _)| dir.clone()).collect()
    }

    /// Turns a watched path into a forward-slash source id, or `None` when
    /// the path is under none of the source dirs.
    pub fn source_id(&self, path: &Path) -> Option<String> {
        for (configured, canonical) in &self.source_dirs {
            let rel = path
                .strip_prefix(configured)
                .or_else(|_| path.strip_prefix(canonical));
            if let Ok(rel) = rel {
                let id = rel.to_string_lossy().replace('\\', "/");
                if !id.is_empty() {
                    return Some(id);
                }
            }
        }
        None
    }

    /// On-disk path for a source id: the first source dir that has the file.
    pub fn source_path(&self, id: &str) -> Option<PathBuf> {
        find_source_path(&self.fs, &self.source_dirs(), id)
    }

    /// Memoized artifact path for `(config, build_id)`.
    pub fn output_path(&mut self, config: &str, build_id: &str) -> PathBuf {
        let key = (config.to_string(), build_id.to_string());
        self.output_memo
            .entry(key)
            .or_insert_with(|| self.layout.output_path(config, build_id))
            .clone()
    }
}

/// Resolves `id` against `dirs` in order, returning the first existing file.
pub fn find_source_path(fs: &Arc<dyn FileSystem>, dirs: &[PathBuf], id: &str) -> Option<PathBuf> {
    for dir in dirs {
        let mut path = dir.clone();
        for segment in id.split('/') {
            path.push(segment);
        }
        if fs.exists(&path) {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::SourceMap;
    use crate::fs::mock::MockFileSystem;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn settings() -> FilerSettings {
        FilerSettings {
            source_dirs: vec![PathBuf::from("/proj/src"), PathBuf::from("/proj/vendor")],
            build_dir: PathBuf::from("/proj/build"),
            debounce: Duration::from_millis(10),
            target: Target::Dev,
            watch: true,
            source_map: SourceMap::new(BTreeMap::new()),
            max_parallel: 4,
        }
    }

    fn resolver() -> (PathResolver, Arc<MockFileSystem>) {
        let mock = Arc::new(MockFileSystem::new());
        let fs: Arc<dyn FileSystem> = Arc::clone(&mock) as Arc<dyn FileSystem>;
        (PathResolver::new(fs, &settings()), mock)
    }

    #[test]
    fn paths_map_to_ids_and_back() {
        let (resolver, mock) = resolver();
        mock.add_file("/proj/src/deep/a.ts", "x");

        assert_eq!(
            resolver.source_id(Path::new("/proj/src/deep/a.ts")).as_deref(),
            Some("deep/a.ts")
        );
        assert_eq!(
            resolver.source_path("deep/a.ts"),
            Some(PathBuf::from("/proj/src/deep/a.ts"))
        );
        assert_eq!(resolver.source_id(Path::new("/elsewhere/b.ts")), None);
    }

    #[test]
    fn first_matching_dir_wins_for_ids() {
        let (resolver, mock) = resolver();
        mock.add_file("/proj/vendor/lib.js", "x");
        assert_eq!(
            resolver.source_id(Path::new("/proj/vendor/lib.js")).as_deref(),
            Some("lib.js")
        );
        assert_eq!(
            resolver.source_path("lib.js"),
            Some(PathBuf::from("/proj/vendor/lib.js"))
        );
    }

    #[test]
    fn output_layout_places_artifacts_under_target_and_config() {
        let layout = OutputLayout::new(PathBuf::from("/proj/build"), Target::Prod);
        assert_eq!(
            layout.output_path("browser", "deep/a.ts"),
            PathBuf::from("/proj/build/prod/browser/deep/a.ts")
        );
        assert_eq!(layout.meta_dir(), PathBuf::from("/proj/build/meta"));
    }

    #[test]
    fn output_paths_are_memoized() {
        let (mut resolver, _) = resolver();
        let first = resolver.output_path("browser", "a.ts");
        let second = resolver.output_path("browser", "a.ts");
        assert_eq!(first, second);
        assert_eq!(first, PathBuf::from("/proj/build/dev/browser/a.ts"));
    }
}
