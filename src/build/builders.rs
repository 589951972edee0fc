// src/build/builders.rs

//! The built-in builders: a byte-for-byte copy and an ES-module scanner.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::build::build_file::BuildFile;
use crate::build::builder::{BuildContext, Builder, BuilderSelector};
use crate::build::dependency::BuildDependency;
use crate::build::source_file::SourceFile;
use crate::config::model::SourceMap;
use crate::errors::Result;
use crate::types::FileContent;

/// Extensions routed to [`EsmBuilder`] by the default selector.
const ESM_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

static STATIC_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*(?:[^;'"]+?\s+from\s+)?["']([^"']+)["']"#).expect("hardcoded regex")
});
static EXPORT_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bexport\s+(?:[^;'"]+?\s+)?from\s+["']([^"']+)["']"#).expect("hardcoded regex")
});
static DYNAMIC_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*\(\s*["']([^"']+)["']\s*\)"#).expect("hardcoded regex")
});

/// Default routing: module code goes to the ES-module builder, everything
/// else is copied through unchanged.
pub fn default_selector() -> BuilderSelector {
    let esm: Arc<dyn Builder> = Arc::new(EsmBuilder);
    let copy: Arc<dyn Builder> = Arc::new(CopyBuilder);
    Arc::new(move |_config, source_id| {
        let ext = Path::new(source_id).extension().and_then(|e| e.to_str());
        match ext {
            Some(ext) if ESM_EXTENSIONS.contains(&ext) => Arc::clone(&esm),
            _ => Arc::clone(&copy),
        }
    })
}

/// Emits the source unchanged under the same id. No dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyBuilder;

impl Builder for CopyBuilder {
    fn name(&self) -> &str {
        "copy"
    }

    fn build<'a>(
        &'a self,
        source: &'a SourceFile,
        _ctx: &'a BuildContext<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BuildFile>>> + Send + 'a>> {
        Box::pin(async move {
            Ok(vec![BuildFile::new(
                source.id.clone(),
                source.content.clone(),
            )])
        })
    }
}

/// Scans ES module code for static imports, re-exports, and dynamic imports.
///
/// Specifiers hit by the source map are rewritten in the emitted code to a
/// relative path pointing at the mapped module; everything else passes
/// through untouched. Bare specifiers and unmapped URLs become external
/// dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct EsmBuilder;

impl Builder for EsmBuilder {
    fn name(&self) -> &str {
        "esm"
    }

    fn build<'a>(
        &'a self,
        source: &'a SourceFile,
        ctx: &'a BuildContext<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BuildFile>>> + Send + 'a>> {
        Box::pin(async move {
            let Some(text) = source.content.as_str() else {
                // Mis-extensioned binary: pass it through rather than fail.
                return Ok(vec![BuildFile::new(
                    source.id.clone(),
                    source.content.clone(),
                )]);
            };

            // start -> (end, specifier), ordered and deduplicated by span.
            let mut spans: BTreeMap<usize, (usize, String)> = BTreeMap::new();
            for re in [&*STATIC_IMPORT_RE, &*EXPORT_FROM_RE, &*DYNAMIC_IMPORT_RE] {
                for caps in re.captures_iter(text) {
                    if let Some(m) = caps.get(1) {
                        spans
                            .entry(m.start())
                            .or_insert((m.end(), m.as_str().to_string()));
                    }
                }
            }

            let mut dependencies = Vec::new();
            let mut seen = BTreeSet::new();
            let mut rewritten = String::with_capacity(text.len());
            let mut cursor = 0usize;

            for (start, (end, specifier)) in &spans {
                let dep = classify(&source.id, specifier, ctx.source_map);
                if !dep.external && dep.mapped_specifier != dep.specifier {
                    rewritten.push_str(&text[cursor..*start]);
                    rewritten.push_str(&relative_specifier(&source.id, &dep.build_id));
                    cursor = *end;
                }
                if seen.insert(dep.build_id.clone()) {
                    dependencies.push(dep);
                }
            }

            let content = if cursor > 0 {
                rewritten.push_str(&text[cursor..]);
                FileContent::Text(rewritten)
            } else {
                source.content.clone()
            };

            Ok(vec![BuildFile::with_dependencies(
                source.id.clone(),
                content,
                dependencies,
            )])
        })
    }
}

fn classify(owner_id: &str, specifier: &str, source_map: &SourceMap) -> BuildDependency {
    if let Some(mapped) = source_map.apply(specifier) {
        return BuildDependency::mapped(owner_id, specifier, mapped);
    }
    if specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') {
        return BuildDependency::internal(owner_id, specifier);
    }
    BuildDependency::external(specifier)
}

/// Relative ESM specifier from `from_id`'s directory to `to_id`.
fn relative_specifier(from_id: &str, to_id: &str) -> String {
    let from_dir: Vec<&str> = match from_id.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let to_parts: Vec<&str> = to_id.split('/').collect();
    let common = from_dir
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == *b)
        .count();

    let mut out = String::new();
    let ups = from_dir.len() - common;
    if ups == 0 {
        out.push_str("./");
    } else {
        for _ in 0..ups {
            out.push_str("../");
        }
    }
    out.push_str(&to_parts[common..].join("/"));
    out
}
