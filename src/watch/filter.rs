// src/watch/filter.rs

use globset::{Glob, GlobSet, GlobSetBuilder};

/// Include/exclude glob matching over forward-slash relative paths.
///
/// An empty include list matches everything; excludes always win. Paths are
/// matched as strings, so callers normalize separators before calling
/// [`PathFilter::matches`].
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, globset::Error> {
        Ok(Self {
            include: build_globset(include)?,
            exclude: build_globset(exclude)?,
        })
    }

    /// A filter that matches every path.
    pub fn match_all() -> Self {
        Self {
            include: None,
            exclude: None,
        }
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        match &self.include {
            Some(include) => include.is_match(rel_path),
            None => true,
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>, globset::Error> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(Some(builder.build()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(include: &[&str], exclude: &[&str]) -> PathFilter {
        let include: Vec<String> = include.iter().map(|s| s.to_string()).collect();
        let exclude: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
        PathFilter::new(&include, &exclude).unwrap()
    }

    #[test]
    fn empty_include_matches_everything() {
        let f = filter(&[], &[]);
        assert!(f.matches("any/path.ts"));
        assert!(f.matches("deeply/nested/file.css"));
    }

    #[test]
    fn include_restricts_matches() {
        let f = filter(&["**/*.ts"], &[]);
        assert!(f.matches("src/mod.ts"));
        assert!(!f.matches("src/style.css"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let f = filter(&["**/*.ts"], &["**/*.test.ts"]);
        assert!(f.matches("src/mod.ts"));
        assert!(!f.matches("src/mod.test.ts"));
    }

    #[test]
    fn invalid_glob_is_an_error() {
        assert!(PathFilter::new(&["[".to_string()], &[]).is_err());
    }
}
