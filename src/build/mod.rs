// src/build/mod.rs

//! The build data model: source files, artifacts, dependency edges, and the
//! pluggable builder contract.

pub mod build_file;
pub mod builder;
pub mod builders;
pub mod config;
pub mod dependency;
pub mod source_file;

pub use build_file::BuildFile;
pub use builder::{BuildContext, Builder, BuilderSelector};
pub use builders::{CopyBuilder, EsmBuilder, default_selector};
pub use config::BuildConfig;
pub use dependency::{BuildDependency, SerializedBuildDependency, resolve_specifier};
pub use source_file::SourceFile;
