// src/types.rs

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target platform of a build config.
///
/// Each `[build.<name>]` section names the platform its artifacts are compiled
/// for. Builders receive it and may emit different output per platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Browser,
    Node,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Browser => "browser",
            Platform::Node => "node",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "browser" => Ok(Platform::Browser),
            "node" => Ok(Platform::Node),
            other => Err(format!(
                "invalid platform: {other} (expected \"browser\" or \"node\")"
            )),
        }
    }
}

/// How a file's bytes are interpreted.
///
/// Chosen from the file extension; everything outside the known text set is
/// treated as opaque binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Utf8,
    Binary,
}

/// Extensions read as UTF-8 text. Everything else is binary.
const UTF8_EXTENSIONS: &[&str] = &[
    "ts", "js", "mjs", "cjs", "tsx", "jsx", "json", "css", "html", "svg", "md", "txt",
];

impl Encoding {
    /// Decide the encoding for a file from its extension (without the dot).
    pub fn for_extension(ext: &str) -> Encoding {
        if UTF8_EXTENSIONS.contains(&ext) {
            Encoding::Utf8
        } else {
            Encoding::Binary
        }
    }

    pub fn for_path(path: &Path) -> Encoding {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => Encoding::for_extension(ext),
            None => Encoding::Binary,
        }
    }
}

/// File content in its declared encoding.
///
/// Source and build files carry their content in memory; text stays a
/// `String` so builders can transform it without re-decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl FileContent {
    /// Raw byte view of the content, used for hashing and writing.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(s) => s.as_bytes(),
            FileContent::Bytes(b) => b.as_slice(),
        }
    }

    /// Text view, if this is UTF-8 content.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FileContent::Text(s) => Some(s.as_str()),
            FileContent::Bytes(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Decode raw bytes according to `encoding`.
    ///
    /// Invalid UTF-8 in a nominally-text file falls back to binary rather
    /// than failing the read; the builder decides what to do with it.
    pub fn from_bytes(bytes: Vec<u8>, encoding: Encoding) -> FileContent {
        match encoding {
            Encoding::Utf8 => match String::from_utf8(bytes) {
                Ok(s) => FileContent::Text(s),
                Err(e) => FileContent::Bytes(e.into_bytes()),
            },
            Encoding::Binary => FileContent::Bytes(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_from_str_accepts_case_variants() {
        assert_eq!("browser".parse::<Platform>().unwrap(), Platform::Browser);
        assert_eq!(" Node ".parse::<Platform>().unwrap(), Platform::Node);
        assert!("wasm".parse::<Platform>().is_err());
    }

    #[test]
    fn encoding_for_extension() {
        assert_eq!(Encoding::for_extension("ts"), Encoding::Utf8);
        assert_eq!(Encoding::for_extension("json"), Encoding::Utf8);
        assert_eq!(Encoding::for_extension("png"), Encoding::Binary);
    }

    #[test]
    fn encoding_for_path_without_extension_is_binary() {
        assert_eq!(Encoding::for_path(Path::new("LICENSE")), Encoding::Binary);
    }

    #[test]
    fn content_from_bytes_decodes_utf8() {
        let content = FileContent::from_bytes(b"hello".to_vec(), Encoding::Utf8);
        assert_eq!(content.as_str(), Some("hello"));
        assert_eq!(content.as_bytes(), b"hello");
    }

    #[test]
    fn content_from_invalid_utf8_falls_back_to_bytes() {
        let content = FileContent::from_bytes(vec![0xff, 0xfe], Encoding::Utf8);
        assert_eq!(content.as_str(), None);
        assert_eq!(content.as_bytes(), &[0xff, 0xfe]);
    }
}
