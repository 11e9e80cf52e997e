//! Font discovery.
//!
//! Renderers never look for font files themselves. They receive a
//! [`FontSource`] from a [`FontProvider`], which can be a bundled byte blob,
//! a configured file, a lookup over system font directories, or a chain of
//! those tried in order.

use super::WatermarkError;
use crate::config::FontConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// How deep `SystemFonts` descends below each search directory.
const MAX_SEARCH_DEPTH: usize = 4;

/// Candidate file names searched for by `SystemFonts`, CJK-capable faces first.
pub const DEFAULT_FONT_CANDIDATES: &[&str] = &[
    "simhei.ttf",
    "simkai.ttf",
    "msyh.ttc",
    "simsun.ttc",
    "NotoSansCJK-Regular.ttc",
    "wqy-microhei.ttc",
    "DejaVuSans.ttf",
    "LiberationSans-Regular.ttf",
    "Arial.ttf",
];

/// Raw font program plus the face index inside it.
#[derive(Clone)]
pub struct FontSource {
    pub name: String,
    pub data: Arc<Vec<u8>>,
    pub index: u32,
}

impl fmt::Debug for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontSource")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .field("index", &self.index)
            .finish()
    }
}

impl FontSource {
    pub fn new(name: impl Into<String>, data: Vec<u8>, index: u32) -> Self {
        Self {
            name: name.into(),
            data: Arc::new(data),
            index,
        }
    }

    /// True for TrueType/OpenType collections (`.ttc`).
    pub fn is_collection(&self) -> bool {
        self.data.starts_with(b"ttcf")
    }

    /// True for a single-face font with TrueType outlines.
    pub fn is_truetype(&self) -> bool {
        self.data.starts_with(&[0x00, 0x01, 0x00, 0x00]) || self.data.starts_with(b"true")
    }

    /// True when the font can be embedded in a PDF as a single TrueType face.
    pub fn is_embeddable(&self) -> bool {
        !self.is_collection() && self.is_truetype()
    }
}

/// Supplies the font used for measuring and drawing watermarks.
pub trait FontProvider: Send + Sync {
    fn load(&self) -> Result<FontSource, WatermarkError>;

    /// First font this provider can supply for which `accept` holds.
    fn load_where(&self, accept: &dyn Fn(&FontSource) -> bool) -> Result<FontSource, WatermarkError> {
        let source = self.load()?;
        if accept(&source) {
            Ok(source)
        } else {
            Err(WatermarkError::FontUnavailable(format!(
                "{} does not fit the requested use",
                source.name
            )))
        }
    }

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Font bytes compiled into or shipped with the binary.
#[derive(Debug, Clone)]
pub struct BundledFont {
    source: FontSource,
}

impl BundledFont {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            source: FontSource::new(name, data, 0),
        }
    }

    pub fn from_static(name: impl Into<String>, data: &'static [u8]) -> Self {
        Self::new(name, data.to_vec())
    }
}

impl FontProvider for BundledFont {
    fn load(&self) -> Result<FontSource, WatermarkError> {
        Ok(self.source.clone())
    }

    fn describe(&self) -> String {
        format!("bundled font '{}'", self.source.name)
    }
}

/// A font file at a fixed path.
#[derive(Debug, Clone)]
pub struct FontFile {
    path: PathBuf,
    index: u32,
}

impl FontFile {
    pub fn new(path: impl Into<PathBuf>, index: u32) -> Self {
        Self {
            path: path.into(),
            index,
        }
    }
}

impl FontProvider for FontFile {
    fn load(&self) -> Result<FontSource, WatermarkError> {
        let data = std::fs::read(&self.path).map_err(|e| {
            WatermarkError::FontUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(FontSource::new(file_label(&self.path), data, self.index))
    }

    fn describe(&self) -> String {
        format!("font file {}", self.path.display())
    }
}

/// Looks for well-known font files in the platform font directories.
#[derive(Debug, Clone)]
pub struct SystemFonts {
    search_dirs: Vec<PathBuf>,
    candidates: Vec<String>,
}

impl Default for SystemFonts {
    fn default() -> Self {
        Self::new(
            default_search_dirs(),
            DEFAULT_FONT_CANDIDATES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl SystemFonts {
    pub fn new(search_dirs: Vec<PathBuf>, candidates: Vec<String>) -> Self {
        Self {
            search_dirs,
            candidates,
        }
    }

    /// Path of the first candidate present in any search directory.
    ///
    /// Candidates are tried in priority order; for each one every search
    /// directory is scanned before moving to the next candidate.
    pub fn find(&self) -> Option<PathBuf> {
        self.candidates.iter().find_map(|candidate| {
            self.search_dirs
                .iter()
                .find_map(|dir| find_file(dir, candidate))
        })
    }
}

impl FontProvider for SystemFonts {
    fn load(&self) -> Result<FontSource, WatermarkError> {
        self.load_where(&|_| true)
    }

    fn load_where(&self, accept: &dyn Fn(&FontSource) -> bool) -> Result<FontSource, WatermarkError> {
        for candidate in &self.candidates {
            for dir in &self.search_dirs {
                let Some(path) = find_file(dir, candidate) else {
                    continue;
                };
                match std::fs::read(&path) {
                    Ok(data) => {
                        let source = FontSource::new(file_label(&path), data, 0);
                        if accept(&source) {
                            tracing::info!(font = %path.display(), "Loaded watermark font");
                            return Ok(source);
                        }
                        tracing::debug!(font = %path.display(), "Skipping font that does not fit");
                    }
                    Err(e) => {
                        tracing::warn!(font = %path.display(), error = %e, "Failed to read font file");
                    }
                }
            }
        }

        Err(WatermarkError::FontUnavailable(format!(
            "none of {:?} found under {:?}",
            self.candidates, self.search_dirs
        )))
    }

    fn describe(&self) -> String {
        format!("system fonts in {} directories", self.search_dirs.len())
    }
}

/// Tries each provider in order and returns the first font that loads.
pub struct FontChain {
    providers: Vec<Box<dyn FontProvider>>,
}

impl FontChain {
    pub fn new(providers: Vec<Box<dyn FontProvider>>) -> Self {
        Self { providers }
    }
}

impl FontProvider for FontChain {
    fn load(&self) -> Result<FontSource, WatermarkError> {
        self.load_where(&|_| true)
    }

    fn load_where(&self, accept: &dyn Fn(&FontSource) -> bool) -> Result<FontSource, WatermarkError> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.load_where(accept) {
                Ok(source) => return Ok(source),
                Err(e) => {
                    tracing::debug!(provider = %provider.describe(), error = %e, "Font provider failed");
                    failures.push(e.to_string());
                }
            }
        }
        Err(WatermarkError::FontUnavailable(failures.join("; ")))
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.providers.iter().map(|p| p.describe()).collect();
        parts.join(" -> ")
    }
}

/// Build the provider chain described by the configuration: an explicit
/// font file first (if set), then the system lookup.
pub fn font_provider_from_config(config: &FontConfig) -> FontChain {
    let mut providers: Vec<Box<dyn FontProvider>> = Vec::new();

    if let Some(path) = &config.path {
        providers.push(Box::new(FontFile::new(path, config.index)));
    }

    let search_dirs = if config.search_dirs.is_empty() {
        default_search_dirs()
    } else {
        config.search_dirs.clone()
    };
    let candidates = if config.candidates.is_empty() {
        DEFAULT_FONT_CANDIDATES.iter().map(|s| s.to_string()).collect()
    } else {
        config.candidates.clone()
    };
    providers.push(Box::new(SystemFonts::new(search_dirs, candidates)));

    FontChain::new(providers)
}

/// Platform font directories.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if cfg!(target_os = "windows") {
        let windir = std::env::var("WINDIR").unwrap_or_else(|_| "C:\\Windows".to_string());
        dirs.push(Path::new(&windir).join("Fonts"));
    } else if cfg!(target_os = "macos") {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(Path::new(&home).join("Library/Fonts"));
        }
    } else {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(Path::new(&home).join(".local/share/fonts"));
        }
    }

    dirs
}

/// First file named `file_name` (case-insensitive) at most
/// `MAX_SEARCH_DEPTH` directories below `dir`.
fn find_file(dir: &Path, file_name: &str) -> Option<PathBuf> {
    WalkDir::new(dir)
        .max_depth(MAX_SEARCH_DEPTH + 1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.eq_ignore_ascii_case(file_name))
        })
        .map(|entry| entry.into_path())
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("font")
        .to_string()
}
