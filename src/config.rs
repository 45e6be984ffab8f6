//! Pipeline configuration.
//!
//! Every knob has a default that matches production behavior; the `with_*`
//! builders adjust individual values.
//!
//! ```
//! use chapterize::Config;
//!
//! let config = Config::default()
//!     .with_max_chapter_chars(20_000)
//!     .with_pack_chars(4_000);
//! assert_eq!(config.max_chapter_chars, 20_000);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use encoding_rs::Encoding;

use crate::segment::{ChapterPattern, default_patterns};

/// Characters kept per chapter before truncation.
pub const DEFAULT_MAX_CHAPTER_CHARS: usize = 50_000;

/// Appended to chapters cut at the character budget.
pub const DEFAULT_TRUNCATION_MARKER: &str = "\n\n[Content truncated]";

/// Top-level configuration for [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone)]
pub struct Config {
    pub max_chapter_chars: usize,
    pub truncation_marker: String,
    pub max_title_chars: usize,
    /// Character budget for paragraph packing.
    pub pack_chars: usize,
    /// Ordered chapter-marker patterns; the first with two matches wins.
    pub chapter_patterns: Vec<ChapterPattern>,
    /// Encodings tried, in order, for plain-text inputs.
    pub encodings: Vec<&'static Encoding>,
    /// Parent directory for scoped temp directories; system default if unset.
    pub temp_root: Option<PathBuf>,
    pub converter: ConverterConfig,
    pub pdf: PdfConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_chapter_chars: DEFAULT_MAX_CHAPTER_CHARS,
            truncation_marker: DEFAULT_TRUNCATION_MARKER.to_string(),
            max_title_chars: 100,
            pack_chars: 8_000,
            chapter_patterns: default_patterns(),
            encodings: vec![encoding_rs::UTF_8, encoding_rs::GBK, encoding_rs::BIG5],
            temp_root: None,
            converter: ConverterConfig::default(),
            pdf: PdfConfig::default(),
        }
    }
}

impl Config {
    pub fn with_max_chapter_chars(mut self, chars: usize) -> Self {
        self.max_chapter_chars = chars;
        self
    }

    pub fn with_truncation_marker(mut self, marker: impl Into<String>) -> Self {
        self.truncation_marker = marker.into();
        self
    }

    pub fn with_max_title_chars(mut self, chars: usize) -> Self {
        self.max_title_chars = chars;
        self
    }

    pub fn with_pack_chars(mut self, chars: usize) -> Self {
        self.pack_chars = chars;
        self
    }

    pub fn with_chapter_patterns(mut self, patterns: Vec<ChapterPattern>) -> Self {
        self.chapter_patterns = patterns;
        self
    }

    pub fn with_encodings(mut self, encodings: Vec<&'static Encoding>) -> Self {
        self.encodings = encodings;
        self
    }

    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn with_converter(mut self, converter: ConverterConfig) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_pdf(mut self, pdf: PdfConfig) -> Self {
        self.pdf = pdf;
        self
    }

    /// Create a scoped temp directory under `temp_root` (or the system default).
    pub(crate) fn temp_dir(&self, prefix: &str) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

/// External MOBI/AZW3 to EPUB converter.
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    pub program: PathBuf,
    pub timeout: Duration,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ebook-convert"),
            timeout: Duration::from_secs(300),
        }
    }
}

impl ConverterConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// PDF extraction settings.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    /// Directory holding the Pdfium shared library; system library if unset.
    pub library_path: Option<PathBuf>,
    /// Pages per chapter when the outline cannot be used.
    pub pages_per_chapter: usize,
    /// Pages with fewer text characters get a rendered bitmap.
    pub scanned_page_threshold: usize,
    pub render_width: i32,
    pub render_bitmaps: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            pages_per_chapter: 10,
            scanned_page_threshold: 32,
            render_width: 1200,
            render_bitmaps: true,
        }
    }
}

impl PdfConfig {
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    pub fn with_pages_per_chapter(mut self, pages: usize) -> Self {
        self.pages_per_chapter = pages.max(1);
        self
    }

    pub fn with_render_bitmaps(mut self, render: bool) -> Self {
        self.render_bitmaps = render;
        self
    }
}
