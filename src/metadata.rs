//! Mapping of format-native metadata onto [`Metadata`].
//!
//! Extractors report metadata in whatever shape their format uses. This
//! module is the only place that knows those shapes; the unified record uses
//! normalized key names regardless of source.

use tracing::debug;

use crate::book::Metadata;
use crate::fb2::TitleInfo;

/// Metadata as reported by an extractor, before unification.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NativeMetadata {
    /// Dublin Core `(element, value)` pairs, e.g. `("creator", "Jane Doe")`.
    DublinCore(Vec<(String, String)>),
    /// PDF Info dictionary `(key, value)` pairs, e.g. `("Title", "...")`.
    PdfInfo {
        fields: Vec<(String, String)>,
        page_count: usize,
    },
    FictionBook(TitleInfo),
    Text(TextStats),
    #[default]
    Empty,
}

/// Statistics reported for plain-text, Markdown and HTML uploads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextStats {
    pub encoding: String,
    pub file_size: usize,
    pub character_count: usize,
    pub line_count: usize,
    /// `<title>` of an HTML upload or the first heading of a Markdown one.
    pub source_title: Option<String>,
}

/// Build the unified record. `chapter_count` is filled in by the pipeline.
pub fn unify(native: &NativeMetadata, filename: &str) -> Metadata {
    let mut meta = match native {
        NativeMetadata::DublinCore(pairs) => from_dublin_core(pairs),
        NativeMetadata::PdfInfo { fields, page_count } => from_pdf_info(fields, *page_count),
        NativeMetadata::FictionBook(info) => from_title_info(info),
        NativeMetadata::Text(stats) => from_text_stats(stats),
        NativeMetadata::Empty => Metadata::default(),
    };

    if meta.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
        meta.title = Some(title_from_filename(filename));
    }
    meta
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn push_joined(meta: &mut Metadata, key: &str, value: &str) {
    let Some(value) = non_empty(value) else {
        return;
    };
    meta.extra
        .entry(key.to_string())
        .and_modify(|existing| {
            existing.push_str("; ");
            existing.push_str(&value);
        })
        .or_insert(value);
}

fn set_once(meta: &mut Metadata, key: &str, value: &str) {
    if let Some(value) = non_empty(value) {
        meta.extra.entry(key.to_string()).or_insert(value);
    }
}

fn from_dublin_core(pairs: &[(String, String)]) -> Metadata {
    let mut meta = Metadata::default();
    for (element, value) in pairs {
        match element.as_str() {
            "title" => {
                if meta.title.is_none() {
                    meta.title = non_empty(value);
                }
            }
            "creator" => meta.authors.extend(non_empty(value)),
            "language" => {
                if meta.language.is_none() {
                    meta.language = non_empty(value);
                }
            }
            "subject" => push_joined(&mut meta, "subjects", value),
            "contributor" => push_joined(&mut meta, "contributors", value),
            "publisher" | "description" | "date" | "rights" | "identifier" | "source" => {
                set_once(&mut meta, element, value)
            }
            other => debug!(element = other, "ignoring Dublin Core element"),
        }
    }
    meta
}

fn from_pdf_info(fields: &[(String, String)], page_count: usize) -> Metadata {
    let mut meta = Metadata {
        page_count: Some(page_count),
        ..Default::default()
    };
    for (key, value) in fields {
        match key.as_str() {
            "Title" => meta.title = non_empty(value),
            "Author" => meta.authors.extend(value.split(';').filter_map(non_empty)),
            "Subject" => set_once(&mut meta, "description", value),
            "Keywords" => set_once(&mut meta, "keywords", value),
            "Creator" => set_once(&mut meta, "creator_tool", value),
            "Producer" => set_once(&mut meta, "producer", value),
            "CreationDate" => set_once(&mut meta, "created", &normalize_pdf_date(value)),
            "ModDate" => set_once(&mut meta, "modified", &normalize_pdf_date(value)),
            other => debug!(key = other, "ignoring PDF info key"),
        }
    }
    meta
}

fn from_title_info(info: &TitleInfo) -> Metadata {
    let mut meta = Metadata {
        title: info.book_title.clone(),
        authors: info.authors.clone(),
        language: info.language.clone(),
        ..Default::default()
    };
    for genre in &info.genres {
        push_joined(&mut meta, "subjects", genre);
    }
    if let Some(annotation) = &info.annotation {
        set_once(&mut meta, "description", annotation);
    }
    if let Some(date) = &info.date {
        set_once(&mut meta, "date", date);
    }
    if let Some(keywords) = &info.keywords {
        set_once(&mut meta, "keywords", keywords);
    }
    if let Some(publisher) = &info.publisher {
        set_once(&mut meta, "publisher", publisher);
    }
    meta
}

fn from_text_stats(stats: &TextStats) -> Metadata {
    let mut meta = Metadata {
        title: stats.source_title.clone(),
        ..Default::default()
    };
    set_once(&mut meta, "encoding", &stats.encoding);
    if let Some(source_title) = &stats.source_title {
        set_once(&mut meta, "source_title", source_title);
    }
    meta.extra
        .insert("file_size".into(), stats.file_size.to_string());
    meta.extra
        .insert("character_count".into(), stats.character_count.to_string());
    meta.extra
        .insert("line_count".into(), stats.line_count.to_string());
    meta
}

/// `D:20240115103000+08'00'` becomes `2024-01-15T10:30:00`. Unparseable
/// values are returned trimmed.
pub fn normalize_pdf_date(raw: &str) -> String {
    let trimmed = raw.trim();
    let body = trimmed.strip_prefix("D:").unwrap_or(trimmed);
    let digits: String = body.chars().take_while(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        n if n >= 14 => format!(
            "{}-{}-{}T{}:{}:{}",
            &digits[0..4],
            &digits[4..6],
            &digits[6..8],
            &digits[8..10],
            &digits[10..12],
            &digits[12..14]
        ),
        n if n >= 8 => format!("{}-{}-{}", &digits[0..4], &digits[4..6], &digits[6..8]),
        4 => digits,
        _ => trimmed.to_string(),
    }
}

const NOISE_SUFFIXES: &[&str] = &["电子书", "ebook", "book", "完整版", "高清版", "pdf"];

/// Derive a display title from an upload's filename.
///
/// The extension is dropped, `_` and `-` become spaces, and trailing noise
/// words such as `ebook` or `完整版` are removed.
pub fn title_from_filename(filename: &str) -> String {
    let stem = std::path::Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut title = stem
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    loop {
        let lower = title.to_lowercase();
        let Some(suffix) = NOISE_SUFFIXES.iter().find(|s| lower.ends_with(*s)) else {
            break;
        };
        let cut = lower.len() - suffix.len();
        if !title.is_char_boundary(cut) {
            break;
        }
        // ASCII noise words must stand alone: "Facebook" is not "Face book".
        if suffix.is_ascii() && !title[..cut].ends_with(char::is_whitespace) {
            break;
        }
        let shorter = title[..cut].trim_end().to_string();
        if shorter.is_empty() {
            break;
        }
        title = shorter;
    }

    if title.is_empty() {
        filename.to_string()
    } else {
        title
    }
}
