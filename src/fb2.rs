//! FictionBook 2 extraction.
//!
//! FB2 is a single XML document, so it is parsed in one streaming pass with
//! quick-xml; nothing touches the filesystem. Each top-level `<section>` of
//! the main body becomes a chapter.

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use crate::book::{ContentKind, ContentUnit, Document, RendererKind, TocEntry};
use crate::encoding::{decode_text, xml_encoding_hint};
use crate::error::{Error, Result};
use crate::extract::Extraction;
use crate::html::escape_text;
use crate::metadata::NativeMetadata;
use crate::xml::{attr, local_name, resolve_entity};

/// Bodies with these names hold notes rather than the main text.
const AUXILIARY_BODIES: &[&str] = &["notes", "comments"];

/// Elements rendered as one `<p>` each.
const BLOCK_TAGS: &[&str] = &["p", "subtitle", "v", "text-author"];

/// `description/title-info` plus the publisher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleInfo {
    pub book_title: Option<String>,
    pub authors: Vec<String>,
    pub language: Option<String>,
    pub genres: Vec<String>,
    pub annotation: Option<String>,
    pub date: Option<String>,
    pub keywords: Option<String>,
    pub publisher: Option<String>,
}

/// A top-level section of the main body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fb2Section {
    pub title: Option<String>,
    pub paragraphs: Vec<String>,
    /// Titles of nested sections, in document order.
    pub subsections: Vec<String>,
}

/// A parsed FictionBook document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fb2Book {
    pub title_info: TitleInfo,
    pub sections: Vec<Fb2Section>,
    /// Paragraphs found directly in the body, outside any section.
    pub loose_paragraphs: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Fb2Extractor;

impl Fb2Extractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, doc: &Document) -> Result<Extraction> {
        let bytes = doc.data();
        let text = decode_text(bytes, xml_encoding_hint(bytes).as_deref());
        let book = parse(&text)?;
        debug!(sections = book.sections.len(), "parsed FictionBook");
        Ok(book.into_extraction())
    }
}

impl Fb2Book {
    fn into_extraction(self) -> Extraction {
        let mut units = Vec::new();
        let mut toc = Vec::new();

        if self.sections.is_empty() {
            let title = self.title_info.book_title.clone();
            let mut unit = ContentUnit::new(join_paragraphs(&self.loose_paragraphs), ContentKind::Html);
            unit.title = title;
            units.push(unit);
        }

        for (i, section) in self.sections.into_iter().enumerate() {
            let number = i + 1;
            let title = section
                .title
                .unwrap_or_else(|| format!("Chapter {number}"));
            toc.push(TocEntry::new(1, title.clone()).with_chapter(number));
            for sub in section.subsections {
                toc.push(TocEntry::new(2, sub).with_chapter(number));
            }
            units.push(
                ContentUnit::new(join_paragraphs(&section.paragraphs), ContentKind::Html)
                    .with_title(title),
            );
        }

        Extraction::structured(units, RendererKind::Fb2)
            .with_metadata(NativeMetadata::FictionBook(self.title_info))
            .with_toc(toc)
    }
}

fn join_paragraphs(paragraphs: &[String]) -> String {
    paragraphs
        .iter()
        .map(|p| format!("<p>{}</p>", escape_text(p)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// What the text currently being collected belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    BookTitle,
    FirstName,
    MiddleName,
    LastName,
    Nickname,
    Language,
    Genre,
    Annotation,
    Date,
    Keywords,
    Publisher,
    /// A paragraph of a section title.
    TitleLine,
    Block,
}

struct Capture {
    target: Target,
    /// Stack depth of the element that opened the capture.
    depth: usize,
    text: String,
}

#[derive(Default)]
struct Author {
    first: String,
    middle: String,
    last: String,
    nickname: String,
}

impl Author {
    fn display_name(&self) -> Option<String> {
        let full = [&self.first, &self.middle, &self.last]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            Some(full)
        } else {
            let nick = self.nickname.trim();
            (!nick.is_empty()).then(|| nick.to_string())
        }
    }
}

/// Where a section `<title>` is being assembled.
struct TitleBuffer {
    section_depth: usize,
    lines: Vec<String>,
}

/// Parse FictionBook markup.
pub fn parse(content: &str) -> Result<Fb2Book> {
    let mut reader = Reader::from_str(content);

    let mut book = Fb2Book::default();
    let mut stack: Vec<String> = Vec::new();
    let mut saw_root = false;
    let mut main_body_seen = false;
    let mut in_main_body = false;
    let mut section_depth = 0usize;
    let mut capture: Option<Capture> = None;
    let mut title: Option<TitleBuffer> = None;
    let mut author: Option<Author> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(local_name(e.name().as_ref())).into_owned();
                if stack.is_empty() {
                    if name != "FictionBook" {
                        return Err(Error::InvalidFb2(format!(
                            "root element is <{name}>, expected <FictionBook>"
                        )));
                    }
                    saw_root = true;
                }
                let parent = stack.last().map(String::as_str).unwrap_or("");

                if let Some(cap) = capture.as_mut() {
                    // Nested blocks inside a capture (annotation paragraphs,
                    // poem lines) are separated by a space.
                    if BLOCK_TAGS.contains(&name.as_str()) && !cap.text.is_empty() {
                        cap.text.push(' ');
                    }
                } else {
                    let in_title_info = parent == "title-info";
                    let target = match name.as_str() {
                        "body" if parent == "FictionBook" => {
                            let body_name = attr(&e, b"name").unwrap_or_default();
                            in_main_body = !main_body_seen
                                && !AUXILIARY_BODIES.contains(&body_name.as_str());
                            main_body_seen |= in_main_body;
                            None
                        }
                        "section" if in_main_body => {
                            section_depth += 1;
                            if section_depth == 1 {
                                book.sections.push(Fb2Section::default());
                            }
                            None
                        }
                        "title" if in_main_body && parent == "section" => {
                            title = Some(TitleBuffer {
                                section_depth,
                                lines: Vec::new(),
                            });
                            None
                        }
                        "p" if title.is_some() => Some(Target::TitleLine),
                        tag if in_main_body
                            && title.is_none()
                            && parent != "title"
                            && BLOCK_TAGS.contains(&tag) =>
                        {
                            Some(Target::Block)
                        }
                        "author" if in_title_info => {
                            author = Some(Author::default());
                            None
                        }
                        "first-name" if author.is_some() => Some(Target::FirstName),
                        "middle-name" if author.is_some() => Some(Target::MiddleName),
                        "last-name" if author.is_some() => Some(Target::LastName),
                        "nickname" if author.is_some() => Some(Target::Nickname),
                        "book-title" if in_title_info => Some(Target::BookTitle),
                        "lang" if in_title_info => Some(Target::Language),
                        "genre" if in_title_info => Some(Target::Genre),
                        "annotation" if in_title_info => Some(Target::Annotation),
                        "date" if in_title_info => Some(Target::Date),
                        "keywords" if in_title_info => Some(Target::Keywords),
                        "publisher" if parent == "publish-info" => Some(Target::Publisher),
                        _ => None,
                    };
                    if let Some(target) = target {
                        capture = Some(Capture {
                            target,
                            depth: stack.len(),
                            text: String::new(),
                        });
                    }
                }
                stack.push(name);
            }
            Event::Empty(_) if stack.is_empty() => {
                return Err(Error::InvalidFb2("document has no <FictionBook> root".into()));
            }
            Event::Text(e) => {
                if let Some(cap) = capture.as_mut() {
                    cap.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if let Some(cap) = capture.as_mut() {
                    cap.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if let Some(cap) = capture.as_mut()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    cap.text.push_str(&resolved);
                }
            }
            Event::End(_) => {
                let Some(name) = stack.pop() else {
                    continue;
                };

                if let Some(cap) = capture.take_if(|cap| cap.depth == stack.len()) {
                    let text = normalize_space(&cap.text);
                    finish_capture(&mut book, &mut author, &mut title, cap.target, text, section_depth);
                }

                match name.as_str() {
                    "author" if author.is_some() && capture.is_none() => {
                        if let Some(name) = author.take().and_then(|a| a.display_name()) {
                            book.title_info.authors.push(name);
                        }
                    }
                    "title" => {
                        if let Some(buffer) = title.take_if(|t| t.section_depth == section_depth) {
                            finish_title(&mut book, buffer);
                        }
                    }
                    "section" if in_main_body => section_depth = section_depth.saturating_sub(1),
                    "body" if in_main_body && stack.len() == 1 => in_main_body = false,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(Error::InvalidFb2("document has no <FictionBook> root".into()));
    }
    Ok(book)
}

fn finish_capture(
    book: &mut Fb2Book,
    author: &mut Option<Author>,
    title: &mut Option<TitleBuffer>,
    target: Target,
    text: String,
    section_depth: usize,
) {
    let info = &mut book.title_info;
    let non_empty = (!text.is_empty()).then(|| text.clone());
    match target {
        Target::BookTitle => info.book_title = info.book_title.take().or(non_empty),
        Target::Language => info.language = info.language.take().or(non_empty),
        Target::Annotation => info.annotation = info.annotation.take().or(non_empty),
        Target::Date => info.date = info.date.take().or(non_empty),
        Target::Keywords => info.keywords = info.keywords.take().or(non_empty),
        Target::Publisher => info.publisher = info.publisher.take().or(non_empty),
        Target::Genre => info.genres.extend(non_empty),
        Target::FirstName | Target::MiddleName | Target::LastName | Target::Nickname => {
            if let Some(a) = author.as_mut() {
                let slot = match target {
                    Target::FirstName => &mut a.first,
                    Target::MiddleName => &mut a.middle,
                    Target::LastName => &mut a.last,
                    _ => &mut a.nickname,
                };
                *slot = text;
            }
        }
        Target::TitleLine => {
            if let Some(buffer) = title.as_mut()
                && !text.is_empty()
            {
                buffer.lines.push(text);
            }
        }
        Target::Block => {
            if text.is_empty() {
                return;
            }
            if section_depth == 0 {
                book.loose_paragraphs.push(text);
            } else if let Some(section) = book.sections.last_mut() {
                section.paragraphs.push(text);
            }
        }
    }
}

fn finish_title(book: &mut Fb2Book, buffer: TitleBuffer) {
    let text = buffer.lines.join(" ");
    if text.is_empty() {
        return;
    }
    let Some(section) = book.sections.last_mut() else {
        return;
    };
    if buffer.section_depth == 1 {
        section.title = Some(text);
    } else {
        section.subsections.push(text);
    }
}

fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
