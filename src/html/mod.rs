//! HTML parsing, cleanup and serialization.
//!
//! Markup from EPUB spine items, HTML uploads and converted Markdown is
//! parsed with html5ever into an [`ArenaDom`], stripped of non-content
//! elements, and serialized back out. The segmenter also uses the flattened
//! block view produced here to find chapter headings.

mod arena;
mod tree_sink;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

pub use arena::{ArenaDom, ArenaNodeData, ArenaNodeId, Attribute};
pub use tree_sink::ArenaSink;

/// Elements removed before content is kept.
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "meta", "link"];

/// Title rule: the first non-empty element of each tag, in priority order.
const TITLE_TAGS: &[&str] = &["h1", "h2", "h3", "title"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style", "xmp", "iframe", "noembed", "noframes"];

const WRAPPER_TAGS: &[&str] = &["div", "section", "article", "main"];

/// A unit of body content as seen by the segmenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// An `h1`..`h3` element.
    Heading { level: u8, text: String, html: String },
    Content(String),
}

impl Block {
    pub fn html(&self) -> &str {
        match self {
            Block::Heading { html, .. } => html,
            Block::Content(html) => html,
        }
    }
}

/// A parsed HTML document.
pub struct HtmlDocument {
    dom: ArenaDom,
}

impl HtmlDocument {
    /// Parse a document or fragment. Parsing never fails; malformed markup is
    /// recovered the way browsers do.
    pub fn parse(html: &str) -> Self {
        let sink = parse_document(ArenaSink::new(), ParseOpts::default())
            .from_utf8()
            .one(html.as_bytes());
        Self {
            dom: sink.into_dom(),
        }
    }

    pub fn dom(&self) -> &ArenaDom {
        &self.dom
    }

    /// Remove `script`, `style`, `meta` and `link` elements.
    pub fn strip_non_content(&mut self) {
        let doomed = self
            .dom
            .find_all_by_tags(self.dom.document(), NON_CONTENT_TAGS);
        for id in doomed {
            self.dom.detach(id);
        }
    }

    pub fn body(&self) -> Option<ArenaNodeId> {
        self.dom.find_by_tag("body")
    }

    /// Inner HTML of `<body>`, or of the whole document if there is none.
    pub fn body_html(&self) -> String {
        let root = self.body().unwrap_or(self.dom.document());
        let mut out = String::new();
        for child in self.dom.children(root) {
            self.serialize_node(child, &mut out);
        }
        out.trim().to_string()
    }

    /// Text of the `<title>` element.
    pub fn title(&self) -> Option<String> {
        self.first_text_of("title")
    }

    /// First non-empty `h1`, then `h2`, then `h3`, then `<title>`.
    pub fn heading_title(&self) -> Option<String> {
        TITLE_TAGS.iter().find_map(|tag| self.first_text_of(tag))
    }

    fn first_text_of(&self, tag: &str) -> Option<String> {
        self.dom
            .find_all_by_tags(self.dom.document(), &[tag])
            .into_iter()
            .map(|id| self.text_of(id))
            .find(|text| !text.is_empty())
    }

    /// `src` of every image, in document order.
    pub fn image_sources(&self) -> Vec<String> {
        let root = self.body().unwrap_or(self.dom.document());
        self.dom
            .find_all_by_tags(root, &["img", "image"])
            .into_iter()
            .filter_map(|id| {
                self.dom
                    .get_attr(id, "src")
                    .or_else(|| self.dom.get_attr(id, "href"))
            })
            .map(str::to_string)
            .collect()
    }

    /// Whitespace-normalized text content of a node.
    pub fn text_of(&self, id: ArenaNodeId) -> String {
        let mut raw = String::new();
        if let Some(text) = self.dom.text_content(id) {
            raw.push_str(text);
        }
        for node in self.dom.descendants(id) {
            if let Some(text) = self.dom.text_content(node) {
                raw.push_str(text);
            }
        }
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Body content flattened so that every `h1`..`h3` is a top-level block.
    ///
    /// Containers holding such a heading are descended into; everything else
    /// is kept whole.
    pub fn heading_blocks(&self) -> Vec<Block> {
        let mut out = Vec::new();
        if let Some(body) = self.body() {
            self.flatten_into(body, &mut out);
        }
        out
    }

    fn flatten_into(&self, node: ArenaNodeId, out: &mut Vec<Block>) {
        for child in self.dom.children(node) {
            if let Some(level) = self.heading_level(child) {
                out.push(Block::Heading {
                    level,
                    text: self.text_of(child),
                    html: self.outer_html(child),
                });
            } else if self.dom.is_element(child) && self.contains_heading(child) {
                self.flatten_into(child, out);
            } else if let Some(block) = self.content_block(child) {
                out.push(block);
            }
        }
    }

    /// Direct children of `<body>`, unwrapping lone container elements.
    pub fn top_level_blocks(&self) -> Vec<Block> {
        match self.body() {
            Some(body) => self.top_level_blocks_of(body),
            None => Vec::new(),
        }
    }

    fn top_level_blocks_of(&self, root: ArenaNodeId) -> Vec<Block> {
        let mut node = root;
        loop {
            let significant: Vec<_> = self
                .dom
                .children(node)
                .filter(|&c| self.is_significant(c))
                .collect();
            match significant.as_slice() {
                [only] if WRAPPER_TAGS.iter().any(|tag| self.dom.is_tag(*only, tag)) => {
                    node = *only;
                }
                _ => break,
            }
        }
        self.dom
            .children(node)
            .filter_map(|child| match self.heading_level(child) {
                Some(level) => Some(Block::Heading {
                    level,
                    text: self.text_of(child),
                    html: self.outer_html(child),
                }),
                None => self.content_block(child),
            })
            .collect()
    }

    fn content_block(&self, id: ArenaNodeId) -> Option<Block> {
        if !self.is_significant(id) {
            return None;
        }
        let html = self.outer_html(id);
        (!html.trim().is_empty()).then(|| Block::Content(html.trim().to_string()))
    }

    fn is_significant(&self, id: ArenaNodeId) -> bool {
        match self.dom.get(id).map(|n| &n.data) {
            Some(ArenaNodeData::Element { .. }) => true,
            Some(ArenaNodeData::Text(text)) => !text.trim().is_empty(),
            _ => false,
        }
    }

    fn heading_level(&self, id: ArenaNodeId) -> Option<u8> {
        match self.dom.element_name(id)?.as_ref() {
            "h1" => Some(1),
            "h2" => Some(2),
            "h3" => Some(3),
            _ => None,
        }
    }

    fn contains_heading(&self, id: ArenaNodeId) -> bool {
        self.dom
            .descendants(id)
            .into_iter()
            .any(|d| self.heading_level(d).is_some())
    }

    pub fn outer_html(&self, id: ArenaNodeId) -> String {
        let mut out = String::new();
        self.serialize_node(id, &mut out);
        out
    }

    fn serialize_node(&self, id: ArenaNodeId, out: &mut String) {
        let Some(node) = self.dom.get(id) else {
            return;
        };
        match &node.data {
            ArenaNodeData::Element { name, attrs } => {
                let tag = name.local.as_ref();
                out.push('<');
                out.push_str(tag);
                for attr in attrs {
                    out.push(' ');
                    if let Some(prefix) = &attr.name.prefix {
                        out.push_str(prefix.as_ref());
                        out.push(':');
                    }
                    out.push_str(attr.name.local.as_ref());
                    out.push_str("=\"");
                    out.push_str(&escape_attr(&attr.value));
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&tag) {
                    return;
                }
                let raw = RAW_TEXT_TAGS.contains(&tag);
                for child in self.dom.children(id) {
                    match (raw, self.dom.text_content(child)) {
                        (true, Some(text)) => out.push_str(text),
                        _ => self.serialize_node(child, out),
                    }
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            ArenaNodeData::Text(text) => out.push_str(&escape_text(text)),
            ArenaNodeData::Document => {
                for child in self.dom.children(id) {
                    self.serialize_node(child, out);
                }
            }
            ArenaNodeData::Comment(_) | ArenaNodeData::Doctype { .. } => {}
        }
    }
}

/// Escape text for inclusion in HTML element content.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Wrap each non-empty line group of `text` as a `<p>` element.
pub fn paragraphs_to_html(paragraphs: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    paragraphs
        .into_iter()
        .filter_map(|p| {
            let p = p.as_ref().trim();
            (!p.is_empty()).then(|| format!("<p>{}</p>", escape_text(p)))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
