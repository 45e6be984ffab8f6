use std::sync::LazyLock;

use regex::Regex;

use crate::book::ContentKind;
use crate::html::HtmlDocument;

use super::{Segment, SegmentInput, Segmenter};

static SECTION_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n[ \t\u{3000}]*\n(?:[ \t\u{3000}]*\n)+").expect("section break regex")
});

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\u{3000}]*\n").expect("paragraph break regex"));

fn part_title(n: usize) -> Option<String> {
    Some(format!("Part {n}"))
}

/// Split plain text at runs of two or more blank lines.
///
/// Only trusted when it finds at least three sections and none of them is
/// larger than the packing budget.
#[derive(Debug, Clone, Copy)]
pub struct BlankLineSplit {
    max_section_chars: usize,
}

impl BlankLineSplit {
    pub fn new(max_section_chars: usize) -> Self {
        Self { max_section_chars }
    }
}

impl Segmenter for BlankLineSplit {
    fn name(&self) -> &'static str {
        "blank_line"
    }

    fn try_segment(&self, input: &SegmentInput<'_>) -> Option<Vec<Segment>> {
        if input.kind != ContentKind::PlainText {
            return None;
        }

        let sections: Vec<&str> = SECTION_BREAK
            .split(input.text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if sections.len() < 3
            || sections
                .iter()
                .any(|s| s.chars().count() > self.max_section_chars)
        {
            return None;
        }

        Some(
            sections
                .into_iter()
                .enumerate()
                .map(|(i, s)| Segment::new(part_title(i + 1), s))
                .collect(),
        )
    }
}

/// Greedily pack paragraphs into parts of at most `budget` characters.
///
/// A new part starts before any paragraph that would push the current one
/// past the budget, so only a single oversized paragraph can exceed it.
#[derive(Debug, Clone, Copy)]
pub struct ParagraphPack {
    budget: usize,
}

impl ParagraphPack {
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    fn pack(&self, paragraphs: &[String], separator: &str) -> Vec<Segment> {
        let sep_len = separator.chars().count();
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for paragraph in paragraphs {
            let len = paragraph.chars().count();
            if !current.is_empty() && current_len + sep_len + len > self.budget {
                parts.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push_str(separator);
                current_len += sep_len;
            }
            current.push_str(paragraph);
            current_len += len;
        }
        if !current.is_empty() {
            parts.push(current);
        }

        parts
            .into_iter()
            .enumerate()
            .map(|(i, content)| Segment::new(part_title(i + 1), content))
            .collect()
    }
}

impl Segmenter for ParagraphPack {
    fn name(&self) -> &'static str {
        "paragraph_pack"
    }

    fn try_segment(&self, input: &SegmentInput<'_>) -> Option<Vec<Segment>> {
        let (paragraphs, separator) = match input.kind {
            ContentKind::PlainText => text_paragraphs(input.text),
            ContentKind::Html => {
                let blocks = HtmlDocument::parse(input.text)
                    .top_level_blocks()
                    .into_iter()
                    .map(|b| b.html().to_string())
                    .collect();
                (blocks, "\n")
            }
        };

        let parts = self.pack(&paragraphs, separator);
        (!parts.is_empty()).then_some(parts)
    }
}

/// Blank-line paragraphs, or single lines when the text has no blank line.
fn text_paragraphs(text: &str) -> (Vec<String>, &'static str) {
    let (pieces, separator): (Vec<&str>, _) = if PARAGRAPH_BREAK.is_match(text) {
        (PARAGRAPH_BREAK.split(text).collect(), "\n\n")
    } else {
        (text.split('\n').collect(), "\n")
    };
    let paragraphs = pieces
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    (paragraphs, separator)
}

/// The whole body as one chapter. Never declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleChapter;

impl Segmenter for SingleChapter {
    fn name(&self) -> &'static str {
        "single"
    }

    fn try_segment(&self, input: &SegmentInput<'_>) -> Option<Vec<Segment>> {
        Some(vec![Segment::new(None, input.text.trim())])
    }
}
