use std::fmt;

use regex::Regex;

use crate::book::ContentKind;

use super::{Segment, SegmentInput, Segmenter};

/// A named, line-anchored chapter-marker regex.
///
/// Capture group 1, when present, is the chapter title; otherwise the whole
/// match is used.
#[derive(Clone)]
pub struct ChapterPattern {
    name: String,
    regex: Regex,
}

impl ChapterPattern {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            regex: Regex::new(pattern)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// `(start, title)` of every marker, in order.
    fn markers(&self, text: &str) -> Vec<(usize, String)> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let m = caps.get(1).or_else(|| caps.get(0))?;
                Some((m.start(), m.as_str().trim().to_string()))
            })
            .collect()
    }
}

impl fmt::Debug for ChapterPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChapterPattern")
            .field("name", &self.name)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

const LEADING: &str = r"^[ \t\u{3000}]*";

/// Built-in marker patterns, highest priority first.
pub fn default_patterns() -> Vec<ChapterPattern> {
    let patterns = [
        (
            "chinese_numeral",
            format!(r"(?m){LEADING}(第[零〇一二三四五六七八九十百千万两]+[章回节卷集部篇][^\n]*)"),
        ),
        (
            "arabic_numeral",
            format!(r"(?m){LEADING}(第[ \t]*\d+[ \t]*[章回节卷集部篇][^\n]*)"),
        ),
        ("generic_chapter", format!(r"(?m){LEADING}(章节[ \t]*\d+[^\n]*)")),
        (
            "english_chapter",
            format!(
                r"(?mi){LEADING}((?:chapter|chap\.)[ \t]+(?:\d+|[ivxlcdm]+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty)\b[^\n]*)"
            ),
        ),
        (
            "section_header",
            format!(r"(?m){LEADING}((?:[一二三四五六七八九十百]+|\d{{1,3}})、[^\n]*)"),
        ),
    ];

    patterns
        .iter()
        .map(|(name, pattern)| {
            ChapterPattern::new(*name, pattern).expect("built-in chapter pattern is valid")
        })
        .collect()
}

/// Split plain text at chapter-marker lines.
///
/// Patterns are tried in order and the first with at least two matches is
/// used. Each chapter runs from its marker to the next; text before the first
/// marker joins the first chapter.
#[derive(Debug, Clone)]
pub struct PatternSplit {
    patterns: Vec<ChapterPattern>,
}

impl PatternSplit {
    pub fn new(patterns: Vec<ChapterPattern>) -> Self {
        Self { patterns }
    }
}

impl Default for PatternSplit {
    fn default() -> Self {
        Self::new(default_patterns())
    }
}

impl Segmenter for PatternSplit {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn try_segment(&self, input: &SegmentInput<'_>) -> Option<Vec<Segment>> {
        if input.kind != ContentKind::PlainText {
            return None;
        }
        let text = input.text;

        let (pattern, markers) = self
            .patterns
            .iter()
            .map(|p| (p, p.markers(text)))
            .find(|(_, markers)| markers.len() >= 2)?;
        tracing::debug!(pattern = pattern.name(), markers = markers.len(), "chapter markers found");

        let preamble = text[..markers[0].0].trim();
        let mut segments = Vec::with_capacity(markers.len());
        for (i, (start, title)) in markers.iter().enumerate() {
            let end = markers.get(i + 1).map(|(s, _)| *s).unwrap_or(text.len());
            let span = text[*start..end].trim();
            let content = if i == 0 && !preamble.is_empty() {
                format!("{preamble}\n\n{span}")
            } else {
                span.to_string()
            };
            segments.push(Segment::new(Some(title.clone()), content));
        }
        Some(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Option<Vec<Segment>> {
        PatternSplit::default().try_segment(&SegmentInput::new(text, ContentKind::PlainText))
    }

    #[test]
    fn test_chinese_numeral_markers() {
        let text = "第一章 开始\n这是第一章的内容。\n\n第二章 继续\n这是第二章的内容。\n\n第三章 结束\n这是最后一章。\n";
        let segments = split(text).expect("three chapters");
        let titles: Vec<_> = segments.iter().map(|s| s.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["第一章 开始", "第二章 继续", "第三章 结束"]);
        assert_eq!(segments[2].content, "第三章 结束\n这是最后一章。");
    }

    #[test]
    fn test_preamble_joins_first_chapter() {
        let text = "测试内容\n\n第一章\n这是第一章的内容。\n\n第二章\n这是第二章的内容。";
        let segments = split(text).expect("two chapters");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].content, "测试内容\n\n第一章\n这是第一章的内容。");
    }

    #[test]
    fn test_mid_sentence_reference_is_not_a_marker() {
        let text = "第一章 起\n正如在第二章中提到的那样。\n第二章 承\n内容";
        let segments = split(text).expect("two chapters");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].title.as_deref(), Some("第二章 承"));
    }

    #[test]
    fn test_priority_order() {
        // Both Arabic chapter markers and English markers present; the Arabic
        // pattern ranks higher.
        let text = "第1章 甲\nChapter 1 inside\n第2章 乙\nChapter 2 inside\n";
        let segments = split(text).expect("split");
        assert_eq!(segments[0].title.as_deref(), Some("第1章 甲"));
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn test_english_markers() {
        let text = "Preface\n\nCHAPTER I\nIt begins.\n\nChapter II. The Middle\nIt goes on.\n\nChapter Three\nIt ends.";
        let segments = split(text).expect("split");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].title.as_deref(), Some("Chapter II. The Middle"));
        assert_eq!(segments[2].title.as_deref(), Some("Chapter Three"));
        assert!(segments[0].content.starts_with("Preface"));
    }

    #[test]
    fn test_section_headers() {
        let text = "一、总则\n内容\n二、细则\n内容\n";
        let segments = split(text).expect("split");
        assert_eq!(segments[1].title.as_deref(), Some("二、细则"));
    }

    #[test]
    fn test_single_marker_declines() {
        assert!(split("第一章 唯一\n只有一章。").is_none());
        assert!(split("no markers at all").is_none());
    }

    #[test]
    fn test_custom_pattern_list() {
        let custom = vec![ChapterPattern::new("part", r"(?m)^(Part \d+)").unwrap()];
        let segments = PatternSplit::new(custom)
            .try_segment(&SegmentInput::new(
                "Part 1\na\nPart 2\nb",
                ContentKind::PlainText,
            ))
            .expect("split");
        assert_eq!(segments.len(), 2);
        assert!(ChapterPattern::new("bad", "(").is_err());
    }
}
