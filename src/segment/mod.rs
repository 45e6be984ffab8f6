//! Chapter segmentation for unstructured content.
//!
//! Text and HTML that arrive as one undivided body are split by an ordered
//! chain of [`Segmenter`] strategies. Each strategy decides for itself whether
//! its signal is strong enough; the first one that returns `Some` wins:
//!
//! 1. [`HeadingSplit`]: `h1`..`h3` boundaries (HTML only)
//! 2. [`PatternSplit`]: chapter-marker lines such as `第一章` or `Chapter 4`
//! 3. [`BlankLineSplit`]: runs of two or more blank lines
//! 4. [`ParagraphPack`]: paragraphs greedily packed to a character budget
//! 5. [`SingleChapter`]: the whole body as one chapter
//!
//! ```
//! use chapterize::segment::{SegmentInput, SegmenterChain};
//! use chapterize::{Config, ContentKind};
//!
//! let chain = SegmenterChain::from_config(&Config::default());
//! let text = "第一章 开始\n内容一\n第二章 继续\n内容二\n第三章 结束\n内容三";
//! let segments = chain.segment(&SegmentInput::new(text, ContentKind::PlainText));
//! assert_eq!(segments.len(), 3);
//! assert_eq!(segments[2].title.as_deref(), Some("第三章 结束"));
//! ```

mod heading;
mod paragraph;
mod pattern;

use std::fmt;

use tracing::debug;

use crate::book::ContentKind;
use crate::config::Config;

pub use heading::HeadingSplit;
pub use paragraph::{BlankLineSplit, ParagraphPack, SingleChapter};
pub use pattern::{ChapterPattern, PatternSplit, default_patterns};

/// Body handed to the segmenter.
#[derive(Debug, Clone, Copy)]
pub struct SegmentInput<'a> {
    pub text: &'a str,
    pub kind: ContentKind,
}

impl<'a> SegmentInput<'a> {
    pub fn new(text: &'a str, kind: ContentKind) -> Self {
        Self { text, kind }
    }
}

/// A chapter candidate before numbering and capping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub title: Option<String>,
    pub content: String,
}

impl Segment {
    pub fn new(title: Option<String>, content: impl Into<String>) -> Self {
        Self {
            title,
            content: content.into(),
        }
    }
}

/// One segmentation heuristic.
///
/// Returning `None` passes the input to the next strategy in the chain.
pub trait Segmenter: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn try_segment(&self, input: &SegmentInput<'_>) -> Option<Vec<Segment>>;
}

/// Ordered strategies tried until one accepts the input.
#[derive(Debug)]
pub struct SegmenterChain {
    strategies: Vec<Box<dyn Segmenter>>,
}

impl SegmenterChain {
    pub fn new(strategies: Vec<Box<dyn Segmenter>>) -> Self {
        Self { strategies }
    }

    /// The standard five-step cascade.
    pub fn from_config(config: &Config) -> Self {
        Self::new(vec![
            Box::new(HeadingSplit),
            Box::new(PatternSplit::new(config.chapter_patterns.clone())),
            Box::new(BlankLineSplit::new(config.pack_chars)),
            Box::new(ParagraphPack::new(config.pack_chars)),
            Box::new(SingleChapter),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Split the input; always yields at least one segment.
    pub fn segment(&self, input: &SegmentInput<'_>) -> Vec<Segment> {
        for strategy in &self.strategies {
            if let Some(segments) = strategy.try_segment(input)
                && !segments.is_empty()
            {
                debug!(
                    strategy = strategy.name(),
                    segments = segments.len(),
                    "segmentation accepted"
                );
                return segments;
            }
        }
        SingleChapter
            .try_segment(input)
            .unwrap_or_else(|| vec![Segment::new(None, input.text)])
    }
}

/// Prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Cut `content` at `max_chars` characters and append `marker` if it was longer.
pub fn cap_content(content: String, max_chars: usize, marker: &str) -> (String, bool) {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let mut capped = String::with_capacity(idx + marker.len());
            capped.push_str(&content[..idx]);
            capped.push_str(marker);
            (capped, true)
        }
        None => (content, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chain_order() {
        let chain = SegmenterChain::from_config(&Config::default());
        assert_eq!(
            chain.strategy_names(),
            vec![
                "heading",
                "pattern",
                "blank_line",
                "paragraph_pack",
                "single"
            ]
        );
    }

    #[test]
    fn test_empty_chain_still_yields_one_segment() {
        let chain = SegmenterChain::new(Vec::new());
        let segments = chain.segment(&SegmentInput::new("", ContentKind::PlainText));
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_cap_content() {
        let (capped, truncated) = cap_content("一二三四五".to_string(), 3, "[cut]");
        assert!(truncated);
        assert_eq!(capped, "一二三[cut]");

        let (kept, truncated) = cap_content("abc".to_string(), 3, "[cut]");
        assert!(!truncated);
        assert_eq!(kept, "abc");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn test_html_input_falls_through_to_packing() {
        let chain = SegmenterChain::from_config(&Config::default());
        let html = "<p>one</p><p>two</p>";
        let segments = chain.segment(&SegmentInput::new(html, ContentKind::Html));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].title.as_deref(), Some("Part 1"));
        assert_eq!(segments[0].content, "<p>one</p>\n<p>two</p>");
    }
}
