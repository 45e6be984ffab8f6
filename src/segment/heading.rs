use crate::book::ContentKind;
use crate::html::{Block, HtmlDocument};

use super::{Segment, SegmentInput, Segmenter};

/// Split HTML at `h1`..`h3` headings.
///
/// The shallowest heading level present is tried first; if it yields fewer
/// than two boundaries, deeper levels are admitted one at a time. Deeper
/// headings stay inside chapter content. Blocks before the first boundary
/// join the first chapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingSplit;

impl Segmenter for HeadingSplit {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn try_segment(&self, input: &SegmentInput<'_>) -> Option<Vec<Segment>> {
        if input.kind != ContentKind::Html {
            return None;
        }

        let blocks = HtmlDocument::parse(input.text).heading_blocks();
        let mut levels: Vec<u8> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading { level, .. } => Some(*level),
                Block::Content(_) => None,
            })
            .collect();
        levels.sort_unstable();
        levels.dedup();

        levels
            .into_iter()
            .find_map(|threshold| split_at_level(&blocks, threshold))
    }
}

fn split_at_level(blocks: &[Block], threshold: u8) -> Option<Vec<Segment>> {
    let boundaries: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| matches!(b, Block::Heading { level, .. } if *level <= threshold))
        .map(|(i, _)| i)
        .collect();

    if boundaries.len() < 2 {
        return None;
    }

    let preamble = join_blocks(&blocks[..boundaries[0]]);
    let mut segments = Vec::with_capacity(boundaries.len());
    for (n, &start) in boundaries.iter().enumerate() {
        let end = boundaries.get(n + 1).copied().unwrap_or(blocks.len());
        let title = match &blocks[start] {
            Block::Heading { text, .. } if !text.is_empty() => Some(text.clone()),
            _ => None,
        };
        let mut content = join_blocks(&blocks[start + 1..end]);
        if n == 0 && !preamble.is_empty() {
            content = if content.is_empty() {
                preamble.clone()
            } else {
                format!("{preamble}\n{content}")
            };
        }
        segments.push(Segment::new(title, content));
    }
    Some(segments)
}

fn join_blocks(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(Block::html)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(html: &str) -> Option<Vec<Segment>> {
        HeadingSplit.try_segment(&SegmentInput::new(html, ContentKind::Html))
    }

    #[test]
    fn test_splits_on_h1() {
        let segments = split("<h1>One</h1><p>a</p><h1>Two</h1><p>b</p><h2>Sub</h2><p>c</p>")
            .expect("two chapters");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].title.as_deref(), Some("One"));
        assert_eq!(segments[0].content, "<p>a</p>");
        assert_eq!(segments[1].content, "<p>b</p>\n<h2>Sub</h2>\n<p>c</p>");
    }

    #[test]
    fn test_falls_to_deeper_level() {
        let segments =
            split("<h1>Book</h1><h2>A</h2><p>a</p><h2>B</h2><p>b</p>").expect("split at h2");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].title.as_deref(), Some("Book"));
        assert_eq!(segments[1].title.as_deref(), Some("A"));
        assert_eq!(segments[2].content, "<p>b</p>");
    }

    #[test]
    fn test_preamble_joins_first_chapter() {
        let segments = split("<p>intro</p><h2>A</h2><p>a</p><h2>B</h2>").expect("split");
        assert_eq!(segments[0].content, "<p>intro</p>\n<p>a</p>");
        assert_eq!(segments[1].content, "");
    }

    #[test]
    fn test_nested_headings() {
        let segments = split(
            "<div class=\"chapter\"><h1>One</h1><p>a</p></div><div class=\"chapter\"><h1>Two</h1><p>b</p></div>",
        )
        .expect("split");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].title.as_deref(), Some("Two"));
        assert_eq!(segments[1].content, "<p>b</p>");
    }

    #[test]
    fn test_declines_single_heading_and_plain_text() {
        assert!(split("<h1>Only</h1><p>x</p>").is_none());
        assert!(split("<p>x</p>").is_none());
        assert!(
            HeadingSplit
                .try_segment(&SegmentInput::new("<h1>a</h1><h1>b</h1>", ContentKind::PlainText))
                .is_none()
        );
    }
}
