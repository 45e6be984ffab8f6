use chapterize::segment::{
    ChapterPattern, ParagraphPack, PatternSplit, SegmentInput, SegmenterChain, SingleChapter,
    default_patterns,
};
use chapterize::{Config, ContentKind, DiagnosticKind, Document, Pipeline, normalize};

fn txt(bytes: Vec<u8>) -> Document {
    Document::new(bytes, "txt", "novel.txt")
}

#[test]
fn test_three_chinese_markers() {
    let text = "第一章 开始\n从前有座山。\n第二章 继续\n山里有座庙。\n第三章 结束\n庙里有个老和尚。\n最后一行。";
    let book = normalize(&txt(text.as_bytes().to_vec())).unwrap();

    let titles: Vec<_> = book.chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["第一章 开始", "第二章 继续", "第三章 结束"]);
    assert!(book.chapters[2].content.ends_with("最后一行。"));
    assert_eq!(book.metadata.title.as_deref(), Some("novel"));
}

#[test]
fn test_gbk_novel_decodes_through_cascade() {
    let text = "第一章 风起\n正文一。\n第二章 云涌\n正文二。";
    let (bytes, _, had_errors) = encoding_rs::GBK.encode(text);
    assert!(!had_errors);
    assert!(std::str::from_utf8(&bytes).is_err());

    let book = normalize(&txt(bytes.into_owned())).unwrap();
    assert_eq!(book.chapters.len(), 2);
    assert_eq!(book.chapters[1].title, "第二章 云涌");
    assert_eq!(book.metadata.extra.get("encoding").map(String::as_str), Some("GBK"));
    assert!(book.diagnostics.is_empty());
}

#[test]
fn test_undecodable_bytes_still_complete() {
    let config = Config::default().with_encodings(vec![encoding_rs::UTF_8]);
    let book = Pipeline::new(config)
        .normalize(&txt(vec![b'a', 0xFF, b'b']))
        .unwrap();
    assert_eq!(book.chapters.len(), 1);
    assert!(!book.needs_attention());
    assert_eq!(
        book.diagnostics[0].kind,
        DiagnosticKind::EncodingDetectionExhausted
    );
}

#[test]
fn test_over_budget_chapter_is_truncated() {
    let body = "字".repeat(120);
    let text = format!("第一章 长\n{body}\n第二章 短\n一点点");
    let config = Config::default()
        .with_max_chapter_chars(50)
        .with_truncation_marker("……（已截断）");
    let book = Pipeline::new(config)
        .normalize(&txt(text.into_bytes()))
        .unwrap();

    let long = &book.chapters[0];
    assert!(long.truncated);
    assert!(long.content.ends_with("……（已截断）"));
    assert_eq!(long.word_count, 50 + "……（已截断）".chars().count());
    assert!(!book.chapters[1].truncated);
}

#[test]
fn test_unmarked_text_is_packed() {
    let paragraph = "A paragraph of ordinary prose without any marker.";
    let text = vec![paragraph; 40].join("\n\n");
    let config = Config::default().with_pack_chars(300);
    let book = Pipeline::new(config)
        .normalize(&txt(text.into_bytes()))
        .unwrap();

    assert!(book.chapters.len() > 1);
    let limit = 300 + paragraph.chars().count();
    for chapter in &book.chapters {
        assert!(chapter.word_count <= limit);
        assert!(chapter.title.starts_with("Part "));
    }
}

#[test]
fn test_blank_line_sections() {
    let text = "Opening scene.\n\n\nSecond scene.\n\n\nThird scene.";
    let book = normalize(&txt(text.as_bytes().to_vec())).unwrap();
    let titles: Vec<_> = book.chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["Part 1", "Part 2", "Part 3"]);
}

#[test]
fn test_english_and_roman_markers() {
    let text = "CHAPTER I\nOne.\nChapter II\nTwo.\nchapter iii\nThree.";
    let book = normalize(&txt(text.as_bytes().to_vec())).unwrap();
    assert_eq!(book.chapters.len(), 3);
    assert_eq!(book.chapters[1].title, "Chapter II");
}

#[test]
fn test_marker_priority_is_configurable() {
    // Both a numbered-section style and English markers appear twice.
    let text = "一、序\nChapter 1\n甲\n二、跋\nChapter 2\n乙";
    let default = normalize(&txt(text.as_bytes().to_vec())).unwrap();
    let first_default = default.chapters[0].title.clone();

    let mut reversed = default_patterns();
    reversed.reverse();
    let config = Config::default().with_chapter_patterns(reversed);
    let custom = Pipeline::new(config)
        .normalize(&txt(text.as_bytes().to_vec()))
        .unwrap();

    assert_eq!(first_default, "Chapter 1");
    assert_eq!(custom.chapters[0].title, "一、序");
}

#[test]
fn test_custom_chain() {
    let chain = SegmenterChain::new(vec![
        Box::new(PatternSplit::new(vec![
            ChapterPattern::new("scene", r"(?m)^Scene \d+.*$").unwrap(),
        ])),
        Box::new(ParagraphPack::new(10_000)),
        Box::new(SingleChapter),
    ]);
    assert_eq!(chain.strategy_names(), ["pattern", "paragraph_pack", "single"]);

    let text = "Scene 1\nrain\nScene 2\nsun";
    let segments = chain.segment(&SegmentInput::new(text, ContentKind::PlainText));
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[1].title.as_deref(), Some("Scene 2"));

    let pipeline = Pipeline::default().with_segmenter(chain);
    let book = pipeline.normalize(&txt(text.as_bytes().to_vec())).unwrap();
    assert_eq!(book.chapters[0].title, "Scene 1");
}

#[test]
fn test_invalid_pattern_is_rejected() {
    assert!(ChapterPattern::new("broken", "(unclosed").is_err());
}

#[test]
fn test_html_headings_with_front_matter() {
    let html = "<html><body><p>Preface</p><h2>One</h2><p>a</p><h3>Sub</h3><p>b</p><h2>Two</h2><p>c</p></body></html>";
    let book = normalize(&Document::new(html.as_bytes().to_vec(), "html", "page.html")).unwrap();
    assert_eq!(book.chapters.len(), 2);
    assert!(book.chapters[0].content.contains("Preface"));
    assert!(book.chapters[0].content.contains("<h3>Sub</h3>"));
    assert_eq!(book.chapters[1].title, "Two");
}
