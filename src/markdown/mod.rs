//! Markdown to HTML conversion.
//!
//! Markdown uploads are rendered with pulldown-cmark (tables, footnotes,
//! strikethrough, task lists) and every heading receives a unique anchor id,
//! so the heading segmenter and TOC can address them.

mod slugify;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};

pub use slugify::{Slugger, slugify};

/// Render Markdown to HTML with slug ids on headings.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

    let mut events: Vec<Event<'_>> = Parser::new_ext(markdown, options).collect();
    assign_heading_ids(&mut events);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut slugger = Slugger::default();
    let mut i = 0;
    while i < events.len() {
        let Event::Start(Tag::Heading { id: None, .. }) = &events[i] else {
            i += 1;
            continue;
        };

        let mut text = String::new();
        let mut j = i + 1;
        while j < events.len() {
            match &events[j] {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(t) | Event::Code(t) => text.push_str(t),
                _ => {}
            }
            j += 1;
        }

        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(slugger.slug(&text)));
        }
        i = j;
    }
}
