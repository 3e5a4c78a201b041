//! Markdown rendering
//!
//! Blog posts and practice area descriptions are authored in Markdown and
//! stored alongside their rendered HTML. Headings get `id` anchors so the
//! public site can link to sections.
//!
//! ```
//! use lexsite::services::markdown::MarkdownRenderer;
//!
//! let html = MarkdownRenderer::new().render("## Fees\n\nPlain **text**.");
//! assert!(html.contains("<h2 id=\"fees\">Fees</h2>"));
//! assert!(html.contains("<strong>text</strong>"));
//! ```

use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;

use super::slug::generate_slug;

/// Words per minute used for the reading-time estimate
const WORDS_PER_MINUTE: usize = 200;

/// Default excerpt length, in characters
pub const EXCERPT_LEN: usize = 160;

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options
    }

    /// Render Markdown to HTML with heading anchors
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, Self::options());
        let events = add_heading_anchors(parser);

        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Text content only, with block boundaries collapsed to single spaces
    pub fn plain_text(&self, markdown: &str) -> String {
        let mut text = String::new();
        for event in Parser::new_ext(markdown, Self::options()) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak
                | Event::HardBreak
                | Event::End(
                    TagEnd::Paragraph
                    | TagEnd::Heading(_)
                    | TagEnd::Item
                    | TagEnd::TableCell
                    | TagEnd::CodeBlock,
                ) => text.push(' '),
                _ => {}
            }
        }
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// First `EXCERPT_LEN` characters of the plain text, cut at a word boundary
    /// when one is available
    pub fn excerpt(&self, markdown: &str) -> String {
        truncate_words(&self.plain_text(markdown), EXCERPT_LEN)
    }

    /// `max(1, ceil(words / 200))`
    pub fn reading_minutes(&self, markdown: &str) -> i64 {
        let words = self.plain_text(markdown).split_whitespace().count();
        words.div_ceil(WORDS_PER_MINUTE).max(1) as i64
    }
}

/// Replace each heading with raw HTML carrying a unique `id`
fn add_heading_anchors(parser: Parser<'_>) -> Vec<Event<'_>> {
    let mut events = Vec::new();
    let mut heading: Option<(usize, Vec<Event>)> = None;
    let mut used: HashMap<String, u32> = HashMap::new();

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading = Some((level as usize, Vec::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, inner)) = heading.take() {
                    let text: String = inner
                        .iter()
                        .filter_map(|e| match e {
                            Event::Text(t) | Event::Code(t) => Some(t.as_ref()),
                            _ => None,
                        })
                        .collect();
                    let id = unique_anchor(&mut used, &text);

                    let mut inner_html = String::new();
                    html::push_html(&mut inner_html, inner.into_iter());
                    events.push(Event::Html(
                        format!("<h{0} id=\"{1}\">{2}</h{0}>\n", level, id, inner_html).into(),
                    ));
                }
            }
            other => match heading.as_mut() {
                Some((_, inner)) => inner.push(other),
                None => events.push(other),
            },
        }
    }

    events
}

fn unique_anchor(used: &mut HashMap<String, u32>, text: &str) -> String {
    let mut base = generate_slug(text);
    if base.is_empty() {
        base = "section".to_string();
    }
    let count = used.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        format!("{}-{}", base, count)
    }
}

fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(' ') {
        Some(pos) if pos > max_chars / 2 => &cut[..pos],
        _ => cut.as_str(),
    };
    format!("{}…", trimmed.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let html = MarkdownRenderer::new().render("Some *emphasis* and `code`.\n\n- one\n- two");
        assert!(html.contains("<em>emphasis</em>"));
        assert!(html.contains("<code>code</code>"));
        assert!(html.contains("<li>one</li>"));
    }

    #[test]
    fn test_heading_anchors_are_unique() {
        let html = MarkdownRenderer::new().render("# Overview\n\n## Overview\n\n## Fees & Costs");
        assert!(html.contains("<h1 id=\"overview\">Overview</h1>"));
        assert!(html.contains("<h2 id=\"overview-2\">Overview</h2>"));
        assert!(html.contains("<h2 id=\"fees-costs\">Fees &amp; Costs</h2>"));
    }

    #[test]
    fn test_heading_keeps_inline_markup() {
        let html = MarkdownRenderer::new().render("### The *new* rule");
        assert!(html.contains("<h3 id=\"the-new-rule\">The <em>new</em> rule</h3>"));
    }

    #[test]
    fn test_tables_and_strikethrough() {
        let html = MarkdownRenderer::new().render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~old~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn test_plain_text() {
        let text = MarkdownRenderer::new().plain_text("# Title\n\nFirst **bold** line.\nSecond line.");
        assert_eq!(text, "Title First bold line. Second line.");
    }

    #[test]
    fn test_excerpt_truncates_at_word_boundary() {
        let renderer = MarkdownRenderer::new();
        assert_eq!(renderer.excerpt("Short post."), "Short post.");

        let long = "word ".repeat(100);
        let excerpt = renderer.excerpt(&long);
        assert!(excerpt.ends_with('…'));
        assert!(excerpt.chars().count() <= EXCERPT_LEN + 1);
        assert!(!excerpt.contains("wor…"));
    }

    #[test]
    fn test_reading_minutes() {
        let renderer = MarkdownRenderer::new();
        assert_eq!(renderer.reading_minutes(""), 1);
        assert_eq!(renderer.reading_minutes(&"word ".repeat(200)), 1);
        assert_eq!(renderer.reading_minutes(&"word ".repeat(201)), 2);
        assert_eq!(renderer.reading_minutes(&"word ".repeat(1000)), 5);
    }
}
