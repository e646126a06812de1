//! Markdown rendering
//!
//! Turns raw markdown into article HTML. The pipeline is a single event
//! pass: fenced code blocks are routed through the syntax highlighter,
//! headings collect slugified anchor ids, and a table of contents is
//! injected after the first heading that reads like a TOC marker
//! ("Contents", "Table of Contents", "TOC", case-insensitive). Rendering
//! is pure; the same input always yields the same output.

pub mod highlight;

use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashMap;

pub use highlight::CodeHighlighter;
use highlight::html_escape;

lazy_static! {
    static ref TOC_MARKER: Regex =
        Regex::new(r"(?i)^(?:table[ -]of[ -]contents?|contents?|toc)$").unwrap();
}

/// One heading in a rendered document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Heading depth, 1 through 6
    pub level: usize,
    /// Anchor id, unique within the document
    pub id: String,
    /// Plain text of the heading
    pub text: String,
}

/// The output of rendering one markdown document
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub html: String,
    pub headings: Vec<Heading>,
}

/// Markdown renderer with syntax highlighting and TOC injection
pub struct MarkdownRenderer {
    highlighter: CodeHighlighter,
}

struct OpenHeading {
    /// Index of the Start event, patched with the final id on close
    start: usize,
    level: usize,
    explicit_id: Option<String>,
    text: String,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            highlighter: CodeHighlighter::new(),
        }
    }

    pub fn with_highlighter(highlighter: CodeHighlighter) -> Self {
        Self { highlighter }
    }

    /// Render markdown to HTML, reporting the document's headings
    pub fn render(&self, markdown: &str) -> Rendered {
        // Enable most options but NOT YAML metadata blocks; the registry
        // carries metadata, article files are body-only markdown
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_DEFINITION_LIST
            | Options::ENABLE_GFM;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        let mut headings: Vec<Heading> = Vec::new();
        let mut slug_counts: HashMap<String, usize> = HashMap::new();
        let mut open_heading: Option<OpenHeading> = None;
        // Event index to insert the TOC at and the first heading it lists
        let mut toc_insert: Option<(usize, usize)> = None;

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(info) => {
                            // Info strings can carry extras after the
                            // language token, e.g. ```python title=x
                            let token = info.split_whitespace().next().unwrap_or("");
                            if token.is_empty() {
                                None
                            } else {
                                Some(token.to_string())
                            }
                        }
                        CodeBlockKind::Indented => None,
                    };
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let block = match code_block_lang.as_deref() {
                        Some(lang) => self.highlighter.highlight(&code_block_content, lang),
                        // Untagged blocks stay plain preformatted code
                        None => format!(
                            "<pre><code>{}</code></pre>",
                            html_escape(&code_block_content)
                        ),
                    };
                    events.push(Event::Html(CowStr::from(block)));
                    in_code_block = false;
                    code_block_lang = None;
                }
                Event::Text(text) if in_code_block => {
                    code_block_content.push_str(&text);
                }
                Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }) => {
                    open_heading = Some(OpenHeading {
                        start: events.len(),
                        level: level as usize,
                        explicit_id: id.as_ref().map(|s| s.to_string()),
                        text: String::new(),
                    });
                    events.push(Event::Start(Tag::Heading {
                        level,
                        id,
                        classes,
                        attrs,
                    }));
                }
                Event::End(TagEnd::Heading(level)) => {
                    if let Some(open) = open_heading.take() {
                        let text = open.text.trim().to_string();
                        let id = assign_id(&mut slug_counts, open.explicit_id, &text, headings.len());
                        if let Event::Start(Tag::Heading { id: slot, .. }) =
                            &mut events[open.start]
                        {
                            *slot = Some(CowStr::from(id.clone()));
                        }
                        let is_marker = toc_insert.is_none() && TOC_MARKER.is_match(&text);
                        headings.push(Heading {
                            level: open.level,
                            id,
                            text,
                        });
                        events.push(Event::End(TagEnd::Heading(level)));
                        if is_marker {
                            toc_insert = Some((events.len(), headings.len()));
                        }
                    } else {
                        events.push(Event::End(TagEnd::Heading(level)));
                    }
                }
                Event::Text(text) => {
                    if let Some(open) = open_heading.as_mut() {
                        open.text.push_str(&text);
                    }
                    events.push(Event::Text(text));
                }
                Event::Code(code) => {
                    if let Some(open) = open_heading.as_mut() {
                        open.text.push_str(&code);
                    }
                    events.push(Event::Code(code));
                }
                other => events.push(other),
            }
        }

        if let Some((at, from)) = toc_insert {
            let entries = &headings[from..];
            if !entries.is_empty() {
                events.insert(at, Event::Html(CowStr::from(toc_html(entries))));
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Rendered {
            html: html_output,
            headings,
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick a heading's anchor id: an explicit `{#id}` attribute wins, else the
/// slugified text. Repeated ids get a -2, -3, ... suffix.
fn assign_id(
    counts: &mut HashMap<String, usize>,
    explicit: Option<String>,
    text: &str,
    index: usize,
) -> String {
    let base = match explicit {
        Some(id) => id,
        None => {
            let slugged = slug::slugify(text);
            if slugged.is_empty() {
                // Punctuation-only headings still need an anchor
                format!("section-{}", index + 1)
            } else {
                slugged
            }
        }
    };
    let seen = counts.entry(base.clone()).or_insert(0);
    *seen += 1;
    if *seen == 1 {
        base
    } else {
        format!("{}-{}", base, *seen)
    }
}

/// Build the nested TOC list, levels normalized so the shallowest entry
/// sits at the top
fn toc_html(entries: &[Heading]) -> String {
    let min_level = entries.iter().map(|h| h.level).min().unwrap_or(1);
    let mut html = r#"<nav class="toc"><ol class="toc-list">"#.to_string();
    let mut current_level = min_level;

    for heading in entries {
        let level = heading.level.max(min_level);
        while current_level < level {
            html.push_str(r#"<ol class="toc-list">"#);
            current_level += 1;
        }
        while current_level > level {
            html.push_str("</ol>");
            current_level -= 1;
        }
        html.push_str(&format!(
            "<li class=\"toc-item toc-level-{}\"><a class=\"toc-link\" href=\"#{}\">{}</a></li>",
            level,
            heading.id,
            html_escape(&heading.text)
        ));
    }

    while current_level > min_level {
        html.push_str("</ol>");
        current_level -= 1;
    }
    html.push_str("</ol></nav>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("# Hello World\n\nThis is a test.");
        assert!(out.html.contains(r#"<h1 id="hello-world">Hello World</h1>"#));
        assert!(out.html.contains("<p>This is a test.</p>"));
        assert_eq!(out.headings.len(), 1);
        assert_eq!(out.headings[0].id, "hello-world");
        assert_eq!(out.headings[0].level, 1);
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = MarkdownRenderer::new();
        let markdown = "# Contents\n\n## One\n\n```python\nx = 1\n```\n\n## Two\n";
        let first = renderer.render(markdown);
        let second = renderer.render(markdown);
        assert_eq!(first.html, second.html);
        assert_eq!(first.headings, second.headings);
    }

    #[test]
    fn test_empty_input_renders_empty() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("");
        assert_eq!(out.html, "");
        assert!(out.headings.is_empty());
    }

    #[test]
    fn test_gfm_table() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(out.html.contains("<table>"));
        assert!(out.html.contains("<td>1</td>"));
    }

    #[test]
    fn test_gfm_strikethrough_and_tasklist() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("~~gone~~\n\n- [x] done\n- [ ] open\n");
        assert!(out.html.contains("<del>gone</del>"));
        assert!(out.html.contains("checkbox"));
    }

    #[test]
    fn test_tagged_code_block_highlighted() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("```python\ndef main():\n    pass\n```\n");
        assert!(out.html.contains("highlight python"));
        assert!(out.html.contains("style="));
    }

    #[test]
    fn test_untagged_code_block_stays_plain() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("```\nplain <text>\n```\n");
        assert!(out.html.contains("<pre><code>plain &lt;text&gt;\n</code></pre>"));
        assert!(!out.html.contains("highlight"));
    }

    #[test]
    fn test_indented_code_block_stays_plain() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("para\n\n    indented code\n");
        assert!(out.html.contains("<pre><code>indented code\n</code></pre>"));
    }

    #[test]
    fn test_code_block_info_string_extras_ignored() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("```rust ignore\nfn main() {}\n```\n");
        assert!(out.html.contains("highlight rust"));
    }

    #[test]
    fn test_heading_ids_deduplicated() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("## Setup\n\n## Setup\n\n## Setup\n");
        let ids: Vec<&str> = out.headings.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["setup", "setup-2", "setup-3"]);
        assert!(out.html.contains(r#"<h2 id="setup-3">"#));
    }

    #[test]
    fn test_explicit_heading_id_honored() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("## Install {#getting-started}\n");
        assert_eq!(out.headings[0].id, "getting-started");
        assert!(out.html.contains(r#"<h2 id="getting-started">"#));
    }

    #[test]
    fn test_inline_code_in_heading_text() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("## Using `async` functions\n");
        assert_eq!(out.headings[0].text, "Using async functions");
        assert_eq!(out.headings[0].id, "using-async-functions");
    }

    #[test]
    fn test_toc_injected_after_marker() {
        let renderer = MarkdownRenderer::new();
        let markdown = "\
# My Post

## Table of Contents

## Install

### From source

## Usage
";
        let out = renderer.render(markdown);
        assert!(out.html.contains(r#"<nav class="toc">"#));
        assert!(out.html.contains(r##"<a class="toc-link" href="#install">Install</a>"##));
        assert!(out.html.contains(r##"href="#from-source""##));
        assert!(out.html.contains(r##"href="#usage""##));

        // The list sits after the marker heading and before the entries
        let marker_end = out.html.find("Table of Contents</h2>").unwrap();
        let nav = out.html.find("<nav").unwrap();
        let install = out.html.find(r#"<h2 id="install">"#).unwrap();
        assert!(marker_end < nav);
        assert!(nav < install);

        // The title above the marker is not listed
        assert!(!out.html.contains(r##"toc-link" href="#my-post""##));
    }

    #[test]
    fn test_toc_marker_case_insensitive() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("## TOC\n\n## After\n");
        assert!(out.html.contains(r#"<nav class="toc">"#));
        assert!(out.html.contains(r##"href="#after""##));
    }

    #[test]
    fn test_no_marker_no_toc() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("# Title\n\n## Section\n\nbody\n");
        assert!(!out.html.contains(r#"<nav class="toc">"#));
    }

    #[test]
    fn test_marker_with_nothing_following_injects_nothing() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("# Title\n\n## Contents\n\nclosing words\n");
        assert!(!out.html.contains("<nav"));
    }

    #[test]
    fn test_only_first_marker_counts() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("## Contents\n\n## Contents\n\n## Real\n");
        // One injected list, and the second marker-looking heading is a
        // plain entry in it
        assert_eq!(out.html.matches("<nav").count(), 1);
        assert!(out.html.contains(r##"href="#contents-2""##));
    }

    #[test]
    fn test_toc_nesting_normalized() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("## Contents\n\n### Deep One\n\n### Deep Two\n");
        assert!(out.html.contains(r#"<li class="toc-item toc-level-3">"#));
        // Both entries sit at the top of the list, not one level down
        assert!(!out.html.contains(r#"<ol class="toc-list"><ol class="toc-list">"#));
    }

    #[test]
    fn test_marker_text_must_match_exactly() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("## Contents of the box\n\n## After\n");
        assert!(!out.html.contains("<nav"));
    }
}
