//! Syntax highlighting for fenced code blocks

use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

/// Highlights code blocks with a syntect theme
pub struct CodeHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
}

impl CodeHighlighter {
    /// Create a highlighter with the default dark theme
    pub fn new() -> Self {
        Self::with_options("base16-ocean.dark", false)
    }

    /// Create with custom settings
    pub fn with_options(theme: &str, line_numbers: bool) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
            line_numbers,
        }
    }

    /// Highlight a tagged code block. Unknown language tags fall back to
    /// plain-text highlighting rather than erroring.
    pub fn highlight(&self, code: &str, lang: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .unwrap_or_else(|| {
                self.theme_set
                    .themes
                    .values()
                    .next()
                    .expect("No themes available")
            });

        match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
            Ok(highlighted) => {
                if self.line_numbers {
                    self.add_line_numbers(&highlighted, lang)
                } else {
                    format!(r#"<figure class="highlight {}">{}</figure>"#, lang, highlighted)
                }
            }
            Err(_) => {
                // Fallback to plain code block
                let escaped = html_escape(code);
                format!(
                    r#"<pre><code class="language-{}">{}</code></pre>"#,
                    lang, escaped
                )
            }
        }
    }

    /// Add line numbers to highlighted code
    fn add_line_numbers(&self, code: &str, lang: &str) -> String {
        let lines: Vec<&str> = code.lines().collect();
        let line_count = lines.len();

        let mut gutter = String::new();
        let mut code_lines = String::new();

        for (i, line) in lines.iter().enumerate() {
            gutter.push_str(&format!(r#"<span class="line-number">{}</span>"#, i + 1));
            if i < line_count - 1 {
                gutter.push('\n');
            }

            code_lines.push_str(line);
            if i < line_count - 1 {
                code_lines.push('\n');
            }
        }

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code"><pre>{}</pre></td></tr></table></figure>"#,
            lang, gutter, code_lines
        )
    }
}

impl Default for CodeHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple HTML escaping
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_known_language() {
        let highlighter = CodeHighlighter::new();
        let html = highlighter.highlight("def main():\n    pass\n", "python");
        assert!(html.contains("highlight python"));
        assert!(html.contains("style="));
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain() {
        let highlighter = CodeHighlighter::new();
        let html = highlighter.highlight("whatever <tag>\n", "notalanguage");
        assert!(html.contains("highlight notalanguage"));
        assert!(!html.contains("<tag>"));
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let highlighter = CodeHighlighter::with_options("no-such-theme", false);
        let html = highlighter.highlight("fn main() {}\n", "rust");
        assert!(html.contains("highlight rust"));
    }

    #[test]
    fn test_line_numbers_gutter() {
        let highlighter = CodeHighlighter::with_options("base16-ocean.dark", true);
        let html = highlighter.highlight("a\nb\nc\n", "text");
        assert!(html.contains(r#"<td class="gutter">"#));
        assert!(html.contains(r#"<span class="line-number">3</span>"#));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }
}
