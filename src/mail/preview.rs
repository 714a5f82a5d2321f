//! Short plain-text snippets for mailbox list views.
//!
//! The HTML path is a tag stripper, not a renderer: line-breaking tags become
//! whitespace, every other tag is dropped, entities are decoded against the
//! full HTML5 table.
//!
//! Both paths then collapse every whitespace run, line breaks included, to a
//! single space, so a preview is always one line.

use regex::Regex;
use std::sync::OnceLock;

pub const PREVIEW_MAX_CHARS: usize = 200;
const ELLIPSIS: &str = "...";

/// Prefer the plain-text body; fall back to the HTML body converted to text.
pub fn generate_preview(plain_text: &str, html_body: &str) -> String {
    let text = if plain_text.trim().is_empty() {
        html_to_text(html_body)
    } else {
        clean_text(plain_text)
    };
    truncate(&text)
}

pub fn html_to_text(html: &str) -> String {
    let text = line_break_regex().replace_all(html, "\n");
    let text = tag_regex().replace_all(&text, "");
    clean_text(&html_escape::decode_html_entities(&text))
}

/// Whitespace runs collapse to one space; control and zero-width characters are removed.
fn clean_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if is_printable(c) {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    out
}

fn is_printable(c: char) -> bool {
    !c.is_control()
        && !matches!(
            c,
            '\u{00AD}'
                | '\u{200B}'..='\u{200F}'
                | '\u{202A}'..='\u{202E}'
                | '\u{2060}'..='\u{2064}'
                | '\u{FEFF}'
                | '\u{FFFD}'
        )
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_MAX_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

fn line_break_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)<br\s*/?>|</p\s*>|</div\s*>").expect("valid line break regex"))
}

fn tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid HTML tag regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_tags_are_stripped() {
        assert_eq!(generate_preview("", "<p>Hello</p>"), "Hello");
        assert_eq!(
            generate_preview("", "<div>Line one</div><div>Line<br/>two</div>"),
            "Line one Line two"
        );
    }

    #[test]
    fn plain_text_wins_over_html() {
        assert_eq!(generate_preview("  plain\tbody\r\n", "<p>html</p>"), "plain body");
    }

    #[test]
    fn entities_and_zero_width_spaces() {
        assert_eq!(
            generate_preview("", "Fish &amp; chips&#8203; &lt;3 &#x41;&nbsp;&bogus;"),
            "Fish & chips <3 A &bogus;"
        );
        assert_eq!(generate_preview("a\u{200B}b\u{0007}c", ""), "abc");
    }

    #[test]
    fn named_entities_beyond_ascii() {
        assert_eq!(
            generate_preview("", "<p>caf&eacute; &hearts; &laquo;x&raquo; &#39;q&#39;</p>"),
            "café ♥ «x» 'q'"
        );
    }

    #[test]
    fn long_text_is_cut_at_200_chars() {
        let long = "é".repeat(450);
        let preview = generate_preview(&long, "");
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS + 3);
        assert!(preview.ends_with("..."));

        let exact = "x".repeat(PREVIEW_MAX_CHARS);
        assert_eq!(generate_preview(&exact, ""), exact);
    }

    #[test]
    fn truncated_preview_has_no_hidden_characters() {
        let noisy = "ab\u{200B}\u{0001}c ".repeat(120);
        let preview = generate_preview("", &noisy);
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS + 3);
        assert!(preview.chars().all(|c| !c.is_control() && c != '\u{200B}'));
    }

    #[test]
    fn empty_bodies_give_empty_preview() {
        assert_eq!(generate_preview("", ""), "");
        assert_eq!(generate_preview("   ", "<br>"), "");
    }
}
