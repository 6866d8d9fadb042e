//! Text transforms for chat transports
//!
//! Answers come out of generation as light markdown. Messaging platforms
//! that accept an HTML subset need them rewritten, and they cap message
//! length, so long answers are split before sending.

use regex_lite::{Captures, Regex};
use std::sync::OnceLock;

/// Message size cap of the reference chat platform, in characters
pub const CHAT_MESSAGE_LIMIT: usize = 4096;

/// Prefix put in front of every rendered answer
pub const ANSWER_MARKER: &str = "💡 ";

struct Patterns {
    link: Regex,
    bold: Regex,
    italic: Regex,
    header: Regex,
    url: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        link: Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link pattern is valid"),
        bold: Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern is valid"),
        italic: Regex::new(r"\*([^*]+)\*").expect("italic pattern is valid"),
        header: Regex::new(r"###\s*([^\n]+)").expect("header pattern is valid"),
        url: Regex::new(r#"https?://[^\s<>"]+"#).expect("url pattern is valid"),
    })
}

/// Rewrite markdown links, emphasis and `###` headers as HTML and turn bare
/// URLs into anchors
pub fn markdown_to_chat_html(text: &str) -> String {
    let p = patterns();

    let html = p.link.replace_all(text, |c: &Captures| format!(r#"<a href="{}">{}</a>"#, &c[2], &c[1]));
    let html = p.bold.replace_all(&html, "<b>$1</b>");
    let html = p.italic.replace_all(&html, "<i>$1</i>");
    let html = p.header.replace_all(&html, "<b>$1</b>");
    let html = link_bare_urls(&html);

    format!("{}{}", ANSWER_MARKER, html)
}

/// URLs anywhere inside an anchor (its href or its text) are left alone
fn link_bare_urls(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for m in patterns().url.find_iter(html) {
        out.push_str(&html[last..m.start()]);
        if inside_anchor(&html[..m.start()]) {
            out.push_str(m.as_str());
        } else {
            out.push_str(&format!(r#"<a href="{0}">{0}</a>"#, m.as_str()));
        }
        last = m.end();
    }

    out.push_str(&html[last..]);
    out
}

/// Whether the text so far ends inside an open `<a ...>` element
fn inside_anchor(before: &str) -> bool {
    match (before.rfind("<a "), before.rfind("</a>")) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Split `text` into chunks of at most `limit` characters, breaking between
/// lines where possible. A single line longer than `limit` is cut mid-line.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        for piece in chars.chunks(limit) {
            if piece.len() == limit {
                chunks.push(piece.iter().collect());
            } else {
                current = piece.iter().collect();
                current_len = piece.len();
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_link_becomes_anchor() {
        let html = markdown_to_chat_html("We built [Shelf AI](https://eora.ru/cases/magnit).");
        assert_eq!(html, r#"💡 We built <a href="https://eora.ru/cases/magnit">Shelf AI</a>."#);
    }

    #[test]
    fn test_emphasis_and_headers() {
        let html = markdown_to_chat_html("### Retail\n**Magnit** used *computer vision*");
        assert_eq!(html, "💡 <b>Retail</b>\n<b>Magnit</b> used <i>computer vision</i>");
    }

    #[test]
    fn test_bare_url_linked_once() {
        let html = markdown_to_chat_html("See https://eora.ru and [case](https://eora.ru/cases/s7)");
        assert_eq!(
            html,
            r#"💡 See <a href="https://eora.ru">https://eora.ru</a> and <a href="https://eora.ru/cases/s7">case</a>"#
        );
    }

    #[test]
    fn test_url_as_link_label_not_doubled() {
        let html = markdown_to_chat_html("[https://eora.ru](https://eora.ru)");
        assert_eq!(html, r#"💡 <a href="https://eora.ru">https://eora.ru</a>"#);
    }

    #[test]
    fn test_url_inside_label_text_not_nested() {
        let html = markdown_to_chat_html("[see https://eora.ru](https://eora.ru) then https://eora.ru/cases");
        assert_eq!(
            html,
            r#"💡 <a href="https://eora.ru">see https://eora.ru</a> then <a href="https://eora.ru/cases">https://eora.ru/cases</a>"#
        );
        assert_eq!(html.matches("<a ").count(), 2);
    }

    #[test]
    fn test_plain_text_only_prefixed() {
        assert_eq!(markdown_to_chat_html("Hello"), "💡 Hello");
    }

    #[test]
    fn test_short_message_single_chunk() {
        assert_eq!(split_message("one\ntwo", CHAT_MESSAGE_LIMIT), vec!["one\ntwo"]);
        assert!(split_message("", CHAT_MESSAGE_LIMIT).is_empty());
    }

    #[test]
    fn test_split_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = split_message(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n", "cccc"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_long_line_is_cut() {
        let chunks = split_message("abcdefghij\nxy", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij\n", "xy"]);
    }

    #[test]
    fn test_limit_counts_chars_not_bytes() {
        let text = "привет\nмир";
        let chunks = split_message(text, 7);
        assert_eq!(chunks, vec!["привет\n", "мир"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 7));
    }
}
