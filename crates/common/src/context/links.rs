//! Source extraction from generated answers
//!
//! References are not stored alongside an answer; they are read back out of
//! its markdown `[label](url)` links when a transport needs them.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link pattern is valid"))
}

/// One `[label](url)` occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub label: String,
    pub url: String,
}

/// Every markdown link in `text`, left to right. Empty when there are none.
pub fn extract_links(text: &str) -> Vec<SourceLink> {
    link_pattern()
        .captures_iter(text)
        .filter_map(|cap| {
            Some(SourceLink {
                label: cap.get(1)?.as_str().to_string(),
                url: cap.get(2)?.as_str().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_in_order() {
        let text = "We built [Shelf AI](https://eora.ru/cases/magnit) for Magnit and \
                    [a chatbot](https://eora.ru/cases/s7) for S7. See also [docs](https://eora.ru).";
        let links = extract_links(text);

        assert_eq!(links.len(), 3);
        assert_eq!(links[0], SourceLink {
            label: "Shelf AI".to_string(),
            url: "https://eora.ru/cases/magnit".to_string(),
        });
        assert_eq!(links[1].label, "a chatbot");
        assert_eq!(links[2].url, "https://eora.ru");
    }

    #[test]
    fn test_no_links() {
        assert!(extract_links("Plain answer with https://bare.url and [brackets] (parens).").is_empty());
        assert!(extract_links("").is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let text = "[A](u1) then [A](u1) again";
        assert_eq!(extract_links(text).len(), 2);
    }

    #[test]
    fn test_malformed_links_skipped() {
        let text = "[]() [label]() [](url) [ok](https://ok)";
        let links = extract_links(text);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].label, "ok");
    }
}
