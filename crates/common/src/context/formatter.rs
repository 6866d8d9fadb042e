//! Context Formatter - renders filtered candidates for the prompt
//!
//! Each surviving candidate becomes one block with title, client,
//! description, technologies and its similarity score. Source URLs are
//! tier-gated: `simple` never carries a URL, `medium` and `hard` always do.

use super::relevance::FilteredContext;
use super::tier::ComplexityTier;
use crate::search::Candidate;
use regex_lite::Regex;
use std::borrow::Cow;
use std::fmt::Write;
use std::sync::OnceLock;

const UNTITLED: &str = "Untitled project";
const UNKNOWN_CLIENT: &str = "Client not specified";
const NO_CONTEXT: &str = "No matching projects were found in the portfolio.";

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)(?:https?://|www\.)\S+").expect("url pattern is valid"))
}

/// Renders a [`FilteredContext`] into tier-specific prompt text
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFormatter;

impl ContextFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Render all surviving candidates, one block each, in their given order
    pub fn render(&self, context: &FilteredContext, tier: ComplexityTier) -> String {
        if context.is_empty() {
            return NO_CONTEXT.to_string();
        }

        context
            .candidates
            .iter()
            .enumerate()
            .map(|(i, candidate)| self.render_block(i + 1, candidate, tier))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_block(&self, position: usize, candidate: &Candidate, tier: ComplexityTier) -> String {
        let meta = &candidate.metadata;
        let field = |value: &str, fallback: &'static str| -> String {
            let value = if value.trim().is_empty() { fallback } else { value };
            scrub(value, tier).into_owned()
        };

        let technologies = meta
            .technologies
            .iter()
            .map(|t| scrub(t, tier).into_owned())
            .collect::<Vec<_>>()
            .join(", ");

        let mut block = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(
            block,
            "Project {} (relevance: {:.3}): {}",
            position,
            candidate.score,
            field(&meta.title, UNTITLED)
        );
        let _ = writeln!(block, "Client: {}", field(&meta.client, UNKNOWN_CLIENT));
        let _ = writeln!(block, "Description: {}", field(&meta.description, ""));
        let _ = writeln!(block, "Technologies: {}", technologies);

        if tier.includes_sources() {
            let _ = writeln!(block, "Source: {}", meta.url.trim());
        }

        block
    }
}

/// Simple tier carries no links at all, even ones embedded in free text
fn scrub(value: &str, tier: ComplexityTier) -> Cow<'_, str> {
    if tier.includes_sources() {
        Cow::Borrowed(value)
    } else {
        url_pattern().replace_all(value, "")
    }
}
