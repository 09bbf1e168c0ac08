//! Markup-to-text reduction
//!
//! Most of a crawled page is navigation, styling and scripts. The reducer walks
//! the parsed document, drops denylisted elements with their subtrees and keeps
//! the remaining text.

use crate::config::ReducerConfig;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Turns raw page markup into cleaned plain text
pub trait MarkupReducer: Send + Sync {
    fn reduce(&self, markup: &str) -> String;
}

/// HTML reducer driven by tag and class/id denylists
#[derive(Debug, Clone)]
pub struct HtmlReducer {
    strip_tags: HashSet<String>,
    strip_identifiers: HashSet<String>,
}

impl HtmlReducer {
    pub fn new(config: &ReducerConfig) -> Self {
        Self {
            strip_tags: config
                .strip_tags
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            strip_identifiers: config.strip_identifiers.iter().cloned().collect(),
        }
    }

    /// Returns true if the element and everything under it should be dropped
    fn is_stripped(&self, element: &ElementRef<'_>) -> bool {
        let value = element.value();

        if self.strip_tags.contains(value.name()) {
            return true;
        }

        if value
            .id()
            .map_or(false, |id| self.strip_identifiers.contains(id))
        {
            return true;
        }

        value
            .classes()
            .any(|class| self.strip_identifiers.contains(class))
    }

    fn collect_text<'a>(&self, element: ElementRef<'a>, out: &mut Vec<&'a str>) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                out.push(&**text);
            } else if let Some(child_element) = ElementRef::wrap(child) {
                if !self.is_stripped(&child_element) {
                    self.collect_text(child_element, out);
                }
            }
        }
    }
}

impl Default for HtmlReducer {
    fn default() -> Self {
        Self::new(&ReducerConfig::default())
    }
}

impl MarkupReducer for HtmlReducer {
    fn reduce(&self, markup: &str) -> String {
        let document = Html::parse_document(markup);
        let root = document.root_element();

        let mut fragments = Vec::new();
        if !self.is_stripped(&root) {
            self.collect_text(root, &mut fragments);
        }

        collapse_whitespace(&fragments.join(" "))
    }
}

fn line_breaks() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\r\n]+").expect("static regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").expect("static regex"))
}

fn entity_literals() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&[a-z]+;").expect("static regex"))
}

/// Drops leftover entity literals, then collapses line-break runs to one
/// newline and other whitespace runs to one space
fn collapse_whitespace(text: &str) -> String {
    let text = entity_literals().replace_all(text, "");
    let text = line_breaks().replace_all(&text, "\n");
    let text = whitespace_runs().replace_all(&text, " ");
    text.trim().to_string()
}
