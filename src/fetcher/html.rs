//! Markup helpers shared by both fetch modes
//!
//! The HTTP fetcher has no DOM, so visible text, title and anchors are read
//! from the raw markup with `scraper`. The rendering fetcher gets the same
//! data from the live page but reuses [`challenge_marker`].

use once_cell::sync::Lazy;
use scraper::{Html, Node, Selector};
use std::collections::HashSet;

use super::OutboundLink;
use super::retry::CHALLENGE_MARKERS;
use crate::utils::{MAX_ANCHOR_TEXT, compact_whitespace, resolve_url, safe_truncate_chars};

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("Invalid title selector"));

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("Invalid anchor selector"));

/// Elements whose text is never visible
const INVISIBLE_ELEMENTS: [&str; 6] = ["script", "style", "noscript", "svg", "template", "head"];

/// Challenge pages are short; markers further into a page are ordinary prose
const CHALLENGE_SCAN_CHARS: usize = 1_000;

/// Visible text of a document, whitespace-compacted and capped at `max_chars`
#[must_use]
pub fn html_to_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 4);

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| INVISIBLE_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        out.push_str(&text.text);
        out.push(' ');
    }

    let compact = compact_whitespace(&out);
    safe_truncate_chars(&compact, max_chars).to_string()
}

/// Contents of the first `<title>`, whitespace-compacted
#[must_use]
pub fn page_title(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| compact_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

/// A `tel:` or `mailto:` href, scheme lowercased, kept as contact evidence
#[must_use]
pub fn contact_link(href: &str) -> Option<String> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    ["tel:", "mailto:"].iter().find_map(|scheme| {
        let rest = href.get(scheme.len()..)?.trim();
        (lower.starts_with(scheme) && !rest.is_empty()).then(|| format!("{scheme}{rest}"))
    })
}

/// Every `<a href>` resolved against `base_url`, first occurrence per href
///
/// Web links are absolute and normalized; `tel:` and `mailto:` links are kept
/// as written so contact details that only live in an href still count as
/// evidence.
#[must_use]
pub fn anchor_links(base_url: &str, html: &str) -> Vec<OutboundLink> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_url(base_url, href).or_else(|| contact_link(href)) else {
            continue;
        };
        if !seen.insert(resolved.clone()) {
            continue;
        }

        let text = compact_whitespace(&anchor.text().collect::<String>());
        links.push(OutboundLink {
            href: resolved,
            text: safe_truncate_chars(&text, MAX_ANCHOR_TEXT).to_string(),
        });
    }

    links
}

/// The anti-bot marker a page carries, if any
///
/// Checks the title and the first part of the visible text.
#[must_use]
pub fn challenge_marker(title: &str, text: &str) -> Option<&'static str> {
    let title = title.to_lowercase();
    let head = safe_truncate_chars(text, CHALLENGE_SCAN_CHARS).to_lowercase();

    CHALLENGE_MARKERS
        .iter()
        .copied()
        .find(|marker| title.contains(marker) || head.contains(marker))
}
