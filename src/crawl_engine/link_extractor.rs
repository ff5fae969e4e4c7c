//! Link and asset extraction from fetched markup
//!
//! Turns one page into `(url, kind, hint, score)` records. Anchors, embedded
//! frames/objects and (on topical pages only) images are considered; the
//! crawler decides separately which of them are candidates and which are
//! worth following.

use log::trace;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

use super::crawl_types::{ExtractedLink, LinkKind};
use super::scorer::{is_noise, keyword_hit, score_link};
use crate::config::DiscoveryProfile;
use crate::fetcher::html::html_to_text;
use crate::utils::{MAX_ANCHOR_TEXT, MAX_TEXT_PER_PAGE, compact_whitespace, resolve_url, safe_truncate_chars};

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("Invalid anchor selector"));

static IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("Invalid image selector"));

/// Embedding elements and the attribute holding their target
static EMBED_SELECTORS: Lazy<Vec<(&'static str, &'static str, Selector)>> = Lazy::new(|| {
    [("iframe", "src"), ("embed", "src"), ("object", "data")]
        .into_iter()
        .map(|(tag, attr)| {
            let selector = Selector::parse(&format!("{tag}[{attr}]")).expect("Invalid embed selector");
            (tag, attr, selector)
        })
        .collect()
});

/// Navigation regions scanned for entry points
static MENU_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["nav a", "header a", "[role='navigation'] a", ".menu a", ".navbar a"]
        .into_iter()
        .map(|s| Selector::parse(s).expect("Invalid menu selector"))
        .collect()
});

fn element_text(el: &ElementRef<'_>) -> String {
    let text = compact_whitespace(&el.text().collect::<Vec<_>>().join(" "));
    safe_truncate_chars(&text, MAX_ANCHOR_TEXT).to_string()
}

/// First URL of a `srcset` attribute
fn first_srcset_entry(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .next()
        .and_then(|entry| entry.split_whitespace().next())
        .filter(|url| !url.is_empty())
}

/// Extract links and assets from `html` as found on `page_url`
///
/// Output is deduplicated by (normalized url, kind), first occurrence wins.
#[must_use]
pub fn extract_links_and_assets(
    page_url: &str,
    html: &str,
    profile: &DiscoveryProfile,
) -> Vec<ExtractedLink> {
    let document = Html::parse_document(html);
    let mut found: Vec<ExtractedLink> = Vec::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        let Some(url) = resolve_url(page_url, href) else {
            continue;
        };

        let text = element_text(&anchor);
        let hint = format!("{text} {href}").trim().to_string();

        if profile.noise_veto && is_noise(&hint, profile) && !profile.topical_re.is_match(&hint) {
            continue;
        }

        let kind = LinkKind::from_url(&url);
        let score = score_link(profile, &hint, kind);
        found.push(ExtractedLink { url, kind, hint, score });
    }

    for (tag, attr, selector) in EMBED_SELECTORS.iter() {
        for el in document.select(selector) {
            let Some(src) = el.value().attr(attr).map(str::trim) else {
                continue;
            };
            let Some(url) = resolve_url(page_url, src) else {
                continue;
            };

            let hint = format!("{tag}:{attr} {src}");
            let kind = match LinkKind::from_url(&url) {
                LinkKind::Document => LinkKind::Document,
                _ => LinkKind::Page,
            };
            let score = score_link(profile, &hint, kind);
            found.push(ExtractedLink { url, kind, hint, score });
        }
    }

    if profile.collect_images {
        let page_text = html_to_text(html, MAX_TEXT_PER_PAGE);
        if profile.topical_re.is_match(&page_text) {
            for img in document.select(&IMAGE_SELECTOR) {
                let value = img.value();
                let alt = value.attr("alt").unwrap_or_default().trim();
                let title = value.attr("title").unwrap_or_default().trim();
                let hint = compact_whitespace(&format!("img {alt} {title}"));

                let sources = [
                    value.attr("src").map(str::trim).filter(|s| !s.is_empty()),
                    value.attr("srcset").and_then(first_srcset_entry),
                ];

                for src in sources.into_iter().flatten() {
                    let Some(url) = resolve_url(page_url, src) else {
                        continue;
                    };
                    if LinkKind::from_url(&url) != LinkKind::Image {
                        continue;
                    }
                    let score = score_link(profile, &hint, LinkKind::Image);
                    found.push(ExtractedLink {
                        url,
                        kind: LinkKind::Image,
                        hint: hint.clone(),
                        score,
                    });
                }
            }
        }
    }

    let mut seen = HashSet::new();
    let unique: Vec<ExtractedLink> = found
        .into_iter()
        .filter(|link| seen.insert((link.url.clone(), link.kind)))
        .collect();

    trace!(
        target: "campusscrape::crawl",
        "{page_url}: {} links/assets after dedup",
        unique.len()
    );
    unique
}

/// Navigation links whose href or text carries a menu keyword
///
/// Returned as normalized absolute URLs in document order, without duplicates.
#[must_use]
pub fn extract_menu_links(page_url: &str, html: &str, profile: &DiscoveryProfile) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for selector in MENU_SELECTORS.iter() {
        for anchor in document.select(selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };

            let href_lower = href.to_lowercase();
            let text_lower = element_text(&anchor).to_lowercase();
            let matches = profile
                .menu_keywords
                .iter()
                .any(|k| keyword_hit(&href_lower, k) || keyword_hit(&text_lower, k));
            if !matches {
                continue;
            }

            if let Some(url) = resolve_url(page_url, href)
                && seen.insert(url.clone())
            {
                links.push(url);
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srcset_first_entry() {
        assert_eq!(first_srcset_entry("a.jpg 1x, b.jpg 2x"), Some("a.jpg"));
        assert_eq!(first_srcset_entry(""), None);
    }

    #[test]
    fn menu_links_keep_keyword_matches_only() {
        let html = r#"<nav><a href="/pmb">Admisi</a><a href="/berita">Berita</a></nav>
            <header><a href="/jalur-masuk">Jalur Masuk</a><a href="/pmb">dup</a></header>"#;
        let profile = DiscoveryProfile::admission();
        let links = extract_menu_links("https://ui.ac.id", html, &profile);
        assert_eq!(
            links,
            vec![
                "https://ui.ac.id/pmb".to_string(),
                "https://ui.ac.id/jalur-masuk".to_string()
            ]
        );
    }
}
