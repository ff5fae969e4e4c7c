//! The text-and-links blob every gated value is checked against

use std::collections::HashSet;

use crate::fetcher::FetchResult;

/// Page text plus outbound hrefs, as seen by the fetcher
///
/// Built from one or more [`FetchResult`]s right before gating and dropped
/// afterwards; the lowercase and digits-only views are computed once here so
/// the per-field lookups stay cheap.
#[derive(Debug, Clone, Default)]
pub struct EvidenceRecord {
    text: String,
    links: Vec<String>,
    blob: String,
    blob_lower: String,
    digits: String,
}

impl EvidenceRecord {
    #[must_use]
    pub fn new(text: impl Into<String>, links: Vec<String>) -> Self {
        let text = text.into();
        let mut blob = String::with_capacity(text.len() + links.len() * 48);
        blob.push_str(&text);
        for link in &links {
            blob.push('\n');
            blob.push_str(link);
        }

        let blob_lower = blob.to_lowercase();
        let digits = blob.chars().filter(char::is_ascii_digit).collect();

        Self {
            text,
            links,
            blob,
            blob_lower,
            digits,
        }
    }

    /// Evidence of a single fetched page
    #[must_use]
    pub fn from_fetch(result: &FetchResult) -> Self {
        Self::from_pages(std::slice::from_ref(result))
    }

    /// Evidence of several pages, texts in order and hrefs deduplicated
    #[must_use]
    pub fn from_pages(pages: &[FetchResult]) -> Self {
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        let mut texts = Vec::with_capacity(pages.len());

        for page in pages {
            let text = page.extracted_text.trim();
            if !text.is_empty() {
                texts.push(text);
            }
            for link in &page.outbound_links {
                if seen.insert(link.href.as_str()) {
                    links.push(link.href.clone());
                }
            }
        }

        Self::new(texts.join("\n\n"), links)
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Text followed by one href per line
    #[must_use]
    pub fn blob(&self) -> &str {
        &self.blob
    }

    /// All ASCII digits of the blob, in order
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.digits
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.links.is_empty()
    }

    /// Case-insensitive literal containment
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        let needle = needle.trim();
        !needle.is_empty() && self.blob_lower.contains(&needle.to_lowercase())
    }

    /// Case-insensitive containment in the page text only
    #[must_use]
    pub fn text_contains(&self, needle: &str) -> bool {
        let needle = needle.trim();
        !needle.is_empty() && self.text.to_lowercase().contains(&needle.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::OutboundLink;

    #[test]
    fn blob_carries_text_and_links() {
        let page = FetchResult {
            ok: true,
            extracted_text: "Hubungi Kami: Telp (021) 786-7222".to_string(),
            outbound_links: vec![OutboundLink {
                href: "https://instagram.com/univ_indonesia".to_string(),
                text: "IG".to_string(),
            }],
            ..FetchResult::default()
        };
        let evidence = EvidenceRecord::from_fetch(&page);

        assert!(evidence.contains("HUBUNGI kami"));
        assert!(evidence.contains("instagram.com/univ_indonesia"));
        assert!(!evidence.text_contains("instagram"));
        assert_eq!(evidence.digits(), "0217867222");
        assert!(!evidence.contains("   "));
    }
}
