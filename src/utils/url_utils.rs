//! URL normalization and same-site utilities.
//!
//! Every URL that enters the crawler's visited set, the candidate list or the
//! checkpoint key goes through [`normalize_url`] first, so two spellings of
//! the same page collapse to one identity.

use url::Url;

/// Query parameters that only carry campaign tracking and never change the
/// resource being addressed. Compared case-insensitively.
pub const TRACKING_PARAMS: [&str; 7] = [
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
];

/// Canonicalize a URL string for deduplication.
///
/// Strips the fragment, drops tracking parameters (keeping every other
/// parameter in its original order) and trims a trailing slash from the path.
/// The bare origin serializes without its slash.
///
/// Never fails: input that does not parse is returned trimmed with any
/// fragment removed, and blank input yields an empty string. The function is
/// idempotent.
///
/// # Examples
///
/// ```
/// # use kodegen_tools_campusscrape::utils::url_utils::normalize_url;
/// assert_eq!(
///     normalize_url("https://x.ac.id/a?b=1&utm_source=y#frag"),
///     "https://x.ac.id/a?b=1"
/// );
/// ```
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let Ok(mut parsed) = Url::parse(trimmed) else {
        return strip_fragment(trimmed).to_string();
    };

    parsed.set_fragment(None);

    if parsed.query().is_some() {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() {
            parsed.set_query(None);
        } else {
            parsed.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    let mut out = parsed.to_string();
    if parsed.query().is_none() && parsed.path() == "/" && out.ends_with('/') {
        out.pop();
    }
    out
}

fn strip_fragment(url: &str) -> &str {
    match url.find('#') {
        Some(idx) => url[..idx].trim_end(),
        None => url,
    }
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS
        .iter()
        .any(|param| param.eq_ignore_ascii_case(key))
}

/// Lowercased host with any leading `www.` removed. Port is never part of it.
#[must_use]
pub fn site_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    if host.is_empty() { None } else { Some(host) }
}

/// Decide whether `candidate` belongs to the same site as `base`.
///
/// Hosts are compared lowercase, ignoring port and a leading `www.`. Two
/// hosts are the same site when they are equal or one is a dot-suffix
/// subdomain of the other, so `pmb.ui.ac.id` matches `ui.ac.id` and the other
/// way round, while `notui.ac.id` does not.
#[must_use]
pub fn same_site(base: &str, candidate: &str) -> bool {
    let (Some(a), Some(b)) = (site_host(base), site_host(candidate)) else {
        return false;
    };

    a == b || a.ends_with(&format!(".{b}")) || b.ends_with(&format!(".{a}"))
}

/// Resolve `href` against `base` into a normalized absolute http(s) URL.
///
/// Returns `None` for `mailto:`, `tel:`, `javascript:` and `data:` links,
/// unresolvable references and non-web schemes.
#[must_use]
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["mailto:", "tel:", "javascript:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let base = Url::parse(base).ok()?;
    let joined = base.join(href).ok()?;
    if !matches!(joined.scheme(), "http" | "https") {
        return None;
    }

    Some(normalize_url(joined.as_str()))
}

/// Prefix a scheme-less website value with `https://`.
///
/// Seed sheets frequently carry bare hosts such as `ui.ac.id`.
#[must_use]
pub fn ensure_scheme(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fragment_and_tracking() {
        assert_eq!(
            normalize_url("https://x.ac.id/a?b=1&utm_source=y#frag"),
            "https://x.ac.id/a?b=1"
        );
        assert_eq!(
            normalize_url("https://x.ac.id/a?UTM_Medium=z&fbclid=1"),
            "https://x.ac.id/a"
        );
    }

    #[test]
    fn trims_trailing_slash() {
        assert_eq!(normalize_url("https://x.ac.id/"), "https://x.ac.id");
        assert_eq!(normalize_url("https://x.ac.id/pmb/"), "https://x.ac.id/pmb");
        assert_eq!(
            normalize_url("https://x.ac.id/pmb/?tab=2"),
            "https://x.ac.id/pmb?tab=2"
        );
    }

    #[test]
    fn malformed_input_is_best_effort() {
        assert_eq!(normalize_url("   "), "");
        assert_eq!(normalize_url("not a url#x"), "not a url");
    }

    #[test]
    fn resolve_skips_non_web_links() {
        let base = "https://ui.ac.id/pmb";
        assert_eq!(resolve_url(base, "mailto:a@ui.ac.id"), None);
        assert_eq!(resolve_url(base, "javascript:void(0)"), None);
        assert_eq!(resolve_url(base, "#top"), None);
        assert_eq!(
            resolve_url(base, "jadwal/#x").as_deref(),
            Some("https://ui.ac.id/jadwal")
        );
    }

    #[test]
    fn ensure_scheme_adds_https() {
        assert_eq!(ensure_scheme("ui.ac.id"), "https://ui.ac.id");
        assert_eq!(ensure_scheme("http://ui.ac.id"), "http://ui.ac.id");
    }
}
