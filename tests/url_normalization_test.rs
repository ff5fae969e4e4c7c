//! URL normalization and same-site properties

use kodegen_tools_campusscrape::utils::{ensure_scheme, normalize_url, resolve_url, same_site};
use proptest::prelude::*;

fn url_strategy() -> impl Strategy<Value = String> {
    "https://(www\\.)?[a-z]{1,8}\\.ac\\.id(/[a-z0-9\\-]{1,6}){0,3}/?(\\?[a-z]{1,4}=[a-z0-9]{0,4}(&utm_source=[a-z]{1,4})?)?(#[a-z]{0,4})?"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn normalization_is_idempotent(url in url_strategy()) {
        let once = normalize_url(&url);
        prop_assert_eq!(normalize_url(&once), once.clone());
    }

    #[test]
    fn normalized_urls_carry_no_fragment_or_tracking(url in url_strategy()) {
        let normalized = normalize_url(&url);
        prop_assert!(!normalized.contains('#'));
        prop_assert!(!normalized.contains("utm_source"));
    }

    #[test]
    fn same_site_is_symmetric(sub in "[a-z]{1,6}", host in "[a-z]{2,8}") {
        let base = format!("https://{host}.ac.id");
        let child = format!("https://{sub}.{host}.ac.id/pmb");
        prop_assert!(same_site(&base, &child));
        prop_assert!(same_site(&child, &base));
    }
}

#[test]
fn trailing_slash_and_bare_origin() {
    assert_eq!(normalize_url("https://ui.ac.id/"), "https://ui.ac.id");
    assert_eq!(normalize_url("https://ui.ac.id/pmb/"), "https://ui.ac.id/pmb");
    assert_eq!(
        normalize_url("https://ui.ac.id/pmb?utm_medium=x&jalur=snbp#top"),
        "https://ui.ac.id/pmb?jalur=snbp"
    );
    assert_eq!(normalize_url("   "), "");
}

#[test]
fn same_site_rejects_lookalike_hosts() {
    assert!(same_site("https://www.ui.ac.id", "https://ui.ac.id/a"));
    assert!(same_site("https://ui.ac.id", "http://pmb.ui.ac.id:8080/"));
    assert!(!same_site("https://ui.ac.id", "https://notui.ac.id"));
    assert!(!same_site("https://ui.ac.id", "not a url"));
}

#[test]
fn resolve_skips_non_web_links() {
    let base = "https://ui.ac.id/pmb/";
    assert_eq!(
        resolve_url(base, "jadwal").as_deref(),
        Some("https://ui.ac.id/pmb/jadwal")
    );
    assert_eq!(resolve_url(base, "mailto:pmb@ui.ac.id"), None);
    assert_eq!(resolve_url(base, "tel:021123"), None);
    assert_eq!(resolve_url(base, "javascript:void(0)"), None);
    assert_eq!(resolve_url(base, "#"), None);
}

#[test]
fn scheme_is_added_once() {
    assert_eq!(ensure_scheme("ui.ac.id"), "https://ui.ac.id");
    assert_eq!(ensure_scheme("http://ui.ac.id"), "http://ui.ac.id");
    assert_eq!(ensure_scheme(""), "");
}
