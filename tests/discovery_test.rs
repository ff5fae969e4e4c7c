//! Discovery crawler behavior against an in-memory site

use kodegen_tools_campusscrape::config::DiscoveryProfile;
use kodegen_tools_campusscrape::crawl_engine::{CrawlState, DiscoveryCrawler, DiscoveryLimits, LinkKind};
use kodegen_tools_campusscrape::fetcher::RetryPolicy;
use std::collections::HashSet;
use std::time::Duration;

mod common;
use common::{Site, SiteBackend, challenge_page};

const ORIGIN: &str = "https://kampus.ac.id";

fn no_wait() -> RetryPolicy {
    RetryPolicy {
        attempts: 1,
        base_sleep: Duration::ZERO,
        ..RetryPolicy::default()
    }
}

fn limits(max_pages: usize) -> DiscoveryLimits {
    DiscoveryLimits {
        max_pages,
        ..DiscoveryLimits::default()
    }
}

fn admission_site() -> Site {
    Site::new()
        .page(
            ORIGIN,
            r#"<nav><a href="/">Beranda</a><a href="/pmb">PMB</a></nav><p>Selamat datang</p>"#,
        )
        .page(
            "https://kampus.ac.id/pmb",
            r#"<h1>Penerimaan Mahasiswa Baru</h1>
               <a href="/pmb/jadwal-snbt">Jadwal SNBT 2026</a>
               <a href="/pmb/jalur-mandiri">Jalur Mandiri</a>
               <a href="/berita/wisuda">Berita wisuda</a>
               <a href="https://other.ac.id/pmb/jadwal">Jadwal kampus lain</a>
               <a href="/pmb/brosur.pdf">Brosur PMB 2026</a>"#,
        )
        .page(
            "https://kampus.ac.id/pmb/jadwal-snbt",
            r#"<p>Jadwal Seleksi SNBT 2026</p><a href="/pmb">Kembali ke PMB</a>"#,
        )
        .page(
            "https://kampus.ac.id/pmb/jalur-mandiri",
            r#"<p>Jalur Mandiri gelombang 1</p><a href="/pmb/jadwal-snbt">Jadwal SNBT</a>"#,
        )
}

#[tokio::test]
async fn admission_discovery_reports_schedule_links() {
    let backend = SiteBackend::new(admission_site());
    let session = backend.session();
    let crawler = DiscoveryCrawler::new(DiscoveryProfile::admission(), limits(20), no_wait());

    let report = crawler.discover("1:https://kampus.ac.id", ORIGIN, &session).await;

    assert_eq!(report.state, CrawlState::Exhausted);
    assert_eq!(report.entry_points, vec!["https://kampus.ac.id/pmb".to_string()]);
    assert!(!report.origin_failed);

    let urls: Vec<&str> = report.candidates.iter().map(|c| c.url.as_str()).collect();
    assert!(urls.contains(&"https://kampus.ac.id/pmb/jadwal-snbt"));
    assert!(urls.contains(&"https://kampus.ac.id/pmb/jalur-mandiri"));
    assert!(!urls.iter().any(|u| u.contains("berita")));

    // Another institution's schedule is neither reported nor fetched
    assert!(!urls.contains(&"https://other.ac.id/pmb/jadwal"));
    assert!(!backend.fetched().iter().any(|u| u.contains("other.ac.id")));

    let brochure = report
        .candidates
        .iter()
        .find(|c| c.url.ends_with("brosur.pdf"))
        .expect("document candidate");
    assert_eq!(brochure.kind, LinkKind::Document);
    assert_eq!(brochure.source_page, "https://kampus.ac.id/pmb");
}

#[tokio::test]
async fn discovery_never_fetches_a_page_twice() {
    let backend = SiteBackend::new(admission_site());
    let session = backend.session();
    let crawler = DiscoveryCrawler::new(DiscoveryProfile::admission(), limits(20), no_wait());

    crawler.discover("kampus", ORIGIN, &session).await;

    let fetched = backend.fetched();
    let unique: HashSet<&String> = fetched.iter().collect();
    assert_eq!(unique.len(), fetched.len(), "revisited: {fetched:?}");
}

#[tokio::test]
async fn page_budget_includes_the_origin() {
    let mut site = Site::new().page(ORIGIN, r#"<nav><a href="/pmb">PMB</a></nav>"#);
    let mut hub = String::new();
    for i in 0..10 {
        hub.push_str(&format!(r#"<a href="/pmb/jalur-{i}">Jalur masuk {i}</a>"#));
        site = site.page(
            &format!("https://kampus.ac.id/pmb/jalur-{i}"),
            "<p>Jalur masuk</p>",
        );
    }
    let site = site.page("https://kampus.ac.id/pmb", &hub);

    let backend = SiteBackend::new(site);
    let session = backend.session();
    let crawler = DiscoveryCrawler::new(DiscoveryProfile::admission(), limits(3), no_wait());

    let report = crawler.discover("kampus", ORIGIN, &session).await;

    assert_eq!(report.pages_visited, 3);
    assert_eq!(backend.fetched().len(), 3);
    // Links seen on fetched pages are still reported
    assert_eq!(
        report
            .candidates
            .iter()
            .filter(|c| c.url.contains("/pmb/jalur-"))
            .count(),
        10
    );
}

#[tokio::test]
async fn no_entry_point_means_no_crawl() {
    let site = Site::new().page(
        ORIGIN,
        r#"<nav><a href="/">Beranda</a><a href="/tentang">Tentang</a></nav>"#,
    );
    let backend = SiteBackend::new(site);
    let session = backend.session();
    let crawler = DiscoveryCrawler::new(DiscoveryProfile::admission(), limits(20), no_wait());

    let report = crawler.discover("kampus", ORIGIN, &session).await;

    assert_eq!(report.state, CrawlState::Exhausted);
    assert!(report.entry_points.is_empty());
    assert!(report.candidates.is_empty());
    assert_eq!(backend.fetched(), vec![ORIGIN.to_string()]);
}

#[tokio::test]
async fn blocked_origin_is_reported() {
    let site = Site::new().result(ORIGIN, challenge_page(ORIGIN));
    let backend = SiteBackend::new(site);
    let session = backend.session();
    let crawler = DiscoveryCrawler::new(DiscoveryProfile::admission(), limits(20), no_wait());

    let report = crawler.discover("kampus", ORIGIN, &session).await;

    assert!(report.origin_failed);
    assert!(report.blocked);
    assert!(report.candidates.is_empty());
}

#[tokio::test]
async fn contact_discovery_starts_at_the_origin() {
    let site = Site::new().page(
        ORIGIN,
        r#"<a href="/kontak">Kontak</a><a href="/login">Login</a><a href="/galeri">Galeri</a>"#,
    );
    let backend = SiteBackend::new(site);
    let session = backend.session();
    let crawler = DiscoveryCrawler::new(DiscoveryProfile::contact(), limits(5), no_wait());

    let report = crawler.discover("kampus", ORIGIN, &session).await;

    assert_eq!(report.entry_points, vec![ORIGIN.to_string()]);
    assert_eq!(report.candidates[0].url, ORIGIN);
    let urls: Vec<&str> = report.candidates.iter().map(|c| c.url.as_str()).collect();
    assert!(urls.contains(&"https://kampus.ac.id/kontak"));
    assert!(!urls.iter().any(|u| u.contains("login")));
    assert!(!backend.fetched().iter().any(|u| u.contains("login")));
}
