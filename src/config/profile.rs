//! Keyword profiles that parameterize the discovery crawler
//!
//! One crawler implementation serves every extraction goal. What differs per
//! goal (where to enter the site, which words make a link interesting, which
//! words make it noise, which URLs are never worth a fetch) lives in a
//! [`DiscoveryProfile`] value handed to the crawler.

use once_cell::sync::Lazy;
use regex::Regex;

/// Admission-track vocabulary (Indonesian and English)
static ADMISSION_TRACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)\b(
            jalur\s*(pendaftaran|seleksi|masuk)
            | penerimaan\s*mahasiswa
            | mahasiswa\s*baru
            | jadwal\s*seleksi
            | tahapan\s*seleksi
            | rpl | pmb | spmb
            | snbp | snbt | snmptn | sbmptn
            | mandiri | prestasi | afirmasi | kerjasama
            | reguler | internasional
        )\b",
    )
    .expect("Invalid admission track regex")
});

/// Years, intake waves and academic periods
static DATE_HINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(20\d{2}|gelombang\s*\d+|periode\s*\d+|tahun\s*akademik)\b")
        .expect("Invalid date hint regex")
});

static CONTACT_FOCUS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(kontak|contact|alamat|lokasi|location|akredit|pddikti|ban-pt|lam)")
        .expect("Invalid contact focus regex")
});

static NARRATIVE_FOCUS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(visi|misi|vision|mission|sejarah|history|profil|profile|about|tentang)")
        .expect("Invalid narrative focus regex")
});

/// How the crawler picks its first pages for a seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStrategy {
    /// Fetch the origin, read its navigation menu and start only from
    /// same-site entry-point links found there. No entry point, no crawl.
    NavigationMenu,
    /// Start from the origin itself and report it as the first candidate.
    Seed,
}

/// Additive scoring weights for link hints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Added once per topical keyword found in the hint
    pub topical: f64,
    /// Added once per noise keyword found in the hint (negative)
    pub noise: f64,
    /// Added when the profile's focus regex matches the hint
    pub focus_bonus: f64,
    /// Added for links to documents
    pub document_bonus: f64,
    /// Added for image candidates
    pub image_bonus: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            topical: 2.0,
            noise: -1.5,
            focus_bonus: 10.0,
            document_bonus: 0.0,
            image_bonus: 1.0,
        }
    }
}

/// URL substrings mapped to a coarse traversal priority
#[derive(Debug, Clone)]
pub struct PriorityTier {
    pub markers: Vec<String>,
    pub priority: u32,
}

/// Everything goal-specific the discovery crawler needs to know
///
/// Keyword lists are matched with `crawl_engine::keyword_hit`: short
/// keywords only as whole words, longer ones as substrings.
#[derive(Debug, Clone)]
pub struct DiscoveryProfile {
    pub name: String,
    pub entry: EntryStrategy,
    /// URL substrings that mark an admission entry point
    pub entry_keywords: Vec<String>,
    /// Href/text substrings that make a navigation link worth following
    pub menu_keywords: Vec<String>,
    pub topical_keywords: Vec<String>,
    pub noise_keywords: Vec<String>,
    /// URL substrings that exclude a link from candidacy and traversal
    pub hard_reject: Vec<String>,
    /// Substrings that alone make a link a reportable candidate
    pub candidate_markers: Vec<String>,
    /// Regex that makes a link a reportable candidate and lifts the noise veto
    pub topical_re: Regex,
    /// Optional regex adding `weights.focus_bonus` to a hint's score
    pub focus_re: Option<Regex>,
    /// Years, waves and periods; used by the local validation gate
    pub date_hint_re: Regex,
    pub priority_tiers: Vec<PriorityTier>,
    pub weights: ScoreWeights,
    /// Minimum score for a link to be reported
    pub min_score: f64,
    /// Drop anchors whose hint carries noise unless `topical_re` also matches
    pub noise_veto: bool,
    /// Collect `<img>` candidates on topical pages
    pub collect_images: bool,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

impl DiscoveryProfile {
    /// Admission schedules and registration tracks
    #[must_use]
    pub fn admission() -> Self {
        Self {
            name: "admission".to_string(),
            entry: EntryStrategy::NavigationMenu,
            entry_keywords: owned(&[
                "pmb",
                "ppmb",
                "admission",
                "penerimaan",
                "pendaftaran mahasiswa baru",
            ]),
            menu_keywords: owned(&[
                "pmb",
                "pendaftaran",
                "admission",
                "registrasi",
                "mahasiswa baru",
                "snbp",
                "snbt",
                "mandiri",
                "jalur",
            ]),
            topical_keywords: owned(&[
                "jalur pendaftaran",
                "jalur seleksi",
                "jalur masuk",
                "penerimaan mahasiswa baru",
                "pmb",
                "spmb",
                "admisi",
                "admission",
                "snbp",
                "snbt",
                "snmptn",
                "sbmptn",
                "mandiri",
                "rpl",
                "jadwal seleksi",
                "tahapan seleksi",
                "prestasi",
                "cbt",
                "reguler",
                "internasional",
                "kelas internasional",
            ]),
            noise_keywords: owned(&[
                "berita",
                "news",
                "event",
                "agenda",
                "artikel",
                "press",
                "galeri",
                "gallery",
                "opini",
                "blog",
                "riset",
                "penelitian",
                "tentang kami",
                "tentang",
                "about us",
                "biaya",
                "fee",
                "ukt",
                "kontak",
                "contact",
                "lokasi",
                "location",
                "peta situs",
                "sitemap",
                "karir",
                "career",
                "alumni",
                "profil",
                "profile",
                "sejarah",
                "history",
                "visi",
                "misi",
                "kemahasiswaan",
                "beasiswa",
                "scholarship",
                "download",
                "repository",
                "perpustakaan",
                "library",
            ]),
            hard_reject: owned(&[
                "daya-tampung",
                "kuota",
                "kapasitas",
                "program-studi",
                "prodi",
                "fakultas",
                "mbkm",
                "rpl",
                "alumni",
                "berita",
                "news",
                "artikel",
                "biaya",
                "fee",
                "ukt",
                "beasiswa",
                "scholarship",
                "kontak",
                "contact",
                "lokasi",
                "location",
                "peta-situs",
                "bayar",
            ]),
            candidate_markers: owned(&["jadwal"]),
            topical_re: ADMISSION_TRACK_RE.clone(),
            focus_re: None,
            date_hint_re: DATE_HINT_RE.clone(),
            priority_tiers: vec![
                PriorityTier {
                    markers: owned(&["jadwal", "timeline"]),
                    priority: 100,
                },
                PriorityTier {
                    markers: owned(&["snbp", "snbt", "mandiri"]),
                    priority: 80,
                },
            ],
            weights: ScoreWeights::default(),
            min_score: f64::NEG_INFINITY,
            noise_veto: true,
            collect_images: true,
        }
    }

    /// Contact details, address and accreditation
    #[must_use]
    pub fn contact() -> Self {
        Self {
            name: "contact".to_string(),
            entry: EntryStrategy::Seed,
            entry_keywords: Vec::new(),
            menu_keywords: Vec::new(),
            topical_keywords: owned(&[
                "tentang",
                "about",
                "profil",
                "profile",
                "contact",
                "kontak",
                "alamat",
                "location",
                "lokasi",
                "akreditasi",
                "accreditation",
                "ban-pt",
                "lam",
                "pddikti",
                "identitas",
                "struktur",
                "organisasi",
            ]),
            noise_keywords: Vec::new(),
            hard_reject: bad_hints(),
            candidate_markers: Vec::new(),
            topical_re: CONTACT_FOCUS_RE.clone(),
            focus_re: Some(CONTACT_FOCUS_RE.clone()),
            date_hint_re: DATE_HINT_RE.clone(),
            priority_tiers: Vec::new(),
            weights: ScoreWeights {
                document_bonus: 1.0,
                ..ScoreWeights::default()
            },
            min_score: 2.0,
            noise_veto: false,
            collect_images: false,
        }
    }

    /// Vision, mission and history
    #[must_use]
    pub fn narrative() -> Self {
        Self {
            name: "narrative".to_string(),
            topical_keywords: owned(&[
                "visi",
                "misi",
                "vision",
                "mission",
                "visi-misi",
                "visimisi",
                "sejarah",
                "history",
                "tentang",
                "about",
                "profil",
                "profile",
                "sambutan",
                "welcome",
                "rektor",
                "rector",
            ]),
            topical_re: NARRATIVE_FOCUS_RE.clone(),
            focus_re: Some(NARRATIVE_FOCUS_RE.clone()),
            ..Self::contact()
        }
    }

    /// Override the minimum reportable score
    #[must_use]
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// Override the scoring weights
    #[must_use]
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }
}

fn bad_hints() -> Vec<String> {
    owned(&["login", "auth", "sso", "logout", "wp-admin", "cart", "checkout"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_regexes_match_tracks_and_dates() {
        let profile = DiscoveryProfile::admission();
        assert!(profile.topical_re.is_match("Jalur Pendaftaran SNBT"));
        assert!(profile.topical_re.is_match("penerimaan mahasiswa baru"));
        assert!(!profile.topical_re.is_match("berita kampus"));
        assert!(profile.date_hint_re.is_match("Gelombang 2"));
        assert!(profile.date_hint_re.is_match("TA 2026/2027"));
    }

    #[test]
    fn narrative_inherits_contact_entry() {
        let profile = DiscoveryProfile::narrative();
        assert_eq!(profile.entry, EntryStrategy::Seed);
        assert!(profile.hard_reject.contains(&"wp-admin".to_string()));
        assert!(profile.topical_re.is_match("Visi dan Misi"));
    }
}
