//! UTF-8-safe truncation plus slug and short-name derivation
//!
//! Campus names and page text are routinely Indonesian with the odd accented
//! or non-Latin character, so every slice here respects char boundaries.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Safely truncate a string to a maximum number of CHARACTERS (not bytes).
///
/// Never panics on multi-byte characters; returns the full string when it is
/// already short enough.
///
/// ```
/// # use kodegen_tools_campusscrape::utils::string_utils::safe_truncate_chars;
/// assert_eq!(safe_truncate_chars("Hello, World!", 5), "Hello");
/// assert_eq!(safe_truncate_chars("Hi", 100), "Hi");
/// ```
#[inline]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}

/// Collapse every run of whitespace into a single space and trim the ends.
#[must_use]
pub fn compact_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

static RE_PAREN_ACRONYM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([A-Z0-9]{2,12})\)").expect("Invalid acronym regex"));

static RE_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9]+").expect("Invalid word regex"));

const SHORT_NAME_STOPWORDS: [&str; 5] = ["of", "the", "and", "&", "dan"];

const GENERIC_HOST_LABELS: [&str; 5] = ["www", "pmb", "spmb", "admisi", "admission"];

const ACADEMIC_SLDS: [&str; 3] = ["ac", "edu", "sch"];

/// Fold a display name into a URL slug.
///
/// Latin letters with diacritics are folded to ASCII, everything else that is
/// not alphanumeric becomes a separator, and separators collapse into single
/// hyphens. Returns `"item"` when nothing survives.
///
/// ```
/// # use kodegen_tools_campusscrape::utils::string_utils::slugify;
/// assert_eq!(slugify("Jalur SNBP 2026 (Sarjana)"), "jalur-snbp-2026-sarjana");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars().map(fold_diacritic) {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "item".to_string()
    } else {
        slug
    }
}

fn fold_diacritic(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        other => other,
    }
}

/// Pick the most plausible short name for an institution.
///
/// Priority: an acronym in parentheses inside the name (`"Universitas
/// Indonesia (UI)"`), then the registrable label of the website host
/// (`pmb.ugm.ac.id` gives `UGM`), then the initials of the name without
/// stopwords. Falls back to `"-"`.
#[must_use]
pub fn best_short_name(name: &str, website: &str) -> String {
    if let Some(acronym) = acronym_from_parentheses(name) {
        return acronym;
    }
    if let Some(acronym) = acronym_from_domain(website) {
        return acronym;
    }
    acronym_from_initials(name).unwrap_or_else(|| crate::utils::NO_EVIDENCE.to_string())
}

fn acronym_from_parentheses(name: &str) -> Option<String> {
    RE_PAREN_ACRONYM
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_uppercase())
}

fn acronym_from_domain(website: &str) -> Option<String> {
    let host = Url::parse(website.trim()).ok()?.host_str()?.to_ascii_lowercase();
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() < 2 {
        return None;
    }

    let under_academic_sld = parts.len() >= 3 && ACADEMIC_SLDS.contains(&parts[parts.len() - 2]);
    let mut label = if under_academic_sld {
        parts[parts.len() - 3]
    } else {
        parts[parts.len() - 2]
    };

    if GENERIC_HOST_LABELS.contains(&label) && under_academic_sld && parts.len() >= 4 {
        label = parts[parts.len() - 4];
    }

    let cleaned: String = label.chars().filter(char::is_ascii_alphanumeric).collect();
    if (2..=12).contains(&cleaned.len()) && !GENERIC_HOST_LABELS.contains(&cleaned.as_str()) {
        Some(cleaned.to_uppercase())
    } else {
        None
    }
}

fn acronym_from_initials(name: &str) -> Option<String> {
    let all: Vec<&str> = RE_WORDS.find_iter(name).map(|m| m.as_str()).collect();
    let mut words: Vec<&str> = all
        .iter()
        .copied()
        .filter(|w| !SHORT_NAME_STOPWORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    if words.is_empty() {
        words = all;
    }

    let mut acronym: String = words
        .iter()
        .filter_map(|w| w.chars().next())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    // a single letter for a multi-word name reads badly; use two
    if acronym.len() == 1 && words.len() >= 2 {
        acronym = words[..2]
            .iter()
            .filter_map(|w| w.chars().next())
            .map(|c| c.to_ascii_uppercase())
            .collect();
    }

    if acronym.is_empty() {
        None
    } else {
        Some(safe_truncate_chars(&acronym, 12).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_folds_and_collapses() {
        assert_eq!(slugify("  Universitas  Gadjah--Mada "), "universitas-gadjah-mada");
        assert_eq!(slugify("Sekolah Tinggi Ilmu Ékonomi"), "sekolah-tinggi-ilmu-ekonomi");
        assert_eq!(slugify("!!!"), "item");
    }

    #[test]
    fn short_name_priority() {
        assert_eq!(best_short_name("Universitas Indonesia (UI)", ""), "UI");
        assert_eq!(
            best_short_name("Universitas Gadjah Mada", "https://pmb.ugm.ac.id"),
            "UGM"
        );
        assert_eq!(
            best_short_name("Universitas Surabaya", "https://www.ubaya.ac.id/"),
            "UBAYA"
        );
        assert_eq!(best_short_name("Institut Teknologi Bandung", ""), "ITB");
        assert_eq!(best_short_name("University of the Sea", ""), "US");
        assert_eq!(best_short_name("", ""), "-");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(safe_truncate_chars("ééé", 2), "éé");
        assert_eq!(compact_whitespace("  a \n\t b  "), "a b");
    }
}
