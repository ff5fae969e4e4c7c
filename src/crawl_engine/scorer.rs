//! Candidate scoring and filtering
//!
//! Scores are linear and unclamped: each topical keyword present in a hint
//! adds a fixed weight, each noise keyword subtracts one. The numbers only
//! rank links against each other, they are not probabilities.

use crate::config::{DiscoveryProfile, ScoreWeights};

use super::crawl_types::LinkKind;

/// Priority of any URL that matches no tier
pub const BASE_PRIORITY: u32 = 10;

/// Priority of an entry-point URL with no stronger marker
pub const ENTRY_PRIORITY: u32 = 60;

/// Keywords this short only match as a whole word
pub const SHORT_KEYWORD_MAX: usize = 4;

/// Whether `keyword` occurs in the lowercased `haystack`
///
/// Keywords of up to [`SHORT_KEYWORD_MAX`] bytes must not touch a letter on
/// either side, so `fee` skips "feedback" and `lam` skips "islam". Digits and
/// punctuation count as boundaries (`pmb2026`, `pmb.kampus.ac.id`). Longer
/// keywords match as plain substrings.
#[must_use]
pub fn keyword_hit(haystack: &str, keyword: &str) -> bool {
    if keyword.is_empty() {
        return false;
    }
    if keyword.len() > SHORT_KEYWORD_MAX {
        return haystack.contains(keyword);
    }

    haystack.match_indices(keyword).any(|(start, hit)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + hit.len()..].chars().next();
        !before.is_some_and(char::is_alphabetic) && !after.is_some_and(char::is_alphabetic)
    })
}

fn any_keyword(haystack: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| keyword_hit(haystack, k))
}

/// Score a link hint against keyword lists
///
/// The hint is lowercased; every keyword contributes once regardless of how
/// often it occurs.
#[must_use]
pub fn score_hint(hint: &str, topical: &[String], noise: &[String], weights: &ScoreWeights) -> f64 {
    let blob = hint.to_lowercase();
    let topical_hits = topical.iter().filter(|k| keyword_hit(&blob, k)).count();
    let noise_hits = noise.iter().filter(|k| keyword_hit(&blob, k)).count();

    topical_hits as f64 * weights.topical + noise_hits as f64 * weights.noise
}

/// Full score for an extracted link under `profile`
#[must_use]
pub fn score_link(profile: &DiscoveryProfile, hint: &str, kind: LinkKind) -> f64 {
    let mut score = score_hint(
        hint,
        &profile.topical_keywords,
        &profile.noise_keywords,
        &profile.weights,
    );

    if let Some(focus) = &profile.focus_re
        && focus.is_match(hint)
    {
        score += profile.weights.focus_bonus;
    }

    match kind {
        LinkKind::Document => score += profile.weights.document_bonus,
        LinkKind::Image => score += profile.weights.image_bonus,
        LinkKind::Page => {}
    }

    score
}

/// Whether the hint mentions any noise keyword
#[must_use]
pub fn is_noise(hint: &str, profile: &DiscoveryProfile) -> bool {
    let blob = hint.to_lowercase();
    any_keyword(&blob, &profile.noise_keywords)
}

/// URLs excluded from candidacy and traversal outright
#[must_use]
pub fn hard_reject(url: &str, profile: &DiscoveryProfile) -> bool {
    let lower = url.to_lowercase();
    any_keyword(&lower, &profile.hard_reject)
}

/// Whether `url` looks like an entry point into the goal's section of a site
#[must_use]
pub fn is_entry_point(url: &str, profile: &DiscoveryProfile) -> bool {
    let lower = url.to_lowercase();
    any_keyword(&lower, &profile.entry_keywords)
}

/// Coarse traversal priority of a URL
///
/// Only orders continuations found on the same page; BFS order across pages
/// is untouched.
#[must_use]
pub fn traversal_priority(url: &str, profile: &DiscoveryProfile) -> u32 {
    let lower = url.to_lowercase();

    let tier = profile
        .priority_tiers
        .iter()
        .filter(|tier| any_keyword(&lower, &tier.markers))
        .map(|tier| tier.priority)
        .max();

    match tier {
        Some(priority) => priority,
        None if is_entry_point(url, profile) => ENTRY_PRIORITY,
        None => BASE_PRIORITY,
    }
}

/// Whether a link qualifies as a reportable candidate
///
/// It must carry a candidate marker or match the topical regex, and reach the
/// profile's minimum score.
#[must_use]
pub fn is_reportable(url: &str, hint: &str, score: f64, profile: &DiscoveryProfile) -> bool {
    let blob = format!("{url} {hint}").to_lowercase();
    let marked = any_keyword(&blob, &profile.candidate_markers) || profile.topical_re.is_match(&blob);

    marked && score >= profile.min_score
}
