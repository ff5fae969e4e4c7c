//! Admission goal: validate discovered candidates, extract schedules
//!
//! Pages go through a cheap local gate before the Oracle sees them.
//! Documents and images skip the gate and are validated from their bytes.
//! Every proposed schedule passes [`gate_schedule_item`] before it becomes a
//! row; byte-grounded items get only the structural checks.

use chrono::NaiveDate;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;

use super::errors::SeedError;
use super::orchestrator::{SeedContext, SeedOutcome};
use super::output::{ItemAudit, Row};
use super::seeds::Seed;
use crate::config::{DiscoveryProfile, UnparseableDatePolicy};
use crate::crawl_engine::{CandidateLink, DiscoveryCrawler, LinkKind};
use crate::evidence::{EvidenceRecord, ScheduleItem, gate_schedule_item, parse_iso_date};
use crate::fetcher::{FetchResult, fetch_with_retry};
use crate::oracle::parse::{parse_json_array, parse_json_object};
use crate::oracle::prompts::{
    EXTRACT_SCHEDULE_PROMPT, VALIDATE_ADMISSION_PROMPT, verdict_schema, with_content,
};
use crate::utils::{MAX_EXTRACTION_TEXT, MAX_VALIDATION_TEXT, MAX_VERDICT_FIELD, safe_truncate_chars};

/// Schedule pages are often tables without explicit dates
static SCHEDULE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(jadwal|schedule|timeline)\b").expect("Invalid schedule marker regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Valid,
    Invalid,
    /// The Oracle failed or did not answer in the expected shape
    Uncertain,
}

/// One candidate's validation outcome, as written to `verdicts.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub site_identity: String,
    pub campus_name: String,
    pub url: String,
    pub kind: LinkKind,
    pub source_page: String,
    pub verdict: Verdict,
    pub reason: String,
    pub evidence_snippet: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
}

/// Cheap pre-filter run before any Oracle call on page text
#[must_use]
pub fn local_gate(text: &str, profile: &DiscoveryProfile) -> bool {
    SCHEDULE_MARKER_RE.is_match(text)
        || (profile.topical_re.is_match(text) && profile.date_hint_re.is_match(text))
}

/// Read a validation reply; anything but a JSON object is `Uncertain`
#[must_use]
pub fn parse_verdict(raw: &str) -> (Verdict, String, String) {
    let Some(object) = parse_json_object(raw) else {
        return (
            Verdict::Uncertain,
            "oracle output not strict json".to_string(),
            safe_truncate_chars(raw, MAX_VERDICT_FIELD).to_string(),
        );
    };

    let field = |key: &str| {
        let value = object.get(key).and_then(Value::as_str).unwrap_or_default();
        safe_truncate_chars(value.trim(), MAX_VERDICT_FIELD).to_string()
    };
    let is_valid = match object.get("is_valid") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };

    let verdict = if is_valid { Verdict::Valid } else { Verdict::Invalid };
    (verdict, field("reason"), field("evidence_snippet"))
}

/// What to do with a schedule row at export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryDecision {
    Keep,
    /// Registration closed before today
    Expired,
    KeepUnparseable,
    DropUnparseable,
}

#[must_use]
pub fn expiry_decision(
    registration_end: Option<&str>,
    today: NaiveDate,
    policy: UnparseableDatePolicy,
) -> ExpiryDecision {
    let Some(raw) = registration_end.map(str::trim).filter(|s| !s.is_empty()) else {
        return ExpiryDecision::Keep;
    };
    match (parse_iso_date(raw), policy) {
        (Some(end), _) if end < today => ExpiryDecision::Expired,
        (Some(_), _) => ExpiryDecision::Keep,
        (None, UnparseableDatePolicy::Keep) => ExpiryDecision::KeepUnparseable,
        (None, UnparseableDatePolicy::Drop) => ExpiryDecision::DropUnparseable,
    }
}

/// What the Oracle is shown for a candidate
enum Grounding<'a> {
    Text(&'a str),
    Bytes { mime: String, bytes: &'a [u8] },
}

fn grounding<'a>(candidate: &CandidateLink, page: &'a FetchResult) -> Grounding<'a> {
    let content_type = page.content_type.as_str();
    let binary = content_type.starts_with("image/")
        || content_type == "application/pdf"
        || content_type.contains("msword")
        || content_type.contains("officedocument");

    if binary {
        return Grounding::Bytes {
            mime: content_type.to_string(),
            bytes: &page.raw_bytes,
        };
    }
    if page.is_html() || content_type.starts_with("text/") || candidate.kind == LinkKind::Page {
        return Grounding::Text(&page.extracted_text);
    }
    Grounding::Bytes {
        mime: candidate.kind.default_mime(&candidate.url).to_string(),
        bytes: &page.raw_bytes,
    }
}

struct Validation {
    verdict: Verdict,
    reason: String,
    snippet: String,
    model: String,
}

impl Validation {
    fn new(verdict: Verdict, reason: impl Into<String>) -> Self {
        Self {
            verdict,
            reason: reason.into(),
            snippet: String::new(),
            model: String::new(),
        }
    }
}

async fn validate(
    ctx: &SeedContext<'_>,
    profile: &DiscoveryProfile,
    grounding: &Grounding<'_>,
    outcome: &mut SeedOutcome,
) -> Result<Validation, SeedError> {
    let reply = match grounding {
        Grounding::Text(text) => {
            if !local_gate(text, profile) {
                return Ok(Validation::new(
                    Verdict::Invalid,
                    "local gate: no admission keyword and no date/period hint",
                ));
            }
            let prompt = with_content(
                VALIDATE_ADMISSION_PROMPT,
                safe_truncate_chars(text, MAX_VALIDATION_TEXT),
            );
            let schema = verdict_schema();
            ctx.oracle.generate(&prompt, Some(&schema)).await
        }
        Grounding::Bytes { mime, bytes } => {
            if bytes.is_empty() {
                return Ok(Validation::new(Verdict::Invalid, "empty response body"));
            }
            ctx.oracle
                .generate_with_bytes(VALIDATE_ADMISSION_PROMPT, mime, bytes)
                .await
        }
    };

    match outcome.settle(reply)? {
        Ok(reply) => {
            let (verdict, reason, snippet) = parse_verdict(&reply.text);
            Ok(Validation {
                verdict,
                reason,
                snippet,
                model: reply.model,
            })
        }
        Err(reason) => Ok(Validation::new(Verdict::Uncertain, reason)),
    }
}

async fn extract(
    ctx: &SeedContext<'_>,
    grounding: &Grounding<'_>,
    outcome: &mut SeedOutcome,
) -> Result<Vec<Value>, SeedError> {
    let reply = match grounding {
        Grounding::Text(text) => {
            let prompt = with_content(
                EXTRACT_SCHEDULE_PROMPT,
                safe_truncate_chars(text, MAX_EXTRACTION_TEXT),
            );
            ctx.oracle.generate(&prompt, None).await
        }
        Grounding::Bytes { mime, bytes } => {
            ctx.oracle
                .generate_with_bytes(EXTRACT_SCHEDULE_PROMPT, mime, bytes)
                .await
        }
    };

    match outcome.settle(reply)? {
        Ok(reply) => Ok(parse_json_array(&reply.text).unwrap_or_else(|| {
            warn!(target: "campusscrape::oracle", "extraction reply is not a JSON array, ignored");
            Vec::new()
        })),
        Err(reason) => {
            warn!(target: "campusscrape::oracle", "extraction failed: {reason}");
            Ok(Vec::new())
        }
    }
}

fn schedule_row(seed: &Seed, item: &ScheduleItem, source_url: &str) -> Row {
    let row = json!({
        "university_id": seed.site_id,
        "campus_name": seed.display_name,
        "name": item.name,
        "slug": item.slug,
        "description": item.description,
        "start_date": item.registration_start,
        "end_date": item.registration_end,
        "url": source_url,
        "is_active": true,
        "academic_year": item.academic_year,
        "wave": item.wave,
        "admission_type": item.admission_type,
        "selection_method": item.selection_method,
        "target_level": item.target_level,
    });
    match row {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// Discover, validate and extract one seed
///
/// # Errors
///
/// Only an exhausted Oracle rate limit ends the seed early; every other
/// failure is recorded per candidate and the seed carries on.
pub async fn process(ctx: &SeedContext<'_>, seed: &Seed) -> Result<SeedOutcome, SeedError> {
    let identity = seed.identity();
    let retry = ctx.config.retry_policy();
    let crawler = DiscoveryCrawler::new(
        ctx.config.tune_profile(DiscoveryProfile::admission()),
        ctx.config.discovery_limits(),
        retry,
    );

    let report = crawler.discover(&identity, &seed.origin(), ctx.fetcher).await;
    let mut outcome = SeedOutcome::from_report(&report);
    let total = report.candidates.len();
    let mut seen_rows: HashSet<(String, Option<String>)> = HashSet::new();

    for (index, candidate) in report.candidates.iter().enumerate() {
        debug!(
            target: "campusscrape::run",
            "{identity}: validate {}/{total} {:?} {}",
            index + 1,
            candidate.kind,
            candidate.url
        );

        let page = fetch_with_retry(ctx.fetcher, &candidate.url, &retry).await;
        outcome.blocked |= page.is_blocked();

        let validation = if page.ok {
            validate(ctx, crawler.profile(), &grounding(candidate, &page), &mut outcome).await?
        } else {
            Validation::new(Verdict::Invalid, format!("fetch failed: {}", page.error))
        };

        info!(
            target: "campusscrape::run",
            "{identity}: {:?} {} ({})",
            validation.verdict,
            candidate.url,
            safe_truncate_chars(&validation.reason, 80)
        );

        let valid = validation.verdict == Verdict::Valid;
        outcome.verdicts.push(ValidationRecord {
            site_identity: identity.clone(),
            campus_name: seed.display_name.clone(),
            url: candidate.url.clone(),
            kind: candidate.kind,
            source_page: candidate.source_page.clone(),
            verdict: validation.verdict,
            reason: validation.reason,
            evidence_snippet: validation.snippet,
            model: validation.model,
        });

        if !valid || ctx.config.validate_only() {
            continue;
        }

        let shown = grounding(candidate, &page);
        let evidence = match shown {
            Grounding::Text(_) => Some(EvidenceRecord::from_fetch(&page)),
            Grounding::Bytes { .. } => None,
        };
        let proposed = extract(ctx, &shown, &mut outcome).await?;
        debug!(
            target: "campusscrape::run",
            "{identity}: {} proposed item(s) from {}",
            proposed.len(),
            candidate.url
        );

        for item in proposed {
            let gated = gate_schedule_item(&item, evidence.as_ref());
            outcome.items.push(ItemAudit {
                site_identity: identity.clone(),
                source_url: candidate.url.clone(),
                accepted: gated.is_ok(),
                rejection: gated.as_ref().err().map(ToString::to_string),
                item,
            });

            if let Ok(item) = gated
                && seen_rows.insert((item.slug.clone(), item.registration_end.clone()))
            {
                outcome.rows.push(schedule_row(seed, &item, &candidate.url));
            }
        }
    }

    info!(
        target: "campusscrape::run",
        "{identity}: {} schedule row(s) from {total} candidate(s)",
        outcome.rows.len()
    );
    Ok(outcome)
}
