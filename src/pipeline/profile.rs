//! Profile goal: contact sheet plus vision, mission and history
//!
//! Two discovery passes per seed, one with the contact profile and one with
//! the narrative profile, both entering at the origin. The best pages of
//! each pass are bundled into one text for the Oracle; a bundle that is too
//! thin or was blocked falls back to asking the Oracle to browse the site.
//! Either way the answer goes through the [`EvidenceGate`] against the
//! bundled pages before it reaches the row.

use log::{debug, info, warn};
use serde_json::{Map, Value, json};

use super::errors::SeedError;
use super::orchestrator::{SeedContext, SeedOutcome};
use super::output::{ItemAudit, Row};
use super::seeds::Seed;
use crate::config::DiscoveryProfile;
use crate::crawl_engine::{DiscoveryCrawler, DiscoveryLimits, DiscoveryReport, LinkKind};
use crate::evidence::{AcceptedFields, EvidenceGate, EvidenceRecord, FieldSchema};
use crate::fetcher::{FetchResult, fetch_with_retry};
use crate::oracle::parse::parse_json_object;
use crate::oracle::prompts::{CONTACT_RULES, NARRATIVE_RULES, browse_prompt, evidence_prompt};
use crate::utils::{
    CONTACT_BROWSE_THRESHOLD, MAX_COMBINED_TEXT, NARRATIVE_BROWSE_THRESHOLD, best_short_name,
    safe_truncate_chars, slugify,
};

/// Text gathered from the best pages of one discovery pass
#[derive(Debug, Default)]
pub struct Bundle {
    pub pages: Vec<FetchResult>,
    /// Page texts joined by blank lines, capped
    pub text: String,
    pub blocked: bool,
}

impl Bundle {
    #[must_use]
    pub fn evidence(&self) -> EvidenceRecord {
        EvidenceRecord::from_pages(&self.pages)
    }

    /// Too little text to extract from, or the site pushed back
    #[must_use]
    pub fn needs_browse(&self, threshold: usize) -> bool {
        self.blocked || self.text.trim().chars().count() < threshold
    }
}

/// Same-site page candidates, origin first, then by descending score
#[must_use]
pub fn bundle_urls(report: &DiscoveryReport, max_pages: usize) -> Vec<String> {
    let mut pages: Vec<_> = report
        .candidates
        .iter()
        .filter(|c| c.kind == LinkKind::Page)
        .filter(|c| crate::utils::same_site(&report.origin, &c.url))
        .collect();
    // Stable: ties keep discovery order
    pages.sort_by(|a, b| {
        let a_origin = a.url == report.origin;
        let b_origin = b.url == report.origin;
        b_origin
            .cmp(&a_origin)
            .then(b.relevance_score.total_cmp(&a.relevance_score))
    });

    let mut urls: Vec<String> = Vec::with_capacity(max_pages);
    for candidate in pages {
        if urls.len() >= max_pages {
            break;
        }
        if !urls.contains(&candidate.url) {
            urls.push(candidate.url.clone());
        }
    }
    urls
}

async fn build_bundle(ctx: &SeedContext<'_>, report: &DiscoveryReport) -> Bundle {
    let retry = ctx.config.retry_policy();
    let mut bundle = Bundle {
        blocked: report.blocked,
        ..Bundle::default()
    };
    let mut chars = 0usize;

    for url in bundle_urls(report, ctx.config.max_bundle_pages().max(1)) {
        if chars >= MAX_COMBINED_TEXT {
            break;
        }
        let page = fetch_with_retry(ctx.fetcher, &url, &retry).await;
        bundle.blocked |= page.is_blocked();
        if !page.ok || page.extracted_text.trim().is_empty() {
            continue;
        }
        chars += page.extracted_text.chars().count();
        bundle.pages.push(page);
    }

    let joined = bundle
        .pages
        .iter()
        .map(|p| p.extracted_text.trim())
        .collect::<Vec<_>>()
        .join("\n\n");
    bundle.text = safe_truncate_chars(&joined, MAX_COMBINED_TEXT).to_string();
    bundle
}

/// One discovery pass, its bundle, the Oracle call and the gate
async fn gather(
    ctx: &SeedContext<'_>,
    seed: &Seed,
    profile: DiscoveryProfile,
    schema: FieldSchema,
    rules: &str,
    threshold: usize,
    outcome: &mut SeedOutcome,
) -> Result<AcceptedFields, SeedError> {
    let identity = seed.identity();
    let origin = seed.origin();
    let limits = DiscoveryLimits {
        max_pages: ctx.config.max_pages().min(ctx.config.max_bundle_pages().max(1)),
        ..ctx.config.discovery_limits()
    };
    let crawler = DiscoveryCrawler::new(
        ctx.config.tune_profile(profile),
        limits,
        ctx.config.retry_policy(),
    );
    let report = crawler.discover(&identity, &origin, ctx.fetcher).await;
    outcome.absorb_report(&report);

    let bundle = build_bundle(ctx, &report).await;
    outcome.blocked |= bundle.blocked;

    let gate = EvidenceGate::new(schema);
    let json_schema = gate.schema().to_json_schema();
    let browse = bundle.needs_browse(threshold);
    let prompt = if browse {
        info!(
            target: "campusscrape::run",
            "{identity}: {} bundle thin or blocked ({} chars), asking the oracle to browse",
            crawler.profile().name,
            bundle.text.chars().count()
        );
        browse_prompt(rules, &json_schema, &seed.display_name, &seed.origin_url)
    } else {
        evidence_prompt(rules, &bundle.text)
    };

    let reply = ctx.oracle.generate(&prompt, Some(&json_schema)).await;
    let proposed = match outcome.settle(reply)? {
        Ok(reply) => match parse_json_object(&reply.text) {
            Some(object) => Value::Object(object),
            None => {
                warn!(
                    target: "campusscrape::oracle",
                    "{identity}: {} reply is not a JSON object",
                    crawler.profile().name
                );
                Value::Object(Map::new())
            }
        },
        Err(reason) => {
            warn!(target: "campusscrape::oracle", "{identity}: {reason}");
            Value::Object(Map::new())
        }
    };

    let accepted = gate.enforce(&proposed, &bundle.evidence());
    debug!(
        target: "campusscrape::run",
        "{identity}: {} field(s) kept of {}",
        accepted.iter().filter(|f| !f.is_sentinel()).count(),
        accepted.len()
    );

    outcome.items.push(ItemAudit {
        site_identity: identity,
        source_url: origin,
        accepted: true,
        rejection: None,
        item: json!({
            "profile": crawler.profile().name,
            "browse": browse,
            "bundle_pages": bundle.pages.iter().map(|p| p.url.as_str()).collect::<Vec<_>>(),
            "proposed": proposed,
            "fields": accepted.iter().collect::<Vec<_>>(),
        }),
    });

    Ok(accepted)
}

/// `"{history}\n\nVision: ..\n\nMission: .."` from the parts that are present
#[must_use]
pub fn compose_description(narrative: &AcceptedFields) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(history) = narrative.present("history") {
        parts.push(history.to_string());
    }
    if let Some(vision) = narrative.present("vision") {
        parts.push(format!("Vision: {vision}"));
    }
    if let Some(mission) = narrative.present("mission") {
        parts.push(format!("Mission: {mission}"));
    }
    let description = parts.join("\n\n").trim().to_string();
    (!description.is_empty()).then_some(description)
}

fn profile_row(seed: &Seed, contact: &AcceptedFields, description: Option<String>) -> Row {
    let mut row = Row::new();
    row.insert("id".into(), json!(seed.position + 1));
    row.insert("site_id".into(), json!(seed.site_id));
    row.insert("university_code".into(), Value::Null);
    row.insert("name".into(), json!(seed.display_name));
    row.insert("slug".into(), json!(slugify(&seed.display_name)));
    row.insert(
        "short_name".into(),
        json!(best_short_name(&seed.display_name, &seed.origin_url)),
    );
    row.insert("description".into(), json!(description));
    row.insert("logo".into(), Value::Null);
    row.insert("website".into(), json!(seed.origin_url));
    row.insert("cover".into(), Value::Null);
    for field in contact.iter() {
        row.insert(field.key.clone(), json!(field.value));
    }
    row
}

/// Run both passes for one seed and build its single row
///
/// # Errors
///
/// Only an exhausted Oracle rate limit ends the seed early.
pub async fn process(ctx: &SeedContext<'_>, seed: &Seed) -> Result<SeedOutcome, SeedError> {
    let mut outcome = SeedOutcome::default();

    if ctx.config.validate_only() {
        let crawler = DiscoveryCrawler::new(
            ctx.config.tune_profile(DiscoveryProfile::contact()),
            ctx.config.discovery_limits(),
            ctx.config.retry_policy(),
        );
        let report = crawler.discover(&seed.identity(), &seed.origin(), ctx.fetcher).await;
        outcome.absorb_report(&report);
        return Ok(outcome);
    }

    let contact = gather(
        ctx,
        seed,
        DiscoveryProfile::contact(),
        FieldSchema::contact(),
        CONTACT_RULES,
        CONTACT_BROWSE_THRESHOLD,
        &mut outcome,
    )
    .await?;

    let narrative = gather(
        ctx,
        seed,
        DiscoveryProfile::narrative(),
        FieldSchema::narrative(),
        NARRATIVE_RULES,
        NARRATIVE_BROWSE_THRESHOLD,
        &mut outcome,
    )
    .await?;

    outcome
        .rows
        .push(profile_row(seed, &contact, compose_description(&narrative)));
    Ok(outcome)
}
