//! Evidence gate for Oracle proposals
//!
//! Oracle output is untrusted. Each schema field has a class, and each class
//! has a rule for when a proposed value may pass: contact and social values
//! must be found literally in the evidence, or are replaced by a value that
//! is, or by the [`NO_EVIDENCE`] sentinel. Narrative prose is exempt since it
//! cannot be matched token for token.

use chrono::{Datelike, NaiveDate};
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::ops::RangeInclusive;
use thiserror::Error;

use super::record::EvidenceRecord;
use crate::utils::{NO_EVIDENCE, safe_truncate_chars, slugify};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}").expect("Invalid email regex")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\(?\d[\d\-\s().]{7,}\d").expect("Invalid phone regex"));

static WA_DEEPLINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:https?://)?(?:wa\.me/\+?\d+|api\.whatsapp\.com/send/?\?phone=\+?\d+|(?:chat\.)?whatsapp\.com/[A-Za-z0-9/_\-?=&.+]+)",
    )
    .expect("Invalid whatsapp deeplink regex")
});

static WA_KEYWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:whatsapp|wa)\b").expect("Invalid whatsapp keyword regex"));

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("Invalid year regex"));

/// Digit counts accepted as a phone number
const PHONE_DIGITS: RangeInclusive<usize> = 9..=15;

/// Chars after a messaging keyword searched for its number
const MESSAGING_WINDOW: usize = 80;

/// Matches of the email regex that are really asset names (`logo@2x.png`)
const ASSET_SUFFIXES: [&str; 6] = [".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];

/// Links that point at a network but not at the institution's profile
const SHARE_MARKERS: [&str; 4] = ["sharer", "/share", "/intent/", "share.php"];

/// Social networks with a gated profile field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialNetwork {
    Facebook,
    Instagram,
    Twitter,
    Youtube,
    Tiktok,
    Linkedin,
}

impl SocialNetwork {
    /// Registrable domains the network serves profiles from
    #[must_use]
    pub const fn domains(self) -> &'static [&'static str] {
        match self {
            Self::Facebook => &["facebook.com", "fb.com", "fb.me"],
            Self::Instagram => &["instagram.com", "instagr.am"],
            Self::Twitter => &["twitter.com", "x.com"],
            Self::Youtube => &["youtube.com", "youtu.be"],
            Self::Tiktok => &["tiktok.com"],
            Self::Linkedin => &["linkedin.com"],
        }
    }

    /// Whether `url` is an absolute http(s) URL on one of the network's domains
    #[must_use]
    pub fn matches_url(self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url.trim()) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = parsed.host_str().map(str::to_lowercase) else {
            return false;
        };
        let host = host
            .strip_prefix("www.")
            .or_else(|| host.strip_prefix("m."))
            .unwrap_or(host.as_str());

        self.domains()
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    }
}

/// How a field's proposed value is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    Email,
    Phone,
    /// Messaging-app contact; needs the app to be mentioned at all
    Messaging,
    Social(SocialNetwork),
    /// Free prose, passed through
    Narrative,
    /// Short free value, trimmed and passed through
    Plain,
    /// One of a closed set of values, compared case-insensitively; the
    /// canonical spelling is emitted and anything else becomes the sentinel
    Choice(&'static [&'static str]),
    /// Must appear literally in the evidence
    Verbatim,
}

impl FieldClass {
    /// Whether accepted values of this class are literals from the evidence
    #[must_use]
    pub const fn is_evidence_bound(&self) -> bool {
        matches!(
            self,
            Self::Email | Self::Phone | Self::Messaging | Self::Social(_) | Self::Verbatim
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub class: FieldClass,
}

const fn field(key: &'static str, class: FieldClass) -> FieldSpec {
    FieldSpec { key, class }
}

pub const INSTITUTION_TYPES: &[&str] = &["university", "institute", "polytechnic", "academy"];
pub const INSTITUTION_STATUSES: &[&str] = &["state", "private"];
pub const ACCREDITATION_GRADES: &[&str] = &["A", "B", "C", "U", "BA", "BS"];

/// Fixed, ordered set of keys an Oracle proposal is mapped onto
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
}

impl FieldSchema {
    #[must_use]
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Institution contact sheet
    #[must_use]
    pub fn contact() -> Self {
        Self::new(vec![
            field("type", FieldClass::Choice(INSTITUTION_TYPES)),
            field("status", FieldClass::Choice(INSTITUTION_STATUSES)),
            field("accreditation", FieldClass::Choice(ACCREDITATION_GRADES)),
            field("address", FieldClass::Plain),
            field("postal_code", FieldClass::Verbatim),
            field("email", FieldClass::Email),
            field("phone", FieldClass::Phone),
            field("whatsapp", FieldClass::Messaging),
            field("facebook", FieldClass::Social(SocialNetwork::Facebook)),
            field("instagram", FieldClass::Social(SocialNetwork::Instagram)),
            field("twitter", FieldClass::Social(SocialNetwork::Twitter)),
            field("youtube", FieldClass::Social(SocialNetwork::Youtube)),
            field("province_name", FieldClass::Plain),
            field("city_name", FieldClass::Plain),
        ])
    }

    /// Vision, mission and history prose
    #[must_use]
    pub fn narrative() -> Self {
        Self::new(vec![
            field("vision", FieldClass::Narrative),
            field("mission", FieldClass::Narrative),
            field("history", FieldClass::Narrative),
        ])
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.key)
    }

    #[must_use]
    pub fn class_of(&self, key: &str) -> Option<FieldClass> {
        self.fields.iter().find(|f| f.key == key).map(|f| f.class)
    }

    /// JSON schema handed to the Oracle: every key a required string
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for spec in &self.fields {
            properties.insert(spec.key.to_string(), json!({ "type": "string" }));
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": self.keys().collect::<Vec<_>>(),
        })
    }
}

/// Where an accepted value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Oracle value, confirmed against the evidence
    Proposed,
    /// Oracle value rejected or missing; found in the evidence instead
    Recovered,
    /// Narrative value, not checked
    Exempt,
    /// Unchecked short value
    PassThrough,
    /// Replaced by the sentinel
    NoEvidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub key: String,
    pub value: String,
    pub provenance: Provenance,
}

impl ExtractedField {
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.value == NO_EVIDENCE
    }
}

/// Gate output, one entry per schema key in schema order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedFields {
    fields: Vec<ExtractedField>,
}

impl AcceptedFields {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ExtractedField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Value of `key`, the sentinel when absent
    #[must_use]
    pub fn value(&self, key: &str) -> &str {
        self.get(key).map_or(NO_EVIDENCE, |f| f.value.as_str())
    }

    /// Value of `key` unless it is the sentinel
    #[must_use]
    pub fn present(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|f| !f.is_sentinel()).map(|f| f.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractedField> {
        self.fields.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `{key: value}` object for audit output
    #[must_use]
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.key.clone(), Value::String(f.value.clone())))
            .collect();
        Value::Object(map)
    }
}

/// Render a proposed JSON value as text; blanks and the sentinel become `""`
#[must_use]
pub fn value_as_text(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_as_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        Value::Null | Value::Object(_) => String::new(),
    };
    if text == NO_EVIDENCE { String::new() } else { text }
}

fn digits_of(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

fn is_email(candidate: &str) -> bool {
    EMAIL_RE
        .find(candidate)
        .is_some_and(|m| m.start() == 0 && m.end() == candidate.len())
}

fn is_asset_name(candidate: &str) -> bool {
    let lower = candidate.to_ascii_lowercase();
    ASSET_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Phone-shaped tokens of the page text, then of `tel:` links
fn phone_tokens(evidence: &EvidenceRecord) -> impl Iterator<Item = &str> {
    let from_text = PHONE_RE.find_iter(evidence.text()).map(|m| m.as_str().trim());
    let from_links = evidence
        .links()
        .iter()
        .filter(|l| l.to_ascii_lowercase().starts_with("tel:"))
        .flat_map(|l| PHONE_RE.find_iter(l).map(|m| m.as_str().trim()));
    from_text.chain(from_links)
}

fn has_phone_length(token: &str) -> bool {
    PHONE_DIGITS.contains(&digits_of(token).len())
}

type Outcome = Option<(String, Provenance)>;

fn gate_email(proposed: &str, evidence: &EvidenceRecord) -> Outcome {
    let candidate = proposed.trim();
    let candidate = candidate.strip_prefix("mailto:").unwrap_or(candidate);

    if is_email(candidate) && evidence.contains(candidate) {
        return Some((candidate.to_string(), Provenance::Proposed));
    }

    EMAIL_RE
        .find_iter(evidence.blob())
        .map(|m| m.as_str())
        .find(|e| !is_asset_name(e))
        .map(|e| (e.to_string(), Provenance::Recovered))
}

/// Accept a proposed number whose digits occur in the evidence, emitting the
/// evidence's own spelling of it
fn confirm_phone(proposed: &str, evidence: &EvidenceRecord) -> Option<String> {
    let wanted = digits_of(proposed);
    if !PHONE_DIGITS.contains(&wanted.len()) || !evidence.digits().contains(&wanted) {
        return None;
    }
    phone_tokens(evidence)
        .find(|token| has_phone_length(token) && digits_of(token).contains(&wanted))
        .map(str::to_string)
}

fn gate_phone(proposed: &str, evidence: &EvidenceRecord) -> Outcome {
    if let Some(token) = confirm_phone(proposed, evidence) {
        return Some((token, Provenance::Proposed));
    }
    phone_tokens(evidence)
        .find(|token| has_phone_length(token))
        .map(|token| (token.to_string(), Provenance::Recovered))
}

/// First phone number shortly after a messaging keyword in the text
fn messaging_number(evidence: &EvidenceRecord) -> Option<String> {
    let text = evidence.text();
    WA_KEYWORD_RE.find_iter(text).find_map(|m| {
        let window = safe_truncate_chars(&text[m.end()..], MESSAGING_WINDOW);
        PHONE_RE
            .find_iter(window)
            .map(|p| p.as_str().trim())
            .find(|token| has_phone_length(token))
            .map(str::to_string)
    })
}

fn gate_messaging(proposed: &str, evidence: &EvidenceRecord) -> Outcome {
    let blob = evidence.blob();
    let deeplink = WA_DEEPLINK_RE.find(blob);
    if deeplink.is_none() && !WA_KEYWORD_RE.is_match(blob) {
        return None;
    }

    let candidate = proposed.trim();
    if WA_DEEPLINK_RE.is_match(candidate) && evidence.contains(candidate) {
        return Some((candidate.to_string(), Provenance::Proposed));
    }

    if let Some(link) = evidence.links().iter().find(|l| WA_DEEPLINK_RE.is_match(l)) {
        return Some((link.clone(), Provenance::Recovered));
    }
    if let Some(m) = deeplink {
        return Some((m.as_str().to_string(), Provenance::Recovered));
    }

    if let Some(token) = confirm_phone(candidate, evidence) {
        return Some((token, Provenance::Proposed));
    }
    messaging_number(evidence).map(|token| (token, Provenance::Recovered))
}

fn is_share_link(url: &str) -> bool {
    let lower = url.to_lowercase();
    SHARE_MARKERS.iter().any(|m| lower.contains(m))
}

fn gate_social(network: SocialNetwork, proposed: &str, evidence: &EvidenceRecord) -> Outcome {
    let candidate = proposed.trim();
    if network.matches_url(candidate) && evidence.contains(candidate) {
        return Some((candidate.to_string(), Provenance::Proposed));
    }

    evidence
        .links()
        .iter()
        .find(|l| network.matches_url(l) && !is_share_link(l))
        .map(|l| (l.clone(), Provenance::Recovered))
}

fn gate_value(class: FieldClass, proposed: &str, evidence: &EvidenceRecord) -> Outcome {
    match class {
        FieldClass::Email => gate_email(proposed, evidence),
        FieldClass::Phone => gate_phone(proposed, evidence),
        FieldClass::Messaging => gate_messaging(proposed, evidence),
        FieldClass::Social(network) => gate_social(network, proposed, evidence),
        FieldClass::Narrative => {
            (!proposed.is_empty()).then(|| (proposed.to_string(), Provenance::Exempt))
        }
        FieldClass::Plain => {
            (!proposed.is_empty()).then(|| (proposed.to_string(), Provenance::PassThrough))
        }
        FieldClass::Choice(options) => options
            .iter()
            .find(|o| o.eq_ignore_ascii_case(proposed))
            .map(|o| ((*o).to_string(), Provenance::PassThrough)),
        FieldClass::Verbatim => (!proposed.is_empty() && evidence.contains(proposed))
            .then(|| (proposed.to_string(), Provenance::Proposed)),
    }
}

/// Maps an untrusted proposal onto a schema, keeping only what the evidence
/// supports
#[derive(Debug, Clone)]
pub struct EvidenceGate {
    schema: FieldSchema,
}

impl EvidenceGate {
    #[must_use]
    pub fn new(schema: FieldSchema) -> Self {
        Self { schema }
    }

    #[must_use]
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Gate every schema field of `proposed`
    ///
    /// Keys outside the schema are dropped; missing keys, non-object input
    /// and rejected values yield the sentinel.
    #[must_use]
    pub fn enforce(&self, proposed: &Value, evidence: &EvidenceRecord) -> AcceptedFields {
        let object = proposed.as_object();

        if let Some(object) = object {
            let unknown = object
                .keys()
                .filter(|k| self.schema.class_of(k).is_none())
                .count();
            if unknown > 0 {
                trace!(target: "campusscrape::run", "dropping {unknown} key(s) outside the schema");
            }
        }

        let fields = self
            .schema
            .fields()
            .iter()
            .map(|spec| {
                let raw = object
                    .and_then(|o| o.get(spec.key))
                    .map(value_as_text)
                    .unwrap_or_default();

                let (value, provenance) = gate_value(spec.class, &raw, evidence)
                    .unwrap_or_else(|| (NO_EVIDENCE.to_string(), Provenance::NoEvidence));

                if !raw.is_empty() && matches!(provenance, Provenance::Recovered | Provenance::NoEvidence) {
                    debug!(
                        target: "campusscrape::run",
                        "{}: rejected unsupported value {raw:?} -> {value:?}",
                        spec.key
                    );
                }

                ExtractedField {
                    key: spec.key.to_string(),
                    value,
                    provenance,
                }
            })
            .collect();

        AcceptedFields { fields }
    }
}

/// One admission schedule entry that passed the record gate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// ISO date when it parsed, the raw text otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_level: Option<String>,
}

/// Why a proposed schedule entry was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ItemRejection {
    #[error("item is not a JSON object")]
    NotAnObject,
    #[error("item has no name")]
    MissingName,
    #[error("item has no date, selection method or description")]
    NoSupportingField,
}

/// Parse `YYYY-MM-DD`, optionally followed by a time part
#[must_use]
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10)?;
    let rest = &raw[10..];
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return None;
    }
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Check one date field against the text evidence
///
/// Parsed dates are normalized to ISO and need their year in the text.
/// Unparseable values are kept verbatim for the export policy, unless they
/// name a year the text never mentions.
fn gate_date(raw: String, text_evidence: Option<&EvidenceRecord>) -> Option<String> {
    match parse_iso_date(&raw) {
        Some(date) => {
            let year = date.year().to_string();
            if let Some(evidence) = text_evidence
                && !evidence.text_contains(&year)
            {
                debug!(target: "campusscrape::run", "date {raw} dropped: year {year} not in evidence");
                return None;
            }
            Some(date.format("%Y-%m-%d").to_string())
        }
        None => {
            if let Some(evidence) = text_evidence
                && YEAR_RE
                    .find_iter(&raw)
                    .any(|y| !evidence.text_contains(y.as_str()))
            {
                debug!(target: "campusscrape::run", "date {raw:?} dropped: year not in evidence");
                return None;
            }
            Some(raw)
        }
    }
}

/// Gate one proposed schedule entry
///
/// `evidence` is the text the entry was extracted from; pass `None` for
/// byte-grounded extraction (documents, images), where only the structural
/// checks apply.
pub fn gate_schedule_item(
    item: &Value,
    evidence: Option<&EvidenceRecord>,
) -> Result<ScheduleItem, ItemRejection> {
    let object = item.as_object().ok_or(ItemRejection::NotAnObject)?;
    let text = |key: &str| {
        object
            .get(key)
            .map(value_as_text)
            .filter(|s| !s.is_empty())
    };

    let name = text("name").ok_or(ItemRejection::MissingName)?;
    let text_evidence = evidence.filter(|e| !e.text().trim().is_empty());

    let registration_start = text("registration_start").and_then(|d| gate_date(d, text_evidence));
    let registration_end = text("registration_end").and_then(|d| gate_date(d, text_evidence));
    let selection_method = text("selection_method");
    let description = text("description");

    if registration_start.is_none()
        && registration_end.is_none()
        && selection_method.is_none()
        && description.is_none()
    {
        return Err(ItemRejection::NoSupportingField);
    }

    let slug = text("slug")
        .map(|s| slugify(&s))
        .unwrap_or_else(|| slugify(&name));

    Ok(ScheduleItem {
        slug,
        name,
        description,
        registration_start,
        registration_end,
        academic_year: text("academic_year"),
        wave: text("wave"),
        admission_type: text("admission_type"),
        selection_method,
        target_level: text("target_level"),
    })
}
