//! Seed list loading
//!
//! Seed CSVs come from different exports, so each column is located through
//! a list of accepted header aliases. The name and URL columns are required;
//! the numeric id column is optional.

use log::warn;
use std::collections::HashSet;
use std::path::Path;

use super::errors::{PipelineError, PipelineResult};
use crate::utils::{ensure_scheme, normalize_url};

pub const NAME_ALIASES: &[&str] = &[
    "kampus_name",
    "name",
    "campus_name",
    "university",
    "nama kampus",
    "display_name",
];

pub const URL_ALIASES: &[&str] = &[
    "official_website",
    "official_website_url",
    "official_url",
    "website",
    "official_site",
    "origin_url",
    "url",
];

pub const ID_ALIASES: &[&str] = &["rank_rank_id", "site_id", "university_id", "id"];

/// One institution to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    /// Zero-based position in the input; output rows follow this order
    pub position: usize,
    pub display_name: String,
    /// URL as written in the input
    pub origin_url: String,
    pub site_id: Option<i64>,
}

impl Seed {
    /// Normalized origin with a scheme
    #[must_use]
    pub fn origin(&self) -> String {
        normalize_url(&ensure_scheme(&self.origin_url))
    }

    /// `"{site_id}:{origin}"`, or the normalized origin alone
    #[must_use]
    pub fn identity(&self) -> String {
        match self.site_id {
            Some(id) => format!("{id}:{}", self.origin()),
            None => self.origin(),
        }
    }

    /// Checkpoint key for this seed under a field set
    #[must_use]
    pub fn checkpoint_key(&self, field_set: &str) -> String {
        format!("{}|{field_set}", self.identity())
    }
}

fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias))
}

/// Read the seed list
///
/// # Errors
///
/// Fails when the file cannot be read or parsed, or when no accepted name or
/// URL header is present. Rows without a URL are skipped with a warning, and
/// so are repeats of a seed identity already listed.
pub fn load_seeds(path: &Path) -> PipelineResult<Vec<Seed>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::csv(path, e))?
        .iter()
        .map(normalize_header)
        .collect();

    let name_col = find_column(&headers, NAME_ALIASES).ok_or_else(|| PipelineError::MissingColumn {
        path: path.to_path_buf(),
        what: "name",
        accepted: NAME_ALIASES.join(", "),
    })?;
    let url_col = find_column(&headers, URL_ALIASES).ok_or_else(|| PipelineError::MissingColumn {
        path: path.to_path_buf(),
        what: "URL",
        accepted: URL_ALIASES.join(", "),
    })?;
    let id_col = find_column(&headers, ID_ALIASES);

    let mut seeds: Vec<Seed> = Vec::new();
    let mut identities = HashSet::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| PipelineError::csv(path, e))?;
        let origin_url = record.get(url_col).unwrap_or_default().trim().to_string();
        if origin_url.is_empty() {
            warn!(target: "campusscrape::run", "{}: row {} has no URL, skipped", path.display(), line + 2);
            continue;
        }

        let display_name = match record.get(name_col).map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => origin_url.clone(),
        };
        let site_id = id_col
            .and_then(|col| record.get(col))
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|id| id.is_finite() && id.fract() == 0.0)
            .map(|id| id as i64);

        let seed = Seed {
            position: seeds.len(),
            display_name,
            origin_url,
            site_id,
        };
        if !identities.insert(seed.identity()) {
            warn!(
                target: "campusscrape::run",
                "{}: row {} repeats seed {}, skipped",
                path.display(),
                line + 2,
                seed.identity()
            );
            continue;
        }
        seeds.push(seed);
    }

    Ok(seeds)
}
