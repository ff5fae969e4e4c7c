//! Run outputs: row store, audit trail and CSV exports
//!
//! Every finished seed appends one line to `rows.jsonl`. On start the lines
//! of seeds already marked done are read back, so a resumed run exports the
//! same `final.csv` as an uninterrupted one. Audit files are append-only
//! JSON lines and are never read back except for `valid_links.json`.

use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::admission::{ExpiryDecision, ValidationRecord, Verdict, expiry_decision};
use super::errors::{PipelineError, PipelineResult};
use super::template::Template;
use crate::config::{Goal, UnparseableDatePolicy};

pub const ROWS_FILE: &str = "rows.jsonl";
pub const PARTIAL_CSV: &str = "partial.csv";
pub const FINAL_CSV: &str = "final.csv";
pub const CANDIDATES_FILE: &str = "candidates.jsonl";
pub const VERDICTS_FILE: &str = "verdicts.jsonl";
pub const ITEMS_FILE: &str = "items.jsonl";
pub const VALID_LINKS_FILE: &str = "valid_links.json";

pub type Row = Map<String, Value>;

/// Rows produced by one seed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRows {
    /// Checkpoint key of the seed
    pub key: String,
    /// Seed position in the input
    pub position: usize,
    pub rows: Vec<Row>,
}

/// What happened to one proposed record, for the audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAudit {
    pub site_identity: String,
    pub source_url: String,
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
    pub item: Value,
}

fn append_lines<T: Serialize>(path: &Path, records: &[T]) -> PipelineResult<()> {
    if records.is_empty() {
        return Ok(());
    }
    let mut buf = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buf, record).map_err(|e| PipelineError::json(path, e))?;
        buf.push(b'\n');
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PipelineError::io(path, e))?;
    file.write_all(&buf).map_err(|e| PipelineError::io(path, e))
}

fn read_lines<T: for<'de> Deserialize<'de>>(path: &Path) -> PipelineResult<Vec<T>> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PipelineError::io(path, e)),
    };

    let mut out = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| PipelineError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => out.push(record),
            // A torn last line after a crash is expected
            Err(e) => warn!(
                target: "campusscrape::run",
                "{}:{}: skipping unreadable line: {e}",
                path.display(),
                index + 1
            ),
        }
    }
    Ok(out)
}

/// Append-only store of finished seeds' rows
#[derive(Debug, Clone)]
pub struct RowStore {
    path: PathBuf,
}

impl RowStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Rows of seeds for which `is_done` holds; the last line per key wins
    ///
    /// # Errors
    ///
    /// Fails when the store exists but cannot be read.
    pub fn load(&self, is_done: impl Fn(&str) -> bool) -> PipelineResult<Vec<SeedRows>> {
        let mut latest: HashMap<String, SeedRows> = HashMap::new();
        for batch in read_lines::<SeedRows>(&self.path)? {
            if is_done(&batch.key) {
                latest.insert(batch.key.clone(), batch);
            }
        }
        Ok(latest.into_values().collect())
    }

    /// # Errors
    ///
    /// Fails when the store cannot be written.
    pub fn append(&self, batch: &SeedRows) -> PipelineResult<()> {
        append_lines(&self.path, std::slice::from_ref(batch))
    }
}

/// Audit trail files in the output directory
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// # Errors
    ///
    /// Fails when the audit file cannot be written.
    pub fn append<T: Serialize>(&self, file: &str, records: &[T]) -> PipelineResult<()> {
        append_lines(&self.dir.join(file), records)
    }
}

/// Settings applied when rows are projected for export
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub goal: Goal,
    pub unparseable_dates: UnparseableDatePolicy,
    pub today: NaiveDate,
    /// Value for `created_at` / `updated_at`
    pub timestamp: String,
}

/// All rows of the run, kept in seed order
#[derive(Debug, Default)]
pub struct RunAccumulator {
    batches: BTreeMap<(usize, String), Vec<Row>>,
}

impl RunAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one seed's rows, replacing any earlier batch of the same seed
    pub fn push(&mut self, batch: SeedRows) {
        self.batches.insert((batch.position, batch.key), batch.rows);
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }

    /// Rows ready for export: expired schedules filtered, ids and
    /// timestamps filled in when the row has none
    #[must_use]
    pub fn export_rows(&self, options: &ExportOptions) -> Vec<Row> {
        let mut out = Vec::new();
        for row in self.batches.values().flatten() {
            if options.goal == Goal::Admission {
                let end = row.get("end_date").and_then(Value::as_str);
                match expiry_decision(end, options.today, options.unparseable_dates) {
                    ExpiryDecision::Keep => {}
                    ExpiryDecision::KeepUnparseable => debug!(
                        target: "campusscrape::run",
                        "keeping row with unparseable end date {:?}: {:?}",
                        end.unwrap_or_default(),
                        row.get("name")
                    ),
                    ExpiryDecision::Expired | ExpiryDecision::DropUnparseable => continue,
                }
            }

            let mut row = row.clone();
            if row.get("id").is_none_or(Value::is_null) {
                row.insert("id".into(), Value::from(out.len() + 1));
            }
            for stamp in ["created_at", "updated_at"] {
                row.entry(stamp)
                    .or_insert_with(|| Value::String(options.timestamp.clone()));
            }
            out.push(row);
        }
        out
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Write rows projected onto the template's columns, atomically
///
/// # Errors
///
/// Fails when the file cannot be written.
pub fn write_csv(path: &Path, template: &Template, rows: &[Row]) -> PipelineResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let temp = NamedTempFile::new_in(dir).map_err(|e| PipelineError::io(dir, e))?;

    let mut writer = csv::Writer::from_writer(temp);
    writer
        .write_record(template.columns())
        .map_err(|e| PipelineError::csv(path, e))?;
    for row in rows {
        writer
            .write_record(template.columns().iter().map(|column| cell(row.get(column))))
            .map_err(|e| PipelineError::csv(path, e))?;
    }

    let temp = writer
        .into_inner()
        .map_err(|e| PipelineError::io(path, e.into_error()))?;
    temp.persist(path)
        .map_err(|e| PipelineError::io(path, e.error))?;
    Ok(())
}

/// Collect the latest `valid` verdict per URL into `valid_links.json`
///
/// # Errors
///
/// Fails when the verdict log cannot be read or the export written.
pub fn write_valid_links(output_dir: &Path) -> PipelineResult<usize> {
    let verdicts = read_lines::<ValidationRecord>(&output_dir.join(VERDICTS_FILE))?;

    let mut latest: BTreeMap<(String, String), ValidationRecord> = BTreeMap::new();
    for record in verdicts {
        latest.insert((record.site_identity.clone(), record.url.clone()), record);
    }
    let valid: Vec<ValidationRecord> = latest
        .into_values()
        .filter(|r| r.verdict == Verdict::Valid)
        .collect();

    let path = output_dir.join(VALID_LINKS_FILE);
    let json = serde_json::to_vec_pretty(&valid).map_err(|e| PipelineError::json(&path, e))?;
    std::fs::write(&path, json).map_err(|e| PipelineError::io(&path, e))?;
    Ok(valid.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    fn options(goal: Goal) -> ExportOptions {
        ExportOptions {
            goal,
            unparseable_dates: UnparseableDatePolicy::Keep,
            today: NaiveDate::from_ymd_opt(2026, 1, 10).expect("date"),
            timestamp: "2026-01-10 08:00:00".into(),
        }
    }

    #[test]
    fn accumulator_orders_by_seed_position() {
        let mut acc = RunAccumulator::new();
        acc.push(SeedRows {
            key: "b|admission".into(),
            position: 1,
            rows: vec![row(json!({"name": "second", "end_date": "2026-02-01"}))],
        });
        acc.push(SeedRows {
            key: "a|admission".into(),
            position: 0,
            rows: vec![
                row(json!({"name": "first", "end_date": "2026-03-01"})),
                row(json!({"name": "expired", "end_date": "2025-12-31"})),
            ],
        });

        let rows = acc.export_rows(&options(Goal::Admission));
        let names: Vec<_> = rows.iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, vec![json!("first"), json!("second")]);
        assert_eq!(rows[1]["id"], json!(2));
        assert_eq!(rows[0]["created_at"], json!("2026-01-10 08:00:00"));
    }

    #[test]
    fn row_store_keeps_last_batch_of_done_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RowStore::new(dir.path().join(ROWS_FILE));
        for (key, name) in [("a", "old"), ("b", "pending"), ("a", "new")] {
            store
                .append(&SeedRows {
                    key: key.into(),
                    position: 0,
                    rows: vec![row(json!({ "name": name }))],
                })
                .expect("append");
        }

        let loaded = store.load(|key| key == "a").expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].rows[0]["name"], json!("new"));
    }

    #[test]
    fn csv_projects_onto_template() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(FINAL_CSV);
        let template = Template::new(vec!["id".into(), "name".into(), "logo".into()]);
        let rows = vec![row(json!({"id": 1, "name": "Universitas, X", "extra": true}))];
        write_csv(&path, &template, &rows).expect("write");

        let written = std::fs::read_to_string(&path).expect("read");
        assert_eq!(written, "id,name,logo\n1,\"Universitas, X\",\n");
    }
}
