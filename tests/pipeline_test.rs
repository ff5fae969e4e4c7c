//! End-to-end runs over an in-memory site with a scripted oracle

use kodegen_tools_campusscrape::config::{Complete, Goal, RunConfig, RunConfigBuilder};
use kodegen_tools_campusscrape::pipeline::{Pipeline, RunSummary};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

mod common;
use common::{Answer, ScriptedOracle, Site, SiteBackend, challenge_page, write_file};

const VALIDATE: &str = "You validate pages";
const EXTRACT: &str = "You extract NEW-STUDENT";

const SCHEDULES: &str = r#"```json
[
  {"name": "Jalur Mandiri Gelombang 1", "registration_start": "2099-03-01",
   "registration_end": "2099-04-01", "selection_method": "Tes tulis"},
  {"name": "Jalur Mandiri Gelombang 1", "registration_start": "2099-03-01",
   "registration_end": "2099-04-01"},
  {"name": "Jalur Lama", "registration_end": "2020-01-01"},
  {"name": "Tanpa dasar", "registration_end": "2045-01-01"}
]
```"#;

fn admission_site() -> Site {
    Site::new()
        .page("https://kampus.ac.id", r#"<nav><a href="/pmb">PMB</a></nav>"#)
        .page(
            "https://kampus.ac.id/pmb",
            r#"<p>Penerimaan Mahasiswa Baru</p><a href="/pmb/jadwal">Jadwal Pendaftaran 2099</a>"#,
        )
        .page(
            "https://kampus.ac.id/pmb/jadwal",
            "<p>Jadwal Pendaftaran Jalur Mandiri gelombang 1 tahun 2099. \
             Pendaftaran dibuka 2099-03-01 dan ditutup 2099-04-01. \
             Gelombang sebelumnya ditutup 2020-01-01.</p>",
        )
        .result("https://tertutup.ac.id", challenge_page("https://tertutup.ac.id"))
}

fn admission_oracle() -> ScriptedOracle {
    ScriptedOracle::new()
        .answer(VALIDATE, r#"{"is_valid": true, "reason": "registration schedule", "evidence_snippet": "Jadwal Pendaftaran"}"#)
        .answer(EXTRACT, SCHEDULES)
}

fn config(dir: &Path, goal: Goal, template: Option<&Path>) -> RunConfig {
    config_with(dir, goal, template, false)
}

const SEEDS: &str = "name,website,id\nKampus Satu,kampus.ac.id,7\nKampus Tertutup,tertutup.ac.id,8\n";

fn builder(dir: &Path, seeds: &str) -> RunConfigBuilder<Complete> {
    let seeds = write_file(dir, "seeds.csv", seeds).expect("seed file");
    RunConfig::builder()
        .seed_input(seeds)
        .output_dir(dir.join("out"))
        .fetch_attempts(1)
        .retry_base_ms(0)
        .concurrency(2)
        .render(false)
}

fn config_with(dir: &Path, goal: Goal, template: Option<&Path>, validate_only: bool) -> RunConfig {
    let mut cfg = builder(dir, SEEDS).goal(goal).validate_only(validate_only);
    if let Some(template) = template {
        cfg = cfg.template(template);
    }
    cfg.build().expect("config")
}

fn checkpoint(dir: &Path) -> HashMap<String, String> {
    let raw = std::fs::read_to_string(dir.join("out/state/checkpoint.json")).expect("checkpoint");
    let parsed: Value = serde_json::from_str(&raw).expect("checkpoint json");
    parsed["done"]
        .as_object()
        .expect("done map")
        .iter()
        .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
        .collect()
}

#[tokio::test]
async fn admission_run_exports_gated_schedules_and_resumes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = write_file(
        dir.path(),
        "template.csv",
        "id,university_id,name,slug,start_date,end_date,url\n",
    )
    .expect("template");

    let backend = SiteBackend::new(admission_site());
    let oracle = Arc::new(admission_oracle());
    let summary = Pipeline::new(
        config(dir.path(), Goal::Admission, Some(&template)),
        Arc::new(backend.clone()),
        oracle.clone(),
    )
    .run()
    .await
    .expect("first run");

    assert_eq!(summary.seeds, 2);
    assert_eq!(summary.done, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.exported_rows, 1);
    assert_eq!(oracle.calls(), 2);

    let expected = "id,university_id,name,slug,start_date,end_date,url\n\
                    1,7,Jalur Mandiri Gelombang 1,jalur-mandiri-gelombang-1,2099-03-01,2099-04-01,https://kampus.ac.id/pmb/jadwal\n";
    let final_csv = std::fs::read_to_string(dir.path().join("out/final.csv")).expect("final.csv");
    assert_eq!(final_csv, expected);
    let partial_csv = std::fs::read_to_string(dir.path().join("out/partial.csv")).expect("partial.csv");
    assert_eq!(partial_csv, expected);

    let status = checkpoint(dir.path());
    assert_eq!(status["7:https://kampus.ac.id|admission"], "done");
    assert_eq!(status["8:https://tertutup.ac.id|admission"], "error:blocked");

    let valid: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("out/valid_links.json")).expect("valid links"),
    )
    .expect("valid links json");
    assert_eq!(valid.as_array().map(Vec::len), Some(1));
    assert_eq!(valid[0]["url"], "https://kampus.ac.id/pmb/jadwal");

    // Validation and extraction read the page discovery already fetched
    let fetched = backend.fetched();
    assert_eq!(
        fetched.iter().filter(|u| u.as_str() == "https://kampus.ac.id/pmb/jadwal").count(),
        1
    );

    // Second run: the finished seed is skipped, the blocked one retried
    let backend = SiteBackend::new(admission_site());
    let oracle = Arc::new(admission_oracle());
    let summary = Pipeline::new(
        config(dir.path(), Goal::Admission, Some(&template)),
        Arc::new(backend.clone()),
        oracle.clone(),
    )
    .run()
    .await
    .expect("resumed run");

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.done, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(backend.sessions_opened(), 1);
    assert_eq!(oracle.calls(), 0);
    let resumed = std::fs::read_to_string(dir.path().join("out/final.csv")).expect("final.csv");
    assert_eq!(resumed, expected);
}

#[tokio::test]
async fn rate_limited_oracle_fails_only_its_seed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = SiteBackend::new(admission_site());
    let oracle = Arc::new(ScriptedOracle::new().fail(VALIDATE, Answer::RateLimited));

    let summary = Pipeline::new(
        config(dir.path(), Goal::Admission, None),
        Arc::new(backend),
        oracle,
    )
    .run()
    .await
    .expect("run");

    assert_eq!(summary.done, 0);
    assert_eq!(summary.failed, 2);
    let status = checkpoint(dir.path());
    assert_eq!(status["7:https://kampus.ac.id|admission"], "error:oracle-rate-limited");

    let final_csv = std::fs::read_to_string(dir.path().join("out/final.csv")).expect("final.csv");
    assert_eq!(final_csv.lines().count(), 1, "header only");
}

#[tokio::test]
async fn oracle_errors_become_uncertain_verdicts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = SiteBackend::new(admission_site());
    let oracle = Arc::new(ScriptedOracle::new().fail(VALIDATE, Answer::Server));

    let summary = Pipeline::new(
        config(dir.path(), Goal::Admission, None),
        Arc::new(backend),
        oracle,
    )
    .run()
    .await
    .expect("run");

    assert_eq!(summary.done, 1);
    let verdicts = std::fs::read_to_string(dir.path().join("out/verdicts.jsonl")).expect("verdicts");
    let record: Value = serde_json::from_str(verdicts.lines().next().expect("one verdict"))
        .expect("verdict json");
    assert_eq!(record["verdict"], "uncertain");
    assert!(record["reason"].as_str().unwrap_or_default().starts_with("oracle error"));
}

#[tokio::test]
async fn validate_only_keeps_its_own_checkpoint() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config_with(dir.path(), Goal::Admission, None, true);
    let oracle = Arc::new(admission_oracle());
    let summary = Pipeline::new(cfg, Arc::new(SiteBackend::new(admission_site())), oracle.clone())
        .run()
        .await
        .expect("run");

    assert_eq!(summary.done, 1);
    assert_eq!(summary.exported_rows, 0);
    assert_eq!(oracle.calls(), 1, "validation only, no extraction");

    let status = checkpoint(dir.path());
    assert_eq!(status["7:https://kampus.ac.id|admission:validate"], "done");
    assert!(!status.contains_key("7:https://kampus.ac.id|admission"));
}

#[tokio::test]
async fn profile_run_keeps_only_grounded_contacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let site = Site::new()
        .page(
            "https://kampus.ac.id",
            r#"<p>Universitas Kampus Satu. Kontak: info@kampus.ac.id. Telp (021) 786-7222.</p>
               <a href="/tentang">Tentang Kami</a>
               <a href="https://www.instagram.com/kampussatu">Instagram</a>"#,
        )
        .page(
            "https://kampus.ac.id/tentang",
            "<h2>Visi</h2><p>Menjadi kampus unggul</p><h2>Sejarah</h2><p>Didirikan pada 1962</p>",
        )
        .result("https://tertutup.ac.id", challenge_page("https://tertutup.ac.id"));

    let oracle = Arc::new(
        ScriptedOracle::new()
            .answer(
                "type: one of",
                r#"{"type": "University", "email": "palsu@contoh.com", "phone": "021 7867222",
                    "instagram": "https://www.instagram.com/kampussatu",
                    "facebook": "https://facebook.com/karangan", "postal_code": "99999"}"#,
            )
            .answer(
                "vision: concise",
                r#"{"vision": "Menjadi kampus unggul", "mission": "-", "history": "Didirikan pada 1962"}"#,
            ),
    );

    let summary = Pipeline::new(
        config(dir.path(), Goal::Profile, None),
        Arc::new(SiteBackend::new(site)),
        oracle.clone(),
    )
    .run()
    .await
    .expect("run");

    // The blocked seed falls back to a browse prompt and still gets a row
    assert_eq!(summary.done, 2);
    assert_eq!(summary.exported_rows, 2);

    let mut reader = csv::Reader::from_path(dir.path().join("out/final.csv")).expect("final.csv");
    let headers = reader.headers().expect("header").clone();
    let rows: Vec<HashMap<String, String>> = reader
        .records()
        .map(|r| {
            let record = r.expect("record");
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect();

    let first = &rows[0];
    assert_eq!(first["id"], "1");
    assert_eq!(first["name"], "Kampus Satu");
    assert_eq!(first["slug"], "kampus-satu");
    assert_eq!(first["website"], "kampus.ac.id");
    assert_eq!(first["type"], "university");
    assert_eq!(first["email"], "info@kampus.ac.id");
    assert_eq!(first["phone"], "(021) 786-7222");
    assert_eq!(first["instagram"], "https://www.instagram.com/kampussatu");
    assert_eq!(first["facebook"], "-");
    assert_eq!(first["postal_code"], "-");
    assert_eq!(
        first["description"],
        "Didirikan pada 1962\n\nVision: Menjadi kampus unggul"
    );
}

#[tokio::test]
async fn schedules_on_other_sites_are_never_fetched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let site = Site::new()
        .page("https://kampus.ac.id", r#"<nav><a href="/pmb">PMB</a></nav>"#)
        .page(
            "https://kampus.ac.id/pmb",
            r#"<p>Penerimaan Mahasiswa Baru</p>
               <a href="https://other.ac.id/pmb/jadwal">Jadwal Pendaftaran 2099</a>"#,
        )
        .page(
            "https://other.ac.id/pmb/jadwal",
            "<p>Jadwal Pendaftaran Jalur Mandiri gelombang 1 tahun 2099.</p>",
        )
        .result("https://tertutup.ac.id", challenge_page("https://tertutup.ac.id"));
    let backend = SiteBackend::new(site);
    let oracle = Arc::new(admission_oracle());

    let summary = Pipeline::new(
        config(dir.path(), Goal::Admission, None),
        Arc::new(backend.clone()),
        oracle.clone(),
    )
    .run()
    .await
    .expect("run");

    assert_eq!(summary.exported_rows, 0);
    assert_eq!(oracle.calls(), 0);
    assert!(!backend.fetched().iter().any(|u| u.contains("other.ac.id")));
    let final_csv = std::fs::read_to_string(dir.path().join("out/final.csv")).expect("final.csv");
    assert!(!final_csv.contains("other.ac.id"));
}

async fn run_once(dir: &Path, seeds: &str) -> (RunSummary, String) {
    let summary = Pipeline::new(
        builder(dir, seeds).build().expect("config"),
        Arc::new(SiteBackend::new(admission_site())),
        Arc::new(admission_oracle()),
    )
    .run()
    .await
    .expect("run");
    let csv = std::fs::read_to_string(dir.join("out/final.csv")).expect("final.csv");
    (summary, csv)
}

#[tokio::test]
async fn repeated_seed_rows_resume_to_the_same_export() {
    let dir = tempfile::tempdir().expect("tempdir");
    let seeds = "name,website,id\nKampus Satu,kampus.ac.id,7\nKampus Satu,kampus.ac.id,7\n";

    let (first, uninterrupted) = run_once(dir.path(), seeds).await;
    assert_eq!(first.seeds, 1);
    assert_eq!(first.exported_rows, 1);

    let (second, resumed) = run_once(dir.path(), seeds).await;
    assert_eq!(second.skipped, 1);
    assert_eq!(resumed, uninterrupted);
}
