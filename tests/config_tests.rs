//! Tests for the type-safe configuration builder pattern

use kodegen_tools_campusscrape::config::{
    DiscoveryProfile, Goal, OracleConfig, RunConfig, UnparseableDatePolicy,
};
use kodegen_tools_campusscrape::utils::{DEFAULT_FALLBACK_MODELS, DEFAULT_ORACLE_MODEL};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn minimal(dir: &Path) -> RunConfig {
    RunConfig::builder()
        .seed_input(dir.join("seeds.csv"))
        .output_dir(dir.join("out"))
        .build()
        .unwrap()
}

#[test]
fn test_builder_optional_fields_have_defaults() {
    // RunConfig::builder().build() does not compile without both required paths
    let temp_dir = TempDir::new().unwrap();
    let config = minimal(temp_dir.path());

    assert_eq!(config.seed_input(), temp_dir.path().join("seeds.csv"));
    assert_eq!(config.output_dir(), temp_dir.path().join("out"));
    assert_eq!(config.template(), None);
    assert_eq!(config.goal(), Goal::Admission);
    assert_eq!(config.max_pages(), 80);
    assert_eq!(config.max_depth(), 3);
    assert_eq!(config.max_entry_points(), 3);
    assert_eq!(config.max_bundle_pages(), 10);
    assert_eq!(config.concurrency(), 2);
    assert_eq!(config.min_score(), None);
    assert_eq!(config.fetch_timeout(), Duration::from_millis(25_000));
    assert!(config.render());
    assert!(config.headless());
    assert!(!config.validate_only());
    assert_eq!(config.unparseable_dates(), UnparseableDatePolicy::Keep);
}

#[test]
fn test_builder_with_optional_fields() {
    let temp_dir = TempDir::new().unwrap();
    let config = RunConfig::builder()
        .seed_input(temp_dir.path().join("seeds.csv"))
        .output_dir(temp_dir.path().join("out"))
        .template(temp_dir.path().join("template.csv"))
        .goal(Goal::Profile)
        .max_pages(12)
        .max_depth(1)
        .min_score(2.5)
        .fetch_attempts(4)
        .retry_base_ms(10)
        .concurrency(6)
        .render(false)
        .validate_only(true)
        .unparseable_dates(UnparseableDatePolicy::Drop)
        .build()
        .unwrap();

    assert_eq!(config.template(), Some(temp_dir.path().join("template.csv").as_path()));
    assert_eq!(config.goal(), Goal::Profile);
    assert_eq!(config.concurrency(), 6);
    assert!(!config.render());
    assert!(config.validate_only());
    assert_eq!(config.unparseable_dates(), UnparseableDatePolicy::Drop);

    let limits = config.discovery_limits();
    assert_eq!(limits.max_pages, 12);
    assert_eq!(limits.max_depth, 1);

    let policy = config.retry_policy();
    assert_eq!(policy.attempts, 4);
    assert_eq!(policy.base_sleep, Duration::from_millis(10));
}

#[test]
fn test_zero_budgets_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let base = || {
        RunConfig::builder()
            .seed_input(temp_dir.path().join("seeds.csv"))
            .output_dir(temp_dir.path().join("out"))
    };

    assert!(base().max_pages(0).build().is_err());
    assert!(base().concurrency(0).build().is_err());
    assert!(base().fetch_attempts(0).build().is_err());
    assert!(base().min_score(f64::NAN).build().is_err());
}

#[test]
fn test_state_lives_under_the_output_dir() {
    let temp_dir = TempDir::new().unwrap();
    let config = minimal(temp_dir.path());

    assert_eq!(config.state_dir(), temp_dir.path().join("out/state"));
    assert_eq!(
        config.checkpoint_path(),
        temp_dir.path().join("out/state/checkpoint.json")
    );
}

#[test]
fn test_min_score_overrides_profile() {
    let temp_dir = TempDir::new().unwrap();
    let default_min = DiscoveryProfile::contact().min_score;

    let untouched = minimal(temp_dir.path()).tune_profile(DiscoveryProfile::contact());
    assert_eq!(untouched.min_score, default_min);

    let tuned = RunConfig::builder()
        .seed_input(temp_dir.path().join("seeds.csv"))
        .output_dir(temp_dir.path().join("out"))
        .min_score(7.0)
        .build()
        .unwrap()
        .tune_profile(DiscoveryProfile::contact());
    assert_eq!(tuned.min_score, 7.0);
}

#[test]
fn test_goal_parsing() {
    assert_eq!("admission".parse::<Goal>().unwrap(), Goal::Admission);
    assert_eq!(" Jalur ".parse::<Goal>().unwrap(), Goal::Admission);
    assert_eq!("PROFILE".parse::<Goal>().unwrap(), Goal::Profile);
    assert_eq!("info".parse::<Goal>().unwrap(), Goal::Profile);
    assert!("jadwal".parse::<Goal>().is_err());

    assert_eq!(Goal::Admission.to_string(), "admission");
    assert_eq!(Goal::Profile.field_set_key(), "profile");
}

#[test]
fn test_oracle_model_chain() {
    let config = OracleConfig::new("key");
    assert_eq!(config.models[0], DEFAULT_ORACLE_MODEL);
    assert_eq!(config.models.len(), 1 + DEFAULT_FALLBACK_MODELS.len());

    let promoted = OracleConfig::new("key").with_primary_model(DEFAULT_FALLBACK_MODELS[0]);
    assert_eq!(promoted.models[0], DEFAULT_FALLBACK_MODELS[0]);
    assert_eq!(promoted.models.len(), 1 + DEFAULT_FALLBACK_MODELS.len());

    let custom = OracleConfig::new("key")
        .with_primary_model("primary")
        .with_fallback_models(vec![
            "backup".to_string(),
            "primary".to_string(),
            "backup".to_string(),
        ]);
    assert_eq!(custom.models, vec!["primary", "backup"]);
}

#[test]
fn test_oracle_debug_hides_the_key() {
    let rendered = format!("{:?}", OracleConfig::new("secret-key"));
    assert!(!rendered.contains("secret-key"));
    assert!(rendered.contains("<redacted>"));
}
