use api_guardian::config::{Config, MAX_POOL_SIZE};
use api_guardian::error::ConfigError;
use api_guardian::scanner::is_method_excluded;
use std::path::{Path, PathBuf};

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("api-guardian.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.scan.pool_size, 10);
    assert_eq!(config.filter.excluded_suffixes, ["-DEV", "-CI"]);
    assert_eq!(config.filter.excluded_methods, ["OPTIONS"]);
    assert_eq!(config.aws.binary, "aws");
    assert_eq!(config.report.dir, PathBuf::from("reports"));

    let names: Vec<&str> = config
        .whitelist
        .categories
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, ["PUBLIC", "INTERCEPTOR", "IP_RESTRICTED"]);
    assert_eq!(config.whitelist.categories[0].file, "whitelist_PUBLIC.json");
}

#[test]
fn load_partial_file_keeps_other_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[scan]
pool_size = 16

[aws]
profile = "audit"
region = "eu-west-1"
"#,
    );

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.scan.pool_size, 16);
    assert_eq!(config.aws.profile.as_deref(), Some("audit"));
    assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
    assert_eq!(config.aws.binary, "aws");
    assert_eq!(config.filter.excluded_methods, ["OPTIONS"]);
}

#[test]
fn load_custom_categories_and_filters() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[filter]
excluded_suffixes = ["-SANDBOX"]

[whitelist]
dir = "policies"

[[whitelist.categories]]
name = "PARTNER"
file = "partner.json"
"#,
    );

    let config = Config::load(Some(&path)).unwrap();
    assert!(config.is_api_excluded("shop-SANDBOX"));
    assert!(!config.is_api_excluded("shop-DEV"));
    assert_eq!(config.whitelist.dir, PathBuf::from("policies"));
    assert_eq!(config.whitelist.categories.len(), 1);
    assert_eq!(config.whitelist.categories[0].name, "PARTNER");
}

#[test]
fn pool_size_is_clamped_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[scan]\npool_size = 500\n");
    assert_eq!(Config::load(Some(&path)).unwrap().scan.pool_size, MAX_POOL_SIZE);

    let path = write_config(dir.path(), "[scan]\npool_size = 0\n");
    assert_eq!(Config::load(Some(&path)).unwrap().scan.pool_size, 1);
}

#[test]
fn set_pool_size_clamps() {
    let mut config = Config::default();
    config.set_pool_size(31);
    assert_eq!(config.scan.pool_size, 30);
    config.set_pool_size(7);
    assert_eq!(config.scan.pool_size, 7);
}

#[test]
fn default_method_exclusion_ignores_case() {
    let excluded = Config::default().filter.excluded_methods;
    assert!(is_method_excluded("OPTIONS", &excluded));
    assert!(is_method_excluded("options", &excluded));
    assert!(!is_method_excluded("GET", &excluded));
}

#[test]
fn api_exclusion_matches_suffix_only() {
    let config = Config::default();
    assert!(config.is_api_excluded("payments-DEV"));
    assert!(!config.is_api_excluded("DEV-payments"));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/api-guardian.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn invalid_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[scan\npool_size = ");
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
