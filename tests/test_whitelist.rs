use api_guardian::config::WhitelistConfig;
use api_guardian::whitelist::{
    MethodScope, PathPattern, WhitelistCategory, WhitelistEntry, WhitelistPolicy, NOT_WHITELISTED,
};

fn category(name: &str, json: &str) -> WhitelistCategory {
    WhitelistCategory::from_json(name, json).expect("valid whitelist JSON")
}

fn pattern(raw: &str) -> PathPattern {
    PathPattern::parse(raw).expect("valid pattern")
}

// ---------------------------------------------------------------------------
// Path patterns
// ---------------------------------------------------------------------------

#[test]
fn literal_pattern_matches_only_itself() {
    let p = pattern("/health");
    assert!(p.matches("/health"));
    assert!(!p.matches("/health/live"));
    assert!(!p.matches("/healthz"));
}

#[test]
fn subtree_pattern_requires_a_segment_after_prefix() {
    let p = pattern("/webhook/jumio/*");
    assert!(p.matches("/webhook/jumio/a"));
    assert!(p.matches("/webhook/jumio/a/b"));
    assert!(!p.matches("/webhook/jumio/"));
    assert!(!p.matches("/webhook/jumio"));
    assert!(!p.matches("/webhook/other/a"));
}

#[test]
fn segment_wildcard_matches_exactly_one_segment() {
    let p = pattern("/users/*/profile");
    assert!(p.matches("/users/42/profile"));
    assert!(p.matches("/users/{id}/profile"));
    assert!(!p.matches("/users/42/profile/extra"));
    assert!(!p.matches("/users/42/43/profile"));
    assert!(!p.matches("/users//profile"));
}

#[test]
fn segment_wildcard_escapes_regex_metacharacters() {
    let p = pattern("/v1.0/*/items");
    assert!(p.matches("/v1.0/shop/items"));
    assert!(!p.matches("/v1x0/shop/items"));
}

#[test]
fn pattern_equal_to_path_always_matches() {
    assert!(pattern("/files/*").matches("/files/*"));
    assert!(pattern("/a/*/b").matches("/a/*/b"));
}

// ---------------------------------------------------------------------------
// Entries and categories
// ---------------------------------------------------------------------------

#[test]
fn legacy_entry_matches_any_method() {
    let public = category("PUBLIC", r#"{"whitelist": {"OrdersAPI": ["/health"]}}"#);
    assert!(public.matches("OrdersAPI", "GET", "/health"));
    assert!(public.matches("OrdersAPI", "DELETE", "/health"));
}

#[test]
fn scoped_entry_matches_its_method_case_insensitively() {
    let public = category(
        "PUBLIC",
        r#"{"whitelist": {"OrdersAPI": [{"method": "get", "path": "/catalog"}]}}"#,
    );
    assert!(public.matches("OrdersAPI", "GET", "/catalog"));
    assert!(public.matches("OrdersAPI", "get", "/catalog"));
    assert!(!public.matches("OrdersAPI", "POST", "/catalog"));
}

#[test]
fn entry_without_method_matches_any_method() {
    let public = category(
        "PUBLIC",
        r#"{"whitelist": {"OrdersAPI": [{"path": "/webhook/*"}]}}"#,
    );
    assert!(public.matches("OrdersAPI", "POST", "/webhook/stripe"));
    assert!(public.matches("OrdersAPI", "PUT", "/webhook/stripe"));
}

#[test]
fn entries_are_scoped_to_their_api() {
    let public = category("PUBLIC", r#"{"whitelist": {"OrdersAPI": ["/health"]}}"#);
    assert!(!public.matches("BillingAPI", "GET", "/health"));
}

#[test]
fn category_counts_apis_and_entries() {
    let public = category(
        "PUBLIC",
        r#"{"whitelist": {"A": ["/x", "/y"], "B": [{"method": "GET", "path": "/z"}]}}"#,
    );
    assert_eq!(public.api_count(), 2);
    assert_eq!(public.entry_count(), 3);
}

#[test]
fn file_without_whitelist_key_is_empty() {
    let public = category("PUBLIC", "{}");
    assert_eq!(public.api_count(), 0);
}

#[test]
fn malformed_json_is_rejected() {
    assert!(WhitelistCategory::from_json("PUBLIC", "{not json").is_err());
}

#[test]
fn inserted_entry_is_matched() {
    let mut cat = WhitelistCategory::empty("INTERCEPTOR");
    cat.insert(
        "OrdersAPI",
        WhitelistEntry {
            method: MethodScope::Only("POST".to_string()),
            pattern: pattern("/orders/*"),
        },
    );
    assert!(cat.matches("OrdersAPI", "POST", "/orders/1"));
    assert!(!cat.matches("OrdersAPI", "GET", "/orders/1"));
}

// ---------------------------------------------------------------------------
// Policy classification
// ---------------------------------------------------------------------------

fn policy() -> WhitelistPolicy {
    WhitelistPolicy::new(vec![
        category("PUBLIC", r#"{"whitelist": {"OrdersAPI": ["/health", "/docs/*"]}}"#),
        category(
            "INTERCEPTOR",
            r#"{"whitelist": {"OrdersAPI": [{"method": "GET", "path": "/health"}]}}"#,
        ),
        category(
            "IP_RESTRICTED",
            r#"{"whitelist": {"OrdersAPI": [{"method": "POST", "path": "/internal/*/sync"}]}}"#,
        ),
    ])
}

#[test]
fn classify_joins_all_matching_categories_in_order() {
    assert_eq!(
        policy().classify("OrdersAPI", "GET", "/health"),
        "PUBLIC+INTERCEPTOR"
    );
}

#[test]
fn classify_single_category() {
    let p = policy();
    assert_eq!(p.classify("OrdersAPI", "POST", "/health"), "PUBLIC");
    assert_eq!(p.classify("OrdersAPI", "GET", "/docs/index"), "PUBLIC");
    assert_eq!(
        p.classify("OrdersAPI", "POST", "/internal/eu/sync"),
        "IP_RESTRICTED"
    );
}

#[test]
fn classify_unmatched_endpoint_is_not_whitelisted() {
    let p = policy();
    assert_eq!(p.classify("OrdersAPI", "GET", "/orders"), NOT_WHITELISTED);
    assert_eq!(p.classify("UnknownAPI", "GET", "/health"), NOT_WHITELISTED);
}

#[test]
fn empty_policy_whitelists_nothing() {
    let p = WhitelistPolicy::default();
    assert_eq!(p.classify("OrdersAPI", "GET", "/health"), "NO");
}

// ---------------------------------------------------------------------------
// Loading from disk
// ---------------------------------------------------------------------------

#[test]
fn load_reads_configured_files_and_tolerates_missing_and_malformed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("whitelist_PUBLIC.json"),
        r#"{"whitelist": {"OrdersAPI": ["/health"]}}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("whitelist_INTERCEPTOR.json"), "{broken").unwrap();

    let config = WhitelistConfig {
        dir: dir.path().to_path_buf(),
        ..WhitelistConfig::default()
    };
    let policy = WhitelistPolicy::load(&config);

    let names: Vec<&str> = policy.categories().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["PUBLIC", "INTERCEPTOR", "IP_RESTRICTED"]);
    assert_eq!(policy.categories()[0].entry_count(), 1);
    assert_eq!(policy.categories()[1].entry_count(), 0);
    assert_eq!(policy.categories()[2].entry_count(), 0);
    assert_eq!(policy.classify("OrdersAPI", "GET", "/health"), "PUBLIC");
}

#[test]
fn load_file_reports_missing_file_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = WhitelistCategory::load_file("PUBLIC", &dir.path().join("nope.json")).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn load_file_reports_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "[1, 2").unwrap();
    let err = WhitelistCategory::load_file("PUBLIC", &path).unwrap_err();
    assert!(err.to_string().contains("bad.json"));
}
