//! Whitelist policies: intentionally exempted endpoints.
//!
//! A policy is a fixed, ordered list of named categories (by default
//! `PUBLIC`, `INTERCEPTOR` and `IP_RESTRICTED`), each loaded from its own JSON
//! file:
//!
//! ```json
//! {
//!   "whitelist": {
//!     "OrdersAPI": [
//!       "/health",
//!       { "method": "GET", "path": "/users/*/profile" },
//!       { "path": "/webhook/jumio/*" }
//!     ]
//!   }
//! }
//! ```
//!
//! A bare string is the legacy form and matches any method.
//!
//! # Path patterns
//!
//! | Pattern | Matches | Does not match |
//! |---------|---------|----------------|
//! | `/health` | `/health` | `/health/live` |
//! | `/webhook/jumio/*` | `/webhook/jumio/a`, `/webhook/jumio/a/b` | `/webhook/jumio/`, `/webhook/jumio` |
//! | `/users/*/profile` | `/users/42/profile` | `/users/42/profile/extra` |

use crate::config::WhitelistConfig;
use crate::error::WhitelistError;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// Classification returned when no category covers an endpoint.
pub const NOT_WHITELISTED: &str = "NO";

/// Which HTTP methods an entry applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodScope {
    /// Legacy entries and entries without a `method` field.
    Any,
    /// Stored upper-cased.
    Only(String),
}

impl MethodScope {
    fn allows(&self, method: &str) -> bool {
        match self {
            MethodScope::Any => true,
            MethodScope::Only(m) => m.eq_ignore_ascii_case(method),
        }
    }
}

#[derive(Debug, Clone)]
enum PatternKind {
    Literal,
    /// `prefix/*`; holds `prefix/`.
    Subtree(String),
    /// `*` inside the pattern, one segment per `*`.
    Segments(Regex),
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    kind: PatternKind,
}

impl PathPattern {
    /// Compiles a pattern string.
    ///
    /// # Errors
    ///
    /// Returns the regex error if a segment-wildcard pattern cannot be
    /// compiled (e.g. it exceeds the regex size limit).
    pub fn parse(raw: &str) -> Result<Self, regex::Error> {
        let kind = if let Some(prefix) = raw.strip_suffix("/*") {
            PatternKind::Subtree(format!("{prefix}/"))
        } else if raw.contains('*') {
            let body = raw
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join("[^/]+");
            PatternKind::Segments(Regex::new(&format!("^{body}$"))?)
        } else {
            PatternKind::Literal
        };

        Ok(PathPattern {
            raw: raw.to_string(),
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        if path == self.raw {
            return true;
        }
        match &self.kind {
            PatternKind::Literal => false,
            // At least one segment past the prefix is required.
            PatternKind::Subtree(prefix) => path.starts_with(prefix.as_str()) && path != prefix,
            PatternKind::Segments(re) => re.is_match(path),
        }
    }
}

/// One exempted `(method, path pattern)` pair.
#[derive(Debug, Clone)]
pub struct WhitelistEntry {
    pub method: MethodScope,
    pub pattern: PathPattern,
}

impl WhitelistEntry {
    pub fn matches(&self, method: &str, path: &str) -> bool {
        self.method.allows(method) && self.pattern.matches(path)
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Legacy(String),
    Scoped {
        method: Option<String>,
        path: String,
    },
}

#[derive(serde::Deserialize)]
struct WhitelistFile {
    #[serde(default)]
    whitelist: HashMap<String, Vec<RawEntry>>,
}

/// A named list of exempted endpoints, grouped by API name.
#[derive(Debug, Clone, Default)]
pub struct WhitelistCategory {
    pub name: String,
    apis: HashMap<String, Vec<WhitelistEntry>>,
}

impl WhitelistCategory {
    pub fn empty(name: &str) -> Self {
        WhitelistCategory {
            name: name.to_string(),
            apis: HashMap::new(),
        }
    }

    /// Parses a category from the JSON file format described in the module
    /// docs. Entries whose pattern does not compile are skipped with a warning.
    pub fn from_json(name: &str, content: &str) -> Result<Self, serde_json::Error> {
        let file: WhitelistFile = serde_json::from_str(content)?;
        let mut apis = HashMap::with_capacity(file.whitelist.len());

        for (api_name, raw_entries) in file.whitelist {
            let mut entries = Vec::with_capacity(raw_entries.len());
            for raw in raw_entries {
                let (method, path) = match raw {
                    RawEntry::Legacy(path) => (MethodScope::Any, path),
                    RawEntry::Scoped { method: None, path } => (MethodScope::Any, path),
                    RawEntry::Scoped {
                        method: Some(m),
                        path,
                    } => (MethodScope::Only(m.to_uppercase()), path),
                };
                match PathPattern::parse(&path) {
                    Ok(pattern) => entries.push(WhitelistEntry { method, pattern }),
                    Err(e) => {
                        tracing::warn!(category = name, api = %api_name, pattern = %path, "skipping whitelist entry: {e}");
                    }
                }
            }
            apis.insert(api_name, entries);
        }

        Ok(WhitelistCategory {
            name: name.to_string(),
            apis,
        })
    }

    /// Loads a category file. A missing file yields `Ok(None)`.
    pub fn load_file(name: &str, path: &Path) -> Result<Option<Self>, WhitelistError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| WhitelistError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let category = Self::from_json(name, &content).map_err(|source| WhitelistError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(category))
    }

    /// Adds an entry programmatically.
    pub fn insert(&mut self, api_name: &str, entry: WhitelistEntry) {
        self.apis.entry(api_name.to_string()).or_default().push(entry);
    }

    pub fn matches(&self, api_name: &str, method: &str, path: &str) -> bool {
        self.apis
            .get(api_name)
            .is_some_and(|entries| entries.iter().any(|e| e.matches(method, path)))
    }

    pub fn api_count(&self) -> usize {
        self.apis.len()
    }

    pub fn entry_count(&self) -> usize {
        self.apis.values().map(Vec::len).sum()
    }
}

/// All whitelist categories of a run, in evaluation order.
///
/// Read-only after loading, so it is shared by reference across workers.
#[derive(Debug, Clone, Default)]
pub struct WhitelistPolicy {
    categories: Vec<WhitelistCategory>,
}

impl WhitelistPolicy {
    pub fn new(categories: Vec<WhitelistCategory>) -> Self {
        WhitelistPolicy { categories }
    }

    /// Loads every configured category.
    ///
    /// A missing file is an empty category. A file that cannot be read or
    /// parsed is logged and also treated as empty; a bad policy file never
    /// stops a scan.
    pub fn load(config: &WhitelistConfig) -> Self {
        let categories = config
            .categories
            .iter()
            .map(|c| {
                let path = config.dir.join(&c.file);
                match WhitelistCategory::load_file(&c.name, &path) {
                    Ok(Some(category)) => {
                        tracing::info!(
                            category = %c.name,
                            apis = category.api_count(),
                            endpoints = category.entry_count(),
                            "loaded whitelist"
                        );
                        category
                    }
                    Ok(None) => {
                        tracing::debug!(category = %c.name, path = %path.display(), "no whitelist file");
                        WhitelistCategory::empty(&c.name)
                    }
                    Err(e) => {
                        tracing::warn!(category = %c.name, "{e}");
                        WhitelistCategory::empty(&c.name)
                    }
                }
            })
            .collect();

        WhitelistPolicy { categories }
    }

    pub fn categories(&self) -> &[WhitelistCategory] {
        &self.categories
    }

    /// Classifies an endpoint against every category, in order.
    ///
    /// Returns the `+`-joined names of all matching categories (e.g.
    /// `"PUBLIC+INTERCEPTOR"`) or [`NOT_WHITELISTED`].
    ///
    /// # Examples
    ///
    /// ```
    /// use api_guardian::whitelist::{WhitelistCategory, WhitelistPolicy};
    ///
    /// let public = WhitelistCategory::from_json(
    ///     "PUBLIC",
    ///     r#"{"whitelist": {"OrdersAPI": [{"method": "GET", "path": "/users/*/profile"}]}}"#,
    /// ).unwrap();
    /// let policy = WhitelistPolicy::new(vec![public]);
    ///
    /// assert_eq!(policy.classify("OrdersAPI", "GET", "/users/42/profile"), "PUBLIC");
    /// assert_eq!(policy.classify("OrdersAPI", "GET", "/users/42/profile/extra"), "NO");
    /// ```
    pub fn classify(&self, api_name: &str, method: &str, path: &str) -> String {
        let matched: Vec<&str> = self
            .categories
            .iter()
            .filter(|c| c.matches(api_name, method, path))
            .map(|c| c.name.as_str())
            .collect();

        if matched.is_empty() {
            NOT_WHITELISTED.to_string()
        } else {
            matched.join("+")
        }
    }
}
