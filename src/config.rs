//! Configuration loading and management.
//!
//! The default configuration file is `api-guardian.toml` in the current
//! working directory. Every field has a default, so the file can be omitted:
//!
//! ```toml
//! [filter]
//! excluded_suffixes = ["-DEV", "-CI", "-SANDBOX"]
//!
//! [scan]
//! pool_size = 16
//!
//! [aws]
//! profile = "audit"
//! region = "eu-west-1"
//!
//! [whitelist]
//! dir = "policies"
//!
//! [[whitelist.categories]]
//! name = "PUBLIC"
//! file = "whitelist_PUBLIC.json"
//! ```
//!
//! ```rust,no_run
//! use api_guardian::config::Config;
//!
//! let config = Config::load(None).expect("failed to load config");
//! assert!(config.scan.pool_size >= 1);
//! ```

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "api-guardian.toml";

/// Upper bound on resource workers per API.
pub const MAX_POOL_SIZE: usize = 30;

/// Main configuration.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config {
    /// API and method exclusions.
    pub filter: FilterConfig,
    /// Worker pool sizing.
    pub scan: ScanConfig,
    /// How the `aws` CLI is invoked.
    pub aws: AwsConfig,
    /// Whitelist policy files.
    pub whitelist: WhitelistConfig,
    /// Where report files are written.
    pub report: ReportConfig,
}

/// APIs and methods left out of the audit.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// APIs whose name ends with one of these are not scanned.
    pub excluded_suffixes: Vec<String>,
    /// Methods dropped before analysis (CORS preflight by default).
    pub excluded_methods: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            excluded_suffixes: vec!["-DEV".to_string(), "-CI".to_string()],
            excluded_methods: vec!["OPTIONS".to_string()],
        }
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Resource workers per API. Authorizer discovery uses the same size and
    /// authorizer population half of it. Clamped to `1..=MAX_POOL_SIZE`.
    pub pool_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig { pool_size: 10 }
    }
}

/// `aws` CLI invocation settings.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Binary name or path.
    pub binary: String,
    /// Named profile passed as `--profile`.
    pub profile: Option<String>,
    /// Region passed as `--region`.
    pub region: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        AwsConfig {
            binary: "aws".to_string(),
            profile: None,
            region: None,
        }
    }
}

/// Whitelist category files, evaluated in the listed order.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct WhitelistConfig {
    /// Directory the category files are resolved against.
    pub dir: PathBuf,
    pub categories: Vec<CategoryConfig>,
}

/// One whitelist category.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct CategoryConfig {
    /// Reported in the `whitelist` column when an endpoint matches.
    pub name: String,
    /// File name relative to [`WhitelistConfig::dir`].
    pub file: String,
}

impl CategoryConfig {
    fn named(name: &str) -> Self {
        CategoryConfig {
            name: name.to_string(),
            file: format!("whitelist_{name}.json"),
        }
    }
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        WhitelistConfig {
            dir: PathBuf::from("."),
            categories: vec![
                CategoryConfig::named("PUBLIC"),
                CategoryConfig::named("INTERCEPTOR"),
                CategoryConfig::named("IP_RESTRICTED"),
            ],
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            dir: PathBuf::from("reports"),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// Resolution order:
    /// 1. If `path` is `Some`, load from that file (error if missing).
    /// 2. If `path` is `None`, try [`DEFAULT_CONFIG_FILE`] in the current directory.
    /// 3. If that file does not exist either, return [`Config::default()`].
    ///
    /// The pool size is clamped after loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the explicit path does not exist, or the
    /// file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let config_path = match path {
            Some(p) if p.exists() => Some(p.to_path_buf()),
            Some(p) => return Err(ConfigError::NotFound(p.to_path_buf())),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                default_path.exists().then(|| default_path.to_path_buf())
            }
        };

        let Some(path) = config_path else {
            return Ok(Config::default());
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;
        config.set_pool_size(config.scan.pool_size);
        Ok(config)
    }

    /// Sets the resource pool size, clamped to `1..=MAX_POOL_SIZE`.
    pub fn set_pool_size(&mut self, size: usize) {
        self.scan.pool_size = size.clamp(1, MAX_POOL_SIZE);
    }

    /// Returns `true` if APIs with this name are skipped.
    ///
    /// ```
    /// use api_guardian::config::Config;
    ///
    /// let config = Config::default();
    /// assert!(config.is_api_excluded("payments-DEV"));
    /// assert!(!config.is_api_excluded("payments-PROD"));
    /// ```
    pub fn is_api_excluded(&self, name: &str) -> bool {
        crate::scanner::is_api_excluded(name, &self.filter.excluded_suffixes)
    }
}
