//! # api-guardian
//!
//! Security auditing for AWS API Gateway REST APIs.
//!
//! `api-guardian` walks every API, resource and method of an account and
//! reports which endpoints are left without real access control. Each
//! unprotected endpoint is checked against whitelist categories so that
//! intentionally public routes can be told apart from mistakes.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use api_guardian::{audit, config::Config, finding::RunSummary, output};
//! use api_guardian::gateway::aws_cli::AwsCliGateway;
//! use api_guardian::output::csv::CsvReport;
//! use api_guardian::scanner::{NoopObserver, ScanCancellation};
//!
//! let config = Config::load(None).expect("failed to load config");
//! let gateway = AwsCliGateway::new(&config.aws);
//! let report = CsvReport::create_in(&config.report.dir, None).expect("report");
//!
//! let results = audit::run_audit(
//!     &config,
//!     &gateway,
//!     &report,
//!     &NoopObserver,
//!     ScanCancellation::new(),
//!     None,
//! )
//! .expect("audit failed");
//!
//! let summary = RunSummary::from_results(&results);
//! print!("{}", output::format_report(&results, &summary, &output::OutputFormat::Pretty));
//! ```
//!
//! ## Architecture
//!
//! 1. **[`config`]** loads TOML configuration.
//! 2. **[`gateway`]** abstracts the remote inventory behind the
//!    [`gateway::ApiGateway`] trait; [`gateway::aws_cli`] implements it with
//!    the `aws` CLI.
//! 3. **[`whitelist`]** classifies endpoints against policy categories.
//! 4. **[`scanner`]** scans one API with bounded worker pools and a
//!    per-API authorizer cache.
//! 5. **[`audit`]** runs APIs one after another.
//! 6. **[`finding`]** holds the result types.
//! 7. **[`output`]** streams CSV rows and renders the final reports.
//!
//! ## Authorization types
//!
//! | Type | Counts as protected |
//! |------|---------------------|
//! | `CUSTOM` | yes |
//! | `AWS_IAM` | yes |
//! | `COGNITO_USER_POOLS` | yes |
//! | `NONE` | no, even with an API key |

pub mod audit;
pub mod config;
pub mod error;
pub mod finding;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod output;
pub mod scanner;
pub mod whitelist;
