use api_guardian::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "api-guardian",
    version,
    about = "Security auditing for AWS API Gateway"
)]
pub struct Cli {
    /// Log level used when API_GUARDIAN_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan APIs for endpoints without access control
    Scan {
        /// Scan only the API with this id or name
        #[arg(long)]
        api: Option<String>,

        /// Resource workers per API (1-30)
        #[arg(long, short)]
        pool_size: Option<usize>,

        /// Format of the report printed at the end
        #[arg(long, short, default_value = "pretty", value_enum)]
        format: OutputFormat,

        /// Directory for report files
        #[arg(long, short)]
        output_dir: Option<PathBuf>,

        /// Directory containing the whitelist files
        #[arg(long)]
        whitelist_dir: Option<PathBuf>,

        /// AWS named profile
        #[arg(long)]
        profile: Option<String>,

        /// AWS region
        #[arg(long)]
        region: Option<String>,

        /// Exit with 1 when an unprotected endpoint is not whitelisted
        #[arg(long)]
        strict: bool,

        /// Print one line per analyzed resource
        #[arg(long, short)]
        verbose: bool,

        /// Custom config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the APIs visible to the configured credentials
    #[command(name = "list-apis")]
    ListApis {
        /// AWS named profile
        #[arg(long)]
        profile: Option<String>,

        /// AWS region
        #[arg(long)]
        region: Option<String>,

        /// Custom config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show which whitelist categories cover an endpoint
    Classify {
        /// API name
        api: String,

        /// HTTP method
        method: String,

        /// Resource path, e.g. /users/{id}
        path: String,

        /// Directory containing the whitelist files
        #[arg(long)]
        whitelist_dir: Option<PathBuf>,

        /// Custom config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check that the aws CLI is installed and credentials resolve
    CheckTools {
        /// Custom config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
