mod cli;

use api_guardian::config::Config;
use api_guardian::finding::RunSummary;
use api_guardian::gateway::aws_cli::AwsCliGateway;
use api_guardian::gateway::ApiGateway;
use api_guardian::output::csv::{self, CsvReport};
use api_guardian::output::progress::ConsoleObserver;
use api_guardian::scanner::ScanCancellation;
use api_guardian::whitelist::WhitelistPolicy;
use api_guardian::{audit, logging, output};
use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::path::{Path, PathBuf};

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level);

    match cli.command {
        Commands::Scan {
            api,
            pool_size,
            format,
            output_dir,
            whitelist_dir,
            profile,
            region,
            strict,
            verbose,
            config: config_path,
        } => {
            let mut config = load_config(config_path.as_deref());
            if let Some(size) = pool_size {
                config.set_pool_size(size);
            }
            if let Some(dir) = output_dir {
                config.report.dir = dir;
            }
            if let Some(dir) = whitelist_dir {
                config.whitelist.dir = dir;
            }
            apply_aws_overrides(&mut config, profile, region);

            let gateway = AwsCliGateway::new(&config.aws);
            if !gateway.is_available() {
                fatal(
                    &config.report.dir,
                    &format!("`{}` not found on PATH", gateway.binary()),
                    None,
                );
            }

            let report = CsvReport::create_in(&config.report.dir, api.as_deref())
                .unwrap_or_else(|e| fatal(&config.report.dir, "cannot create report", Some(&e)));

            let cancellation = ScanCancellation::new();
            install_interrupt_handler(cancellation.clone());

            let observer = ConsoleObserver::new(verbose);
            let results = audit::run_audit(
                &config,
                &gateway,
                &report,
                &observer,
                cancellation.clone(),
                api.as_deref(),
            )
            .unwrap_or_else(|e| fatal(&config.report.dir, "audit aborted", Some(&e)));

            if let Some(selector) = api.as_deref() {
                if results.is_empty() && !cancellation.is_cancelled() {
                    eprintln!("Error: no scannable API matches '{selector}'");
                    std::process::exit(2);
                }
            }

            let mut summary = RunSummary::from_results(&results);
            summary.interrupted |= cancellation.is_cancelled();

            let mut written: Vec<PathBuf> = vec![report.path().to_path_buf()];
            match csv::write_summary(&config.report.dir, &results) {
                Ok(path) => written.push(path),
                Err(e) => tracing::warn!("could not write API summary: {e}"),
            }
            match output::json::write_report(&config.report.dir, &results, &summary) {
                Ok(path) => written.push(path),
                Err(e) => tracing::warn!("could not write JSON report: {e}"),
            }

            print!("{}", output::format_report(&results, &summary, &format));

            eprintln!();
            for path in &written {
                eprintln!("Report written to {}", path.display());
            }

            let code = if summary.interrupted || (strict && summary.unexpected_unprotected > 0) {
                1
            } else {
                0
            };
            std::process::exit(code);
        }

        Commands::ListApis {
            profile,
            region,
            config: config_path,
        } => {
            let mut config = load_config(config_path.as_deref());
            apply_aws_overrides(&mut config, profile, region);

            let gateway = AwsCliGateway::new(&config.aws);
            let mut apis = gateway.list_apis().unwrap_or_else(|e| {
                eprintln!("Error: {e}");
                std::process::exit(2);
            });
            apis.sort_by(|a, b| a.name.cmp(&b.name));

            println!("{}", "APIs".bold().underline());
            println!();
            for api in &apis {
                let marker = if config.is_api_excluded(&api.name) {
                    " (excluded)".dimmed().to_string()
                } else {
                    String::new()
                };
                println!("  {:<12} {}{marker}", api.id.dimmed(), api.name);
            }
            println!();
            println!("  Total: {} APIs", apis.len());
        }

        Commands::Classify {
            api,
            method,
            path,
            whitelist_dir,
            config: config_path,
        } => {
            let mut config = load_config(config_path.as_deref());
            if let Some(dir) = whitelist_dir {
                config.whitelist.dir = dir;
            }

            let policy = WhitelistPolicy::load(&config.whitelist);
            let source = policy.classify(&api, &method, &path);
            if source == api_guardian::whitelist::NOT_WHITELISTED {
                println!("{} {method} {path}: {}", api.bold(), source.red().bold());
            } else {
                println!("{} {method} {path}: {}", api.bold(), source.green().bold());
            }
        }

        Commands::CheckTools {
            config: config_path,
        } => {
            let config = load_config(config_path.as_deref());
            let gateway = AwsCliGateway::new(&config.aws);

            println!("{}", "Tool Availability".bold().underline());
            println!();

            if !gateway.is_available() {
                println!(
                    "  [{}] {:<20} not found on PATH",
                    "NOT AVAILABLE".red(),
                    gateway.binary()
                );
                std::process::exit(2);
            }
            println!("  [{}] {:<20} installed", "READY".green().bold(), gateway.binary());

            match gateway.caller_identity() {
                Ok(arn) => println!("  [{}] {:<20} {arn}", "READY".green().bold(), "credentials"),
                Err(e) => {
                    println!("  [{}] {:<20} {e}", "NOT AVAILABLE".red(), "credentials");
                    std::process::exit(2);
                }
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> Config {
    Config::load(path).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(2);
    })
}

fn apply_aws_overrides(config: &mut Config, profile: Option<String>, region: Option<String>) {
    if profile.is_some() {
        config.aws.profile = profile;
    }
    if region.is_some() {
        config.aws.region = region;
    }
}

/// Reports a fatal error, leaves an error dump in `report_dir` and exits 2.
fn fatal(report_dir: &Path, message: &str, error: Option<&dyn std::error::Error>) -> ! {
    match error {
        Some(e) => eprintln!("{} {message}: {e}", "Error:".red().bold()),
        None => eprintln!("{} {message}", "Error:".red().bold()),
    }
    match output::write_error_dump(report_dir, message, error) {
        Ok(path) => eprintln!("Error details saved to {}", path.display()),
        Err(e) => tracing::error!("could not write error dump: {e}"),
    }
    std::process::exit(2);
}

/// Cancels the scan on the first Ctrl+C and exits immediately on the second.
fn install_interrupt_handler(cancellation: ScanCancellation) {
    let spawned = std::thread::Builder::new()
        .name("signal".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!("failed to start signal runtime: {e}");
                    return;
                }
            };

            runtime.block_on(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("failed to install Ctrl+C handler: {e}");
                    return;
                }
                eprintln!(
                    "\n{}",
                    "Interrupted: finishing in-flight work, press Ctrl+C again to abort".yellow()
                );
                cancellation.cancel();

                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });
        });

    if let Err(e) = spawned {
        tracing::error!("failed to spawn signal thread: {e}");
    }
}
