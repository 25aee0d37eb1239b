//! villa-gateway: availability service for the villa booking widget
//!
//! Usage:
//!   villa-gateway                              - Start the HTTP API
//!   villa-gateway --check <checkIn> <checkOut> - Check one stay and exit
//!   villa-gateway --help                       - Show help

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vb_calendar::AvailabilityAggregator;
use vb_core::Config;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// HTTP API server
    Server,
    /// One-shot availability check
    Check { check_in: String, check_out: String },
    /// Show help
    Help,
    /// Show version
    Version,
    /// Unusable arguments
    Invalid(String),
}

/// Exit codes for `--check`
const EXIT_AVAILABLE: i32 = 0;
const EXIT_UNAVAILABLE: i32 = 1;
const EXIT_ERROR: i32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1));

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("villa-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Invalid(ref reason) => {
            eprintln!("{}", reason);
            eprintln!("Run with --help for usage");
            std::process::exit(EXIT_ERROR);
        }
        _ => {}
    }

    // Load .env before reading RUST_LOG or any config variable
    dotenvy::dotenv().ok();

    // Logs go to stderr so `--check` output stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    if config.calendars.is_empty() {
        tracing::warn!("No calendars configured; every stay will be reported available");
    }

    let aggregator = AvailabilityAggregator::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create availability aggregator: {}", e))?;

    match mode {
        RunMode::Check {
            check_in,
            check_out,
        } => {
            let code = run_check(&aggregator, &check_in, &check_out).await;
            std::process::exit(code);
        }
        RunMode::Server => run_server(config, aggregator).await,
        _ => Ok(()),
    }
}

/// Parse command line arguments (without the program name)
fn parse_args<I>(args: I) -> RunMode
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();

    match args.next().as_deref() {
        None => RunMode::Server,
        Some("--check" | "-c") => match (args.next(), args.next()) {
            (Some(check_in), Some(check_out)) => RunMode::Check {
                check_in,
                check_out,
            },
            _ => RunMode::Invalid("--check requires <checkIn> <checkOut>".to_string()),
        },
        Some("--help" | "-h") => RunMode::Help,
        Some("--version" | "-v") => RunMode::Version,
        Some(other) => RunMode::Invalid(format!("Unknown argument: {}", other)),
    }
}

/// Print help message
fn print_help() {
    println!("villa-gateway - Villa availability service");
    println!();
    println!("Usage:");
    println!("  villa-gateway                               Start the HTTP API");
    println!("  villa-gateway --check <checkIn> <checkOut>  Check one stay (YYYY-MM-DD) and exit");
    println!("  villa-gateway --help                        Show this help message");
    println!("  villa-gateway --version                     Show version");
    println!();
    println!("Exit codes for --check: 0 available, 1 unavailable, 2 error");
    println!();
    println!("Environment Variables:");
    println!("  VILLA_CONFIG_PATH     Config file (default: ./villa-gateway.toml)");
    println!("  CALENDAR_SOURCES      Calendars as Name=url;Name=url (overrides config file)");
    println!("  VILLA_TIMEZONE        IANA timezone of the villa (default: UTC)");
    println!("  FETCH_TIMEOUT_SECS    Per-calendar fetch timeout (default: 10)");
    println!("  API_PORT              HTTP API port (default: 3000)");
    println!("  API_ALLOWED_ORIGINS   Comma-separated CORS origins (default: any)");
    println!("  RUST_LOG              Log filter (default: info)");
}

/// Run a single check and print the verdict as JSON
async fn run_check(aggregator: &AvailabilityAggregator, check_in: &str, check_out: &str) -> i32 {
    match aggregator.check_availability(check_in, check_out).await {
        Ok(verdict) => {
            match serde_json::to_string_pretty(&verdict) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return EXIT_ERROR;
                }
            }
            if verdict.available {
                EXIT_AVAILABLE
            } else {
                EXIT_UNAVAILABLE
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    }
}

/// Run server mode (HTTP API)
async fn run_server(config: Config, aggregator: AvailabilityAggregator) -> anyhow::Result<()> {
    tracing::info!("Starting villa-gateway...");
    tracing::info!(
        "Timezone: {}, calendars: {:?}",
        aggregator.timezone(),
        aggregator
            .sources()
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
    );

    vb_api::start_server(Arc::new(config), Arc::new(aggregator)).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_args_is_server_mode() {
        assert_eq!(parse_args(args(&[])), RunMode::Server);
    }

    #[test]
    fn test_check_mode() {
        assert_eq!(
            parse_args(args(&["--check", "2026-05-20", "2026-05-21"])),
            RunMode::Check {
                check_in: "2026-05-20".to_string(),
                check_out: "2026-05-21".to_string(),
            }
        );
    }

    #[test]
    fn test_check_mode_requires_both_dates() {
        assert!(matches!(parse_args(args(&["-c", "2026-05-20"])), RunMode::Invalid(_)));
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse_args(args(&["-h"])), RunMode::Help);
        assert_eq!(parse_args(args(&["--version"])), RunMode::Version);
    }

    #[test]
    fn test_unknown_argument() {
        assert!(matches!(parse_args(args(&["--cli"])), RunMode::Invalid(_)));
    }
}
