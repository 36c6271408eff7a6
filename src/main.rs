//! review-crawler - Collects dated product reviews from Capterra and Trustpilot.

use anyhow::Result;
use clap::Parser;
use review_crawler::config::{Config, ENV_PREFIX};
use review_crawler::session::SessionBackend;
use review_crawler::{format, scrape, RunRequest};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "review-crawler",
    version,
    about = "Collects product reviews for a company from Capterra and Trustpilot",
    long_about = "Searches each review site for the company, walks its review pages and writes every review published within the date range to a single JSON document."
)]
struct Cli {
    /// Company or product name to search for
    #[arg(long)]
    company: String,

    /// First publication date to keep (YYYY-MM-DD)
    #[arg(long)]
    start_date: String,

    /// Last publication date to keep (YYYY-MM-DD)
    #[arg(long)]
    end_date: String,

    /// Sources to scrape: capterra, trustpilot or all (comma-separated)
    #[arg(short, long, value_delimiter = ',', default_value = "all")]
    source: Vec<String>,

    /// Output file (.json); defaults to a generated name in the output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Page-fetch backend
    #[arg(long)]
    backend: Option<SessionBackend>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Maximum review pages per source
    #[arg(long)]
    max_pages: Option<u32>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long)]
    proxy: Option<String>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = std::env::var(format!("{}LOG_LEVEL", ENV_PREFIX))
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::WARN);

    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(default_level.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Inputs are validated before any browser is started
    let request = RunRequest::parse(&cli.company, &cli.start_date, &cli.end_date, &cli.source)?;

    let mut config = Config::load(cli.config.as_deref())?.with_env();

    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if cli.headful {
        config.headless = false;
    }
    if let Some(max_pages) = cli.max_pages {
        config.max_pages = max_pages;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }

    let document = scrape(&config, &request).await?;
    let path = format::write_document(&document, cli.output.as_deref(), &config.output_dir)?;

    println!("{}", format::summary(&document, Some(&path)));

    Ok(())
}
