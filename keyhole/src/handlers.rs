use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use keyhole_core::{
    generate_domain_report, domain_of, DiscoveryEngine, EngineConfig, KnowledgeStore,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Sent on every fetch; several login pages serve a stripped-down document to
/// obvious non-browser agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_CACHE_DIR: &str = ".keyhole";

/// Cache directory precedence: --cache-dir flag, then KEYHOLE_CACHE_DIR,
/// then the default. Tilde paths are expanded.
pub fn resolve_cache_dir(flag: Option<&str>) -> PathBuf {
    let raw = flag
        .map(str::to_string)
        .or_else(|| std::env::var("KEYHOLE_CACHE_DIR").ok())
        .unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string());
    PathBuf::from(shellexpand::tilde(&raw).as_ref())
}

fn build_engine(cache_dir: PathBuf, marker: &str) -> Result<DiscoveryEngine> {
    let store = KnowledgeStore::new(&cache_dir)
        .with_context(|| format!("failed to open cache at {}", cache_dir.display()))?;
    Ok(DiscoveryEngine::with_config(
        store,
        EngineConfig {
            api_marker: marker.to_string(),
        },
    ))
}

fn make_spinner(msg: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(msg);
    spinner
}

async fn fetch_page(url: &Url, timeout_secs: u64) -> Result<String> {
    let client = reqwest::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .cookie_store(true)
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .get(url.as_str())
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?;

    let status = response.status();
    if !status.is_success() {
        // Error pages still carry forms and scripts worth inspecting.
        warn!("{} answered {}", url, status);
    }

    response
        .text()
        .await
        .with_context(|| format!("failed to read body from {}", url))
}

pub async fn handle_discover(args: &ArgMatches, cache_dir: PathBuf) -> Result<()> {
    let url = args.get_one::<Url>("url").cloned().context("--url is required")?;
    let file = args.get_one::<PathBuf>("file");
    let marker = args.get_one::<String>("marker").map(String::as_str).unwrap_or("/api/");
    let delay_ms = args.get_one::<u64>("delay").copied().unwrap_or(0);
    let timeout_secs = args.get_one::<u64>("timeout").copied().unwrap_or(15);
    let as_json = args.get_flag("json");

    let engine = build_engine(cache_dir, marker)?;

    let html = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            let spinner = make_spinner(format!("Fetching {}", url));
            let html = fetch_page(&url, timeout_secs).await;
            spinner.finish_and_clear();
            html?
        }
    };

    let spinner = make_spinner(format!("Inspecting {}", domain_of(&url)));
    let report = engine.discover(url.as_str(), &html).await?;
    spinner.finish_and_clear();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "\n{} {} new endpoint(s) for {}\n",
        "✓".green().bold(),
        report.new_endpoints.len(),
        report.record.domain.bright_white().bold()
    );
    print!("{}", generate_domain_report(&report.record, Some(&report.new_endpoints)));
    Ok(())
}

pub async fn handle_cached(args: &ArgMatches, cache_dir: PathBuf) -> Result<()> {
    let url = args.get_one::<Url>("url").cloned().context("--url is required")?;
    let as_json = args.get_flag("json");

    let engine = build_engine(cache_dir, "/api/")?;
    match engine.cached(url.as_str()).await? {
        Some(record) if as_json => println!("{}", serde_json::to_string_pretty(&record)?),
        Some(record) => print!("{}", generate_domain_report(&record, None)),
        None => println!("No stored knowledge for {}", domain_of(&url)),
    }
    Ok(())
}

pub async fn handle_domains(cache_dir: PathBuf) -> Result<()> {
    let store = KnowledgeStore::new(&cache_dir)
        .with_context(|| format!("failed to open cache at {}", cache_dir.display()))?;

    let domains = store.domains()?;
    if domains.is_empty() {
        println!("No domains known yet. Run 'keyhole discover' first.");
        return Ok(());
    }
    for domain in domains {
        match store.load(&domain).await {
            Ok(Some(record)) => {
                let scheme = record
                    .authentication
                    .as_ref()
                    .map(|a| a.scheme.as_str())
                    .unwrap_or("unknown");
                println!(
                    "{}  {} endpoint(s), {} run(s), auth: {}",
                    domain.bright_white().bold(),
                    record.endpoints.len(),
                    record.discovery_count,
                    scheme
                );
            }
            Ok(None) => {}
            Err(e) => warn!("skipping {}: {}", domain, e),
        }
    }
    Ok(())
}

pub async fn handle_purge(args: &ArgMatches, cache_dir: PathBuf) -> Result<()> {
    let domain = args
        .get_one::<String>("domain")
        .context("--domain is required")?;

    let store = KnowledgeStore::new(&cache_dir)
        .with_context(|| format!("failed to open cache at {}", cache_dir.display()))?;

    if store.purge(domain).await? {
        println!("{} purged {}", "✓".green().bold(), domain);
    } else {
        println!("Nothing stored for {}", domain);
    }
    Ok(())
}
