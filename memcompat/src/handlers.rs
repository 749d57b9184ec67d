use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use memcompat_core::{CrawlOptions, execute_crawl, generate_crawl_report};
use memcompat_scanner::{Engine, EngineConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, warn};
use url::Url;

/// Everything `crawl` needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct CrawlArgs {
    pub manufacturer: String,
    pub output_dir: PathBuf,
    pub entry_url: Url,
    pub engine: EngineConfig,
}

/// Install the fmt subscriber on stderr so the report on stdout stays clean.
pub fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Expand `~` and environment variables in the output directory.
pub fn expand_output_dir(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

pub fn parse_crawl_args(args: &ArgMatches) -> Result<CrawlArgs> {
    let manufacturer = args
        .get_one::<String>("MANUFACTURER")
        .context("a manufacturer is required")?
        .clone();
    let output_dir = args
        .get_one::<String>("output-dir")
        .map(|dir| expand_output_dir(dir))
        .unwrap_or_else(|| PathBuf::from("items"));
    let entry_url = args
        .get_one::<Url>("entry-url")
        .context("an entry URL is required")?
        .clone();

    let defaults = EngineConfig::default();
    let engine = EngineConfig::default()
        .with_workers(*args.get_one::<usize>("threads").unwrap_or(&defaults.workers))
        .with_politeness_delay(
            args.get_one::<u64>("delay-ms")
                .map(|ms| Duration::from_millis(*ms))
                .unwrap_or(defaults.politeness_delay),
        )
        .with_max_retries(*args.get_one::<u32>("retries").unwrap_or(&defaults.max_retries))
        .with_timeout(*args.get_one::<u64>("timeout").unwrap_or(&defaults.timeout_secs))
        .with_cache(!args.get_flag("no-cache"));

    Ok(CrawlArgs {
        manufacturer,
        output_dir,
        entry_url,
        engine,
    })
}

pub async fn handle_crawl(args: &ArgMatches, quiet: bool) -> Result<()> {
    let crawl = parse_crawl_args(args)?;
    let engine = Engine::new(crawl.engine.clone()).context("failed to build the HTTP client")?;

    // Ctrl-C stops new requests; what is in flight still lands on disk
    let interrupt = engine.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, waiting for in-flight requests");
            interrupt.cancel();
        }
    });

    if !quiet {
        println!("\nCrawling {}", crawl.manufacturer.bright_white().bold());
        println!("Workers: {}", crawl.engine.workers);
        println!("Delay: {:?}", crawl.engine.politeness_delay);
        println!("Output: {}\n", crawl.output_dir.display());
    }

    let summary = execute_crawl(
        engine,
        CrawlOptions {
            manufacturer: crawl.manufacturer.clone(),
            entry_url: crawl.entry_url,
            output_dir: crawl.output_dir,
            show_progress_bars: !quiet,
        },
    )
    .await
    .with_context(|| format!("crawl for '{}' aborted", crawl.manufacturer))?;

    print!("{}", generate_crawl_report(&summary));
    Ok(())
}
