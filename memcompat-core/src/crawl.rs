use crate::store::{RecordStore, StoreError};
use chrono::{DateTime, Local};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use memcompat_scanner::{
    CompatibilityRecord, CrawlOutcome, CrawlState, Engine, Navigator, ProgressCallback,
    RecordCallback, ScanError,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::warn;
use url::Url;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub manufacturer: String,
    pub entry_url: Url,
    pub output_dir: PathBuf,
    pub show_progress_bars: bool,
}

/// A record that could not be persisted.
#[derive(Debug, Clone)]
pub struct WriteFailure {
    pub model: String,
    pub error: String,
}

/// Everything a finished crawl reports back to the user.
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub manufacturer: String,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
    pub outcome: CrawlOutcome,
    pub written: Vec<PathBuf>,
    pub write_failures: Vec<WriteFailure>,
}

/// Persists records off the async runtime and keeps track of the results.
///
/// Each write runs on the blocking pool; [`RecordSink::finish`] waits for all
/// of them before the crawl is summarized.
struct RecordSink {
    store: RecordStore,
    written: Arc<StdMutex<Vec<PathBuf>>>,
    failures: Arc<StdMutex<Vec<WriteFailure>>>,
    pending: Arc<StdMutex<Vec<JoinHandle<()>>>>,
}

impl RecordSink {
    fn new(store: RecordStore) -> Self {
        Self {
            store,
            written: Arc::new(StdMutex::new(Vec::new())),
            failures: Arc::new(StdMutex::new(Vec::new())),
            pending: Arc::new(StdMutex::new(Vec::new())),
        }
    }

    fn callback(&self) -> RecordCallback {
        let store = self.store.clone();
        let written = self.written.clone();
        let failures = self.failures.clone();
        let pending = self.pending.clone();

        Arc::new(move |record: CompatibilityRecord| {
            let store = store.clone();
            let written = written.clone();
            let failures = failures.clone();

            let handle = tokio::task::spawn_blocking(move || match store.write(&record) {
                Ok(path) => {
                    if let Ok(mut written) = written.lock()
                        && !written.contains(&path)
                    {
                        written.push(path);
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to save {} / {}: {}",
                        record.manufacturer, record.motherboard_model, e
                    );
                    if let Ok(mut failures) = failures.lock() {
                        failures.push(WriteFailure {
                            model: record.motherboard_model,
                            error: e.to_string(),
                        });
                    }
                }
            });

            if let Ok(mut pending) = pending.lock() {
                pending.push(handle);
            }
        })
    }

    /// Waits for every outstanding write and returns the saved paths and the
    /// failed writes.
    async fn finish(self) -> (Vec<PathBuf>, Vec<WriteFailure>) {
        let handles = self
            .pending
            .lock()
            .map(|mut pending| std::mem::take(&mut *pending))
            .unwrap_or_default();

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Record write task failed: {}", e);
            }
        }

        let written = self.written.lock().map(|w| w.clone()).unwrap_or_default();
        let failures = self.failures.lock().map(|f| f.clone()).unwrap_or_default();
        (written, failures)
    }
}

/// Execute a crawl for one manufacturer with the given engine.
///
/// The engine is passed in so callers can keep a handle to cancel it.
pub async fn execute_crawl(
    engine: Engine,
    options: CrawlOptions,
) -> Result<CrawlSummary, CrawlError> {
    let CrawlOptions {
        manufacturer,
        entry_url,
        output_dir,
        show_progress_bars,
    } = options;

    let started_at = Local::now();
    let start = Instant::now();

    // Set up single progress bar for overall crawl progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Authenticating for {}...", manufacturer));
        Some(Arc::new(pb))
    } else {
        None
    };

    let engine = match progress_bar.clone() {
        Some(pb) => {
            let requests = Arc::new(AtomicUsize::new(0));
            let callback: ProgressCallback = Arc::new(move |state: CrawlState, url: String| {
                let count = requests.fetch_add(1, Ordering::Relaxed) + 1;
                pb.set_message(format!(
                    "Crawling... {} requests [{}] {}",
                    count,
                    state,
                    extract_url_path(&url)
                ));
            });
            engine.with_progress_callback(callback)
        }
        None => engine,
    };

    let sink = RecordSink::new(RecordStore::new(output_dir));
    let navigator = Arc::new(Navigator::new(manufacturer.clone(), entry_url));
    let result = engine.run(navigator, sink.callback()).await;

    // records delivered before a fatal error still land on disk
    let (written, write_failures) = sink.finish().await;

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    let outcome = result?;

    Ok(CrawlSummary {
        manufacturer,
        started_at,
        elapsed: start.elapsed(),
        outcome,
        written,
        write_failures,
    })
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Generate a text report from crawl results
pub fn generate_crawl_report(summary: &CrawlSummary) -> String {
    let outcome = &summary.outcome;
    let stats = &outcome.stats;
    let mut report = String::new();

    report.push_str(&format!("{}\n\n", "=".repeat(60)));
    report.push_str(&format!(
        "{} {}\n",
        "Memory compatibility crawl:".bold(),
        summary.manufacturer
    ));
    report.push_str(&format!(
        "  Started: {}\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S")
    ));
    report.push_str(&format!("  Duration: {:.1}s\n\n", summary.elapsed.as_secs_f64()));

    report.push_str(&format!("{}\n", "Summary:".bold()));
    report.push_str(&format!("  Pages fetched: {}\n", stats.pages_fetched));
    report.push_str(&format!("  Cache hits: {}\n", stats.cache_hits));
    report.push_str(&format!("  Retries: {}\n", stats.retries));
    report.push_str(&format!(
        "  Records written: {}\n",
        summary.written.len().to_string().green()
    ));
    report.push_str(&format!("  Empty result pages: {}\n", outcome.empty_results));

    if outcome.cancelled {
        report.push_str(&format!(
            "  {} ({} requests never issued)\n",
            "Cancelled".yellow(),
            outcome.pending
        ));
    }

    if !summary.written.is_empty() {
        report.push_str(&format!("\n{}\n", "Saved:".bold()));
        for path in &summary.written {
            report.push_str(&format!("  {} {}\n", "✓".green(), path.display()));
        }
    }

    if !outcome.failures.is_empty() {
        report.push_str(&format!(
            "\n{} {}\n",
            "Abandoned lineages:".bold(),
            outcome.failures.len().to_string().red()
        ));
        for failure in &outcome.failures {
            report.push_str(&format!("  {} {}\n", "✗".red(), failure.context));
            report.push_str(&format!("    {}\n", failure.error.dimmed()));
        }
    }

    if !summary.write_failures.is_empty() {
        report.push_str(&format!("\n{}\n", "Write failures:".bold()));
        for failure in &summary.write_failures {
            report.push_str(&format!(
                "  {} {}: {}\n",
                "✗".red(),
                failure.model,
                failure.error
            ));
        }
    }

    report
}
