use crate::error::{Result, ScanError};
use crate::navigator::{CrawlState, Navigator, Task};
use crate::request::{Method, Page, PageRequest};
use crate::result::{CompatibilityRecord, CrawlStats, CrawlOutcome, LineageFailure};
use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, HeaderValue, PRAGMA};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub type ProgressCallback = Arc<dyn Fn(CrawlState, String) + Send + Sync>;
pub type RecordCallback = Arc<dyn Fn(CompatibilityRecord) + Send + Sync>;

const USER_AGENT: &str = concat!("memcompat/", env!("CARGO_PKG_VERSION"));

/// Upper bound of a single retry sleep.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Exponential backoff before retry number `attempt + 1`, capped at
/// [`MAX_RETRY_DELAY`].
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(2u32.saturating_pow(attempt))
        .unwrap_or(MAX_RETRY_DELAY)
        .min(MAX_RETRY_DELAY)
}

/// Tunables of the engine: concurrency, politeness and retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub workers: usize,
    pub timeout_secs: u64,
    pub politeness_delay: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub use_cache: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            timeout_secs: 30,
            politeness_delay: Duration::from_millis(250),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            use_cache: true,
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_politeness_delay(mut self, delay: Duration) -> Self {
        self.politeness_delay = delay;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }
}

#[derive(Default)]
struct Counters {
    pages_fetched: AtomicUsize,
    cache_hits: AtomicUsize,
    retries: AtomicUsize,
}

/// Shared crawling engine: one cookie-carrying client, a work queue fed by the
/// navigator, a bounded number of requests in flight and per-host politeness.
#[derive(Clone)]
pub struct Engine {
    client: Client,
    config: EngineConfig,
    /// One cell per cacheable URL; concurrent requests for the same page
    /// share a single fetch.
    cache: Arc<Mutex<HashMap<String, Arc<OnceCell<Page>>>>>,
    next_slot: Arc<Mutex<Instant>>,
    shutdown: Arc<AtomicBool>,
    counters: Arc<Counters>,
    progress_callback: Option<ProgressCallback>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs((config.timeout_secs / 2).max(1)))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            config,
            cache: Arc::new(Mutex::new(HashMap::new())),
            next_slot: Arc::new(Mutex::new(Instant::now())),
            shutdown: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            progress_callback: None,
        })
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stops issuing new requests; in-flight ones still complete.
    pub fn cancel(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> CrawlStats {
        CrawlStats {
            pages_fetched: self.counters.pages_fetched.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
        }
    }

    /// Runs the navigator's state machine to completion.
    ///
    /// Lineage failures are collected and do not stop siblings. A crawl-fatal
    /// error cancels the engine, lets in-flight requests finish and is
    /// returned.
    pub async fn run(
        &self,
        navigator: Arc<Navigator>,
        on_record: RecordCallback,
    ) -> Result<CrawlOutcome> {
        info!(
            "Starting crawl for '{}' with {} workers",
            navigator.manufacturer(),
            self.config.workers
        );

        let mut queue: VecDeque<Task> = VecDeque::from([navigator.seed()]);
        let mut in_flight = JoinSet::new();
        let mut outcome = CrawlOutcome::default();
        let mut fatal: Option<ScanError> = None;

        loop {
            while in_flight.len() < self.config.workers && !self.is_cancelled() {
                let Some(task) = queue.pop_front() else {
                    break;
                };

                if let Some(ref callback) = self.progress_callback {
                    callback(task.lineage.state, task.request.url.to_string());
                }

                let engine = self.clone();
                let navigator = navigator.clone();
                in_flight.spawn(async move {
                    let context = task.describe();
                    let state = task.lineage.state;
                    let transition = match engine.fetch(&task.request).await {
                        Ok(page) => navigator.advance(task, &page),
                        Err(e) => Err(e),
                    };
                    (context, state, transition)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            let (context, state, transition) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!("Lineage task failed: {}", e);
                    outcome.failures.push(LineageFailure {
                        context: "unknown".to_string(),
                        error: ScanError::from(e).to_string(),
                    });
                    continue;
                }
            };

            match transition {
                Ok(transition) => {
                    if state == CrawlState::ResultFetched && transition.records.is_empty() {
                        outcome.empty_results += 1;
                    }
                    for record in transition.records {
                        outcome.records += 1;
                        on_record(record);
                    }
                    queue.extend(transition.tasks);
                }
                Err(e) if e.is_crawl_fatal() => {
                    error!("Crawl aborted at {}: {}", context, e);
                    self.cancel();
                    fatal.get_or_insert(e);
                }
                Err(e) => {
                    warn!("Lineage abandoned at {}: {}", context, e);
                    outcome.failures.push(LineageFailure {
                        context,
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        outcome.cancelled = self.is_cancelled();
        outcome.pending = queue.len();
        outcome.stats = self.stats();

        info!(
            "Crawl complete. {} pages fetched, {} records, {} failed lineages",
            outcome.stats.pages_fetched,
            outcome.records,
            outcome.failures.len()
        );
        Ok(outcome)
    }

    /// Fetches one page. Cacheable GETs go out once per crawl and every
    /// later request for the same URL is served from the cache.
    pub async fn fetch(&self, request: &PageRequest) -> Result<Page> {
        if !(self.config.use_cache && request.is_cacheable()) {
            return self.fetch_with_retry(request).await;
        }

        let cell = self
            .cache
            .lock()
            .await
            .entry(request.url.to_string())
            .or_default()
            .clone();

        let mut fetched = false;
        let page = cell
            .get_or_try_init(|| {
                fetched = true;
                self.fetch_with_retry(request)
            })
            .await?;

        if !fetched {
            debug!("Cache hit for {}", request.url);
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(page.clone())
    }

    /// Retries transient failures with capped exponential backoff.
    async fn fetch_with_retry(&self, request: &PageRequest) -> Result<Page> {
        let mut attempt = 0;
        loop {
            match self.send(request).await {
                Ok(page) => {
                    self.counters.pages_fetched.fetch_add(1, Ordering::Relaxed);
                    return Ok(page);
                }
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = retry_delay(self.config.retry_backoff, attempt);
                    attempt += 1;
                    self.counters.retries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "Retrying {} ({}/{}) in {:?}: {}",
                        request.url, attempt, self.config.max_retries, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send(&self, request: &PageRequest) -> Result<Page> {
        self.wait_politely().await;
        debug!("{:?} {}", request.method, request.url);

        let mut builder = match request.method {
            Method::Get => self.client.get(request.url.clone()),
            Method::Post => self.client.post(request.url.clone()),
        };
        if let Some(ref form) = request.form {
            builder = builder.form(form.pairs());
        }
        if request.bypass_cache {
            builder = builder
                .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
                .header(PRAGMA, HeaderValue::from_static("no-cache"));
        }

        let response = builder.send().await?;
        let status_code = response.status().as_u16();
        let url = response.url().clone();

        if !response.status().is_success() {
            return Err(ScanError::Status {
                status: status_code,
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(Page::new(url, status_code, body))
    }

    /// Spaces request starts by the politeness delay.
    async fn wait_politely(&self) {
        if self.config.politeness_delay.is_zero() {
            return;
        }

        let wait = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let start = (*next_slot).max(now);
            *next_slot = start + self.config.politeness_delay;
            start - now
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
