use serde::{Deserialize, Serialize};

/// One memory module row of a motherboard's compatibility table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub id: Option<String>,
    pub link: String,
    pub name: String,
    pub spec: String,
    pub capacity: String,
}

/// Compatibility table of a single motherboard, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityRecord {
    pub manufacturer: String,
    pub motherboard_model: String,
    pub source_url: String,
    pub modules: Vec<ModuleEntry>,
}

impl CompatibilityRecord {
    /// Returns `None` for an empty table; such pages are never emitted.
    pub fn new(
        manufacturer: String,
        motherboard_model: String,
        source_url: String,
        modules: Vec<ModuleEntry>,
    ) -> Option<Self> {
        if modules.is_empty() {
            return None;
        }

        Some(Self {
            manufacturer,
            motherboard_model,
            source_url,
            modules,
        })
    }
}

/// A lineage abandoned after a structural or exhausted-retry failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageFailure {
    pub context: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub pages_fetched: usize,
    pub cache_hits: usize,
    pub retries: usize,
}

/// What a finished (or cancelled) crawl produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlOutcome {
    pub records: usize,
    /// Result pages without any DRAM module.
    pub empty_results: usize,
    pub failures: Vec<LineageFailure>,
    pub cancelled: bool,
    /// Tasks still queued when the crawl was cancelled.
    pub pending: usize,
    pub stats: CrawlStats,
}
