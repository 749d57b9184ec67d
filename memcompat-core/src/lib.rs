pub mod crawl;
pub mod store;

pub use crawl::{CrawlError, CrawlOptions, CrawlSummary, execute_crawl, generate_crawl_report};
pub use store::{RecordStore, StagedRecord, StoreError};

pub fn print_banner() {
    println!(
        r#"
  memcompat v{}
  memory module compatibility crawler
"#,
        env!("CARGO_PKG_VERSION")
    );
}
