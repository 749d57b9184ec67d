pub mod cascade;
pub mod engine;
pub mod error;
pub mod form;
pub mod navigator;
pub mod request;
pub mod result;
pub mod selection;
pub mod selectors;
pub mod session;
pub mod table;

pub use cascade::CascadeSelection;
pub use engine::{Engine, EngineConfig, ProgressCallback, RecordCallback};
pub use error::ScanError;
pub use form::FormState;
pub use navigator::{CrawlState, Navigator};
pub use request::{Page, PageRequest};
pub use result::{CompatibilityRecord, CrawlOutcome, CrawlStats, LineageFailure, ModuleEntry};
pub use session::SessionContext;
