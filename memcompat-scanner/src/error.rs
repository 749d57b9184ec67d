use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Manufacturer '{0}' not found in brand list")]
    UnknownManufacturer(String),

    #[error("Option '{expected_value}' of '{select_name}' is not selected")]
    SelectionMismatch {
        select_name: String,
        expected_value: String,
    },

    #[error("Search form not found on {0}")]
    MissingForm(String),

    #[error("URL path '{0}' has invalid number of parts")]
    MalformedResultUrl(String),

    #[error("Memory module link was not found on section {section} of {url}")]
    MissingProductLink { section: String, url: String },

    #[error("Cascade field '{0}' set out of order")]
    CascadeOrder(&'static str),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    /// Errors after which no lineage can make progress.
    pub fn is_crawl_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::Authentication(_) | ScanError::UnknownManufacturer(_)
        )
    }

    /// Failures worth another attempt with the same request.
    pub fn is_transient(&self) -> bool {
        match self {
            ScanError::HttpError(e) => e.is_timeout() || e.is_connect(),
            ScanError::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
