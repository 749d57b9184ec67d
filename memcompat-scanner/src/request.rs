use crate::form::FormState;
use scraper::Html;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One HTTP round trip the engine should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub method: Method,
    pub url: Url,
    pub form: Option<FormState>,
    /// Session and cascade requests must always hit the server.
    pub bypass_cache: bool,
}

impl PageRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            form: None,
            bypass_cache: false,
        }
    }

    pub fn post(url: Url, form: FormState) -> Self {
        Self {
            method: Method::Post,
            url,
            form: Some(form),
            bypass_cache: true,
        }
    }

    pub fn uncached(mut self) -> Self {
        self.bypass_cache = true;
        self
    }

    pub fn is_cacheable(&self) -> bool {
        self.method == Method::Get && !self.bypass_cache
    }
}

/// A fetched response; `url` is the final URL after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: Url,
    pub status_code: u16,
    pub body: String,
}

impl Page {
    pub fn new(url: Url, status_code: u16, body: impl Into<String>) -> Self {
        Self {
            url,
            status_code,
            body: body.into(),
        }
    }

    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}
