use crate::error::{Result, ScanError};
use crate::form::{self, FormState};
use scraper::Html;
use url::Url;

/// Where the search form posts to and the server-issued fields that must be
/// echoed back on the next submission.
///
/// A new context is captured from every form response; lineages carry their
/// own copy. Cookies are held by the engine's client, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    form_url: Url,
    hidden: FormState,
}

impl SessionContext {
    /// Captures the first context from the entry response.
    pub fn authenticate(page_url: &Url, document: &Html) -> Result<Self> {
        Self::capture(page_url, document).map_err(|_| {
            ScanError::Authentication(format!("search form not found on {}", page_url))
        })
    }

    /// Captures the context carried by a form response.
    pub fn capture(page_url: &Url, document: &Html) -> Result<Self> {
        if !form::has_search_form(document) {
            return Err(ScanError::MissingForm(page_url.to_string()));
        }

        let form_url = match form::form_action(document) {
            Some(action) => page_url
                .join(action)
                .map_err(|e| ScanError::InvalidUrl(format!("form action '{}': {}", action, e)))?,
            None => page_url.clone(),
        };

        Ok(Self {
            form_url,
            hidden: form::extract_fields(document),
        })
    }

    pub fn form_url(&self) -> &Url {
        &self.form_url
    }

    pub fn hidden_fields(&self) -> &FormState {
        &self.hidden
    }

    /// Canonical result page of one motherboard.
    pub fn result_url(&self, module_id: &str) -> Result<Url> {
        self.form_url
            .join(&format!("/Support/compatibility/{}/", module_id))
            .map_err(|e| ScanError::InvalidUrl(format!("result page for {}: {}", module_id, e)))
    }
}
