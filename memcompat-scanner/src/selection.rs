//! Guards against following a submission the server did not commit to.
//!
//! On some error paths the server re-renders an older, unrelated form state.
//! Child options must only be read from a response that is proven to reflect
//! the requested selection.

use crate::error::{Result, ScanError};
use crate::form::extract_select;
use scraper::Html;

/// True when the option `expected_value` of `select_name` carries the
/// `selected` marker in `document`.
pub fn is_selected(document: &Html, select_name: &str, expected_value: &str) -> bool {
    extract_select(document, select_name)
        .iter()
        .any(|option| option.value == expected_value && option.selected)
}

pub fn assert_selected(document: &Html, select_name: &str, expected_value: &str) -> Result<()> {
    if is_selected(document, select_name, expected_value) {
        Ok(())
    } else {
        Err(ScanError::SelectionMismatch {
            select_name: select_name.to_string(),
            expected_value: expected_value.to_string(),
        })
    }
}
