//! Compatibility table extraction from a motherboard's result page.

use crate::error::{Result, ScanError};
use crate::form;
use crate::navigator::MODULE_SELECT;
use crate::result::{CompatibilityRecord, ModuleEntry};
use crate::selectors::result::{
    PRODUCT_CAPACITY, PRODUCT_INFO, PRODUCT_LINK, PRODUCT_NAME, PRODUCT_PART_NUMBER,
    PRODUCT_SPEC, ROW, SECTION, SECTION_HEADING,
};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Heading of the only section we extract; storage and other sections are
/// skipped.
pub const DRAM_SECTION: &str = "DRAM Modules";

fn joined_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element.select(selector).next().map(joined_text)
}

/// Result pages live at `/Support/compatibility/{module_id}/`; any other
/// shape means the site's routing changed.
pub fn validate_result_path(url: &Url) -> Result<()> {
    let path = url.path().trim_matches('/');
    if path.split('/').count() != 3 {
        return Err(ScanError::MalformedResultUrl(path.to_string()));
    }
    Ok(())
}

/// Strips the "Motherboard" suffix and rewrites slash-separated aliases so the
/// name is usable as a file name.
pub fn normalize_model_name(label: &str) -> String {
    label
        .replace("Motherboard", "")
        .trim()
        .replace('/', ",")
        .split(',')
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join(",")
}

/// Rows of the "DRAM Modules" section, in document order.
pub fn parse_modules(document: &Html, page_url: &Url) -> Result<Vec<ModuleEntry>> {
    let mut modules = Vec::new();

    for section in document.select(&SECTION) {
        let heading: String = section
            .select(&SECTION_HEADING)
            .map(joined_text)
            .collect();

        if heading != DRAM_SECTION {
            debug!("Skipping section '{}' on {}", heading, page_url);
            continue;
        }

        for row in section.select(&ROW) {
            let href = row
                .select(&PRODUCT_LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .ok_or_else(|| ScanError::MissingProductLink {
                    section: heading.clone(),
                    url: page_url.to_string(),
                })?;

            let link = page_url
                .join(href.trim())
                .map_err(|e| ScanError::InvalidUrl(format!("product link '{}': {}", href, e)))?;

            let info = row.select(&PRODUCT_INFO).next().ok_or_else(|| {
                ScanError::ParseError(format!("product info missing on {}", page_url))
            })?;

            let name = first_text(info, &PRODUCT_NAME).ok_or_else(|| {
                ScanError::ParseError(format!("product name missing on {}", page_url))
            })?;

            modules.push(ModuleEntry {
                id: first_text(info, &PRODUCT_PART_NUMBER),
                link: link.to_string(),
                name,
                spec: first_text(info, &PRODUCT_SPEC).unwrap_or_default(),
                capacity: first_text(info, &PRODUCT_CAPACITY).unwrap_or_default(),
            });
        }
    }

    Ok(modules)
}

/// Parses a fetched result page. `Ok(None)` when the page lists no DRAM
/// modules for this motherboard.
pub fn parse_result_page(
    document: &Html,
    page_url: &Url,
    manufacturer: &str,
) -> Result<Option<CompatibilityRecord>> {
    validate_result_path(page_url)?;

    if !form::has_search_form(document) {
        return Err(ScanError::MissingForm(page_url.to_string()));
    }

    let label = form::selected_label(document, MODULE_SELECT).ok_or_else(|| {
        ScanError::ParseError(format!("no motherboard selected on {}", page_url))
    })?;
    let model = normalize_model_name(&label);

    let modules = parse_modules(document, page_url)?;

    Ok(CompatibilityRecord::new(
        manufacturer.to_string(),
        model,
        page_url.to_string(),
        modules,
    ))
}
