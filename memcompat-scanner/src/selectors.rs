//! CSS selectors for the compatibility lookup pages.
//!
//! Every assumption about the vendor's markup lives here, so a layout change
//! fails in one place.

use scraper::Selector;
use std::sync::LazyLock;

fn parse(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector '{css}': {e}"))
}

/// Selectors for the cascading search form.
pub mod form {
    use super::*;

    /// The ASP.NET search form every cascade step re-renders.
    pub static SEARCH_FORM: LazyLock<Selector> = LazyLock::new(|| parse("form#form1"));

    pub static INPUT: LazyLock<Selector> = LazyLock::new(|| parse("input[name]"));

    pub static SELECT: LazyLock<Selector> = LazyLock::new(|| parse("select[name]"));

    pub static OPTION: LazyLock<Selector> = LazyLock::new(|| parse("option"));
}

/// Selectors for a motherboard's result page.
pub mod result {
    use super::*;

    /// One product category section ("DRAM Modules", "Internal SSDs", ...).
    pub static SECTION: LazyLock<Selector> =
        LazyLock::new(|| parse("div#New_Content_Pa_Result > div.Item"));

    pub static SECTION_HEADING: LazyLock<Selector> = LazyLock::new(|| parse("h4"));

    pub static ROW: LazyLock<Selector> = LazyLock::new(|| parse("div.RowCon.Body"));

    /// Generic listing link of the module, not a direct spec sheet.
    pub static PRODUCT_LINK: LazyLock<Selector> = LazyLock::new(|| parse("div.BTNs > a[href]"));

    pub static PRODUCT_INFO: LazyLock<Selector> = LazyLock::new(|| parse("div[class*='Product']"));

    pub static PRODUCT_NAME: LazyLock<Selector> = LazyLock::new(|| parse("h3"));

    pub static PRODUCT_SPEC: LazyLock<Selector> = LazyLock::new(|| parse("p.Product_Spec"));

    pub static PRODUCT_CAPACITY: LazyLock<Selector> =
        LazyLock::new(|| parse("li.label-capacity-greenborder"));

    pub static PRODUCT_PART_NUMBER: LazyLock<Selector> = LazyLock::new(|| parse("li.Product_PN"));
}
