//! The cascading search form state machine.
//!
//! Every transition consumes one response and produces the follow-up tasks of
//! its lineage. Nothing is mutated in place: a fork clones the parent's form
//! payload and overrides only the cascade fields.

use crate::cascade::CascadeSelection;
use crate::error::{Result, ScanError};
use crate::form::{FormState, SelectOption, extract_select};
use crate::request::{Page, PageRequest};
use crate::result::CompatibilityRecord;
use crate::selection::assert_selected;
use crate::session::SessionContext;
use crate::table;
use scraper::Html;
use std::fmt;
use tracing::{debug, info};
use url::Url;

pub const DEVICE_SELECT: &str = "ctl00$Content$Comp_Device";
pub const BRAND_SELECT: &str = "ctl00$Content$Comp_Brand";
pub const SERIES_SELECT: &str = "ctl00$Content$Comp_Series";
pub const MODULE_SELECT: &str = "ctl00$Content$Comp_Module";

/// Device category id of motherboards.
pub const MOTHERBOARD_DEVICE: &str = "13";
/// Value of the "no selection" entry of every select.
pub const PLACEHOLDER: &str = "-1";

pub const DEFAULT_ENTRY_URL: &str = "https://us.transcend-info.com/support/authenticator?url=https://us.transcend-info.com/Support/compatibility";

const UPDATE_PANEL: &str = "ctl00$Content$UpdatePanel1";

/// Where a lineage stands; tasks carry the state that consumes their response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    Authenticating,
    SearchFormReady,
    BrandSelected,
    SeriesEnumerated,
    ModuleListReady,
    ResultFetched,
}

impl CrawlState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlState::Authenticating => "authenticating",
            CrawlState::SearchFormReady => "search-form-ready",
            CrawlState::BrandSelected => "brand-selected",
            CrawlState::SeriesEnumerated => "series-enumerated",
            CrawlState::ModuleListReady => "module-list-ready",
            CrawlState::ResultFetched => "result-fetched",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete path through the cascade plus the payload it last submitted.
#[derive(Debug, Clone)]
pub struct Lineage {
    pub state: CrawlState,
    pub session: Option<SessionContext>,
    pub form: FormState,
    pub selection: CascadeSelection,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub lineage: Lineage,
    pub request: PageRequest,
}

impl Task {
    /// Selection path and URL, enough to reproduce a failure.
    pub fn describe(&self) -> String {
        format!(
            "[{}] {} <{}>",
            self.lineage.state, self.lineage.selection, self.request.url
        )
    }
}

/// Follow-up work and finished records produced by one response.
#[derive(Debug, Default)]
pub struct Transition {
    pub tasks: Vec<Task>,
    pub records: Vec<CompatibilityRecord>,
}

impl Transition {
    fn next(task: Task) -> Self {
        Self {
            tasks: vec![task],
            records: Vec::new(),
        }
    }
}

/// Builds the payload of the next submission: the previous payload, refreshed
/// with every field of the response, then the cascade overrides, then the
/// ASP.NET event bookkeeping.
pub fn submission(
    base: &FormState,
    session: &SessionContext,
    cascade: &[(&str, &str)],
    event_target: &str,
) -> FormState {
    let mut form = base.clone();
    form.overlay(session.hidden_fields());

    for (name, value) in cascade {
        form.set(*name, *value);
    }

    form.set("ctl00$sm", format!("{}|{}", UPDATE_PANEL, event_target));
    form.set("ctl00$search", "");
    form.set("hiddenInputToUpdateATBuffer_CommonToolkitScripts", "1");
    form.set("__EVENTTARGET", event_target);
    form.set("__EVENTARGUMENT", "");
    form.set("__LASTFOCUS", "");
    form
}

/// Options that open a new lineage; placeholders never do.
pub fn forkable(options: &[SelectOption]) -> impl Iterator<Item = &SelectOption> {
    options.iter().filter(|option| option.id().is_some())
}

/// Exact, case-sensitive match of `manufacturer` against the brand labels.
pub fn lookup_brand(document: &Html, manufacturer: &str) -> Result<SelectOption> {
    extract_select(document, BRAND_SELECT)
        .into_iter()
        .find(|option| option.label == manufacturer && option.id().is_some())
        .ok_or_else(|| ScanError::UnknownManufacturer(manufacturer.to_string()))
}

/// Drives the cascade for one manufacturer.
#[derive(Debug, Clone)]
pub struct Navigator {
    manufacturer: String,
    entry_url: Url,
}

impl Navigator {
    pub fn new(manufacturer: impl Into<String>, entry_url: Url) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            entry_url,
        }
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    /// The unauthenticated entry request every crawl starts with.
    pub fn seed(&self) -> Task {
        Task {
            lineage: Lineage {
                state: CrawlState::Authenticating,
                session: None,
                form: FormState::new(),
                selection: CascadeSelection::new(MOTHERBOARD_DEVICE),
            },
            request: PageRequest::get(self.entry_url.clone()).uncached(),
        }
    }

    pub fn advance(&self, task: Task, page: &Page) -> Result<Transition> {
        let document = page.document();
        let lineage = task.lineage;

        debug!(
            "Advancing {} from {} ({} bytes)",
            lineage.selection,
            lineage.state,
            page.body.len()
        );

        match lineage.state {
            CrawlState::Authenticating => self.on_entry(lineage, page, &document),
            CrawlState::SearchFormReady => self.on_device_selected(lineage, page, &document),
            CrawlState::BrandSelected => self.on_brand_selected(lineage, page, &document),
            CrawlState::SeriesEnumerated => self.on_series_selected(lineage, page, &document),
            CrawlState::ResultFetched => self.on_result(lineage, page, &document),
            CrawlState::ModuleListReady => Err(ScanError::Other(format!(
                "lineage {} has no request in flight",
                lineage.selection
            ))),
        }
    }

    /// Turns a resolved module into the result page fetch; no form replay.
    pub fn request_result(&self, lineage: Lineage) -> Result<Task> {
        let module_id = lineage
            .selection
            .module_id()
            .ok_or(ScanError::CascadeOrder("module"))?;
        let session = lineage
            .session
            .as_ref()
            .ok_or_else(|| ScanError::Other("lineage has no session".to_string()))?;
        let url = session.result_url(module_id)?;

        Ok(Task {
            request: PageRequest::get(url),
            lineage: Lineage {
                state: CrawlState::ResultFetched,
                ..lineage
            },
        })
    }

    fn on_entry(&self, lineage: Lineage, page: &Page, document: &Html) -> Result<Transition> {
        let session = SessionContext::authenticate(&page.url, document)?;
        info!("Session established at {}", session.form_url());

        let form = submission(
            &lineage.form,
            &session,
            &[
                (DEVICE_SELECT, MOTHERBOARD_DEVICE),
                (BRAND_SELECT, PLACEHOLDER),
                (SERIES_SELECT, PLACEHOLDER),
                (MODULE_SELECT, PLACEHOLDER),
            ],
            BRAND_SELECT,
        );

        Ok(Transition::next(Self::submit(
            CrawlState::SearchFormReady,
            session,
            form,
            lineage.selection,
        )))
    }

    fn on_device_selected(
        &self,
        lineage: Lineage,
        page: &Page,
        document: &Html,
    ) -> Result<Transition> {
        let session = SessionContext::capture(&page.url, document)?;
        assert_selected(document, DEVICE_SELECT, lineage.selection.device_id())?;

        let brand = lookup_brand(document, &self.manufacturer)?;
        info!("Manufacturer '{}' has brand id {}", brand.label, brand.value);

        let selection = lineage.selection.with_brand(&brand.value, &brand.label)?;
        let form = submission(
            &lineage.form,
            &session,
            &[
                (DEVICE_SELECT, selection.device_id()),
                (BRAND_SELECT, &brand.value),
                (SERIES_SELECT, PLACEHOLDER),
                (MODULE_SELECT, PLACEHOLDER),
            ],
            SERIES_SELECT,
        );

        Ok(Transition::next(Self::submit(
            CrawlState::BrandSelected,
            session,
            form,
            selection,
        )))
    }

    fn on_brand_selected(
        &self,
        lineage: Lineage,
        page: &Page,
        document: &Html,
    ) -> Result<Transition> {
        let session = SessionContext::capture(&page.url, document)?;
        let brand = lineage
            .selection
            .brand()
            .ok_or(ScanError::CascadeOrder("brand"))?;

        assert_selected(document, DEVICE_SELECT, lineage.selection.device_id())?;
        assert_selected(document, BRAND_SELECT, &brand.id)?;

        let options = extract_select(document, SERIES_SELECT);
        let mut transition = Transition::default();

        for option in forkable(&options) {
            let selection = lineage
                .selection
                .clone()
                .with_series(&option.value, &option.label)?;
            let form = submission(
                &lineage.form,
                &session,
                &[(SERIES_SELECT, &option.value), (MODULE_SELECT, PLACEHOLDER)],
                SERIES_SELECT,
            );
            transition.tasks.push(Self::submit(
                CrawlState::SeriesEnumerated,
                session.clone(),
                form,
                selection,
            ));
        }

        info!(
            "{} series found for {}",
            transition.tasks.len(),
            brand.name
        );
        Ok(transition)
    }

    fn on_series_selected(
        &self,
        lineage: Lineage,
        page: &Page,
        document: &Html,
    ) -> Result<Transition> {
        let session = SessionContext::capture(&page.url, document)?;
        let selection = &lineage.selection;
        let (brand, series) = selection
            .brand()
            .zip(selection.series())
            .ok_or(ScanError::CascadeOrder("series"))?;

        assert_selected(document, DEVICE_SELECT, selection.device_id())?;
        assert_selected(document, BRAND_SELECT, &brand.id)?;
        assert_selected(document, SERIES_SELECT, &series.id)?;

        let options = extract_select(document, MODULE_SELECT);
        let mut transition = Transition::default();

        for option in forkable(&options) {
            let child = Lineage {
                state: CrawlState::ModuleListReady,
                session: Some(session.clone()),
                form: lineage.form.clone(),
                selection: selection.clone().with_module(&option.value)?,
            };
            transition.tasks.push(self.request_result(child)?);
        }

        debug!(
            "{} motherboards found in series {}",
            transition.tasks.len(),
            series.name
        );
        Ok(transition)
    }

    fn on_result(&self, lineage: Lineage, page: &Page, document: &Html) -> Result<Transition> {
        let manufacturer = lineage
            .selection
            .brand()
            .map(|brand| brand.name.as_str())
            .unwrap_or(&self.manufacturer);

        let mut transition = Transition::default();
        match table::parse_result_page(document, &page.url, manufacturer)? {
            Some(record) => {
                debug!(
                    "{} modules for {} ({})",
                    record.modules.len(),
                    record.motherboard_model,
                    lineage.selection.series().map(|s| s.name.as_str()).unwrap_or("-")
                );
                transition.records.push(record);
            }
            None => info!(
                "No memory modules found for {}, skipping <{}>",
                lineage.selection, page.url
            ),
        }
        Ok(transition)
    }

    fn submit(
        state: CrawlState,
        session: SessionContext,
        form: FormState,
        selection: CascadeSelection,
    ) -> Task {
        Task {
            request: PageRequest::post(session.form_url().clone(), form.clone()),
            lineage: Lineage {
                state,
                session: Some(session),
                form,
                selection,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ORIGIN: &str = "https://us.example.com/Support/compatibility/";

    fn option(value: &str, label: &str, selected: bool) -> String {
        let marker = if selected { r#" selected="selected""# } else { "" };
        format!(r#"<option value="{value}"{marker}>{label}</option>"#)
    }

    fn select(name: &str, options: &[String]) -> String {
        format!(r#"<select name="{name}">{}</select>"#, options.concat())
    }

    fn form_page(view_state: &str, selects: &[String]) -> Page {
        let body = format!(
            r#"<html><body><form id="form1" method="post" action="./">
                 <input type="hidden" name="__VIEWSTATE" value="{view_state}">
                 <input type="hidden" name="__EVENTTARGET" value="">
                 <input type="hidden" name="__EVENTVALIDATION" value="ev-{view_state}">
                 <input type="submit" name="ctl00$BT_search" value="Search">
                 {}
               </form></body></html>"#,
            selects.concat()
        );
        Page::new(Url::parse(ORIGIN).unwrap(), 200, body)
    }

    fn brand_page(device_selected: bool) -> Page {
        form_page(
            "vs2",
            &[
                select(DEVICE_SELECT, &[option("13", "Motherboard", device_selected)]),
                select(
                    BRAND_SELECT,
                    &[
                        option("-1", "Select", true),
                        option("12", "ASUS", false),
                        option("205", "Supermicro", false),
                        option("206", "supermicro", false),
                    ],
                ),
            ],
        )
    }

    fn navigator() -> Navigator {
        Navigator::new("Supermicro", Url::parse(ORIGIN).unwrap())
    }

    fn advance_to_brand_selected(nav: &Navigator) -> Task {
        let entry = nav.seed();
        let transition = nav.advance(entry, &form_page("vs1", &[])).unwrap();
        let device_task = transition.tasks.into_iter().next().unwrap();
        let transition = nav.advance(device_task, &brand_page(true)).unwrap();
        transition.tasks.into_iter().next().unwrap()
    }

    #[test]
    fn test_seed_is_uncached_get() {
        let task = navigator().seed();
        assert_eq!(task.lineage.state, CrawlState::Authenticating);
        assert!(task.request.bypass_cache);
        assert!(task.request.form.is_none());
    }

    #[test]
    fn test_entry_without_form_is_authentication_error() {
        let nav = navigator();
        let page = Page::new(Url::parse(ORIGIN).unwrap(), 200, "<html>login</html>");
        let err = nav.advance(nav.seed(), &page).unwrap_err();

        assert!(matches!(err, ScanError::Authentication(_)));
    }

    #[test]
    fn test_entry_submits_device_selection() {
        let nav = navigator();
        let transition = nav.advance(nav.seed(), &form_page("vs1", &[])).unwrap();
        let task = &transition.tasks[0];
        let form = task.request.form.as_ref().unwrap();

        assert_eq!(task.lineage.state, CrawlState::SearchFormReady);
        assert!(task.request.bypass_cache);
        assert_eq!(form.get(DEVICE_SELECT), Some("13"));
        assert_eq!(form.get(BRAND_SELECT), Some("-1"));
        assert_eq!(form.get("__EVENTTARGET"), Some(BRAND_SELECT));
        assert_eq!(form.get("__VIEWSTATE"), Some("vs1"));
        assert!(!form.contains("ctl00$BT_search"));
    }

    #[test]
    fn test_brand_lookup_is_exact() {
        let doc = brand_page(true).document();

        assert_eq!(lookup_brand(&doc, "Supermicro").unwrap().value, "205");
        assert_eq!(lookup_brand(&doc, "supermicro").unwrap().value, "206");
        assert!(matches!(
            lookup_brand(&doc, "SUPERMICRO"),
            Err(ScanError::UnknownManufacturer(_))
        ));
        assert!(matches!(
            lookup_brand(&doc, "Select"),
            Err(ScanError::UnknownManufacturer(_))
        ));
    }

    #[test]
    fn test_brand_selection_refreshes_view_state() {
        let task = advance_to_brand_selected(&navigator());
        let form = task.request.form.as_ref().unwrap();

        assert_eq!(task.lineage.state, CrawlState::BrandSelected);
        assert_eq!(form.get(BRAND_SELECT), Some("205"));
        assert_eq!(form.get("__VIEWSTATE"), Some("vs2"));
        assert_eq!(form.get("__EVENTVALIDATION"), Some("ev-vs2"));
        assert_eq!(form.get("__EVENTTARGET"), Some(SERIES_SELECT));
        assert_eq!(
            task.lineage.selection.brand().map(|b| b.name.as_str()),
            Some("Supermicro")
        );
    }

    #[test]
    fn test_unselected_device_is_mismatch() {
        let nav = navigator();
        let transition = nav.advance(nav.seed(), &form_page("vs1", &[])).unwrap();
        let task = transition.tasks.into_iter().next().unwrap();
        let err = nav.advance(task, &brand_page(false)).unwrap_err();

        assert!(matches!(err, ScanError::SelectionMismatch { .. }));
        assert!(!err.is_crawl_fatal());
    }

    #[test]
    fn test_missing_form_mid_cascade_is_lineage_fatal() {
        let nav = navigator();
        let task = advance_to_brand_selected(&nav);
        let page = Page::new(Url::parse(ORIGIN).unwrap(), 200, "<html>oops</html>");
        let err = nav.advance(task, &page).unwrap_err();

        assert!(matches!(err, ScanError::MissingForm(_)));
        assert!(!err.is_crawl_fatal());
    }

    #[test]
    fn test_series_fork_keeps_every_hidden_field() {
        let nav = navigator();
        let task = advance_to_brand_selected(&nav);
        let page = form_page(
            "vs3",
            &[
                select(DEVICE_SELECT, &[option("13", "Motherboard", true)]),
                select(BRAND_SELECT, &[option("205", "Supermicro", true)]),
                select(
                    SERIES_SELECT,
                    &[
                        option("-1", "Select", true),
                        option("7", "X11", false),
                        option("8", "H12", false),
                    ],
                ),
            ],
        );
        let hidden = page.document();
        let hidden = crate::form::extract_fields(&hidden);

        let transition = nav.advance(task, &page).unwrap();
        assert_eq!(transition.tasks.len(), 2);

        let cascade_fields = [
            SERIES_SELECT,
            MODULE_SELECT,
            "__EVENTTARGET",
            "__EVENTARGUMENT",
            "__LASTFOCUS",
            "ctl00$sm",
            "ctl00$search",
        ];
        for task in &transition.tasks {
            let form = task.request.form.as_ref().unwrap();
            for (name, value) in hidden.iter() {
                if cascade_fields.contains(&name) {
                    continue;
                }
                assert_eq!(form.get(name), Some(value), "field {name} lost");
            }
            assert_eq!(form.get(BRAND_SELECT), Some("205"));
            assert_eq!(form.get(DEVICE_SELECT), Some("13"));
        }

        let series: Vec<&str> = transition
            .tasks
            .iter()
            .filter_map(|t| t.request.form.as_ref()?.get(SERIES_SELECT))
            .collect();
        assert_eq!(series, vec!["7", "8"]);
    }

    #[test]
    fn test_series_response_forks_result_gets() {
        let nav = navigator();
        let task = advance_to_brand_selected(&nav);
        let series_page = form_page(
            "vs3",
            &[
                select(DEVICE_SELECT, &[option("13", "Motherboard", true)]),
                select(BRAND_SELECT, &[option("205", "Supermicro", true)]),
                select(SERIES_SELECT, &[option("7", "X11", false)]),
            ],
        );
        let series_task = nav
            .advance(task, &series_page)
            .unwrap()
            .tasks
            .into_iter()
            .next()
            .unwrap();

        let module_page = form_page(
            "vs4",
            &[
                select(DEVICE_SELECT, &[option("13", "Motherboard", true)]),
                select(BRAND_SELECT, &[option("205", "Supermicro", true)]),
                select(SERIES_SELECT, &[option("7", "X11", true)]),
                select(
                    MODULE_SELECT,
                    &[
                        option("-1", "Select", true),
                        option("1001", "X11DPi-N Motherboard", false),
                    ],
                ),
            ],
        );
        let transition = nav.advance(series_task, &module_page).unwrap();

        assert_eq!(transition.tasks.len(), 1);
        let result = &transition.tasks[0];
        assert_eq!(result.lineage.state, CrawlState::ResultFetched);
        assert!(result.request.form.is_none());
        assert!(!result.request.bypass_cache);
        assert_eq!(
            result.request.url.as_str(),
            "https://us.example.com/Support/compatibility/1001/"
        );
        assert_eq!(result.lineage.selection.module_id(), Some("1001"));
    }

    #[test]
    fn test_series_not_selected_is_mismatch() {
        let nav = navigator();
        let task = advance_to_brand_selected(&nav);
        let series_page = form_page(
            "vs3",
            &[
                select(DEVICE_SELECT, &[option("13", "Motherboard", true)]),
                select(BRAND_SELECT, &[option("205", "Supermicro", true)]),
                select(SERIES_SELECT, &[option("7", "X11", false)]),
            ],
        );
        let series_task = nav
            .advance(task, &series_page)
            .unwrap()
            .tasks
            .into_iter()
            .next()
            .unwrap();

        // server echoed the brand-level state instead of committing the series
        let err = nav.advance(series_task, &series_page).unwrap_err();
        match err {
            ScanError::SelectionMismatch {
                select_name,
                expected_value,
            } => {
                assert_eq!(select_name, SERIES_SELECT);
                assert_eq!(expected_value, "7");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    proptest! {
        #[test]
        fn prop_placeholders_are_never_forked(values in prop::collection::vec(-5i64..100, 0..20)) {
            let options: Vec<SelectOption> = values
                .iter()
                .map(|v| SelectOption {
                    value: v.to_string(),
                    label: format!("S{v}"),
                    selected: false,
                })
                .collect();

            let forked: Vec<i64> = forkable(&options)
                .map(|o| o.value.parse().unwrap())
                .collect();
            let expected: Vec<i64> = values.iter().copied().filter(|v| *v >= 0).collect();

            prop_assert_eq!(forked, expected);
        }
    }
}
