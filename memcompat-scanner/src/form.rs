//! Form payloads and the pure extraction helpers that read them from a page.

use crate::selectors::form::{INPUT, OPTION, SEARCH_FORM, SELECT};
use scraper::{ElementRef, Html};

/// Submit buttons that must never be replayed; posting them would trigger a
/// full search instead of a cascade refresh.
pub const EXCLUDED_FIELDS: &[&str] = &["ctl00$Content$BT_searchID", "ctl00$BT_search"];

/// Ordered field name to value mapping, the exact payload of one submission.
///
/// Overriding an existing field keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    fields: Vec<(String, String)>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder form of [`FormState::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Copies every field of `other` over this state.
    pub fn overlay(&mut self, other: &FormState) {
        for (k, v) in &other.fields {
            self.set(k.clone(), v.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Pairs in submission order, suitable for `RequestBuilder::form`.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.fields
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut state = FormState::new();
        for (k, v) in iter {
            state.set(k, v);
        }
        state
    }
}

/// A single `<option>` of a select box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    /// Numeric id of the option; placeholders (`-1`) and non-numeric values
    /// yield `None`.
    pub fn id(&self) -> Option<u64> {
        self.value.trim().parse::<i64>().ok().and_then(|v| u64::try_from(v).ok())
    }
}

fn search_form(document: &Html) -> Option<ElementRef<'_>> {
    document.select(&SEARCH_FORM).next()
}

fn find_select<'a>(form: ElementRef<'a>, select_name: &str) -> Option<ElementRef<'a>> {
    form.select(&SELECT)
        .find(|select| select.value().attr("name") == Some(select_name))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub fn has_search_form(document: &Html) -> bool {
    search_form(document).is_some()
}

/// Every named input of the search form, minus [`EXCLUDED_FIELDS`].
pub fn extract_fields(document: &Html) -> FormState {
    let Some(form) = search_form(document) else {
        return FormState::new();
    };

    form.select(&INPUT)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            if EXCLUDED_FIELDS.contains(&name) {
                return None;
            }
            Some((name, input.value().attr("value").unwrap_or("")))
        })
        .collect()
}

/// Options of the named select inside the search form, in document order.
pub fn extract_select(document: &Html, select_name: &str) -> Vec<SelectOption> {
    let Some(select) = search_form(document).and_then(|form| find_select(form, select_name))
    else {
        return Vec::new();
    };

    select
        .select(&OPTION)
        .map(|option| SelectOption {
            value: option.value().attr("value").unwrap_or("").to_string(),
            label: element_text(option),
            selected: option.value().attr("selected").is_some(),
        })
        .collect()
}

/// `(value, label)` pairs of the named select, in document order.
pub fn extract_options(document: &Html, select_name: &str) -> Vec<(String, String)> {
    extract_select(document, select_name)
        .into_iter()
        .map(|option| (option.value, option.label))
        .collect()
}

/// Label of the option the server rendered as selected.
pub fn selected_label(document: &Html, select_name: &str) -> Option<String> {
    extract_select(document, select_name)
        .into_iter()
        .find(|option| option.selected)
        .map(|option| option.label)
}

/// Resolved `action` of the search form; an empty or missing action posts
/// back to the page itself.
pub fn form_action(document: &Html) -> Option<&str> {
    search_form(document)
        .and_then(|form| form.value().attr("action"))
        .filter(|action| !action.trim().is_empty())
}
