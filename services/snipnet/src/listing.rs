//! Page and search parameter normalisation for snippet listings

use serde::Deserialize;

/// Rows per listing page
pub const PAGE_SIZE: i64 = 20;

/// Characters with meaning inside a `to_tsquery` expression
const TSQUERY_OPERATORS: &[char] = &['&', '|', '!', '(', ')', ':', '*', '<', '>', '\'', '\\'];

/// Query string accepted by the listing endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    /// Free-text search
    pub param: Option<String>,
    /// Language filter
    pub lang: Option<String>,
}

/// Normalised listing request handed to the snippet store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub offset: i64,
    pub limit: i64,
    /// `&`-joined tsquery terms, empty for no text filter
    pub search: String,
    /// Exact language tag, empty for no filter
    pub language: String,
}

impl ListQuery {
    pub fn from_params(params: &ListParams) -> Self {
        Self {
            offset: page_offset(params.page.as_deref(), PAGE_SIZE),
            limit: PAGE_SIZE,
            search: search_terms(params.param.as_deref().unwrap_or_default()),
            language: params.lang.as_deref().unwrap_or_default().trim().to_string(),
        }
    }

    /// Individual search words, lowercased
    pub fn terms(&self) -> impl Iterator<Item = String> + '_ {
        self.search
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::from_params(&ListParams::default())
    }
}

/// Row offset for a 1-based page number
///
/// Absent, non-numeric and non-positive pages all map to the first page.
pub fn page_offset(page: Option<&str>, limit: i64) -> i64 {
    match page.and_then(|p| p.trim().parse::<i64>().ok()) {
        Some(page) if page > 0 => (page - 1).saturating_mul(limit),
        _ => 0,
    }
}

/// Turn free text into a conjunctive tsquery expression
///
/// Operator characters split terms like whitespace does, so `Vec::new`
/// searches for `Vec & new`.
pub fn search_terms(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || TSQUERY_OPERATORS.contains(&c))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" & ")
}
