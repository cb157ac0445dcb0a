//! Search query construction for the recent-post search endpoint.
//!
//! Shape: `(kw1 OR kw2) (role indicators OR action verbs) [location] -is:retweet lang:en`.
//! Keywords are the required conjunct; indicators and verbs widen recall for
//! people who talk about their work rather than just mention a term.

use serde::{Deserialize, Serialize};

/// Upstream limit on query length for standard recent search.
pub const MAX_QUERY_LEN: usize = 512;

pub const DEFAULT_QUERY_ROLE_TERMS: &[&str] = &["developer", "engineer", "architect", "programmer"];

pub const DEFAULT_ACTION_VERBS: &[&str] = &["building", "shipped", "launched", "deployed", "hiring"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTerms {
    pub role_indicators: Vec<String>,
    pub action_verbs: Vec<String>,
    pub language: String,
}

impl Default for QueryTerms {
    fn default() -> Self {
        Self {
            role_indicators: DEFAULT_QUERY_ROLE_TERMS.iter().map(|s| s.to_string()).collect(),
            action_verbs: DEFAULT_ACTION_VERBS.iter().map(|s| s.to_string()).collect(),
            language: "en".to_string(),
        }
    }
}

/// Builds the search query, dropping optional terms until it fits in
/// [`MAX_QUERY_LEN`]. Action verbs go first, then role indicators. Keywords
/// and the role title are never dropped.
pub fn build_query(
    keywords: &[String],
    role_title: &str,
    location_filter: Option<&str>,
    terms: &QueryTerms,
) -> String {
    let mut indicators: Vec<&str> = terms.role_indicators.iter().map(String::as_str).collect();
    let mut verbs: Vec<&str> = terms.action_verbs.iter().map(String::as_str).collect();

    loop {
        let query = assemble(keywords, role_title, location_filter, &indicators, &verbs, terms);
        if query.chars().count() <= MAX_QUERY_LEN {
            return query;
        }
        if verbs.pop().is_some() {
            continue;
        }
        if indicators.pop().is_some() {
            continue;
        }
        // Nothing left to drop; let the upstream reject it.
        return query;
    }
}

fn assemble(
    keywords: &[String],
    role_title: &str,
    location_filter: Option<&str>,
    indicators: &[&str],
    verbs: &[&str],
    terms: &QueryTerms,
) -> String {
    let mut parts = Vec::with_capacity(4);

    let keyword_terms: Vec<String> = keywords
        .iter()
        .map(|k| quote(k))
        .filter(|k| k != "\"\"")
        .collect();
    if let Some(group) = or_group(&keyword_terms) {
        parts.push(group);
    }

    let mut activity_terms: Vec<String> = Vec::new();
    let role_title = quote(role_title);
    if role_title != "\"\"" {
        activity_terms.push(role_title);
    }
    activity_terms.extend(indicators.iter().map(|t| term(t)));
    activity_terms.extend(verbs.iter().map(|t| term(t)));
    if let Some(group) = or_group(&activity_terms) {
        parts.push(group);
    }

    if let Some(location) = location_filter.map(quote).filter(|l| l != "\"\"") {
        parts.push(location);
    }

    parts.push("-is:retweet".to_string());
    parts.push(format!("lang:{}", terms.language));
    parts.join(" ")
}

fn or_group(terms: &[String]) -> Option<String> {
    match terms.len() {
        0 => None,
        1 => Some(terms[0].clone()),
        _ => Some(format!("({})", terms.join(" OR "))),
    }
}

fn quote(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "").trim())
}

/// Multi-word terms need quoting to stay a phrase; single words stay bare.
fn term(raw: &str) -> String {
    if raw.contains(char::is_whitespace) {
        quote(raw)
    } else {
        raw.replace('"', "")
    }
}
