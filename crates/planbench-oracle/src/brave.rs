//! Search oracle backed by the Brave web search API.

use crate::call_log::CallLog;
use crate::{OracleError, SearchOracle};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const WEB_SEARCH_URL: &str = "https://api.search.brave.com/res/v1/web/search";
pub const API_KEY_ENV: &str = "BRAVE_SEARCH_API_KEY";

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    web: Option<WebResults>,
}

#[derive(Debug, Default, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Debug, Deserialize)]
struct WebResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

pub struct BraveSearch {
    agent: ureq::Agent,
    api_key: String,
    call_log: Option<Arc<CallLog>>,
}

impl BraveSearch {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent,
            api_key: api_key.into(),
            call_log: None,
        }
    }

    /// Build from `BRAVE_SEARCH_API_KEY`; `None` when unset.
    pub fn from_env(timeout: Duration) -> Option<Self> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|key| Self::new(key, timeout))
    }

    pub fn with_call_log(mut self, log: Arc<CallLog>) -> Self {
        self.call_log = Some(log);
        self
    }

    fn fetch(&self, query: &str, top_n: usize) -> Result<Vec<String>, OracleError> {
        let mut response = self
            .agent
            .get(WEB_SEARCH_URL)
            .query("q", query)
            .query("count", top_n.to_string())
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .call()?;

        let status = response.status();
        let text = response.body_mut().read_to_string()?;
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }
        let parsed: SearchResponse =
            serde_json::from_str(&text).map_err(|e| OracleError::Decode(e.to_string()))?;
        Ok(snippets(parsed, top_n))
    }
}

/// Description (or title) of each of the first `top_n` results.
fn snippets(response: SearchResponse, top_n: usize) -> Vec<String> {
    response
        .web
        .unwrap_or_default()
        .results
        .into_iter()
        .take(top_n)
        .filter_map(|r| {
            r.description
                .filter(|d| !d.is_empty())
                .or(r.title)
                .filter(|s| !s.is_empty())
        })
        .collect()
}

impl SearchOracle for BraveSearch {
    fn search(&self, query: &str, top_n: usize) -> Result<Vec<String>, OracleError> {
        tracing::debug!(query, top_n, "search request");
        let result = self.fetch(query, top_n);
        if let Some(log) = &self.call_log {
            match &result {
                Ok(found) => {
                    let extra = serde_json::json!({ "num_results": found.len() });
                    log.log_search(query, &found.join("\n"), Some(extra));
                }
                Err(e) => {
                    let extra = serde_json::json!({ "error": e.to_string() });
                    log.log_search(query, "", Some(extra));
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippets_prefer_description() {
        let raw = r#"{"web":{"results":[
            {"title":"axios-retry - npm","description":"Axios plugin that intercepts failed requests and retries them."},
            {"title":"Only a title"},
            {"title":"","description":""}
        ]}}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        let out = snippets(parsed, 5);
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("Axios plugin"));
        assert_eq!(out[1], "Only a title");
    }

    #[test]
    fn snippets_respect_top_n() {
        let raw = r#"{"web":{"results":[{"title":"a"},{"title":"b"},{"title":"c"}]}}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(snippets(parsed, 2), vec!["a", "b"]);
    }

    #[test]
    fn missing_web_section_is_empty() {
        let parsed: SearchResponse = serde_json::from_str(r#"{"type":"search"}"#).unwrap();
        assert!(snippets(parsed, 5).is_empty());
    }
}
