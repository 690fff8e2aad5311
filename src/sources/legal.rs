//! Court record search (CourtListener RECAP).

use super::{http_error, parse_body, send, unsupported, ProbeClass, ProbeOptions, SourceAdapter};
use crate::http::{HttpClient, HttpRequest};
use crate::models::{ProbeFailure, Query, SourceResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const SOURCE_ID: &str = "courtlistener";
const SEARCH_URL: &str = "https://www.courtlistener.com/api/rest/v4/search/";
const SITE_ROOT: &str = "https://www.courtlistener.com";
const MAX_CASES: usize = 10;

pub struct CourtListenerAdapter {
    http: Arc<dyn HttpClient>,
    endpoint: String,
}

impl CourtListenerAdapter {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            endpoint: SEARCH_URL.to_string(),
        }
    }

    async fn search(&self, full_name: &str, options: &ProbeOptions) -> Result<SourceResult, ProbeFailure> {
        let request = HttpRequest::get(&self.endpoint)
            .query("q", full_name)
            .query("type", "r")
            .header("Accept", "application/json")
            .timeout(options.timeout);

        let response = send(self.http.as_ref(), request).await?;
        if !response.is_success() {
            return Err(http_error(&response));
        }
        interpret_search(&parse_body(&response)?)
    }
}

pub(crate) fn interpret_search(body: &Value) -> Result<SourceResult, ProbeFailure> {
    let results = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| ProbeFailure::Parse("search response has no results list".into()))?;
    let total = body
        .get("count")
        .and_then(Value::as_u64)
        .unwrap_or(results.len() as u64);

    if total == 0 || results.is_empty() {
        return Err(ProbeFailure::NotFound("No court records found".into()));
    }

    let cases: Vec<Value> = results.iter().take(MAX_CASES).map(summarize_case).collect();

    let mut data = Map::new();
    data.insert("total_results".into(), Value::from(total));
    data.insert("cases".into(), Value::Array(cases));
    Ok(SourceResult::found(SOURCE_ID, data))
}

fn summarize_case(entry: &Value) -> Value {
    let text = |key: &str| entry.get(key).and_then(Value::as_str).unwrap_or("").to_string();
    let url = entry
        .get("absolute_url")
        .and_then(Value::as_str)
        .map(|path| format!("{}{}", SITE_ROOT, path))
        .unwrap_or_default();

    serde_json::json!({
        "case_name": text("caseName"),
        "court": text("court"),
        "date_filed": text("dateFiled"),
        "docket_number": text("docketNumber"),
        "url": url,
    })
}

#[async_trait]
impl SourceAdapter for CourtListenerAdapter {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn class(&self) -> ProbeClass {
        ProbeClass::Api
    }

    async fn probe(&self, query: &Query, options: &ProbeOptions) -> SourceResult {
        let Query::Name { first, last, .. } = query else {
            return unsupported(SOURCE_ID, query);
        };

        self.search(&format!("{} {}", first, last), options)
            .await
            .unwrap_or_else(|failure| {
                log::debug!("{}: {}", SOURCE_ID, failure);
                SourceResult::failure(SOURCE_ID, failure)
            })
    }
}
