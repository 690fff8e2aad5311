//! Breach-index lookup (LeakCheck v2).

use super::{carry, parse_body, send, unsupported, ProbeClass, ProbeOptions, SourceAdapter};
use crate::config::LEAKCHECK_ENV;
use crate::http::{HttpClient, HttpRequest};
use crate::models::{ProbeFailure, Query, SourceResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const SOURCE_ID: &str = "leakcheck";
const API_BASE: &str = "https://leakcheck.io/api/v2/query/";

pub struct LeakCheckAdapter {
    http: Arc<dyn HttpClient>,
    api_key: Option<String>,
    base_url: String,
}

impl LeakCheckAdapter {
    pub fn new(http: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn query_url(&self, email: &str) -> Result<String, ProbeFailure> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| ProbeFailure::NotConfigured(format!("invalid LeakCheck base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ProbeFailure::NotConfigured("LeakCheck base URL cannot take a path".into()))?
            .pop_if_empty()
            .push(email);
        Ok(url.into())
    }

    async fn lookup(&self, email: &str, api_key: &str, options: &ProbeOptions) -> Result<SourceResult, ProbeFailure> {
        let request = HttpRequest::get(self.query_url(email)?)
            .header("X-API-Key", api_key)
            .header("Accept", "application/json")
            .timeout(options.timeout);

        let response = send(self.http.as_ref(), request).await?;
        let body = parse_body(&response)?;
        interpret_response(response.status, &body)
    }
}

/// Map a LeakCheck answer onto a result
pub(crate) fn interpret_response(status: u16, body: &Value) -> Result<SourceResult, ProbeFailure> {
    let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);

    if !success {
        let error = body
            .get("error")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        if error.to_lowercase().contains("not found") {
            return Err(ProbeFailure::NotFound("No breaches found".into()));
        }
        return Err(ProbeFailure::Transport(format!("LeakCheck error (HTTP {}): {}", status, error)));
    }

    let found = body.get("found").and_then(Value::as_u64).unwrap_or(0);
    if found == 0 {
        return Err(ProbeFailure::NotFound("No breaches found".into()));
    }

    let breaches: Vec<Value> = body
        .get("result")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(summarize_breach).collect())
        .unwrap_or_default();

    let mut data = Map::new();
    data.insert("breaches_found".into(), Value::from(found));
    data.insert("breaches".into(), Value::Array(breaches));
    Ok(SourceResult::found(SOURCE_ID, data))
}

/// Keep breach provenance and exposed field names, never the leaked values
fn summarize_breach(entry: &Value) -> Value {
    let mut out = Map::new();
    let source = entry.get("source");
    let name = source
        .and_then(|s| s.get("name"))
        .or_else(|| entry.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown");
    out.insert("name".into(), Value::from(name));
    carry(
        &mut out,
        "date",
        source.and_then(|s| s.get("breach_date")).or_else(|| entry.get("date")),
    );
    carry(&mut out, "fields", entry.get("fields"));
    Value::Object(out)
}

#[async_trait]
impl SourceAdapter for LeakCheckAdapter {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn class(&self) -> ProbeClass {
        ProbeClass::Api
    }

    async fn probe(&self, query: &Query, options: &ProbeOptions) -> SourceResult {
        let Query::Email(email) = query else {
            return unsupported(SOURCE_ID, query);
        };
        let Some(api_key) = self.api_key.as_deref() else {
            return SourceResult::failure(SOURCE_ID, ProbeFailure::missing_credential("LeakCheck", LEAKCHECK_ENV));
        };

        match self.lookup(email, api_key, options).await {
            Ok(result) => result,
            Err(failure) => {
                log::debug!("{}: {}", SOURCE_ID, failure);
                SourceResult::failure(SOURCE_ID, failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeHttpClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let adapter = LeakCheckAdapter::new(Arc::new(FakeHttpClient::new()), None);
        let result = adapter
            .probe(&Query::Email("alice123@example.com".into()), &ProbeOptions::default())
            .await;
        assert!(!result.found);
        assert!(result.str_field("error").unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn test_breaches_found() {
        let body = json!({
            "success": true,
            "found": 2,
            "result": [
                {"source": {"name": "ExampleForum", "breach_date": "2019-03"}, "fields": ["email", "password"], "password": "hunter2"},
                {"source": {"name": "ShopDB"}, "fields": ["email"]}
            ]
        });
        let http = Arc::new(FakeHttpClient::new().respond(API_BASE, 200, &body.to_string()));
        let adapter = LeakCheckAdapter::new(http.clone(), Some("key".into()));

        let result = adapter
            .probe(&Query::Email("alice123@example.com".into()), &ProbeOptions::default())
            .await;

        assert!(result.found);
        assert_eq!(result.u64_field("breaches_found"), Some(2));
        let breaches = result.data["breaches"].as_array().unwrap();
        assert_eq!(breaches[0]["name"], "ExampleForum");
        assert_eq!(breaches[0]["date"], "2019-03");
        assert!(breaches[0].get("password").is_none());

        let request = &http.requests()[0];
        assert!(request.url.ends_with("/query/alice123@example.com"));
        assert!(request.headers.iter().any(|(k, v)| k == "X-API-Key" && v == "key"));
    }

    #[test]
    fn test_interpret_negative_answers() {
        let none = interpret_response(200, &json!({"success": true, "found": 0})).unwrap_err();
        assert_eq!(none.kind(), "not_found");

        let missing = interpret_response(200, &json!({"success": false, "error": "Not found"})).unwrap_err();
        assert_eq!(missing.kind(), "not_found");

        let denied = interpret_response(401, &json!({"success": false, "error": "Invalid API key"})).unwrap_err();
        assert_eq!(denied.kind(), "transport_error");
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let http = Arc::new(FakeHttpClient::new().respond(API_BASE, 502, "<html>Bad gateway</html>"));
        let adapter = LeakCheckAdapter::new(http, Some("key".into()));
        let result = adapter
            .probe(&Query::Email("alice123@example.com".into()), &ProbeOptions::default())
            .await;
        assert_eq!(result.failure_kind(), Some("parse_error"));
    }
}
