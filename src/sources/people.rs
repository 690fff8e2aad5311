//! People-data search (People Data Labs person search).
//!
//! Needs a name plus a state hint. Without a credential the result still
//! carries manual lookup links for the common free people-search sites.

use super::{http_error, parse_body, send, unsupported, ProbeClass, ProbeOptions, SourceAdapter};
use crate::config::PDL_ENV;
use crate::http::{HttpClient, HttpRequest};
use crate::models::{ProbeFailure, Query, SourceResult};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use url::Url;

pub const SOURCE_ID: &str = "people_data_labs";
const SEARCH_URL: &str = "https://api.peopledatalabs.com/v5/person/search";
const MAX_PEOPLE: usize = 10;
const MAX_CONTACTS: usize = 2;

/// Key under which manual lookup links are reported
pub const MANUAL_LINKS_KEY: &str = "manual_search_links";

pub struct PeopleDataAdapter {
    http: Arc<dyn HttpClient>,
    api_key: Option<String>,
    endpoint: String,
}

impl PeopleDataAdapter {
    pub fn new(http: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            endpoint: SEARCH_URL.to_string(),
        }
    }

    async fn search(
        &self,
        first: &str,
        last: &str,
        state: &str,
        api_key: &str,
        options: &ProbeOptions,
    ) -> Result<SourceResult, ProbeFailure> {
        let request = HttpRequest::post_json(&self.endpoint, search_body(first, last, state))
            .header("X-Api-Key", api_key)
            .timeout(options.timeout);

        let response = send(self.http.as_ref(), request).await?;
        match response.status {
            200 => interpret_search(&parse_body(&response)?),
            404 => Err(ProbeFailure::NotFound("No matching people records".into())),
            _ => Err(http_error(&response)),
        }
    }
}

fn search_body(first: &str, last: &str, state: &str) -> Value {
    json!({
        "query": {
            "bool": {
                "must": [
                    {"term": {"first_name": first.to_lowercase()}},
                    {"term": {"last_name": last.to_lowercase()}},
                    {"term": {"location_region": state}}
                ]
            }
        },
        "size": MAX_PEOPLE
    })
}

pub(crate) fn interpret_search(body: &Value) -> Result<SourceResult, ProbeFailure> {
    let people = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ProbeFailure::Parse("person search response has no data list".into()))?;
    if people.is_empty() {
        return Err(ProbeFailure::NotFound("No matching people records".into()));
    }

    let profiles: Vec<Value> = people.iter().take(MAX_PEOPLE).map(summarize_person).collect();
    let total = body
        .get("total")
        .and_then(Value::as_u64)
        .unwrap_or(people.len() as u64);

    let mut data = Map::new();
    data.insert("total_results".into(), Value::from(total));
    data.insert("people".into(), Value::Array(profiles));
    Ok(SourceResult::found(SOURCE_ID, data))
}

fn summarize_person(person: &Value) -> Value {
    let field = |key: &str| person.get(key).cloned().unwrap_or(Value::Null);
    let first_n = |key: &str| -> Value {
        person
            .get(key)
            .and_then(Value::as_array)
            .map(|items| Value::Array(items.iter().take(MAX_CONTACTS).cloned().collect()))
            .unwrap_or_else(|| Value::Array(Vec::new()))
    };

    json!({
        "full_name": field("full_name"),
        "first_name": field("first_name"),
        "last_name": field("last_name"),
        "location": field("location_name"),
        "job_title": field("job_title"),
        "company": field("job_company_name"),
        "linkedin_url": field("linkedin_url"),
        "emails": first_n("emails"),
        "phones": first_n("phone_numbers"),
    })
}

/// Manual lookup links for a name and state
pub fn manual_search_links(first: &str, last: &str, state: &str) -> Vec<Value> {
    let name = format!("{}-{}", slug(first), slug(last));
    let state = state.to_uppercase();
    [
        link("TruePeopleSearch", "https://www.truepeoplesearch.com/results", |url| {
            url.query_pairs_mut()
                .append_pair("name", &format!("{} {}", first.trim(), last.trim()))
                .append_pair("citystatezip", &state);
        }),
        link("FastPeopleSearch", "https://www.fastpeoplesearch.com/name/", |url| {
            push_segments(url, &[&format!("{}_{}", name, state)]);
        }),
        link("Whitepages", "https://www.whitepages.com/name/", |url| {
            push_segments(url, &[&name, &state]);
        }),
        link("ThatsThem", "https://thatsthem.com/name/", |url| {
            push_segments(url, &[&name, &state]);
        }),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn link(site: &str, base: &str, build: impl FnOnce(&mut Url)) -> Option<Value> {
    let mut url = Url::parse(base).ok()?;
    build(&mut url);
    Some(json!({ "site": site, "url": url.as_str() }))
}

/// Append percent-encoded path segments
fn push_segments(url: &mut Url, segments: &[&str]) {
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
}

fn slug(part: &str) -> String {
    part.split_whitespace().collect::<Vec<_>>().join("-")
}

#[async_trait]
impl SourceAdapter for PeopleDataAdapter {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn class(&self) -> ProbeClass {
        ProbeClass::Api
    }

    async fn probe(&self, query: &Query, options: &ProbeOptions) -> SourceResult {
        let Query::Name { first, last, state } = query else {
            return unsupported(SOURCE_ID, query);
        };
        let Some(state) = state.as_deref() else {
            return SourceResult::failure(
                SOURCE_ID,
                ProbeFailure::NotConfigured("people-data search is not configured without a state hint".into()),
            );
        };
        let Some(api_key) = self.api_key.as_deref() else {
            let mut result =
                SourceResult::failure(SOURCE_ID, ProbeFailure::missing_credential("People Data Labs", PDL_ENV));
            result.data.insert(
                MANUAL_LINKS_KEY.into(),
                Value::Array(manual_search_links(first, last, state)),
            );
            return result;
        };

        self.search(first, last, state, api_key, options)
            .await
            .unwrap_or_else(|failure| {
                log::debug!("{}: {}", SOURCE_ID, failure);
                SourceResult::failure(SOURCE_ID, failure)
            })
    }
}
