//! GitHub public user API.

use super::{carry, http_error, parse_body, send, unsupported, ProbeClass, ProbeOptions, SourceAdapter};
use crate::http::{HttpClient, HttpRequest, DEFAULT_USER_AGENT};
use crate::models::{ProbeFailure, Query, ReportedProfile, SourceResult, PROFILES_KEY};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const SOURCE_ID: &str = "github_api";
const API_BASE: &str = "https://api.github.com/users/";

/// Fields copied verbatim from the user object
const PROFILE_FIELDS: &[&str] = &[
    "login",
    "name",
    "bio",
    "company",
    "location",
    "email",
    "twitter_username",
    "blog",
    "followers",
    "following",
    "public_repos",
    "created_at",
    "avatar_url",
];

pub struct GithubAdapter {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl GithubAdapter {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            base_url: API_BASE.to_string(),
        }
    }

    async fn lookup(&self, username: &str, options: &ProbeOptions) -> Result<SourceResult, ProbeFailure> {
        let request = HttpRequest::get(format!("{}{}", self.base_url, username))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", DEFAULT_USER_AGENT)
            .timeout(options.timeout);

        let response = send(self.http.as_ref(), request).await?;
        match response.status {
            200 => interpret_user(&parse_body(&response)?),
            404 => Err(ProbeFailure::NotFound("User not found".into())),
            _ => Err(http_error(&response)),
        }
    }
}

pub(crate) fn interpret_user(user: &Value) -> Result<SourceResult, ProbeFailure> {
    let login = user
        .get("login")
        .and_then(Value::as_str)
        .ok_or_else(|| ProbeFailure::Parse("user object has no login".into()))?;
    let html_url = user
        .get("html_url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://github.com/{}", login));

    let mut data = Map::new();
    for field in PROFILE_FIELDS {
        carry(&mut data, field, user.get(*field));
    }

    let text = |key: &str| user.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string);
    let profile = ReportedProfile {
        name: text("name"),
        email: text("email"),
        bio: text("bio"),
        location: text("location"),
        ..ReportedProfile::new("GitHub", html_url.as_str())
    };
    data.insert(PROFILES_KEY.into(), Value::Array(vec![profile.to_value()]));

    Ok(SourceResult::found(SOURCE_ID, data).with_url(html_url))
}

#[async_trait]
impl SourceAdapter for GithubAdapter {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn class(&self) -> ProbeClass {
        ProbeClass::Api
    }

    async fn probe(&self, query: &Query, options: &ProbeOptions) -> SourceResult {
        let Query::Username(username) = query else {
            return unsupported(SOURCE_ID, query);
        };

        self.lookup(username, options).await.unwrap_or_else(|failure| {
            log::debug!("{}: {}", SOURCE_ID, failure);
            SourceResult::failure(SOURCE_ID, failure)
        })
    }
}
