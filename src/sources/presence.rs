//! Platform presence probing.
//!
//! A prober fetches one profile URL and asks a `PresenceClassifier` whether
//! the account exists. The default classifier is a heuristic (HTTP success
//! plus no known "not found" phrase) and is approximate: soft-404 pages and
//! rate-limit pages served with 200 produce false positives, and pages that
//! mention a marker in ordinary content produce false negatives.

use super::{send, ProbeClass, ProbeOptions, SourceAdapter};
use crate::catalog::PlatformEntry;
use crate::http::{HttpClient, HttpRequest, DEFAULT_USER_AGENT};
use crate::models::{ProbeFailure, Query, ReportedProfile, SourceResult, PROFILES_KEY};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Generic phrases that mark a soft-404 profile page
pub const DEFAULT_NOT_FOUND_MARKERS: &[&str] = &[
    "page not found",
    "user not found",
    "this account doesn",
    "sorry, this page",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Exists,
    Absent,
    /// Blocked, rate-limited, or otherwise inconclusive
    Ambiguous,
}

/// Replaceable existence policy: response -> presence
pub trait PresenceClassifier: Send + Sync {
    fn classify(&self, status: u16, body: &str, platform: &PlatformEntry) -> Presence;
}

/// Status code plus case-insensitive not-found phrase matching
#[derive(Debug, Clone)]
pub struct MarkerClassifier {
    markers: Vec<String>,
}

impl MarkerClassifier {
    pub fn new<S: AsRef<str>>(markers: &[S]) -> Self {
        Self {
            markers: markers
                .iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    fn has_marker(&self, body_lower: &str, platform: &PlatformEntry) -> bool {
        self.markers.iter().any(|m| body_lower.contains(m.as_str()))
            || platform
                .not_found_markers
                .iter()
                .any(|m| body_lower.contains(m.to_lowercase().as_str()))
    }
}

impl Default for MarkerClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOT_FOUND_MARKERS)
    }
}

impl PresenceClassifier for MarkerClassifier {
    fn classify(&self, status: u16, body: &str, platform: &PlatformEntry) -> Presence {
        match status {
            200..=299 => {
                if self.has_marker(&body.to_lowercase(), platform) {
                    Presence::Absent
                } else {
                    Presence::Exists
                }
            }
            404 | 410 => Presence::Absent,
            _ => Presence::Ambiguous,
        }
    }
}

/// One catalog platform, probed for one username
pub struct PresenceProber {
    source_id: String,
    platform: PlatformEntry,
    http: Arc<dyn HttpClient>,
    classifier: Arc<dyn PresenceClassifier>,
}

impl PresenceProber {
    pub fn new(
        platform: PlatformEntry,
        http: Arc<dyn HttpClient>,
        classifier: Arc<dyn PresenceClassifier>,
    ) -> Self {
        Self {
            source_id: format!("presence:{}", platform.name),
            platform,
            http,
            classifier,
        }
    }

    fn base_payload(&self, url: &str, status: u16) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("platform".into(), Value::from(self.platform.name.as_str()));
        data.insert("url".into(), Value::from(url));
        data.insert("sensitive".into(), Value::from(self.platform.sensitive));
        if let Some(category) = &self.platform.category {
            data.insert("category".into(), Value::from(category.as_str()));
        }
        data.insert("http_status".into(), Value::from(status));
        data
    }
}

#[async_trait]
impl SourceAdapter for PresenceProber {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn class(&self) -> ProbeClass {
        ProbeClass::Presence
    }

    async fn probe(&self, query: &Query, options: &ProbeOptions) -> SourceResult {
        let Query::Username(username) = query else {
            return super::unsupported(&self.source_id, query);
        };

        let url = self.platform.url_for(username);
        let request = HttpRequest::get(&url)
            .header("User-Agent", DEFAULT_USER_AGENT)
            .timeout(options.timeout);

        let response = match send(self.http.as_ref(), request).await {
            Ok(response) => response,
            Err(failure) => {
                log::debug!("{}: {}", self.source_id, failure);
                return SourceResult::failure(&self.source_id, failure);
            }
        };

        let presence = self
            .classifier
            .classify(response.status, &response.body, &self.platform);
        let mut data = self.base_payload(&url, response.status);

        match presence {
            Presence::Exists => {
                data.insert("status".into(), Value::from("likely_exists"));
                let profile = ReportedProfile {
                    sensitive: self.platform.sensitive,
                    category: self.platform.category.clone(),
                    ..ReportedProfile::new(self.platform.name.as_str(), url.as_str())
                };
                data.insert(PROFILES_KEY.into(), Value::Array(vec![profile.to_value()]));
                SourceResult::found(&self.source_id, data).with_url(url)
            }
            Presence::Absent => {
                data.insert("status".into(), Value::from("not_found"));
                data.extend(ProbeFailure::NotFound("No account detected".into()).into_payload());
                SourceResult::absent(&self.source_id, data)
            }
            Presence::Ambiguous => {
                data.insert("status".into(), Value::from("ambiguous"));
                data.insert(
                    "message".into(),
                    Value::from(format!("Inconclusive response (HTTP {})", response.status)),
                );
                SourceResult::absent(&self.source_id, data)
            }
        }
    }
}
