//! Shared data model: queries, per-source results, normalized hits,
//! per-type summaries and the final profile.

mod query;

pub use query::{Query, QueryType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload key under which adapters report discovered profiles
pub const PROFILES_KEY: &str = "profiles";

/// One adapter's outcome for one query.
///
/// The envelope is fixed; `data` is source-defined and deliberately not
/// unified across adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    pub source: String,
    pub found: bool,
    pub data: Map<String, Value>,
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SourceResult {
    /// Positive result with a source-defined payload
    pub fn found(source: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            source: source.into(),
            found: true,
            data,
            url: None,
            timestamp: Utc::now(),
        }
    }

    /// Negative result carrying its own explanatory payload
    pub fn absent(source: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            source: source.into(),
            found: false,
            data,
            url: None,
            timestamp: Utc::now(),
        }
    }

    /// Negative result for a failed or empty probe
    pub fn failure(source: impl Into<String>, failure: ProbeFailure) -> Self {
        Self::absent(source, failure.into_payload())
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    pub fn u64_field(&self, key: &str) -> Option<u64> {
        self.data.get(key).and_then(Value::as_u64)
    }

    pub fn bool_field(&self, key: &str) -> bool {
        self.data.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Failure discriminant, if this result records one
    pub fn failure_kind(&self) -> Option<&str> {
        self.str_field("kind")
    }

    /// Profiles this source reported, skipping malformed entries
    pub fn reported_profiles(&self) -> Vec<ReportedProfile> {
        match self.data.get(PROFILES_KEY) {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| match serde_json::from_value(entry.clone()) {
                    Ok(profile) => Some(profile),
                    Err(e) => {
                        log::debug!("Skipping malformed profile entry from {}: {}", self.source, e);
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Why a probe produced no positive result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeFailure {
    /// Credential or tool absent; expected and non-fatal
    #[error("{0}")]
    NotConfigured(String),
    /// Probe exceeded its deadline
    #[error("timeout")]
    Timeout,
    /// Network or HTTP-level failure
    #[error("{0}")]
    Transport(String),
    /// Upstream answered with something we could not read
    #[error("{0}")]
    Parse(String),
    /// Source explicitly reports no match
    #[error("{0}")]
    NotFound(String),
}

impl ProbeFailure {
    /// Missing API credential
    pub fn missing_credential(service: &str, variable: &str) -> Self {
        Self::NotConfigured(format!(
            "{} API key not configured (set {})",
            service, variable
        ))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProbeFailure::NotConfigured(_) => "not_configured",
            ProbeFailure::Timeout => "timeout",
            ProbeFailure::Transport(_) => "transport_error",
            ProbeFailure::Parse(_) => "parse_error",
            ProbeFailure::NotFound(_) => "not_found",
        }
    }

    /// `found: false` payload: `error` for failures, `message` for a clean miss
    pub fn into_payload(self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("kind".into(), Value::from(self.kind()));
        match self {
            ProbeFailure::NotFound(message) => {
                data.insert("message".into(), Value::from(message));
            }
            other => {
                data.insert("error".into(), Value::from(other.to_string()));
            }
        }
        data
    }
}

/// A profile entry as an adapter reports it inside its payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportedProfile {
    #[serde(alias = "site")]
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ReportedProfile {
    pub fn new(platform: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A normalized, deduplicated finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileHit {
    pub platform: String,
    /// Canonical URL; the deduplication key
    pub url: Option<String>,
    /// Source that first reported this hit
    pub source: String,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Canonical phone line classification.
///
/// Every phone adapter maps its own vocabulary into this enum; scoring only
/// ever looks at `LineType`, never at raw upstream strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    Mobile,
    FixedLine,
    FixedLineOrMobile,
    Voip,
    TollFree,
    PremiumRate,
    SharedCost,
    Personal,
    Pager,
    Prepaid,
    Unknown,
}

impl LineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineType::Mobile => "mobile",
            LineType::FixedLine => "fixed_line",
            LineType::FixedLineOrMobile => "fixed_line_or_mobile",
            LineType::Voip => "voip",
            LineType::TollFree => "toll_free",
            LineType::PremiumRate => "premium_rate",
            LineType::SharedCost => "shared_cost",
            LineType::Personal => "personal",
            LineType::Pager => "pager",
            LineType::Prepaid => "prepaid",
            LineType::Unknown => "unknown",
        }
    }

    /// Parse a value previously written with `as_str`
    pub fn from_canonical(value: &str) -> Option<Self> {
        serde_json::from_value(Value::from(value)).ok()
    }
}

impl std::fmt::Display for LineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsernameSummary {
    /// Deduplicated hit count; never affected by the display cap
    pub total_profiles: usize,
    pub adult_profiles_found: usize,
    pub platforms: Vec<String>,
    pub profiles: Vec<ProfileHit>,
    pub sources_checked: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailSummary {
    pub breaches_found: u64,
    pub breaches: Vec<String>,
    pub social_profiles: usize,
    pub adult_profiles_found: usize,
    pub platforms: Vec<String>,
    pub profiles: Vec<ProfileHit>,
    pub sources_checked: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneSummary {
    pub valid: bool,
    pub formatted: Option<String>,
    pub country: Option<String>,
    pub carrier: Option<String>,
    pub line_type: Option<LineType>,
    pub location: Option<String>,
    pub sources_checked: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameSummary {
    pub legal_cases_found: u64,
    pub legal_cases: Vec<Value>,
    pub people_profiles: Vec<Value>,
    pub manual_search_links: Vec<Value>,
    pub sources_checked: usize,
}

/// Per-query-type aggregate consumed by scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RiskSummary {
    Email(EmailSummary),
    Username(UsernameSummary),
    Phone(PhoneSummary),
    Name(NameSummary),
}

/// Final artifact of one top-level search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub query: String,
    pub query_type: QueryType,
    /// Dispatch order, not completion order
    pub results: Vec<SourceResult>,
    pub risk_score: u8,
    pub summary: RiskSummary,
    pub recommendation: String,
}

impl Profile {
    pub fn to_json_pretty(&self) -> crate::errors::FootprintResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
