//! Source adapters.
//!
//! Each adapter answers one question about one query and always returns a
//! `SourceResult`. Network errors, bad payloads, missing credentials and
//! upstream "no match" answers are all folded into `found: false` results
//! here, so nothing an adapter does can fail a batch.
//!
//! Adapter families:
//! - `presence`: unauthenticated profile-page probes driven by the platform catalog
//! - `breach`, `phone`, `github`, `legal`, `people`: structured JSON APIs
//! - `deep_scan`: external username scanners run as child processes

pub mod breach;
pub mod deep_scan;
pub mod github;
pub mod legal;
pub mod people;
pub mod phone;
pub mod presence;

pub use breach::LeakCheckAdapter;
pub use deep_scan::{DeepScanAdapter, ScanTool};
pub use github::GithubAdapter;
pub use legal::CourtListenerAdapter;
pub use people::PeopleDataAdapter;
pub use phone::{NumverifyAdapter, OfflinePhoneAdapter, VeriphoneAdapter};
pub use presence::{MarkerClassifier, Presence, PresenceClassifier, PresenceProber};

use crate::http::{HttpClient, HttpRequest, HttpResponse, TransportError};
use crate::models::{ProbeFailure, Query, SourceResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

/// Timeout class; the dispatcher maps each class to a deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeClass {
    /// Many cheap page fetches; short deadline
    Presence,
    /// Few structured API calls; longer deadline
    Api,
    /// External scanner processes; longest deadline
    DeepScan,
}

/// Per-probe options supplied by the dispatcher
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub timeout: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
        }
    }
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique per adapter instance
    fn source_id(&self) -> &str;

    fn class(&self) -> ProbeClass;

    /// Never fails: every failure mode becomes a `found: false` result
    async fn probe(&self, query: &Query, options: &ProbeOptions) -> SourceResult;
}

/// Result for a query type this adapter does not handle
pub(crate) fn unsupported(source: &str, query: &Query) -> SourceResult {
    SourceResult::failure(
        source,
        ProbeFailure::NotConfigured(format!(
            "{} is not configured for {} queries",
            source,
            query.query_type()
        )),
    )
}

pub(crate) async fn send(
    http: &dyn HttpClient,
    request: HttpRequest,
) -> Result<HttpResponse, ProbeFailure> {
    http.execute(request).await.map_err(|e| match e {
        TransportError::Timeout => ProbeFailure::Timeout,
        TransportError::Failed(message) => ProbeFailure::Transport(message),
    })
}

pub(crate) fn parse_body(response: &HttpResponse) -> Result<Value, ProbeFailure> {
    response.json().map_err(|e| {
        ProbeFailure::Parse(format!(
            "malformed response (HTTP {}): {}",
            response.status, e
        ))
    })
}

pub(crate) fn http_error(response: &HttpResponse) -> ProbeFailure {
    ProbeFailure::Transport(format!("HTTP {}", response.status))
}

/// Copy `from` into `to` under `key`, skipping nulls and empty strings
pub(crate) fn carry(to: &mut Map<String, Value>, key: &str, from: Option<&Value>) {
    match from {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if s.is_empty() => {}
        Some(value) => {
            to.insert(key.to_string(), value.clone());
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted adapter for dispatcher and engine tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub enum Outcome {
        Result(SourceResult),
        Panic,
    }

    pub struct FakeAdapter {
        pub id: String,
        pub class: ProbeClass,
        pub delay: Duration,
        pub outcome: Outcome,
        /// Shared (in flight, high-water mark) counters
        pub gauge: Option<Arc<(AtomicUsize, AtomicUsize)>>,
    }

    impl FakeAdapter {
        pub fn returning(result: SourceResult) -> Self {
            Self {
                id: result.source.clone(),
                class: ProbeClass::Api,
                delay: Duration::ZERO,
                outcome: Outcome::Result(result),
                gauge: None,
            }
        }

        pub fn found(id: &str) -> Self {
            Self::returning(SourceResult::found(id, Map::new()))
        }

        pub fn panicking(id: &str) -> Self {
            Self {
                outcome: Outcome::Panic,
                ..Self::found(id)
            }
        }

        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn class(mut self, class: ProbeClass) -> Self {
            self.class = class;
            self
        }

        pub fn gauge(mut self, gauge: Arc<(AtomicUsize, AtomicUsize)>) -> Self {
            self.gauge = Some(gauge);
            self
        }
    }

    #[async_trait]
    impl SourceAdapter for FakeAdapter {
        fn source_id(&self) -> &str {
            &self.id
        }

        fn class(&self) -> ProbeClass {
            self.class
        }

        async fn probe(&self, _query: &Query, _options: &ProbeOptions) -> SourceResult {
            if let Some(gauge) = &self.gauge {
                let now = gauge.0.fetch_add(1, Ordering::SeqCst) + 1;
                gauge.1.fetch_max(now, Ordering::SeqCst);
            }
            tokio::time::sleep(self.delay).await;
            if let Some(gauge) = &self.gauge {
                gauge.0.fetch_sub(1, Ordering::SeqCst);
            }
            match &self.outcome {
                Outcome::Result(result) => result.clone(),
                Outcome::Panic => panic!("scripted adapter failure"),
            }
        }
    }
}
