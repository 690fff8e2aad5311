//! Search Module - builds one `Profile` per query
//!
//! `FootprintSearch` picks the adapter set for a query type, runs it through
//! the dispatcher, then summarizes, scores and packages the results.
//! Split into submodules:
//! - `dispatch`: bounded, cancellable probe fan-out
//! - `normalize`: hit flattening, URL deduplication, per-type summaries
//! - `risk`: scoring rules and recommendation bands

pub mod dispatch;
pub mod normalize;
pub mod risk;

pub use dispatch::{Probe, ProbeDispatcher};
pub use risk::RiskBand;

use crate::catalog::PlatformCatalog;
use crate::config::SearchConfig;
use crate::errors::FootprintResult;
use crate::http::HttpClient;
use crate::models::{Profile, Query, RiskSummary, SourceResult};
use crate::sources::{
    CourtListenerAdapter, DeepScanAdapter, GithubAdapter, LeakCheckAdapter, MarkerClassifier,
    NumverifyAdapter, OfflinePhoneAdapter, PeopleDataAdapter, PresenceClassifier, PresenceProber,
    ScanTool, SourceAdapter, VeriphoneAdapter,
};
use crate::ui::ProbeEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Profile builder for all four query types
pub struct FootprintSearch {
    http: Arc<dyn HttpClient>,
    catalog: Arc<PlatformCatalog>,
    classifier: Arc<dyn PresenceClassifier>,
    config: SearchConfig,
    cancel: CancellationToken,
    events: Option<mpsc::Sender<ProbeEvent>>,
}

impl FootprintSearch {
    pub fn new(http: Arc<dyn HttpClient>, catalog: PlatformCatalog, config: SearchConfig) -> Self {
        log::debug!(
            "Search engine ready: catalog {} ({} platforms), credentials {:?}",
            catalog.version,
            catalog.len(),
            config.credentials
        );
        Self {
            http,
            catalog: Arc::new(catalog),
            classifier: Arc::new(MarkerClassifier::default()),
            config,
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    /// Replace the presence heuristic
    pub fn with_classifier(mut self, classifier: Arc<dyn PresenceClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Cancelling this token aborts the running search with no profile
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: mpsc::Sender<ProbeEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PlatformCatalog {
        &self.catalog
    }

    pub async fn search_email(&self, address: &str, deep_scan: bool) -> FootprintResult<Profile> {
        self.search(&Query::email(address)?, deep_scan).await
    }

    pub async fn search_phone(&self, number: &str, region: Option<&str>) -> FootprintResult<Profile> {
        self.search(&Query::phone(number, region)?, false).await
    }

    pub async fn search_username(&self, username: &str, deep_scan: bool) -> FootprintResult<Profile> {
        self.search(&Query::username(username)?, deep_scan).await
    }

    pub async fn search_name(&self, first: &str, last: &str, state: Option<&str>) -> FootprintResult<Profile> {
        self.search(&Query::name(first, last, state)?, false).await
    }

    /// Run the adapter set for an already-validated query.
    /// `deep_scan` only affects email and username queries.
    pub async fn search(&self, query: &Query, deep_scan: bool) -> FootprintResult<Profile> {
        log::info!("Starting {} search for '{}'", query.query_type(), query.display());
        let profile = match query {
            Query::Email(_) => self.email_profile(query, deep_scan).await?,
            Query::Username(_) => self.username_profile(query, deep_scan).await?,
            Query::Phone { .. } => self.phone_profile(query).await?,
            Query::Name { .. } => self.name_profile(query).await?,
        };
        log::info!(
            "{} search complete: risk {} ({})",
            profile.query_type,
            profile.risk_score,
            RiskBand::from_score(profile.risk_score).label()
        );
        Ok(profile)
    }

    fn dispatcher(&self) -> ProbeDispatcher {
        let dispatcher = ProbeDispatcher::new(self.config.dispatch.clone(), self.cancel.clone());
        match &self.events {
            Some(events) => dispatcher.with_events(events.clone()),
            None => dispatcher,
        }
    }

    /// Catalog probers in catalog order, then the GitHub API, then deep-scan tools
    fn username_adapters(&self, deep_scan: bool) -> Vec<Arc<dyn SourceAdapter>> {
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = self
            .catalog
            .platforms
            .iter()
            .map(|platform| {
                Arc::new(PresenceProber::new(
                    platform.clone(),
                    Arc::clone(&self.http),
                    Arc::clone(&self.classifier),
                )) as Arc<dyn SourceAdapter>
            })
            .collect();
        adapters.push(Arc::new(GithubAdapter::new(Arc::clone(&self.http))));

        if deep_scan {
            let sensitive: Vec<&str> = self
                .catalog
                .platforms
                .iter()
                .filter(|p| p.sensitive)
                .map(|p| p.name.as_str())
                .collect();
            for tool in [ScanTool::Sherlock, ScanTool::Maigret] {
                adapters.push(Arc::new(
                    DeepScanAdapter::new(tool, self.config.deep_scan.clone())
                        .with_sensitive_platforms(sensitive.iter()),
                ));
            }
        }
        adapters
    }

    async fn username_profile(&self, query: &Query, deep_scan: bool) -> FootprintResult<Profile> {
        let results = self
            .dispatcher()
            .dispatch(query, self.username_adapters(deep_scan))
            .await?;
        let summary = normalize::summarize_username(&results, self.config.display_limit);
        let score = risk::score_username(&summary);
        Ok(assemble(query, results, score, RiskSummary::Username(summary)))
    }

    /// Breach lookup plus a username search on the address's local part,
    /// dispatched as one batch
    async fn email_profile(&self, query: &Query, deep_scan: bool) -> FootprintResult<Profile> {
        let breach: Arc<dyn SourceAdapter> = Arc::new(LeakCheckAdapter::new(
            Arc::clone(&self.http),
            self.config.credentials.leakcheck.clone(),
        ));
        let mut probes = vec![Probe::new(Arc::new(query.clone()), breach)];

        let derived = query.derived_username();
        match &derived {
            Some(username) => {
                log::debug!("Derived username '{}' from email", username.display());
                let username = Arc::new(username.clone());
                probes.extend(
                    self.username_adapters(deep_scan)
                        .into_iter()
                        .map(|adapter| Probe::new(Arc::clone(&username), adapter)),
                );
            }
            None => log::warn!("Email local part is not a usable username; skipping platform probes"),
        }

        let results = self.dispatcher().dispatch_probes(probes).await?;
        let (breach_results, username_results) = results.split_at(1);

        let username_summary = normalize::summarize_username(username_results, self.config.display_limit);
        let username_score = match derived {
            Some(_) => risk::score_username(&username_summary),
            None => 0,
        };
        let summary = normalize::summarize_email(breach_results, &username_summary, self.config.display_limit);
        let score = risk::score_email(&summary, username_score);
        Ok(assemble(query, results, score, RiskSummary::Email(summary)))
    }

    /// Offline parse first, then the two validators
    async fn phone_profile(&self, query: &Query) -> FootprintResult<Profile> {
        let credentials = &self.config.credentials;
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(OfflinePhoneAdapter::new()),
            Arc::new(NumverifyAdapter::new(Arc::clone(&self.http), credentials.numverify.clone())),
            Arc::new(VeriphoneAdapter::new(Arc::clone(&self.http), credentials.veriphone.clone())),
        ];
        let results = self.dispatcher().dispatch(query, adapters).await?;
        let summary = normalize::summarize_phone(&results);
        let score = risk::score_phone(&summary, &results);
        Ok(assemble(query, results, score, RiskSummary::Phone(summary)))
    }

    /// Court records always; people data only with a state hint
    async fn name_profile(&self, query: &Query) -> FootprintResult<Profile> {
        let mut adapters: Vec<Arc<dyn SourceAdapter>> =
            vec![Arc::new(CourtListenerAdapter::new(Arc::clone(&self.http)))];
        if matches!(query, Query::Name { state: Some(_), .. }) {
            adapters.push(Arc::new(PeopleDataAdapter::new(
                Arc::clone(&self.http),
                self.config.credentials.people_data_labs.clone(),
            )));
        }
        let results = self.dispatcher().dispatch(query, adapters).await?;
        let summary = normalize::summarize_name(&results);
        let score = risk::score_name(&summary);
        Ok(assemble(query, results, score, RiskSummary::Name(summary)))
    }
}

fn assemble(query: &Query, results: Vec<SourceResult>, risk_score: u8, summary: RiskSummary) -> Profile {
    Profile {
        query: query.display(),
        query_type: query.query_type(),
        results,
        risk_score,
        summary,
        recommendation: risk::recommendation(risk_score).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PlatformEntry;
    use crate::config::{Credentials, DeepScanConfig, DispatchConfig};
    use crate::errors::FootprintError;
    use crate::http::testing::FakeHttpClient;
    use crate::http::{HttpRequest, HttpResponse, TransportError};
    use crate::models::QueryType;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    fn test_catalog() -> PlatformCatalog {
        PlatformCatalog::new(
            "test",
            vec![
                PlatformEntry::new("alpha", "https://alpha.test/{username}"),
                PlatformEntry::new("bravo", "https://bravo.test/u/{username}"),
                PlatformEntry::new("velvet", "https://velvet.test/{username}").sensitive("adult"),
                PlatformEntry::new("satin", "https://satin.test/{username}").sensitive("adult"),
                PlatformEntry::new("silk", "https://silk.test/{username}").sensitive("adult"),
            ],
        )
        .unwrap()
    }

    fn test_config(credentials: Credentials) -> SearchConfig {
        SearchConfig {
            credentials,
            dispatch: DispatchConfig {
                max_concurrency: 4,
                presence_timeout: Duration::from_millis(500),
                api_timeout: Duration::from_millis(500),
                deep_scan_timeout: Duration::from_secs(1),
            },
            ..Default::default()
        }
    }

    /// Two ordinary hits; the sensitive platforms answer "not found" in
    /// different ways
    fn alice_web() -> FakeHttpClient {
        FakeHttpClient::new()
            .respond("https://alpha.test/alice123", 200, "<h1>alice123</h1>")
            .respond("https://bravo.test/u/alice123", 200, "<h1>alice123's page</h1>")
            .respond("https://velvet.test/alice123", 404, "")
            .respond("https://satin.test/alice123", 200, "<p>Sorry, this page isn't available.</p>")
            .fail("https://silk.test/alice123", "connection refused")
    }

    fn engine(http: FakeHttpClient, credentials: Credentials) -> FootprintSearch {
        FootprintSearch::new(Arc::new(http), test_catalog(), test_config(credentials))
    }

    fn username_summary(profile: &Profile) -> &crate::models::UsernameSummary {
        match &profile.summary {
            RiskSummary::Username(summary) => summary,
            other => panic!("expected username summary, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_username_end_to_end() {
        let profile = engine(alice_web(), Credentials::default())
            .search_username("alice123", false)
            .await
            .unwrap();

        let summary = username_summary(&profile);
        assert_eq!(summary.total_profiles, 2);
        assert_eq!(summary.adult_profiles_found, 0);
        assert_eq!(summary.platforms, vec!["alpha", "bravo"]);
        assert_eq!(profile.risk_score, 40);
        assert_eq!(profile.query_type, QueryType::Username);
        assert!(profile.recommendation.starts_with("MODERATE"));

        let sources: Vec<&str> = profile.results.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "presence:alpha",
                "presence:bravo",
                "presence:velvet",
                "presence:satin",
                "presence:silk",
                "github_api"
            ]
        );
        assert_eq!(profile.results[4].failure_kind(), Some("transport_error"));
    }

    #[tokio::test]
    async fn test_sensitive_hit_overrides_everything() {
        let http = alice_web().respond("https://silk.test/alice123", 200, "<h1>alice123</h1>");
        let profile = engine(http, Credentials::default())
            .search_username("alice123", false)
            .await
            .unwrap();

        let summary = username_summary(&profile);
        assert_eq!(summary.adult_profiles_found, 1);
        assert_eq!(summary.total_profiles, 3);
        assert_eq!(profile.risk_score, 100);
        assert!(profile.recommendation.starts_with("CRITICAL"));
    }

    #[tokio::test]
    async fn test_override_survives_failing_sources() {
        let http = FakeHttpClient::new()
            .respond("https://velvet.test/alice123", 200, "<h1>alice123</h1>")
            .fail("https://alpha.test/", "reset")
            .fail("https://bravo.test/", "reset")
            .fail("https://api.github.com/", "reset");
        let profile = engine(http, Credentials::default())
            .search_username("alice123", false)
            .await
            .unwrap();
        assert_eq!(profile.risk_score, 100);
        assert_eq!(username_summary(&profile).total_profiles, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_deep_scan_sensitive_hit_overrides_score() {
        // velvet answers 404 to the presence check; only sherlock sees the account
        let checkout = tempfile::tempdir().unwrap();
        std::fs::write(
            checkout.path().join("sherlock.py"),
            "echo '[+] Velvet: https://velvet.test/alice123'\n",
        )
        .unwrap();
        let config = SearchConfig {
            deep_scan: DeepScanConfig {
                sherlock_dir: checkout.path().to_path_buf(),
                python: "sh".into(),
                maigret_bin: "definitely-not-a-real-maigret-binary".into(),
            },
            ..test_config(Credentials::default())
        };
        let search = FootprintSearch::new(Arc::new(alice_web()), test_catalog(), config);

        let profile = search.search_username("alice123", true).await.unwrap();

        let summary = username_summary(&profile);
        assert_eq!(summary.total_profiles, 3);
        assert_eq!(summary.adult_profiles_found, 1);
        assert_eq!(profile.risk_score, 100);
        let sources: Vec<&str> = profile.results.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(&sources[5..], &["github_api", "sherlock", "maigret"]);
        assert!(profile.results[6].found);
        assert_eq!(profile.results[7].failure_kind(), Some("not_configured"));
    }

    #[tokio::test]
    async fn test_email_composition() {
        let breaches = json!({
            "success": true,
            "found": 2,
            "result": [{"source": {"name": "ExampleForum"}}, {"source": {"name": "ShopDB"}}]
        });
        let http = alice_web().respond("https://leakcheck.io/api/v2/query/", 200, &breaches.to_string());
        let credentials = Credentials {
            leakcheck: Some("key".into()),
            ..Default::default()
        };

        let profile = engine(http, credentials)
            .search_email("alice123@example.com", false)
            .await
            .unwrap();

        assert_eq!(profile.query_type, QueryType::Email);
        assert_eq!(profile.risk_score, 50);
        assert_eq!(profile.results[0].source, "leakcheck");
        assert_eq!(profile.results.len(), 7);
        match &profile.summary {
            RiskSummary::Email(summary) => {
                assert_eq!(summary.breaches_found, 2);
                assert_eq!(summary.social_profiles, 2);
                assert_eq!(summary.breaches, vec!["ExampleForum", "ShopDB"]);
                assert_eq!(summary.sources_checked, 7);
            }
            other => panic!("expected email summary, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_still_produce_profiles() {
        let email = engine(alice_web(), Credentials::default())
            .search_email("alice123@example.com", false)
            .await
            .unwrap();
        assert!(!email.results[0].found);
        assert!(email.results[0].str_field("error").unwrap().contains("not configured"));
        // No breaches: half of the username score only
        assert_eq!(email.risk_score, 20);

        let phone = engine(FakeHttpClient::new(), Credentials::default())
            .search_phone("+1 201 555 0123", None)
            .await
            .unwrap();
        assert_eq!(phone.results.len(), 3);
        assert!(phone.results[0].found);
        for validator in &phone.results[1..] {
            assert!(validator.str_field("error").unwrap().contains("not configured"));
        }
        // Offline validity only: 50 - 10
        assert_eq!(phone.risk_score, 40);

        let name = engine(FakeHttpClient::new(), Credentials::default())
            .search_name("Jane", "Doe", Some("OR"))
            .await
            .unwrap();
        assert_eq!(name.results.len(), 2);
        assert_eq!(name.risk_score, 30);
        match &name.summary {
            RiskSummary::Name(summary) => assert_eq!(summary.manual_search_links.len(), 4),
            other => panic!("expected name summary, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_phone_validators_feed_scoring() {
        let numverify = json!({"valid": true, "number": "12015550123", "carrier": "Bandwidth", "line_type": "voip"});
        let veriphone = json!({"status": "success", "phone_valid": true, "phone_type": "prepaid", "carrier": "Bandwidth"});
        let http = FakeHttpClient::new()
            .respond("http://apilayer.net/api/validate", 200, &numverify.to_string())
            .respond("https://api.veriphone.io/v2/verify", 200, &veriphone.to_string());
        let credentials = Credentials {
            numverify: Some("n".into()),
            veriphone: Some("v".into()),
            ..Default::default()
        };

        let profile = engine(http, credentials)
            .search_phone("+1 201 555 0123", None)
            .await
            .unwrap();
        // 50 + 30 voip + 20 prepaid - 10 valid - 5 carrier
        assert_eq!(profile.risk_score, 85);
        match &profile.summary {
            RiskSummary::Phone(summary) => {
                assert_eq!(summary.formatted.as_deref(), Some("+12015550123"));
                assert_eq!(summary.line_type, Some(crate::models::LineType::Voip));
            }
            other => panic!("expected phone summary, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_offline_voip_classification_scores_without_keys() {
        let profile = engine(FakeHttpClient::new(), Credentials::default())
            .search_phone("+44 56 1234 5678", None)
            .await
            .unwrap();
        // 50 + 30 voip - 10 valid
        assert_eq!(profile.risk_score, 70);
        match &profile.summary {
            RiskSummary::Phone(summary) => {
                assert_eq!(summary.line_type, Some(crate::models::LineType::Voip));
                assert_eq!(summary.country.as_deref(), Some("GB"));
            }
            other => panic!("expected phone summary, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_name_without_state_skips_people_search() {
        let profile = engine(FakeHttpClient::new(), Credentials::default())
            .search_name("Jane", "Doe", None)
            .await
            .unwrap();
        assert_eq!(profile.results.len(), 1);
        assert_eq!(profile.results[0].source, "courtlistener");
        assert_eq!(profile.query, "Jane Doe");
    }

    #[tokio::test]
    async fn test_invalid_query_is_rejected_before_dispatch() {
        let http = Arc::new(FakeHttpClient::new());
        let search = FootprintSearch::new(http.clone(), test_catalog(), test_config(Credentials::default()));
        let err = search.search_email("not-an-email", false).await.unwrap_err();
        assert!(matches!(err, FootprintError::InvalidQuery { .. }));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_search_yields_no_profile() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let search = engine(alice_web(), Credentials::default()).with_cancellation(cancel);
        let outcome = search.search_username("alice123", false).await;
        assert!(matches!(outcome, Err(FootprintError::Cancelled)));
    }

    /// Delays each response by a per-host amount to shuffle completion order
    struct SlowWeb {
        inner: FakeHttpClient,
        delays: HashMap<&'static str, u64>,
    }

    #[async_trait]
    impl HttpClient for SlowWeb {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let delay = self
                .delays
                .iter()
                .find(|(host, _)| request.url.contains(*host))
                .map(|(_, ms)| *ms)
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.inner.execute(request).await
        }
    }

    #[tokio::test]
    async fn test_completion_order_does_not_change_the_profile() {
        let hosts = ["alpha.test", "bravo.test", "velvet.test", "satin.test", "silk.test"];
        let orders: [[u64; 5]; 3] = [[0, 10, 20, 30, 40], [40, 30, 20, 10, 0], [20, 0, 40, 10, 30]];

        let mut profiles = Vec::new();
        for delays in orders {
            let web = SlowWeb {
                inner: alice_web(),
                delays: hosts.iter().copied().zip(delays).collect(),
            };
            let search = FootprintSearch::new(Arc::new(web), test_catalog(), test_config(Credentials::default()));
            profiles.push(search.search_username("alice123", false).await.unwrap());
        }

        for profile in &profiles[1..] {
            assert_eq!(profile.summary, profiles[0].summary);
            assert_eq!(profile.risk_score, profiles[0].risk_score);
            let sources = |p: &Profile| p.results.iter().map(|r| r.source.clone()).collect::<Vec<_>>();
            assert_eq!(sources(profile), sources(&profiles[0]));
        }
    }

    #[tokio::test]
    async fn test_progress_events_are_emitted() {
        let (tx, mut rx) = mpsc::channel(64);
        let search = engine(alice_web(), Credentials::default()).with_events(tx);
        search.search_username("alice123", false).await.unwrap();

        let mut finished = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ProbeEvent::ProbeFinished { .. }) {
                finished += 1;
            }
        }
        assert_eq!(finished, 6);
    }
}
