//! Probe dispatcher: bounded fan-out of source probes for one search.
//!
//! Every adapter gets exactly one slot in the output, in submission order.
//! Each probe runs on its own task under a per-class deadline; a deadline
//! miss or a panic is written into that probe's slot and nothing else.
//! Cancelling the search token stops every in-flight probe and discards the
//! batch.

use crate::config::DispatchConfig;
use crate::errors::{FootprintError, FootprintResult};
use crate::models::{ProbeFailure, Query, SourceResult};
use crate::sources::{ProbeClass, ProbeOptions, SourceAdapter};
use crate::ui::ProbeEvent;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// A panicking probe is caught as a JoinError; with panic=abort it would take
// the whole process down instead.
#[cfg(not(panic = "unwind"))]
compile_error!("footprint requires panic = \"unwind\" to isolate failing probes");

/// One adapter paired with the query it should answer
pub struct Probe {
    pub query: Arc<Query>,
    pub adapter: Arc<dyn SourceAdapter>,
}

impl Probe {
    pub fn new(query: Arc<Query>, adapter: Arc<dyn SourceAdapter>) -> Self {
        Self { query, adapter }
    }
}

pub struct ProbeDispatcher {
    config: DispatchConfig,
    cancel: CancellationToken,
    events: Option<mpsc::Sender<ProbeEvent>>,
}

impl ProbeDispatcher {
    pub fn new(config: DispatchConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            cancel,
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::Sender<ProbeEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn timeout_for(&self, class: ProbeClass) -> Duration {
        match class {
            ProbeClass::Presence => self.config.presence_timeout,
            ProbeClass::Api => self.config.api_timeout,
            ProbeClass::DeepScan => self.config.deep_scan_timeout,
        }
    }

    fn emit(&self, event: ProbeEvent) {
        if let Some(events) = &self.events {
            // Progress is best-effort; a full or closed channel is ignored
            let _ = events.try_send(event);
        }
    }

    /// Run every adapter once against `query`.
    ///
    /// Returns one result per adapter in submission order, or
    /// `FootprintError::Cancelled` if the search token fires first.
    pub async fn dispatch(
        &self,
        query: &Query,
        adapters: Vec<Arc<dyn SourceAdapter>>,
    ) -> FootprintResult<Vec<SourceResult>> {
        let query = Arc::new(query.clone());
        let probes = adapters
            .into_iter()
            .map(|adapter| Probe::new(Arc::clone(&query), adapter))
            .collect();
        self.dispatch_probes(probes).await
    }

    /// Like `dispatch`, but each probe carries its own query
    pub async fn dispatch_probes(&self, probes: Vec<Probe>) -> FootprintResult<Vec<SourceResult>> {
        let total = probes.len();
        let limit = self.config.max_concurrency.max(1);
        log::info!("Dispatching {} probes (max {} in flight)", total, limit);
        self.emit(ProbeEvent::BatchStarted { total });

        let started = Instant::now();
        let batch = stream::iter(probes)
            .map(|probe| self.run_probe(probe))
            .buffered(limit)
            .collect::<Vec<SourceResult>>();

        let results = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                log::warn!("Search cancelled; discarding in-flight probes");
                return Err(FootprintError::Cancelled);
            }
            results = batch => results,
        };

        self.emit(ProbeEvent::BatchFinished);
        log::info!(
            "Batch complete in {:.2}s: {}/{} sources reported a finding",
            started.elapsed().as_secs_f64(),
            results.iter().filter(|r| r.found).count(),
            total
        );
        Ok(results)
    }

    async fn run_probe(&self, probe: Probe) -> SourceResult {
        let Probe { query, adapter } = probe;
        let source = adapter.source_id().to_string();
        let deadline = self.timeout_for(adapter.class());
        let options = ProbeOptions { timeout: deadline };
        let token = self.cancel.child_token();

        self.emit(ProbeEvent::ProbeStarted {
            source: source.clone(),
        });
        let started = Instant::now();

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => None,
                outcome = tokio::time::timeout(deadline, adapter.probe(&query, &options)) => Some(outcome),
            }
        });

        let result = match task.await {
            Ok(Some(Ok(result))) => result,
            Ok(Some(Err(_elapsed))) => {
                log::warn!("{} timed out after {:?}", source, deadline);
                SourceResult::failure(&source, ProbeFailure::Timeout)
            }
            Ok(None) => SourceResult::failure(&source, ProbeFailure::Transport("cancelled".into())),
            Err(e) => {
                log::warn!("{} probe task failed: {}", source, e);
                SourceResult::failure(&source, ProbeFailure::Transport(format!("probe aborted: {}", e)))
            }
        };

        log::debug!(
            "{} finished in {:?}: found={} {}",
            source,
            started.elapsed(),
            result.found,
            result.failure_kind().unwrap_or("")
        );
        self.emit(ProbeEvent::ProbeFinished {
            source,
            found: result.found,
            failure: result.failure_kind().map(str::to_string),
            elapsed: started.elapsed(),
        });
        result
    }
}
