// src/pipeline/orchestrator.rs
//
// Ties the four stages together. Per route the stages run strictly in
// sequence (each consumes the prior stage's output); across a batch the
// per-route pipelines run concurrently, bounded by the number of
// intelligence calls allowed in flight. The decision stage is a single
// join over the fully-formed per-route results.

use crate::config::PipelineConfig;
use crate::decision;
use crate::error::PipelineError;
use crate::intelligence;
use crate::llm_client::{HttpTextClient, TextCompletion};
use crate::pipeline::metrics::PipelineMetrics;
use crate::scorer;
use crate::segmenter;
use crate::types::{DecisionResult, Route, RouteAnalysis};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// One route that failed input validation (or, with the fallback disabled,
/// enrichment). The rest of the batch still scores.
#[derive(Debug)]
pub struct RouteFailure {
    pub route_id: String,
    pub index: usize,
    pub error: PipelineError,
}

/// Output of a batch run: every fully-analyzed candidate, the decision
/// over them, and any candidates that had to be excluded.
#[derive(Debug)]
pub struct BatchOutcome {
    pub analyses: Vec<RouteAnalysis>,
    pub decision: DecisionResult,
    pub rejected: Vec<RouteFailure>,
}

pub struct SafetyPipeline {
    config: PipelineConfig,
    client: Arc<dyn TextCompletion>,
    metrics: PipelineMetrics,
}

impl SafetyPipeline {
    /// Build the pipeline with the production HTTP client. Fails up front
    /// on configuration problems: a missing credential or inverted
    /// category thresholds cannot be worked around at analysis time.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let client = HttpTextClient::new(
            &config.service_endpoint,
            &config.credential,
            &config.model,
            Duration::from_millis(config.request_timeout_ms),
        )
        .map_err(|e| match e {
            crate::error::IntelligenceError::MissingCredentials => {
                PipelineError::MissingCredentials
            }
            other => PipelineError::Config(other.to_string()),
        })?;

        Self::with_client(config, Arc::new(client))
    }

    /// Build with an injected text-completion client. Used by tests and by
    /// hosts that bring their own transport.
    pub fn with_client(
        config: PipelineConfig,
        client: Arc<dyn TextCompletion>,
    ) -> Result<Self, PipelineError> {
        if !config.thresholds.is_valid() {
            return Err(PipelineError::Config(format!(
                "category thresholds must satisfy risky_max < moderate_max < 100 (got {} / {})",
                config.thresholds.risky_max, config.thresholds.moderate_max
            )));
        }
        if config.max_concurrent_requests == 0 {
            return Err(PipelineError::Config(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            config,
            client,
            metrics: PipelineMetrics::new(),
        })
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Run segment -> intelligence -> score for one route.
    pub async fn analyze_route(
        &self,
        route: &Route,
        index: usize,
    ) -> Result<RouteAnalysis, PipelineError> {
        let structural = segmenter::analyze_structure(route)?;
        if structural.polyline_truncated {
            self.metrics.inc(&self.metrics.polylines_truncated);
        }

        let intelligence = intelligence::enrich(
            self.client.as_ref(),
            route,
            &structural,
            self.config.fallback_enabled,
        )
        .await?;
        if intelligence.from_fallback {
            self.metrics.inc(&self.metrics.intelligence_fallbacks);
        } else {
            self.metrics.inc(&self.metrics.intelligence_reports);
        }

        let scoring = scorer::score_route(
            &route.id,
            route.travel_time,
            &structural,
            &intelligence,
            &self.config.weights,
            &self.config.thresholds,
        );

        info!(
            route_id = %route.id,
            score = scoring.score,
            category = %scoring.category,
            signals = structural.signals.len(),
            "route analyzed"
        );
        self.metrics.inc(&self.metrics.routes_analyzed);

        Ok(RouteAnalysis {
            route: route.clone(),
            index,
            structural,
            intelligence,
            scoring,
        })
    }

    /// Analyze a batch of candidate routes and pick one. Per-route
    /// pipelines run concurrently with at most `max_concurrent_requests`
    /// intelligence calls in flight; the decision waits for all of them.
    /// Dropping the returned future cancels any in-flight service calls,
    /// and partial per-route results are never surfaced.
    pub async fn analyze_batch(&self, routes: &[Route]) -> Result<BatchOutcome, PipelineError> {
        if routes.is_empty() {
            return Err(PipelineError::NoRoutesProvided);
        }
        let batch_start = Instant::now();

        let mut results: Vec<(usize, Result<RouteAnalysis, PipelineError>)> =
            stream::iter(routes.iter().enumerate().map(|(index, route)| async move {
                (index, self.analyze_route(route, index).await)
            }))
            .buffer_unordered(self.config.max_concurrent_requests)
            .collect()
            .await;

        // The decision stage and the comparison table preserve submission
        // order regardless of completion order.
        results.sort_by_key(|(index, _)| *index);

        let mut analyses = Vec::new();
        let mut rejected = Vec::new();
        for (index, result) in results {
            match result {
                Ok(analysis) => analyses.push(analysis),
                Err(error) => {
                    warn!(index, error = %error, "route excluded from decision");
                    self.metrics.inc(&self.metrics.routes_rejected);
                    rejected.push(RouteFailure {
                        route_id: routes[index].id.clone(),
                        index,
                        error,
                    });
                }
            }
        }

        if analyses.is_empty() {
            // Every candidate failed; surface the first cause.
            return Err(rejected
                .into_iter()
                .next()
                .map(|f| f.error)
                .unwrap_or(PipelineError::NoRoutesProvided));
        }

        let decision = decision::decide(&analyses)?;
        self.metrics.inc(&self.metrics.decisions_made);
        self.metrics.set_timing(
            &self.metrics.batch_time_us,
            batch_start.elapsed().as_micros() as u64,
        );

        Ok(BatchOutcome {
            analyses,
            decision,
            rejected,
        })
    }
}
