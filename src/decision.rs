// src/decision.rs
//
// Stage 4: comparative route selection. Operates over the full batch of
// scored routes: prefer the best Safe route, then the best Moderate, then
// the least-risky Risky route with an explicit warning. Selection is
// stable: equal scores keep submission order.

use crate::error::PipelineError;
use crate::types::{DecisionResult, RouteAnalysis, RouteComparison, SafetyCategory};
use tracing::info;

/// Duration overshoot (vs the fastest candidate) worth calling out when a
/// Safe route is chosen.
const SLOW_SAFE_TRADEOFF: f64 = 1.30;

/// A Moderate route this much faster than the chosen one gets a mention.
const FASTER_MODERATE_TRADEOFF: f64 = 0.90;

fn comparison_table(analyses: &[RouteAnalysis]) -> Vec<RouteComparison> {
    analyses
        .iter()
        .map(|a| RouteComparison {
            route_id: a.route.id.clone(),
            distance_m: a.route.distance_m,
            duration_s: a.route.duration_s,
            score: a.scoring.score,
            category: a.scoring.category,
        })
        .collect()
}

/// Highest score wins; ties keep the earlier submission. Returns an index
/// into `analyses`.
fn best_in_category(analyses: &[RouteAnalysis], category: SafetyCategory) -> Option<usize> {
    analyses
        .iter()
        .enumerate()
        .filter(|(_, a)| a.scoring.category == category)
        .max_by(|(i, a), (j, b)| {
            a.scoring
                .score
                .cmp(&b.scoring.score)
                // On equal scores prefer the earlier candidate.
                .then(j.cmp(i))
        })
        .map(|(i, _)| i)
}

fn minutes(duration_s: f64) -> f64 {
    duration_s / 60.0
}

/// Select the recommended route from a batch of fully-analyzed candidates.
/// The comparison table always lists every candidate in submission order.
pub fn decide(analyses: &[RouteAnalysis]) -> Result<DecisionResult, PipelineError> {
    if analyses.is_empty() {
        return Err(PipelineError::NoRoutesProvided);
    }

    let comparison = comparison_table(analyses);
    let fastest_s = analyses
        .iter()
        .map(|a| a.route.duration_s)
        .fold(f64::INFINITY, f64::min);

    let (selected, justification) = if let Some(idx) =
        best_in_category(analyses, SafetyCategory::Safe)
    {
        let chosen = &analyses[idx];
        let mut text = format!(
            "Route {} is recommended: safest option with a score of {}/100.",
            chosen.route.id, chosen.scoring.score
        );
        if chosen.route.duration_s > fastest_s * SLOW_SAFE_TRADEOFF {
            text.push_str(&format!(
                " Note: it takes {:.0} min versus {:.0} min for the fastest alternative; \
                 the extra time buys a safer route.",
                minutes(chosen.route.duration_s),
                minutes(fastest_s)
            ));
        }
        (idx, text)
    } else if let Some(idx) = best_in_category(analyses, SafetyCategory::Moderate) {
        let chosen = &analyses[idx];
        let mut text = format!(
            "Route {} is recommended with a score of {}/100. No firmly safe route was \
             found among the candidates; this is the best moderate option.",
            chosen.route.id, chosen.scoring.score
        );

        let faster_moderate = analyses.iter().any(|a| {
            a.scoring.category == SafetyCategory::Moderate
                && a.route.id != chosen.route.id
                && a.route.duration_s < chosen.route.duration_s * FASTER_MODERATE_TRADEOFF
        });
        if faster_moderate {
            text.push_str(
                " A materially faster moderate route was passed over in favor of safety.",
            );
        }
        (idx, text)
    } else {
        // Only risky candidates remain.
        let idx = best_in_category(analyses, SafetyCategory::Risky)
            .unwrap_or(0);
        let chosen = &analyses[idx];
        let mut text = format!(
            "Warning: all candidate routes carry elevated risk. Route {} is the least \
             risky available with a score of {}/100.",
            chosen.route.id, chosen.scoring.score
        );

        let concerns: Vec<&str> = chosen
            .scoring
            .reasons
            .iter()
            .take(2)
            .map(|r| r.as_str())
            .collect();
        if !concerns.is_empty() {
            text.push_str(&format!(" Key concerns: {}.", concerns.join("; ")));
        }
        (idx, text)
    };

    let chosen = &analyses[selected];
    info!(
        route_id = %chosen.route.id,
        score = chosen.scoring.score,
        category = %chosen.scoring.category,
        candidates = analyses.len(),
        "route selected"
    );

    Ok(DecisionResult {
        selected_index: chosen.index,
        selected_route_id: chosen.route.id.clone(),
        justification,
        comparison,
    })
}
