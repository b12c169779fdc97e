// src/intelligence.rs
//
// Stage 2: external intelligence enrichment. Builds the analyst prompt,
// parses the service's JSON report into typed risk factors, and flattens
// them into the four boolean flags the scorer consumes. Every failure mode
// short of a missing credential degrades to a deterministic fallback built
// only from locally-known structural signals.

use crate::error::IntelligenceError;
use crate::llm_client::TextCompletion;
use crate::types::{
    IntelligenceFlags, RiskFactor, RiskFactorType, Route, SignalType, SourceCategory,
    StructuralAnalysis,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

// ============================================================================
// REPORT SCHEMA (strict; any deviation falls back)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IntelligenceReport {
    pub route_summary: String,
    pub risk_factors: Vec<RiskFactor>,
    pub overall_context: String,
    pub sources_referenced: Vec<SourceCategory>,
}

// ============================================================================
// PROMPT
// ============================================================================

fn summarize_segments(structural: &StructuralAnalysis) -> String {
    structural
        .segments
        .iter()
        .map(|s| {
            let tags: Vec<&str> = s.tags.iter().map(|t| t.as_str()).collect();
            format!(
                "  - segment {}: {} / {:.0} m / tags: [{}]",
                s.id,
                s.segment_type.as_str(),
                s.distance_m,
                tags.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn summarize_signals(structural: &StructuralAnalysis) -> String {
    structural
        .signals
        .iter()
        .map(|s| format!("  - {} ({})", s.signal_type.as_str(), s.severity.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Natural-language prompt for the safety-intelligence analyst role. The
/// instructions restrict the model to publicly aggregated sources and
/// forbid fabricated incident counts or personal data references.
pub fn build_prompt(route: &Route, structural: &StructuralAnalysis) -> String {
    format!(
        "You are a public-safety intelligence analyst for a ride-safety \
         navigation service. Assess the driving route described below using \
         only publicly aggregated sources: crime-trend dashboards, municipal \
         infrastructure reports, traffic-accident statistics, and news \
         coverage. Do NOT fabricate specific incident counts, dates, or any \
         reference to identifiable people. If you have no reliable public \
         context for this area, return an empty risk_factors list.\n\
         \n\
         City: {city}\n\
         Travel time: {travel_time}\n\
         Route segments:\n{segments}\n\
         Structural risk signals:\n{signals}\n\
         \n\
         Respond with a single strict JSON object, no prose and no markdown, \
         with exactly these fields:\n\
         {{\n\
           \"route_summary\": string,\n\
           \"risk_factors\": [\n\
             {{\n\
               \"type\": \"crime\" | \"infrastructure\" | \"traffic\" | \"environment\" | \"social\",\n\
               \"description\": string,\n\
               \"confidence\": \"low\" | \"medium\" | \"high\",\n\
               \"source_category\": \"government\" | \"news\" | \"municipal\" | \"crowdsourced\"\n\
             }}\n\
           ],\n\
           \"overall_context\": string,\n\
           \"sources_referenced\": [\"government\" | \"news\" | \"municipal\" | \"crowdsourced\"]\n\
         }}",
        city = route.city,
        travel_time = route.travel_time.as_str(),
        segments = summarize_segments(structural),
        signals = summarize_signals(structural),
    )
}

// ============================================================================
// PARSING
// ============================================================================

/// Strip a markdown code fence wrapper (``` or ```json) if present.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_report(raw: &str) -> Result<IntelligenceReport, IntelligenceError> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(cleaned)
        .map_err(|e| IntelligenceError::MalformedResponse(e.to_string()))
}

// ============================================================================
// FLATTENING
// ============================================================================

const LIGHTING_KEYWORDS: &[&str] = &["light", "lamp", "dark", "illumin", "visibility"];
const WOMEN_SAFETY_KEYWORDS: &[&str] = &["women", "woman", "harass", "gender", "stalking"];
const ADVISORY_KEYWORDS: &[&str] = &["advisory", "police", "patrol", "curfew", "alert"];

fn matches_any(description: &str, keywords: &[&str]) -> bool {
    let lower = description.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// Flatten the typed risk-factor list into the four booleans. This discards
/// confidence and source nuance on purpose: the scorer wants a small,
/// auditable boolean surface.
pub fn flatten_report(report: &IntelligenceReport) -> IntelligenceFlags {
    let mut flags = IntelligenceFlags::default();

    for factor in &report.risk_factors {
        let triggered = match factor.factor_type {
            RiskFactorType::Crime => {
                flags.crime_mention = true;
                true
            }
            RiskFactorType::Infrastructure => {
                if matches_any(&factor.description, LIGHTING_KEYWORDS) {
                    flags.lighting_issue = true;
                    true
                } else {
                    false
                }
            }
            RiskFactorType::Social => {
                flags.women_safety_concern = true;
                true
            }
            RiskFactorType::Traffic | RiskFactorType::Environment => false,
        };

        if matches_any(&factor.description, WOMEN_SAFETY_KEYWORDS) {
            flags.women_safety_concern = true;
        }
        let advisory = factor.source_category == SourceCategory::Government
            || matches_any(&factor.description, ADVISORY_KEYWORDS);
        if advisory {
            flags.police_advisory = true;
        }

        if triggered || advisory {
            flags.explanations.push(factor.description.clone());
        }
    }

    if !report.overall_context.is_empty() {
        flags.explanations.push(report.overall_context.clone());
    }
    flags
}

// ============================================================================
// FALLBACK
// ============================================================================

/// Deterministic minimal flags derived only from inputs already known
/// locally. The system never fabricates safety claims it cannot source, so
/// crime / women-safety / police-advisory default to false here.
pub fn fallback_flags(structural: &StructuralAnalysis) -> IntelligenceFlags {
    let mut flags = IntelligenceFlags {
        from_fallback: true,
        ..Default::default()
    };

    if structural.has_signal(SignalType::NightTravel) {
        flags.lighting_issue = true;
        flags
            .explanations
            .push("Night travel: reduced visibility expected along the route".to_string());
    }

    if structural.has_highway_segment() {
        flags
            .explanations
            .push("Route includes highway segments with higher speed exposure".to_string());
    }

    flags
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Run the enrichment stage for one route. With the fallback enabled (the
/// production setting) this never fails: any recoverable service problem
/// degrades to `fallback_flags`. A missing credential is rejected when the
/// client is constructed, before any route is analyzed.
pub async fn enrich(
    client: &dyn TextCompletion,
    route: &Route,
    structural: &StructuralAnalysis,
    fallback_enabled: bool,
) -> Result<IntelligenceFlags, IntelligenceError> {
    let prompt = build_prompt(route, structural);

    let recover = |e: IntelligenceError| {
        if fallback_enabled && e.is_recoverable() {
            warn!(route_id = %route.id, error = %e, "intelligence unavailable; using fallback");
            Ok(fallback_flags(structural))
        } else {
            Err(e)
        }
    };

    let raw = match client.complete(&prompt).await {
        Ok(raw) => raw,
        Err(e) => return recover(e),
    };

    match parse_report(&raw) {
        Ok(report) => {
            let flags = flatten_report(&report);
            info!(
                route_id = %route.id,
                factors = report.risk_factors.len(),
                crime = flags.crime_mention,
                lighting = flags.lighting_issue,
                "intelligence report flattened"
            );
            Ok(flags)
        }
        Err(e) => {
            debug!(body = %raw, "rejected report body");
            recover(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntelligenceError;
    use crate::polyline::encode;
    use crate::segmenter::analyze_structure;
    use crate::types::{Coordinate, TravelTime};
    use async_trait::async_trait;

    const GOOD_REPORT: &str = r#"{
        "route_summary": "Mostly arterial roads through the city core",
        "risk_factors": [
            {
                "type": "crime",
                "description": "Elevated street crime reported near the market area",
                "confidence": "medium",
                "source_category": "news"
            },
            {
                "type": "infrastructure",
                "description": "Several street lights reported out on the bypass",
                "confidence": "high",
                "source_category": "municipal"
            }
        ],
        "overall_context": "Typical urban corridor",
        "sources_referenced": ["news", "municipal"]
    }"#;

    struct CannedClient(String);

    #[async_trait]
    impl TextCompletion for CannedClient {
        async fn complete(&self, _prompt: &str) -> Result<String, IntelligenceError> {
            Ok(self.0.clone())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl TextCompletion for FailingClient {
        async fn complete(&self, _prompt: &str) -> Result<String, IntelligenceError> {
            Err(IntelligenceError::Service {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    fn night_route() -> Route {
        let points: Vec<Coordinate> = (0..20)
            .map(|i| Coordinate::new(30.3398 + i as f64 * 0.001, 76.3869))
            .collect();
        Route {
            id: "r-night".to_string(),
            origin: points[0],
            destination: *points.last().unwrap(),
            encoded_polyline: encode(&points),
            distance_m: 2100.0,
            duration_s: 420.0,
            travel_time: TravelTime::Night,
            city: "Patiala".to_string(),
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let report = parse_report(GOOD_REPORT).unwrap();
        assert_eq!(report.risk_factors.len(), 2);
        assert_eq!(report.sources_referenced.len(), 2);
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{}\n```", GOOD_REPORT);
        let report = parse_report(&fenced).unwrap();
        assert_eq!(report.risk_factors.len(), 2);

        let bare_fence = format!("```\n{}\n```", GOOD_REPORT);
        assert!(parse_report(&bare_fence).is_ok());
    }

    #[test]
    fn test_parse_rejects_bad_enum() {
        let bad = GOOD_REPORT.replace("\"crime\"", "\"gossip\"");
        assert!(matches!(
            parse_report(&bad),
            Err(IntelligenceError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let bad = GOOD_REPORT.replace("\"overall_context\"", "\"other_context\"");
        assert!(parse_report(&bad).is_err());
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(parse_report("I could not find relevant data.").is_err());
    }

    #[test]
    fn test_flatten_crime_and_lighting() {
        let report = parse_report(GOOD_REPORT).unwrap();
        let flags = flatten_report(&report);
        assert!(flags.crime_mention);
        assert!(flags.lighting_issue);
        assert!(!flags.women_safety_concern);
        assert!(!flags.police_advisory);
        assert!(!flags.from_fallback);
        assert!(!flags.explanations.is_empty());
    }

    #[test]
    fn test_flatten_social_and_government() {
        let raw = r#"{
            "route_summary": "s",
            "risk_factors": [
                {
                    "type": "social",
                    "description": "Reports of harassment near the transit hub",
                    "confidence": "low",
                    "source_category": "crowdsourced"
                },
                {
                    "type": "traffic",
                    "description": "Congestion during evening hours",
                    "confidence": "high",
                    "source_category": "government"
                }
            ],
            "overall_context": "",
            "sources_referenced": ["government"]
        }"#;
        let flags = flatten_report(&parse_report(raw).unwrap());
        assert!(flags.women_safety_concern);
        // Government-sourced factor counts as an advisory.
        assert!(flags.police_advisory);
        assert!(!flags.crime_mention);
        assert!(!flags.lighting_issue);
    }

    #[test]
    fn test_flatten_infrastructure_without_lighting_keyword() {
        let raw = r#"{
            "route_summary": "s",
            "risk_factors": [
                {
                    "type": "infrastructure",
                    "description": "Potholes reported along the service lane",
                    "confidence": "medium",
                    "source_category": "municipal"
                }
            ],
            "overall_context": "",
            "sources_referenced": ["municipal"]
        }"#;
        let flags = flatten_report(&parse_report(raw).unwrap());
        assert!(!flags.lighting_issue);
    }

    #[tokio::test]
    async fn test_enrich_happy_path() {
        let route = night_route();
        let structural = analyze_structure(&route).unwrap();
        let client = CannedClient(GOOD_REPORT.to_string());
        let flags = enrich(&client, &route, &structural, true).await.unwrap();
        assert!(flags.crime_mention);
        assert!(!flags.from_fallback);
    }

    #[tokio::test]
    async fn test_enrich_falls_back_on_service_error() {
        let route = night_route();
        let structural = analyze_structure(&route).unwrap();
        let flags = enrich(&FailingClient, &route, &structural, true)
            .await
            .unwrap();
        assert!(flags.from_fallback);
        // Night signal present -> lighting concern surfaces even offline.
        assert!(flags.lighting_issue);
        assert!(!flags.crime_mention);
        assert!(!flags.women_safety_concern);
        assert!(!flags.police_advisory);
    }

    #[tokio::test]
    async fn test_enrich_falls_back_on_garbage_body() {
        let route = night_route();
        let structural = analyze_structure(&route).unwrap();
        let client = CannedClient("<html>502 Bad Gateway</html>".to_string());
        let flags = enrich(&client, &route, &structural, true).await.unwrap();
        assert!(flags.from_fallback);
    }

    #[tokio::test]
    async fn test_enrich_surfaces_error_when_fallback_disabled() {
        let route = night_route();
        let structural = analyze_structure(&route).unwrap();
        let result = enrich(&FailingClient, &route, &structural, false).await;
        assert!(matches!(result, Err(IntelligenceError::Service { .. })));
    }

    #[test]
    fn test_fallback_day_route_without_highway() {
        let route = Route {
            travel_time: TravelTime::Day,
            ..night_route()
        };
        let structural = analyze_structure(&route).unwrap();
        let flags = fallback_flags(&structural);
        assert!(!flags.lighting_issue);
        assert!(flags.from_fallback);
    }
}
