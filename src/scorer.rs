// src/scorer.rs
//
// Stage 3: weighted rule-based scoring. Pure function of the structural
// signals and intelligence flags: base 100, one configured penalty/bonus
// per triggered condition, clamp to [0, 100]. Referentially transparent,
// no I/O, no hidden state.

use crate::types::{
    IntelligenceFlags, PenaltyBreakdown, SafetyCategory, ScoringResult, SegmentType, SignalType,
    StructuralAnalysis, TravelTime,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Complex-intersection count above which the penalty applies.
const COMPLEX_INTERSECTION_LIMIT: usize = 3;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Single table of condition weights. Magnitudes are positive; the scorer
/// subtracts penalties and adds bonuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub night_travel: i32,
    pub isolated_segment: i32,
    pub high_speed_segment: i32,
    pub complex_intersections: i32,
    pub crime_mention: i32,
    pub lighting_issue: i32,
    pub women_safety_concern: i32,
    pub police_advisory: i32,
    /// Partial offset when an urban-dense-area signal is present at night.
    pub urban_density_night_bonus: i32,
    /// Calibration boost for majority-residential routes scoring below
    /// `calibration_cutoff`.
    pub urban_calibration_boost: i32,
    pub calibration_cutoff: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            night_travel: 15,
            isolated_segment: 10,
            high_speed_segment: 6,
            complex_intersections: 8,
            crime_mention: 18,
            lighting_issue: 8,
            women_safety_concern: 12,
            police_advisory: 10,
            urban_density_night_bonus: 6,
            urban_calibration_boost: 10,
            calibration_cutoff: 65,
        }
    }
}

/// Monotonic score-to-category mapping: risky <= risky_max < moderate <=
/// moderate_max < safe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryThresholds {
    pub risky_max: u8,
    pub moderate_max: u8,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            risky_max: 30,
            moderate_max: 70,
        }
    }
}

impl CategoryThresholds {
    pub fn is_valid(&self) -> bool {
        self.risky_max < self.moderate_max && self.moderate_max < 100
    }

    pub fn categorize(&self, score: u8) -> SafetyCategory {
        if score <= self.risky_max {
            SafetyCategory::Risky
        } else if score <= self.moderate_max {
            SafetyCategory::Moderate
        } else {
            SafetyCategory::Safe
        }
    }
}

// ============================================================================
// SCORING
// ============================================================================

fn majority_residential(structural: &StructuralAnalysis) -> bool {
    if structural.segments.is_empty() {
        return false;
    }
    let residential = structural
        .segments
        .iter()
        .filter(|s| s.segment_type == SegmentType::Residential)
        .count();
    residential * 2 > structural.segments.len()
}

/// Score one route. Conditions are presence-based: each triggers its flat
/// weight once, in a fixed evaluation order mirrored by the reasons list.
pub fn score_route(
    route_id: &str,
    travel_time: TravelTime,
    structural: &StructuralAnalysis,
    intelligence: &IntelligenceFlags,
    weights: &ScoringWeights,
    thresholds: &CategoryThresholds,
) -> ScoringResult {
    let mut score: i32 = 100;
    let mut reasons = Vec::new();
    let mut breakdown = Vec::new();

    let mut apply = |score: &mut i32, cause: &str, delta: i32| {
        *score += delta;
        reasons.push(format!("{} ({:+})", cause, delta));
        breakdown.push(PenaltyBreakdown {
            cause: cause.to_string(),
            delta,
        });
    };

    // Structural penalties.
    if travel_time.is_night() {
        apply(&mut score, "Travel during night hours", -weights.night_travel);
    }
    if structural.has_signal(SignalType::IsolatedSegment) {
        apply(
            &mut score,
            "Route passes through isolated stretches",
            -weights.isolated_segment,
        );
    }
    if structural.has_signal(SignalType::HighSpeedArea) {
        apply(
            &mut score,
            "High-speed road sections on the route",
            -weights.high_speed_segment,
        );
    }
    let complex = structural.count_signal(SignalType::ComplexIntersection);
    if complex > COMPLEX_INTERSECTION_LIMIT {
        apply(
            &mut score,
            "Many complex intersections to navigate",
            -weights.complex_intersections,
        );
    }

    // Intelligence penalties.
    if intelligence.crime_mention {
        apply(
            &mut score,
            "Public reports mention crime along this route",
            -weights.crime_mention,
        );
    }
    if intelligence.lighting_issue {
        apply(
            &mut score,
            "Street lighting concerns reported",
            -weights.lighting_issue,
        );
    }
    if intelligence.women_safety_concern {
        apply(
            &mut score,
            "Women-safety concerns reported in the area",
            -weights.women_safety_concern,
        );
    }
    if intelligence.police_advisory {
        apply(
            &mut score,
            "Active police advisory for the area",
            -weights.police_advisory,
        );
    }

    // Bonuses. Urban density only offsets at night, when the presence of
    // people and lighting actually matters.
    if travel_time.is_night() && structural.has_signal(SignalType::UrbanDenseArea) {
        apply(
            &mut score,
            "Busy urban surroundings offset some night risk",
            weights.urban_density_night_bonus,
        );
    }
    if score < weights.calibration_cutoff && majority_residential(structural) {
        apply(
            &mut score,
            "Mostly residential streets; calibration boost",
            weights.urban_calibration_boost,
        );
    }

    let clamped = score.clamp(0, 100) as u8;
    ScoringResult {
        route_id: route_id.to_string(),
        score: clamped,
        category: thresholds.categorize(clamped),
        reasons,
        total_penalty: score - 100,
        breakdown,
        scored_at: Utc::now(),
    }
}
