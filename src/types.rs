// src/types.rs
//
// Shared schema for the route safety pipeline. Every stage imports these
// types instead of redefining its own views; downstream stages consume
// them read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// ROUTE INPUT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelTime {
    Day,
    Night,
}

impl TravelTime {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelTime::Day => "day",
            TravelTime::Night => "night",
        }
    }

    pub fn is_night(&self) -> bool {
        matches!(self, TravelTime::Night)
    }
}

/// A candidate route as supplied by the external directions provider.
/// Immutable once submitted to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub encoded_polyline: String,
    /// Total distance in meters.
    pub distance_m: f64,
    /// Total duration in seconds.
    pub duration_s: f64,
    pub travel_time: TravelTime,
    pub city: String,
}

// ============================================================================
// SEGMENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    Highway,
    MainRoad,
    Residential,
    Unknown,
}

impl SegmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentType::Highway => "highway",
            SegmentType::MainRoad => "main_road",
            SegmentType::Residential => "residential",
            SegmentType::Unknown => "unknown",
        }
    }
}

/// A bounded sub-span of a route's polyline. Generated fresh per analysis,
/// never persisted or mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: u32,
    pub start: Coordinate,
    pub end: Coordinate,
    /// Great-circle distance between start and end, meters.
    pub distance_m: f64,
    /// Duration apportioned from the route total by distance share, seconds.
    pub duration_s: f64,
    /// Implied speed in km/h.
    pub speed_kmh: f64,
    pub segment_type: SegmentType,
    /// Number of decoded polyline points this segment spans (inclusive).
    pub point_count: usize,
    pub tags: Vec<SegmentTag>,
}

impl Segment {
    pub fn has_tag(&self, tag: SegmentTag) -> bool {
        self.tags.contains(&tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentTag {
    Long,
    HighSpeed,
    ComplexRouting,
    StraightPath,
}

impl SegmentTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentTag::Long => "long",
            SegmentTag::HighSpeed => "high-speed",
            SegmentTag::ComplexRouting => "complex-routing",
            SegmentTag::StraightPath => "straight-path",
        }
    }
}

// ============================================================================
// STRUCTURAL RISK SIGNALS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalType {
    IsolatedSegment,
    HighSpeedArea,
    ComplexIntersection,
    /// Not emitted by the structural extractor; reserved for hosts that
    /// attach their own visibility observations.
    LowVisibilityZone,
    NightTravel,
    LongDuration,
    UrbanDenseArea,
    /// Not emitted by the structural extractor; reserved for hosts that
    /// track which areas a rider knows.
    UnfamiliarArea,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::IsolatedSegment => "isolated-segment",
            SignalType::HighSpeedArea => "high-speed-area",
            SignalType::ComplexIntersection => "complex-intersection",
            SignalType::LowVisibilityZone => "low-visibility-zone",
            SignalType::NightTravel => "night-travel",
            SignalType::LongDuration => "long-duration",
            SignalType::UrbanDenseArea => "urban-dense-area",
            SignalType::UnfamiliarArea => "unfamiliar-area",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// A risk observation derived purely from route geometry/metadata.
/// `affected_segments` only ever references segment ids produced in the
/// same analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSignal {
    pub signal_type: SignalType,
    pub severity: Severity,
    pub affected_segments: Vec<u32>,
    pub description: String,
}

/// Segmenter output for one route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralAnalysis {
    pub segments: Vec<Segment>,
    pub signals: Vec<RiskSignal>,
    /// Decoded polyline point count (after any truncation recovery).
    pub point_count: usize,
    /// True when the encoded polyline was truncated and only a prefix decoded.
    pub polyline_truncated: bool,
}

impl StructuralAnalysis {
    pub fn has_signal(&self, signal_type: SignalType) -> bool {
        self.signals.iter().any(|s| s.signal_type == signal_type)
    }

    pub fn count_signal(&self, signal_type: SignalType) -> usize {
        self.signals
            .iter()
            .filter(|s| s.signal_type == signal_type)
            .count()
    }

    pub fn has_highway_segment(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s.segment_type == SegmentType::Highway)
    }
}

// ============================================================================
// INTELLIGENCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskFactorType {
    Crime,
    Infrastructure,
    Traffic,
    Environment,
    Social,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    Government,
    News,
    Municipal,
    Crowdsourced,
}

/// One risk factor from the external intelligence report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    #[serde(rename = "type")]
    pub factor_type: RiskFactorType,
    pub description: String,
    pub confidence: Confidence,
    pub source_category: SourceCategory,
}

/// The four boolean flags the scorer consumes, flattened from the
/// intelligence report. Derived once per route per analysis, never cached
/// across requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceFlags {
    pub crime_mention: bool,
    pub lighting_issue: bool,
    pub women_safety_concern: bool,
    pub police_advisory: bool,
    pub explanations: Vec<String>,
    /// True when the deterministic fallback produced these flags.
    pub from_fallback: bool,
}

// ============================================================================
// SCORING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyCategory {
    Safe,
    Moderate,
    Risky,
}

impl SafetyCategory {
    /// Risky <= 30 < Moderate <= 70 < Safe. Single monotonic mapping.
    pub fn from_score(score: u8) -> Self {
        if score <= 30 {
            SafetyCategory::Risky
        } else if score <= 70 {
            SafetyCategory::Moderate
        } else {
            SafetyCategory::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyCategory::Safe => "Safe",
            SafetyCategory::Moderate => "Moderate",
            SafetyCategory::Risky => "Risky",
        }
    }

    /// Ordering by riskiness: Safe < Moderate < Risky.
    pub fn risk_rank(&self) -> u8 {
        match self {
            SafetyCategory::Safe => 0,
            SafetyCategory::Moderate => 1,
            SafetyCategory::Risky => 2,
        }
    }
}

impl std::fmt::Display for SafetyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of the penalty/bonus breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyBreakdown {
    pub cause: String,
    /// Negative for penalties, positive for bonuses.
    pub delta: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    pub route_id: String,
    /// Clamped to [0, 100].
    pub score: u8,
    pub category: SafetyCategory,
    /// One human-readable reason per triggered penalty/bonus, in evaluation
    /// order, each naming the numeric delta for auditability.
    pub reasons: Vec<String>,
    pub total_penalty: i32,
    pub breakdown: Vec<PenaltyBreakdown>,
    pub scored_at: DateTime<Utc>,
}

// ============================================================================
// DECISION
// ============================================================================

/// One row of the comparison table. The table always lists every candidate
/// in original input order, regardless of which was selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteComparison {
    pub route_id: String,
    pub distance_m: f64,
    pub duration_s: f64,
    pub score: u8,
    pub category: SafetyCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResult {
    /// Index into the original candidate list.
    pub selected_index: usize,
    pub selected_route_id: String,
    pub justification: String,
    pub comparison: Vec<RouteComparison>,
}

// ============================================================================
// PER-ROUTE PIPELINE OUTPUT
// ============================================================================

/// Fully-formed result of the three per-route stages. The decision stage
/// only ever sees these, never partial results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteAnalysis {
    pub route: Route,
    /// Position in the submitted batch.
    pub index: usize,
    pub structural: StructuralAnalysis,
    pub intelligence: IntelligenceFlags,
    pub scoring: ScoringResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_thresholds() {
        assert_eq!(SafetyCategory::from_score(0), SafetyCategory::Risky);
        assert_eq!(SafetyCategory::from_score(30), SafetyCategory::Risky);
        assert_eq!(SafetyCategory::from_score(31), SafetyCategory::Moderate);
        assert_eq!(SafetyCategory::from_score(70), SafetyCategory::Moderate);
        assert_eq!(SafetyCategory::from_score(71), SafetyCategory::Safe);
        assert_eq!(SafetyCategory::from_score(100), SafetyCategory::Safe);
    }

    #[test]
    fn test_category_monotonic() {
        // Higher score is never riskier.
        let mut prev = SafetyCategory::from_score(0).risk_rank();
        for score in 1..=100u8 {
            let rank = SafetyCategory::from_score(score).risk_rank();
            assert!(rank <= prev, "inversion at score {}", score);
            prev = rank;
        }
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(30.33, 76.38).is_valid());
        assert!(!Coordinate::new(f64::NAN, 76.38).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
    }
}
