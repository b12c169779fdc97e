// src/segmenter.rs
//
// Stage 1: structural route decomposition. Decodes the polyline, cuts it
// into ~500 m segments, classifies each by implied speed, and derives the
// structural risk signals the later stages consume. Pure transform, no
// external calls.

use crate::error::PipelineError;
use crate::polyline;
use crate::types::{
    Coordinate, RiskSignal, Route, Segment, SegmentTag, SegmentType, Severity, SignalType,
    StructuralAnalysis,
};
use tracing::{debug, warn};

// ============================================================================
// TUNING CONSTANTS
// ============================================================================

/// Target chunk size for segmentation, meters.
const TARGET_SEGMENT_M: f64 = 500.0;

/// Speed thresholds for type classification, km/h. Deliberate heuristics,
/// not measured from map data.
const HIGHWAY_SPEED_KMH: f64 = 70.0;
const MAIN_ROAD_SPEED_KMH: f64 = 40.0;

/// Tag thresholds.
const LONG_SEGMENT_M: f64 = 1000.0;
const COMPLEX_POINTS_PER_100M: f64 = 5.0;
const STRAIGHT_MAX_POINTS: usize = 5;
const STRAIGHT_MIN_DISTANCE_M: f64 = 300.0;

/// Route-level long-duration thresholds, seconds.
const LONG_DURATION_S: f64 = 2400.0;
const VERY_LONG_DURATION_S: f64 = 4800.0;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points, meters.
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * h.sqrt().asin() * EARTH_RADIUS_M
}

// ============================================================================
// VALIDATION
// ============================================================================

fn validate_route(route: &Route) -> Result<(), PipelineError> {
    let invalid = |reason: &str| PipelineError::InvalidRoute {
        route_id: route.id.clone(),
        reason: reason.to_string(),
    };

    if route.id.is_empty() {
        return Err(invalid("empty route id"));
    }
    if !route.origin.is_valid() || !route.destination.is_valid() {
        return Err(invalid("origin/destination coordinates out of range"));
    }
    if route.encoded_polyline.is_empty() {
        return Err(invalid("empty encoded polyline"));
    }
    if !(route.distance_m.is_finite() && route.distance_m > 0.0) {
        return Err(invalid("non-positive total distance"));
    }
    if !(route.duration_s.is_finite() && route.duration_s > 0.0) {
        return Err(invalid("non-positive total duration"));
    }
    Ok(())
}

// ============================================================================
// SEGMENTATION
// ============================================================================

fn classify_speed(speed_kmh: f64) -> SegmentType {
    if speed_kmh > HIGHWAY_SPEED_KMH {
        SegmentType::Highway
    } else if speed_kmh > MAIN_ROAD_SPEED_KMH {
        SegmentType::MainRoad
    } else if speed_kmh > 0.0 {
        SegmentType::Residential
    } else {
        SegmentType::Unknown
    }
}

fn derive_tags(distance_m: f64, speed_kmh: f64, point_count: usize) -> Vec<SegmentTag> {
    let mut tags = Vec::new();
    if distance_m > LONG_SEGMENT_M {
        tags.push(SegmentTag::Long);
    }
    if speed_kmh > HIGHWAY_SPEED_KMH {
        tags.push(SegmentTag::HighSpeed);
    }
    if distance_m > 0.0 {
        let points_per_100m = point_count as f64 / (distance_m / 100.0);
        if points_per_100m > COMPLEX_POINTS_PER_100M {
            tags.push(SegmentTag::ComplexRouting);
        }
    }
    if point_count < STRAIGHT_MAX_POINTS && distance_m > STRAIGHT_MIN_DISTANCE_M {
        tags.push(SegmentTag::StraightPath);
    }
    tags
}

fn build_segments(route: &Route, points: &[Coordinate]) -> Vec<Segment> {
    let last = points.len() - 1;

    // Segment count derives from total distance, not point density.
    let segment_count = ((route.distance_m / TARGET_SEGMENT_M).ceil() as usize).max(1);
    let stride = (points.len() / segment_count).max(2);

    // First pass: geometry per span, so duration can be apportioned by
    // distance share.
    let mut spans = Vec::new();
    let mut i = 0;
    while i < last {
        let end_idx = (i + stride).min(last);
        spans.push((i, end_idx));
        i = end_idx;
    }

    let total_span_m: f64 = spans
        .iter()
        .map(|&(s, e)| haversine_m(points[s], points[e]))
        .sum();

    let mut segments = Vec::with_capacity(spans.len());
    for (id, &(start_idx, end_idx)) in spans.iter().enumerate() {
        let start = points[start_idx];
        let end = points[end_idx];
        let distance_m = haversine_m(start, end);

        let share = if total_span_m > 0.0 {
            distance_m / total_span_m
        } else {
            1.0 / spans.len() as f64
        };
        let duration_s = route.duration_s * share;

        let speed_kmh = if duration_s > 0.0 {
            distance_m / duration_s * 3.6
        } else {
            0.0
        };

        let point_count = end_idx - start_idx + 1;
        segments.push(Segment {
            id: id as u32,
            start,
            end,
            distance_m,
            duration_s,
            speed_kmh,
            segment_type: classify_speed(speed_kmh),
            point_count,
            tags: derive_tags(distance_m, speed_kmh, point_count),
        });
    }
    segments
}

// ============================================================================
// STRUCTURAL SIGNALS
// ============================================================================

fn derive_signals(route: &Route, segments: &[Segment]) -> Vec<RiskSignal> {
    let mut signals = Vec::new();

    for seg in segments {
        let is_isolated = seg.segment_type == SegmentType::Highway
            && seg.has_tag(SegmentTag::Long)
            && seg.has_tag(SegmentTag::StraightPath);
        if is_isolated {
            signals.push(RiskSignal {
                signal_type: SignalType::IsolatedSegment,
                severity: Severity::High,
                affected_segments: vec![seg.id],
                description: format!(
                    "Long straight highway stretch (~{:.0} m) with little around it",
                    seg.distance_m
                ),
            });
        }

        if seg.has_tag(SegmentTag::HighSpeed) {
            signals.push(RiskSignal {
                signal_type: SignalType::HighSpeedArea,
                severity: Severity::Medium,
                affected_segments: vec![seg.id],
                description: format!("High-speed stretch (~{:.0} km/h implied)", seg.speed_kmh),
            });
        }

        if seg.has_tag(SegmentTag::ComplexRouting) {
            signals.push(RiskSignal {
                signal_type: SignalType::ComplexIntersection,
                severity: Severity::Medium,
                affected_segments: vec![seg.id],
                description: "Dense turn/intersection geometry".to_string(),
            });
        }
    }

    // Urban density: majority of the non-highway segments show complex
    // routing, and the route has no highway segments at all.
    let non_highway: Vec<&Segment> = segments
        .iter()
        .filter(|s| s.segment_type != SegmentType::Highway)
        .collect();
    let has_highway = non_highway.len() != segments.len();
    if !has_highway && !non_highway.is_empty() {
        let complex = non_highway
            .iter()
            .filter(|s| s.has_tag(SegmentTag::ComplexRouting))
            .count();
        if complex * 2 > non_highway.len() {
            signals.push(RiskSignal {
                signal_type: SignalType::UrbanDenseArea,
                severity: Severity::Low,
                affected_segments: non_highway.iter().map(|s| s.id).collect(),
                description: "Dense urban routing throughout; more people and lighting around"
                    .to_string(),
            });
        }
    }

    // Route-level signals keyed off input metadata rather than segment scan.
    if route.travel_time.is_night() {
        signals.push(RiskSignal {
            signal_type: SignalType::NightTravel,
            severity: Severity::Medium,
            affected_segments: segments.iter().map(|s| s.id).collect(),
            description: "Travel during night hours".to_string(),
        });
    }

    if route.duration_s > LONG_DURATION_S {
        let severity = if route.duration_s > VERY_LONG_DURATION_S {
            Severity::Medium
        } else {
            Severity::Low
        };
        signals.push(RiskSignal {
            signal_type: SignalType::LongDuration,
            severity,
            affected_segments: Vec::new(),
            description: format!("Long trip (~{:.0} min total)", route.duration_s / 60.0),
        });
    }

    signals
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Decompose a route into segments and structural risk signals.
pub fn analyze_structure(route: &Route) -> Result<StructuralAnalysis, PipelineError> {
    validate_route(route)?;

    let decoded = polyline::decode(&route.encoded_polyline);
    if decoded.truncated {
        warn!(
            route_id = %route.id,
            points = decoded.points.len(),
            "polyline truncated; proceeding with decoded prefix"
        );
    }
    if decoded.points.len() < 2 {
        return Err(PipelineError::InvalidRoute {
            route_id: route.id.clone(),
            reason: format!(
                "polyline decoded to {} point(s); need at least 2",
                decoded.points.len()
            ),
        });
    }

    let segments = build_segments(route, &decoded.points);
    let signals = derive_signals(route, &segments);

    debug!(
        route_id = %route.id,
        points = decoded.points.len(),
        segments = segments.len(),
        signals = signals.len(),
        "structural analysis complete"
    );

    Ok(StructuralAnalysis {
        point_count: decoded.points.len(),
        polyline_truncated: decoded.truncated,
        segments,
        signals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polyline::encode;
    use crate::types::TravelTime;

    fn grid_points(n: usize, step_deg: f64) -> Vec<Coordinate> {
        // Straight line of n points heading north from Patiala.
        (0..n)
            .map(|i| Coordinate::new(30.3398 + i as f64 * step_deg, 76.3869))
            .collect()
    }

    fn test_route(points: &[Coordinate], distance_m: f64, duration_s: f64) -> Route {
        Route {
            id: "r1".to_string(),
            origin: points[0],
            destination: *points.last().unwrap(),
            encoded_polyline: encode(points),
            distance_m,
            duration_s,
            travel_time: TravelTime::Day,
            city: "Patiala".to_string(),
        }
    }

    #[test]
    fn test_segments_partition_point_sequence() {
        let points = grid_points(40, 0.001);
        let route = test_route(&points, 4300.0, 600.0);
        let analysis = analyze_structure(&route).unwrap();

        assert!(!analysis.segments.is_empty());
        assert_eq!(analysis.segments[0].start, points[0]);
        assert_eq!(
            analysis.segments.last().unwrap().end,
            *points.last().unwrap()
        );
        // No gaps, no overlap: each segment starts where the previous ended.
        for pair in analysis.segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_segment_count_derives_from_distance() {
        let points = grid_points(100, 0.0005);
        // 5.2 km at 500 m chunks -> 11 target segments.
        let route = test_route(&points, 5200.0, 900.0);
        let analysis = analyze_structure(&route).unwrap();
        // Stride of floor(100/11)=9 over 99 gaps -> 11 segments.
        assert_eq!(analysis.segments.len(), 11);
    }

    #[test]
    fn test_speed_classification() {
        assert_eq!(classify_speed(80.0), SegmentType::Highway);
        assert_eq!(classify_speed(70.0), SegmentType::MainRoad);
        assert_eq!(classify_speed(41.0), SegmentType::MainRoad);
        assert_eq!(classify_speed(25.0), SegmentType::Residential);
        assert_eq!(classify_speed(0.0), SegmentType::Unknown);
    }

    #[test]
    fn test_night_route_gets_night_signal() {
        let points = grid_points(20, 0.001);
        let mut route = test_route(&points, 2100.0, 300.0);
        route.travel_time = TravelTime::Night;
        let analysis = analyze_structure(&route).unwrap();
        assert!(analysis.has_signal(SignalType::NightTravel));

        route.travel_time = TravelTime::Day;
        let analysis = analyze_structure(&route).unwrap();
        assert!(!analysis.has_signal(SignalType::NightTravel));
    }

    #[test]
    fn test_long_duration_signal() {
        let points = grid_points(20, 0.001);
        let route = test_route(&points, 2100.0, 3000.0);
        let analysis = analyze_structure(&route).unwrap();
        assert!(analysis.has_signal(SignalType::LongDuration));
    }

    #[test]
    fn test_high_speed_segment_signal() {
        // 2 km in 60 s -> ~120 km/h implied.
        let points = grid_points(10, 0.002);
        let route = test_route(&points, 2000.0, 60.0);
        let analysis = analyze_structure(&route).unwrap();
        assert!(analysis.has_signal(SignalType::HighSpeedArea));
        assert!(analysis.has_highway_segment());
    }

    #[test]
    fn test_signal_segment_refs_are_valid() {
        let points = grid_points(60, 0.0015);
        let mut route = test_route(&points, 9000.0, 400.0);
        route.travel_time = TravelTime::Night;
        let analysis = analyze_structure(&route).unwrap();

        let max_id = analysis.segments.iter().map(|s| s.id).max().unwrap();
        for signal in &analysis.signals {
            for &seg_id in &signal.affected_segments {
                assert!(seg_id <= max_id, "{:?} references unknown segment", signal);
            }
        }
    }

    #[test]
    fn test_rejects_degenerate_routes() {
        let points = grid_points(5, 0.001);
        let mut route = test_route(&points, 500.0, 60.0);
        route.encoded_polyline = String::new();
        assert!(analyze_structure(&route).is_err());

        let mut route = test_route(&points, 500.0, 60.0);
        route.distance_m = 0.0;
        assert!(analyze_structure(&route).is_err());

        let mut route = test_route(&points, 500.0, 60.0);
        route.origin = Coordinate::new(f64::NAN, 0.0);
        assert!(analyze_structure(&route).is_err());
    }

    #[test]
    fn test_single_point_polyline_rejected() {
        let points = grid_points(5, 0.001);
        let mut route = test_route(&points, 500.0, 60.0);
        route.encoded_polyline = encode(&[Coordinate::new(30.0, 76.0)]);
        assert!(analyze_structure(&route).is_err());
    }

    #[test]
    fn test_haversine_known_distance() {
        // Roughly 1 degree of latitude, ~111.2 km.
        let d = haversine_m(Coordinate::new(30.0, 76.0), Coordinate::new(31.0, 76.0));
        assert!((d - 111_195.0).abs() < 200.0, "got {}", d);
    }
}
