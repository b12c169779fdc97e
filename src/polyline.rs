// src/polyline.rs
//
// Encoded polyline codec (the standard signed-varint delta encoding:
// 5-bit groups, continuation bit 0x20, zig-zag sign, scale 1e5).
//
// Decoding is deliberately lossy on malformed input: a truncated varint at
// the end of the string yields whatever prefix decoded cleanly, flagged via
// `truncated`, instead of an error. Downstream stages still validate that
// enough points survived.

use crate::types::Coordinate;

const PRECISION: f64 = 1e5;

#[derive(Debug, Clone)]
pub struct DecodedPolyline {
    pub points: Vec<Coordinate>,
    /// True when the input ended mid-varint (or contained an out-of-range
    /// byte) and only a prefix was recovered.
    pub truncated: bool,
}

/// Decode one zig-zag signed varint starting at `pos`. Returns the delta
/// and the position after it, or None when the string ends before the
/// varint terminates.
fn decode_varint(bytes: &[u8], mut pos: usize) -> Option<(i64, usize)> {
    let mut result: i64 = 0;
    let mut shift = 0u32;
    loop {
        let &b = bytes.get(pos)?;
        if b < 63 {
            // Out of the printable encoding range; treat like truncation.
            return None;
        }
        // A well-formed delta fits in 64 bits; a run of continuation bytes
        // that would shift past that is garbage, not a longer number.
        if shift > 63 {
            return None;
        }
        let value = (b - 63) as i64;
        result |= (value & 0x1f) << shift;
        pos += 1;
        if value & 0x20 == 0 {
            break;
        }
        shift += 5;
    }
    let delta = if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    };
    Some((delta, pos))
}

/// Decode an encoded polyline into (lat, lng) pairs.
pub fn decode(encoded: &str) -> DecodedPolyline {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut truncated = false;

    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        let (d_lat, next) = match decode_varint(bytes, pos) {
            Some(v) => v,
            None => {
                truncated = true;
                break;
            }
        };
        let (d_lng, next) = match decode_varint(bytes, next) {
            Some(v) => v,
            None => {
                // Dangling latitude with no longitude; drop it.
                truncated = true;
                break;
            }
        };
        lat += d_lat;
        lng += d_lng;
        points.push(Coordinate::new(
            lat as f64 / PRECISION,
            lng as f64 / PRECISION,
        ));
        pos = next;
    }

    DecodedPolyline { points, truncated }
}

fn encode_value(delta: i64, out: &mut String) {
    // Zig-zag, then emit 5-bit groups low-to-high with the continuation bit.
    let mut v = if delta < 0 {
        !((delta as u64) << 1)
    } else {
        (delta as u64) << 1
    };
    while v >= 0x20 {
        out.push((((v & 0x1f) | 0x20) as u8 + 63) as char);
        v >>= 5;
    }
    out.push((v as u8 + 63) as char);
}

/// Encode a coordinate sequence with the standard polyline algorithm.
/// Used by tests and demo tooling; the pipeline itself only decodes.
pub fn encode(points: &[Coordinate]) -> String {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;
    for p in points {
        let lat = (p.lat * PRECISION).round() as i64;
        let lng = (p.lng * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }
    out
}
