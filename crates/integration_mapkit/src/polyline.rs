//! Encoded polyline codec
//!
//! Implements the widely used polyline format: every coordinate is scaled
//! by 1e5 and rounded, each value is stored as the signed delta to the
//! previous one, zig-zag folded, split into 5-bit chunks (low chunk first,
//! `0x20` marking continuation) and offset by 63 into printable ASCII.
//! Values are emitted as (lat, lng) pairs. Encoding is lossy: precision is
//! limited to 1e-5 degrees.

use thiserror::Error;

use crate::coordinate::Coordinate;

const PRECISION: f64 = 1e5;
const CHUNK_BITS: u32 = 5;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION: i64 = 0x20;
const ASCII_OFFSET: u8 = 63;
/// Largest scaled magnitude whose deltas still decode within 12 chunks
const MAX_SCALED: i64 = i64::MAX >> 6;

/// Errors from [`decode_polyline`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolylineError {
    /// A byte outside the `'?'..='~'` range
    #[error("invalid polyline character at byte {index}")]
    InvalidCharacter {
        /// Byte offset of the offending character
        index: usize,
    },

    /// Input ended inside a value or after a latitude without longitude
    #[error("polyline ends in the middle of a value")]
    Truncated,

    /// A value needs more bits than fit in an `i64`
    #[error("polyline value at byte {index} overflows")]
    Overflow {
        /// Byte offset where the value started
        index: usize,
    },
}

/// Encode coordinates into a polyline string
///
/// Scaled values saturate at `±MAX_SCALED` units, so out-of-range and
/// infinite coordinates encode as the nearest representable value. NaN
/// encodes as zero.
#[must_use]
pub fn encode_polyline(coordinates: &[Coordinate]) -> String {
    let mut encoded = String::with_capacity(coordinates.len() * 8);
    let (mut prev_lat, mut prev_lng) = (0i64, 0i64);

    for coordinate in coordinates {
        let lat = scale(coordinate.lat);
        let lng = scale(coordinate.lng);
        push_value(lat - prev_lat, &mut encoded);
        push_value(lng - prev_lng, &mut encoded);
        prev_lat = lat;
        prev_lng = lng;
    }

    encoded
}

/// Decode a polyline string back into coordinates
///
/// # Errors
///
/// Returns a [`PolylineError`] if the input is not a well-formed polyline.
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let (mut lat, mut lng) = (0i64, 0i64);
    let mut coordinates = Vec::new();

    while index < bytes.len() {
        lat = lat.wrapping_add(next_value(bytes, &mut index)?);
        lng = lng.wrapping_add(next_value(bytes, &mut index)?);
        coordinates.push(Coordinate::new(unscale(lat), unscale(lng)));
    }

    Ok(coordinates)
}

#[allow(clippy::cast_possible_truncation)] // saturating cast, NaN maps to 0
fn scale(degrees: f64) -> i64 {
    ((degrees * PRECISION).round() as i64).clamp(-MAX_SCALED, MAX_SCALED)
}

#[allow(clippy::cast_precision_loss)] // scaled degrees stay far below 2^52
fn unscale(value: i64) -> f64 {
    value as f64 / PRECISION
}

fn push_value(delta: i64, out: &mut String) {
    let mut folded = if delta < 0 { !(delta << 1) } else { delta << 1 };

    while folded >= CONTINUATION {
        out.push(to_char((folded & CHUNK_MASK) | CONTINUATION));
        folded >>= CHUNK_BITS;
    }
    out.push(to_char(folded));
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // chunk is always in 0..64
fn to_char(chunk: i64) -> char {
    char::from(ASCII_OFFSET + chunk as u8)
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let start = *index;
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::Truncated);
        };
        if !(ASCII_OFFSET..=ASCII_OFFSET + 63).contains(&byte) {
            return Err(PolylineError::InvalidCharacter { index: *index });
        }
        if shift >= i64::BITS - CHUNK_BITS {
            return Err(PolylineError::Overflow { index: start });
        }

        let chunk = i64::from(byte - ASCII_OFFSET);
        *index += 1;
        result |= (chunk & CHUNK_MASK) << shift;
        shift += CHUNK_BITS;

        if chunk < CONTINUATION {
            break;
        }
    }

    Ok(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coords(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points
            .iter()
            .map(|&(lat, lng)| Coordinate::new(lat, lng))
            .collect()
    }

    #[test]
    fn test_encode_reference_line() {
        let line = coords(&[(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)]);
        assert_eq!(encode_polyline(&line), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode_polyline(&[]), "");
    }

    #[test]
    fn test_encode_origin_point() {
        assert_eq!(encode_polyline(&coords(&[(0.0, 0.0)])), "??");
    }

    #[test]
    fn test_encode_rounds_to_five_decimals() {
        let precise = coords(&[(50.450_004, 30.520_004)]);
        let rounded = coords(&[(50.45, 30.52)]);
        assert_eq!(encode_polyline(&precise), encode_polyline(&rounded));
    }

    #[test]
    fn test_decode_reference_line() {
        let decoded = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        let expected = coords(&[(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)]);
        assert_eq!(decoded.len(), expected.len());
        for (got, want) in decoded.iter().zip(&expected) {
            assert!((got.lat - want.lat).abs() < 1e-9);
            assert!((got.lng - want.lng).abs() < 1e-9);
        }
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_polyline("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_invalid_character() {
        assert_eq!(
            decode_polyline("_p~iF ps|U"),
            Err(PolylineError::InvalidCharacter { index: 5 })
        );
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        // latitude only
        assert_eq!(decode_polyline("_p~iF"), Err(PolylineError::Truncated));
        // value cut inside a continuation chunk
        assert_eq!(decode_polyline("_p~"), Err(PolylineError::Truncated));
    }

    #[test]
    fn test_decode_rejects_overlong_value() {
        let overlong = "~".repeat(20);
        assert_eq!(
            decode_polyline(&overlong),
            Err(PolylineError::Overflow { index: 0 })
        );
    }

    #[test]
    fn test_encode_saturates_out_of_range_values() {
        let huge = encode_polyline(&coords(&[(1e14, 0.0)]));
        let infinite = encode_polyline(&coords(&[(f64::INFINITY, 0.0)]));
        assert_eq!(huge, infinite);

        let decoded = decode_polyline(&huge).unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(decoded[0].lat > 1e12);
        assert!(decoded[0].lng.abs() < f64::EPSILON);
    }

    #[test]
    fn test_encode_extremes_in_sequence() {
        let line = coords(&[(f64::MAX, f64::MIN), (f64::MIN, f64::MAX), (f64::NAN, 0.0)]);
        let decoded = decode_polyline(&encode_polyline(&line)).unwrap();
        assert_eq!(decoded.len(), 3);
        assert!(decoded[0].lat > 0.0 && decoded[0].lng < 0.0);
        assert!(decoded[1].lat < 0.0 && decoded[1].lng > 0.0);
        assert!(decoded[2].lat.abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn any_f64_encodes_to_decodable_ascii(
            points in prop::collection::vec((any::<f64>(), any::<f64>()), 0..16)
        ) {
            let encoded = encode_polyline(&coords(&points));
            prop_assert!(encoded.bytes().all(|b| (63..=126).contains(&b)));
            prop_assert_eq!(decode_polyline(&encoded).unwrap().len(), points.len());
        }

        #[test]
        fn round_trip_within_precision(
            points in prop::collection::vec((-90.0f64..=90.0, -180.0f64..=180.0), 1..64)
        ) {
            let line = coords(&points);
            let decoded = decode_polyline(&encode_polyline(&line)).unwrap();

            prop_assert_eq!(decoded.len(), line.len());
            for (got, want) in decoded.iter().zip(&line) {
                prop_assert!((got.lat - want.lat).abs() <= 1e-5);
                prop_assert!((got.lng - want.lng).abs() <= 1e-5);
            }
        }

        #[test]
        fn encoding_is_printable_ascii(
            points in prop::collection::vec((-90.0f64..=90.0, -180.0f64..=180.0), 0..32)
        ) {
            let encoded = encode_polyline(&coords(&points));
            prop_assert!(encoded.bytes().all(|b| (63..=126).contains(&b)));
        }
    }
}
