//! Latitude/longitude pairs
//!
//! The text form is `"lat,lng"`; on the wire a coordinate is a JSON object
//! with `lng` and `lat` members.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees
    pub lng: f64,
    /// Latitude in degrees
    pub lat: f64,
}

/// Error returned when text is not a `"lat,lng"` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCoordinate;

impl fmt::Display for InvalidCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid coordinate: expected two comma-separated numbers as 'lat,lng'"
        )
    }
}

impl std::error::Error for InvalidCoordinate {}

impl Coordinate {
    /// Create a coordinate from latitude and longitude (in that order)
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lng, lat }
    }

    /// Parse `"lat,lng"`, returning `None` for anything else
    ///
    /// Exactly two finite numeric fields are accepted; surrounding
    /// whitespace around each field is ignored.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut fields = text.split(',');
        let lat = parse_field(fields.next()?)?;
        let lng = parse_field(fields.next()?)?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self::new(lat, lng))
    }
}

fn parse_field(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse `"lat,lng"` text into a coordinate
///
/// Any parse failure yields `None`; deciding whether a missing coordinate
/// is an error is left to the caller.
#[must_use]
pub fn parse_coordinate(text: &str) -> Option<Coordinate> {
    Coordinate::parse(text)
}

impl FromStr for Coordinate {
    type Err = InvalidCoordinate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(InvalidCoordinate)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}
