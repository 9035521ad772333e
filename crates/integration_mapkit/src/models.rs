//! Directions response models
//!
//! Typed representations of the route graph returned by the Map Kit
//! directions endpoint: routes, paths, steps and their polyline geometry,
//! plus the `returnCode` / `returnDesc` status envelope shared by every
//! Map Kit response.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;
use crate::error::MapKitError;
use crate::polyline::encode_polyline;

/// `returnCode` field of a Map Kit response envelope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReturnCode(Cow<'static, str>);

impl ReturnCode {
    /// Success
    pub const OK: Self = Self(Cow::Borrowed("0"));
    /// The requested URL is incorrect
    pub const REQUESTED_URL_INCORRECT: Self = Self(Cow::Borrowed("5"));
    /// Invalid API key or token
    pub const INVALID_API: Self = Self(Cow::Borrowed("6"));
    /// The authentication service is abnormal
    pub const INVALID_AUTH: Self = Self(Cow::Borrowed("010001"));
    /// The API call is not authorized for this key
    pub const UNAUTHORIZED_API_CALL: Self = Self(Cow::Borrowed("010003"));
    /// Authentication failed
    pub const AUTHENTICATION_FAILED: Self = Self(Cow::Borrowed("010005"));
    /// The API call quota is used up
    pub const API_CALL_QUOTA_USED_UP: Self = Self(Cow::Borrowed("010006"));
    /// Route data does not exist
    pub const ROUTE_DATA_DOES_NOT_EXIST: Self = Self(Cow::Borrowed("010008"));
    /// Invalid parameter
    pub const INVALID_REQUEST: Self = Self(Cow::Borrowed("010010"));
    /// Straight-line distance between origin and destination is too large
    pub const DISTANCE_EXCEEDS_LIMIT: Self = Self(Cow::Borrowed("010020"));
    /// Internal service error
    pub const INTERNAL_SERVICE_ERROR: Self = Self(Cow::Borrowed("110"));

    /// Raw code as sent by the service
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable meaning of well-known codes
    #[must_use]
    pub fn description(&self) -> Option<&'static str> {
        let text = match self.as_str() {
            "0" => "success",
            "5" => "the requested URL is incorrect",
            "6" => "invalid API key or token",
            "010001" => "the authentication service is abnormal",
            "010003" => "unauthorized API call",
            "010005" => "authentication failed",
            "010006" => "API call quota used up",
            "010008" => "route data does not exist",
            "010010" => "invalid parameter",
            "010020" => "distance between origin and destination exceeds the limit",
            "110" => "internal service error",
            _ => return None,
        };
        Some(text)
    }
}

impl From<&str> for ReturnCode {
    fn from(code: &str) -> Self {
        Self(Cow::Owned(code.to_string()))
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(text) if *self != Self::OK => write!(f, "{} ({text})", self.0),
            _ => write!(f, "{}", self.0),
        }
    }
}

/// `returnDesc` field of a Map Kit response envelope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReturnDesc(Cow<'static, str>);

impl ReturnDesc {
    /// Request succeeded
    pub const OK: Self = Self(Cow::Borrowed("OK"));
    /// Request parameters are invalid
    pub const INVALID_REQUEST: Self = Self(Cow::Borrowed("INVALID_REQUEST"));
    /// Unknown server-side failure
    pub const UNKNOWN_ERROR: Self = Self(Cow::Borrowed("UNKNOWN_ERROR"));
    /// Nothing found
    pub const NOT_FOUND: Self = Self(Cow::Borrowed("NOT_FOUND"));
    /// Request succeeded but produced no routes
    pub const ZERO_RESULTS: Self = Self(Cow::Borrowed("ZERO_RESULTS"));
    /// Request rejected
    pub const REQUEST_DENIED: Self = Self(Cow::Borrowed("REQUEST_DENIED"));
    /// Quota or rate limit exceeded
    pub const OVER_QUERY_LIMIT: Self = Self(Cow::Borrowed("OVER_QUERY_LIMIT"));

    /// Raw description as sent by the service
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ReturnDesc {
    fn from(desc: &str) -> Self {
        Self(Cow::Owned(desc.to_string()))
    }
}

impl fmt::Display for ReturnDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status envelope carried by every Map Kit response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonResponse {
    /// Result code, `"0"` on success, empty when absent
    #[serde(default)]
    pub return_code: ReturnCode,
    /// Result description
    #[serde(default)]
    pub return_desc: ReturnDesc,
}

impl CommonResponse {
    /// Whether the envelope reports success
    ///
    /// `ZERO_RESULTS` counts as success even though no routes are returned.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.return_code == ReturnCode::OK || self.return_desc == ReturnDesc::ZERO_RESULTS
    }

    /// Convert a failing envelope into an API status error
    ///
    /// # Errors
    ///
    /// Returns [`MapKitError::ApiStatus`] unless [`Self::is_success`] holds.
    pub fn status_error(&self, context: &'static str) -> Result<(), MapKitError> {
        if self.is_success() {
            return Ok(());
        }
        Err(MapKitError::ApiStatus {
            context,
            return_code: self.return_code.clone(),
            return_desc: self.return_desc.clone(),
        })
    }
}

/// Decoded body of a directions call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsResponse {
    /// Status envelope
    #[serde(flatten)]
    pub status: CommonResponse,
    /// Planned routes, empty under `ZERO_RESULTS`
    #[serde(default)]
    pub routes: Vec<Route>,
}

/// A planned route
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    /// Paths making up the route, one per leg between waypoints
    pub paths: Vec<Path>,
    /// Bounding box of the route
    pub bounds: CoordinateBounds,
}

/// Rectangular bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateBounds {
    /// South-west corner
    pub southwest: Coordinate,
    /// North-east corner
    pub northeast: Coordinate,
}

impl CoordinateBounds {
    /// Whether `coordinate` lies inside the box (edges included)
    #[must_use]
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (self.southwest.lat..=self.northeast.lat).contains(&coordinate.lat)
            && (self.southwest.lng..=self.northeast.lng).contains(&coordinate.lng)
    }
}

/// A path between two consecutive stops of a route
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Path {
    /// Travel time in seconds
    pub duration: f64,
    /// Travel time as display text
    pub duration_text: String,
    /// Travel time in seconds considering traffic
    pub duration_in_traffic: f64,
    /// Travel time considering traffic as display text
    pub duration_in_traffic_text: String,
    /// Distance in meters
    pub distance: f64,
    /// Distance as display text
    pub distance_text: String,
    /// Start location
    pub start_location: Coordinate,
    /// Start address
    pub start_address: String,
    /// End location
    pub end_location: Coordinate,
    /// End address
    pub end_address: String,
    /// Turn-by-turn steps
    pub steps: Vec<Step>,
}

impl Path {
    /// All step polylines concatenated in order
    ///
    /// Points shared by consecutive steps are kept twice.
    #[must_use]
    pub fn overview(&self) -> Vec<Coordinate> {
        self.steps
            .iter()
            .flat_map(|step| step.polyline.iter().copied())
            .collect()
    }

    /// [`Self::overview`] as an encoded polyline string
    #[must_use]
    pub fn overview_polyline(&self) -> String {
        encode_polyline(&self.overview())
    }
}

/// A single maneuver of a path
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Step {
    /// Travel time in seconds
    pub duration: f64,
    /// Travel time as display text
    pub duration_text: String,
    /// Distance in meters
    pub distance: f64,
    /// Distance as display text
    pub distance_text: String,
    /// Heading at the start of the step, in degrees
    pub orientation: i64,
    /// Navigation instruction
    pub instruction: String,
    /// Maneuver to perform
    pub action: Action,
    /// Road the step follows
    pub road_name: String,
    /// Start location
    pub start_location: Coordinate,
    /// End location
    pub end_location: Coordinate,
    /// Step geometry
    pub polyline: Vec<Coordinate>,
}

/// Maneuver action of a [`Step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Arrive at the destination
    End,
    /// Keep left at a fork
    ForkLeft,
    /// Keep right at a fork
    ForkRight,
    /// Take the ramp on the right
    RampRight,
    /// Take the ramp on the left
    RampLeft,
    /// Roundabout, exit right
    RoundaboutRight,
    /// Roundabout, exit left
    RoundaboutLeft,
    /// Go straight
    Straight,
    /// Turn left
    TurnLeft,
    /// Turn right
    TurnRight,
    /// Turn slightly left
    TurnSlightLeft,
    /// Turn slightly right
    TurnSlightRight,
    /// Action not known to this client
    #[default]
    #[serde(other)]
    Unknown,
}
