//! Route planning
//!
//! [`DirectionsRequest`] is validated locally, then POSTed to
//! `/mapApi/v1/routeService/<service>`. Failed status envelopes become
//! [`MapKitError::ApiStatus`]; `ZERO_RESULTS` is an empty success.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::client::{Call, DIRECTIONS_API, MapKitClient};
use crate::coordinate::Coordinate;
use crate::error::{MapKitError, ValidationError};
use crate::models::{DirectionsResponse, Route};

/// Travel mode, selecting the route service path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteService {
    /// Car routes
    Driving,
    /// Pedestrian routes
    Walking,
    /// Bicycle routes
    Bicycling,
}

impl RouteService {
    /// Path segment appended to the route service endpoint
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Bicycling => "bicycling",
        }
    }
}

impl fmt::Display for RouteService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteService {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "driving" => Ok(Self::Driving),
            "walking" => Ok(Self::Walking),
            "bicycling" => Ok(Self::Bicycling),
            other => Err(ValidationError::UnknownRouteService(other.to_string())),
        }
    }
}

/// Traffic prediction model for travel time estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrafficMode {
    /// Historical average
    #[default]
    BestGuess,
    /// Traffic worse than the historical average
    Pessimistic,
    /// Traffic better than the historical average
    Optimistic,
}

impl TrafficMode {
    /// Wire value
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::BestGuess => 0,
            Self::Pessimistic => 1,
            Self::Optimistic => 2,
        }
    }

    #[allow(clippy::trivially_copy_pass_by_ref)] // signature required by serde
    const fn is_best_guess(&self) -> bool {
        matches!(self, Self::BestGuess)
    }
}

impl Serialize for TrafficMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl FromStr for TrafficMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best_guess" => Ok(Self::BestGuess),
            "pessimistic" => Ok(Self::Pessimistic),
            "optimistic" => Ok(Self::Optimistic),
            other => Err(ValidationError::UnknownTrafficMode(other.to_string())),
        }
    }
}

/// Road features a route should avoid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Avoid {
    /// Toll roads
    Tolls,
    /// Expressways
    Highways,
}

impl Avoid {
    /// Wire value
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Tolls => 1,
            Self::Highways => 2,
        }
    }
}

impl Serialize for Avoid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl FromStr for Avoid {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tolls" => Ok(Self::Tolls),
            "highways" => Ok(Self::Highways),
            other => Err(ValidationError::UnknownAvoid(other.to_string())),
        }
    }
}

/// Parameters of a directions call
///
/// Only `origin` and `destination` are required; everything else is left
/// out of the request body while it holds its default.
#[allow(clippy::struct_excessive_bools)] // mirrors the service's boolean switches
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionsRequest {
    /// Start of the route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Coordinate>,

    /// End of the route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Coordinate>,

    /// Intermediate stops, in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<Coordinate>,

    /// Let the service reorder waypoints
    #[serde(skip_serializing_if = "is_false")]
    pub optimize: bool,

    /// Traffic prediction model
    #[serde(skip_serializing_if = "TrafficMode::is_best_guess")]
    pub traffic_mode: TrafficMode,

    /// Treat waypoints as pass-through points rather than stopovers
    #[serde(skip_serializing_if = "is_false")]
    pub via_type: bool,

    /// Ask for alternative routes; not available together with waypoints
    #[serde(skip_serializing_if = "is_false")]
    pub alternatives: bool,

    /// Road features to avoid
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub avoid: BTreeSet<Avoid>,

    /// Departure time in seconds since the Unix epoch, now or later
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depart_at: Option<u64>,

    /// Language for distance and duration texts (`zh_CN` or `en`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Travel mode; the bare endpoint is used when unset
    #[serde(skip)]
    pub route_service: Option<RouteService>,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // signature required by serde
const fn is_false(value: &bool) -> bool {
    !*value
}

impl DirectionsRequest {
    /// Request a route between two points
    #[must_use]
    pub fn new(origin: Coordinate, destination: Coordinate) -> Self {
        Self {
            origin: Some(origin),
            destination: Some(destination),
            ..Default::default()
        }
    }

    /// Set the travel mode
    #[must_use]
    pub const fn with_route_service(mut self, route_service: RouteService) -> Self {
        self.route_service = Some(route_service);
        self
    }

    /// Add a waypoint after the existing ones
    #[must_use]
    pub fn with_waypoint(mut self, waypoint: Coordinate) -> Self {
        self.waypoints.push(waypoint);
        self
    }

    /// Ask for alternative routes
    #[must_use]
    pub const fn with_alternatives(mut self, alternatives: bool) -> Self {
        self.alternatives = alternatives;
        self
    }

    /// Set the traffic prediction model
    #[must_use]
    pub const fn with_traffic_mode(mut self, traffic_mode: TrafficMode) -> Self {
        self.traffic_mode = traffic_mode;
        self
    }

    /// Avoid a road feature
    #[must_use]
    pub fn with_avoid(mut self, avoid: Avoid) -> Self {
        self.avoid.insert(avoid);
        self
    }

    /// Set the departure time (seconds since the Unix epoch)
    #[must_use]
    pub const fn with_depart_at(mut self, depart_at: u64) -> Self {
        self.depart_at = Some(depart_at);
        self
    }

    /// Set the response language
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Check the request before anything is sent
    ///
    /// # Errors
    ///
    /// Returns the first problem found: missing origin, missing
    /// destination, or alternatives combined with waypoints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.origin.is_none() {
            return Err(ValidationError::MissingOrigin);
        }
        if self.destination.is_none() {
            return Err(ValidationError::MissingDestination);
        }
        if self.alternatives && !self.waypoints.is_empty() {
            return Err(ValidationError::AlternativesWithWaypoints);
        }
        Ok(())
    }

    /// Endpoint path suffix for this request
    #[must_use]
    pub fn path_suffix(&self) -> &'static str {
        self.route_service.map_or("", RouteService::as_str)
    }
}

/// Route planning operations
#[async_trait]
pub trait DirectionsApi: Send + Sync {
    /// Plan routes, giving up when `cancel` fires
    async fn directions_with_cancellation(
        &self,
        request: &DirectionsRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Route>, MapKitError>;

    /// Plan routes
    async fn directions(&self, request: &DirectionsRequest) -> Result<Vec<Route>, MapKitError> {
        self.directions_with_cancellation(request, &CancellationToken::new())
            .await
    }
}

#[async_trait]
impl DirectionsApi for MapKitClient {
    #[instrument(skip_all, fields(route_service = request.path_suffix()))]
    async fn directions_with_cancellation(
        &self,
        request: &DirectionsRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Route>, MapKitError> {
        request.validate()?;

        let call = Call::new("directions", &DIRECTIONS_API).with_suffix(request.path_suffix());
        let response: DirectionsResponse = self.post_json(call, request, cancel).await?;
        response.status.status_error("directions")?;

        debug!(count = response.routes.len(), "Routes found");
        Ok(response.routes)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::MapKitConfig;
    use crate::transport::MockHttpSender;

    fn kyiv() -> Coordinate {
        Coordinate::new(50.45, 30.52)
    }

    fn lviv() -> Coordinate {
        Coordinate::new(49.84, 24.03)
    }

    fn offline_client() -> MapKitClient {
        let mut sender = MockHttpSender::new();
        sender.expect_send().never();
        MapKitClient::builder(MapKitConfig::with_api_key("abc"))
            .with_sender(sender)
            .build()
            .unwrap()
    }

    #[test]
    fn test_route_service_from_str() {
        assert_eq!("driving".parse::<RouteService>(), Ok(RouteService::Driving));
        assert_eq!("walking".parse::<RouteService>(), Ok(RouteService::Walking));
        assert_eq!("bicycling".parse::<RouteService>(), Ok(RouteService::Bicycling));

        let err = "flying".parse::<RouteService>().unwrap_err();
        assert_eq!(err.to_string(), "unknown route service: 'flying'");
    }

    #[test]
    fn test_traffic_mode_and_avoid_from_str() {
        assert_eq!("best_guess".parse::<TrafficMode>(), Ok(TrafficMode::BestGuess));
        assert_eq!("pessimistic".parse::<TrafficMode>(), Ok(TrafficMode::Pessimistic));
        assert_eq!("optimistic".parse::<TrafficMode>(), Ok(TrafficMode::Optimistic));
        assert!("worst".parse::<TrafficMode>().is_err());

        assert_eq!("tolls".parse::<Avoid>(), Ok(Avoid::Tolls));
        assert_eq!("highways".parse::<Avoid>(), Ok(Avoid::Highways));
        assert_eq!(
            "ferries".parse::<Avoid>(),
            Err(ValidationError::UnknownAvoid("ferries".to_string()))
        );
    }

    #[test]
    fn test_minimal_request_body() {
        let body = serde_json::to_value(DirectionsRequest::new(kyiv(), lviv())).unwrap();
        assert_eq!(
            body,
            json!({
                "origin": {"lng": 30.52, "lat": 50.45},
                "destination": {"lng": 24.03, "lat": 49.84},
            })
        );
    }

    #[test]
    fn test_full_request_body() {
        let request = DirectionsRequest::new(kyiv(), lviv())
            .with_route_service(RouteService::Walking)
            .with_waypoint(Coordinate::new(50.0, 28.0))
            .with_traffic_mode(TrafficMode::Optimistic)
            .with_avoid(Avoid::Highways)
            .with_avoid(Avoid::Tolls)
            .with_depart_at(1_700_000_000)
            .with_language("en");

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["waypoints"], json!([{"lng": 28.0, "lat": 50.0}]));
        assert_eq!(body["trafficMode"], 2);
        assert_eq!(body["avoid"], json!([1, 2]));
        assert_eq!(body["departAt"], 1_700_000_000u64);
        assert_eq!(body["language"], "en");
        assert!(body.get("routeService").is_none());
        assert!(body.get("alternatives").is_none());
        assert_eq!(request.path_suffix(), "walking");
    }

    #[test]
    fn test_path_suffix_empty_without_route_service() {
        assert_eq!(DirectionsRequest::new(kyiv(), lviv()).path_suffix(), "");
    }

    #[test]
    fn test_validate() {
        assert!(DirectionsRequest::new(kyiv(), lviv()).validate().is_ok());

        let missing_origin = DirectionsRequest {
            origin: None,
            ..DirectionsRequest::new(kyiv(), lviv())
        };
        assert_eq!(
            missing_origin.validate(),
            Err(ValidationError::MissingOrigin)
        );

        assert_eq!(
            DirectionsRequest::default().validate(),
            Err(ValidationError::MissingOrigin)
        );

        let missing_destination = DirectionsRequest {
            destination: None,
            ..DirectionsRequest::new(kyiv(), lviv())
        };
        assert_eq!(
            missing_destination.validate(),
            Err(ValidationError::MissingDestination)
        );

        let conflicting = DirectionsRequest::new(kyiv(), lviv())
            .with_waypoint(Coordinate::new(50.0, 28.0))
            .with_alternatives(true);
        assert_eq!(
            conflicting.validate(),
            Err(ValidationError::AlternativesWithWaypoints)
        );
    }

    #[tokio::test]
    async fn test_missing_origin_fails_before_network() {
        let client = offline_client();
        let request = DirectionsRequest {
            destination: Some(lviv()),
            ..Default::default()
        };

        let err = client.directions(&request).await.unwrap_err();
        assert!(matches!(
            err,
            MapKitError::Validation(ValidationError::MissingOrigin)
        ));
        assert_eq!(err.to_string(), "map-kit: origin missing");
    }

    #[tokio::test]
    async fn test_missing_destination_fails_before_network() {
        let client = offline_client();
        let request = DirectionsRequest {
            origin: Some(kyiv()),
            ..Default::default()
        };

        let err = client.directions(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "map-kit: destination missing");
    }

    #[tokio::test]
    async fn test_cancelled_directions_never_sends() {
        let client = offline_client();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client
            .directions_with_cancellation(&DirectionsRequest::new(kyiv(), lviv()), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, MapKitError::Cancelled { .. }));
    }
}
