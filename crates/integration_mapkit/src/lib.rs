//! Map Kit directions client
//!
//! Async client for the Huawei Map Kit route planning web service
//! (`/mapApi/v1/routeService/`), with request rate limiting, API key
//! signing, a `User-Agent` decorating transport, gzip-aware response
//! handling and an encoded polyline codec for route geometry.
//!
//! # Architecture
//!
//! [`MapKitClient`] owns the request pipeline and is built through
//! [`MapKitClientBuilder`] from a [`MapKitConfig`]. Route planning lives
//! behind the [`DirectionsApi`] trait. The HTTP layer is pluggable through
//! [`HttpSender`], and per-request metrics through [`MetricsReporter`].
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_mapkit::{
//!     Coordinate, DirectionsApi, DirectionsRequest, MapKitClient, MapKitConfig, RouteService,
//! };
//!
//! let client = MapKitClient::new(MapKitConfig::with_api_key("my-key"))?;
//!
//! let request = DirectionsRequest::new(
//!     Coordinate::new(50.4501, 30.5234), // Kyiv
//!     Coordinate::new(49.8397, 24.0297), // Lviv
//! )
//! .with_route_service(RouteService::Driving);
//!
//! for route in client.directions(&request).await? {
//!     for path in &route.paths {
//!         println!("{} -> {}", path.distance_text, path.overview_polyline());
//!     }
//! }
//! ```

mod client;
mod config;
mod coordinate;
mod directions;
mod error;
mod metrics;
mod models;
mod polyline;
mod rate_limit;
mod signer;
mod transport;

pub use client::{ApiConfig, Call, DIRECTIONS_API, MapKitClient, MapKitClientBuilder};
pub use crate::config::{ENV_PREFIX, MapKitConfig};
pub use coordinate::{Coordinate, InvalidCoordinate, parse_coordinate};
pub use directions::{Avoid, DirectionsApi, DirectionsRequest, RouteService, TrafficMode};
pub use error::{ErrorKind, MapKitError, ValidationError};
pub use crate::metrics::{
    MetricsFacadeReporter, MetricsReporter, NoOpReporter, RequestMetrics, RequestOutcome,
};
pub use models::{
    Action, CommonResponse, CoordinateBounds, DirectionsResponse, Path, ReturnCode, ReturnDesc,
    Route, Step,
};
pub use polyline::{PolylineError, decode_polyline, encode_polyline};
pub use rate_limit::RateLimiter;
pub use signer::{API_KEY_PARAM, ApiKeySigner, sign_with_api_key};
pub use tokio_util::sync::CancellationToken;
pub use transport::{HttpSender, UserAgentTransport};
