//! Map Kit error types

use thiserror::Error;

use crate::models::{ReturnCode, ReturnDesc};

/// Request validation failures, raised before any network activity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The request has no origin
    #[error("origin missing")]
    MissingOrigin,

    /// The request has no destination
    #[error("destination missing")]
    MissingDestination,

    /// Route service text is not one of driving, walking, bicycling
    #[error("unknown route service: '{0}'")]
    UnknownRouteService(String),

    /// Traffic mode text is not one of best_guess, optimistic, pessimistic
    #[error("unknown traffic mode: '{0}'")]
    UnknownTrafficMode(String),

    /// Avoid text is not one of tolls, highways
    #[error("unknown avoid restriction: '{0}'")]
    UnknownAvoid(String),

    /// The service ignores alternatives once waypoints are set
    #[error("alternatives cannot be requested together with waypoints")]
    AlternativesWithWaypoints,
}

/// Coarse classification of a [`MapKitError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller input rejected before any network call
    Validation,
    /// Client could not be configured or a request could not be signed
    Configuration,
    /// The caller's cancellation fired while waiting
    Cancelled,
    /// Network failure, bad HTTP status, or undecodable transfer encoding
    Transport,
    /// JSON encoding of the request or decoding of the response failed
    Serialization,
    /// The service answered with a non-success status envelope
    Api,
}

/// Errors that can occur while talking to the Map Kit service
#[derive(Debug, Error)]
pub enum MapKitError {
    /// Request failed pre-flight validation
    #[error("map-kit: {0}")]
    Validation(#[from] ValidationError),

    /// Client configuration or request signing failed
    #[error("map-kit: configuration error: {0}")]
    Configuration(String),

    /// Caller cancelled the operation
    #[error("map-kit: {context}: cancelled")]
    Cancelled {
        /// Where the cancellation was observed
        context: &'static str,
    },

    /// Network level failure or malformed request construction
    #[error("map-kit: {context}: {source}")]
    Transport {
        /// Operation that failed
        context: &'static str,
        /// Underlying cause
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Response declared a compressed encoding that could not be decoded
    #[error("map-kit: {context}: decompression failed: {source}")]
    Decompression {
        /// Operation that failed
        context: &'static str,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// Non-success HTTP status with a body that is not a status envelope
    #[error("map-kit: {context}: HTTP {status}")]
    HttpStatus {
        /// Operation that failed
        context: &'static str,
        /// HTTP status code
        status: u16,
        /// Raw response body for diagnostics
        raw_response: Vec<u8>,
    },

    /// Request body could not be serialized
    #[error("map-kit: {context}: {source}")]
    Marshal {
        /// Operation that failed
        context: &'static str,
        /// Underlying cause
        #[source]
        source: serde_json::Error,
    },

    /// Response body could not be deserialized
    #[error("map-kit: {context}: {source}")]
    Unmarshal {
        /// Operation that failed
        context: &'static str,
        /// Raw response body for diagnostics
        raw_response: Vec<u8>,
        /// Underlying cause
        #[source]
        source: serde_json::Error,
    },

    /// Response carried no body at all
    #[error("map-kit: {context}: empty response")]
    EmptyResponse {
        /// Operation that failed
        context: &'static str,
    },

    /// Service returned a non-success status envelope
    #[error("map-kit: {context}: {return_code} - {return_desc}")]
    ApiStatus {
        /// Operation that failed
        context: &'static str,
        /// `returnCode` from the envelope
        return_code: ReturnCode,
        /// `returnDesc` from the envelope
        return_desc: ReturnDesc,
    },
}

impl MapKitError {
    pub(crate) fn transport(
        context: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            context,
            source: source.into(),
        }
    }

    /// Category of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Transport { .. } | Self::Decompression { .. } | Self::HttpStatus { .. } => {
                ErrorKind::Transport
            },
            Self::Marshal { .. } | Self::Unmarshal { .. } | Self::EmptyResponse { .. } => {
                ErrorKind::Serialization
            },
            Self::ApiStatus { .. } => ErrorKind::Api,
        }
    }

    /// True for API-level failures (the service answered, but said no)
    #[must_use]
    pub const fn is_api_error(&self) -> bool {
        matches!(self, Self::ApiStatus { .. })
    }

    /// Raw response bytes kept for diagnostics, if any
    #[must_use]
    pub fn raw_response(&self) -> Option<&[u8]> {
        match self {
            Self::HttpStatus { raw_response, .. } | Self::Unmarshal { raw_response, .. } => {
                Some(raw_response)
            },
            _ => None,
        }
    }

    /// Returns true if a later attempt might succeed
    ///
    /// The client never retries on its own; this is a hint for callers.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::ApiStatus {
                return_code,
                return_desc,
                ..
            } => {
                *return_code == ReturnCode::INTERNAL_SERVICE_ERROR
                    || *return_desc == ReturnDesc::OVER_QUERY_LIMIT
                    || *return_desc == ReturnDesc::UNKNOWN_ERROR
            },
            _ => false,
        }
    }
}
