//! Map Kit HTTP client and request pipeline
//!
//! Every call runs the same pipeline: wait for a rate limiter token, resolve
//! the host, encode the body, sign the URL, send through the `User-Agent`
//! decorator, gunzip if needed and decode the JSON response. The metrics
//! hook sees every call exactly once, whatever the outcome.

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use flate2::read::GzDecoder;
use reqwest::header::{ACCEPT, CONTENT_ENCODING, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::MapKitConfig;
use crate::error::MapKitError;
use crate::metrics::{MetricsReporter, NoOpReporter, RequestOutcome};
use crate::rate_limit::RateLimiter;
use crate::signer::ApiKeySigner;
use crate::transport::{HttpSender, UserAgentTransport};

/// Endpoint family description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiConfig {
    /// Default scheme and host, used unless the client overrides it
    pub host: &'static str,
    /// Path prefix; a per-call suffix is appended
    pub path: &'static str,
    /// Whether the endpoint authenticates with the `key` query parameter
    pub accepts_api_key: bool,
}

/// Route planning endpoints
pub const DIRECTIONS_API: ApiConfig = ApiConfig {
    host: "https://mapapi.cloud.huawei.com",
    path: "/mapApi/v1/routeService/",
    accepts_api_key: true,
};

/// One logical call through the pipeline
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    /// Operation name, used for metrics and error context
    pub name: &'static str,
    /// Endpoint family
    pub api: &'a ApiConfig,
    /// Appended to the endpoint path, e.g. `driving`
    pub suffix: &'a str,
    /// Extra query parameters, sent ahead of the signature
    pub query: &'a [(&'a str, &'a str)],
}

impl<'a> Call<'a> {
    /// Call without a path suffix or extra query parameters
    #[must_use]
    pub const fn new(name: &'static str, api: &'a ApiConfig) -> Self {
        Self {
            name,
            api,
            suffix: "",
            query: &[],
        }
    }

    /// Set the path suffix
    #[must_use]
    pub const fn with_suffix(mut self, suffix: &'a str) -> Self {
        self.suffix = suffix;
        self
    }

    /// Set extra query parameters
    #[must_use]
    pub const fn with_query(mut self, query: &'a [(&'a str, &'a str)]) -> Self {
        self.query = query;
        self
    }
}

/// Client for the Map Kit web services
///
/// Cheap to share behind an [`Arc`]; concurrent calls share one rate
/// limiter and one connection pool.
#[derive(Debug)]
pub struct MapKitClient {
    transport: UserAgentTransport,
    signer: ApiKeySigner,
    limiter: RateLimiter,
    base_url: Option<Url>,
    metrics: Arc<dyn MetricsReporter>,
}

/// Builds a [`MapKitClient`], failing fast on bad configuration
pub struct MapKitClientBuilder {
    config: MapKitConfig,
    sender: Option<Arc<dyn HttpSender>>,
    metrics: Option<Arc<dyn MetricsReporter>>,
}

impl std::fmt::Debug for MapKitClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapKitClientBuilder")
            .field("config", &self.config)
            .field("custom_sender", &self.sender.is_some())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl MapKitClientBuilder {
    /// Start from a configuration
    #[must_use]
    pub fn new(config: MapKitConfig) -> Self {
        Self {
            config,
            sender: None,
            metrics: None,
        }
    }

    /// Send requests through a custom sender instead of a default
    /// [`reqwest::Client`]
    #[must_use]
    pub fn with_sender(mut self, sender: impl HttpSender + 'static) -> Self {
        self.sender = Some(Arc::new(sender));
        self
    }

    /// Send requests through a preconfigured [`reqwest::Client`]
    ///
    /// The configured timeouts do not apply; the client's own settings do.
    #[must_use]
    pub fn with_http_client(self, client: reqwest::Client) -> Self {
        self.with_sender(client)
    }

    /// Report per-request metrics to `reporter`
    #[must_use]
    pub fn with_metrics_reporter(mut self, reporter: impl MetricsReporter + 'static) -> Self {
        self.metrics = Some(Arc::new(reporter));
        self
    }

    /// Report per-request metrics to a shared reporter
    #[must_use]
    pub fn with_shared_metrics_reporter(mut self, reporter: Arc<dyn MetricsReporter>) -> Self {
        self.metrics = Some(reporter);
        self
    }

    /// Validate the configuration and build the client
    ///
    /// # Errors
    ///
    /// Returns [`MapKitError::Configuration`] if the API key is missing or
    /// empty, the base URL is invalid, or the HTTP client cannot be built.
    pub fn build(self) -> Result<MapKitClient, MapKitError> {
        let config = self.config;
        config.validate().map_err(MapKitError::Configuration)?;

        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| MapKitError::Configuration("API key missing".to_string()))?;

        let base_url = config
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| MapKitError::Configuration(format!("invalid base_url: {e}")))?;

        let sender = match self.sender {
            Some(sender) => sender,
            None => Arc::new(
                reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.timeout_secs))
                    .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
                    .build()
                    .map_err(|e| {
                        MapKitError::Configuration(format!("failed to build HTTP client: {e}"))
                    })?,
            ),
        };

        debug!(
            requests_per_second = config.requests_per_second,
            base_url = ?config.base_url,
            "Map Kit client configured"
        );

        Ok(MapKitClient {
            transport: UserAgentTransport::new(sender, &config.user_agent)?,
            signer: ApiKeySigner::new(api_key),
            limiter: RateLimiter::new(config.requests_per_second),
            base_url,
            metrics: self.metrics.unwrap_or_else(|| Arc::new(NoOpReporter)),
        })
    }
}

impl MapKitClient {
    /// Build a client from a configuration with default sender and metrics
    ///
    /// # Errors
    ///
    /// See [`MapKitClientBuilder::build`].
    pub fn new(config: MapKitConfig) -> Result<Self, MapKitError> {
        MapKitClientBuilder::new(config).build()
    }

    /// Start building a client
    #[must_use]
    pub fn builder(config: MapKitConfig) -> MapKitClientBuilder {
        MapKitClientBuilder::new(config)
    }

    /// Identifier added to each request's `User-Agent`
    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.transport.user_agent()
    }

    /// Host a call to `api` is sent to
    #[must_use]
    pub fn resolve_host(&self, api: &ApiConfig) -> String {
        self.base_url.as_ref().map_or_else(
            || api.host.to_string(),
            |url| url.as_str().trim_end_matches('/').to_string(),
        )
    }

    /// POST `body` as JSON and decode the JSON response
    ///
    /// # Errors
    ///
    /// Returns any pipeline error: cancellation, signing, transport,
    /// decompression, encoding or decoding.
    pub async fn post_json<B, R>(
        &self,
        call: Call<'_>,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<R, MapKitError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        self.execute(Method::POST, call, Some(body), cancel).await
    }

    /// GET and decode the JSON response
    ///
    /// # Errors
    ///
    /// Same as [`Self::post_json`], minus body encoding.
    pub async fn get_json<R>(
        &self,
        call: Call<'_>,
        cancel: &CancellationToken,
    ) -> Result<R, MapKitError>
    where
        R: DeserializeOwned,
    {
        self.execute::<(), R>(Method::GET, call, None, cancel).await
    }

    #[instrument(skip_all, fields(endpoint = call.name, method = %method, suffix = call.suffix))]
    async fn execute<B, R>(
        &self,
        method: Method,
        call: Call<'_>,
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<R, MapKitError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let started = Instant::now();
        let origin = self.resolve_host(call.api);
        let handle = self.metrics.new_request(call.name);

        let (result, raw) = match self.exchange(method, call, &origin, body, cancel).await {
            Ok((status, raw)) => (decode(call.name, status, &raw), Some(raw)),
            Err(err) => (Err(err), None),
        };

        if let Err(err) = &result {
            warn!(error = %err, "Map Kit request failed");
        }

        handle.end_request(&RequestOutcome {
            cancelled: matches!(result, Err(MapKitError::Cancelled { .. })),
            error: result.as_ref().err(),
            raw_response: raw.as_deref(),
            origin: &origin,
            elapsed: started.elapsed(),
        });

        result
    }

    /// Run the network part of the pipeline, returning status and raw body
    async fn exchange<B>(
        &self,
        method: Method,
        call: Call<'_>,
        origin: &str,
        body: Option<&B>,
        cancel: &CancellationToken,
    ) -> Result<(StatusCode, Vec<u8>), MapKitError>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.limiter.acquire(cancel).await?;

        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|source| MapKitError::Marshal {
                context: "marshal request",
                source,
            })?;

        let request = self.build_request(method, call, origin, payload)?;

        debug!(path = request.url().path(), "Sending Map Kit request");

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(MapKitError::Cancelled { context: "send request" });
            }
            response = self.transport.send(&request) => response?,
        };

        let status = response.status();
        let gzipped = response
            .headers()
            .get(CONTENT_ENCODING)
            .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"gzip"));

        let bytes = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(MapKitError::Cancelled { context: "read response" });
            }
            bytes = response.bytes() => {
                bytes.map_err(|e| MapKitError::transport("read response", e))?
            }
        };

        let raw = if gzipped {
            gunzip(&bytes)?
        } else {
            bytes.to_vec()
        };

        debug!(status = status.as_u16(), bytes = raw.len(), "Map Kit response received");
        Ok((status, raw))
    }

    fn build_request(
        &self,
        method: Method,
        call: Call<'_>,
        origin: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<Request, MapKitError> {
        let mut url = Url::parse(&format!("{origin}{}{}", call.api.path, call.suffix))
            .map_err(|e| MapKitError::transport("build request", e))?;

        if !call.query.is_empty() {
            url.query_pairs_mut().extend_pairs(call.query);
        }
        self.signer.sign_url(&mut url, call.api.accepts_api_key)?;

        let mut request = Request::new(method, url);
        if let Some(payload) = payload {
            let json = HeaderValue::from_static("application/json");
            request.headers_mut().insert(CONTENT_TYPE, json.clone());
            request.headers_mut().insert(ACCEPT, json);
            *request.body_mut() = Some(payload.into());
        }

        Ok(request)
    }
}

fn gunzip(compressed: &[u8]) -> Result<Vec<u8>, MapKitError> {
    let mut decoded = Vec::new();
    GzDecoder::new(compressed)
        .read_to_end(&mut decoded)
        .map_err(|source| MapKitError::Decompression {
            context: "gzip response",
            source,
        })?;
    Ok(decoded)
}

/// Decode a JSON body
///
/// A non-2xx status whose body is not the expected JSON is reported as an
/// HTTP status error; a non-2xx status with a decodable envelope is left to
/// the caller's status check.
fn decode<R: DeserializeOwned>(
    context: &'static str,
    status: StatusCode,
    raw: &[u8],
) -> Result<R, MapKitError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        if status.is_success() {
            return Err(MapKitError::EmptyResponse { context });
        }
        return Err(MapKitError::HttpStatus {
            context,
            status: status.as_u16(),
            raw_response: raw.to_vec(),
        });
    }

    serde_json::from_slice(raw).map_err(|source| {
        if status.is_success() {
            MapKitError::Unmarshal {
                context,
                raw_response: raw.to_vec(),
                source,
            }
        } else {
            MapKitError::HttpStatus {
                context,
                status: status.as_u16(),
                raw_response: raw.to_vec(),
            }
        }
    })
}
