//! HTTP sending and the `User-Agent` decorator

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::{Request, Response};

use crate::error::MapKitError;

/// Anything that can execute an HTTP request
///
/// Implemented for [`reqwest::Client`]; supply your own to route requests
/// through custom middleware or a test double.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HttpSender: Send + Sync {
    /// Execute a fully built request
    async fn send(&self, request: Request) -> Result<Response, reqwest::Error>;
}

#[async_trait]
impl HttpSender for reqwest::Client {
    async fn send(&self, request: Request) -> Result<Response, reqwest::Error> {
        self.execute(request).await
    }
}

/// Adds the client identifier to `User-Agent` on every request
///
/// Only the client builder constructs this, so a sender is wrapped
/// exactly once.
#[derive(Clone)]
pub struct UserAgentTransport {
    inner: Arc<dyn HttpSender>,
    user_agent: HeaderValue,
}

impl std::fmt::Debug for UserAgentTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAgentTransport")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl UserAgentTransport {
    pub(crate) fn new(inner: Arc<dyn HttpSender>, user_agent: &str) -> Result<Self, MapKitError> {
        let user_agent = HeaderValue::from_str(user_agent).map_err(|e| {
            MapKitError::Configuration(format!("invalid user agent '{user_agent}': {e}"))
        })?;
        Ok(Self { inner, user_agent })
    }

    /// Client identifier added to each request
    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.user_agent.to_str().unwrap_or_default()
    }

    /// Send a copy of `request` carrying the decorated `User-Agent`
    ///
    /// The caller's request, headers included, is left untouched.
    pub async fn send(&self, request: &Request) -> Result<Response, MapKitError> {
        let mut outgoing = request.try_clone().ok_or_else(|| {
            MapKitError::transport("copy request", "request body cannot be cloned")
        })?;

        let decorated = match outgoing.headers().get(USER_AGENT) {
            Some(existing) if !existing.is_empty() => {
                let mut joined = existing.as_bytes().to_vec();
                joined.push(b';');
                joined.extend_from_slice(self.user_agent.as_bytes());
                HeaderValue::from_bytes(&joined)
                    .map_err(|e| MapKitError::transport("decorate user agent", e))?
            },
            _ => self.user_agent.clone(),
        };
        outgoing.headers_mut().insert(USER_AGENT, decorated);

        self.inner
            .send(outgoing)
            .await
            .map_err(|e| MapKitError::transport("send request", e))
    }
}
