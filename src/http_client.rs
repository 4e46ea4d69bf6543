use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, Request, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::{AccessToken, TokenStore};
use crate::error::TransportError;

/// Fully buffered HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Append path segments to a base URL
///
/// Returns `None` for URLs that cannot carry a path (e.g. `mailto:`).
pub fn endpoint_url(base: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut().ok()?.pop_if_empty().extend(segments);
    Some(url)
}

/// URL safe for logs: the `password` query parameter is masked
pub fn redacted_url(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "password" {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();

    let mut clean = url.clone();
    clean.query_pairs_mut().clear().extend_pairs(pairs);
    clean.to_string()
}

/// Plain HTTP transport with connection pooling and request/response logging
///
/// With DEBUG enabled, request and response bodies are logged; otherwise a
/// single INFO line is written per request and per response.
/// `Authorization` headers are never logged.
#[derive(Clone)]
pub struct HttpTransport {
    /// Shared HTTP client with connection pooling
    client: Client,
}

impl HttpTransport {
    /// Create a new transport
    pub fn new(
        max_idle_connections: usize,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .pool_max_idle_per_host(max_idle_connections)
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Get the underlying HTTP client (for building requests)
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Dispatch a request and buffer the whole response
    pub async fn execute(&self, request: Request) -> Result<HttpResponse, TransportError> {
        let method = request.method().clone();
        let url = redacted_url(request.url());
        let verbose = tracing::enabled!(tracing::Level::DEBUG);
        let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

        if verbose {
            let body = request
                .body()
                .and_then(|b| b.as_bytes())
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            tracing::debug!(
                request_id = %request_id,
                method = %method,
                url = %url,
                body = %body,
                "--> HTTP request"
            );
        } else {
            tracing::info!(request_id = %request_id, method = %method, url = %url, "--> HTTP request");
        }

        let started = Instant::now();
        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let err = TransportError::from(e);
                tracing::warn!(
                    request_id = %request_id,
                    error_kind = err.kind,
                    error = %err.message,
                    url = %url,
                    "<-- HTTP request failed"
                );
                return Err(err);
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            let err = TransportError::from(e);
            tracing::warn!(
                request_id = %request_id,
                error_kind = err.kind,
                error = %err.message,
                url = %url,
                "<-- HTTP response body failed"
            );
            err
        })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if verbose {
            tracing::debug!(
                request_id = %request_id,
                status = %status,
                elapsed_ms,
                body = %String::from_utf8_lossy(&body),
                "<-- HTTP response"
            );
        } else {
            tracing::info!(
                request_id = %request_id,
                status = %status,
                elapsed_ms,
                bytes = body.len(),
                "<-- HTTP response"
            );
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Status codes meaning the bearer token was not accepted
pub(crate) fn is_rejected(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED
}

/// Transport that attaches the cached bearer token to every request
///
/// Handles:
/// - token endpoint calls: passed through untouched
/// - 403/401: refreshes the token and retries exactly once
pub struct AuthenticatingTransport {
    http: HttpTransport,

    /// Shared token cache
    tokens: Arc<TokenStore>,

    /// Token endpoint, exempt from authentication
    token_url: Url,
}

impl AuthenticatingTransport {
    pub fn new(http: HttpTransport, tokens: Arc<TokenStore>, token_url: Url) -> Self {
        Self {
            http,
            tokens,
            token_url,
        }
    }

    /// Get the underlying HTTP client (for building requests)
    pub fn client(&self) -> &Client {
        self.http.client()
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    fn is_token_request(&self, request: &Request) -> bool {
        let url = request.url();
        request.method() == Method::POST
            && url.origin() == self.token_url.origin()
            && url.path() == self.token_url.path()
    }

    /// Execute a request with authentication
    ///
    /// The second response is returned as-is, whatever its status.
    pub async fn execute(&self, request: Request) -> Result<HttpResponse, TransportError> {
        if self.is_token_request(&request) {
            return self.http.execute(request).await;
        }

        let retry = request.try_clone().ok_or_else(|| {
            TransportError::new("request_error", "Request body is not cloneable")
        })?;

        let token = self.tokens.read().await;
        let response = self.http.execute(with_bearer(request, &token)?).await?;

        if !is_rejected(response.status) {
            return Ok(response);
        }

        tracing::warn!(
            status = %response.status,
            "Received {}, refreshing token and retrying...",
            response.status.as_u16()
        );

        let token = self.tokens.refresh().await;
        let response = self.http.execute(with_bearer(retry, &token)?).await?;

        if is_rejected(response.status) {
            tracing::error!(
                status = %response.status,
                "Request still rejected after token refresh"
            );
        }

        Ok(response)
    }
}

fn with_bearer(mut request: Request, token: &AccessToken) -> Result<Request, TransportError> {
    let mut value = HeaderValue::from_str(&token.bearer()).map_err(|_| {
        TransportError::new("request_error", "Access token is not a valid header value")
    })?;
    value.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(request)
}
