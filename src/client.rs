//! HTTP client for the Skyvault REST API.
//!
//! `SkyvaultClient` wraps a `reqwest::Client` and an [`ApiBase`], sending
//! requests through the crate's redirect follower and decoding responses
//! into one of four caller-selected shapes:
//!
//! - [`get_json`](SkyvaultClient::get_json) / [`post_json`](SkyvaultClient::post_json)
//!   — parse the body as a typed structure.
//! - [`get_text`](SkyvaultClient::get_text) — the body verbatim as a string.
//! - [`get_bytes`](SkyvaultClient::get_bytes) — the body as one byte buffer.
//! - [`get_stream`](SkyvaultClient::get_stream) — the body as a live stream,
//!   never fully buffered, for large downloads.
//!
//! Every send runs the same pipeline: bracket sanitization of the URI,
//! before-send hook, redirect follower, body read, after-response hook,
//! then decode-or-error. Any non-2xx status raises
//! [`SkyvaultError::Api`] with the raw body attached, whatever the shape;
//! a 2xx body that fails decoding raises [`SkyvaultError::Decode`], also
//! carrying the body. Every failure path passes through the
//! after-exception hook before propagating.
//!
//! Authentication is the caller's concern: requests are assumed to arrive
//! pre-authorized, typically via default headers on the `reqwest::Client`
//! handed to the constructor. The client enforces no timeouts of its own —
//! deadlines, if any, also live on the supplied `reqwest::Client`.
//! Cancellation is cooperative: dropping an in-flight call abandons it
//! without invoking the after-response hook or retaining a partial body.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Request};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::endpoint::ApiBase;
use crate::error::{Result, SkyvaultError};
use crate::hooks::{Correlation, Hooks, RequestInfo, ResponseInfo};
use crate::redirect;

/// Builds a `reqwest::Client` suitable for [`SkyvaultClient`].
///
/// Redirects are disabled: the crate's own follower implements the
/// provider's per-status reissue rules, and reqwest's built-in policy
/// would preempt it (and strip authorization headers on cross-host hops).
/// Callers supplying their own `reqwest::Client` must likewise build it
/// with `redirect(Policy::none())`.
pub fn default_http_client() -> Client {
    Client::builder()
        .redirect(Policy::none())
        .build()
        .expect("failed to build HTTP client for the Skyvault API")
}

/// A decoded API response: the payload in the caller-requested shape plus
/// the response headers.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The decoded payload.
    pub data: T,
    /// Headers of the final response (after any redirect reissue).
    pub headers: HeaderMap,
}

/// A live response body, read incrementally.
///
/// Returned by [`SkyvaultClient::get_stream`]. The underlying connection
/// stays open while this handle exists and is released when it is dropped,
/// so large payloads can be consumed without materializing them in memory.
#[derive(Debug)]
pub struct BodyStream {
    response: reqwest::Response,
}

impl BodyStream {
    /// Reads the next chunk of the body, or `None` once it is exhausted.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        self.response.chunk().await.map_err(SkyvaultError::from)
    }
}

/// Percent-encodes the bracket characters the transport would otherwise
/// send literally. Some report endpoints use `[`/`]` as literal path and
/// query characters, which the API only accepts in encoded form.
fn sanitize_brackets(url: &str) -> String {
    url.replace('[', "%5B").replace(']', "%5D")
}

/// HTTP client for the Skyvault REST API.
///
/// Holds no cross-call mutable state — the hook set is fixed at
/// construction and independent calls may run concurrently from multiple
/// tasks. Connection reuse is delegated to the underlying
/// `reqwest::Client`.
pub struct SkyvaultClient {
    http: Client,
    base: ApiBase,
    hooks: Hooks,
}

impl SkyvaultClient {
    /// Client for a tenant addressed by its Skyvault domain
    /// (`https://{domain}.skyvault.com`).
    pub fn new(http: Client, domain: &str) -> Self {
        SkyvaultClient {
            http,
            base: ApiBase::domain(domain),
            hooks: Hooks::new(),
        }
    }

    /// Client for a tenant served under an explicit host name.
    pub fn with_host(http: Client, host: &str) -> Self {
        SkyvaultClient {
            http,
            base: ApiBase::host(host),
            hooks: Hooks::new(),
        }
    }

    /// Client with a verbatim base URL, used by tests to point at a local
    /// mock server instead of the real API.
    pub fn with_base_url(http: Client, base: &str) -> Self {
        SkyvaultClient {
            http,
            base: ApiBase::custom(base),
            hooks: Hooks::new(),
        }
    }

    /// Attaches an observation hook set to this client instance.
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Sends a GET request and parses the JSON response into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&str>,
    ) -> Result<ApiResponse<T>> {
        let request = self.build_request::<()>(Method::GET, path, query, None)?;
        self.execute_json(request).await
    }

    /// Sends a POST request with a JSON body and parses the JSON response
    /// into `T`.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>> {
        let request = self.build_request(Method::POST, path, None, Some(body))?;
        self.execute_json(request).await
    }

    /// Sends a GET request and returns the response body verbatim.
    pub async fn get_text(&self, path: &str, query: Option<&str>) -> Result<ApiResponse<String>> {
        let request = self.build_request::<()>(Method::GET, path, query, None)?;
        let exchange = self.exchange_text(request).await?;
        Ok(ApiResponse {
            data: exchange.body,
            headers: exchange.headers,
        })
    }

    /// Sends a GET request and returns the response body as one buffer.
    pub async fn get_bytes(&self, path: &str, query: Option<&str>) -> Result<ApiResponse<Bytes>> {
        let request = self.build_request::<()>(Method::GET, path, query, None)?;
        let (token, info, response) = self.exchange_raw(request).await?;
        let headers = response.headers().clone();
        match response.bytes().await {
            Ok(data) => Ok(ApiResponse { data, headers }),
            Err(e) => {
                let error = SkyvaultError::from(e);
                self.hooks.exception(token, &info, &error);
                Err(error)
            }
        }
    }

    /// Sends a GET request and returns the response body as a live stream.
    ///
    /// The body is not buffered; the connection is held open until the
    /// returned [`BodyStream`] is dropped.
    pub async fn get_stream(
        &self,
        path: &str,
        query: Option<&str>,
    ) -> Result<ApiResponse<BodyStream>> {
        let request = self.build_request::<()>(Method::GET, path, query, None)?;
        let (_token, _info, response) = self.exchange_raw(request).await?;
        let headers = response.headers().clone();
        Ok(ApiResponse {
            data: BodyStream { response },
            headers,
        })
    }

    /// Constructs the outbound request: endpoint URL with brackets
    /// sanitized, optional JSON body. Once built the request is immutable;
    /// a redirect reissue produces a new request, never mutates this one.
    fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        body: Option<&B>,
    ) -> Result<Request> {
        let url = sanitize_brackets(&self.base.url(path, query));
        let mut builder = self.http.request(method, url);
        if let Some(payload) = body {
            builder = builder.json(payload);
        }
        builder.build().map_err(SkyvaultError::from)
    }

    /// Core pipeline for the buffered text/JSON shapes: hooks, redirect
    /// follower, full body read, status check. Returns the successful
    /// exchange with its correlation token so the JSON decode step can
    /// still report through the after-exception hook.
    async fn exchange_text(&self, request: Request) -> Result<TextExchange> {
        let info = RequestInfo {
            method: request.method().clone(),
            url: request.url().clone(),
        };
        let token = self.hooks.before(&info);
        debug!(method = %info.method, url = %info.url, "sending request");

        let response = match redirect::send(&self.http, request).await {
            Ok(response) => response,
            Err(e) => {
                let error = SkyvaultError::from(e);
                self.hooks.exception(token, &info, &error);
                return Err(error);
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let error = SkyvaultError::from(e);
                self.hooks.exception(token, &info, &error);
                return Err(error);
            }
        };
        debug!(status = %status, bytes = body.len(), "response received");

        let token = self.hooks.response(
            token,
            &info,
            &ResponseInfo {
                status,
                headers: &headers,
            },
            Some(&body),
        );

        if !status.is_success() {
            let error = SkyvaultError::Api { status, body };
            self.hooks.exception(token, &info, &error);
            return Err(error);
        }

        Ok(TextExchange {
            token,
            info,
            headers,
            body,
        })
    }

    /// Core pipeline for the bytes/stream shapes. The body is not read
    /// here; the after-response hook runs without body text. A non-2xx
    /// status still buffers the (small) error body so `Api` errors carry
    /// it regardless of the requested shape.
    async fn exchange_raw(
        &self,
        request: Request,
    ) -> Result<(Option<Correlation>, RequestInfo, reqwest::Response)> {
        let info = RequestInfo {
            method: request.method().clone(),
            url: request.url().clone(),
        };
        let token = self.hooks.before(&info);
        debug!(method = %info.method, url = %info.url, "sending request");

        let response = match redirect::send(&self.http, request).await {
            Ok(response) => response,
            Err(e) => {
                let error = SkyvaultError::from(e);
                self.hooks.exception(token, &info, &error);
                return Err(error);
            }
        };

        let status = response.status();
        debug!(status = %status, "response received");
        let token = self.hooks.response(
            token,
            &info,
            &ResponseInfo {
                status,
                headers: response.headers(),
            },
            None,
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = SkyvaultError::Api { status, body };
            self.hooks.exception(token, &info, &error);
            return Err(error);
        }

        Ok((token, info, response))
    }

    async fn execute_json<T: DeserializeOwned>(&self, request: Request) -> Result<ApiResponse<T>> {
        let exchange = self.exchange_text(request).await?;
        match serde_json::from_str::<T>(&exchange.body) {
            Ok(data) => Ok(ApiResponse {
                data,
                headers: exchange.headers,
            }),
            Err(source) => {
                let error = SkyvaultError::Decode {
                    body: exchange.body,
                    source,
                };
                self.hooks.exception(exchange.token, &exchange.info, &error);
                Err(error)
            }
        }
    }
}

/// A completed buffered exchange, pre-decode. Carries the correlation
/// token and request view forward so decode failures can still reach the
/// after-exception hook.
struct TextExchange {
    token: Option<Correlation>,
    info: RequestInfo,
    headers: HeaderMap,
    body: String,
}
