//! Observation hooks for the request pipeline.
//!
//! Three optional callback slots let an external logging or metrics layer
//! watch traffic without participating in it:
//!
//! - **before-send** — sees the outgoing request, may mint an opaque
//!   correlation token.
//! - **after-response** — sees the token, request, response status/headers
//!   and (for buffered text/JSON shapes) the raw body text; may replace the
//!   token.
//! - **after-exception** — sees the token, request and the error about to
//!   be propagated.
//!
//! Hooks are pure side-channels: nothing they return or do can alter the
//! request, the response, or the decoded value, and the pipeline behaves
//! identically whether or not any slot is installed. A [`Hooks`] set is
//! handed to [`SkyvaultClient`](crate::client::SkyvaultClient) at
//! construction, so each client instance carries its own callbacks —
//! concurrent clients and tests never interfere through shared state.
//!
//! Slots are not stacked: installing a callback into an occupied slot
//! replaces the prior occupant.

use std::any::Any;
use std::fmt;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};

use crate::error::SkyvaultError;

/// Opaque correlation value minted by the before-send hook and threaded
/// through the after-response and after-exception hooks of the same
/// request. The pipeline never looks inside it.
pub type Correlation = Box<dyn Any + Send>;

/// The request view handed to every hook: method and final (sanitized) URL.
///
/// A borrowed view is not possible here because the underlying request is
/// consumed by the transport before the later hooks run, so the pipeline
/// captures these two fields up front.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// HTTP method of the outbound request.
    pub method: Method,
    /// Full request URL as sent (brackets already percent-encoded).
    pub url: Url,
}

/// The response view handed to the after-response hook.
pub struct ResponseInfo<'a> {
    /// HTTP status of the final response (after any redirect reissue).
    pub status: StatusCode,
    /// Response headers of the final response.
    pub headers: &'a HeaderMap,
}

type BeforeSendFn = dyn Fn(&RequestInfo) -> Option<Correlation> + Send + Sync;
type AfterResponseFn =
    dyn Fn(Option<Correlation>, &RequestInfo, &ResponseInfo<'_>, Option<&str>) -> Option<Correlation>
        + Send
        + Sync;
type AfterExceptionFn = dyn Fn(Option<Correlation>, &RequestInfo, &SkyvaultError) + Send + Sync;

/// An optionally-populated set of observation callbacks.
///
/// All slots default to absent; an absent slot is skipped with no effect.
#[derive(Default)]
pub struct Hooks {
    before_send: Option<Box<BeforeSendFn>>,
    after_response: Option<Box<AfterResponseFn>>,
    after_exception: Option<Box<AfterExceptionFn>>,
}

impl Hooks {
    /// Creates an empty hook set (all slots absent).
    pub fn new() -> Self {
        Hooks::default()
    }

    /// Installs the before-send callback, replacing any prior occupant.
    ///
    /// The callback runs just before the request is handed to the
    /// transport. Its return value becomes the correlation token for the
    /// rest of this request's hook invocations.
    pub fn on_before_send(
        mut self,
        f: impl Fn(&RequestInfo) -> Option<Correlation> + Send + Sync + 'static,
    ) -> Self {
        self.before_send = Some(Box::new(f));
        self
    }

    /// Installs the after-response callback, replacing any prior occupant.
    ///
    /// Runs after the response arrives and the body has been read, before
    /// any status handling or decoding. `body` is `Some` only for the
    /// buffered text/JSON shapes. The returned value replaces the
    /// correlation token for the remainder of the request.
    pub fn on_after_response(
        mut self,
        f: impl Fn(Option<Correlation>, &RequestInfo, &ResponseInfo<'_>, Option<&str>) -> Option<Correlation>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.after_response = Some(Box::new(f));
        self
    }

    /// Installs the after-exception callback, replacing any prior occupant.
    ///
    /// Runs on every failure path — transport error, non-success status,
    /// decode failure — immediately before the error propagates to the
    /// caller.
    pub fn on_after_exception(
        mut self,
        f: impl Fn(Option<Correlation>, &RequestInfo, &SkyvaultError) + Send + Sync + 'static,
    ) -> Self {
        self.after_exception = Some(Box::new(f));
        self
    }

    pub(crate) fn before(&self, request: &RequestInfo) -> Option<Correlation> {
        self.before_send.as_ref().and_then(|f| f(request))
    }

    pub(crate) fn response(
        &self,
        token: Option<Correlation>,
        request: &RequestInfo,
        response: &ResponseInfo<'_>,
        body: Option<&str>,
    ) -> Option<Correlation> {
        match &self.after_response {
            Some(f) => f(token, request, response, body),
            // No hook installed: the token passes through untouched.
            None => token,
        }
    }

    pub(crate) fn exception(
        &self,
        token: Option<Correlation>,
        request: &RequestInfo,
        error: &SkyvaultError,
    ) {
        if let Some(f) = &self.after_exception {
            f(token, request, error);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_send", &self.before_send.is_some())
            .field("after_response", &self.after_response.is_some())
            .field("after_exception", &self.after_exception.is_some())
            .finish()
    }
}
