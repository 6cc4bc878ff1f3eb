//! Redirect handling for the request pipeline.
//!
//! The Skyvault API redirects requests across storage nodes, and the rules
//! it expects differ by status code:
//!
//! - `307 Temporary Redirect` — reissue with the identical method and body.
//! - `302 Found` and `303 See Other` — reissue as `GET` with no body.
//!
//! reqwest's built-in policy cannot express this faithfully (it also drops
//! sensitive headers on cross-host hops, which breaks pre-authorized
//! requests), so the client is built with redirects disabled and this
//! module reissues by hand.
//!
//! Each status is checked once against the current response, in the order
//! above — one reissue per status code, no loop. A redirect chain longer
//! than that is not followed; the final redirect response is handed back
//! to the caller as-is.

use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Method, Request, Response, StatusCode, Url, Version};
use std::time::Duration;
use tracing::debug;

/// Sends `request`, reissuing at most once per redirect status encountered.
///
/// A failure sending the reissued request propagates exactly like a failure
/// on the original send; there is no retry beyond the single reissue.
pub(crate) async fn send(client: &Client, request: Request) -> reqwest::Result<Response> {
    // Capture a replayable copy before execute() consumes the request.
    let replay = Replay::capture(&request);
    let mut response = client.execute(request).await?;

    if response.status() == StatusCode::TEMPORARY_REDIRECT {
        if let Some(target) = redirect_target(&response) {
            // 307 preserves method and body byte-for-byte. A request whose
            // body could not be buffered cannot be replayed; the redirect
            // response is then returned unchanged.
            if let Some(reissue) = replay.reissue(target.clone(), false) {
                debug!(location = %target, "following 307 redirect");
                response = client.execute(reissue).await?;
            }
        }
    }
    if response.status() == StatusCode::FOUND {
        if let Some(target) = redirect_target(&response) {
            if let Some(reissue) = replay.reissue(target.clone(), true) {
                debug!(location = %target, "following 302 redirect as GET");
                response = client.execute(reissue).await?;
            }
        }
    }
    if response.status() == StatusCode::SEE_OTHER {
        if let Some(target) = redirect_target(&response) {
            if let Some(reissue) = replay.reissue(target.clone(), true) {
                debug!(location = %target, "following 303 redirect as GET");
                response = client.execute(reissue).await?;
            }
        }
    }

    Ok(response)
}

/// Extracts and resolves the `Location` header of a redirect response.
/// Returns `None` when the header is missing or unusable — the response is
/// then passed through unchanged, with no substitution attempted.
fn redirect_target(response: &Response) -> Option<Url> {
    let raw = response.headers().get(LOCATION)?.to_str().ok()?;
    resolve_location(response.url(), raw)
}

/// Resolves a `Location` value against the URL that produced it.
/// Absolute targets are taken as given; relative ones are joined.
fn resolve_location(base: &Url, raw: &str) -> Option<Url> {
    Url::parse(raw).or_else(|_| base.join(raw)).ok()
}

/// How the original request's body can be reproduced on a reissue.
enum BodyReplay {
    /// The request had no body.
    Absent,
    /// The body was a buffer; these bytes are sent verbatim on replay.
    Buffered(Bytes),
    /// The body was a stream and cannot be replayed.
    Streaming,
}

/// A replayable capture of an outbound request, taken before the transport
/// consumes it: method, headers, protocol version, request timeout, and
/// buffered body bytes.
struct Replay {
    method: Method,
    headers: HeaderMap,
    version: Version,
    timeout: Option<Duration>,
    body: BodyReplay,
}

impl Replay {
    fn capture(request: &Request) -> Self {
        let body = match request.body() {
            None => BodyReplay::Absent,
            Some(body) => match body.as_bytes() {
                Some(bytes) => BodyReplay::Buffered(Bytes::copy_from_slice(bytes)),
                None => BodyReplay::Streaming,
            },
        };
        Replay {
            method: request.method().clone(),
            headers: request.headers().clone(),
            version: request.version(),
            timeout: request.timeout().copied(),
            body,
        }
    }

    /// Builds the redirected request.
    ///
    /// With `rewrite_to_get` the reissue is a bodiless `GET`: content
    /// headers are dropped alongside the body, everything else is copied.
    /// Otherwise method and body are preserved; headers are cloned as-is
    /// (values were validated on the original request, the clone does not
    /// re-validate them). Returns `None` only when a body-preserving
    /// reissue is impossible because the body was a stream.
    fn reissue(&self, target: Url, rewrite_to_get: bool) -> Option<Request> {
        let method = if rewrite_to_get {
            Method::GET
        } else {
            self.method.clone()
        };
        let mut request = Request::new(method, target);

        if rewrite_to_get {
            let mut headers = self.headers.clone();
            headers.remove(CONTENT_TYPE);
            headers.remove(CONTENT_LENGTH);
            *request.headers_mut() = headers;
        } else {
            match &self.body {
                BodyReplay::Absent => {}
                BodyReplay::Buffered(bytes) => {
                    *request.body_mut() = Some(bytes.clone().into());
                }
                BodyReplay::Streaming => return None,
            }
            *request.headers_mut() = self.headers.clone();
        }

        *request.version_mut() = self.version;
        *request.timeout_mut() = self.timeout;
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, AUTHORIZATION};

    fn original_post() -> Request {
        let mut request = Request::new(
            Method::POST,
            Url::parse("https://acme.skyvault.com/pubapi/v1/audit/logins").unwrap(),
        );
        *request.body_mut() = Some(r#"{"format":"json"}"#.into());
        request.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer t0k3n"));
        request
    }

    #[test]
    fn preserving_reissue_keeps_method_body_and_headers() {
        let original = original_post();
        let replay = Replay::capture(&original);
        let target = Url::parse("https://node7.skyvault.com/pubapi/v1/audit/logins").unwrap();

        let reissue = replay.reissue(target.clone(), false).unwrap();

        assert_eq!(reissue.method(), &Method::POST);
        assert_eq!(reissue.url(), &target);
        assert_eq!(
            reissue.body().unwrap().as_bytes().unwrap(),
            br#"{"format":"json"}"#,
            "body bytes must match the original verbatim"
        );
        assert_eq!(
            reissue.headers().get(AUTHORIZATION).unwrap(),
            "Bearer t0k3n"
        );
        assert_eq!(
            reissue.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn get_rewrite_drops_body_and_content_headers() {
        let original = original_post();
        let replay = Replay::capture(&original);
        let target = Url::parse("https://node7.skyvault.com/result").unwrap();

        let reissue = replay.reissue(target, true).unwrap();

        assert_eq!(reissue.method(), &Method::GET);
        assert!(reissue.body().is_none(), "GET rewrite must carry no body");
        assert!(reissue.headers().get(CONTENT_TYPE).is_none());
        assert!(reissue.headers().get(CONTENT_LENGTH).is_none());
        // Non-content headers survive the rewrite.
        assert_eq!(
            reissue.headers().get(AUTHORIZATION).unwrap(),
            "Bearer t0k3n"
        );
    }

    #[test]
    fn bodiless_request_reissues_without_body() {
        let original = Request::new(
            Method::GET,
            Url::parse("https://acme.skyvault.com/pubapi/v1/audit/jobs/1").unwrap(),
        );
        let replay = Replay::capture(&original);
        let target = Url::parse("https://node2.skyvault.com/jobs/1").unwrap();

        let reissue = replay.reissue(target, false).unwrap();
        assert_eq!(reissue.method(), &Method::GET);
        assert!(reissue.body().is_none());
    }

    #[test]
    fn absolute_location_is_taken_verbatim() {
        let base = Url::parse("https://acme.skyvault.com/pubapi/v1/audit/logins").unwrap();
        let resolved = resolve_location(&base, "https://node3.skyvault.com/other").unwrap();
        assert_eq!(resolved.as_str(), "https://node3.skyvault.com/other");
    }

    #[test]
    fn relative_location_is_joined_against_request_url() {
        let base = Url::parse("https://acme.skyvault.com/pubapi/v1/audit/logins").unwrap();
        let resolved = resolve_location(&base, "/pubapi/v1/audit/retry").unwrap();
        assert_eq!(
            resolved.as_str(),
            "https://acme.skyvault.com/pubapi/v1/audit/retry"
        );
    }
}
