//! Typed error hierarchy for the skyvault-api crate.
//!
//! `SkyvaultError` is a structured enum that preserves diagnostic context at
//! each failure boundary. Every variant carries enough information for
//! callers to:
//! - Distinguish the failure category (validation, API, decode, network).
//! - Inspect the original cause via `source()` (thiserror derives this
//!   automatically from `#[source]` fields).
//! - Display a human-readable message that includes the relevant context
//!   (status code, raw body, offending job kind).
//!
//! Design rationale:
//! - Variants map to real system boundaries, not to internal implementation
//!   details. `Validation` fires before any network call; `Api` covers the
//!   Skyvault REST API; `Network` covers the transport underneath it.
//! - `Api` and `Decode` both preserve the full raw response body. Skyvault
//!   error responses carry diagnostic detail that `error_for_status()`-style
//!   shortcuts would discard, and a body that fails structured decoding can
//!   still be inspected as text.
//! - `Network` wraps `reqwest::Error` for transport-level failures (DNS,
//!   TCP, TLS) that don't produce an HTTP status code.

use reqwest::StatusCode;

/// Unified error type for all skyvault-api library operations.
///
/// Each variant corresponds to a distinct failure boundary in the system.
/// The `#[source]` attribute on inner errors enables `Error::source()`
/// chaining so callers (and logging frameworks) can traverse the full
/// cause chain.
#[derive(Debug, thiserror::Error)]
pub enum SkyvaultError {
    /// A request was rejected locally, before any network call.
    ///
    /// Raised by the audit module when required submission parameters are
    /// missing (e.g. a login report with no events, a file report with
    /// neither a file nor a folder). Never retried — the input itself is
    /// wrong.
    #[error("invalid request: {message}")]
    Validation {
        /// Human-readable description of what was missing or malformed.
        message: String,
    },

    /// The Skyvault API returned a non-success HTTP status code.
    ///
    /// The full response body is preserved so callers can inspect the
    /// provider's diagnostic payload without re-parsing anything
    /// themselves. The `StatusCode` Display form includes the canonical
    /// reason phrase (`"403 Forbidden"`), and `status.canonical_reason()`
    /// exposes it directly.
    #[error("API error {status}: {body}")]
    Api {
        /// The HTTP status code returned by the API.
        status: StatusCode,
        /// The raw response body text. May contain JSON error details
        /// from Skyvault, or an empty string if the body could not be read.
        body: String,
    },

    /// The response had a success status but its body did not match the
    /// shape the caller requested.
    ///
    /// This is distinct from `Api` — the status itself signaled success,
    /// so the failure is in decoding. The raw body travels with the error
    /// so callers can always get at the original bytes, and the underlying
    /// `serde_json::Error` is reachable through `source()`.
    #[error("failed to decode response body: {source}")]
    Decode {
        /// The raw response body that failed to decode.
        body: String,
        /// The parse failure that triggered this error.
        #[source]
        source: serde_json::Error,
    },

    /// A report handle names a job kind this library does not recognize.
    ///
    /// Can only arise when a handle is reconstructed from persisted parts
    /// (see `AuditReport::from_parts`) — handles created by submission
    /// always carry a known kind.
    #[error("unsupported report kind: {kind}")]
    UnsupportedReport {
        /// The unrecognized kind string.
        kind: String,
    },

    /// A network-level failure occurred (DNS resolution, TCP connection,
    /// TLS handshake, a failed redirect reissue, etc.).
    ///
    /// No HTTP status code is available because the request did not
    /// complete. This wraps the underlying `reqwest::Error` which carries
    /// detailed transport diagnostics.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Convenience alias used throughout the library.
/// Keeps function signatures concise while providing the full typed error.
pub type Result<T> = std::result::Result<T, SkyvaultError>;
