//! Async Rust client library for the Skyvault cloud storage REST API.
//!
//! Provides endpoint URL construction, a generic send-and-decode request
//! pipeline with provider-faithful redirect handling and per-client
//! observation hooks, and the asynchronous audit-report workflow
//! (submit → poll → paginate results).
//!
//! # Modules
//!
//! - [`audit`] — Audit report submission, status checks, and paginated results.
//! - [`client`] — The request pipeline: `SkyvaultClient` and the four
//!   response decode shapes (JSON, text, bytes, stream).
//! - [`endpoint`] — Tenant endpoint URL construction.
//! - [`error`] — Typed error hierarchy (`SkyvaultError`) for all operations.
//! - [`hooks`] — Optional before-send / after-response / after-exception
//!   callbacks for external logging and metrics.
//!
//! Authentication is out of scope: hand the client a `reqwest::Client`
//! with credentials pre-attached (e.g. via default headers). Build that
//! client with redirects disabled — [`client::default_http_client`] does —
//! so the library's own redirect follower stays in charge.
//!
//! # Quick Start
//!
//! ```ignore
//! use skyvault_api::audit::{self, LoginReportRequest, ReportFormat, ReportStatus};
//! use skyvault_api::client::{default_http_client, SkyvaultClient};
//!
//! let client = SkyvaultClient::new(default_http_client(), "acme");
//! let request = LoginReportRequest { /* ... */ };
//! let report = audit::submit_login_report(&client, &request).await?;
//! match audit::check_report_status(&client, &report).await? {
//!     ReportStatus::Pending(status) => println!("still {status}"),
//!     ReportStatus::Completed(results) => println!("{results:?}"),
//! }
//! ```

#![warn(missing_docs)]

pub mod audit;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod hooks;
mod redirect;
