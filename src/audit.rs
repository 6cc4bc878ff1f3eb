//! Audit report workflow for the Skyvault API.
//!
//! Report generation is asynchronous on the server. The flow is:
//!
//! 1. **POST** `/pubapi/v1/audit/logins` or `.../files` — submits the
//!    report request and returns an opaque [`AuditReport`] handle.
//! 2. **GET** `.../jobs/{id}` — single-shot status check. The job is
//!    pending until the server responds with the full result body.
//! 3. **GET** `.../json/{id}` — paginated results, decoded into the event
//!    type matching the submitted report kind.
//!
//! No polling loop lives here — cadence and backoff are the caller's
//! choice; this module only exposes the single-shot check.
//!
//! The status endpoint does not carry an explicit discriminator: a pending
//! job answers with a status-only object, a finished one with the full
//! result body. That shape sniffing is isolated in [`is_status_only`] so
//! the ambiguity stays in one testable place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::client::SkyvaultClient;
use crate::error::{Result, SkyvaultError};

/// Versioned root of the audit endpoint family.
const AUDIT_ROOT: &str = "/pubapi/v1/audit";

// ── Report handles ─────────────────────────────────────────────────────

/// The category of audit report, determining both the submission schema
/// and the result event schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Login/logout activity report; results decode as [`LoginEvent`]s.
    Login,
    /// File activity report; results decode as [`FileEvent`]s.
    File,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportKind::Login => "login",
            ReportKind::File => "file",
        })
    }
}

impl FromStr for ReportKind {
    type Err = SkyvaultError;

    /// Parses a persisted kind string. Anything but the known kinds is an
    /// [`SkyvaultError::UnsupportedReport`] — the status and results
    /// operations cannot decode a kind they do not know.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "login" => Ok(ReportKind::Login),
            "file" => Ok(ReportKind::File),
            other => Err(SkyvaultError::UnsupportedReport {
                kind: other.to_string(),
            }),
        }
    }
}

/// Opaque handle to a submitted audit report.
///
/// Created by [`submit_login_report`] / [`submit_file_report`], then passed
/// into [`check_report_status`] and [`retrieve_report_results`]. Immutable;
/// the id is assigned by the server. Server-side retention of an abandoned
/// report is the provider's business, not modeled here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    kind: ReportKind,
    id: String,
}

impl AuditReport {
    /// The report kind this handle was created with.
    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// The server-assigned report id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Rebuilds a handle from persisted parts (e.g. submit in one process,
    /// poll in another). Fails with
    /// [`SkyvaultError::UnsupportedReport`] when `kind` is not a known
    /// report kind string.
    pub fn from_parts(kind: &str, id: &str) -> Result<Self> {
        Ok(AuditReport {
            kind: kind.parse()?,
            id: id.to_string(),
        })
    }
}

// ── Submission parameters ──────────────────────────────────────────────

/// Data format of the generated report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// JSON results, retrievable page-wise via [`retrieve_report_results`].
    Json,
    /// CSV results, delivered out-of-band by the provider.
    Csv,
}

/// Access channels a report can be restricted to. An empty list means the
/// report covers all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPoint {
    /// The web UI.
    Web,
    /// Mobile clients.
    Mobile,
    /// FTP access.
    Ftp,
}

/// Wire format for the report date range, pinned to whole seconds —
/// the submission endpoint rejects fractional timestamps.
mod report_date {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }
}

/// Parameters for a login audit report.
///
/// `events` is required and must name at least one event type (e.g.
/// `"login_success"`, `"login_failed"`, `"logout"`). `access_points` and
/// `users` are optional filters; empty means unrestricted and is omitted
/// from the request body entirely.
#[derive(Debug, Clone, Serialize)]
pub struct LoginReportRequest {
    /// Output format of the report data.
    pub format: ReportFormat,
    /// Start of the reported date range (inclusive).
    #[serde(with = "report_date")]
    pub date_start: DateTime<Utc>,
    /// End of the reported date range (inclusive).
    #[serde(with = "report_date")]
    pub date_end: DateTime<Utc>,
    /// Event types to report on. At least one is required.
    pub events: Vec<String>,
    /// Access channels covered; empty covers all.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub access_points: Vec<AccessPoint>,
    /// Usernames covered; empty covers all.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
}

/// Parameters for a file audit report.
///
/// Either `file` (an explicit file path) or at least one folder is
/// required. When `file` is given it takes precedence and `folders` is
/// not sent at all.
#[derive(Debug, Clone)]
pub struct FileReportRequest {
    /// Output format of the report data.
    pub format: ReportFormat,
    /// Start of the reported date range (inclusive).
    pub date_start: DateTime<Utc>,
    /// End of the reported date range (inclusive).
    pub date_end: DateTime<Utc>,
    /// Folders to report on. Ignored when `file` is set.
    pub folders: Vec<String>,
    /// Explicit file path to report on; takes precedence over `folders`.
    pub file: Option<String>,
    /// Usernames covered; empty covers all.
    pub users: Vec<String>,
    /// Transaction types covered (e.g. `"upload"`, `"delete"`); empty
    /// covers all.
    pub transaction_types: Vec<String>,
}

/// The wire body for a file report submission. Separate from
/// [`FileReportRequest`] so the file-over-folders precedence is encoded
/// in construction rather than left to serializer ordering.
#[derive(Serialize)]
struct FileReportBody<'a> {
    format: ReportFormat,
    #[serde(with = "report_date")]
    date_start: DateTime<Utc>,
    #[serde(with = "report_date")]
    date_end: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    folders: Option<&'a [String]>,
    #[serde(rename = "transaction_type", skip_serializing_if = "Option::is_none")]
    transaction_types: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    users: Option<&'a [String]>,
}

impl<'a> FileReportBody<'a> {
    fn of(request: &'a FileReportRequest) -> Self {
        let file = request.file.as_deref().filter(|f| !f.trim().is_empty());
        FileReportBody {
            format: request.format,
            date_start: request.date_start,
            date_end: request.date_end,
            file,
            // The file path wins; folders are dropped from the body then.
            folders: match file {
                Some(_) => None,
                None => non_empty(&request.folders),
            },
            transaction_types: non_empty(&request.transaction_types),
            users: non_empty(&request.users),
        }
    }
}

fn non_empty(values: &[String]) -> Option<&[String]> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Submission response: the server-assigned report id.
#[derive(Deserialize)]
struct SubmittedReport {
    id: String,
}

// ── Result types ───────────────────────────────────────────────────────

/// Outcome of a single-shot status check.
#[derive(Debug)]
pub enum ReportStatus {
    /// The report is still being generated; carries the server's raw
    /// status string (e.g. `"queued"`, `"running"`).
    Pending(String),
    /// The report finished; the first results page came back with the
    /// status response and is decoded per the handle's kind.
    Completed(ReportResults),
}

/// A decoded results page, tagged by the report kind it belongs to.
#[derive(Debug)]
pub enum ReportResults {
    /// Results of a login report.
    Login(ResultPage<LoginEvent>),
    /// Results of a file report.
    File(ResultPage<FileEvent>),
}

/// One page of report results.
#[derive(Debug, Deserialize)]
pub struct ResultPage<E> {
    /// Total number of events in the full report.
    pub total_count: u32,
    /// Offset of this page within the full report.
    pub offset: u32,
    /// Number of events in this page.
    pub count: u32,
    /// The events themselves, in report order.
    pub events: Vec<E>,
}

/// A single login report event.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginEvent {
    /// Display name of the acting user.
    pub username: String,
    /// Numeric id of the acting user.
    pub user_id: i64,
    /// Access channel the event came through.
    pub access: String,
    /// When the event occurred.
    pub time: DateTime<Utc>,
    /// The event type (e.g. `"login_success"`, `"login_failed"`).
    pub event: String,
    /// Source address of the login attempt.
    pub ip_address: String,
}

/// A single file report event.
#[derive(Debug, Clone, Deserialize)]
pub struct FileEvent {
    /// Display name of the acting user.
    pub username: String,
    /// Numeric id of the acting user.
    pub user_id: i64,
    /// Access channel the event came through.
    pub access: String,
    /// When the event occurred.
    pub time: DateTime<Utc>,
    /// The file or folder the transaction touched.
    #[serde(rename = "file/folder")]
    pub file: String,
    /// Destination path for move/copy transactions, `"N/A"` otherwise.
    pub target_path: String,
    /// The transaction type (e.g. `"Uploaded"`, `"Deleted"`, `"Moved"`).
    pub transaction: String,
    /// Extra transaction detail; the server omits it for most types.
    #[serde(rename = "actionInfo", default)]
    pub action_info: Option<String>,
}

impl FileEvent {
    /// The path the file ended up at: the target path for transactions
    /// that have one, the source path otherwise.
    pub fn current_path(&self) -> &str {
        if self.target_path == "N/A" {
            &self.file
        } else {
            &self.target_path
        }
    }
}

// ── Workflow operations ────────────────────────────────────────────────

/// Submits a login audit report.
///
/// Validates locally before any network call: at least one event type is
/// required. Returns the opaque handle for later status checks and result
/// retrieval.
///
/// # Errors
///
/// - `SkyvaultError::Validation` — `events` is empty; nothing was sent.
/// - `SkyvaultError::Api` — the API rejected the submission.
/// - `SkyvaultError::Decode` — the submission response had an unexpected shape.
/// - `SkyvaultError::Network` — transport-level failure.
pub async fn submit_login_report(
    client: &SkyvaultClient,
    request: &LoginReportRequest,
) -> Result<AuditReport> {
    if request.events.is_empty() {
        return Err(SkyvaultError::Validation {
            message: "at least one event must be specified".to_string(),
        });
    }

    let path = format!("{AUDIT_ROOT}/logins");
    let response = client
        .post_json::<SubmittedReport, _>(&path, request)
        .await?;

    Ok(AuditReport {
        kind: ReportKind::Login,
        id: response.data.id,
    })
}

/// Submits a file audit report.
///
/// Validates locally before any network call: either an explicit file
/// path or at least one folder is required. When both are given, the file
/// path wins and the folders are not sent.
///
/// # Errors
///
/// Same variants as [`submit_login_report`]; `Validation` here means
/// neither a file nor a folder was specified.
pub async fn submit_file_report(
    client: &SkyvaultClient,
    request: &FileReportRequest,
) -> Result<AuditReport> {
    let body = FileReportBody::of(request);
    if body.file.is_none() && body.folders.is_none() {
        return Err(SkyvaultError::Validation {
            message: "either a file name or at least one folder must be specified".to_string(),
        });
    }

    let path = format!("{AUDIT_ROOT}/files");
    let response = client.post_json::<SubmittedReport, _>(&path, &body).await?;

    Ok(AuditReport {
        kind: ReportKind::File,
        id: response.data.id,
    })
}

/// Fetches the raw status body for a report id, undecoded.
///
/// Escape hatch for callers that want to interpret the status response
/// themselves; [`check_report_status`] is the typed front.
pub async fn report_status_body(client: &SkyvaultClient, id: &str) -> Result<String> {
    let path = format!("{AUDIT_ROOT}/jobs/{id}");
    Ok(client.get_text(&path, None).await?.data)
}

/// Classifies a status response body by shape: a pending job answers with
/// a status-only object, a finished one with the full result body.
///
/// The check is an exact prefix match on the raw text, no trimming — this
/// mirrors what the server actually emits and what existing deployments
/// rely on. Kept in one place so the fragility is contained.
fn is_status_only(body: &str) -> bool {
    body.starts_with(r#"{"status""#)
}

/// Checks a report's generation status, single-shot.
///
/// A pending report yields [`ReportStatus::Pending`] with the server's
/// raw status string; a finished one yields [`ReportStatus::Completed`]
/// with the response decoded per the handle's kind. Polling cadence is up
/// to the caller.
///
/// # Errors
///
/// - `SkyvaultError::Api` — non-success status from the API.
/// - `SkyvaultError::Decode` — the body matched neither the status shape
///   nor the result shape for this kind; carries the raw body.
/// - `SkyvaultError::Network` — transport-level failure.
pub async fn check_report_status(
    client: &SkyvaultClient,
    report: &AuditReport,
) -> Result<ReportStatus> {
    let body = report_status_body(client, &report.id).await?;

    if is_status_only(&body) {
        #[derive(Deserialize)]
        struct StatusOnly {
            status: String,
        }
        let parsed: StatusOnly =
            serde_json::from_str(&body).map_err(|source| SkyvaultError::Decode { body, source })?;
        return Ok(ReportStatus::Pending(parsed.status));
    }

    decode_results(report.kind, body).map(ReportStatus::Completed)
}

fn decode_results(kind: ReportKind, body: String) -> Result<ReportResults> {
    match kind {
        ReportKind::Login => serde_json::from_str(&body)
            .map(ReportResults::Login)
            .map_err(|source| SkyvaultError::Decode { body, source }),
        ReportKind::File => serde_json::from_str(&body)
            .map(ReportResults::File)
            .map_err(|source| SkyvaultError::Decode { body, source }),
    }
}

/// Builds the pagination query from the supplied bounds. Neither bound
/// supplied means no query string at all.
fn results_query(offset: Option<u32>, count: Option<u32>) -> Option<String> {
    let mut params = Vec::new();
    if let Some(offset) = offset {
        params.push(format!("offset={offset}"));
    }
    if let Some(count) = count {
        params.push(format!("count={count}"));
    }
    if params.is_empty() {
        None
    } else {
        Some(params.join("&"))
    }
}

/// Retrieves a page of report results, decoded per the handle's kind.
///
/// `offset` and `count` bound the page; either, both, or neither may be
/// supplied. The server's defaults apply for whichever is absent.
///
/// # Errors
///
/// - `SkyvaultError::Api` — non-success status (e.g. the report is not
///   finished yet, or the id has expired server-side).
/// - `SkyvaultError::Decode` — the body did not match the event schema
///   for this kind; carries the raw body.
/// - `SkyvaultError::Network` — transport-level failure.
pub async fn retrieve_report_results(
    client: &SkyvaultClient,
    report: &AuditReport,
    offset: Option<u32>,
    count: Option<u32>,
) -> Result<ReportResults> {
    let path = format!("{AUDIT_ROOT}/json/{}", report.id);
    let query = results_query(offset, count);

    match report.kind {
        ReportKind::Login => {
            let response = client
                .get_json::<ResultPage<LoginEvent>>(&path, query.as_deref())
                .await?;
            Ok(ReportResults::Login(response.data))
        }
        ReportKind::File => {
            let response = client
                .get_json::<ResultPage<FileEvent>>(&path, query.as_deref())
                .await?;
            Ok(ReportResults::File(response.data))
        }
    }
}
