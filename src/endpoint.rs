//! Endpoint URL construction for the Skyvault API.
//!
//! Every Skyvault tenant is served from its own subdomain
//! (`{domain}.skyvault.com`), with an explicit-host override for tenants
//! behind a custom DNS name. [`ApiBase`] captures exactly one of those
//! choices and composes full endpoint URLs from a method path and an
//! optional, already-encoded query string.
//!
//! Construction never fails — a bad domain or host only surfaces later as
//! a connection error when the transport actually dials it.

/// Scheme used for every API endpoint.
const SCHEME: &str = "https";

/// Port used for every API endpoint.
const PORT: u16 = 443;

/// Subdomain template applied when a tenant is addressed by domain.
/// `{domain}` is replaced at composition time.
const DOMAIN_TEMPLATE: &str = "{domain}.skyvault.com";

/// The base location of a tenant's API.
///
/// Exactly one addressing mode is in effect per client:
/// - [`ApiBase::domain`] — the common case, `https://{domain}.skyvault.com`.
/// - [`ApiBase::host`] — an explicit host, for tenants served under a
///   custom DNS name. Scheme and port stay fixed.
/// - [`ApiBase::custom`] — a verbatim base URL including scheme, used to
///   point the client at a local mock server or an inspecting proxy.
#[derive(Debug, Clone)]
pub enum ApiBase {
    /// Tenant addressed by Skyvault domain: `https://{0}.skyvault.com:443`.
    Domain(String),
    /// Tenant addressed by an explicit host: `https://{0}:443`.
    Host(String),
    /// Verbatim base URL (scheme + authority), no templating applied.
    Custom(String),
}

impl ApiBase {
    /// Base for a tenant addressed by its Skyvault domain.
    pub fn domain(domain: &str) -> Self {
        ApiBase::Domain(domain.to_string())
    }

    /// Base for a tenant served under an explicit host name.
    pub fn host(host: &str) -> Self {
        ApiBase::Host(host.to_string())
    }

    /// Base given verbatim, scheme included. A trailing slash is stripped
    /// so paths (which always begin with `/`) concatenate cleanly.
    pub fn custom(base: &str) -> Self {
        ApiBase::Custom(base.trim_end_matches('/').to_string())
    }

    /// Composes a full endpoint URL from a method path and an optional
    /// query string.
    ///
    /// `path` must begin with the API's versioned root (e.g.
    /// `/pubapi/v1/audit/logins`). `query` is appended verbatim after `?`
    /// and must already be URL-encoded by the caller. Cannot fail.
    pub fn url(&self, path: &str, query: Option<&str>) -> String {
        let mut url = match self {
            ApiBase::Domain(domain) => {
                let host = DOMAIN_TEMPLATE.replace("{domain}", domain);
                format!("{SCHEME}://{host}:{PORT}{path}")
            }
            ApiBase::Host(host) => format!("{SCHEME}://{host}:{PORT}{path}"),
            ApiBase::Custom(base) => format!("{base}{path}"),
        };
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}
