//! SSRF-safe outbound GET: hostname/IP vetting before every hop, redirects
//! followed manually with cycle detection (spec §4.9).

use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::ip::{decode_unusual_ipv4_literal, is_private};

const DEFAULT_MAX_REDIRECTS: usize = 5;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Literal hostnames that are always blocked regardless of DNS resolution.
const BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "metadata.google.internal",
    "169.254.169.254",
    "metadata",
];

/// Hostname suffixes that are always blocked.
const BLOCKED_SUFFIXES: &[&str] = &[".localhost", ".local", ".internal"];

/// Policy controlling SSRF vetting for a single call to [`guarded_get`].
#[derive(Debug, Clone, Default)]
pub struct FetchPolicy {
    /// Hostnames (after normalization) exempt from every check below.
    pub allow_hosts: Vec<String>,
    /// Skip IP-address vetting entirely (host blocklist/suffix checks
    /// still apply). An explicit, caller-opt-in escape hatch.
    pub allow_private_network: bool,
    /// Maximum redirect hops to follow. Defaults to 5.
    pub max_redirects: Option<usize>,
    /// Request timeout. Defaults to 20s.
    pub timeout: Option<Duration>,
}

/// The result of a successful guarded fetch.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// The URL the response was actually served from, after redirects.
    pub final_url: String,
}

/// Normalize a hostname for blocklist comparison: trim whitespace,
/// lowercase, strip a trailing dot, and strip surrounding `[]` (IPv6
/// literal brackets).
#[must_use]
pub fn normalize_host(host: &str) -> String {
    let mut h = host.trim().to_ascii_lowercase();
    if let Some(stripped) = h.strip_prefix('[') {
        h = stripped.strip_suffix(']').unwrap_or(stripped).to_string();
    }
    if let Some(stripped) = h.strip_suffix('.') {
        h = stripped.to_string();
    }
    h
}

fn host_is_blocked(host: &str) -> bool {
    BLOCKED_HOSTS.contains(&host) || BLOCKED_SUFFIXES.iter().any(|suffix| host.ends_with(suffix))
}

async fn resolve_host(host: &str) -> FetchResult<Vec<IpAddr>> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }
    if let Some(v4) = decode_unusual_ipv4_literal(host) {
        return Ok(vec![IpAddr::V4(v4)]);
    }
    // Resolve both A and AAAA by asking the system resolver for any port;
    // `lookup_host` returns whichever families it found for the name.
    let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| FetchError::NetworkError(format!("dns resolution failed for {host}: {e}")))?
        .map(|sa| sa.ip())
        .collect();
    if addrs.is_empty() {
        return Err(FetchError::NetworkError(format!("no addresses resolved for {host}")));
    }
    Ok(addrs)
}

async fn vet_url(url: &Url, policy: &FetchPolicy) -> FetchResult<()> {
    match url.scheme() {
        "http" | "https" => {},
        other => return Err(FetchError::InvalidUrl(format!("blocked scheme: {other}"))),
    }
    let host = url.host_str().ok_or_else(|| FetchError::InvalidUrl("url has no host".to_string()))?;
    if host.is_empty() {
        return Err(FetchError::InvalidUrl("url has empty host".to_string()));
    }
    let normalized = normalize_host(host);

    if policy.allow_hosts.iter().any(|h| normalize_host(h) == normalized) {
        return Ok(());
    }
    if host_is_blocked(&normalized) {
        warn!(host = normalized.as_str(), "blocked fetch to denylisted host");
        return Err(FetchError::SsrfBlocked(format!("blocked host: {normalized}")));
    }
    if policy.allow_private_network {
        return Ok(());
    }
    let addrs = resolve_host(&normalized).await?;
    if let Some(bad) = addrs.iter().find(|addr| is_private(**addr)) {
        warn!(host = normalized.as_str(), address = %bad, "blocked fetch to host resolving to a private address");
        return Err(FetchError::SsrfBlocked(format!("{normalized} resolves to private address {bad}")));
    }
    Ok(())
}

/// Perform an SSRF-vetted HTTP GET, following up to `policy.max_redirects`
/// redirects, re-vetting every hop and rejecting cycles.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`], [`FetchError::SsrfBlocked`],
/// [`FetchError::RedirectError`], or [`FetchError::NetworkError`].
pub async fn guarded_get(url: &str, policy: &FetchPolicy) -> FetchResult<FetchedResponse> {
    let max_redirects = policy.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS);
    let timeout = policy.timeout.unwrap_or(DEFAULT_TIMEOUT);

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .build()
        .map_err(|e| FetchError::NetworkError(e.to_string()))?;

    let mut current = Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    let mut visited: HashSet<String> = HashSet::new();

    for _hop in 0..=max_redirects {
        vet_url(&current, policy).await?;
        if !visited.insert(current.as_str().to_string()) {
            warn!(url = %current, "rejecting fetch: redirect cycle detected");
            return Err(FetchError::RedirectError(format!("redirect cycle at {current}")));
        }

        let response = client
            .get(current.clone())
            .send()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| FetchError::RedirectError("redirect with no Location header".to_string()))?;
            current = current
                .join(location)
                .map_err(|e| FetchError::RedirectError(format!("invalid redirect location: {e}")))?;
            continue;
        }

        let final_url = current.to_string();
        let body = response.bytes().await.map_err(|e| FetchError::NetworkError(e.to_string()))?;
        return Ok(FetchedResponse {
            status: status.as_u16(),
            body: body.to_vec(),
            final_url,
        });
    }

    Err(FetchError::RedirectError(format!("exceeded {max_redirects} redirects")))
}
