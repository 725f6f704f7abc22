//! Streaming audio relay
//!
//! Players cannot always load third-party audio directly (CORS, mixed
//! content), so the server fetches it on their behalf. Only hosts on the
//! configured allow-list are reachable; everything else looks like a missing
//! resource to the caller.

use crate::error::{ApiError, ApiResult};
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// User agent sent upstream
pub const USER_AGENT: &str = concat!("Melody/", env!("CARGO_PKG_VERSION"));

/// Request headers copied from the client to the upstream request
pub const FORWARDED_HEADERS: [&str; 2] = ["range", "if-range"];

const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";
const DEFAULT_ACCEPT_RANGES: &str = "bytes";
const DEFAULT_CACHE_CONTROL: &str = "public, max-age=3600";
const MAX_REDIRECTS: usize = 10;

/// Hosts the relay may contact
///
/// Entries are either an exact host name or `*.suffix`, which matches any
/// host ending in `.suffix` (but not the bare suffix itself).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostAllowList {
    exact: Vec<String>,
    suffixes: Vec<String>,
}

impl HostAllowList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim().trim_end_matches('.').to_ascii_lowercase();
            if entry.is_empty() {
                continue;
            }
            match entry.strip_prefix("*.") {
                Some(suffix) if !suffix.is_empty() => list.suffixes.push(format!(".{}", suffix)),
                Some(_) => {}
                None => list.exact.push(entry),
            }
        }
        list
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.suffixes.is_empty()
    }

    pub fn allows(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        if host.is_empty() {
            return false;
        }
        self.exact.iter().any(|entry| *entry == host)
            || self.suffixes.iter().any(|suffix| host.ends_with(suffix.as_str()))
    }
}

/// Outbound HTTP client restricted to allow-listed hosts
#[derive(Debug, Clone)]
pub struct AudioRelay {
    client: reqwest::Client,
    allow_list: HostAllowList,
    timeout: Duration,
}

impl AudioRelay {
    pub fn new(allow_list: HostAllowList, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .redirect(redirect_policy(allow_list.clone()))
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to build relay client: {}", e)))?;

        Ok(Self {
            client,
            allow_list,
            timeout,
        })
    }

    pub fn allow_list(&self) -> &HostAllowList {
        &self.allow_list
    }

    /// Parse and check a client-supplied target URL
    pub fn validate_target(&self, raw: Option<&str>) -> ApiResult<Url> {
        let raw = raw.map(str::trim).unwrap_or("");
        if raw.is_empty() {
            return Err(ApiError::NotFound("Missing audio url".to_string()));
        }

        let url = Url::parse(raw)
            .map_err(|_| ApiError::NotFound("Invalid audio url".to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::NotFound("Unsupported audio url scheme".to_string()));
        }

        match url.host_str() {
            Some(host) if self.allow_list.allows(host) => Ok(url),
            Some(host) => {
                debug!("Relay refused host {}", host);
                Err(ApiError::NotFound("Audio host is not allowed".to_string()))
            }
            None => Err(ApiError::NotFound("Invalid audio url".to_string())),
        }
    }

    /// Fetch `target` and stream it back
    ///
    /// The timeout covers connecting and receiving the response head; the
    /// body streams for as long as the upstream keeps sending.
    pub async fn fetch(&self, target: &Url, client_headers: &HeaderMap) -> ApiResult<Response> {
        let mut request = self
            .client
            .get(target.as_str())
            .header(reqwest::header::ACCEPT, "audio/*");

        for name in FORWARDED_HEADERS {
            if let Some(value) = client_headers.get(name).and_then(|v| v.to_str().ok()) {
                request = request.header(name, value);
            }
        }

        let upstream = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_redirect() => {
                warn!("Relay request to {} redirected off the allow-list: {}", target, e);
                return Err(ApiError::NotFound("Audio host is not allowed".to_string()));
            }
            Ok(Err(e)) => {
                warn!("Relay request to {} failed: {}", target, e);
                return Err(ApiError::BadGateway("Unable to reach the audio source.".to_string()));
            }
            Err(_) => {
                warn!(
                    "Relay request to {} timed out after {}s",
                    target,
                    self.timeout.as_secs()
                );
                return Err(ApiError::BadGateway("Unable to reach the audio source.".to_string()));
            }
        };

        let status = upstream.status().as_u16();
        if status >= 400 {
            warn!("Relay upstream {} answered {}", target, status);
            return Err(ApiError::UpstreamStatus(status));
        }

        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
        let upstream_header = |name: &str| {
            upstream
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let content_type =
            upstream_header("content-type").unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let content_length = upstream_header("content-length");
        let content_range = upstream_header("content-range");
        let accept_ranges =
            upstream_header("accept-ranges").unwrap_or_else(|| DEFAULT_ACCEPT_RANGES.to_string());
        let cache_control =
            upstream_header("cache-control").unwrap_or_else(|| DEFAULT_CACHE_CONTROL.to_string());

        debug!("Relaying {} ({})", target, status);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        insert_header(headers, header::CONTENT_TYPE, &content_type);
        if let Some(length) = content_length {
            insert_header(headers, header::CONTENT_LENGTH, &length);
        }
        if let Some(range) = content_range {
            insert_header(headers, header::CONTENT_RANGE, &range);
        }
        insert_header(headers, header::ACCEPT_RANGES, &accept_ranges);
        insert_header(headers, header::CACHE_CONTROL, &cache_control);

        Ok(response)
    }
}

/// Follow redirects only while every hop stays on an allow-listed http(s) host
fn redirect_policy(allow_list: HostAllowList) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let allowed = matches!(attempt.url().scheme(), "http" | "https")
            && attempt
                .url()
                .host_str()
                .is_some_and(|host| allow_list.allows(host));
        if allowed {
            attempt.follow()
        } else {
            let refused = attempt.url().to_string();
            attempt.error(format!("redirect to {} is not allowed", refused))
        }
    })
}

fn insert_header(headers: &mut HeaderMap, name: header::HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
