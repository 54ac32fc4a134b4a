//! Request construction and response classification shared by every call.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{ApiError, Error, Result};

/// Timeout applied to every request unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Credentials sent with HTTP Basic auth.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// API key as the username with a blank password.
    ApiKey(String),
    /// Account username and password, used to fetch an API key.
    Basic { username: String, password: String },
}

impl Credentials {
    /// Value of the `Authorization` header.
    pub fn header_value(&self) -> String {
        let pair = match self {
            Credentials::ApiKey(key) => format!("{key}:"),
            Credentials::Basic { username, password } => format!("{username}:{password}"),
        };
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(pair)
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.write_str("ApiKey(..)"),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// User-Agent sent with every request.
///
/// Format: `Snitcher; Rust/{rustc-version}; {arch}-{os}; v{version}`, where
/// the Rust version is that of the compiler that built the crate.
pub fn user_agent() -> String {
    let rust = rustc_version();
    format!(
        "Snitcher; Rust/{}; {}-{}; v{}",
        rust,
        std::env::consts::ARCH,
        std::env::consts::OS,
        crate::VERSION
    )
}

fn rustc_version() -> &'static str {
    option_env!("SNITCHER_RUSTC_VERSION")
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
}

/// Resolves `path` against the endpoint, collapsing repeated slashes, and
/// replaces the query with `query`.
pub(crate) fn join_url(base: &Url, path: &str, query: &[(&str, &str)]) -> Url {
    let mut url = base.clone();
    let joined = format!("/{}/{}", base.path(), path);
    let mut collapsed = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(c);
    }
    url.set_path(&collapsed);
    url.set_query(None);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    url
}

/// Interprets a status and body as a decoded payload or a typed error.
///
/// `Ok(None)` means the call succeeded without content.
pub(crate) fn classify(status: StatusCode, body: &str) -> Result<Option<Value>> {
    if status == StatusCode::NO_CONTENT {
        return Ok(None);
    }
    if status.is_success() {
        if body.trim().is_empty() {
            return Ok(None);
        }
        return Ok(Some(serde_json::from_str(body)?));
    }
    if status.is_server_error() {
        // Not necessarily generated by the API, so the body may not be JSON.
        return Err(Error::InternalServer {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    let data: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        data.as_ref()
            .and_then(|d| d.get(name))
            .and_then(|v| v.as_str())
            .map(String::from)
    };
    let error_type = field("type").unwrap_or_else(|| format!("http_{}", status.as_u16()));
    let message = field("error").unwrap_or_else(|| {
        if data.is_none() && !body.trim().is_empty() {
            body.trim().to_string()
        } else {
            status
                .canonical_reason()
                .unwrap_or("API request failed")
                .to_string()
        }
    });
    Err(Error::from_response(
        status,
        ApiError::new(error_type, message, Some(status.as_u16()), data),
    ))
}

/// Immutable request settings shared by a client and its clones.
#[derive(Clone, Debug)]
pub(crate) struct Requester {
    http: HttpClient,
    base: Url,
    credentials: Option<Credentials>,
    timeout: Duration,
}

impl Requester {
    pub fn new(endpoint: &str, credentials: Option<Credentials>) -> Result<Self> {
        let http = HttpClient::builder()
            .user_agent(user_agent())
            .build()
            .map_err(Error::Transport)?;
        Ok(Self {
            http,
            base: parse_endpoint(endpoint)?,
            credentials,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        self.base = parse_endpoint(endpoint)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Starts a request with auth, user agent and the default timeout. The
    /// timeout covers connecting, the TLS handshake and reading the body.
    pub fn request(&self, method: Method, path: &str, query: &[(&str, &str)]) -> RequestBuilder {
        let url = join_url(&self.base, path, query);
        debug!(method = %method, url = %url, "Sending request");
        let mut req = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout);
        if let Some(credentials) = &self.credentials {
            req = req.header(AUTHORIZATION, credentials.header_value());
        }
        req
    }

    /// Sends the request and classifies the response.
    pub async fn send(&self, req: RequestBuilder) -> Result<Option<Value>> {
        let res = req.send().await.map_err(Error::from_reqwest)?;
        let status = res.status();
        debug!(status = %status, "Received response");
        let body = res.text().await.map_err(Error::from_reqwest)?;
        classify(status, &body)
    }

    /// Sends the request and returns only the status, ignoring the body.
    pub async fn send_for_status(&self, req: RequestBuilder) -> Result<StatusCode> {
        let res = req.send().await.map_err(Error::from_reqwest)?;
        debug!(status = %res.status(), "Received response");
        Ok(res.status())
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| Error::Config(format!("Invalid endpoint {endpoint:?}: {e}")))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "Invalid endpoint {endpoint:?}: must be an http or https URL"
        )));
    }
    Ok(url)
}
